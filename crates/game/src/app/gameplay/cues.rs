use std::collections::VecDeque;

use tracing::debug;

use super::keypad::KeypadFeedback;

const MAX_RETAINED_CUES: usize = 256;

/// Presentation side effects. Rendering, audio and UI consume these; the
/// core only emits them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cue {
    Affordance { prop: String, visible: bool },
    Animation { prop: String, trigger: String },
    Audio { prop: String, clip: String },
    TrackStarted { prop: String, track: String },
    TrackStopped { prop: String },
    MessageShown { prop: String, text: String },
    MessageHidden { prop: String },
    PanelOpened { prop: String },
    PanelClosed { prop: String },
    ItemCollected { item: String },
    MissionCompleted { name: String, next: Option<String> },
    Keypad(KeypadFeedback),
    LevelRequested { target_level: String },
}

pub(crate) trait CueSink {
    fn push(&mut self, cue: Cue);
}

/// Bounded record of emitted cues, oldest dropped first.
#[derive(Debug, Default)]
pub(crate) struct CueLog {
    cues: VecDeque<Cue>,
}

impl CueLog {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.cues.len()
    }

    pub(crate) fn clear(&mut self) {
        self.cues.clear();
    }
}

impl CueSink for CueLog {
    fn push(&mut self, cue: Cue) {
        debug!(cue = ?cue, "cue");
        if self.cues.len() == MAX_RETAINED_CUES {
            self.cues.pop_front();
        }
        self.cues.push_back(cue);
    }
}
