use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::props::{Interactable, PropId};

/// Level-file mission entry: the target names a prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MissionSpec {
    pub(crate) name: String,
    pub(crate) target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mission {
    name: String,
    target: PropId,
    completed: bool,
}

impl Mission {
    pub(crate) fn new(name: impl Into<String>, target: PropId) -> Self {
        Self {
            name: name.into(),
            target,
            completed: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MissionAdvance {
    pub(crate) completed: String,
    pub(crate) next: Option<String>,
    pub(crate) cursor: usize,
}

/// Ordered missions with a monotonic cursor. Only the current mission's
/// target is interactable; every other mission target is disabled.
#[derive(Debug, Clone, Default)]
pub(crate) struct MissionSequencer {
    missions: Vec<Mission>,
    current_index: usize,
}

impl MissionSequencer {
    pub(crate) fn new(missions: Vec<Mission>) -> Self {
        Self {
            missions,
            current_index: 0,
        }
    }

    pub(crate) fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    pub(crate) fn current(&self) -> Option<&Mission> {
        self.missions.get(self.current_index)
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.current_index >= self.missions.len()
    }

    pub(crate) fn is_current_target(&self, prop: PropId) -> bool {
        self.current().is_some_and(|mission| mission.target == prop)
    }

    pub(crate) fn is_target(&self, prop: PropId) -> bool {
        self.missions.iter().any(|mission| mission.target == prop)
    }

    /// Full rescan: the current target is enabled, all other targets are
    /// disabled. Props that no mission names are left alone.
    pub(crate) fn establish<P: Interactable>(&self, interactables: &mut [P]) {
        for (index, mission) in self.missions.iter().enumerate() {
            match interactables.get_mut(mission.target.0) {
                Some(target) => target.set_interactable(index == self.current_index),
                None => warn!(
                    mission = %mission.name,
                    target = mission.target.0,
                    "mission_target_missing"
                ),
            }
        }
    }

    /// Completes the current mission and advances the cursor. A no-op once
    /// every mission is complete.
    pub(crate) fn complete_current_mission<P: Interactable>(
        &mut self,
        interactables: &mut [P],
    ) -> Option<MissionAdvance> {
        let Some(mission) = self.missions.get_mut(self.current_index) else {
            debug!(cursor = self.current_index, "mission_sequence_already_complete");
            return None;
        };
        mission.completed = true;
        let completed = mission.name.clone();
        self.current_index += 1;
        self.establish(interactables);

        let next = self.current().map(|mission| mission.name.clone());
        info!(
            mission = %completed,
            next = next.as_deref().unwrap_or("none"),
            cursor = self.current_index,
            "mission_completed"
        );
        Some(MissionAdvance {
            completed,
            next,
            cursor: self.current_index,
        })
    }

    /// Restores a saved cursor. Missions before it are marked complete and
    /// interactability is rescanned.
    pub(crate) fn restore_cursor<P: Interactable>(
        &mut self,
        cursor: usize,
        interactables: &mut [P],
    ) {
        let cursor = cursor.min(self.missions.len());
        for (index, mission) in self.missions.iter_mut().enumerate() {
            mission.completed = index < cursor;
        }
        self.current_index = cursor;
        self.establish(interactables);
    }
}
