use engine::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cues::{Cue, CueSink};
use super::intents::{GameplayIntent, GameplayIntentQueue};
use super::resources::{ResourceKind, ResourceLedger};

pub(crate) const DEFAULT_INTERACT_RANGE: f32 = 2.0;

/// The contract every prop exposes to the router and the mission sequencer.
pub(crate) trait Interactable {
    fn interact(&mut self, ctx: &mut InteractContext<'_>) -> InteractOutcome;
    fn set_interactable(&mut self, enabled: bool);
    fn is_interactable(&self) -> bool;
    fn interact_range(&self) -> f32;
    /// A spent interactable has nothing left to do and is skipped by routing.
    fn is_spent(&self) -> bool {
        false
    }
}

/// Collaborators a prop may touch while handling one interaction.
pub(crate) struct InteractContext<'a> {
    /// Distance from the interacting actor to the prop.
    pub(crate) distance: f32,
    pub(crate) ledger: &'a mut ResourceLedger,
    pub(crate) intents: &'a mut GameplayIntentQueue,
    pub(crate) cues: &'a mut dyn CueSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IgnoreReason {
    Disabled,
    OutOfRange,
    InTransition,
    Consumed,
    AlreadyOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InteractOutcome {
    Ignored(IgnoreReason),
    Transitioned { from: PropState, to: PropState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PropId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PropKind {
    Door,
    Drawer,
    Cabinet,
    Fridge,
    Stove,
    LightSwitch,
    WaterCup,
    BowlOfWater,
    Toaster,
    Key,
    Radio,
    Tablet,
    PasscodeDoor,
    LockedDoor,
    Shades,
    Mushroom,
    Toilet,
    Generic,
}

impl PropKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Door => "door",
            Self::Drawer => "drawer",
            Self::Cabinet => "cabinet",
            Self::Fridge => "fridge",
            Self::Stove => "stove",
            Self::LightSwitch => "light_switch",
            Self::WaterCup => "water_cup",
            Self::BowlOfWater => "bowl_of_water",
            Self::Toaster => "toaster",
            Self::Key => "key",
            Self::Radio => "radio",
            Self::Tablet => "tablet",
            Self::PasscodeDoor => "passcode_door",
            Self::LockedDoor => "locked_door",
            Self::Shades => "shades",
            Self::Mushroom => "mushroom",
            Self::Toilet => "toilet",
            Self::Generic => "generic",
        }
    }

    fn expects_animation(self) -> bool {
        !matches!(self, Self::Tablet | Self::Generic)
    }

    fn expects_audio(self) -> bool {
        matches!(
            self,
            Self::Door
                | Self::PasscodeDoor
                | Self::LightSwitch
                | Self::Toaster
                | Self::Key
                | Self::WaterCup
                | Self::BowlOfWater
                | Self::Toilet
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Activation {
    /// Dormant to Consumed, then inert.
    #[default]
    OneShot,
    /// Alternates On and Off.
    Toggle,
    /// Re-enterable; each interaction leaves it Active.
    Repeatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PropState {
    Dormant,
    On,
    Off,
    Active,
    Consumed,
}

impl PropState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::On => "on",
            Self::Off => "off",
            Self::Active => "active",
            Self::Consumed => "consumed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Deposit {
    pub(crate) resource: ResourceKind,
    pub(crate) amount: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum EffectSpec {
    #[default]
    None,
    CollectItem {
        item: String,
    },
    ShowMessage {
        text: String,
        seconds: f32,
    },
    PasscodeGate {
        message: String,
        seconds: f32,
        target_level: String,
    },
    LoadLevel {
        target_level: String,
        #[serde(default)]
        delay_seconds: f32,
    },
    CycleTracks {
        tracks: Vec<String>,
    },
    OpenPanel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CueSpec {
    pub(crate) animation_trigger: Option<String>,
    pub(crate) audio_clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PropSpec {
    pub(crate) name: String,
    pub(crate) kind: PropKind,
    pub(crate) position: Vec3,
    #[serde(default = "default_interact_range")]
    pub(crate) interact_range: f32,
    #[serde(default = "default_enabled")]
    pub(crate) enabled: bool,
    #[serde(default)]
    pub(crate) activation: Activation,
    #[serde(default)]
    pub(crate) deposit: Option<Deposit>,
    #[serde(default)]
    pub(crate) completes_mission: bool,
    #[serde(default)]
    pub(crate) transition_seconds: f32,
    #[serde(default)]
    pub(crate) effect: EffectSpec,
    #[serde(default)]
    pub(crate) cues: CueSpec,
}

fn default_interact_range() -> f32 {
    DEFAULT_INTERACT_RANGE
}

fn default_enabled() -> bool {
    true
}

/// Effect progress that outlives a save and load: the radio's track and
/// whether a passcode gate has been opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum EffectProgress {
    #[default]
    None,
    Tracks {
        current: usize,
        playing: bool,
    },
    Gate {
        unlocked: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum EffectState {
    None,
    CollectItem {
        item: String,
    },
    ShowMessage {
        text: String,
        seconds: f32,
    },
    PasscodeGate {
        message: String,
        seconds: f32,
        target_level: String,
        unlocked: bool,
    },
    LoadLevel {
        target_level: String,
        delay_seconds: f32,
    },
    CycleTracks {
        tracks: Vec<String>,
        current: usize,
        playing: bool,
    },
    OpenPanel {
        open: bool,
    },
}

impl From<EffectSpec> for EffectState {
    fn from(spec: EffectSpec) -> Self {
        match spec {
            EffectSpec::None => Self::None,
            EffectSpec::CollectItem { item } => Self::CollectItem { item },
            EffectSpec::ShowMessage { text, seconds } => Self::ShowMessage { text, seconds },
            EffectSpec::PasscodeGate {
                message,
                seconds,
                target_level,
            } => Self::PasscodeGate {
                message,
                seconds,
                target_level,
                unlocked: false,
            },
            EffectSpec::LoadLevel {
                target_level,
                delay_seconds,
            } => Self::LoadLevel {
                target_level,
                delay_seconds,
            },
            EffectSpec::CycleTracks { tracks } => Self::CycleTracks {
                tracks,
                current: 0,
                playing: false,
            },
            EffectSpec::OpenPanel => Self::OpenPanel { open: false },
        }
    }
}

/// Data-driven prop: one implementation covers every kind in the house.
#[derive(Debug, Clone)]
pub(crate) struct Prop {
    id: PropId,
    name: String,
    kind: PropKind,
    position: Vec3,
    interact_range: f32,
    enabled: bool,
    activation: Activation,
    state: PropState,
    deposit: Option<Deposit>,
    has_fired: bool,
    completes_mission: bool,
    mission_reported: bool,
    transition_seconds: f32,
    transition_remaining: f32,
    effect: EffectState,
    animation_trigger: Option<String>,
    audio_clip: Option<String>,
    affordance_visible: bool,
}

impl Prop {
    pub(crate) fn from_spec(id: PropId, spec: PropSpec) -> Self {
        let prop = Self {
            id,
            kind: spec.kind,
            position: spec.position,
            interact_range: spec.interact_range.max(0.0),
            enabled: spec.enabled,
            activation: spec.activation,
            state: match spec.activation {
                Activation::Toggle => PropState::Off,
                Activation::OneShot | Activation::Repeatable => PropState::Dormant,
            },
            deposit: spec.deposit,
            has_fired: false,
            completes_mission: spec.completes_mission,
            mission_reported: false,
            transition_seconds: spec.transition_seconds.max(0.0),
            transition_remaining: 0.0,
            effect: EffectState::from(spec.effect),
            animation_trigger: spec.cues.animation_trigger,
            audio_clip: spec.cues.audio_clip,
            affordance_visible: false,
            name: spec.name,
        };
        prop.report_configuration_gaps();
        prop
    }

    fn report_configuration_gaps(&self) {
        if self.animation_trigger.is_none() && self.kind.expects_animation() {
            warn!(
                prop = %self.name,
                kind = self.kind.as_str(),
                "prop_animation_trigger_missing"
            );
        }
        if self.audio_clip.is_none() && self.kind.expects_audio() {
            warn!(
                prop = %self.name,
                kind = self.kind.as_str(),
                "prop_audio_clip_missing"
            );
        }
        match &self.effect {
            EffectState::CycleTracks { tracks, .. } if tracks.is_empty() => {
                warn!(prop = %self.name, "prop_tracks_missing");
            }
            EffectState::ShowMessage { text, .. } | EffectState::PasscodeGate { message: text, .. }
                if text.trim().is_empty() =>
            {
                warn!(prop = %self.name, "prop_message_missing");
            }
            _ => {}
        }
    }

    pub(crate) fn id(&self) -> PropId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    pub(crate) fn state(&self) -> PropState {
        self.state
    }

    pub(crate) fn has_fired(&self) -> bool {
        self.has_fired
    }

    pub(crate) fn mission_reported(&self) -> bool {
        self.mission_reported
    }

    pub(crate) fn in_transition(&self) -> bool {
        self.transition_remaining > 0.0
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.state == PropState::Consumed
    }

    pub(crate) fn is_panel_open(&self) -> bool {
        matches!(self.effect, EffectState::OpenPanel { open: true })
    }

    pub(crate) fn passcode_target(&self) -> Option<&str> {
        match &self.effect {
            EffectState::PasscodeGate { target_level, .. } => Some(target_level),
            _ => None,
        }
    }

    /// Advances the in-flight transition lock.
    pub(crate) fn advance(&mut self, dt_seconds: f32) {
        if self.transition_remaining > 0.0 && dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.transition_remaining = (self.transition_remaining - dt_seconds).max(0.0);
            if self.transition_remaining == 0.0 {
                debug!(prop = %self.name, state = self.state.as_str(), "prop_transition_finished");
            }
        }
    }

    pub(crate) fn unlock(&mut self) -> bool {
        match &mut self.effect {
            EffectState::PasscodeGate { unlocked, .. } if !*unlocked => {
                *unlocked = true;
                info!(prop = %self.name, "prop_unlocked");
                true
            }
            _ => false,
        }
    }

    /// Closes an open panel and re-arms the prop.
    pub(crate) fn close_panel(&mut self, cues: &mut dyn CueSink) -> bool {
        match &mut self.effect {
            EffectState::OpenPanel { open } if *open => {
                *open = false;
                self.state = PropState::Off;
                cues.push(Cue::PanelClosed {
                    prop: self.name.clone(),
                });
                true
            }
            _ => false,
        }
    }

    /// Highlight rule: enabled, not consumed, and the player is within range.
    pub(crate) fn affordance_should_show(&self, player_distance: f32) -> bool {
        self.enabled && !self.is_consumed() && player_distance <= self.interact_range
    }

    /// Pushes an affordance cue only when visibility changes.
    pub(crate) fn refresh_affordance(&mut self, player_distance: f32, cues: &mut dyn CueSink) {
        let visible = self.affordance_should_show(player_distance);
        if visible != self.affordance_visible {
            self.affordance_visible = visible;
            cues.push(Cue::Affordance {
                prop: self.name.clone(),
                visible,
            });
        }
    }

    pub(crate) fn effect_progress(&self) -> EffectProgress {
        match &self.effect {
            EffectState::CycleTracks {
                current, playing, ..
            } => EffectProgress::Tracks {
                current: *current,
                playing: *playing,
            },
            EffectState::PasscodeGate { unlocked, .. } => EffectProgress::Gate {
                unlocked: *unlocked,
            },
            _ => EffectProgress::None,
        }
    }

    /// Restores persisted progress without replaying deposits or mission
    /// reports. Missing effect progress resets the effect to its initial
    /// state. A radio whose playback changes emits the matching track cue.
    pub(crate) fn restore(
        &mut self,
        state: PropState,
        has_fired: bool,
        mission_reported: bool,
        progress: EffectProgress,
        cues: &mut dyn CueSink,
    ) {
        self.state = state;
        self.has_fired = has_fired;
        self.mission_reported = mission_reported;
        self.transition_remaining = 0.0;
        match &mut self.effect {
            EffectState::OpenPanel { open } => *open = state == PropState::Active,
            EffectState::PasscodeGate { unlocked, .. } => {
                *unlocked = matches!(progress, EffectProgress::Gate { unlocked: true });
            }
            EffectState::CycleTracks {
                tracks,
                current,
                playing,
            } => {
                let (saved_current, saved_playing) = match progress {
                    EffectProgress::Tracks { current, playing } => (current, playing),
                    _ => (0, false),
                };
                let saved_current = if saved_current < tracks.len() {
                    saved_current
                } else {
                    0
                };
                let track = tracks.get(saved_current).filter(|_| saved_playing);
                let was_playing = *playing;
                let switched = was_playing && *current != saved_current;
                *current = saved_current;
                *playing = track.is_some();
                match track {
                    Some(track) if !was_playing || switched => cues.push(Cue::TrackStarted {
                        prop: self.name.clone(),
                        track: track.clone(),
                    }),
                    None if was_playing => cues.push(Cue::TrackStopped {
                        prop: self.name.clone(),
                    }),
                    _ => {}
                }
            }
            EffectState::None
            | EffectState::CollectItem { .. }
            | EffectState::ShowMessage { .. }
            | EffectState::LoadLevel { .. } => {}
        }
    }

    fn next_state(&self) -> PropState {
        match (self.activation, self.state) {
            (Activation::OneShot, _) => PropState::Consumed,
            (Activation::Toggle, PropState::On) => PropState::Off,
            (Activation::Toggle, _) => PropState::On,
            (Activation::Repeatable, _) => PropState::Active,
        }
    }

    fn is_completion_edge(&self, to: PropState) -> bool {
        matches!(
            to,
            PropState::Consumed | PropState::On | PropState::Active
        )
    }

    fn emit_cues(&self, cues: &mut dyn CueSink) {
        if let Some(trigger) = &self.animation_trigger {
            cues.push(Cue::Animation {
                prop: self.name.clone(),
                trigger: trigger.clone(),
            });
        }
        if let Some(clip) = &self.audio_clip {
            cues.push(Cue::Audio {
                prop: self.name.clone(),
                clip: clip.clone(),
            });
        }
    }

    fn apply_deposit(&mut self, to: PropState, ledger: &mut ResourceLedger) {
        let Some(deposit) = self.deposit else {
            return;
        };
        if self.has_fired || !self.is_completion_edge(to) {
            return;
        }
        self.has_fired = true;
        ledger.add(deposit.resource, deposit.amount);
        info!(
            prop = %self.name,
            resource = deposit.resource.as_str(),
            amount = deposit.amount,
            water = ledger.water(),
            sunlight = ledger.sunlight(),
            "resource_deposited"
        );
    }

    fn apply_effect(&mut self, ctx: &mut InteractContext<'_>) {
        let prop = self.id;
        let name = self.name.clone();
        match &mut self.effect {
            EffectState::None => {}
            EffectState::CollectItem { item } => {
                ctx.intents.enqueue(GameplayIntent::CollectItem {
                    prop,
                    item: item.clone(),
                });
            }
            EffectState::ShowMessage { text, seconds } => {
                ctx.cues.push(Cue::MessageShown {
                    prop: name,
                    text: text.clone(),
                });
                ctx.intents.enqueue(GameplayIntent::ScheduleHideMessage {
                    prop,
                    seconds: *seconds,
                });
            }
            EffectState::PasscodeGate {
                message,
                seconds,
                target_level,
                unlocked,
            } => {
                if *unlocked {
                    ctx.intents.enqueue(GameplayIntent::RequestLevel {
                        prop,
                        target_level: target_level.clone(),
                        delay_seconds: 0.0,
                    });
                } else {
                    ctx.cues.push(Cue::MessageShown {
                        prop: name,
                        text: message.clone(),
                    });
                    ctx.intents.enqueue(GameplayIntent::ScheduleHideMessage {
                        prop,
                        seconds: *seconds,
                    });
                }
            }
            EffectState::LoadLevel {
                target_level,
                delay_seconds,
            } => {
                ctx.intents.enqueue(GameplayIntent::RequestLevel {
                    prop,
                    target_level: target_level.clone(),
                    delay_seconds: *delay_seconds,
                });
            }
            EffectState::CycleTracks {
                tracks,
                current,
                playing,
            } => {
                if *playing {
                    *playing = false;
                    ctx.cues.push(Cue::TrackStopped { prop: name });
                } else if !tracks.is_empty() {
                    *current = (*current + 1) % tracks.len();
                    *playing = true;
                    ctx.cues.push(Cue::TrackStarted {
                        prop: name,
                        track: tracks[*current].clone(),
                    });
                }
            }
            EffectState::OpenPanel { open } => {
                *open = true;
                ctx.cues.push(Cue::PanelOpened { prop: name });
            }
        }
    }
}

impl Interactable for Prop {
    fn interact(&mut self, ctx: &mut InteractContext<'_>) -> InteractOutcome {
        if !self.enabled {
            return InteractOutcome::Ignored(IgnoreReason::Disabled);
        }
        if !(ctx.distance <= self.interact_range) {
            return InteractOutcome::Ignored(IgnoreReason::OutOfRange);
        }
        if self.in_transition() {
            return InteractOutcome::Ignored(IgnoreReason::InTransition);
        }
        if self.is_consumed() {
            return InteractOutcome::Ignored(IgnoreReason::Consumed);
        }
        if self.is_panel_open() {
            return InteractOutcome::Ignored(IgnoreReason::AlreadyOpen);
        }

        let from = self.state;
        let to = self.next_state();
        self.state = to;
        self.transition_remaining = self.transition_seconds;

        self.emit_cues(ctx.cues);
        self.apply_deposit(to, ctx.ledger);
        self.apply_effect(ctx);

        if self.completes_mission && !self.mission_reported && self.is_completion_edge(to) {
            self.mission_reported = true;
            ctx.intents
                .enqueue(GameplayIntent::CompleteMission { prop: self.id });
        }

        info!(
            prop = %self.name,
            kind = self.kind.as_str(),
            from = from.as_str(),
            to = to.as_str(),
            "prop_interacted"
        );
        InteractOutcome::Transitioned { from, to }
    }

    fn set_interactable(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!(prop = %self.name, enabled, "prop_interactable_changed");
        }
        self.enabled = enabled;
    }

    fn is_interactable(&self) -> bool {
        self.enabled
    }

    fn interact_range(&self) -> f32 {
        self.interact_range
    }

    fn is_spent(&self) -> bool {
        self.is_consumed()
    }
}

#[cfg(test)]
impl Prop {
    pub(crate) fn affordance_visible(&self) -> bool {
        self.affordance_visible
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        matches!(self.effect, EffectState::PasscodeGate { unlocked: true, .. })
    }

    pub(crate) fn current_track(&self) -> Option<&str> {
        match &self.effect {
            EffectState::CycleTracks {
                tracks,
                current,
                playing: true,
            } => tracks.get(*current).map(String::as_str),
            _ => None,
        }
    }
}
