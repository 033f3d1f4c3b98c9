use std::collections::HashMap;
use std::path::PathBuf;

use engine::{
    DebugInfoSnapshot, DeferredQueue, EntityId, InputSnapshot, KeypadKey, Scene, SceneCommand,
    SceneKey, SceneWorld, Transform, Vec3,
};
use tracing::{debug, info, warn};

use super::cues::{Cue, CueLog, CueSink};
use super::intents::{GameplayIntent, GameplayIntentApplyStats, GameplayIntentQueue};
use super::interaction::InteractionRouter;
use super::keypad::{Keypad, KeypadFeedback, RESET_DELAY_SECONDS, UNLOCK_DELAY_SECONDS};
use super::level::{LevelConfig, ProgressScope};
use super::missions::{Mission, MissionSequencer};
use super::movement::{Locomotion, MovementSpeedApplier};
use super::props::{InteractContext, Interactable, Prop, PropId};
use super::resources::{DrainWindow, ResourceLedger};
use super::save::{
    read_save, save_file_path, validate_save_game, write_save, SaveError, SaveGame, SavedProp,
    SAVE_VERSION,
};
use super::session::{CarriedProgress, SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameplaySystemId {
    Input,
    Interaction,
    Intents,
    Timers,
    Resources,
    Speed,
    Movement,
    Affordance,
}

impl GameplaySystemId {
    fn name(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Interaction => "Interaction",
            Self::Intents => "Intents",
            Self::Timers => "Timers",
            Self::Resources => "Resources",
            Self::Speed => "Speed",
            Self::Movement => "Movement",
            Self::Affordance => "Affordance",
        }
    }
}

pub(crate) const GAMEPLAY_SYSTEM_ORDER: [GameplaySystemId; 8] = [
    GameplaySystemId::Input,
    GameplaySystemId::Interaction,
    GameplaySystemId::Intents,
    GameplaySystemId::Timers,
    GameplaySystemId::Resources,
    GameplaySystemId::Speed,
    GameplaySystemId::Movement,
    GameplaySystemId::Affordance,
];

fn system_order_text() -> String {
    GAMEPLAY_SYSTEM_ORDER
        .iter()
        .map(|system_id| system_id.name())
        .collect::<Vec<_>>()
        .join(">")
}

#[derive(Debug, Clone, PartialEq)]
enum TimedEffect {
    HideMessage(PropId),
    KeypadUnlock,
    KeypadReset,
    LoadLevel(String),
}

#[derive(Debug)]
struct KeypadBinding {
    keypad: Keypad,
    door: PropId,
}

/// One level of the house: props, missions, the player's resources and the
/// fixed per-tick system order that ties them together.
pub(crate) struct HouseScene {
    level: LevelConfig,
    saves_dir: PathBuf,
    session: SessionHandle,
    player_id: Option<EntityId>,
    ledger: ResourceLedger,
    drain_window: DrainWindow,
    locomotion: Locomotion,
    speed_applier: MovementSpeedApplier,
    current_speed: f32,
    router: InteractionRouter,
    props: Vec<Prop>,
    prop_index_by_entity: HashMap<EntityId, usize>,
    missions: MissionSequencer,
    keypad: Option<KeypadBinding>,
    inventory: Vec<String>,
    intents: GameplayIntentQueue,
    timers: DeferredQueue<TimedEffect>,
    cues: CueLog,
    pending_level: Option<String>,
    system_order_text: String,
    last_tick_order: Vec<GameplaySystemId>,
}

impl HouseScene {
    pub(crate) fn new(level: LevelConfig, saves_dir: PathBuf, session: SessionHandle) -> Self {
        Self {
            ledger: ResourceLedger::new(&level.ledger),
            drain_window: DrainWindow::new(level.ledger.high_drain_seconds),
            locomotion: Locomotion::new(&level.locomotion),
            router: InteractionRouter::new(level.interact_radius),
            level,
            saves_dir,
            session,
            player_id: None,
            speed_applier: MovementSpeedApplier,
            current_speed: 0.0,
            props: Vec::new(),
            prop_index_by_entity: HashMap::new(),
            missions: MissionSequencer::default(),
            keypad: None,
            inventory: Vec::new(),
            intents: GameplayIntentQueue::default(),
            timers: DeferredQueue::default(),
            cues: CueLog::default(),
            pending_level: None,
            system_order_text: String::new(),
            last_tick_order: Vec::with_capacity(GAMEPLAY_SYSTEM_ORDER.len()),
        }
    }

    fn level_id(&self) -> &str {
        &self.level.id
    }

    fn reset_runtime_state(&mut self) {
        self.player_id = None;
        self.ledger = ResourceLedger::new(&self.level.ledger);
        self.drain_window = DrainWindow::new(self.level.ledger.high_drain_seconds);
        self.locomotion = Locomotion::new(&self.level.locomotion);
        self.router = InteractionRouter::new(self.level.interact_radius);
        self.current_speed = 0.0;
        self.props.clear();
        self.prop_index_by_entity.clear();
        self.missions = MissionSequencer::default();
        self.keypad = None;
        self.inventory.clear();
        self.intents = GameplayIntentQueue::default();
        self.timers.clear();
        self.cues.clear();
        self.pending_level = None;
        self.last_tick_order.clear();
    }

    fn spawn_level(&mut self, world: &mut SceneWorld) {
        self.player_id = Some(world.spawn_player(Transform::at(self.level.player_spawn)));
        for (index, spec) in self.level.props.iter().enumerate() {
            let entity = world.spawn(Transform::at(spec.position), spec.name.clone());
            self.prop_index_by_entity.insert(entity, index);
            self.props.push(Prop::from_spec(PropId(index), spec.clone()));
        }
        world.apply_pending();

        let mut missions = Vec::with_capacity(self.level.missions.len());
        for spec in &self.level.missions {
            match self.prop_id_by_name(&spec.target) {
                Some(target) => missions.push(Mission::new(spec.name.clone(), target)),
                None => warn!(
                    level = %self.level.id,
                    mission = %spec.name,
                    target = %spec.target,
                    "mission_target_missing"
                ),
            }
        }
        self.missions = MissionSequencer::new(missions);
        self.missions.establish(&mut self.props);

        self.keypad = self.level.keypad.as_ref().and_then(|config| {
            let door = self.prop_id_by_name(&config.door)?;
            Some(KeypadBinding {
                keypad: Keypad::new(&config.passcode),
                door,
            })
        });
    }

    fn prop_id_by_name(&self, name: &str) -> Option<PropId> {
        self.props
            .iter()
            .find(|prop| prop.name() == name)
            .map(Prop::id)
    }

    fn apply_carried_progress(&mut self) {
        let Some(carried) = self.session.take() else {
            return;
        };
        match self.level.progress_scope {
            ProgressScope::PerSession => {
                self.ledger.set_amounts(carried.water, carried.sunlight);
                self.inventory = carried.inventory;
                info!(
                    level = %self.level.id,
                    from = %carried.from_level,
                    water = self.ledger.water(),
                    sunlight = self.ledger.sunlight(),
                    items = self.inventory.len(),
                    "session_progress_carried"
                );
            }
            ProgressScope::PerLevel => {
                debug!(
                    level = %self.level.id,
                    from = %carried.from_level,
                    "session_progress_reset"
                );
            }
        }
    }

    fn player_position(&self, world: &SceneWorld) -> Option<Vec3> {
        self.player_id
            .and_then(|id| world.find_entity(id))
            .map(|entity| entity.transform.position)
    }

    fn run_system(
        &mut self,
        system_id: GameplaySystemId,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) {
        match system_id {
            GameplaySystemId::Input => self.run_input_system(input, world),
            GameplaySystemId::Interaction => self.run_interaction_system(input, world),
            GameplaySystemId::Intents => self.apply_intents(),
            GameplaySystemId::Timers => self.run_timer_system(fixed_dt_seconds),
            GameplaySystemId::Resources => {
                self.ledger
                    .tick(fixed_dt_seconds, self.drain_window.is_active());
                self.drain_window.advance(fixed_dt_seconds);
            }
            GameplaySystemId::Speed => {
                self.current_speed = self.speed_applier.apply(&self.ledger, &mut self.locomotion);
            }
            GameplaySystemId::Movement => {
                if self.input_suspended() {
                    return;
                }
                if let Some(player) = self.player_id.and_then(|id| world.find_entity_mut(id)) {
                    player.transform.position =
                        self.locomotion
                            .step(player.transform.position, input, fixed_dt_seconds);
                }
            }
            GameplaySystemId::Affordance => self.run_affordance_system(world),
        }
    }

    fn run_input_system(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        if input.save_pressed() {
            match self.save_to_disk(world) {
                Ok(path) => info!(
                    level = %self.level.id,
                    path = %path.display(),
                    "save_written"
                ),
                Err(error) => warn!(level = %self.level.id, error = %error, "save_failed"),
            }
        }

        if input.load_pressed() {
            match self.load_from_disk(world) {
                Ok(path) => info!(
                    level = %self.level.id,
                    path = %path.display(),
                    "save_loaded"
                ),
                Err(error) => warn!(level = %self.level.id, error = %error, "load_failed"),
            }
        }

        let suspended = self.input_suspended();
        if input.jump_pressed() && !suspended && self.locomotion.try_jump() {
            self.drain_window.trigger();
            debug!(level = %self.level.id, "jump_started");
        }

        if let Some(key) = input.keypad_key() {
            self.press_keypad(key);
        }

        if input.close_panel_pressed() {
            for prop in &mut self.props {
                prop.close_panel(&mut self.cues);
            }
        }
    }

    fn press_keypad(&mut self, key: KeypadKey) {
        let Some(binding) = self.keypad.as_mut() else {
            debug!(level = %self.level.id, "keypad_press_without_keypad");
            return;
        };
        let feedback = binding.keypad.press(key);
        match feedback {
            KeypadFeedback::Accepted => {
                self.timers
                    .schedule(UNLOCK_DELAY_SECONDS, TimedEffect::KeypadUnlock);
            }
            KeypadFeedback::Rejected => {
                self.timers
                    .cancel_where(|effect| *effect == TimedEffect::KeypadReset);
                self.timers
                    .schedule(RESET_DELAY_SECONDS, TimedEffect::KeypadReset);
            }
            KeypadFeedback::DigitAccepted { .. }
            | KeypadFeedback::Cleared
            | KeypadFeedback::Ignored
            | KeypadFeedback::Reset => {}
        }
        self.cues.push(Cue::Keypad(feedback));
    }

    fn run_interaction_system(&mut self, input: &InputSnapshot, world: &SceneWorld) {
        if !input.interact_pressed() {
            return;
        }
        if self.input_suspended() {
            debug!(level = %self.level.id, "interaction_suspended_by_panel");
            return;
        }
        let Some(origin) = self.player_position(world) else {
            return;
        };
        let mut ctx = InteractContext {
            distance: 0.0,
            ledger: &mut self.ledger,
            intents: &mut self.intents,
            cues: &mut self.cues,
        };
        let dispatch = self.router.try_interact(
            world,
            origin,
            &mut self.props,
            &self.prop_index_by_entity,
            &mut ctx,
        );
        if let Some(dispatch) = dispatch {
            if let Some(prop) = self.props.get(dispatch.index) {
                debug!(
                    level = %self.level.id,
                    prop = prop.name(),
                    entity = dispatch.entity.0,
                    distance = dispatch.distance,
                    outcome = ?dispatch.outcome,
                    "interaction_resolved"
                );
            }
        }
    }

    fn apply_intents(&mut self) {
        let mut stats = GameplayIntentApplyStats::default();
        for intent in self.intents.drain_current_tick() {
            let kind = intent.kind();
            let applied = match intent {
                GameplayIntent::CompleteMission { prop } => self.apply_mission_completion(prop),
                GameplayIntent::CollectItem { prop, item } => {
                    if !self.inventory.contains(&item) {
                        self.inventory.push(item.clone());
                    }
                    info!(
                        level = %self.level.id,
                        prop = prop.0,
                        item = %item,
                        "item_collected"
                    );
                    self.cues.push(Cue::ItemCollected { item });
                    true
                }
                GameplayIntent::ScheduleHideMessage { prop, seconds } => {
                    self.timers
                        .cancel_where(|effect| *effect == TimedEffect::HideMessage(prop));
                    self.timers.schedule(seconds, TimedEffect::HideMessage(prop));
                    true
                }
                GameplayIntent::RequestLevel {
                    prop,
                    target_level,
                    delay_seconds,
                } => {
                    debug!(
                        level = %self.level.id,
                        prop = prop.0,
                        target = %target_level,
                        delay_seconds,
                        "level_request_received"
                    );
                    if delay_seconds > 0.0 {
                        self.timers
                            .schedule(delay_seconds, TimedEffect::LoadLevel(target_level));
                    } else {
                        self.request_level(target_level);
                    }
                    true
                }
            };
            if applied {
                stats.record_intent(kind);
            } else {
                stats.record_rejected();
            }
        }
        self.intents.set_last_tick_apply_stats(stats);
    }

    fn apply_mission_completion(&mut self, prop: PropId) -> bool {
        if !self.missions.is_current_target(prop) {
            if self.missions.is_target(prop) {
                warn!(
                    level = %self.level.id,
                    prop = prop.0,
                    cursor = self.missions.current_index(),
                    "mission_completion_out_of_order"
                );
            } else {
                warn!(
                    level = %self.level.id,
                    prop = prop.0,
                    cursor = self.missions.current_index(),
                    "mission_completion_ignored"
                );
            }
            return false;
        }
        let Some(advance) = self.missions.complete_current_mission(&mut self.props) else {
            return false;
        };
        self.cues.push(Cue::MissionCompleted {
            name: advance.completed,
            next: advance.next,
        });
        if self.missions.is_complete() {
            info!(level = %self.level.id, missions = advance.cursor, "missions_all_complete");
        }
        true
    }

    /// Only one level change per tick; the latest request wins.
    fn request_level(&mut self, target_level: String) {
        if let Some(replaced) = self.pending_level.take() {
            debug!(
                level = %self.level.id,
                replaced = %replaced,
                target = %target_level,
                "level_request_superseded"
            );
        }
        self.pending_level = Some(target_level);
    }

    /// An open panel takes over the screen: no walking, jumping or
    /// interacting until it is closed.
    fn input_suspended(&self) -> bool {
        self.props.iter().any(Prop::is_panel_open)
    }

    fn run_timer_system(&mut self, fixed_dt_seconds: f32) {
        for prop in &mut self.props {
            prop.advance(fixed_dt_seconds);
        }
        for effect in self.timers.tick(fixed_dt_seconds) {
            match effect {
                TimedEffect::HideMessage(prop) => {
                    if let Some(prop) = self.props.get(prop.0) {
                        self.cues.push(Cue::MessageHidden {
                            prop: prop.name().to_string(),
                        });
                    }
                }
                TimedEffect::KeypadUnlock => self.unlock_keypad_door(),
                TimedEffect::KeypadReset => {
                    if let Some(binding) = self.keypad.as_mut() {
                        let feedback = binding.keypad.reset();
                        self.cues.push(Cue::Keypad(feedback));
                    }
                }
                TimedEffect::LoadLevel(target_level) => self.request_level(target_level),
            }
        }
    }

    fn unlock_keypad_door(&mut self) {
        let Some(door) = self.keypad.as_ref().map(|binding| binding.door) else {
            return;
        };
        let Some(prop) = self.props.get_mut(door.0) else {
            return;
        };
        if !prop.unlock() {
            debug!(level = %self.level.id, prop = prop.name(), "keypad_door_already_unlocked");
        }
        if let Some(target_level) = prop.passcode_target().map(str::to_string) {
            self.request_level(target_level);
        }
    }

    fn run_affordance_system(&mut self, world: &SceneWorld) {
        let Some(origin) = self.player_position(world) else {
            return;
        };
        for prop in &mut self.props {
            prop.refresh_affordance(origin.distance(prop.position()), &mut self.cues);
        }
    }

    fn leave_for(&mut self, target_level: String) -> SceneCommand {
        self.session.store(CarriedProgress {
            from_level: self.level.id.clone(),
            water: self.ledger.water(),
            sunlight: self.ledger.sunlight(),
            inventory: self.inventory.clone(),
        });
        info!(
            level = %self.level.id,
            target = %target_level,
            "level_transition_requested"
        );
        self.cues.push(Cue::LevelRequested {
            target_level: target_level.clone(),
        });
        SceneCommand::HardResetTo(SceneKey::new(target_level))
    }

    fn build_save_game(&self, world: &SceneWorld) -> SaveGame {
        SaveGame {
            save_version: SAVE_VERSION,
            level_id: self.level.id.clone(),
            water: self.ledger.water(),
            sunlight: self.ledger.sunlight(),
            inventory: self.inventory.clone(),
            mission_cursor: self.missions.current_index(),
            player_position: self
                .player_position(world)
                .unwrap_or(self.level.player_spawn),
            props: self
                .props
                .iter()
                .map(|prop| SavedProp {
                    name: prop.name().to_string(),
                    state: prop.state(),
                    has_fired: prop.has_fired(),
                    mission_reported: prop.mission_reported(),
                    effect: prop.effect_progress(),
                })
                .collect(),
        }
    }

    fn save_path(&self) -> PathBuf {
        save_file_path(&self.saves_dir, self.level_id())
    }

    fn save_to_disk(&self, world: &SceneWorld) -> Result<PathBuf, SaveError> {
        let path = self.save_path();
        write_save(&path, &self.build_save_game(world))?;
        Ok(path)
    }

    fn load_from_disk(&mut self, world: &mut SceneWorld) -> Result<PathBuf, SaveError> {
        let path = self.save_path();
        let save = read_save(&path)?;
        let prop_names: Vec<&str> = self.props.iter().map(Prop::name).collect();
        validate_save_game(
            &save,
            self.level_id(),
            &prop_names,
            self.missions.missions().len(),
        )?;
        self.apply_save_game(save, world);
        Ok(path)
    }

    fn apply_save_game(&mut self, save: SaveGame, world: &mut SceneWorld) {
        self.ledger.set_amounts(save.water, save.sunlight);
        self.inventory = save.inventory;
        for (prop, saved) in self.props.iter_mut().zip(&save.props) {
            prop.restore(
                saved.state,
                saved.has_fired,
                saved.mission_reported,
                saved.effect,
                &mut self.cues,
            );
        }
        self.missions
            .restore_cursor(save.mission_cursor, &mut self.props);
        if let Some(player) = self.player_id.and_then(|id| world.find_entity_mut(id)) {
            player.transform.position = save.player_position;
        }

        self.timers.clear();
        self.drain_window.cancel();
        self.locomotion.land();
        self.intents.drain_current_tick();
        self.pending_level = None;
        if let (Some(binding), Some(config)) = (self.keypad.as_mut(), self.level.keypad.as_ref()) {
            binding.keypad = Keypad::new(&config.passcode);
        }
    }
}

impl Scene for HouseScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.reset_runtime_state();
        self.system_order_text = system_order_text();
        self.spawn_level(world);
        self.apply_carried_progress();
        self.current_speed = self.speed_applier.apply(&self.ledger, &mut self.locomotion);
        info!(
            level = %self.level.id,
            display_name = %self.level.display_name,
            entity_count = world.entity_count(),
            props = self.props.len(),
            missions = self.missions.missions().len(),
            interact_radius = self.router.scan_radius(),
            sys = %self.system_order_text,
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.last_tick_order.clear();
        for system_id in GAMEPLAY_SYSTEM_ORDER {
            self.last_tick_order.push(system_id);
            self.run_system(system_id, fixed_dt_seconds, input, world);
        }

        match self.pending_level.take() {
            Some(target_level) => self.leave_for(target_level),
            None => SceneCommand::None,
        }
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        info!(
            level = %self.level.id,
            entity_count = world.entity_count(),
            "scene_unload"
        );
        self.reset_runtime_state();
        self.system_order_text.clear();
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let player = self.player_position(world)?;
        Some(format!(
            "Windowsill | {} | Player ({:.2}, {:.2}) | Water {:.1} | Sunlight {:.1} | Speed {:.2}",
            self.level.display_name,
            player.x,
            player.z,
            self.ledger.water(),
            self.ledger.sunlight(),
            self.current_speed
        ))
    }

    fn debug_info_snapshot(&self, world: &SceneWorld) -> Option<DebugInfoSnapshot> {
        let stats = self.intents.last_tick_apply_stats();
        let keypad = match &self.keypad {
            Some(binding) => format!(
                "keypad entry_len={} locked={}",
                binding.keypad.entry().len(),
                binding.keypad.is_locked()
            ),
            None => "keypad none".to_string(),
        };
        let mission = self
            .missions
            .current()
            .map(Mission::name)
            .unwrap_or("complete");
        Some(DebugInfoSnapshot {
            entity_count: world.entity_count(),
            interactable_count: self
                .props
                .iter()
                .filter(|prop| prop.is_interactable())
                .count(),
            system_order: self.system_order_text.clone(),
            extra_debug_lines: Some(vec![
                format!(
                    "resources water={:.1} sunlight={:.1} speed={:.2} high_drain={}",
                    self.ledger.water(),
                    self.ledger.sunlight(),
                    self.current_speed,
                    self.drain_window.is_active()
                ),
                format!(
                    "mission {}/{} {}",
                    self.missions
                        .missions()
                        .iter()
                        .filter(|mission| mission.is_completed())
                        .count(),
                    self.missions.missions().len(),
                    mission
                ),
                format!("inventory [{}]", self.inventory.join(", ")),
                format!(
                    "intents total={} mission={} item={} hide={} level={} rejected={} timers={}",
                    stats.total,
                    stats.complete_mission,
                    stats.collect_item,
                    stats.schedule_hide_message,
                    stats.request_level,
                    stats.rejected,
                    self.timers.len()
                ),
                keypad,
            ]),
        })
    }
}

#[cfg(test)]
impl HouseScene {
    pub(crate) fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    pub(crate) fn props(&self) -> &[Prop] {
        &self.props
    }

    pub(crate) fn prop(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|prop| prop.name() == name)
    }

    pub(crate) fn missions(&self) -> &MissionSequencer {
        &self.missions
    }

    pub(crate) fn inventory(&self) -> &[String] {
        &self.inventory
    }

    pub(crate) fn cues(&self) -> &CueLog {
        &self.cues
    }

    pub(crate) fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub(crate) fn last_tick_order(&self) -> &[GameplaySystemId] {
        &self.last_tick_order
    }

    pub(crate) fn keypad_entry(&self) -> Option<&str> {
        self.keypad.as_ref().map(|binding| binding.keypad.entry())
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn set_prop_interactable(&mut self, name: &str, enabled: bool) {
        if let Some(prop) = self.props.iter_mut().find(|prop| prop.name() == name) {
            prop.set_interactable(enabled);
        }
    }
}
