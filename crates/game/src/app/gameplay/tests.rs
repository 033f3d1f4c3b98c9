use std::path::{Path, PathBuf};

use engine::{
    run_app, InputAction, InputScript, InputSnapshot, KeypadKey, LoopConfig, Pacing, Scene,
    SceneCommand, SceneKey, SceneWorld, StopReason, Vec3,
};

use super::build_level_scenes;
use super::cues::Cue;
use super::keypad::KeypadFeedback;
use super::level::{parse_level_json, LevelConfig};
use super::props::{Interactable, PropState};
use super::scene_impl::{HouseScene, GAMEPLAY_SYSTEM_ORDER};
use super::session::SessionHandle;

const DT: f32 = 1.0 / 60.0;

const KITCHEN: &str = r#"{
    "id": "kitchen",
    "display_name": "Kitchen",
    "player_spawn": { "x": 0.0, "y": 0.0, "z": 0.0 },
    "interact_radius": 2.0,
    "ledger": { "water_drain_rate": 0.0, "sunlight_drain_rate": 0.0 },
    "props": [
        { "name": "cup", "kind": "water_cup", "position": { "x": 1.0, "y": 0.0, "z": 0.0 },
          "deposit": { "resource": "water", "amount": 10.0 }, "completes_mission": true,
          "cues": { "animation_trigger": "Drink", "audio_clip": "gulp" } },
        { "name": "switch", "kind": "light_switch", "position": { "x": 0.0, "y": 0.0, "z": 1.5 },
          "activation": "toggle", "transition_seconds": 0.1,
          "deposit": { "resource": "sunlight", "amount": 10.0 }, "completes_mission": true },
        { "name": "key", "kind": "key", "position": { "x": -1.0, "y": 0.0, "z": 0.0 },
          "completes_mission": true,
          "effect": { "type": "collect_item", "item": "front_key" } },
        { "name": "toaster", "kind": "toaster",
          "position": { "x": 0.0, "y": 0.0, "z": -1.8 },
          "deposit": { "resource": "water", "amount": -10.0 } },
        { "name": "locked_door", "kind": "locked_door",
          "position": { "x": 20.0, "y": 0.0, "z": 0.0 },
          "activation": "repeatable",
          "effect": { "type": "show_message", "text": "It's locked", "seconds": 4.0 } },
        { "name": "radio", "kind": "radio", "position": { "x": 0.0, "y": 0.0, "z": 20.0 },
          "activation": "repeatable",
          "effect": { "type": "cycle_tracks", "tracks": ["lofi", "jazz", "rain"] } },
        { "name": "tablet", "kind": "tablet", "position": { "x": 0.0, "y": 0.0, "z": -20.0 },
          "activation": "repeatable", "effect": { "type": "open_panel" } },
        { "name": "front_door", "kind": "passcode_door",
          "position": { "x": -20.0, "y": 0.0, "z": 0.0 },
          "activation": "repeatable",
          "effect": { "type": "passcode_gate", "message": "Locked", "seconds": 4.0,
                      "target_level": "bedroom" } }
    ],
    "missions": [
        { "name": "Drink", "target": "cup" },
        { "name": "Lights", "target": "switch" },
        { "name": "Key", "target": "key" }
    ],
    "keypad": { "passcode": "5705", "door": "front_door" }
}"#;

const BEDROOM: &str = r#"{
    "id": "bedroom",
    "display_name": "Bedroom",
    "player_spawn": { "x": 0.0, "y": 0.0, "z": 0.0 },
    "progress_scope": "per_session",
    "props": [
        { "name": "mushroom", "kind": "mushroom", "position": { "x": 1.0, "y": 0.0, "z": 0.0 },
          "completes_mission": true,
          "effect": { "type": "load_level", "target_level": "kitchen", "delay_seconds": 0.5 } }
    ],
    "missions": [ { "name": "Eat", "target": "mushroom" } ]
}"#;

fn level(raw: &str) -> LevelConfig {
    parse_level_json(raw, Path::new("fixture.json")).expect("fixture level")
}

struct Harness {
    scene: HouseScene,
    world: SceneWorld,
    _saves: tempfile::TempDir,
}

impl Harness {
    fn with_session(raw: &str, session: SessionHandle) -> Self {
        let saves = tempfile::tempdir().expect("tempdir");
        let mut scene = HouseScene::new(level(raw), saves.path().to_path_buf(), session);
        let mut world = SceneWorld::default();
        scene.load(&mut world);
        Self {
            scene,
            world,
            _saves: saves,
        }
    }

    fn new(raw: &str) -> Self {
        Self::with_session(raw, SessionHandle::default())
    }

    fn tick(&mut self, input: InputSnapshot) -> SceneCommand {
        let command = self.scene.update(DT, &input, &mut self.world);
        self.world.apply_pending();
        command
    }

    fn idle(&mut self, ticks: u32) -> Vec<SceneCommand> {
        (0..ticks)
            .map(|_| self.tick(InputSnapshot::empty()))
            .filter(|command| *command != SceneCommand::None)
            .collect()
    }

    fn interact(&mut self) -> SceneCommand {
        self.tick(InputSnapshot::empty().with_interact_pressed(true))
    }

    fn press_key(&mut self, key: KeypadKey) -> SceneCommand {
        self.tick(InputSnapshot::empty().with_keypad_key(Some(key)))
    }

    fn enter_code(&mut self, code: &str) {
        for digit in code.bytes() {
            self.press_key(KeypadKey::Digit(digit - b'0'));
        }
        self.press_key(KeypadKey::Ok);
    }

    fn teleport(&mut self, position: Vec3) {
        self.world.player_mut().expect("player").transform.position = position;
    }

    fn player_position(&self) -> Vec3 {
        self.world.player().expect("player").transform.position
    }

    fn enabled(&self, name: &str) -> bool {
        self.scene.prop(name).expect("prop").is_interactable()
    }

    fn state(&self, name: &str) -> PropState {
        self.scene.prop(name).expect("prop").state()
    }

    fn count_cues(&self, predicate: impl Fn(&Cue) -> bool) -> usize {
        self.scene.cues().iter().filter(|cue| predicate(cue)).count()
    }
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn load_enables_only_first_mission_target() {
    let harness = Harness::new(KITCHEN);
    assert!(harness.enabled("cup"));
    assert!(!harness.enabled("switch"));
    assert!(!harness.enabled("key"));
    assert!(harness.enabled("toaster"));
    assert_eq!(harness.scene.missions().current_index(), 0);
}

#[test]
fn completing_first_mission_hands_exclusivity_to_second() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();

    assert_eq!(harness.state("cup"), PropState::Consumed);
    assert_eq!(harness.scene.ledger().water(), 60.0);
    let missions = harness.scene.missions();
    assert_eq!(missions.current_index(), 1);
    assert!(missions.missions()[0].is_completed());
    assert!(!harness.enabled("cup"));
    assert!(harness.enabled("switch"));
    assert!(!harness.enabled("key"));
    assert_eq!(
        harness.count_cues(|cue| matches!(
            cue,
            Cue::MissionCompleted { name, next }
                if name == "Drink" && next.as_deref() == Some("Lights")
        )),
        1
    );
}

#[test]
fn disabled_candidate_at_same_distance_is_skipped() {
    let mut harness = Harness::new(KITCHEN);
    // cup and key are both 1.0 away; only the cup is enabled.
    harness.interact();
    assert_eq!(harness.state("key"), PropState::Dormant);
    assert!(harness.scene.inventory().is_empty());
    assert_eq!(harness.state("cup"), PropState::Consumed);
}

#[test]
fn full_mission_run_then_sequencer_stays_terminal() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();
    harness.interact();
    harness.interact();

    assert_eq!(harness.state("switch"), PropState::On);
    assert_eq!(harness.scene.ledger().sunlight(), 60.0);
    assert_eq!(harness.scene.inventory(), ["front_key".to_string()]);
    assert!(harness.scene.missions().is_complete());
    assert!(!harness.enabled("cup") && !harness.enabled("switch") && !harness.enabled("key"));

    // Only the toaster remains in reach.
    harness.interact();
    assert_eq!(harness.state("toaster"), PropState::Consumed);
    assert_eq!(harness.scene.ledger().water(), 50.0);
    assert_eq!(harness.scene.missions().current_index(), 3);
}

#[test]
fn consumed_key_reinteract_changes_nothing() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();
    harness.interact();
    harness.interact();
    let water = harness.scene.ledger().water();
    let cursor = harness.scene.missions().current_index();

    harness.scene.set_prop_interactable("toaster", false);
    harness.scene.set_prop_interactable("key", true);
    harness.interact();
    harness.interact();

    assert_eq!(harness.scene.ledger().water(), water);
    assert_eq!(harness.scene.missions().current_index(), cursor);
    assert_eq!(harness.scene.inventory(), ["front_key".to_string()]);
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::ItemCollected { .. })), 1);
}

#[test]
fn consumed_nearest_prop_no_longer_blocks_the_next_one() {
    let mut harness = Harness::new(KITCHEN);
    // Toaster is 0.8 away, the cup about 1.41.
    harness.teleport(Vec3::new(0.0, 0.0, -1.0));
    harness.interact();
    assert_eq!(harness.state("toaster"), PropState::Consumed);
    assert_eq!(harness.state("cup"), PropState::Dormant);
    assert_eq!(harness.scene.ledger().water(), 40.0);

    harness.interact();
    assert_eq!(harness.state("cup"), PropState::Consumed);
    assert_eq!(harness.scene.ledger().water(), 50.0);
    assert_eq!(harness.scene.missions().current_index(), 1);
}

#[test]
fn one_shot_cup_deposits_once_under_repeated_dispatch() {
    let mut harness = Harness::new(KITCHEN);
    harness.scene.set_prop_interactable("toaster", false);
    harness.interact();
    harness.scene.set_prop_interactable("cup", true);
    harness.scene.set_prop_interactable("switch", false);
    for _ in 0..5 {
        harness.interact();
    }
    assert_eq!(harness.scene.ledger().water(), 60.0);
    assert_eq!(harness.scene.missions().current_index(), 1);
}

#[test]
fn out_of_turn_completion_does_not_advance_missions() {
    let mut harness = Harness::new(KITCHEN);
    harness.scene.set_prop_interactable("cup", false);
    harness.scene.set_prop_interactable("toaster", false);
    harness.scene.set_prop_interactable("key", true);
    harness.interact();

    assert_eq!(harness.scene.inventory(), ["front_key".to_string()]);
    assert_eq!(harness.scene.missions().current_index(), 0);
    let snapshot = harness
        .scene
        .debug_info_snapshot(&harness.world)
        .expect("snapshot");
    let lines = snapshot.extra_debug_lines.expect("lines");
    assert!(lines.iter().any(|line| line.contains("rejected=1")), "{lines:?}");
}

#[test]
fn light_switch_toggles_with_lockout_and_deposits_once() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();
    harness.interact();
    assert_eq!(harness.state("switch"), PropState::On);
    assert!(!harness.enabled("switch"));

    // Re-enable the completed switch and keep everything else out of the way.
    harness.scene.set_prop_interactable("switch", true);
    harness.scene.set_prop_interactable("key", false);
    harness.scene.set_prop_interactable("toaster", false);

    // Still inside the 0.1 s lockout.
    harness.interact();
    assert_eq!(harness.state("switch"), PropState::On);

    harness.idle(10);
    harness.interact();
    assert_eq!(harness.state("switch"), PropState::Off);
    harness.idle(10);
    harness.interact();
    assert_eq!(harness.state("switch"), PropState::On);
    assert_eq!(harness.scene.ledger().sunlight(), 60.0);
    assert_eq!(harness.scene.missions().current_index(), 2);
}

#[test]
fn locked_door_message_hides_after_delay_and_rearms() {
    let mut harness = Harness::new(KITCHEN);
    harness.teleport(Vec3::new(19.5, 0.0, 0.0));
    harness.interact();
    assert_eq!(
        harness.count_cues(
            |cue| matches!(cue, Cue::MessageShown { prop, .. } if prop == "locked_door")
        ),
        1
    );

    harness.idle(120);
    harness.interact();
    harness.idle(200);
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::MessageHidden { .. })), 0);

    harness.idle(50);
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::MessageHidden { .. })), 1);
    assert_eq!(harness.scene.pending_timers(), 0);
}

#[test]
fn radio_cycles_tracks_and_stops() {
    let mut harness = Harness::new(KITCHEN);
    harness.teleport(Vec3::new(0.0, 0.0, 19.0));
    for _ in 0..4 {
        harness.interact();
    }
    let events: Vec<String> = harness
        .scene
        .cues()
        .iter()
        .filter_map(|cue| match cue {
            Cue::TrackStarted { track, .. } => Some(track.clone()),
            Cue::TrackStopped { .. } => Some("stop".to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(events, vec!["jazz", "stop", "rain", "stop"]);
}

#[test]
fn tablet_panel_opens_once_until_closed() {
    let mut harness = Harness::new(KITCHEN);
    harness.teleport(Vec3::new(0.0, 0.0, -19.0));
    harness.interact();
    harness.interact();
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::PanelOpened { .. })), 1);

    harness.tick(InputSnapshot::empty().with_close_panel_pressed(true));
    harness.interact();
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::PanelOpened { .. })), 2);
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::PanelClosed { .. })), 1);
}

#[test]
fn open_panel_suspends_movement_jump_and_interaction() {
    let mut harness = Harness::new(KITCHEN);
    harness.teleport(Vec3::new(0.0, 0.0, -19.0));
    harness.interact();
    assert!(harness.scene.prop("tablet").expect("tablet").is_panel_open());

    let forward = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);
    harness.tick(forward.with_jump_pressed(true));
    assert_close(harness.player_position().z, -19.0);

    harness.teleport(Vec3::new(0.0, 0.0, -0.5));
    harness.interact();
    assert_eq!(harness.state("toaster"), PropState::Dormant);
    assert_eq!(harness.scene.ledger().water(), 50.0);

    // The keypad stays usable behind the panel.
    harness.press_key(KeypadKey::Digit(5));
    assert_eq!(harness.scene.keypad_entry(), Some("5"));

    harness.tick(InputSnapshot::empty().with_close_panel_pressed(true));
    harness.tick(forward);
    assert!(harness.player_position().z > -0.5);
}

#[test]
fn later_level_request_in_the_same_tick_wins() {
    let raw = KITCHEN.replace(
        r#""props": ["#,
        r#""props": [
        { "name": "mushroom", "kind": "mushroom", "position": { "x": 20.0, "y": 0.0, "z": 20.0 },
          "effect": { "type": "load_level", "target_level": "attic", "delay_seconds": 2.0 } },"#,
    );
    let mut harness = Harness::new(&raw);
    harness.teleport(Vec3::new(19.0, 0.0, 20.0));
    for digit in [5, 7, 0, 5] {
        harness.press_key(KeypadKey::Digit(digit));
    }
    // Door unlock and mushroom load are both due 2.0 s from this tick; the
    // unlock was scheduled first.
    harness.tick(
        InputSnapshot::empty()
            .with_keypad_key(Some(KeypadKey::Ok))
            .with_interact_pressed(true),
    );
    assert_eq!(harness.scene.pending_timers(), 2);

    assert_eq!(
        harness.idle(130),
        vec![SceneCommand::HardResetTo(SceneKey::new("attic"))]
    );
    assert!(harness.scene.prop("front_door").expect("door").is_unlocked());
}

#[test]
fn correct_passcode_transitions_after_unlock_delay() {
    let mut harness = Harness::new(KITCHEN);
    harness.enter_code("5705");
    assert_eq!(harness.scene.keypad_entry(), Some(""));
    assert_eq!(
        harness.count_cues(|cue| *cue == Cue::Keypad(KeypadFeedback::Accepted)),
        1
    );

    assert!(harness.idle(110).is_empty());
    let commands = harness.idle(20);
    assert_eq!(
        commands,
        vec![SceneCommand::HardResetTo(SceneKey::new("bedroom"))]
    );
    assert!(harness.scene.prop("front_door").expect("door").is_unlocked());
}

#[test]
fn wrong_passcode_resets_display_after_delay() {
    let mut harness = Harness::new(KITCHEN);
    harness.enter_code("1234");
    assert_eq!(
        harness.count_cues(|cue| *cue == Cue::Keypad(KeypadFeedback::Rejected)),
        1
    );
    harness.idle(50);
    assert_eq!(harness.count_cues(|cue| *cue == Cue::Keypad(KeypadFeedback::Reset)), 0);
    harness.idle(20);
    assert_eq!(harness.count_cues(|cue| *cue == Cue::Keypad(KeypadFeedback::Reset)), 1);

    // Door is still locked: interacting shows the locked message.
    harness.teleport(Vec3::new(-19.0, 0.0, 0.0));
    assert_eq!(harness.interact(), SceneCommand::None);
    assert_eq!(
        harness.count_cues(
            |cue| matches!(cue, Cue::MessageShown { prop, .. } if prop == "front_door")
        ),
        1
    );
}

#[test]
fn unlocked_door_interaction_requests_level_immediately() {
    let mut harness = Harness::new(KITCHEN);
    harness.enter_code("5705");
    harness.idle(130);
    harness.teleport(Vec3::new(-19.0, 0.0, 0.0));
    assert_eq!(
        harness.interact(),
        SceneCommand::HardResetTo(SceneKey::new("bedroom"))
    );
}

#[test]
fn jump_opens_high_drain_window() {
    let raw = KITCHEN.replace(
        r#""ledger": { "water_drain_rate": 0.0, "sunlight_drain_rate": 0.0 }"#,
        r#""ledger": { "water_drain_rate": 1.0, "sunlight_drain_rate": 1.0 }"#,
    );
    let mut harness = Harness::new(&raw);
    let jump = InputSnapshot::empty().with_jump_pressed(true);

    harness.scene.update(0.25, &jump, &mut harness.world);
    assert_close(harness.scene.ledger().water(), 49.5);
    harness.scene.update(0.25, &InputSnapshot::empty(), &mut harness.world);
    assert_close(harness.scene.ledger().water(), 49.0);
    harness.scene.update(0.25, &InputSnapshot::empty(), &mut harness.world);
    assert_close(harness.scene.ledger().water(), 48.75);
    assert_close(harness.scene.ledger().sunlight(), 48.75);
}

#[test]
fn speed_tracks_resources_within_the_same_tick() {
    let mut harness = Harness::new(KITCHEN);
    assert_close(harness.scene.current_speed(), 5.0);
    harness.interact();
    // water 60 -> deviation 0.2 -> penalty 0.8
    assert_close(harness.scene.current_speed(), 4.2);

    harness.scene.ledger_mut().add_water(-60.0);
    harness.tick(InputSnapshot::empty());
    assert_close(harness.scene.current_speed(), 1.0);
}

#[test]
fn held_movement_uses_applied_speed() {
    let mut harness = Harness::new(KITCHEN);
    let forward = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);
    for _ in 0..60 {
        harness.tick(forward);
    }
    let position = harness.player_position();
    assert_close(position.z, 5.0);
    assert_close(position.x, 0.0);
}

#[test]
fn systems_run_in_fixed_order() {
    let mut harness = Harness::new(KITCHEN);
    harness.tick(InputSnapshot::empty());
    assert_eq!(harness.scene.last_tick_order(), GAMEPLAY_SYSTEM_ORDER);
    let snapshot = harness
        .scene
        .debug_info_snapshot(&harness.world)
        .expect("snapshot");
    assert_eq!(
        snapshot.system_order,
        "Input>Interaction>Intents>Timers>Resources>Speed>Movement>Affordance"
    );
    assert_eq!(snapshot.entity_count, 9);
}

#[test]
fn affordance_follows_player_distance() {
    let mut harness = Harness::new(KITCHEN);
    harness.tick(InputSnapshot::empty());
    assert!(harness.scene.prop("cup").expect("cup").affordance_visible());
    assert!(!harness.scene.prop("radio").expect("radio").affordance_visible());

    harness.interact();
    harness.tick(InputSnapshot::empty());
    assert!(!harness.scene.prop("cup").expect("cup").affordance_visible());
    assert_eq!(
        harness.count_cues(
            |cue| matches!(cue, Cue::Affordance { prop, visible: false } if prop == "cup")
        ),
        1
    );
}

#[test]
fn save_then_load_restores_progress() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();
    harness.teleport(Vec3::new(0.5, 0.0, 0.5));
    harness.tick(InputSnapshot::empty().with_save_pressed(true));

    harness.teleport(Vec3::ZERO);
    harness.interact();
    harness.idle(10);
    harness.interact();
    assert_eq!(harness.scene.missions().current_index(), 3);
    harness.teleport(Vec3::new(0.0, 0.0, 19.0));
    harness.interact();
    assert_eq!(
        harness.scene.prop("radio").expect("radio").current_track(),
        Some("jazz")
    );

    harness.tick(InputSnapshot::empty().with_load_pressed(true));
    let radio = harness.scene.prop("radio").expect("radio");
    assert_eq!(radio.state(), PropState::Dormant);
    assert_eq!(radio.current_track(), None);
    assert_eq!(harness.count_cues(|cue| matches!(cue, Cue::TrackStopped { .. })), 1);
    assert_eq!(harness.scene.missions().current_index(), 1);
    assert_eq!(harness.scene.ledger().water(), 60.0);
    assert_eq!(harness.scene.ledger().sunlight(), 50.0);
    assert!(harness.scene.inventory().is_empty());
    assert_eq!(harness.state("cup"), PropState::Consumed);
    assert_eq!(harness.state("switch"), PropState::Off);
    assert!(harness.enabled("switch"));
    assert!(!harness.enabled("key"));
    assert_close(harness.player_position().x, 0.5);

    // The restored radio starts from its first track again.
    harness.teleport(Vec3::new(0.0, 0.0, 19.0));
    harness.interact();
    assert_eq!(
        harness.scene.prop("radio").expect("radio").current_track(),
        Some("jazz")
    );
}

#[test]
fn playing_radio_survives_save_and_load() {
    let mut harness = Harness::new(KITCHEN);
    harness.teleport(Vec3::new(0.0, 0.0, 19.0));
    harness.interact();
    harness.interact();
    harness.interact();
    assert_eq!(
        harness.scene.prop("radio").expect("radio").current_track(),
        Some("rain")
    );
    harness.tick(InputSnapshot::empty().with_save_pressed(true));

    harness.interact();
    harness.tick(InputSnapshot::empty().with_load_pressed(true));
    assert_eq!(
        harness.scene.prop("radio").expect("radio").current_track(),
        Some("rain")
    );
    let started = harness.count_cues(|cue| matches!(cue, Cue::TrackStarted { .. }));
    assert_eq!(started, 3);

    harness.teleport(Vec3::new(0.0, 0.0, 19.0));
    harness.interact();
    assert_eq!(harness.scene.prop("radio").expect("radio").current_track(), None);
}

#[test]
fn loading_an_older_save_relocks_the_front_door() {
    let mut harness = Harness::new(KITCHEN);
    harness.tick(InputSnapshot::empty().with_save_pressed(true));
    harness.enter_code("5705");
    harness.idle(130);
    assert!(harness.scene.prop("front_door").expect("door").is_unlocked());

    harness.tick(InputSnapshot::empty().with_load_pressed(true));
    assert!(!harness.scene.prop("front_door").expect("door").is_unlocked());
    harness.teleport(Vec3::new(-19.0, 0.0, 0.0));
    assert_eq!(harness.interact(), SceneCommand::None);
    assert_eq!(
        harness.count_cues(
            |cue| matches!(cue, Cue::MessageShown { prop, .. } if prop == "front_door")
        ),
        1
    );
}

#[test]
fn load_without_save_leaves_state_untouched() {
    let mut harness = Harness::new(KITCHEN);
    harness.interact();
    harness.tick(InputSnapshot::empty().with_load_pressed(true));
    assert_eq!(harness.scene.missions().current_index(), 1);
    assert_eq!(harness.scene.ledger().water(), 60.0);
}

#[test]
fn per_session_level_inherits_resources_and_inventory() {
    let session = SessionHandle::default();
    let mut kitchen = Harness::with_session(KITCHEN, session.clone());
    kitchen.interact();
    kitchen.interact();
    kitchen.interact();
    kitchen.enter_code("5705");
    assert_eq!(
        kitchen.idle(130),
        vec![SceneCommand::HardResetTo(SceneKey::new("bedroom"))]
    );

    let bedroom = Harness::with_session(BEDROOM, session);
    assert_eq!(bedroom.scene.ledger().water(), 60.0);
    assert_eq!(bedroom.scene.ledger().sunlight(), 60.0);
    assert_eq!(bedroom.scene.inventory(), ["front_key".to_string()]);
    assert_eq!(bedroom.scene.missions().current_index(), 0);
}

#[test]
fn per_level_scope_starts_fresh() {
    let session = SessionHandle::default();
    let mut bedroom = Harness::with_session(BEDROOM, session.clone());
    bedroom.scene.ledger_mut().add_water(30.0);
    bedroom.interact();
    assert_eq!(
        bedroom.idle(40),
        vec![SceneCommand::HardResetTo(SceneKey::new("kitchen"))]
    );

    let kitchen = Harness::with_session(KITCHEN, session);
    assert_eq!(kitchen.scene.ledger().water(), 50.0);
    assert!(kitchen.scene.inventory().is_empty());
}

#[test]
fn scripted_run_reaches_next_level() {
    let saves = tempfile::tempdir().expect("tempdir");
    let scenes = build_level_scenes(vec![level(KITCHEN), level(BEDROOM)], saves.path());
    let mut script = InputScript::parse(
        "# unlock the front door\n\
         keypad 5\nkeypad 7\nkeypad 0\nkeypad 5\nkeypad ok\n\
         wait 130\nquit\n",
    )
    .expect("script");
    let summary = run_app(
        LoopConfig {
            pacing: Pacing::AsFastAsPossible,
            ..LoopConfig::default()
        },
        scenes,
        SceneKey::new("kitchen"),
        &mut script,
    )
    .expect("run");

    assert_eq!(summary.stop_reason, StopReason::QuitRequested);
    assert_eq!(summary.final_scene, SceneKey::new("bedroom"));
}

#[test]
fn shipped_levels_load_and_validate() {
    let levels_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/levels");
    let (catalog, levels) = super::load_levels(&levels_dir).expect("shipped levels");
    assert_eq!(catalog.first(), Some(levels[0].id.as_str()));
    assert!(levels.iter().all(|level| !level.props.is_empty()));
}
