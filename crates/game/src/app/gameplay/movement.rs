use engine::{InputAction, InputSnapshot, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resources::ResourceLedger;

const DEFAULT_AIR_MULTIPLIER: f32 = 0.5;
const DEFAULT_AIRTIME_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LocomotionConfig {
    pub(crate) air_multiplier: f32,
    pub(crate) airtime_seconds: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            air_multiplier: DEFAULT_AIR_MULTIPLIER,
            airtime_seconds: DEFAULT_AIRTIME_SECONDS,
        }
    }
}

/// Minimal planar integrator. Forward is +z, right is +x.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Locomotion {
    max_speed: f32,
    air_multiplier: f32,
    airtime_seconds: f32,
    airborne_remaining: f32,
}

impl Locomotion {
    pub(crate) fn new(config: &LocomotionConfig) -> Self {
        let air_multiplier = if config.air_multiplier.is_finite() {
            config.air_multiplier.clamp(0.0, 1.0)
        } else {
            DEFAULT_AIR_MULTIPLIER
        };
        let airtime_seconds = if config.airtime_seconds.is_finite() {
            config.airtime_seconds.max(0.0)
        } else {
            DEFAULT_AIRTIME_SECONDS
        };
        Self {
            max_speed: 0.0,
            air_multiplier,
            airtime_seconds,
            airborne_remaining: 0.0,
        }
    }

    pub(crate) fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub(crate) fn set_max_speed(&mut self, max_speed: f32) {
        self.max_speed = max_speed.max(0.0);
    }

    pub(crate) fn is_airborne(&self) -> bool {
        self.airborne_remaining > 0.0
    }

    /// Starts a jump when grounded. Returns whether one started.
    pub(crate) fn try_jump(&mut self) -> bool {
        if self.is_airborne() {
            return false;
        }
        self.airborne_remaining = self.airtime_seconds;
        self.airborne_remaining > 0.0
    }

    pub(crate) fn land(&mut self) {
        self.airborne_remaining = 0.0;
    }

    pub(crate) fn step(&mut self, position: Vec3, input: &InputSnapshot, dt_seconds: f32) -> Vec3 {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return position;
        }
        let speed = if self.is_airborne() {
            self.max_speed * self.air_multiplier
        } else {
            self.max_speed
        };
        self.airborne_remaining = (self.airborne_remaining - dt_seconds).max(0.0);

        let axis = |positive: InputAction, negative: InputAction| -> f32 {
            let held = |action: InputAction| f32::from(u8::from(input.is_down(action)));
            held(positive) - held(negative)
        };
        let x = axis(InputAction::MoveRight, InputAction::MoveLeft);
        let z = axis(InputAction::MoveForward, InputAction::MoveBack);
        let length = (x * x + z * z).sqrt();
        if length == 0.0 {
            return position;
        }
        let scale = speed * dt_seconds / length;
        position.offset(x * scale, 0.0, z * scale)
    }
}

/// Hands the ledger's derived speed to locomotion as its max horizontal
/// speed. Called once per tick after the ledger has drained.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MovementSpeedApplier;

impl MovementSpeedApplier {
    pub(crate) fn apply(&self, ledger: &ResourceLedger, locomotion: &mut Locomotion) -> f32 {
        let speed = ledger.compute_speed_multiplier();
        if (speed - locomotion.max_speed()).abs() > f32::EPSILON {
            debug!(speed, "movement_speed_applied");
        }
        locomotion.set_max_speed(speed);
        speed
    }
}
