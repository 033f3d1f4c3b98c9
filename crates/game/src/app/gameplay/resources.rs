use serde::{Deserialize, Serialize};
use tracing::debug;

pub(crate) const DEFAULT_MAX_RESOURCE: f32 = 100.0;
pub(crate) const DEFAULT_HIGH_DRAIN_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ResourceKind {
    Water,
    Sunlight,
}

impl ResourceKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Sunlight => "sunlight",
        }
    }
}

/// Ledger tuning as it appears in level files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LedgerConfig {
    pub(crate) max_resource: f32,
    pub(crate) water: f32,
    pub(crate) sunlight: f32,
    pub(crate) water_drain_rate: f32,
    pub(crate) sunlight_drain_rate: f32,
    pub(crate) jump_drain_multiplier: f32,
    pub(crate) min_speed: f32,
    pub(crate) max_speed: f32,
    pub(crate) high_drain_seconds: f32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_resource: DEFAULT_MAX_RESOURCE,
            water: 50.0,
            sunlight: 50.0,
            water_drain_rate: 1.0,
            sunlight_drain_rate: 1.0,
            jump_drain_multiplier: 2.0,
            min_speed: 1.0,
            max_speed: 5.0,
            high_drain_seconds: DEFAULT_HIGH_DRAIN_SECONDS,
        }
    }
}

/// Water and sunlight, each clamped to `[0, max_resource]` after every
/// mutation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResourceLedger {
    max_resource: f32,
    water: f32,
    sunlight: f32,
    water_drain_rate: f32,
    sunlight_drain_rate: f32,
    jump_drain_multiplier: f32,
    min_speed: f32,
    max_speed: f32,
}

impl ResourceLedger {
    pub(crate) fn new(config: &LedgerConfig) -> Self {
        let defaults = LedgerConfig::default();
        let max_resource = finite_positive_or(config.max_resource, defaults.max_resource);
        let min_speed = finite_or(config.min_speed, defaults.min_speed);
        let max_speed = finite_or(config.max_speed, defaults.max_speed);
        let (min_speed, max_speed) = if min_speed <= max_speed {
            (min_speed, max_speed)
        } else {
            (max_speed, min_speed)
        };

        let mut ledger = Self {
            max_resource,
            water: 0.0,
            sunlight: 0.0,
            water_drain_rate: finite_or(config.water_drain_rate, 0.0).max(0.0),
            sunlight_drain_rate: finite_or(config.sunlight_drain_rate, 0.0).max(0.0),
            jump_drain_multiplier: finite_or(config.jump_drain_multiplier, 1.0).max(0.0),
            min_speed,
            max_speed,
        };
        ledger.set_amounts(config.water, config.sunlight);
        ledger
    }

    pub(crate) fn max_resource(&self) -> f32 {
        self.max_resource
    }

    pub(crate) fn water(&self) -> f32 {
        self.water
    }

    pub(crate) fn sunlight(&self) -> f32 {
        self.sunlight
    }

    pub(crate) fn amount(&self, kind: ResourceKind) -> f32 {
        match kind {
            ResourceKind::Water => self.water,
            ResourceKind::Sunlight => self.sunlight,
        }
    }

    pub(crate) fn min_speed(&self) -> f32 {
        self.min_speed
    }

    pub(crate) fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub(crate) fn add_water(&mut self, amount: f32) {
        self.water = self.clamped_sum(self.water, amount);
    }

    pub(crate) fn add_sunlight(&mut self, amount: f32) {
        self.sunlight = self.clamped_sum(self.sunlight, amount);
    }

    pub(crate) fn add(&mut self, kind: ResourceKind, amount: f32) {
        match kind {
            ResourceKind::Water => self.add_water(amount),
            ResourceKind::Sunlight => self.add_sunlight(amount),
        }
    }

    /// Overwrites both amounts (clamped). Used when restoring a save or
    /// carrying a session into a new level.
    pub(crate) fn set_amounts(&mut self, water: f32, sunlight: f32) {
        self.water = self.clamp_amount(water);
        self.sunlight = self.clamp_amount(sunlight);
    }

    pub(crate) fn tick(&mut self, delta_seconds: f32, is_high_drain: bool) {
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return;
        }
        let multiplier = if is_high_drain {
            self.jump_drain_multiplier
        } else {
            1.0
        };
        self.water =
            self.clamped_sum(self.water, -self.water_drain_rate * multiplier * delta_seconds);
        self.sunlight =
            self.clamped_sum(self.sunlight, -self.sunlight_drain_rate * multiplier * delta_seconds);
    }

    /// Max speed minus the larger deviation penalty of the two resources.
    ///
    /// A resource at the midpoint costs nothing; at either extreme it costs
    /// the full `max_speed - min_speed` span.
    pub(crate) fn compute_speed_multiplier(&self) -> f32 {
        let span = self.max_speed - self.min_speed;
        let effect = |amount: f32| self.deviation(amount) * span;
        let penalty = effect(self.water).max(effect(self.sunlight));
        (self.max_speed - penalty).clamp(self.min_speed, self.max_speed)
    }

    fn deviation(&self, amount: f32) -> f32 {
        let mid = self.max_resource / 2.0;
        (amount - mid).abs() / mid
    }

    fn clamped_sum(&self, current: f32, amount: f32) -> f32 {
        if amount.is_nan() {
            debug!(current, "resource_delta_ignored_nan");
            return current;
        }
        self.clamp_amount(current + amount)
    }

    fn clamp_amount(&self, value: f32) -> f32 {
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, self.max_resource)
    }
}

/// Timed high-drain state opened by a jump. Re-triggering restarts it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrainWindow {
    duration_seconds: f32,
    remaining_seconds: f32,
}

impl DrainWindow {
    pub(crate) fn new(duration_seconds: f32) -> Self {
        Self {
            duration_seconds: finite_or(duration_seconds, DEFAULT_HIGH_DRAIN_SECONDS).max(0.0),
            remaining_seconds: 0.0,
        }
    }

    pub(crate) fn trigger(&mut self) {
        self.remaining_seconds = self.duration_seconds;
    }

    pub(crate) fn is_active(&self) -> bool {
        self.remaining_seconds > 0.0
    }

    pub(crate) fn advance(&mut self, dt_seconds: f32) {
        if dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.remaining_seconds = (self.remaining_seconds - dt_seconds).max(0.0);
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.remaining_seconds = 0.0;
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn finite_positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(water: f32, sunlight: f32) -> ResourceLedger {
        ResourceLedger::new(&LedgerConfig {
            water,
            sunlight,
            ..LedgerConfig::default()
        })
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn large_negative_deposit_floors_at_zero() {
        let mut ledger = ledger_with(50.0, 50.0);
        ledger.add_water(-1000.0);
        assert_eq!(ledger.water(), 0.0);
    }

    #[test]
    fn deposits_cap_at_max_resource() {
        let mut ledger = ledger_with(95.0, 10.0);
        ledger.add_water(10.0);
        ledger.add(ResourceKind::Sunlight, 500.0);
        assert_eq!(ledger.water(), 100.0);
        assert_eq!(ledger.sunlight(), 100.0);
    }

    #[test]
    fn both_at_midpoint_gives_max_speed() {
        assert_close(ledger_with(50.0, 50.0).compute_speed_multiplier(), 5.0);
    }

    #[test]
    fn empty_water_gives_min_speed() {
        assert_close(ledger_with(0.0, 50.0).compute_speed_multiplier(), 1.0);
    }

    #[test]
    fn full_sunlight_also_gives_min_speed() {
        assert_close(ledger_with(50.0, 100.0).compute_speed_multiplier(), 1.0);
    }

    #[test]
    fn more_extreme_resource_dominates() {
        // water deviation 0.2 costs 0.8, sunlight deviation 0.5 costs 2.0
        assert_close(ledger_with(60.0, 25.0).compute_speed_multiplier(), 3.0);
    }

    #[test]
    fn speed_is_symmetric_around_midpoint() {
        for k in [0.0_f32, 1.0, 12.5, 33.0, 50.0] {
            let below = ledger_with(50.0 - k, 50.0).compute_speed_multiplier();
            let above = ledger_with(50.0 + k, 50.0).compute_speed_multiplier();
            assert_close(below, above);

            let below = ledger_with(50.0, 50.0 - k).compute_speed_multiplier();
            let above = ledger_with(50.0, 50.0 + k).compute_speed_multiplier();
            assert_close(below, above);
        }
    }

    #[test]
    fn speed_stays_within_bounds_over_state_grid() {
        for water in (0..=100).step_by(5) {
            for sunlight in (0..=100).step_by(5) {
                let speed = ledger_with(water as f32, sunlight as f32).compute_speed_multiplier();
                assert!((1.0..=5.0).contains(&speed), "speed {speed} out of bounds");
            }
        }
    }

    #[test]
    fn tick_drains_and_high_drain_applies_multiplier() {
        let mut ledger = ledger_with(50.0, 50.0);
        ledger.tick(1.0, false);
        assert_close(ledger.water(), 49.0);
        assert_close(ledger.sunlight(), 49.0);

        ledger.tick(1.0, true);
        assert_close(ledger.water(), 47.0);
        assert_close(ledger.sunlight(), 47.0);
    }

    #[test]
    fn clamping_holds_over_mixed_mutation_sequence() {
        let mut ledger = ledger_with(3.0, 97.0);
        let steps: [(f32, f32, f32, bool); 6] = [
            (-10.0, 10.0, 0.5, false),
            (250.0, -300.0, 2.0, true),
            (-0.5, 0.5, 10.0, true),
            (f32::NAN, 4.0, 1.0, false),
            (80.0, 80.0, 0.0, false),
            (-1.0e9, 1.0e9, 100.0, true),
        ];
        for (water, sunlight, dt, high) in steps {
            ledger.add_water(water);
            ledger.add_sunlight(sunlight);
            ledger.tick(dt, high);
            for value in [ledger.water(), ledger.sunlight()] {
                assert!((0.0..=100.0).contains(&value), "{value} escaped range");
            }
        }
    }

    #[test]
    fn invalid_config_values_fall_back_to_sane_limits() {
        let ledger = ResourceLedger::new(&LedgerConfig {
            max_resource: -4.0,
            water: 400.0,
            min_speed: 6.0,
            max_speed: 2.0,
            ..LedgerConfig::default()
        });
        assert_eq!(ledger.max_resource(), 100.0);
        assert_eq!(ledger.water(), 100.0);
        assert_eq!(ledger.min_speed(), 2.0);
        assert_eq!(ledger.max_speed(), 6.0);
    }

    #[test]
    fn drain_window_restarts_and_expires() {
        let mut window = DrainWindow::new(0.5);
        assert!(!window.is_active());

        window.trigger();
        window.advance(0.25);
        assert!(window.is_active());
        window.trigger();
        window.advance(0.25);
        assert!(window.is_active());
        window.advance(0.25);
        assert!(!window.is_active());
    }
}
