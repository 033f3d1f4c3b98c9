use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    /// Mean wall time spent inside one scene update.
    pub tick_time_ms: f32,
    pub ticks_total: u64,
}

/// Shared read handle onto the most recent loop metrics.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    ticks: u32,
    ticks_total: u64,
    tick_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    fn starting_at(interval_start: Instant, interval: Duration) -> Self {
        Self {
            interval_start,
            interval,
            ticks: 0,
            ticks_total: 0,
            tick_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_tick(&mut self, tick_duration: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.ticks_total = self.ticks_total.saturating_add(1);
        self.tick_time_sum = self.tick_time_sum.saturating_add(tick_duration);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        if now.saturating_duration_since(self.interval_start) < self.interval {
            return None;
        }
        Some(self.flush(now))
    }

    /// Closes the current interval early; used once the loop stops.
    pub(crate) fn flush(&mut self, now: Instant) -> LoopMetricsSnapshot {
        let elapsed = now.saturating_duration_since(self.interval_start);
        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let tick_time_ms = if self.ticks == 0 {
            0.0
        } else {
            (self.tick_time_sum.as_secs_f32() / self.ticks as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            tick_time_ms,
            ticks_total: self.ticks_total,
        };

        self.interval_start = now;
        self.ticks = 0;
        self.tick_time_sum = Duration::ZERO;

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<LoopMetricsSnapshot>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn snapshot_averages_tick_time_and_keeps_running_total() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));

        accumulator.record_tick(Duration::from_millis(2));
        accumulator.record_tick(Duration::from_millis(4));
        let first = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");
        assert!((first.tps - 2.0).abs() < 0.05);
        assert!((first.tick_time_ms - 3.0).abs() < 0.001);
        assert_eq!(first.ticks_total, 2);

        accumulator.record_tick(Duration::from_millis(1));
        let second = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second snapshot");
        assert_eq!(second.ticks_total, 3);
        assert!((second.tps - 1.0).abs() < 0.05);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn flush_closes_a_partial_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(2));
        accumulator.record_tick(Duration::from_millis(2));

        let snapshot = accumulator.flush(base + Duration::from_millis(500));
        assert_eq!(snapshot.ticks_total, 2);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.tick_time_ms - 2.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());
    }

    #[test]
    fn publish_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let expected = LoopMetricsSnapshot {
            tps: 60.0,
            tick_time_ms: 0.5,
            ticks_total: 120,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
