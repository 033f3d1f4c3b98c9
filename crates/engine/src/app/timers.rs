#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct PendingTimer<T> {
    id: TimerId,
    remaining_seconds: f32,
    payload: T,
}

/// Payloads released after a delay measured in simulation time.
///
/// Nothing fires unless `tick` is called, so dropping or clearing the queue
/// cancels everything still pending.
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    next_id: u64,
    pending: Vec<PendingTimer<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn schedule(&mut self, delay_seconds: f32, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let remaining_seconds = if delay_seconds.is_finite() {
            delay_seconds.max(0.0)
        } else {
            0.0
        };
        self.pending.push(PendingTimer {
            id,
            remaining_seconds,
            payload,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        self.pending.len() != before
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|timer| !predicate(&timer.payload));
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn remaining_seconds(&self, id: TimerId) -> Option<f32> {
        self.pending
            .iter()
            .find(|timer| timer.id == id)
            .map(|timer| timer.remaining_seconds)
    }

    /// Advances every timer by `dt_seconds` and returns the expired payloads
    /// in the order they were scheduled.
    pub fn tick(&mut self, dt_seconds: f32) -> Vec<T> {
        let dt = if dt_seconds.is_finite() {
            dt_seconds.max(0.0)
        } else {
            0.0
        };
        let mut expired = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut timer in self.pending.drain(..) {
            timer.remaining_seconds -= dt;
            if timer.remaining_seconds <= 0.0 {
                expired.push(timer.payload);
            } else {
                still_pending.push(timer);
            }
        }
        self.pending = still_pending;
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_releases_expired_payloads_in_schedule_order() {
        let mut queue = DeferredQueue::default();
        queue.schedule(0.2, "late");
        queue.schedule(0.1, "early");
        queue.schedule(1.0, "never");

        assert!(queue.tick(0.05).is_empty());
        assert_eq!(queue.tick(0.2), vec!["late", "early"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut queue = DeferredQueue::default();
        queue.schedule(0.0, 1_u32);
        assert_eq!(queue.tick(0.0), vec![1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_and_cancel_where_drop_pending_payloads() {
        let mut queue = DeferredQueue::default();
        let first = queue.schedule(0.5, 1_u32);
        queue.schedule(0.5, 2_u32);
        queue.schedule(0.5, 3_u32);

        assert!(queue.cancel(first));
        assert!(!queue.cancel(first));
        assert_eq!(queue.cancel_where(|value| *value == 3), 1);
        assert_eq!(queue.tick(1.0), vec![2]);
    }

    #[test]
    fn invalid_delays_and_steps_are_sanitized() {
        let mut queue = DeferredQueue::default();
        let id = queue.schedule(f32::NAN, "nan");
        assert_eq!(queue.remaining_seconds(id), Some(0.0));

        queue.schedule(0.5, "half");
        assert_eq!(queue.tick(-3.0), vec!["nan"]);
        assert_eq!(queue.tick(f32::INFINITY), Vec::<&str>::new());
        assert_eq!(queue.len(), 1);
    }
}
