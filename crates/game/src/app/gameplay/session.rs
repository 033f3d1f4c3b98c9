use std::sync::{Arc, RwLock};

use tracing::warn;

/// Progress handed from an outgoing level to the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CarriedProgress {
    pub(crate) from_level: String,
    pub(crate) water: f32,
    pub(crate) sunlight: f32,
    pub(crate) inventory: Vec<String>,
}

/// Shared slot between the level scenes of one session.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionHandle {
    carried: Arc<RwLock<Option<CarriedProgress>>>,
}

impl SessionHandle {
    pub(crate) fn store(&self, progress: CarriedProgress) {
        match self.carried.write() {
            Ok(mut guard) => *guard = Some(progress),
            Err(poisoned) => {
                warn!(operation = "store", "session lock poisoned; recovered inner value");
                *poisoned.into_inner() = Some(progress);
            }
        }
    }

    pub(crate) fn take(&self) -> Option<CarriedProgress> {
        match self.carried.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => {
                warn!(operation = "take", "session lock poisoned; recovered inner value");
                poisoned.into_inner().take()
            }
        }
    }
}
