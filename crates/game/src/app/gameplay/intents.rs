use super::props::PropId;

/// Requests raised during interaction dispatch and applied by the scene at
/// a safe point later in the same tick.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GameplayIntent {
    CompleteMission { prop: PropId },
    CollectItem { prop: PropId, item: String },
    ScheduleHideMessage { prop: PropId, seconds: f32 },
    RequestLevel { prop: PropId, target_level: String, delay_seconds: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameplayIntentKind {
    CompleteMission,
    CollectItem,
    ScheduleHideMessage,
    RequestLevel,
}

impl GameplayIntent {
    pub(crate) fn kind(&self) -> GameplayIntentKind {
        match self {
            Self::CompleteMission { .. } => GameplayIntentKind::CompleteMission,
            Self::CollectItem { .. } => GameplayIntentKind::CollectItem,
            Self::ScheduleHideMessage { .. } => GameplayIntentKind::ScheduleHideMessage,
            Self::RequestLevel { .. } => GameplayIntentKind::RequestLevel,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GameplayIntentApplyStats {
    pub(crate) total: u32,
    pub(crate) complete_mission: u32,
    pub(crate) collect_item: u32,
    pub(crate) schedule_hide_message: u32,
    pub(crate) request_level: u32,
    pub(crate) rejected: u32,
}

impl GameplayIntentApplyStats {
    pub(crate) fn record_intent(&mut self, kind: GameplayIntentKind) {
        self.total = self.total.saturating_add(1);
        let counter = match kind {
            GameplayIntentKind::CompleteMission => &mut self.complete_mission,
            GameplayIntentKind::CollectItem => &mut self.collect_item,
            GameplayIntentKind::ScheduleHideMessage => &mut self.schedule_hide_message,
            GameplayIntentKind::RequestLevel => &mut self.request_level,
        };
        *counter = counter.saturating_add(1);
    }

    pub(crate) fn record_rejected(&mut self) {
        self.rejected = self.rejected.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub(crate) struct GameplayIntentQueue {
    intents: Vec<GameplayIntent>,
    last_tick_apply_stats: GameplayIntentApplyStats,
}

impl GameplayIntentQueue {
    pub(crate) fn enqueue(&mut self, intent: GameplayIntent) {
        self.intents.push(intent);
    }

    pub(crate) fn drain_current_tick(&mut self) -> Vec<GameplayIntent> {
        std::mem::take(&mut self.intents)
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[GameplayIntent] {
        &self.intents
    }

    pub(crate) fn set_last_tick_apply_stats(&mut self, stats: GameplayIntentApplyStats) {
        self.last_tick_apply_stats = stats;
    }

    pub(crate) fn last_tick_apply_stats(&self) -> GameplayIntentApplyStats {
        self.last_tick_apply_stats
    }
}
