mod input;
mod loop_runner;
mod metrics;
mod scene;
mod script;
mod timers;

pub use input::{InputAction, InputSnapshot, KeypadKey};
pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, InputSource, LoopConfig, LoopSummary, Pacing,
    StopReason,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    DebugInfoSnapshot, Entity, EntityId, EntityIdAllocator, Scene, SceneCommand, SceneKey,
    SceneMachine, SceneMachineError, SceneWorld, Transform, Vec3,
};
pub use script::{
    require_no_args, tokenize_line, CommandParseError, InputScript, RegisterCommandError,
    ScriptCommandRegistry, ScriptParseError, ScriptStep,
};
pub use timers::{DeferredQueue, TimerId};
