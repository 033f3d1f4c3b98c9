use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::StartupError;

use super::metrics::MetricsAccumulator;
use super::scene::{SceneMachine, SceneMachineError};
use super::{InputSnapshot, MetricsHandle, Scene, SceneCommand, SceneKey, ScriptParseError};

/// Supplies one input snapshot per simulation tick. `None` ends the run.
pub trait InputSource {
    fn next_snapshot(&mut self) -> Option<InputSnapshot>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep so ticks track wall-clock time at `target_tps`.
    Realtime,
    /// One tick per loop iteration with no sleeping.
    AsFastAsPossible,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_ticks: Option<u64>,
    pub pacing: Pacing,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            pacing: Pacing::Realtime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    SceneQuit,
    InputExhausted,
    TickLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub final_scene: SceneKey,
    pub stop_reason: StopReason,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Script(#[from] ScriptParseError),
    #[error("scene machine failed: {0}")]
    Scene(#[from] SceneMachineError),
}

pub fn run_app(
    config: LoopConfig,
    scenes: Vec<(SceneKey, Box<dyn Scene>)>,
    start_scene: SceneKey,
    input: &mut dyn InputSource,
) -> Result<LoopSummary, AppError> {
    run_app_with_metrics(config, scenes, start_scene, input, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    scenes: Vec<(SceneKey, Box<dyn Scene>)>,
    start_scene: SceneKey,
    input: &mut dyn InputSource,
    metrics_handle: MetricsHandle,
) -> Result<LoopSummary, AppError> {
    let mut scenes = SceneMachine::new(scenes, start_scene)?;

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    scenes.load_active();
    scenes.apply_pending_active();
    info!(
        scene = %scenes.active_scene(),
        entity_count = active_entity_count(&scenes),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        pacing = ?config.pacing,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut ticks_run = 0u64;
    let mut last_title: Option<String> = None;

    let stop_reason = 'frames: loop {
        let ticks_this_frame = match config.pacing {
            Pacing::AsFastAsPossible => 1,
            Pacing::Realtime => {
                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;
                accumulator =
                    accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                accumulator = step_plan.remaining_accumulator;
                if step_plan.dropped_backlog > Duration::ZERO {
                    warn!(
                        dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                        max_ticks_per_frame, "sim_clamp_triggered"
                    );
                }
                step_plan.ticks_to_run
            }
        };

        for _ in 0..ticks_this_frame {
            if config.max_ticks.is_some_and(|limit| ticks_run >= limit) {
                break 'frames StopReason::TickLimit;
            }
            let Some(input_snapshot) = input.next_snapshot() else {
                break 'frames StopReason::InputExhausted;
            };
            if input_snapshot.quit_requested() {
                info!(reason = "input_quit", "shutdown_requested");
                break 'frames StopReason::QuitRequested;
            }

            let tick_started = Instant::now();
            let command = scenes.update_active(fixed_dt_seconds, &input_snapshot);
            scenes.apply_pending_active();
            ticks_run = ticks_run.saturating_add(1);

            let switched = match command {
                SceneCommand::None => false,
                SceneCommand::SwitchTo(next_scene) => scenes.switch_to(&next_scene)?,
                SceneCommand::HardResetTo(next_scene) => {
                    scenes.hard_reset_to(&next_scene)?;
                    true
                }
                SceneCommand::Quit => {
                    info!(reason = "scene_quit", "shutdown_requested");
                    metrics_accumulator.record_tick(tick_started.elapsed());
                    break 'frames StopReason::SceneQuit;
                }
            };
            if switched {
                scenes.apply_pending_active();
                info!(
                    scene = %scenes.active_scene(),
                    entity_count = active_entity_count(&scenes),
                    "scene_switched"
                );
            }
            metrics_accumulator.record_tick(tick_started.elapsed());

            let next_title = scenes.debug_title_active();
            if next_title != last_title {
                if let Some(title) = &next_title {
                    debug!(title = title.as_str(), "scene_title_changed");
                }
                last_title = next_title;
            }
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                ticks_total = snapshot.ticks_total,
                entity_count = active_entity_count(&scenes),
                scene = %scenes.active_scene(),
                "loop_metrics"
            );
        }

        if config.pacing == Pacing::Realtime {
            let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            let pause = compute_pace_sleep(elapsed, fixed_dt);
            if pause > Duration::ZERO {
                thread::sleep(pause);
            }
        }
    };

    metrics_handle.publish(metrics_accumulator.flush(Instant::now()));

    if let Some(debug_info) = scenes.debug_info_snapshot_active() {
        debug!(
            entity_count = debug_info.entity_count,
            interactable_count = debug_info.interactable_count,
            system_order = debug_info.system_order.as_str(),
            "final_debug_info"
        );
    }
    let final_scene = scenes.active_scene().clone();
    scenes.shutdown_all();
    info!(ticks_run, stop_reason = ?stop_reason, scene = %final_scene, "shutdown");

    Ok(LoopSummary {
        ticks_run,
        final_scene,
        stop_reason,
    })
}

fn active_entity_count(scenes: &SceneMachine) -> usize {
    scenes.active_world().map_or(0, |world| world.entity_count())
}

struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pace_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
