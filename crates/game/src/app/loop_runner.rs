use std::process::ExitCode;

use engine::{run_app_with_metrics, AppError, LoopSummary, MetricsHandle};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let metrics = MetricsHandle::default();
    match drive(app, &metrics) {
        Ok(summary) => {
            let loop_metrics = metrics.snapshot();
            info!(
                ticks = summary.ticks_run,
                final_scene = %summary.final_scene,
                stop_reason = ?summary.stop_reason,
                tps = loop_metrics.tps,
                tick_time_ms = loop_metrics.tick_time_ms,
                "run_finished"
            );
            if loop_metrics.ticks_total != summary.ticks_run {
                error!(
                    measured = loop_metrics.ticks_total,
                    ticks = summary.ticks_run,
                    "run_metrics_mismatch"
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                error = %err,
                ticks_before_failure = metrics.snapshot().ticks_total,
                "run_failed"
            );
            ExitCode::FAILURE
        }
    }
}

fn drive(mut app: AppWiring, metrics: &MetricsHandle) -> Result<LoopSummary, AppError> {
    run_app_with_metrics(
        app.config,
        app.scenes,
        app.start_scene,
        &mut app.script,
        metrics.clone(),
    )
}
