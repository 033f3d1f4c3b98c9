use std::io::{self, Read};
use std::path::PathBuf;

use engine::{
    require_no_args, resolve_app_paths, InputScript, InputSnapshot, LoopConfig,
    RegisterCommandError, Scene, SceneKey, ScriptCommandRegistry, ScriptParseError, ScriptStep,
    StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, LevelConfigError};

const SCRIPT_ENV_VAR: &str = "WINDOWSILL_SCRIPT";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenes: Vec<(SceneKey, Box<dyn Scene>)>,
    pub(crate) start_scene: SceneKey,
    pub(crate) script: InputScript,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Level(#[from] LevelConfigError),
    #[error("level catalog is empty")]
    NoLevels,
    #[error("failed to read input script '{path}': {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read input script from stdin: {0}")]
    ReadStdin(#[source] io::Error),
    #[error(transparent)]
    Script(#[from] ScriptParseError),
    #[error("failed to register script command: {0}")]
    RegisterCommand(#[from] RegisterCommandError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Windowsill Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "app_paths_resolved");

    let (catalog, levels) = gameplay::load_levels(&paths.levels_dir)?;
    let start_scene = catalog
        .first()
        .map(SceneKey::new)
        .ok_or(BootstrapError::NoLevels)?;
    let scenes = gameplay::build_level_scenes(levels, &paths.saves_dir);

    let registry = script_registry()?;
    let script = InputScript::parse_with(&registry, &read_script_text()?)?;
    info!(
        start = %start_scene,
        levels = scenes.len(),
        script_steps = script.remaining_steps(),
        "app_wired"
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        scenes,
        start_scene,
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Builtin commands plus the game's panel and save controls.
fn script_registry() -> Result<ScriptCommandRegistry, RegisterCommandError> {
    let mut registry = ScriptCommandRegistry::with_builtins();
    registry.register("close_panel", "Close an open panel", "", |args| {
        require_no_args(args, "close_panel")?;
        Ok(ScriptStep::Press(
            InputSnapshot::empty().with_close_panel_pressed(true),
        ))
    })?;
    registry.register("save", "Write the current level's save", "", |args| {
        require_no_args(args, "save")?;
        Ok(ScriptStep::Press(InputSnapshot::empty().with_save_pressed(true)))
    })?;
    registry.register("load", "Restore the current level's save", "", |args| {
        require_no_args(args, "load")?;
        Ok(ScriptStep::Press(InputSnapshot::empty().with_load_pressed(true)))
    })?;
    Ok(registry)
}

fn read_script_text() -> Result<String, BootstrapError> {
    match std::env::var_os(SCRIPT_ENV_VAR) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            info!(path = %path.display(), "input_script_selected");
            std::fs::read_to_string(&path)
                .map_err(|source| BootstrapError::ReadScript { path, source })
        }
        None => {
            info!("input_script_from_stdin");
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(BootstrapError::ReadStdin)?;
            Ok(text)
        }
    }
}
