use std::path::Path;

use engine::{Scene, SceneKey};

mod cues;
mod intents;
mod interaction;
mod keypad;
pub(crate) mod level;
mod missions;
mod movement;
mod props;
mod resources;
mod save;
mod scene_impl;
mod session;

pub(crate) use level::{load_levels, LevelCatalog, LevelConfig, LevelConfigError};
use scene_impl::HouseScene;
use session::SessionHandle;

/// One scene per level. All scenes share a session slot so progress can
/// follow the player across level transitions.
pub(crate) fn build_level_scenes(
    levels: Vec<LevelConfig>,
    saves_dir: &Path,
) -> Vec<(SceneKey, Box<dyn Scene>)> {
    let session = SessionHandle::default();
    levels
        .into_iter()
        .map(|level| {
            let key = SceneKey::new(level.id.clone());
            let scene: Box<dyn Scene> =
                Box::new(HouseScene::new(level, saves_dir.to_path_buf(), session.clone()));
            (key, scene)
        })
        .collect()
}

#[cfg(test)]
mod tests;
