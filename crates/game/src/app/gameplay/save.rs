use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{write_text_atomic, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::props::{EffectProgress, PropState};

pub(crate) const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SaveGame {
    pub(crate) save_version: u32,
    pub(crate) level_id: String,
    pub(crate) water: f32,
    pub(crate) sunlight: f32,
    pub(crate) inventory: Vec<String>,
    pub(crate) mission_cursor: usize,
    pub(crate) player_position: Vec3,
    pub(crate) props: Vec<SavedProp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SavedProp {
    pub(crate) name: String,
    pub(crate) state: PropState,
    pub(crate) has_fired: bool,
    pub(crate) mission_reported: bool,
    #[serde(default)]
    pub(crate) effect: EffectProgress,
}

#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("{action} save '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("parse save json{}: {source}", at_path(.json_path))]
    Parse {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
}

fn at_path(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

fn validation_err(path: impl Into<String>, message: impl Into<String>) -> SaveError {
    SaveError::Validation {
        path: path.into(),
        message: message.into(),
    }
}

fn expected_actual(
    path: impl Into<String>,
    expected: impl Display,
    actual: impl Display,
) -> SaveError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

pub(crate) fn save_file_path(saves_dir: &Path, level_id: &str) -> PathBuf {
    saves_dir.join(format!("{level_id}.save.json"))
}

pub(crate) fn write_save(path: &Path, save: &SaveGame) -> Result<(), SaveError> {
    let json = serde_json::to_string_pretty(save).map_err(SaveError::Encode)?;
    write_text_atomic(path, &json).map_err(|source| SaveError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_save(path: &Path) -> Result<SaveGame, SaveError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    parse_save_game_json(&raw)
}

pub(crate) fn parse_save_game_json(raw: &str) -> Result<SaveGame, SaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        SaveError::Parse {
            json_path,
            source: error.into_inner(),
        }
    })
}

/// Structural checks against the level the save is being applied to.
/// `prop_names` lists the level's props in declaration order.
pub(crate) fn validate_save_game(
    save: &SaveGame,
    expected_level: &str,
    prop_names: &[&str],
    mission_count: usize,
) -> Result<(), SaveError> {
    if save.save_version != SAVE_VERSION {
        return Err(expected_actual("save_version", SAVE_VERSION, save.save_version));
    }
    if save.level_id != expected_level {
        return Err(expected_actual("level_id", expected_level, &save.level_id));
    }
    for (path, value) in [
        ("water", save.water),
        ("sunlight", save.sunlight),
        ("player_position.x", save.player_position.x),
        ("player_position.y", save.player_position.y),
        ("player_position.z", save.player_position.z),
    ] {
        if !value.is_finite() {
            return Err(expected_actual(path, "finite number", value));
        }
    }
    if save.mission_cursor > mission_count {
        return Err(expected_actual(
            "mission_cursor",
            format!("<= {mission_count}"),
            save.mission_cursor,
        ));
    }
    if save.props.len() != prop_names.len() {
        return Err(expected_actual("props", prop_names.len(), save.props.len()));
    }

    let mut seen = HashSet::with_capacity(save.props.len());
    for (index, (saved, expected_name)) in save.props.iter().zip(prop_names).enumerate() {
        let path = format!("props[{index}].name");
        if saved.name != *expected_name {
            return Err(expected_actual(path, expected_name, &saved.name));
        }
        if !seen.insert(saved.name.as_str()) {
            return Err(validation_err(path, format!("duplicate prop '{}'", saved.name)));
        }
    }
    Ok(())
}
