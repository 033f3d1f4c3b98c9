use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use engine::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::interaction::DEFAULT_INTERACT_RADIUS;
use super::keypad::{KeypadConfig, PASSCODE_LENGTH};
use super::missions::MissionSpec;
use super::movement::LocomotionConfig;
use super::props::{EffectSpec, PropSpec};
use super::resources::LedgerConfig;

pub(crate) const CATALOG_FILE: &str = "index.json";

/// Whether resources and inventory survive a level change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ProgressScope {
    #[default]
    PerLevel,
    PerSession,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelConfig {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) display_name: String,
    pub(crate) player_spawn: Vec3,
    #[serde(default = "default_interact_radius")]
    pub(crate) interact_radius: f32,
    #[serde(default)]
    pub(crate) ledger: LedgerConfig,
    #[serde(default)]
    pub(crate) locomotion: LocomotionConfig,
    #[serde(default)]
    pub(crate) progress_scope: ProgressScope,
    #[serde(default)]
    pub(crate) keypad: Option<KeypadConfig>,
    #[serde(default)]
    pub(crate) props: Vec<PropSpec>,
    #[serde(default)]
    pub(crate) missions: Vec<MissionSpec>,
}

fn default_interact_radius() -> f32 {
    DEFAULT_INTERACT_RADIUS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelCatalog {
    pub(crate) levels: Vec<String>,
}

impl LevelCatalog {
    pub(crate) fn first(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.levels.iter().any(|level| level == id)
    }
}

#[derive(Debug, Error)]
pub(crate) enum LevelConfigError {
    #[error("read level file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse level json '{file}'{}: {source}", at_path(.json_path))]
    Parse {
        file: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level '{file}': validation failed at {path}: {message}")]
    Validate {
        file: PathBuf,
        path: String,
        message: String,
    },
}

fn at_path(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

impl LevelConfigError {
    fn invalid(file: &Path, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validate {
            file: file.to_path_buf(),
            path: path.into(),
            message: message.into(),
        }
    }

    fn expected_actual(
        file: &Path,
        path: impl Into<String>,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        Self::invalid(file, path, format!("expected {expected}, got {actual}"))
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    file: &Path,
) -> Result<T, LevelConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LevelConfigError::Parse {
            file: file.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

fn read_file(path: &Path) -> Result<String, LevelConfigError> {
    fs::read_to_string(path).map_err(|source| LevelConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn parse_catalog_json(raw: &str, file: &Path) -> Result<LevelCatalog, LevelConfigError> {
    let catalog: LevelCatalog = parse_json(raw, file)?;
    if catalog.levels.is_empty() {
        return Err(LevelConfigError::expected_actual(
            file,
            "levels",
            "at least one level",
            0,
        ));
    }
    let mut seen = HashSet::new();
    for (index, id) in catalog.levels.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(LevelConfigError::invalid(
                file,
                format!("levels[{index}]"),
                "empty level id",
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(LevelConfigError::invalid(
                file,
                format!("levels[{index}]"),
                format!("duplicate level id '{id}'"),
            ));
        }
    }
    Ok(catalog)
}

pub(crate) fn parse_level_json(raw: &str, file: &Path) -> Result<LevelConfig, LevelConfigError> {
    parse_json(raw, file)
}

/// Loads the catalog and every level it lists, validating each.
pub(crate) fn load_levels(
    levels_dir: &Path,
) -> Result<(LevelCatalog, Vec<LevelConfig>), LevelConfigError> {
    let catalog_path = levels_dir.join(CATALOG_FILE);
    let catalog = parse_catalog_json(&read_file(&catalog_path)?, &catalog_path)?;

    let mut levels = Vec::with_capacity(catalog.levels.len());
    for id in &catalog.levels {
        let path = levels_dir.join(format!("{id}.json"));
        let level = parse_level_json(&read_file(&path)?, &path)?;
        if &level.id != id {
            return Err(LevelConfigError::expected_actual(&path, "id", id, &level.id));
        }
        validate_level(&level, &catalog, &path)?;
        report_configuration_gaps(&level);
        info!(
            level = %level.id,
            props = level.props.len(),
            missions = level.missions.len(),
            "level_loaded"
        );
        levels.push(level);
    }
    Ok((catalog, levels))
}

fn require_finite(file: &Path, path: &str, value: f32) -> Result<(), LevelConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LevelConfigError::expected_actual(file, path, "finite number", value))
    }
}

fn require_non_negative(file: &Path, path: &str, value: f32) -> Result<(), LevelConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LevelConfigError::expected_actual(file, path, ">= 0", value))
    }
}

fn require_vec3(file: &Path, path: &str, value: Vec3) -> Result<(), LevelConfigError> {
    require_finite(file, &format!("{path}.x"), value.x)?;
    require_finite(file, &format!("{path}.y"), value.y)?;
    require_finite(file, &format!("{path}.z"), value.z)
}

fn require_known_level(
    file: &Path,
    path: &str,
    catalog: &LevelCatalog,
    target: &str,
) -> Result<(), LevelConfigError> {
    if catalog.contains(target) {
        Ok(())
    } else {
        Err(LevelConfigError::invalid(
            file,
            path,
            format!("unknown level '{target}'"),
        ))
    }
}

pub(crate) fn validate_level(
    level: &LevelConfig,
    catalog: &LevelCatalog,
    file: &Path,
) -> Result<(), LevelConfigError> {
    require_vec3(file, "player_spawn", level.player_spawn)?;
    require_non_negative(file, "interact_radius", level.interact_radius)?;

    let mut index_by_name: HashMap<&str, usize> = HashMap::with_capacity(level.props.len());
    for (index, prop) in level.props.iter().enumerate() {
        let base = format!("props[{index}]");
        if prop.name.trim().is_empty() {
            return Err(LevelConfigError::invalid(file, format!("{base}.name"), "empty prop name"));
        }
        if let Some(first) = index_by_name.insert(prop.name.as_str(), index) {
            return Err(LevelConfigError::invalid(
                file,
                format!("{base}.name"),
                format!("duplicate prop name '{}' (first seen at props[{first}])", prop.name),
            ));
        }
        require_vec3(file, &format!("{base}.position"), prop.position)?;
        require_non_negative(file, &format!("{base}.interact_range"), prop.interact_range)?;
        require_non_negative(file, &format!("{base}.transition_seconds"), prop.transition_seconds)?;
        if let Some(deposit) = &prop.deposit {
            require_finite(file, &format!("{base}.deposit.amount"), deposit.amount)?;
        }
        let effect = format!("{base}.effect");
        match &prop.effect {
            EffectSpec::ShowMessage { seconds, .. } => {
                require_non_negative(file, &format!("{effect}.seconds"), *seconds)?;
            }
            EffectSpec::PasscodeGate {
                seconds,
                target_level,
                ..
            } => {
                require_non_negative(file, &format!("{effect}.seconds"), *seconds)?;
                let path = format!("{effect}.target_level");
                require_known_level(file, &path, catalog, target_level)?;
            }
            EffectSpec::LoadLevel {
                target_level,
                delay_seconds,
            } => {
                require_non_negative(file, &format!("{effect}.delay_seconds"), *delay_seconds)?;
                let path = format!("{effect}.target_level");
                require_known_level(file, &path, catalog, target_level)?;
            }
            EffectSpec::None
            | EffectSpec::CollectItem { .. }
            | EffectSpec::CycleTracks { .. }
            | EffectSpec::OpenPanel => {}
        }
    }

    let mut targeted = HashSet::with_capacity(level.missions.len());
    for (index, mission) in level.missions.iter().enumerate() {
        let path = format!("missions[{index}].target");
        if !index_by_name.contains_key(mission.target.as_str()) {
            return Err(LevelConfigError::invalid(
                file,
                path,
                format!("unknown prop '{}'", mission.target),
            ));
        }
        if !targeted.insert(mission.target.as_str()) {
            return Err(LevelConfigError::invalid(
                file,
                path,
                format!("prop '{}' already targeted by an earlier mission", mission.target),
            ));
        }
    }

    if let Some(keypad) = &level.keypad {
        let passcode = &keypad.passcode;
        if passcode.len() != PASSCODE_LENGTH || !passcode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LevelConfigError::expected_actual(
                file,
                "keypad.passcode",
                format!("{PASSCODE_LENGTH} digits"),
                format!("'{passcode}'"),
            ));
        }
        let door = index_by_name
            .get(keypad.door.as_str())
            .and_then(|index| level.props.get(*index));
        match door {
            Some(prop) if matches!(prop.effect, EffectSpec::PasscodeGate { .. }) => {}
            Some(prop) => {
                return Err(LevelConfigError::invalid(
                    file,
                    "keypad.door",
                    format!("prop '{}' has no passcode_gate effect", prop.name),
                ));
            }
            None => {
                return Err(LevelConfigError::invalid(
                    file,
                    "keypad.door",
                    format!("unknown prop '{}'", keypad.door),
                ));
            }
        }
    }

    Ok(())
}

/// Mismatches between props and missions that still leave a playable level.
fn report_configuration_gaps(level: &LevelConfig) {
    let targets: HashSet<&str> = level
        .missions
        .iter()
        .map(|mission| mission.target.as_str())
        .collect();
    for prop in &level.props {
        let is_target = targets.contains(prop.name.as_str());
        if prop.completes_mission && !is_target {
            warn!(level = %level.id, prop = %prop.name, "mission_report_without_mission");
        }
        if is_target && !prop.completes_mission {
            warn!(level = %level.id, prop = %prop.name, "mission_target_never_completes");
        }
    }
}
