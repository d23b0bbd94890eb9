/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::domain::entity::{Actor, ActorTunables};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: ActorTunables,
    /// Actor width and height in pixels.
    pub actor_size: (i32, i32),
    /// Cell width and height in pixels.
    pub cell_size: (i32, i32),
    pub tick_rate_ms: u64,
    pub levels_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), PathBuf::from(default_levels_dir()))
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    actor: TomlActor,
    #[serde(default)]
    map: TomlMap,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_speed")]
    speed: f32,
    #[serde(default = "default_jump_power")]
    jump_power: f32,
    #[serde(default = "default_jump_cut")]
    jump_cut: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_max_fall_speed")]
    max_fall_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlActor {
    #[serde(default = "default_actor_width")]
    width: i32,
    #[serde(default = "default_actor_height")]
    height: i32,
}

#[derive(Deserialize, Debug)]
struct TomlMap {
    #[serde(default = "default_cell_size")]
    cell_width: i32,
    #[serde(default = "default_cell_size")]
    cell_height: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_speed() -> f32 { 3.0 }
fn default_jump_power() -> f32 { -6.5 }
fn default_jump_cut() -> f32 { -3.0 }
fn default_gravity() -> f32 { 0.22 }
fn default_max_fall_speed() -> f32 { 16.0 }
fn default_actor_width() -> i32 { 21 }
fn default_actor_height() -> i32 { 15 }
fn default_cell_size() -> i32 { 32 }
fn default_tick_rate() -> u64 { 16 }          // ~60 ticks per second
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            speed: default_speed(),
            jump_power: default_jump_power(),
            jump_cut: default_jump_cut(),
            gravity: default_gravity(),
            max_fall_speed: default_max_fall_speed(),
        }
    }
}

impl Default for TomlActor {
    fn default() -> Self {
        TomlActor {
            width: default_actor_width(),
            height: default_actor_height(),
        }
    }
}

impl Default for TomlMap {
    fn default() -> Self {
        TomlMap {
            cell_width: default_cell_size(),
            cell_height: default_cell_size(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            levels_dir: default_levels_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();

        let toml_cfg = load_toml(&search_dirs);

        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig::from_toml(toml_cfg, levels_dir)
    }

    /// Parse a config document. Keys that are missing or out of range
    /// take their defaults; the levels directory is used as written.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        let levels_dir = PathBuf::from(&cfg.general.levels_dir);
        Ok(GameConfig::from_toml(cfg, levels_dir))
    }

    fn from_toml(cfg: TomlConfig, levels_dir: PathBuf) -> Self {
        let physics = ActorTunables {
            speed: cfg.physics.speed,
            jump_power: cfg.physics.jump_power,
            jump_cut: cfg.physics.jump_cut,
            gravity: cfg.physics.gravity,
            max_fall_speed: cfg.physics.max_fall_speed,
        };

        let mut actor_size = (cfg.actor.width, cfg.actor.height);
        if actor_size.0 < Actor::MIN_WIDTH || actor_size.1 < 1 {
            warn!(
                width = actor_size.0,
                height = actor_size.1,
                "actor size too small for its detectors, using defaults"
            );
            actor_size = (default_actor_width(), default_actor_height());
        }

        let mut cell_size = (cfg.map.cell_width, cfg.map.cell_height);
        if cell_size.0 <= 0 || cell_size.1 <= 0 {
            warn!(width = cell_size.0, height = cell_size.1, "cell size must be positive, using defaults");
            cell_size = (default_cell_size(), default_cell_size());
        }

        let tick_rate_ms = if cfg.general.tick_rate_ms == 0 {
            warn!("tick_rate_ms must be positive, using default");
            default_tick_rate()
        } else {
            cfg.general.tick_rate_ms
        };

        GameConfig { physics, actor_size, cell_size, tick_rate_ms, levels_dir }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        info!(path = %path.display(), "config loaded");
                        return cfg;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.physics, ActorTunables::default());
        assert_eq!(cfg.actor_size, (21, 15));
        assert_eq!(cfg.cell_size, (32, 32));
        assert_eq!(cfg.tick_rate_ms, 16);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse(
            "[physics]\ngravity = 0.5\n\n[general]\nlevels_dir = \"custom\"\n",
        )
        .unwrap();
        assert_eq!(cfg.physics.gravity, 0.5);
        assert_eq!(cfg.physics.speed, 3.0);
        assert_eq!(cfg.physics.jump_power, -6.5);
        assert_eq!(cfg.tick_rate_ms, 16);
        assert_eq!(cfg.levels_dir, PathBuf::from("custom"));
    }

    #[test]
    fn undersized_actor_falls_back() {
        let cfg = GameConfig::parse("[actor]\nwidth = 2\nheight = 40\n").unwrap();
        assert_eq!(cfg.actor_size, (21, 15));

        let cfg = GameConfig::parse("[actor]\nwidth = 12\nheight = 40\n").unwrap();
        assert_eq!(cfg.actor_size, (12, 40));
    }

    #[test]
    fn non_positive_cells_and_tick_rate_fall_back() {
        let cfg = GameConfig::parse("[map]\ncell_width = 0\n[general]\ntick_rate_ms = 0\n").unwrap();
        assert_eq!(cfg.cell_size, (32, 32));
        assert_eq!(cfg.tick_rate_ms, 16);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[physics\ngravity = ").is_err());
        assert!(GameConfig::parse("[physics]\ngravity = \"heavy\"\n").is_err());
    }
}
