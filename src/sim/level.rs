/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   Line 1: `# Level Name` (optional)
///   Lines: map rows, one character per cell
///
/// ## Tile legend:
///   '#' = Block                  '=' = Half block
///   '/' = Slope up (45°)         '\' = Slope down (45°)
///   'a' = Gentle up, low half    'b' = Gentle up, high half
///   'c' = Gentle down, high half 'd' = Gentle down, low half
///   'P' = Actor spawn            ' ' or '.' = Empty
///
/// The actor spawns bottom-aligned in the `P` cell, centered horizontally,
/// airborne; its first ticks settle it onto whatever is below.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::error::MapError;
use crate::domain::geom::GridCoord;
use crate::domain::tile::{Palette, TileShape};
use crate::domain::tilemap::LevelMap;
use crate::sim::world::WorldState;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no map rows")]
    Empty,

    #[error("line {line}, column {col}: unknown glyph {glyph:?}")]
    UnknownGlyph { line: usize, col: usize, glyph: char },

    #[error("level has no spawn point 'P'")]
    MissingSpawn,

    #[error("line {line}, column {col}: second spawn point")]
    DuplicateSpawn { line: usize, col: usize },

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Parsed level text. Glyphs and the spawn are already validated.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
    pub spawn: GridCoord,
}

/// A level ready to play.
pub struct BuiltLevel {
    pub map: LevelMap,
    /// Top-left pixel of the actor at spawn.
    pub spawn: (i32, i32),
}

impl LevelDef {
    /// Build the map on the built-in palette and place the spawn for an
    /// actor of `actor_size`.
    pub fn build(&self, cell_size: (i32, i32), actor_size: (i32, i32)) -> Result<BuiltLevel, LevelError> {
        let (cw, ch) = cell_size;
        let palette = Palette::builtin(cw.max(0) as usize, ch.max(0) as usize)?;

        let mut cells = vec![];
        for (row, line) in self.rows.iter().enumerate() {
            for (col, glyph) in line.chars().enumerate() {
                let Some(shape) = TileShape::from_glyph(glyph) else { continue };
                if let Some(variant) = palette.variant_for(shape) {
                    cells.push((GridCoord::new(col as i32, row as i32), variant));
                }
            }
        }

        let cols = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let map = LevelMap::new(cell_size, palette, cells)?
            .with_grid_size(cols, self.rows.len() as i32);

        let spawn = (
            self.spawn.col * cw + (cw - actor_size.0) / 2,
            (self.spawn.row + 1) * ch - actor_size.1,
        );
        debug!(name = %self.name, ?spawn, "level built");
        Ok(BuiltLevel { map, spawn })
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Build the world on the first available level.
pub fn load_world(config: &GameConfig) -> Result<WorldState, LevelError> {
    let levels = load_levels(config);
    let def = levels.first().ok_or(LevelError::Empty)?;
    let built = def.build(config.cell_size, config.actor_size)?;

    let mut world = WorldState::new(built.map, built.spawn, config.physics, config.actor_size);
    world.level_name = def.name.clone();
    world.total_levels = levels.len();
    world.restart_level();
    world.set_message(&def.name, 120);
    Ok(world)
}

/// Load a level into the world state. Indices past the end wrap around.
pub fn load_level(world: &mut WorldState, level_idx: usize, config: &GameConfig) -> Result<(), LevelError> {
    let levels = load_levels(config);
    if levels.is_empty() {
        return Err(LevelError::Empty);
    }

    let idx = level_idx % levels.len();
    let def = &levels[idx];
    let built = def.build(config.cell_size, config.actor_size)?;

    world.current_level = idx;
    world.total_levels = levels.len();
    world.level_name = def.name.clone();
    world.replace_level(built.map, built.spawn);
    world.set_message(&def.name, 120);
    info!(level = idx, name = %def.name, "level loaded");
    Ok(())
}

/// Levels from the configured directory, or the embedded ones when the
/// directory is missing or holds no valid level.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir);
        if !levels.is_empty() {
            return levels;
        }
        warn!(dir = %dir.display(), "no playable levels found, using built-in levels");
    }
    embedded_levels()
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<(usize, String)> = vec![];

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if rows.is_empty() && name.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if !(rows.is_empty() && line.trim().is_empty()) {
            rows.push((idx + 1, line.to_string()));
        }
    }

    while rows.last().is_some_and(|(_, r)| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let mut spawn = None;
    for (row, (line_no, text)) in rows.iter().enumerate() {
        for (col, glyph) in text.chars().enumerate() {
            match glyph {
                'P' => {
                    if spawn.is_some() {
                        return Err(LevelError::DuplicateSpawn { line: *line_no, col: col + 1 });
                    }
                    spawn = Some(GridCoord::new(col as i32, row as i32));
                }
                ' ' | '.' => {}
                g if TileShape::from_glyph(g).is_some() => {}
                g => return Err(LevelError::UnknownGlyph { line: *line_no, col: col + 1, glyph: g }),
            }
        }
    }
    let spawn = spawn.ok_or(LevelError::MissingSpawn)?;

    let mut rows: Vec<String> = rows.into_iter().map(|(_, r)| r).collect();
    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        if len < max_width {
            row.extend(std::iter::repeat(' ').take(max_width - len));
        }
    }

    if name.is_empty() {
        name = "Untitled".to_string();
    }

    Ok(LevelDef { name, rows, spawn })
}

/// Distinguish `# Level Name` from `#ab##` (level data).
/// A name line starts with `#` and has at least one character that is not
/// a level glyph.
fn is_name_line(line: &str) -> bool {
    match line.strip_prefix('#') {
        Some(rest) => rest.chars().any(|c| !is_level_glyph(c)),
        None => false,
    }
}

fn is_level_glyph(c: char) -> bool {
    matches!(c, ' ' | '.' | 'P') || TileShape::from_glyph(c).is_some()
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

/// Read and parse one level file.
pub fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level(&content)
}

/// Every valid `.txt` level in `dir`, sorted by file name. Invalid files
/// are skipped with a warning.
pub fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), "could not list levels: {e}");
            return vec![];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "txt"))
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|path| match read_level_file(path) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(path = %path.display(), "skipping level: {e}");
                None
            }
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const ROLLING_HILLS: &str = "\
# Rolling Hills
........................
........................
........................
........................
........................
........................
..............ab##cd....
............ab######cd..
..P..=....ab##########cd
########################
";

const SWITCHBACKS: &str = "\
# Switchbacks
........................
........................
........................
........................
........................
........................
........................
...==.........==........
......................./
..................../###
.P..../###\\......./#####
########################
";

pub fn embedded_levels() -> Vec<LevelDef> {
    [ROLLING_HILLS, SWITCHBACKS]
        .into_iter()
        .filter_map(|text| match parse_level(text) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!("built-in level rejected: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tilemap::TileMap;

    #[test]
    fn parses_name_rows_and_spawn() {
        let def = parse_level("# Test Run\n....\n.P..\n#/##\n").unwrap();
        assert_eq!(def.name, "Test Run");
        assert_eq!(def.rows.len(), 3);
        assert_eq!(def.spawn, GridCoord::new(1, 1));
    }

    #[test]
    fn data_row_starting_with_hash_is_not_a_name() {
        let def = parse_level("#ab##\n.P...\n#####\n").unwrap();
        assert_eq!(def.name, "Untitled");
        assert_eq!(def.rows[0], "#ab##");
    }

    #[test]
    fn short_rows_are_padded_and_trailing_blanks_dropped() {
        let def = parse_level("# x\n.P\n#####\n\n\n").unwrap();
        assert_eq!(def.rows, vec![".P   ".to_string(), "#####".to_string()]);
    }

    #[test]
    fn errors_report_their_position() {
        match parse_level("# Bad\n.P..\n.?..\n") {
            Err(LevelError::UnknownGlyph { line: 3, col: 2, glyph: '?' }) => {}
            other => panic!("unexpected {other:?}"),
        }
        match parse_level("P..\n..P\n") {
            Err(LevelError::DuplicateSpawn { line: 2, col: 3 }) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_level("....\n####\n"), Err(LevelError::MissingSpawn)));
        assert!(matches!(parse_level("# Only a name\n\n"), Err(LevelError::Empty)));
    }

    #[test]
    fn build_places_cells_and_bottom_aligned_spawn() {
        let def = parse_level("....\n.P..\n#/##\n").unwrap();
        let built = def.build((32, 32), (21, 15)).unwrap();
        assert_eq!(built.spawn, (32 + 5, 64 - 15));
        assert_eq!(built.map.grid_size(), (4, 3));

        let palette = built.map.palette();
        assert_eq!(
            built.map.cell_at(GridCoord::new(1, 2)),
            palette.variant_for(TileShape::SlopeUp)
        );
        assert_eq!(built.map.cell_at(GridCoord::new(1, 1)), None);
    }

    #[test]
    fn empty_margins_count_toward_the_map_size() {
        let def = parse_level("......\n.P....\n##....\n......\n").unwrap();
        let built = def.build((32, 32), (21, 15)).unwrap();
        assert_eq!(built.map.grid_size(), (6, 4));
    }

    #[test]
    fn bad_cell_size_is_a_map_error() {
        let def = parse_level(".P\n##\n").unwrap();
        assert!(matches!(def.build((0, 32), (21, 15)), Err(LevelError::Map(_))));
    }

    #[test]
    fn embedded_levels_all_parse_and_build() {
        let levels = embedded_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].name, "Rolling Hills");
        assert_eq!(levels[1].name, "Switchbacks");
        for def in &levels {
            def.build((32, 32), (21, 15)).unwrap();
        }
    }

    #[test]
    fn missing_directory_falls_back_to_embedded() {
        let config = GameConfig {
            levels_dir: PathBuf::from("/nonexistent/sloperunner/levels"),
            ..GameConfig::default()
        };
        let levels = load_levels(&config);
        assert_eq!(levels[0].name, "Rolling Hills");
    }

    #[test]
    fn directory_levels_are_sorted_and_bad_files_skipped() {
        let dir = std::env::temp_dir().join(format!("sloperunner-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("02-second.txt"), "# Second\n.P\n##\n").unwrap();
        std::fs::write(dir.join("01-first.txt"), "# First\nP.\n##\n").unwrap();
        std::fs::write(dir.join("03-broken.txt"), "# Broken\n..\n##\n").unwrap();
        std::fs::write(dir.join("notes.md"), "not a level").unwrap();

        let names: Vec<String> = load_from_directory(&dir).into_iter().map(|d| d.name).collect();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(names, vec!["First".to_string(), "Second".to_string()]);
    }

    #[test]
    fn load_level_wraps_and_respawns() {
        let config = GameConfig {
            levels_dir: PathBuf::from("/nonexistent/sloperunner/levels"),
            ..GameConfig::default()
        };
        let mut world = load_world(&config).unwrap();
        assert_eq!(world.level_name, "Rolling Hills");
        assert_eq!(world.total_levels, 2);

        load_level(&mut world, 1, &config).unwrap();
        assert_eq!(world.level_name, "Switchbacks");
        assert_eq!(world.spawn, (32 + 5, 11 * 32 - 15));

        load_level(&mut world, 2, &config).unwrap();
        assert_eq!(world.current_level, 0);
        assert_eq!(world.level_name, "Rolling Hills");
    }
}
