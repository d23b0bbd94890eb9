/// Load-time configuration errors.
///
/// Raised while building a palette or a map, before any simulation runs.
/// Nothing in the per-tick resolvers can fail.

use thiserror::Error;

use super::geom::GridCoord;
use super::tile::TileVariant;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("cell size must be positive, got {width}x{height}")]
    ZeroCellSize { width: i32, height: i32 },

    #[error("tile {variant:?} has zero size ({width}x{height})")]
    ZeroSizeTile { variant: TileVariant, width: usize, height: usize },

    #[error("tile {variant:?} is {found:?}, expected the cell size {expected:?}")]
    TileSizeMismatch {
        variant: TileVariant,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("cell ({}, {}) references unknown tile {variant:?}", coord.col, coord.row)]
    UnknownVariant { coord: GridCoord, variant: TileVariant },

    #[error("palette has no tiles")]
    EmptyPalette,
}
