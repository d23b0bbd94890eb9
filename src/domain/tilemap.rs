/// Spatial occupancy: which cells hold which tile, and where they are.
///
/// ## Provider contract
///
/// The resolvers only see a map through `TileMap`. Lookups by variant are
/// infallible: a provider must reject unknown variants when it is built,
/// never during a tick.
///
/// ## Cell geometry
///
/// Cell `(col, row)` covers pixels `[col*cw, (col+1)*cw) x [row*ch, (row+1)*ch)`.
/// Coordinates may be negative; lookups use floor division.

use std::collections::HashMap;

use tracing::debug;

use super::error::MapError;
use super::geom::{GridCoord, Rect};
use super::mask::SolidityMask;
use super::tile::{HeightProfile, Palette, TileDef, TileVariant};

/// What the collision core needs from a tile map.
pub trait TileMap {
    /// Pixel size of one cell.
    fn cell_size(&self) -> (i32, i32);

    /// Occupying variant, or `None` for an empty cell.
    fn cell_at(&self, coord: GridCoord) -> Option<TileVariant>;

    /// Occupied cells whose rectangle intersects `rect`, row-major.
    fn cells_intersecting(&self, rect: Rect) -> Vec<GridCoord>;

    /// Bounding rectangle of a cell in map pixels.
    fn rect_of(&self, coord: GridCoord) -> Rect {
        let (cw, ch) = self.cell_size();
        Rect::new(coord.col * cw, coord.row * ch, cw, ch)
    }

    fn height_profile(&self, variant: TileVariant) -> &HeightProfile;

    fn solidity_mask(&self, variant: TileVariant) -> &SolidityMask;
}

/// Immutable level geometry: palette + occupied cells.
#[derive(Clone, Debug)]
pub struct LevelMap {
    cell_w: i32,
    cell_h: i32,
    cols: i32,
    rows: i32,
    palette: Palette,
    cells: HashMap<GridCoord, TileVariant>,
}

impl LevelMap {
    /// Validate and build. Every referenced variant must exist in the
    /// palette and every tile image must match the cell size.
    pub fn new(
        cell_size: (i32, i32),
        palette: Palette,
        cells: impl IntoIterator<Item = (GridCoord, TileVariant)>,
    ) -> Result<Self, MapError> {
        let (cell_w, cell_h) = cell_size;
        if cell_w <= 0 || cell_h <= 0 {
            return Err(MapError::ZeroCellSize { width: cell_w, height: cell_h });
        }
        if palette.is_empty() {
            return Err(MapError::EmptyPalette);
        }

        let expected = (cell_w as usize, cell_h as usize);
        for (variant, def) in palette.iter() {
            let found = (def.mask.width(), def.mask.height());
            if found != expected {
                return Err(MapError::TileSizeMismatch { variant, expected, found });
            }
        }

        let mut map = HashMap::new();
        let (mut cols, mut rows) = (0, 0);
        for (coord, variant) in cells {
            if palette.get(variant).is_none() {
                return Err(MapError::UnknownVariant { coord, variant });
            }
            cols = cols.max(coord.col + 1);
            rows = rows.max(coord.row + 1);
            map.insert(coord, variant);
        }

        debug!(cells = map.len(), cols, rows, "level map built");
        Ok(LevelMap { cell_w, cell_h, cols, rows, palette, cells: map })
    }

    /// Grow the grid extent to at least `cols x rows`, for levels with
    /// empty margins on the right or bottom.
    pub fn with_grid_size(mut self, cols: i32, rows: i32) -> Self {
        self.cols = self.cols.max(cols);
        self.rows = self.rows.max(rows);
        self
    }

    /// Grid extent: one past the largest occupied column and row, or the
    /// size set by `with_grid_size` if larger.
    pub fn grid_size(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    /// Map extent in pixels.
    pub fn pixel_size(&self) -> (i32, i32) {
        let (cols, rows) = self.grid_size();
        (cols * self.cell_w, rows * self.cell_h)
    }

    #[cfg(test)]
    pub(crate) fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Cell containing map pixel `(px, py)`.
    #[inline]
    pub fn coord_at(&self, px: i32, py: i32) -> GridCoord {
        GridCoord::new(px.div_euclid(self.cell_w), py.div_euclid(self.cell_h))
    }

    /// Is map pixel `(px, py)` solid?
    pub fn pixel_solid(&self, px: i32, py: i32) -> bool {
        let coord = self.coord_at(px, py);
        match self.cell_at(coord) {
            Some(variant) => {
                let origin = self.rect_of(coord);
                self.solidity_mask(variant).get(px - origin.x, py - origin.y)
            }
            None => false,
        }
    }

    fn def(&self, variant: TileVariant) -> &TileDef {
        // Every stored variant was checked against the palette in `new`.
        match self.palette.get(variant) {
            Some(def) => def,
            None => unreachable!("variant {variant:?} was validated at load"),
        }
    }
}

impl TileMap for LevelMap {
    fn cell_size(&self) -> (i32, i32) {
        (self.cell_w, self.cell_h)
    }

    fn cell_at(&self, coord: GridCoord) -> Option<TileVariant> {
        self.cells.get(&coord).copied()
    }

    fn cells_intersecting(&self, rect: Rect) -> Vec<GridCoord> {
        if rect.is_empty() {
            return Vec::new();
        }
        let first = self.coord_at(rect.x, rect.y);
        let last = self.coord_at(rect.right() - 1, rect.bottom() - 1);

        let mut hits = Vec::new();
        for row in first.row..=last.row {
            for col in first.col..=last.col {
                let coord = GridCoord::new(col, row);
                if self.cells.contains_key(&coord) {
                    hits.push(coord);
                }
            }
        }
        hits
    }

    fn height_profile(&self, variant: TileVariant) -> &HeightProfile {
        &self.def(variant).profile
    }

    fn solidity_mask(&self, variant: TileVariant) -> &SolidityMask {
        &self.def(variant).mask
    }
}

/// 32px cells from glyph rows, builtin palette; unknown glyphs are empty.
#[cfg(test)]
pub(crate) fn ascii_map(rows: &[&str]) -> LevelMap {
    use super::tile::TileShape;

    let palette = Palette::builtin(32, 32).unwrap();
    let mut cells = vec![];
    for (row, line) in rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            if let Some(shape) = TileShape::from_glyph(ch) {
                let v = palette.variant_for(shape).unwrap();
                cells.push((GridCoord::new(col as i32, row as i32), v));
            }
        }
    }
    let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
    LevelMap::new((32, 32), palette, cells)
        .unwrap()
        .with_grid_size(cols, rows.len() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::TileShape;

    fn block_map(coords: &[(i32, i32)]) -> LevelMap {
        let palette = Palette::builtin(32, 32).unwrap();
        let block = palette.variant_for(TileShape::Block).unwrap();
        LevelMap::new(
            (32, 32),
            palette,
            coords.iter().map(|&(c, r)| (GridCoord::new(c, r), block)),
        )
        .unwrap()
    }

    #[test]
    fn cell_rect_follows_grid() {
        let map = block_map(&[(2, 1)]);
        assert_eq!(map.rect_of(GridCoord::new(2, 1)), Rect::new(64, 32, 32, 32));
        assert_eq!(map.rect_of(GridCoord::new(-1, 0)), Rect::new(-32, 0, 32, 32));
    }

    #[test]
    fn intersecting_returns_occupied_cells_row_major() {
        let map = block_map(&[(0, 0), (1, 0), (0, 1), (3, 3)]);
        let hits = map.cells_intersecting(Rect::new(10, 10, 40, 40));
        assert_eq!(
            hits,
            vec![GridCoord::new(0, 0), GridCoord::new(1, 0), GridCoord::new(0, 1)]
        );
    }

    #[test]
    fn intersecting_excludes_touching_cells() {
        let map = block_map(&[(1, 0)]);
        assert!(map.cells_intersecting(Rect::new(0, 0, 32, 32)).is_empty());
        assert_eq!(map.cells_intersecting(Rect::new(0, 0, 33, 1)), vec![GridCoord::new(1, 0)]);
    }

    #[test]
    fn intersecting_handles_negative_coordinates() {
        let map = block_map(&[(-1, -1)]);
        assert_eq!(map.cells_intersecting(Rect::new(-5, -5, 2, 2)), vec![GridCoord::new(-1, -1)]);
        assert!(map.cells_intersecting(Rect::new(-5, -5, 0, 2)).is_empty());
    }

    #[test]
    fn pixel_solid_reads_tile_mask() {
        let palette = Palette::builtin(32, 32).unwrap();
        let half = palette.variant_for(TileShape::HalfBlock).unwrap();
        let map = LevelMap::new((32, 32), palette, [(GridCoord::new(0, 0), half)]).unwrap();
        assert!(!map.pixel_solid(5, 15));
        assert!(map.pixel_solid(5, 16));
        assert!(!map.pixel_solid(40, 20));
    }

    #[test]
    fn unknown_variant_aborts_construction() {
        let palette = Palette::builtin(32, 32).unwrap();
        let err = LevelMap::new((32, 32), palette, [(GridCoord::new(1, 2), TileVariant(99))])
            .unwrap_err();
        assert_eq!(
            err,
            MapError::UnknownVariant { coord: GridCoord::new(1, 2), variant: TileVariant(99) }
        );
    }

    #[test]
    fn tile_size_must_match_cell_size() {
        let palette = Palette::builtin(16, 16).unwrap();
        let err = LevelMap::new((32, 32), palette, []).unwrap_err();
        assert!(matches!(err, MapError::TileSizeMismatch { expected: (32, 32), found: (16, 16), .. }));
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        let palette = Palette::builtin(32, 32).unwrap();
        assert!(matches!(
            LevelMap::new((0, 32), palette, []),
            Err(MapError::ZeroCellSize { .. })
        ));
    }

    #[test]
    fn grid_size_tracks_extent() {
        let map = block_map(&[(0, 0), (4, 2)]);
        assert_eq!(map.grid_size(), (5, 3));
        assert_eq!(map.pixel_size(), (160, 96));
    }
}
