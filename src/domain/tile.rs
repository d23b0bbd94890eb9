/// Tile variants, height profiles and the tile palette.
///
/// Every palette entry carries two read-only derivations of its image:
/// the solidity mask (exact overlap tests) and the height profile (exact
/// resting height per column). Both are built once when the palette is
/// created and shared by every cell using that variant.

use tracing::debug;

use super::error::MapError;
use super::mask::SolidityMask;

/// Index into the palette.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TileVariant(pub u16);

/// Height of the solid run touching the tile's bottom edge, per column.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HeightProfile {
    heights: Vec<u32>,
}

impl HeightProfile {
    /// Scan each column upward from the bottom row and count the solid
    /// pixels before the first clear one.
    pub fn from_mask(mask: &SolidityMask) -> Self {
        let h = mask.height() as i32;
        let heights = (0..mask.width() as i32)
            .map(|x| (0..h).rev().take_while(|&y| mask.get(x, y)).count() as u32)
            .collect();
        HeightProfile { heights }
    }

    /// Surface height at column `x`. Columns outside the tile have no surface.
    #[inline]
    pub fn at(&self, x: i32) -> u32 {
        if x < 0 {
            return 0;
        }
        self.heights.get(x as usize).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heights.len()
    }

    #[cfg(test)]
    pub(crate) fn as_slice(&self) -> &[u32] {
        &self.heights
    }
}

/// Built-in tile shapes. Each is defined by its surface height per column,
/// so the generated mask's profile equals the shape's height function.
///
/// "Up" shapes rise toward the right, "Down" shapes toward the left.
/// Gentle slopes span two cells: Low then High (or High then Low).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileShape {
    Block,
    HalfBlock,
    SlopeUp,
    SlopeDown,
    GentleUpLow,
    GentleUpHigh,
    GentleDownHigh,
    GentleDownLow,
}

impl TileShape {
    pub const ALL: [TileShape; 8] = [
        TileShape::Block,
        TileShape::HalfBlock,
        TileShape::SlopeUp,
        TileShape::SlopeDown,
        TileShape::GentleUpLow,
        TileShape::GentleUpHigh,
        TileShape::GentleDownHigh,
        TileShape::GentleDownLow,
    ];

    /// Level-file glyph.
    pub fn glyph(self) -> char {
        match self {
            TileShape::Block => '#',
            TileShape::HalfBlock => '=',
            TileShape::SlopeUp => '/',
            TileShape::SlopeDown => '\\',
            TileShape::GentleUpLow => 'a',
            TileShape::GentleUpHigh => 'b',
            TileShape::GentleDownHigh => 'c',
            TileShape::GentleDownLow => 'd',
        }
    }

    pub fn from_glyph(ch: char) -> Option<TileShape> {
        TileShape::ALL.into_iter().find(|s| s.glyph() == ch)
    }

    /// Surface height at column `x` of a `w x h` tile, in `[0, h]`.
    pub fn height_at(self, x: usize, w: usize, h: usize) -> usize {
        let rise = (x + 1) * h / w;
        let fall = (w - x) * h / w;
        let height = match self {
            TileShape::Block => h,
            TileShape::HalfBlock => h / 2,
            TileShape::SlopeUp => rise,
            TileShape::SlopeDown => fall,
            TileShape::GentleUpLow => rise / 2,
            TileShape::GentleUpHigh => h / 2 + rise / 2,
            TileShape::GentleDownHigh => h / 2 + fall / 2,
            TileShape::GentleDownLow => fall / 2,
        };
        height.min(h)
    }

    /// Generate the shape's mask: pixel `(x, y)` is solid below the surface.
    pub fn mask(self, w: usize, h: usize) -> SolidityMask {
        SolidityMask::from_fn(w, h, |x, y| y >= h - self.height_at(x, w, h))
    }
}

/// One palette entry.
#[derive(Clone, Debug)]
pub struct TileDef {
    pub shape: Option<TileShape>,
    pub mask: SolidityMask,
    pub profile: HeightProfile,
}

impl TileDef {
    /// Derive the height profile from the mask. Zero-size tiles are rejected.
    pub fn new(variant: TileVariant, mask: SolidityMask) -> Result<Self, MapError> {
        if mask.width() == 0 || mask.height() == 0 {
            return Err(MapError::ZeroSizeTile {
                variant,
                width: mask.width(),
                height: mask.height(),
            });
        }
        let profile = HeightProfile::from_mask(&mask);
        Ok(TileDef { shape: None, mask, profile })
    }
}

/// Fixed set of tile images a map may reference.
#[derive(Clone, Debug)]
pub struct Palette {
    tiles: Vec<TileDef>,
}

impl Palette {
    /// Palette from arbitrary masks; variant ids follow the input order.
    pub fn new(masks: Vec<SolidityMask>) -> Result<Self, MapError> {
        if masks.is_empty() {
            return Err(MapError::EmptyPalette);
        }
        let tiles = masks
            .into_iter()
            .enumerate()
            .map(|(i, mask)| TileDef::new(TileVariant(i as u16), mask))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(tiles = tiles.len(), "palette built");
        Ok(Palette { tiles })
    }

    /// The procedural palette: one variant per `TileShape`, in `ALL` order.
    pub fn builtin(cell_w: usize, cell_h: usize) -> Result<Self, MapError> {
        let mut palette = Palette::new(
            TileShape::ALL.iter().map(|s| s.mask(cell_w, cell_h)).collect(),
        )?;
        for (def, shape) in palette.tiles.iter_mut().zip(TileShape::ALL) {
            def.shape = Some(shape);
        }
        Ok(palette)
    }

    pub fn get(&self, variant: TileVariant) -> Option<&TileDef> {
        self.tiles.get(variant.0 as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileVariant, &TileDef)> {
        self.tiles.iter().enumerate().map(|(i, t)| (TileVariant(i as u16), t))
    }

    /// Variant carrying the given built-in shape, if any.
    pub fn variant_for(&self, shape: TileShape) -> Option<TileVariant> {
        self.iter().find(|(_, t)| t.shape == Some(shape)).map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn transparent_column_is_zero_and_solid_column_is_full() {
        let mask = SolidityMask::from_rows(&[
            ".#",
            ".#",
            ".#",
        ]);
        let p = HeightProfile::from_mask(&mask);
        assert_eq!(p.as_slice(), &[0, 3]);
    }

    #[test]
    fn only_the_run_touching_the_bottom_counts() {
        let mask = SolidityMask::from_rows(&[
            "##.",
            "...",
            "#.#",
            "###",
        ]);
        let p = HeightProfile::from_mask(&mask);
        assert_eq!(p.as_slice(), &[2, 1, 2]);
    }

    #[test]
    fn zero_size_tile_is_rejected() {
        let err = TileDef::new(TileVariant(3), SolidityMask::empty(0, 32)).unwrap_err();
        assert_eq!(err, MapError::ZeroSizeTile { variant: TileVariant(3), width: 0, height: 32 });
        assert!(matches!(
            Palette::new(vec![SolidityMask::filled(4, 4), SolidityMask::empty(4, 0)]),
            Err(MapError::ZeroSizeTile { variant: TileVariant(1), .. })
        ));
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(Palette::new(vec![]).unwrap_err(), MapError::EmptyPalette);
    }

    #[test]
    fn builtin_slopes_have_expected_profiles() {
        let palette = Palette::builtin(32, 32).unwrap();
        let profile = |s| &palette.get(palette.variant_for(s).unwrap()).unwrap().profile;

        assert!(profile(TileShape::Block).as_slice().iter().all(|&h| h == 32));
        assert!(profile(TileShape::HalfBlock).as_slice().iter().all(|&h| h == 16));
        assert_eq!(profile(TileShape::SlopeUp).at(0), 1);
        assert_eq!(profile(TileShape::SlopeUp).at(31), 32);
        assert_eq!(profile(TileShape::SlopeDown).at(0), 32);
        assert_eq!(profile(TileShape::SlopeDown).at(31), 1);
        // Gentle pairs join without a step.
        assert_eq!(profile(TileShape::GentleUpLow).at(31), 16);
        assert_eq!(profile(TileShape::GentleUpHigh).at(0), 16);
        assert_eq!(profile(TileShape::GentleDownHigh).at(31), 16);
        assert_eq!(profile(TileShape::GentleDownLow).at(0), 16);
    }

    #[test]
    fn glyphs_round_trip() {
        for shape in TileShape::ALL {
            assert_eq!(TileShape::from_glyph(shape.glyph()), Some(shape));
        }
        assert_eq!(TileShape::from_glyph('P'), None);
    }

    #[test]
    fn profile_outside_tile_is_zero() {
        let p = HeightProfile::from_mask(&SolidityMask::filled(4, 4));
        assert_eq!(p.at(-1), 0);
        assert_eq!(p.at(4), 0);
    }

    proptest! {
        #[test]
        fn profile_len_is_width_and_values_are_bounded(
            w in 1usize..40,
            h in 1usize..40,
            seed in any::<u64>(),
        ) {
            let mut state = seed | 1;
            let mask = SolidityMask::from_fn(w, h, |_, _| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state & 1 == 1
            });
            let p = HeightProfile::from_mask(&mask);
            prop_assert_eq!(p.len(), w);
            prop_assert!(p.as_slice().iter().all(|&v| v as usize <= h));
        }

        #[test]
        fn builtin_shapes_stay_in_bounds(w in 1usize..64, h in 1usize..64) {
            for shape in TileShape::ALL {
                let p = HeightProfile::from_mask(&shape.mask(w, h));
                prop_assert_eq!(p.len(), w);
                for x in 0..w {
                    prop_assert_eq!(p.at(x as i32) as usize, shape.height_at(x, w, h));
                }
            }
        }
    }
}
