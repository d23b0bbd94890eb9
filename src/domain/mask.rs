/// Per-pixel solidity masks.
///
/// A mask is a dense `width * height` grid of booleans, row-major.
/// Tile masks are derived once at load and shared by reference; the actor
/// owns the small solid masks for its probes.

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SolidityMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl SolidityMask {
    /// Fully transparent mask.
    pub fn empty(width: usize, height: usize) -> Self {
        SolidityMask { width, height, bits: vec![false; width * height] }
    }

    /// Fully solid mask.
    pub fn filled(width: usize, height: usize) -> Self {
        SolidityMask { width, height, bits: vec![true; width * height] }
    }

    /// Build from a predicate over `(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut solid: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(solid(x, y));
            }
        }
        SolidityMask { width, height, bits }
    }

    /// Build from ASCII art: `#` is solid, anything else is clear.
    /// Width is the longest row; short rows are padded with clear pixels.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut mask = SolidityMask::empty(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Solidity at `(x, y)`. Out-of-range pixels are clear.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }

    pub fn set(&mut self, x: usize, y: usize, solid: bool) {
        if x < self.width && y < self.height {
            self.bits[y * self.width + x] = solid;
        }
    }

    /// Number of solid pixels.
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Number of pixels solid in both masks when `other`'s origin is placed
    /// at `offset` inside `self`.
    pub fn overlap_area(&self, other: &SolidityMask, offset: (i32, i32)) -> usize {
        let (ox, oy) = offset;
        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width as i32).min(self.width as i32);
        let y1 = (oy + other.height as i32).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }

        let mut area = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x, y) && other.get(x - ox, y - oy) {
                    area += 1;
                }
            }
        }
        area
    }

    /// Does any solid pixel overlap at `offset`? Stops at the first hit.
    pub fn overlaps(&self, other: &SolidityMask, offset: (i32, i32)) -> bool {
        let (ox, oy) = offset;
        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width as i32).min(self.width as i32);
        let y1 = (oy + other.height as i32).min(self.height as i32);
        (y0..y1).any(|y| (x0..x1).any(|x| self.get(x, y) && other.get(x - ox, y - oy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_pads_short_rows() {
        let m = SolidityMask::from_rows(&["#", "###"]);
        assert_eq!(m.width(), 3);
        assert_eq!(m.height(), 2);
        assert!(m.get(0, 0));
        assert!(!m.get(1, 0));
        assert_eq!(m.count(), 4);
    }

    #[test]
    fn out_of_range_is_clear() {
        let m = SolidityMask::filled(2, 2);
        assert!(!m.get(-1, 0));
        assert!(!m.get(0, 2));
    }

    #[test]
    fn overlap_area_counts_shared_pixels() {
        let tile = SolidityMask::from_rows(&[
            "....",
            "....",
            "..##",
            "####",
        ]);
        let bar = SolidityMask::filled(4, 1);
        assert_eq!(tile.overlap_area(&bar, (0, 0)), 0);
        assert_eq!(tile.overlap_area(&bar, (0, 2)), 2);
        assert_eq!(tile.overlap_area(&bar, (0, 3)), 4);
        assert_eq!(tile.overlap_area(&bar, (2, 3)), 2);
        assert_eq!(tile.overlap_area(&bar, (-3, 3)), 1);
    }

    #[test]
    fn overlap_outside_bounds_is_zero() {
        let tile = SolidityMask::filled(4, 4);
        let bar = SolidityMask::filled(4, 1);
        assert_eq!(tile.overlap_area(&bar, (4, 0)), 0);
        assert_eq!(tile.overlap_area(&bar, (0, -1)), 0);
        assert!(!tile.overlaps(&bar, (0, 4)));
        assert!(tile.overlaps(&bar, (-3, 0)));
    }
}
