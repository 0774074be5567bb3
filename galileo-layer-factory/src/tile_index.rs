//! Index of a tile in a tile pyramid.

use serde::{Deserialize, Serialize};

/// Index of a tile in the standard XYZ tile pyramid (origin at the top left corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    /// X index.
    pub x: i32,
    /// Y index, counted from the top.
    pub y: i32,
    /// Z level.
    pub z: u32,
}

impl TileIndex {
    /// Creates a new index.
    pub fn new(x: i32, y: i32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Y index counted from the bottom of the pyramid, as used by TMS servers.
    ///
    /// Levels above 62 are computed as if the level had `i64::MAX` rows.
    pub fn inverted_y(&self) -> i64 {
        let rows = 1i64
            .checked_shl(self.z)
            .filter(|rows| *rows > 0)
            .unwrap_or(i64::MAX);
        rows - i64::from(self.y) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_y() {
        assert_eq!(TileIndex::new(0, 0, 0).inverted_y(), 0);
        assert_eq!(TileIndex::new(3, 1, 2).inverted_y(), 2);
        assert_eq!(TileIndex::new(0, 0, 3).inverted_y(), 7);
    }

    #[test]
    fn inverted_y_deep_levels() {
        assert_eq!(TileIndex::new(0, 5, 31).inverted_y(), (1i64 << 31) - 6);
        assert_eq!(TileIndex::new(0, 5, 40).inverted_y(), (1i64 << 40) - 6);
        assert_eq!(TileIndex::new(0, 0, 63).inverted_y(), i64::MAX - 1);
        assert_eq!(TileIndex::new(0, 0, 200).inverted_y(), i64::MAX - 1);
    }
}
