//! Quadtree addressing over a geographic (equirectangular) tiling scheme

use crate::math::{Cartographic, Ellipsoid, Rectangle};

/// Unique identifier for a tile in the quadtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Subdivision level (0 = coarsest)
    pub level: u32,
    /// Column, counted from the west edge
    pub x: u32,
    /// Row, counted from the north edge
    pub y: u32,
}

impl TileId {
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Get the parent tile at the next coarser level
    pub fn parent(self) -> Option<TileId> {
        if self.level == 0 {
            None
        } else {
            Some(TileId::new(self.level - 1, self.x / 2, self.y / 2))
        }
    }

    /// Get the four child tiles at the next finer level
    pub fn children(self) -> [TileId; 4] {
        let level = self.level + 1;
        let x = self.x * 2;
        let y = self.y * 2;
        [
            TileId::new(level, x, y),
            TileId::new(level, x + 1, y),
            TileId::new(level, x, y + 1),
            TileId::new(level, x + 1, y + 1),
        ]
    }
}

/// Tiling scheme where each level splits longitude and latitude evenly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicTilingScheme {
    ellipsoid: Ellipsoid,
    rectangle: Rectangle,
    level_zero_tiles_x: u32,
    level_zero_tiles_y: u32,
}

impl GeographicTilingScheme {
    /// Whole globe, two tiles wide and one tall at level 0.
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self::with_rectangle(ellipsoid, Rectangle::MAX_VALUE, 2, 1)
    }

    pub fn with_rectangle(
        ellipsoid: Ellipsoid,
        rectangle: Rectangle,
        level_zero_tiles_x: u32,
        level_zero_tiles_y: u32,
    ) -> Self {
        assert!(level_zero_tiles_x > 0 && level_zero_tiles_y > 0);
        Self {
            ellipsoid,
            rectangle,
            level_zero_tiles_x,
            level_zero_tiles_y,
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn rectangle(&self) -> &Rectangle {
        &self.rectangle
    }

    pub fn number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        self.level_zero_tiles_x << level
    }

    pub fn number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        self.level_zero_tiles_y << level
    }

    pub fn tile_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle {
        let tile_width = self.rectangle.width() / self.number_of_x_tiles_at_level(level) as f64;
        let tile_height = self.rectangle.height() / self.number_of_y_tiles_at_level(level) as f64;

        let west = self.rectangle.west + x as f64 * tile_width;
        let east = self.rectangle.west + (x + 1) as f64 * tile_width;
        let north = self.rectangle.north - y as f64 * tile_height;
        let south = self.rectangle.north - (y + 1) as f64 * tile_height;
        Rectangle::new(west, south, east, north)
    }

    /// Tile containing `position` at `level`, or `None` outside the scheme.
    pub fn position_to_tile_xy(&self, position: &Cartographic, level: u32) -> Option<(u32, u32)> {
        if !self.rectangle.contains(position) {
            return None;
        }

        let x_tiles = self.number_of_x_tiles_at_level(level);
        let y_tiles = self.number_of_y_tiles_at_level(level);
        let tile_width = self.rectangle.width() / x_tiles as f64;
        let tile_height = self.rectangle.height() / y_tiles as f64;

        let mut longitude = position.longitude;
        if self.rectangle.east < self.rectangle.west {
            longitude += std::f64::consts::TAU;
        }

        let x = (((longitude - self.rectangle.west) / tile_width).floor().max(0.0) as u32).min(x_tiles - 1);
        let y = (((self.rectangle.north - position.latitude) / tile_height).floor().max(0.0) as u32).min(y_tiles - 1);
        Some((x, y))
    }
}

impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self::new(Ellipsoid::WGS84)
    }
}
