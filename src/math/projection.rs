use glam::DVec3;

use super::ellipsoid::{Cartographic, Ellipsoid};

/// Equirectangular projection used by the 2D and Columbus view scene modes.
///
/// Projected coordinates are `(easting, northing, height)` in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicProjection {
    ellipsoid: Ellipsoid,
    semimajor_axis: f64,
}

impl GeographicProjection {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            semimajor_axis: ellipsoid.maximum_radius(),
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn project(&self, c: &Cartographic) -> DVec3 {
        DVec3::new(
            c.longitude * self.semimajor_axis,
            c.latitude * self.semimajor_axis,
            c.height,
        )
    }

    pub fn unproject(&self, p: DVec3) -> Cartographic {
        let inv = 1.0 / self.semimajor_axis;
        Cartographic::new(p.x * inv, p.y * inv, p.z)
    }
}

impl Default for GeographicProjection {
    fn default() -> Self {
        Self::new(Ellipsoid::WGS84)
    }
}
