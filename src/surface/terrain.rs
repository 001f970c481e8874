//! Terrain provider seam.
//!
//! Height-field mesh generation and GPU geometry creation happen in the
//! provider; the surface only sees the per-tile summary it needs for culling,
//! level of detail and drawing.

use glam::DVec3;

use super::tiling::{GeographicTilingScheme, TileId};
use crate::math::{BoundingSphere, Ellipsoid};
use crate::scheduler::PendingRequest;

/// Opaque handle to GPU geometry owned by the terrain provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GeometryHandle(pub u64);

/// Terrain geometry for one tile, vertices stored relative to `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub center: DVec3,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub bounding_sphere_3d: BoundingSphere,
    /// Horizon-culling point in ellipsoid scaled space, if one could be computed
    pub occludee_point_in_scaled_space: Option<DVec3>,
    pub geometry: GeometryHandle,
}

pub trait TerrainProvider {
    fn ready(&self) -> bool;

    fn tiling_scheme(&self) -> &GeographicTilingScheme;

    /// Maximum geometric error, in meters, of tiles at `level`.
    fn level_maximum_geometric_error(&self, level: u32) -> f64;

    /// Requests mesh generation for `tile`. `None` when throttled.
    fn request_tile_geometry(&mut self, tile: TileId, distance: f64) -> Option<PendingRequest<TerrainMesh>>;

    /// Line geometry outlining the mesh triangles for debug drawing.
    fn create_wireframe(&mut self, _mesh: &TerrainMesh) -> Option<GeometryHandle> {
        None
    }

    fn release_geometry(&mut self, _geometry: GeometryHandle) {}
}

/// Heightmap quality factor used to estimate the level 0 error.
const HEIGHTMAP_TERRAIN_QUALITY: f64 = 0.25;

/// Geometric error of level 0 tiles for a heightmap with `tile_image_width` samples per row.
///
/// Each finer level halves the error.
pub fn estimated_level_zero_geometric_error(
    ellipsoid: &Ellipsoid,
    tile_image_width: u32,
    number_of_tiles_at_level_zero: u32,
) -> f64 {
    ellipsoid.maximum_radius() * std::f64::consts::TAU * HEIGHTMAP_TERRAIN_QUALITY
        / (tile_image_width as f64 * number_of_tiles_at_level_zero as f64)
}
