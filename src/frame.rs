//! Per-frame context shared by tile content and the surface provider.

use glam::{DMat4, DVec3};

use crate::math::{Cartographic, CullingVolume, Ellipsoid, EllipsoidalOccluder, GeographicProjection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneMode {
    Scene3D,
    ColumbusView,
    Scene2D,
    /// Transition between 3D and a projected mode.
    Morphing,
}

/// Camera state consumed by culling and distance computations.
///
/// In `Scene2D` and `ColumbusView`, `position_wc` is in projected scene axes
/// `(height, easting, northing)`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position_wc: DVec3,
    pub position_cartographic: Cartographic,
    pub view_matrix: DMat4,
}

impl Camera {
    pub fn new(position_wc: DVec3, position_cartographic: Cartographic, view_matrix: DMat4) -> Self {
        Self {
            position_wc,
            position_cartographic,
            view_matrix,
        }
    }

    /// 3D camera at a geodetic position looking at the ellipsoid center.
    pub fn at_cartographic(ellipsoid: &Ellipsoid, position: Cartographic) -> Self {
        let position_wc = ellipsoid.cartographic_to_cartesian(&position);
        let up = if position.latitude.abs() > 1.5 { DVec3::X } else { DVec3::Z };
        let view_matrix = DMat4::look_at_rh(position_wc, DVec3::ZERO, up);
        Self::new(position_wc, position, view_matrix)
    }
}

/// Attribution text contributed by imagery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credit {
    pub text: String,
}

impl Credit {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Credits collected while rendering one frame; duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct CreditDisplay {
    credits: Vec<Credit>,
}

impl CreditDisplay {
    pub fn add_credit(&mut self, credit: &Credit) {
        if !self.credits.contains(credit) {
            self.credits.push(credit.clone());
        }
    }

    pub fn credits(&self) -> &[Credit] {
        &self.credits
    }

    pub fn clear(&mut self) {
        self.credits.clear();
    }
}

#[derive(Debug, Clone)]
pub struct FrameState {
    pub frame_number: u64,
    pub mode: SceneMode,
    /// 0 = fully projected, 1 = fully 3D.
    pub morph_time: f64,
    pub camera: Camera,
    pub culling_volume: CullingVolume,
    pub occluder: EllipsoidalOccluder,
    pub map_projection: GeographicProjection,
    pub credit_display: CreditDisplay,
}

impl FrameState {
    pub fn new(mode: SceneMode, camera: Camera, culling_volume: CullingVolume, ellipsoid: Ellipsoid) -> Self {
        Self {
            frame_number: 0,
            mode,
            morph_time: if mode == SceneMode::Scene3D { 1.0 } else { 0.0 },
            camera,
            culling_volume,
            occluder: EllipsoidalOccluder::new(ellipsoid, camera.position_wc),
            map_projection: GeographicProjection::new(ellipsoid),
            credit_display: CreditDisplay::default(),
        }
    }

    /// Advances to the next frame with a new camera.
    pub fn advance(&mut self, camera: Camera, culling_volume: CullingVolume) {
        self.frame_number += 1;
        self.camera = camera;
        self.culling_volume = culling_volume;
        if self.mode == SceneMode::Scene3D {
            self.occluder.set_camera_position(camera.position_wc);
        }
        self.credit_display.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_are_deduplicated() {
        let mut display = CreditDisplay::default();
        display.add_credit(&Credit::new("© Imagery"));
        display.add_credit(&Credit::new("© Imagery"));
        display.add_credit(&Credit::new("© Terrain"));
        assert_eq!(display.credits().len(), 2);
    }

    #[test]
    fn advance_clears_credits_and_counts_frames() {
        let ellipsoid = Ellipsoid::WGS84;
        let camera = Camera::at_cartographic(&ellipsoid, Cartographic::from_degrees(0.0, 0.0, 1e6));
        let mut frame = FrameState::new(SceneMode::Scene3D, camera, CullingVolume::default(), ellipsoid);
        frame.credit_display.add_credit(&Credit::new("x"));
        frame.advance(camera, CullingVolume::default());
        assert_eq!(frame.frame_number, 1);
        assert!(frame.credit_display.credits().is_empty());
    }
}
