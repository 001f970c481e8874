use glam::DVec3;

use super::ellipsoid::Ellipsoid;

/// Horizon culling against an ellipsoid.
///
/// Tests run in the ellipsoid's scaled space, where the ellipsoid is a unit sphere
/// and the horizon of the camera is a cone tangent to it.
#[derive(Debug, Clone, Copy)]
pub struct EllipsoidalOccluder {
    ellipsoid: Ellipsoid,
    camera_position: DVec3,
    camera_position_in_scaled_space: DVec3,
    distance_to_limb_in_scaled_space_squared: f64,
}

impl EllipsoidalOccluder {
    pub fn new(ellipsoid: Ellipsoid, camera_position: DVec3) -> Self {
        let mut occluder = Self {
            ellipsoid,
            camera_position: DVec3::ZERO,
            camera_position_in_scaled_space: DVec3::ZERO,
            distance_to_limb_in_scaled_space_squared: 0.0,
        };
        occluder.set_camera_position(camera_position);
        occluder
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn camera_position(&self) -> DVec3 {
        self.camera_position
    }

    pub fn set_camera_position(&mut self, camera_position: DVec3) {
        let cv = self.ellipsoid.transform_position_to_scaled_space(camera_position);
        self.camera_position = camera_position;
        self.camera_position_in_scaled_space = cv;
        self.distance_to_limb_in_scaled_space_squared = cv.length_squared() - 1.0;
    }

    /// Whether a point already transformed into scaled space is above the horizon.
    pub fn is_scaled_space_point_visible(&self, occludee_in_scaled_space: DVec3) -> bool {
        let cv = self.camera_position_in_scaled_space;
        let limb_sq = self.distance_to_limb_in_scaled_space_squared;
        let vt = occludee_in_scaled_space - cv;
        let vt_dot_vc = -vt.dot(cv);
        let occluded = vt_dot_vc > limb_sq && vt_dot_vc * vt_dot_vc / vt.length_squared() > limb_sq;
        !occluded
    }

    pub fn is_point_visible(&self, occludee: DVec3) -> bool {
        self.is_scaled_space_point_visible(self.ellipsoid.transform_position_to_scaled_space(occludee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_side_of_globe_is_occluded() {
        let ellipsoid = Ellipsoid::WGS84;
        let camera = DVec3::new(ellipsoid.radii.x * 3.0, 0.0, 0.0);
        let occluder = EllipsoidalOccluder::new(ellipsoid, camera);
        assert!(occluder.is_point_visible(DVec3::new(ellipsoid.radii.x, 0.0, 0.0)));
        assert!(!occluder.is_point_visible(DVec3::new(-ellipsoid.radii.x, 0.0, 0.0)));
    }

    #[test]
    fn scaled_space_point_above_limb_is_visible() {
        let occluder = EllipsoidalOccluder::new(Ellipsoid::new(1.0, 1.0, 1.0), DVec3::new(2.0, 0.0, 0.0));
        assert!(occluder.is_scaled_space_point_visible(DVec3::new(0.0, 1.5, 0.0)));
        assert!(!occluder.is_scaled_space_point_visible(DVec3::new(-1.5, 0.0, 0.0)));
    }
}
