use glam::{DMat4, DVec4};

use super::bounds::BoundingSphere;

/// Result of testing a volume against a set of planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersect {
    Outside,
    Intersecting,
    Inside,
}

/// Set of inward-facing planes `(normal, distance)`; a point `p` is inside a plane
/// when `normal · p + distance >= 0`.
#[derive(Debug, Clone, Default)]
pub struct CullingVolume {
    planes: Vec<DVec4>,
}

impl CullingVolume {
    pub fn new(planes: Vec<DVec4>) -> Self {
        Self { planes }
    }

    /// Frustum planes of a view-projection matrix with a `[0, 1]` depth range.
    pub fn from_view_projection(view_proj: &DMat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2]
            .into_iter()
            .map(|p| p / p.truncate().length())
            .collect();
        Self { planes }
    }

    pub fn planes(&self) -> &[DVec4] {
        &self.planes
    }

    pub fn compute_visibility(&self, sphere: &BoundingSphere) -> Intersect {
        let mut intersecting = false;
        for plane in &self.planes {
            let distance = plane.truncate().dot(sphere.center) + plane.w;
            if distance < -sphere.radius {
                return Intersect::Outside;
            }
            if distance < sphere.radius {
                intersecting = true;
            }
        }
        if intersecting {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }
}
