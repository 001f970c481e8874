//! Bounding spheres for tiles and draw commands

use glam::DVec3;

use super::projection::GeographicProjection;
use super::rectangle::Rectangle;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub const fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Sphere around a projected rectangle extruded between two heights.
    ///
    /// The result is in projected `(easting, northing, height)` coordinates; callers
    /// working in 2D scene space must permute it with [`Self::to_scene_2d`].
    pub fn from_rectangle_with_heights_2d(
        rectangle: &Rectangle,
        projection: &GeographicProjection,
        minimum_height: f64,
        maximum_height: f64,
    ) -> Self {
        let mut lower_left = projection.project(&rectangle.southwest());
        let mut upper_right = projection.project(&rectangle.northeast());
        lower_left.z = minimum_height;
        upper_right.z = maximum_height;

        let center = (lower_left + upper_right) * 0.5;
        let radius = (upper_right - lower_left).length() * 0.5;
        Self { center, radius }
    }

    /// Reorders a projected sphere into 2D scene axes: `(height, easting, northing)`.
    pub fn to_scene_2d(mut self) -> Self {
        let c = self.center;
        self.center = DVec3::new(c.z, c.x, c.y);
        self
    }

    /// Smallest sphere enclosing both spheres.
    pub fn union(&self, other: &BoundingSphere) -> BoundingSphere {
        let to_other = other.center - self.center;
        let separation = to_other.length();

        if self.radius >= separation + other.radius {
            return *self;
        }
        if other.radius >= separation + self.radius {
            return *other;
        }

        let half_span = (self.radius + separation + other.radius) * 0.5;
        let center = self.center + to_other * ((half_span - self.radius) / separation);
        BoundingSphere::new(center, half_span)
    }

    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        let d = ((self.center - point).length() - self.radius).max(0.0);
        d * d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_both_spheres() {
        let a = BoundingSphere::new(DVec3::new(-5.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(DVec3::new(5.0, 0.0, 0.0), 2.0);
        let u = a.union(&b);
        assert!((u.radius - 6.5).abs() < 1e-12);
        assert!((u.center - DVec3::new(0.5, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn union_with_contained_sphere_is_identity() {
        let outer = BoundingSphere::new(DVec3::ZERO, 10.0);
        let inner = BoundingSphere::new(DVec3::new(1.0, 1.0, 0.0), 1.0);
        assert_eq!(outer.union(&inner), outer);
        assert_eq!(inner.union(&outer), outer);
    }

    #[test]
    fn rectangle_sphere_is_permuted_for_scene_2d() {
        let projection = GeographicProjection::default();
        let rect = Rectangle::new(0.0, 0.0, 0.1, 0.1);
        let projected =
            BoundingSphere::from_rectangle_with_heights_2d(&rect, &projection, 0.0, 100.0);
        let scene = projected.to_scene_2d();
        assert_eq!(scene.center.x, 50.0);
        assert_eq!(scene.center.y, projected.center.x);
        assert_eq!(scene.center.z, projected.center.y);
        assert_eq!(scene.radius, projected.radius);
    }
}
