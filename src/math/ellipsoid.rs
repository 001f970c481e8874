use glam::{DMat4, DVec3, DVec4};

/// Geodetic position: longitude and latitude in radians, height in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    pub const fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }
}

/// Triaxial ellipsoid centered at the origin of the earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub radii: DVec3,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        radii: DVec3::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179),
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            radii: DVec3::new(x, y, z),
        }
    }

    pub fn radii_squared(&self) -> DVec3 {
        self.radii * self.radii
    }

    pub fn one_over_radii(&self) -> DVec3 {
        self.radii.recip()
    }

    pub fn maximum_radius(&self) -> f64 {
        self.radii.max_element()
    }

    /// Unit normal of the ellipsoid surface below a geodetic position.
    pub fn geodetic_surface_normal_cartographic(&self, c: &Cartographic) -> DVec3 {
        let cos_lat = c.latitude.cos();
        DVec3::new(
            cos_lat * c.longitude.cos(),
            cos_lat * c.longitude.sin(),
            c.latitude.sin(),
        )
        .normalize()
    }

    /// Unit normal of the ellipsoid surface through a cartesian position.
    pub fn geodetic_surface_normal(&self, position: DVec3) -> DVec3 {
        (position / self.radii_squared()).normalize()
    }

    pub fn cartographic_to_cartesian(&self, c: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(c);
        let k = self.radii_squared() * n;
        let gamma = n.dot(k).sqrt();
        k / gamma + n * c.height
    }

    /// Inverse of [`Self::cartographic_to_cartesian`] for ellipsoids of revolution.
    pub fn cartesian_to_cartographic(&self, position: DVec3) -> Cartographic {
        let a = self.radii.x;
        let b = self.radii.z;
        let e2 = 1.0 - (b * b) / (a * a);
        let p = (position.x * position.x + position.y * position.y).sqrt();
        let longitude = position.y.atan2(position.x);

        if p < 1e-9 {
            let latitude = std::f64::consts::FRAC_PI_2.copysign(position.z);
            return Cartographic::new(longitude, latitude, position.z.abs() - b);
        }

        let mut latitude = position.z.atan2(p * (1.0 - e2));
        let mut height = 0.0;
        for _ in 0..8 {
            let sin_lat = latitude.sin();
            let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            height = p / latitude.cos() - n;
            latitude = position.z.atan2(p * (1.0 - e2 * n / (n + height)));
        }
        Cartographic::new(longitude, latitude, height)
    }

    pub fn transform_position_to_scaled_space(&self, position: DVec3) -> DVec3 {
        position * self.one_over_radii()
    }

    /// Local east-north-up frame at `origin`, expressed in the earth-fixed frame.
    pub fn east_north_up_to_fixed_frame(&self, origin: DVec3) -> DMat4 {
        const EPSILON: f64 = 1e-14;
        if origin.x.abs() < EPSILON && origin.y.abs() < EPSILON {
            // At a pole east is undefined; pick +Y.
            let sign = if origin.z < 0.0 { -1.0 } else { 1.0 };
            return DMat4::from_cols(
                DVec4::new(0.0, 1.0, 0.0, 0.0),
                DVec4::new(-sign, 0.0, 0.0, 0.0),
                DVec4::new(0.0, 0.0, sign, 0.0),
                origin.extend(1.0),
            );
        }

        let up = self.geodetic_surface_normal(origin);
        let east = DVec3::new(-origin.y, origin.x, 0.0).normalize();
        let north = up.cross(east);
        DMat4::from_cols(
            east.extend(0.0),
            north.extend(0.0),
            up.extend(0.0),
            origin.extend(1.0),
        )
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_prime_meridian_is_on_x_axis() {
        let p = Ellipsoid::WGS84.cartographic_to_cartesian(&Cartographic::new(0.0, 0.0, 0.0));
        assert!((p - DVec3::new(6_378_137.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn matches_closed_form_ecef() {
        // Closed-form WGS84 geodetic -> ECEF.
        const A: f64 = 6378137.0;
        const E2: f64 = 0.006_694_379_990_14;
        let (lon, lat, h) = (0.3_f64, 0.7_f64, 120.0);
        let n = A / (1.0 - E2 * lat.sin() * lat.sin()).sqrt();
        let expected = DVec3::new(
            (n + h) * lat.cos() * lon.cos(),
            (n + h) * lat.cos() * lon.sin(),
            (n * (1.0 - E2) + h) * lat.sin(),
        );
        let p = Ellipsoid::WGS84.cartographic_to_cartesian(&Cartographic::new(lon, lat, h));
        assert!((p - expected).length() < 1e-3);
    }

    #[test]
    fn cartographic_round_trip() {
        let ellipsoid = Ellipsoid::WGS84;
        let c = Cartographic::from_degrees(-75.6, 40.04, 1500.0);
        let back = ellipsoid.cartesian_to_cartographic(ellipsoid.cartographic_to_cartesian(&c));
        assert!((back.longitude - c.longitude).abs() < 1e-12);
        assert!((back.latitude - c.latitude).abs() < 1e-12);
        assert!((back.height - c.height).abs() < 1e-6);
    }

    #[test]
    fn enu_frame_is_orthonormal_with_up_along_normal() {
        let ellipsoid = Ellipsoid::WGS84;
        let origin = ellipsoid.cartographic_to_cartesian(&Cartographic::new(1.0, 0.5, 0.0));
        let m = ellipsoid.east_north_up_to_fixed_frame(origin);
        let east = m.x_axis.truncate();
        let north = m.y_axis.truncate();
        let up = m.z_axis.truncate();
        assert!(east.dot(north).abs() < 1e-12);
        assert!(east.dot(up).abs() < 1e-12);
        assert!((up - ellipsoid.geodetic_surface_normal(origin)).length() < 1e-12);
        assert_eq!(m.w_axis.truncate(), origin);
    }

    #[test]
    fn enu_frame_at_pole_is_defined() {
        let m = Ellipsoid::WGS84.east_north_up_to_fixed_frame(DVec3::new(0.0, 0.0, 6_356_752.0));
        assert_eq!(m.x_axis.truncate(), DVec3::Y);
        assert_eq!(m.z_axis.truncate(), DVec3::Z);
    }
}
