//! Geodesy and culling primitives shared by tile content and the surface provider.
//!
//! All world-space math is done in `f64`: positions on a planetary ellipsoid lose
//! centimetre precision in `f32`.

mod bounds;
mod culling;
mod ellipsoid;
mod occluder;
mod projection;
mod rectangle;

pub use bounds::BoundingSphere;
pub use culling::{CullingVolume, Intersect};
pub use ellipsoid::{Cartographic, Ellipsoid};
pub use occluder::EllipsoidalOccluder;
pub use projection::GeographicProjection;
pub use rectangle::Rectangle;
