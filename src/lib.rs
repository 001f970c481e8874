//! Streaming globe surface tiles.
//!
//! Decodes instanced-model (`i3dm`) tiles, drives their content lifecycle
//! from request to GPU readiness, and selects draw commands for a quadtree
//! terrain surface each frame. Networking, mesh generation, shaders and GPU
//! objects are reached through the collaborator traits in [`scheduler`],
//! [`content`] and [`surface`].

pub mod config;
pub mod content;
pub mod error;
pub mod frame;
pub mod i3dm;
pub mod math;
pub mod scheduler;
pub mod surface;

pub use config::{ConfigError, ContentConfig, SurfaceConfig};
pub use content::{ContentState, Feature, InstancedContent};
pub use error::{FormatError, TileError, TileResult};
pub use frame::{Camera, FrameState, SceneMode};
pub use i3dm::{decode_i3dm, encode_i3dm};
pub use scheduler::{PendingRequest, Request, RequestScheduler};
pub use surface::{QuadtreeSurfaceProvider, QuadtreeTile};
