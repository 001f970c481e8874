//! Quadtree terrain surface: tiles, imagery layers and per-frame draw commands

mod commands;
mod imagery;
mod provider;
mod terrain;
mod tile;
mod tiling;

pub use commands::{
    CommandPool, DrawCommand, FrameCommands, PrimitiveType, ShaderHandle, ShaderKey, SurfaceShaderSet, UniformMap,
};
pub use imagery::{
    ImageryLayer, ImageryLayerCollection, ImageryProvider, LayerEvent, LayerId, LayerValue, LayerValueFn,
    TextureHandle, DEFAULT_ALPHA, DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, DEFAULT_GAMMA, DEFAULT_HUE,
    DEFAULT_SATURATION,
};
pub use provider::QuadtreeSurfaceProvider;
pub use terrain::{estimated_level_zero_geometric_error, GeometryHandle, TerrainMesh, TerrainProvider};
pub use tile::{
    ImageryState, LoadProgress, QuadtreeTile, SurfaceTile, TerrainState, TileBounds, TileImagery, TileLoadState,
};
pub use tiling::{GeographicTilingScheme, TileId};
