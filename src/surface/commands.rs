//! Draw commands emitted by the surface and the pool that recycles them across frames

use glam::{DMat4, DVec3, DVec4, Vec4};

use super::imagery::TextureHandle;
use super::terrain::GeometryHandle;
use super::tiling::TileId;
use crate::math::BoundingSphere;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    Lines,
}

/// Shader variant selector: texture count plus the color adjustments in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderKey {
    pub texture_count: usize,
    pub apply_alpha: bool,
    pub apply_brightness: bool,
    pub apply_contrast: bool,
    pub apply_hue: bool,
    pub apply_saturation: bool,
    pub apply_gamma: bool,
}

/// Opaque handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderHandle(pub u64);

/// Shader program management lives outside the surface.
pub trait SurfaceShaderSet {
    fn shader_program(&mut self, key: &ShaderKey) -> ShaderHandle;
}

/// Per-draw uniforms. Vectors keep their capacity between frames.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    pub initial_color: Vec4,
    /// Tile center, the origin of the vertex data
    pub center_3d: DVec3,
    /// View matrix with its translation moved to the tile center (RTC)
    pub modified_model_view: DMat4,
    /// Projected tile rectangle relative to the RTC center (2D and Columbus view)
    pub tile_rectangle: DVec4,
    pub day_textures: Vec<TextureHandle>,
    pub day_texture_translation_and_scale: Vec<DVec4>,
    pub day_texture_texcoords_rectangle: Vec<DVec4>,
    pub day_texture_alpha: Vec<f32>,
    pub day_texture_brightness: Vec<f32>,
    pub day_texture_contrast: Vec<f32>,
    pub day_texture_hue: Vec<f32>,
    pub day_texture_saturation: Vec<f32>,
    pub day_texture_one_over_gamma: Vec<f32>,
}

impl UniformMap {
    pub(crate) fn clear_textures(&mut self) {
        self.day_textures.clear();
        self.day_texture_translation_and_scale.clear();
        self.day_texture_texcoords_rectangle.clear();
        self.day_texture_alpha.clear();
        self.day_texture_brightness.clear();
        self.day_texture_contrast.clear();
        self.day_texture_hue.clear();
        self.day_texture_saturation.clear();
        self.day_texture_one_over_gamma.clear();
    }

    pub fn texture_count(&self) -> usize {
        self.day_textures.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrawCommand {
    pub owner: Option<TileId>,
    pub bounding_volume: BoundingSphere,
    pub geometry: GeometryHandle,
    pub primitive_type: PrimitiveType,
    pub shader_key: ShaderKey,
    pub shader: ShaderHandle,
    /// Blend over earlier commands of the same tile
    pub blend: bool,
    pub uniforms: UniformMap,
}

/// Arena of draw commands reused across frames.
///
/// Grows to the high-water mark of commands in one frame and never shrinks.
/// Commands at or beyond [`CommandPool::used`] are stale.
#[derive(Debug, Default)]
pub struct CommandPool {
    commands: Vec<DrawCommand>,
    used: usize,
    allocations: usize,
}

impl CommandPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next command for this frame, allocating only past the high-water mark.
    pub fn acquire(&mut self) -> (usize, &mut DrawCommand) {
        if self.used == self.commands.len() {
            self.commands.push(DrawCommand::default());
            self.allocations += 1;
        }
        let index = self.used;
        self.used += 1;
        (index, &mut self.commands[index])
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.commands.len()
    }

    /// Total commands ever allocated.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn get(&self, index: usize) -> Option<&DrawCommand> {
        self.commands[..self.used].get(index)
    }
}

/// Commands of one frame in submission order, borrowed from the pool.
#[derive(Debug)]
pub struct FrameCommands<'a> {
    pool: &'a CommandPool,
    order: &'a [usize],
}

impl<'a> FrameCommands<'a> {
    pub(crate) fn new(pool: &'a CommandPool, order: &'a [usize]) -> Self {
        Self { pool, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a DrawCommand> + 'a {
        let pool = self.pool;
        let order = self.order;
        order.iter().filter_map(move |&index| pool.get(index))
    }
}
