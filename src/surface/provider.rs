//! Per-frame surface rendering for a quadtree traversal driver.
//!
//! Within a frame the driver calls [`QuadtreeSurfaceProvider::begin_frame`],
//! then any number of `load_tile`, `is_tile_visible`, `distance_to_tile` and
//! `render_tile` calls, then [`QuadtreeSurfaceProvider::end_frame`].

use glam::{DVec3, DVec4, Vec4};

use super::commands::{CommandPool, FrameCommands, PrimitiveType, ShaderKey, SurfaceShaderSet};
use super::imagery::{
    ImageryLayerCollection, LayerEvent, DEFAULT_ALPHA, DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, DEFAULT_GAMMA,
    DEFAULT_HUE, DEFAULT_SATURATION,
};
use super::terrain::TerrainProvider;
use super::tile::{ImageryState, QuadtreeTile, SurfaceTile, TileBounds, TileLoadState};
use super::tiling::GeographicTilingScheme;
use crate::config::{ConfigError, SurfaceConfig};
use crate::frame::{FrameState, SceneMode};
use crate::math::{BoundingSphere, Ellipsoid, Intersect};

pub struct QuadtreeSurfaceProvider {
    config: SurfaceConfig,
    ellipsoid: Ellipsoid,
    terrain_provider: Box<dyn TerrainProvider>,
    imagery_layers: ImageryLayerCollection,
    shader_set: Box<dyn SurfaceShaderSet>,
    pool: CommandPool,
    /// Pool indices of this frame's commands, indexed by texture count
    tile_commands: Vec<Vec<usize>>,
    frame_order: Vec<usize>,
}

impl QuadtreeSurfaceProvider {
    pub fn new(
        config: SurfaceConfig,
        terrain_provider: Box<dyn TerrainProvider>,
        shader_set: Box<dyn SurfaceShaderSet>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let texture_units = config.maximum_texture_image_units;
        Ok(Self {
            ellipsoid: config.ellipsoid(),
            config,
            terrain_provider,
            imagery_layers: ImageryLayerCollection::new(),
            shader_set,
            pool: CommandPool::new(),
            tile_commands: vec![Vec::new(); texture_units + 1],
            frame_order: Vec::new(),
        })
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn imagery_layers(&self) -> &ImageryLayerCollection {
        &self.imagery_layers
    }

    /// Layer changes take effect at the next [`begin_frame`](Self::begin_frame).
    pub fn imagery_layers_mut(&mut self) -> &mut ImageryLayerCollection {
        &mut self.imagery_layers
    }

    pub fn terrain_provider(&self) -> &dyn TerrainProvider {
        self.terrain_provider.as_ref()
    }

    pub fn command_pool(&self) -> &CommandPool {
        &self.pool
    }

    pub fn tiling_scheme(&self) -> &GeographicTilingScheme {
        self.terrain_provider.tiling_scheme()
    }

    /// Traversal may start once terrain and the base imagery layer are ready.
    pub fn ready(&self) -> bool {
        self.terrain_provider.ready()
            && self
                .imagery_layers
                .base_layer()
                .map_or(true, |layer| layer.provider.ready())
    }

    pub fn level_maximum_geometric_error(&self, level: u32) -> f64 {
        self.terrain_provider.level_maximum_geometric_error(level)
    }

    /// Applies layer changes to every loaded tile and resets per-frame command state.
    pub fn begin_frame<'t>(&mut self, frame: &FrameState, loaded_tiles: impl IntoIterator<Item = &'t mut QuadtreeTile>) {
        let mut events = self.imagery_layers.take_events();
        let order_changed = self.imagery_layers.take_order_changed();

        if !events.is_empty() || order_changed {
            for event in &events {
                match event {
                    LayerEvent::Added(id) => log::info!("imagery layer {:?} added", id),
                    LayerEvent::Removed { layer, .. } => log::info!("imagery layer {:?} removed", layer.id()),
                    LayerEvent::Hidden { id, .. } => log::info!("imagery layer {:?} hidden", id),
                }
            }
            if order_changed {
                log::info!("imagery layer order changed");
            }

            for tile in loaded_tiles {
                let Some(surface) = tile.data.as_mut() else {
                    continue;
                };

                for event in events.iter_mut() {
                    match event {
                        LayerEvent::Added(id) => {
                            let Some(layer) = self.imagery_layers.get(*id) else {
                                continue;
                            };
                            if layer.show() && surface.attach_layer(tile.id, &tile.rectangle, layer, &self.imagery_layers) {
                                tile.state = TileLoadState::Loading;
                            }
                        }
                        LayerEvent::Removed { layer, was_base } => {
                            let id = layer.id();
                            let provider = &mut layer.provider;
                            surface.detach_layer(id, |texture| provider.release_texture(texture));
                            if *was_base {
                                tile.renderable = false;
                                tile.state = TileLoadState::Loading;
                            }
                        }
                        LayerEvent::Hidden { id, was_base } => {
                            match self.imagery_layers.get_mut(*id) {
                                Some(layer) => {
                                    let provider = &mut layer.provider;
                                    surface.detach_layer(*id, |texture| provider.release_texture(texture));
                                }
                                None => {
                                    surface.detach_layer(*id, |_| {});
                                }
                            }
                            if *was_base {
                                tile.renderable = false;
                                tile.state = TileLoadState::Loading;
                            }
                        }
                    }
                }

                if order_changed {
                    surface.sort_imagery(&self.imagery_layers);
                }
            }
        }

        self.pool.reset();
        for list in &mut self.tile_commands {
            list.clear();
        }
        self.frame_order.clear();
        log::trace!("surface frame {} begins", frame.frame_number);
    }

    /// Attaches surface data on first call and drives terrain and imagery loading.
    pub fn load_tile(&mut self, tile: &mut QuadtreeTile) {
        if tile.state == TileLoadState::Start {
            let mut surface = SurfaceTile::new(&tile.rectangle, &self.ellipsoid);
            for layer in self.imagery_layers.iter().filter(|layer| layer.show()) {
                surface.attach_layer(tile.id, &tile.rectangle, layer, &self.imagery_layers);
            }
            tile.data = Some(surface);
            tile.state = TileLoadState::Loading;
        }

        if tile.state != TileLoadState::Loading {
            return;
        }
        let Some(surface) = tile.data.as_mut() else {
            return;
        };

        let progress = surface.process_state_machine(
            tile.id,
            &tile.rectangle,
            tile.distance,
            self.terrain_provider.as_mut(),
            &mut self.imagery_layers,
        );
        tile.renderable = progress.renderable;
        if progress.failed {
            tile.state = TileLoadState::Failed;
        } else if progress.done {
            log::debug!("tile L{} ({}, {}) loaded", tile.id.level, tile.id.x, tile.id.y);
            tile.state = TileLoadState::Done;
        }
    }

    /// Frustum and horizon test. Tiles without terrain are never visible.
    pub fn is_tile_visible(&self, tile: &QuadtreeTile, frame: &FrameState) -> bool {
        let Some(surface) = tile.data.as_ref().filter(|s| s.is_terrain_ready()) else {
            return false;
        };

        let bounding_volume = self.command_bounding_volume(tile, surface, frame);
        if frame.culling_volume.compute_visibility(&bounding_volume) == Intersect::Outside {
            return false;
        }

        if frame.mode == SceneMode::Scene3D {
            return match surface.occludee_point_in_scaled_space {
                Some(point) => frame.occluder.is_scaled_space_point_visible(point),
                None => true,
            };
        }
        true
    }

    fn command_bounding_volume(&self, tile: &QuadtreeTile, surface: &SurfaceTile, frame: &FrameState) -> BoundingSphere {
        if frame.mode == SceneMode::Scene3D {
            return surface.bounding_sphere_3d;
        }

        let sphere = BoundingSphere::from_rectangle_with_heights_2d(
            &tile.rectangle,
            &frame.map_projection,
            surface.minimum_height,
            surface.maximum_height,
        )
        .to_scene_2d();
        if frame.mode == SceneMode::Morphing {
            sphere.union(&surface.bounding_sphere_3d)
        } else {
            sphere
        }
    }

    /// Distance from the camera to the tile's bounding region, the distance
    /// term of the level-of-detail error.
    ///
    /// Projected modes reuse the 3D plane tests on `(height, easting, northing)`
    /// coordinates and take the distance from the top as `position_wc.x` alone.
    pub fn distance_to_tile(&self, tile: &QuadtreeTile, frame: &FrameState) -> f64 {
        let (bounds, maximum_height) = match tile.data.as_ref() {
            Some(surface) => (surface.bounds, surface.maximum_height),
            None => (TileBounds::from_rectangle(&tile.rectangle, &self.ellipsoid), 0.0),
        };

        let camera = &frame.camera;
        let (bounds, camera_height, maximum_height) = if frame.mode == SceneMode::Scene3D {
            (bounds, camera.position_cartographic.height, maximum_height)
        } else {
            let projection = &frame.map_projection;
            let southwest = projection.project(&tile.rectangle.southwest());
            let northeast = projection.project(&tile.rectangle.northeast());
            let projected = TileBounds {
                southwest_corner: DVec3::new(0.0, southwest.x, southwest.y),
                northeast_corner: DVec3::new(0.0, northeast.x, northeast.y),
                west_normal: DVec3::NEG_Y,
                south_normal: DVec3::NEG_Z,
                east_normal: DVec3::Y,
                north_normal: DVec3::Z,
            };
            // Height collapses onto the projected depth axis.
            (projected, camera.position_wc.x, 0.0)
        };

        let from_southwest = camera.position_wc - bounds.southwest_corner;
        let from_northeast = camera.position_wc - bounds.northeast_corner;
        let distance_to_west = from_southwest.dot(bounds.west_normal);
        let distance_to_south = from_southwest.dot(bounds.south_normal);
        let distance_to_east = from_northeast.dot(bounds.east_normal);
        let distance_to_north = from_northeast.dot(bounds.north_normal);
        let distance_from_top = camera_height - maximum_height;

        let mut result = 0.0;
        if distance_to_west > 0.0 {
            result += distance_to_west * distance_to_west;
        } else if distance_to_east > 0.0 {
            result += distance_to_east * distance_to_east;
        }
        if distance_to_south > 0.0 {
            result += distance_to_south * distance_to_south;
        } else if distance_to_north > 0.0 {
            result += distance_to_north * distance_to_north;
        }
        if distance_from_top > 0.0 {
            result += distance_from_top * distance_from_top;
        }
        f64::sqrt(result)
    }

    /// Emits one draw command per group of up to `maximum_texture_image_units`
    /// ready imagery textures; a tile without imagery gets one untextured command.
    ///
    /// # Panics
    ///
    /// If the provider is not [`ready`](Self::ready).
    pub fn render_tile(&mut self, tile: &mut QuadtreeTile, frame: &mut FrameState) {
        assert!(self.ready(), "render_tile called before the surface provider is ready");

        let Some(surface) = tile.data.as_ref() else {
            return;
        };
        let bounding_volume = self.command_bounding_volume(tile, surface, frame);

        let Some(surface) = tile.data.as_mut() else {
            return;
        };
        let Some(mesh) = surface.mesh.as_ref() else {
            return;
        };
        let mesh_geometry = mesh.geometry;

        let (geometry, primitive_type) = if self.config.show_wireframe {
            if surface.wireframe.is_none() {
                surface.wireframe = self.terrain_provider.create_wireframe(mesh);
            }
            match surface.wireframe {
                Some(wireframe) => (wireframe, PrimitiveType::Lines),
                None => (mesh_geometry, PrimitiveType::Triangles),
            }
        } else {
            (mesh_geometry, PrimitiveType::Triangles)
        };

        let rectangle = tile.rectangle;
        let mut rtc = surface.center;
        let mut tile_rectangle = DVec4::ZERO;
        if frame.mode != SceneMode::Scene3D {
            let southwest = frame.map_projection.project(&rectangle.southwest());
            let northeast = frame.map_projection.project(&rectangle.northeast());
            tile_rectangle = DVec4::new(southwest.x, southwest.y, northeast.x, northeast.y);
            if frame.mode != SceneMode::Morphing {
                rtc = DVec3::new(
                    0.0,
                    (tile_rectangle.z + tile_rectangle.x) * 0.5,
                    (tile_rectangle.w + tile_rectangle.y) * 0.5,
                );
                tile_rectangle -= DVec4::new(rtc.y, rtc.z, rtc.y, rtc.z);
            }
        }
        let view = frame.camera.view_matrix;
        let mut modified_model_view = view;
        modified_model_view.w_axis = view.transform_point3(rtc).extend(1.0);

        let max_textures = self.config.maximum_texture_image_units;
        let imagery_len = surface.imagery.len();
        let mut imagery_index = 0;
        let mut initial_color = self.config.base_color();
        let mut blend = false;

        loop {
            let (command_index, command) = self.pool.acquire();
            command.owner = Some(tile.id);
            command.bounding_volume = bounding_volume;
            command.geometry = geometry;
            command.primitive_type = primitive_type;
            command.blend = blend;

            let uniforms = &mut command.uniforms;
            uniforms.clear_textures();
            uniforms.initial_color = initial_color;
            uniforms.center_3d = surface.center;
            uniforms.modified_model_view = modified_model_view;
            uniforms.tile_rectangle = tile_rectangle;

            let mut key = ShaderKey::default();
            while uniforms.day_textures.len() < max_textures && imagery_index < imagery_len {
                let entry = &mut surface.imagery[imagery_index];
                imagery_index += 1;

                if entry.state != ImageryState::Ready {
                    continue;
                }
                let Some(texture) = entry.texture else {
                    continue;
                };
                let Some(layer) = self.imagery_layers.get(entry.layer_id) else {
                    continue;
                };
                if layer.alpha.as_constant() == Some(0.0) {
                    continue;
                }

                let translation_and_scale = entry.translation_and_scale(&rectangle);
                uniforms.day_textures.push(texture);
                uniforms.day_texture_translation_and_scale.push(translation_and_scale);
                uniforms
                    .day_texture_texcoords_rectangle
                    .push(entry.texture_coordinate_rectangle);

                let (x, y, level) = (entry.x, entry.y, entry.level);
                let alpha = layer.alpha.evaluate(frame, layer, x, y, level);
                let brightness = layer.brightness.evaluate(frame, layer, x, y, level);
                let contrast = layer.contrast.evaluate(frame, layer, x, y, level);
                let hue = layer.hue.evaluate(frame, layer, x, y, level);
                let saturation = layer.saturation.evaluate(frame, layer, x, y, level);
                let gamma = layer.gamma.evaluate(frame, layer, x, y, level);

                key.apply_alpha |= alpha != DEFAULT_ALPHA;
                key.apply_brightness |= brightness != DEFAULT_BRIGHTNESS;
                key.apply_contrast |= contrast != DEFAULT_CONTRAST;
                key.apply_hue |= hue != DEFAULT_HUE;
                key.apply_saturation |= saturation != DEFAULT_SATURATION;
                key.apply_gamma |= gamma != DEFAULT_GAMMA;

                uniforms.day_texture_alpha.push(alpha as f32);
                uniforms.day_texture_brightness.push(brightness as f32);
                uniforms.day_texture_contrast.push(contrast as f32);
                uniforms.day_texture_hue.push(hue as f32);
                uniforms.day_texture_saturation.push(saturation as f32);
                uniforms.day_texture_one_over_gamma.push((1.0 / gamma) as f32);

                for credit in &entry.credits {
                    frame.credit_display.add_credit(credit);
                }
            }

            key.texture_count = uniforms.texture_count();
            command.shader_key = key;
            command.shader = self.shader_set.shader_program(&key);
            self.tile_commands[key.texture_count].push(command_index);

            // Later commands of the same tile blend over the first.
            initial_color = Vec4::ZERO;
            blend = true;

            if imagery_index >= imagery_len {
                break;
            }
        }
    }

    /// This frame's commands in ascending texture-count order.
    pub fn end_frame(&mut self) -> FrameCommands<'_> {
        self.frame_order.clear();
        for list in &self.tile_commands {
            self.frame_order.extend_from_slice(list);
        }
        log::trace!(
            "surface frame emitted {} commands ({} pooled)",
            self.frame_order.len(),
            self.pool.capacity()
        );
        FrameCommands::new(&self.pool, &self.frame_order)
    }

    /// Releases a tile's geometry and textures, e.g. when the driver evicts it.
    pub fn free_tile_resources(&mut self, tile: &mut QuadtreeTile) {
        tile.free_resources(self.terrain_provider.as_mut(), &mut self.imagery_layers);
    }
}
