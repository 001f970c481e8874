//! Quadtree tiles and their per-node render state

use glam::{DVec3, DVec4};

use super::imagery::{ImageryLayer, ImageryLayerCollection, LayerId, TextureHandle};
use super::terrain::{GeometryHandle, TerrainMesh, TerrainProvider};
use super::tiling::TileId;
use crate::frame::Credit;
use crate::math::{BoundingSphere, Cartographic, Ellipsoid, Rectangle};
use crate::scheduler::{Delivery, PendingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLoadState {
    Start,
    Loading,
    Done,
    Failed,
}

/// Node of the quadtree as owned by the traversal driver.
#[derive(Debug)]
pub struct QuadtreeTile {
    pub id: TileId,
    pub rectangle: Rectangle,
    pub state: TileLoadState,
    /// Whether the tile has enough data to be drawn
    pub renderable: bool,
    /// Camera distance from the last traversal, used as request priority
    pub distance: f64,
    pub data: Option<SurfaceTile>,
}

impl QuadtreeTile {
    pub fn new(id: TileId, rectangle: Rectangle) -> Self {
        Self {
            id,
            rectangle,
            state: TileLoadState::Start,
            renderable: false,
            distance: 0.0,
            data: None,
        }
    }

    /// Releases geometry and imagery textures and drops the surface data.
    pub fn free_resources(&mut self, terrain: &mut dyn TerrainProvider, layers: &mut ImageryLayerCollection) {
        if let Some(mut surface) = self.data.take() {
            for entry in surface.imagery.drain(..) {
                if let Some(layer) = layers.get_mut(entry.layer_id) {
                    entry.release(layer);
                }
            }
            if let Some(wireframe) = surface.wireframe.take() {
                terrain.release_geometry(wireframe);
            }
            if let Some(mesh) = surface.mesh.take() {
                terrain.release_geometry(mesh.geometry);
            }
        }
        self.state = TileLoadState::Start;
        self.renderable = false;
    }
}

/// Corner points and inward-facing edge planes used by the distance metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub southwest_corner: DVec3,
    pub northeast_corner: DVec3,
    pub west_normal: DVec3,
    pub south_normal: DVec3,
    pub east_normal: DVec3,
    pub north_normal: DVec3,
}

impl TileBounds {
    /// Bounds on the ellipsoid surface; normals point out of the tile.
    pub fn from_rectangle(rectangle: &Rectangle, ellipsoid: &Ellipsoid) -> Self {
        let southwest_corner = ellipsoid.cartographic_to_cartesian(&rectangle.southwest());
        let northeast_corner = ellipsoid.cartographic_to_cartesian(&rectangle.northeast());

        let mid_latitude = (rectangle.south + rectangle.north) * 0.5;
        let western_midpoint =
            ellipsoid.cartographic_to_cartesian(&Cartographic::new(rectangle.west, mid_latitude, 0.0));
        let west_normal = western_midpoint.cross(DVec3::Z).normalize();

        let eastern_midpoint =
            ellipsoid.cartographic_to_cartesian(&Cartographic::new(rectangle.east, mid_latitude, 0.0));
        let east_normal = DVec3::Z.cross(eastern_midpoint).normalize();

        let west_vector = (western_midpoint - eastern_midpoint).normalize();
        let center_longitude = (rectangle.west + rectangle.east) * 0.5;

        let south_surface_normal = ellipsoid
            .geodetic_surface_normal_cartographic(&Cartographic::new(center_longitude, rectangle.south, 0.0));
        let south_normal = south_surface_normal.cross(west_vector).normalize();

        let north_surface_normal = ellipsoid
            .geodetic_surface_normal_cartographic(&Cartographic::new(center_longitude, rectangle.north, 0.0));
        let north_normal = west_vector.cross(north_surface_normal).normalize();

        Self {
            southwest_corner,
            northeast_corner,
            west_normal,
            south_normal,
            east_normal,
            north_normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageryState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// One imagery tile draped over a terrain tile.
#[derive(Debug)]
pub struct TileImagery {
    pub layer_id: LayerId,
    pub x: u32,
    pub y: u32,
    pub level: u32,
    /// Rectangle of the whole imagery tile
    pub rectangle: Rectangle,
    /// Part of the terrain tile covered by this imagery, in terrain texture coordinates
    pub texture_coordinate_rectangle: DVec4,
    /// Maps terrain texture coordinates into imagery texture coordinates; computed on first draw
    pub translation_and_scale: Option<DVec4>,
    pub state: ImageryState,
    pub texture: Option<TextureHandle>,
    pub credits: Vec<Credit>,
    request: Option<PendingRequest<TextureHandle>>,
}

impl TileImagery {
    fn new(layer_id: LayerId, x: u32, y: u32, level: u32, rectangle: Rectangle, texture_coordinate_rectangle: DVec4) -> Self {
        Self {
            layer_id,
            x,
            y,
            level,
            rectangle,
            texture_coordinate_rectangle,
            translation_and_scale: None,
            state: ImageryState::Unloaded,
            texture: None,
            credits: Vec::new(),
            request: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, ImageryState::Ready | ImageryState::Failed)
    }

    /// Cached translation and scale from the terrain tile into this imagery tile.
    pub fn translation_and_scale(&mut self, terrain_rectangle: &Rectangle) -> DVec4 {
        let imagery = self.rectangle;
        *self.translation_and_scale.get_or_insert_with(|| {
            let terrain_width = terrain_rectangle.width();
            let terrain_height = terrain_rectangle.height();
            let scale_x = terrain_width / imagery.width();
            let scale_y = terrain_height / imagery.height();
            DVec4::new(
                scale_x * (terrain_rectangle.west - imagery.west) / terrain_width,
                scale_y * (terrain_rectangle.south - imagery.south) / terrain_height,
                scale_x,
                scale_y,
            )
        })
    }

    fn process(&mut self, layer: &mut ImageryLayer, distance: f64) {
        match self.state {
            ImageryState::Unloaded => {
                if let Some(request) = layer.provider.request_image(self.x, self.y, self.level, distance) {
                    self.request = Some(request);
                    self.state = ImageryState::Loading;
                }
            }
            ImageryState::Loading => {
                let Some(request) = self.request.as_mut() else {
                    return;
                };
                match request.poll() {
                    Delivery::Pending => {}
                    Delivery::Delivered(texture) => {
                        self.request = None;
                        self.texture = Some(texture);
                        self.credits = layer.provider.credits(self.x, self.y, self.level);
                        self.state = ImageryState::Ready;
                    }
                    Delivery::Failed(err) => {
                        self.request = None;
                        log::warn!(
                            "imagery L{} ({}, {}) of layer {:?} failed: {:#}",
                            self.level,
                            self.x,
                            self.y,
                            self.layer_id,
                            err
                        );
                        self.state = ImageryState::Failed;
                    }
                }
            }
            ImageryState::Ready | ImageryState::Failed => {}
        }
    }

    fn release(mut self, layer: &mut ImageryLayer) {
        if let Some(texture) = self.texture.take() {
            layer.provider.release_texture(texture);
        }
    }
}

#[derive(Debug)]
pub enum TerrainState {
    Unloaded,
    Loading(PendingRequest<TerrainMesh>),
    Ready,
    Failed,
}

/// Result of one step of a surface tile's load state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub done: bool,
    pub failed: bool,
    pub renderable: bool,
}

/// Render state attached to a quadtree tile once it starts loading.
#[derive(Debug)]
pub struct SurfaceTile {
    pub terrain_state: TerrainState,
    pub mesh: Option<TerrainMesh>,
    /// Origin of the tile's vertex data
    pub center: DVec3,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub bounding_sphere_3d: BoundingSphere,
    pub occludee_point_in_scaled_space: Option<DVec3>,
    pub bounds: TileBounds,
    pub wireframe: Option<GeometryHandle>,
    /// Sorted by imagery-layer index; entries of one layer are contiguous.
    pub imagery: Vec<TileImagery>,
    /// Layers whose skeletons exist (possibly none overlap) or are awaiting a ready provider
    attached_layers: Vec<LayerId>,
    pending_layers: Vec<LayerId>,
}

impl SurfaceTile {
    pub fn new(rectangle: &Rectangle, ellipsoid: &Ellipsoid) -> Self {
        Self {
            terrain_state: TerrainState::Unloaded,
            mesh: None,
            center: DVec3::ZERO,
            minimum_height: 0.0,
            maximum_height: 0.0,
            bounding_sphere_3d: BoundingSphere::default(),
            occludee_point_in_scaled_space: None,
            bounds: TileBounds::from_rectangle(rectangle, ellipsoid),
            wireframe: None,
            imagery: Vec::new(),
            attached_layers: Vec::new(),
            pending_layers: Vec::new(),
        }
    }

    pub fn is_terrain_ready(&self) -> bool {
        matches!(self.terrain_state, TerrainState::Ready)
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.attached_layers.contains(&id)
    }

    /// Attaches `layer` to this tile, creating its imagery skeletons now if
    /// the provider is ready or on a later load step otherwise.
    ///
    /// Returns `false` if the layer was already attached.
    pub fn attach_layer(&mut self, tile: TileId, rectangle: &Rectangle, layer: &ImageryLayer, layers: &ImageryLayerCollection) -> bool {
        if self.has_layer(layer.id()) {
            return false;
        }
        self.attached_layers.push(layer.id());
        if layer.provider.ready() {
            self.create_skeletons(tile, rectangle, layer, layers);
        } else {
            self.pending_layers.push(layer.id());
        }
        true
    }

    fn create_skeletons(&mut self, tile: TileId, rectangle: &Rectangle, layer: &ImageryLayer, layers: &ImageryLayerCollection) {
        let scheme = layer.provider.tiling_scheme();
        let Some(covered) = rectangle.intersection(scheme.rectangle()) else {
            return;
        };
        let level = tile.level.min(layer.provider.maximum_level());

        // Pull the corners inward so edges shared with neighbors do not select them.
        let eps_x = covered.width() / 512.0;
        let eps_y = covered.height() / 512.0;
        let northwest = Cartographic::new(covered.west + eps_x, covered.north - eps_y, 0.0);
        let southeast = Cartographic::new(covered.east - eps_x, covered.south + eps_y, 0.0);
        let (Some((west_x, north_y)), Some((east_x, south_y))) = (
            scheme.position_to_tile_xy(&northwest, level),
            scheme.position_to_tile_xy(&southeast, level),
        ) else {
            return;
        };

        let mut entries = Vec::new();
        for y in north_y..=south_y {
            for x in west_x..=east_x {
                let imagery_rectangle = scheme.tile_rectangle(x, y, level);
                let Some(clipped) = imagery_rectangle.intersection(rectangle) else {
                    continue;
                };
                let texture_coordinate_rectangle = DVec4::new(
                    (clipped.west - rectangle.west) / rectangle.width(),
                    (clipped.south - rectangle.south) / rectangle.height(),
                    (clipped.east - rectangle.west) / rectangle.width(),
                    (clipped.north - rectangle.south) / rectangle.height(),
                );
                entries.push(TileImagery::new(layer.id(), x, y, level, imagery_rectangle, texture_coordinate_rectangle));
            }
        }

        let layer_index = layers.index_of(layer.id()).unwrap_or(usize::MAX);
        let at = self
            .imagery
            .iter()
            .position(|entry| layers.index_of(entry.layer_id).map_or(true, |i| i > layer_index))
            .unwrap_or(self.imagery.len());
        self.imagery.splice(at..at, entries);
    }

    /// Removes the contiguous run of entries belonging to `layer_id`.
    /// `release` receives each removed entry's texture.
    pub fn detach_layer(&mut self, layer_id: LayerId, mut release: impl FnMut(TextureHandle)) -> usize {
        self.attached_layers.retain(|id| *id != layer_id);
        self.pending_layers.retain(|id| *id != layer_id);

        let Some(start) = self.imagery.iter().position(|entry| entry.layer_id == layer_id) else {
            return 0;
        };
        let count = self.imagery[start..]
            .iter()
            .take_while(|entry| entry.layer_id == layer_id)
            .count();
        for mut entry in self.imagery.drain(start..start + count) {
            if let Some(texture) = entry.texture.take() {
                release(texture);
            }
        }
        count
    }

    /// Re-sorts imagery by current layer order.
    pub fn sort_imagery(&mut self, layers: &ImageryLayerCollection) {
        self.imagery
            .sort_by_key(|entry| layers.index_of(entry.layer_id).unwrap_or(usize::MAX));
    }

    fn apply_mesh(&mut self, mesh: TerrainMesh) {
        self.center = mesh.center;
        self.minimum_height = mesh.minimum_height;
        self.maximum_height = mesh.maximum_height;
        self.bounding_sphere_3d = mesh.bounding_sphere_3d;
        self.occludee_point_in_scaled_space = mesh.occludee_point_in_scaled_space;
        self.mesh = Some(mesh);
        self.terrain_state = TerrainState::Ready;
    }

    /// Drives terrain and imagery loading forward by one step.
    pub fn process_state_machine(
        &mut self,
        tile: TileId,
        rectangle: &Rectangle,
        distance: f64,
        terrain: &mut dyn TerrainProvider,
        layers: &mut ImageryLayerCollection,
    ) -> LoadProgress {
        match &mut self.terrain_state {
            TerrainState::Unloaded => {
                if let Some(request) = terrain.request_tile_geometry(tile, distance) {
                    self.terrain_state = TerrainState::Loading(request);
                }
            }
            TerrainState::Loading(request) => match request.poll() {
                Delivery::Pending => {}
                Delivery::Delivered(mesh) => self.apply_mesh(mesh),
                Delivery::Failed(err) => {
                    log::warn!("terrain L{} ({}, {}) failed: {:#}", tile.level, tile.x, tile.y, err);
                    self.terrain_state = TerrainState::Failed;
                }
            },
            TerrainState::Ready | TerrainState::Failed => {}
        }

        let pending = std::mem::take(&mut self.pending_layers);
        for id in pending {
            match layers.get(id) {
                Some(layer) if layer.provider.ready() => self.create_skeletons(tile, rectangle, layer, layers),
                Some(_) => self.pending_layers.push(id),
                None => {}
            }
        }

        for entry in &mut self.imagery {
            if let Some(layer) = layers.get_mut(entry.layer_id) {
                entry.process(layer, distance);
            }
        }

        let failed = matches!(self.terrain_state, TerrainState::Failed);
        let imagery_done = self.pending_layers.is_empty() && self.imagery.iter().all(TileImagery::is_complete);
        let base_done = match layers.base_layer() {
            Some(base) if base.show() => {
                !self.pending_layers.contains(&base.id())
                    && self
                        .imagery
                        .iter()
                        .filter(|entry| entry.layer_id == base.id())
                        .all(TileImagery::is_complete)
            }
            _ => true,
        };

        LoadProgress {
            done: failed || (self.is_terrain_ready() && imagery_done),
            failed,
            renderable: self.is_terrain_ready() && base_done,
        }
    }
}
