//! Imagery layers composited onto the terrain surface

use std::fmt;
use std::rc::Rc;

use super::tiling::GeographicTilingScheme;
use crate::frame::{Credit, FrameState};
use crate::scheduler::PendingRequest;

/// Opaque handle to a GPU texture owned by an imagery provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u64);

pub trait ImageryProvider {
    fn ready(&self) -> bool;

    fn tiling_scheme(&self) -> &GeographicTilingScheme;

    /// Finest level the provider serves.
    fn maximum_level(&self) -> u32;

    /// Requests the image for one imagery tile. `None` when throttled.
    fn request_image(&mut self, x: u32, y: u32, level: u32, distance: f64) -> Option<PendingRequest<TextureHandle>>;

    /// Attribution for one imagery tile.
    fn credits(&self, _x: u32, _y: u32, _level: u32) -> Vec<Credit> {
        Vec::new()
    }

    fn release_texture(&mut self, _texture: TextureHandle) {}
}

pub const DEFAULT_ALPHA: f64 = 1.0;
pub const DEFAULT_BRIGHTNESS: f64 = 1.0;
pub const DEFAULT_CONTRAST: f64 = 1.0;
pub const DEFAULT_HUE: f64 = 0.0;
pub const DEFAULT_SATURATION: f64 = 1.0;
pub const DEFAULT_GAMMA: f64 = 1.0;

/// Per-tile color adjustment callback: `(frame, layer, x, y, level) -> value`.
pub type LayerValueFn = dyn Fn(&FrameState, &ImageryLayer, u32, u32, u32) -> f64;

/// A color adjustment that is either fixed or computed per tile each frame.
#[derive(Clone)]
pub enum LayerValue {
    Constant(f64),
    Dynamic(Rc<LayerValueFn>),
}

impl LayerValue {
    pub fn dynamic(f: impl Fn(&FrameState, &ImageryLayer, u32, u32, u32) -> f64 + 'static) -> Self {
        LayerValue::Dynamic(Rc::new(f))
    }

    pub fn evaluate(&self, frame: &FrameState, layer: &ImageryLayer, x: u32, y: u32, level: u32) -> f64 {
        match self {
            LayerValue::Constant(value) => *value,
            LayerValue::Dynamic(f) => f(frame, layer, x, y, level),
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            LayerValue::Constant(value) => Some(*value),
            LayerValue::Dynamic(_) => None,
        }
    }
}

impl fmt::Debug for LayerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            LayerValue::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<f64> for LayerValue {
    fn from(value: f64) -> Self {
        LayerValue::Constant(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

pub struct ImageryLayer {
    id: LayerId,
    pub provider: Box<dyn ImageryProvider>,
    pub alpha: LayerValue,
    pub brightness: LayerValue,
    pub contrast: LayerValue,
    pub hue: LayerValue,
    pub saturation: LayerValue,
    pub gamma: LayerValue,
    show: bool,
}

impl ImageryLayer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn show(&self) -> bool {
        self.show
    }
}

impl fmt::Debug for ImageryLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageryLayer")
            .field("id", &self.id)
            .field("alpha", &self.alpha)
            .field("brightness", &self.brightness)
            .field("contrast", &self.contrast)
            .field("hue", &self.hue)
            .field("saturation", &self.saturation)
            .field("gamma", &self.gamma)
            .field("show", &self.show)
            .finish()
    }
}

/// Change recorded by the collection and consumed by the surface at the next frame.
#[derive(Debug)]
pub enum LayerEvent {
    /// Layer added or shown.
    Added(LayerId),
    /// Layer removed from the collection; it is handed over so its textures can be released.
    Removed { layer: ImageryLayer, was_base: bool },
    Hidden { id: LayerId, was_base: bool },
}

/// Ordered imagery layers; index 0 is the base layer, drawn first.
#[derive(Debug, Default)]
pub struct ImageryLayerCollection {
    layers: Vec<ImageryLayer>,
    next_id: u32,
    events: Vec<LayerEvent>,
    order_changed: bool,
}

impl ImageryLayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer on top with default color adjustments.
    pub fn add(&mut self, provider: Box<dyn ImageryProvider>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(ImageryLayer {
            id,
            provider,
            alpha: LayerValue::Constant(DEFAULT_ALPHA),
            brightness: LayerValue::Constant(DEFAULT_BRIGHTNESS),
            contrast: LayerValue::Constant(DEFAULT_CONTRAST),
            hue: LayerValue::Constant(DEFAULT_HUE),
            saturation: LayerValue::Constant(DEFAULT_SATURATION),
            gamma: LayerValue::Constant(DEFAULT_GAMMA),
            show: true,
        });
        self.events.push(LayerEvent::Added(id));
        id
    }

    pub fn remove(&mut self, id: LayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let layer = self.layers.remove(index);
        self.events.push(LayerEvent::Removed {
            layer,
            was_base: index == 0,
        });
        if index < self.layers.len() {
            self.order_changed = true;
        }
        true
    }

    pub fn set_show(&mut self, id: LayerId, show: bool) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let layer = &mut self.layers[index];
        if layer.show == show {
            return;
        }
        layer.show = show;
        self.events.push(if show {
            LayerEvent::Added(id)
        } else {
            LayerEvent::Hidden {
                id,
                was_base: index == 0,
            }
        });
    }

    /// Moves a layer one step up (drawn later).
    pub fn raise(&mut self, id: LayerId) {
        if let Some(index) = self.index_of(id) {
            if index + 1 < self.layers.len() {
                self.layers.swap(index, index + 1);
                self.order_changed = true;
            }
        }
    }

    /// Moves a layer one step down (drawn earlier).
    pub fn lower(&mut self, id: LayerId) {
        if let Some(index) = self.index_of(id) {
            if index > 0 {
                self.layers.swap(index, index - 1);
                self.order_changed = true;
            }
        }
    }

    pub fn move_to(&mut self, id: LayerId, new_index: usize) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let new_index = new_index.min(self.layers.len() - 1);
        if index == new_index {
            return;
        }
        let layer = self.layers.remove(index);
        self.layers.insert(new_index, layer);
        self.order_changed = true;
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&ImageryLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut ImageryLayer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    pub fn base_layer(&self) -> Option<&ImageryLayer> {
        self.layers.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageryLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Drains pending add/remove/show events in the order they happened.
    pub fn take_events(&mut self) -> Vec<LayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns whether layer order changed since the last call.
    pub fn take_order_changed(&mut self) -> bool {
        std::mem::take(&mut self.order_changed)
    }
}
