//! Lifecycle of one streamed instanced-model payload.
//!
//! ```text
//! UNLOADED -> LOADING -> PROCESSING -> READY
//!                |            |
//!                +-> FAILED <-+
//! ```

use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::batch_table::{BatchTable, SharedBatchTable};
use super::color::Color;
use super::feature::Feature;
use super::instances::{
    InstanceCollection, InstanceCollectionDescriptor, InstanceCollectionFactory, Readiness,
};
use super::signal::Signal;
use crate::config::ContentConfig;
use crate::error::TileError;
use crate::frame::FrameState;
use crate::i3dm::{decode_i3dm, I3dmHeader};
use crate::math::BoundingSphere;
use crate::scheduler::{Delivery, PendingRequest, Request, RequestKind, RequestScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    Unloaded,
    Loading,
    Processing,
    Ready,
    Failed,
}

impl ContentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ContentState::Ready | ContentState::Failed)
    }
}

/// Outcome carried by the content signals.
pub type LoadOutcome = Result<(), Rc<TileError>>;

/// Streamed instanced-model content of one tile.
pub struct InstancedContent {
    url: String,
    /// Bounding volume of the owning tile
    bounding_sphere: BoundingSphere,
    state: ContentState,
    factory: Rc<dyn InstanceCollectionFactory>,
    request: Option<PendingRequest<Vec<u8>>>,
    batch_table: Option<SharedBatchTable>,
    collection: Option<Box<dyn InstanceCollection>>,
    features: OnceCell<Vec<Feature>>,
    features_length: usize,
    debug_color: Color,
    /// Tint requested before the batch table existed
    pending_tint: Option<Color>,
    processing: Signal<LoadOutcome>,
    ready: Signal<LoadOutcome>,
    destroyed: bool,
}

impl InstancedContent {
    pub fn new(
        url: impl Into<String>,
        bounding_sphere: BoundingSphere,
        factory: Rc<dyn InstanceCollectionFactory>,
        config: &ContentConfig,
    ) -> Self {
        Self {
            url: url.into(),
            bounding_sphere,
            state: ContentState::Unloaded,
            factory,
            request: None,
            batch_table: None,
            collection: None,
            features: OnceCell::new(),
            features_length: 0,
            debug_color: config.debug_color,
            pending_tint: None,
            processing: Signal::new(),
            ready: Signal::new(),
            destroyed: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ContentState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Resolved when decoding succeeded and `update` can pump the content.
    pub fn processing_signal(&self) -> Signal<LoadOutcome> {
        self.processing.clone()
    }

    /// Resolved once with the terminal outcome.
    pub fn ready_signal(&self) -> Signal<LoadOutcome> {
        self.ready.clone()
    }

    /// Submits the content request. Returns `false` if the scheduler declined
    /// it (retry on a later frame) or the content is not unloaded.
    pub fn request(&mut self, scheduler: &mut dyn RequestScheduler, distance: f64) -> bool {
        if self.destroyed || self.state != ContentState::Unloaded {
            return false;
        }

        match scheduler.schedule(Request::new(self.url.clone(), distance, RequestKind::TileContent)) {
            Some(pending) => {
                log::debug!("content {}: loading", self.url);
                self.request = Some(pending);
                self.state = ContentState::Loading;
                true
            }
            None => false,
        }
    }

    /// Advances the state machine. Call once per frame; a no-op once terminal.
    pub fn update(&mut self, frame: &FrameState) {
        if self.destroyed {
            return;
        }

        match self.state {
            ContentState::Loading => self.poll_request(),
            ContentState::Processing => self.poll_collection(frame),
            ContentState::Unloaded | ContentState::Ready | ContentState::Failed => {}
        }
    }

    fn poll_request(&mut self) {
        let Some(request) = self.request.as_mut() else {
            return;
        };

        match request.poll() {
            Delivery::Pending => {}
            Delivery::Failed(err) => {
                self.request = None;
                self.fail(TileError::scheduling(err));
            }
            Delivery::Delivered(bytes) => {
                self.request = None;
                if let Err(err) = self.process(bytes) {
                    self.fail(err);
                }
            }
        }
    }

    fn process(&mut self, mut bytes: Vec<u8>) -> Result<(), TileError> {
        let header = I3dmHeader::read(&bytes, 0)?;
        let byte_length = header.byte_length as usize;
        if byte_length < bytes.len() {
            bytes.truncate(byte_length);
        }

        let payload = decode_i3dm(&bytes, 0, &self.url)?;
        let instances_length = payload.instances_length();
        let batch_table = Rc::new(RefCell::new(BatchTable::new(
            instances_length,
            payload.batch_table,
        )?));
        if let Some(tint) = self.pending_tint.take() {
            batch_table.borrow_mut().set_all_colors(tint);
        }

        let collection = self
            .factory
            .create(InstanceCollectionDescriptor {
                instances: payload.instances,
                batch_table: Rc::clone(&batch_table),
                bounding_sphere: self.bounding_sphere,
                asset: payload.asset,
            })
            .map_err(TileError::AssetResource)?;

        self.batch_table = Some(batch_table);
        self.collection = Some(collection);
        self.features_length = instances_length;
        self.state = ContentState::Processing;
        log::debug!(
            "content {}: processing {} instances",
            self.url,
            instances_length
        );
        self.processing.resolve(Ok(()));
        Ok(())
    }

    fn poll_collection(&mut self, frame: &FrameState) {
        let Some(collection) = self.collection.as_mut() else {
            return;
        };

        collection.update(frame);
        match collection.poll_readiness() {
            Readiness::Pending => {}
            Readiness::Ready => {
                self.state = ContentState::Ready;
                log::debug!("content {}: ready", self.url);
                self.ready.resolve(Ok(()));
            }
            Readiness::Failed(err) => self.fail(TileError::asset_resource(err)),
        }
    }

    fn fail(&mut self, err: TileError) {
        if err.is_benign() {
            log::debug!("content {}: {}", self.url, err);
        } else {
            log::warn!("content {} failed: {}", self.url, err);
        }
        self.state = ContentState::Failed;
        let err = Rc::new(err);
        self.processing.resolve(Err(Rc::clone(&err)));
        self.ready.resolve(Err(err));
    }

    /// Number of instances; zero until the content is processed.
    pub fn features_length(&self) -> usize {
        self.features_length
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.batch_table
            .as_ref()
            .map_or(false, |table| table.borrow().has_property(name))
    }

    pub fn batch_table(&self) -> Option<&SharedBatchTable> {
        self.batch_table.as_ref()
    }

    /// Feature handle for `batch_id`. Handles are built on first access.
    ///
    /// # Panics
    ///
    /// If `batch_id >= features_length()`.
    pub fn get_feature(&self, batch_id: usize) -> &Feature {
        assert!(
            batch_id < self.features_length,
            "batch id {} out of range, must be in [0, {})",
            batch_id,
            self.features_length
        );

        let features = self.features.get_or_init(|| match self.batch_table.as_ref() {
            Some(table) => (0..self.features_length)
                .map(|id| Feature::new(Rc::clone(table), id))
                .collect(),
            None => Vec::new(),
        });
        &features[batch_id]
    }

    /// Tints every instance with `color` when enabled, white otherwise.
    /// Property values are untouched.
    pub fn apply_debug_settings(&mut self, enabled: bool, color: Color) {
        let tint = if enabled { color } else { Color::WHITE };
        match self.batch_table.as_ref() {
            Some(table) => table.borrow_mut().set_all_colors(tint),
            None => self.pending_tint = Some(tint),
        }
    }

    /// [`apply_debug_settings`](Self::apply_debug_settings) with the configured debug color.
    pub fn set_debug_coloring(&mut self, enabled: bool) {
        self.apply_debug_settings(enabled, self.debug_color);
    }

    /// Releases the instance collection and batch table. Idempotent.
    ///
    /// Destroying in-flight content discards the delivery; the terminal
    /// signal resolves with [`TileError::Discarded`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.request = None;

        if !self.state.is_terminal() && self.state != ContentState::Unloaded {
            self.fail(TileError::Discarded);
        }

        if let Some(mut collection) = self.collection.take() {
            collection.destroy();
        }
        self.batch_table = None;
        self.features = OnceCell::new();
        self.features_length = 0;
    }
}

impl Drop for InstancedContent {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for InstancedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstancedContent")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("features_length", &self.features_length)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Camera, SceneMode};
    use crate::i3dm::{encode_i3dm, AssetPayload, InstanceRecord};
    use crate::math::{Cartographic, CullingVolume, Ellipsoid};
    use std::cell::Cell;

    struct Immediate(Option<Vec<u8>>);

    impl RequestScheduler for Immediate {
        fn schedule(&mut self, _request: Request) -> Option<PendingRequest<Vec<u8>>> {
            self.0.take().map(PendingRequest::resolved)
        }
    }

    struct ReadyCollection {
        destroyed: Rc<Cell<u32>>,
    }

    impl InstanceCollection for ReadyCollection {
        fn poll_readiness(&mut self) -> Readiness {
            Readiness::Ready
        }

        fn update(&mut self, _frame: &FrameState) {}

        fn destroy(&mut self) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    struct Factory {
        destroyed: Rc<Cell<u32>>,
    }

    impl InstanceCollectionFactory for Factory {
        fn create(&self, _d: InstanceCollectionDescriptor) -> anyhow::Result<Box<dyn InstanceCollection>> {
            Ok(Box::new(ReadyCollection {
                destroyed: Rc::clone(&self.destroyed),
            }))
        }
    }

    fn frame() -> FrameState {
        let ellipsoid = Ellipsoid::WGS84;
        let camera = Camera::at_cartographic(&ellipsoid, Cartographic::from_degrees(0.0, 0.0, 1000.0));
        FrameState::new(SceneMode::Scene3D, camera, CullingVolume::default(), ellipsoid)
    }

    fn tile_bytes(count: u32) -> Vec<u8> {
        let records: Vec<_> = (0..count)
            .map(|i| InstanceRecord::new(0.01 * i as f64, 0.02, i))
            .collect();
        encode_i3dm(None, AssetPayload::Uri("tree.glb"), &records)
    }

    fn content(destroyed: &Rc<Cell<u32>>) -> InstancedContent {
        let factory = Rc::new(Factory {
            destroyed: Rc::clone(destroyed),
        });
        InstancedContent::new(
            "http://example.com/tiles/0.i3dm",
            BoundingSphere::default(),
            factory,
            &ContentConfig::default(),
        )
    }

    #[test]
    fn loads_to_ready() {
        let destroyed = Rc::new(Cell::new(0));
        let mut content = content(&destroyed);
        let mut scheduler = Immediate(Some(tile_bytes(3)));
        let frame = frame();

        assert!(content.request(&mut scheduler, 10.0));
        assert_eq!(content.state(), ContentState::Loading);
        content.update(&frame);
        assert_eq!(content.state(), ContentState::Processing);
        assert!(content.processing_signal().is_resolved());
        content.update(&frame);
        assert_eq!(content.state(), ContentState::Ready);
        assert_eq!(content.features_length(), 3);
        assert!(matches!(content.ready_signal().get(), Some(Ok(()))));
    }

    #[test]
    fn declined_request_stays_unloaded() {
        let destroyed = Rc::new(Cell::new(0));
        let mut content = content(&destroyed);
        let mut scheduler = Immediate(None);
        assert!(!content.request(&mut scheduler, 10.0));
        assert_eq!(content.state(), ContentState::Unloaded);
    }

    #[test]
    fn destroy_releases_collection_once() {
        let destroyed = Rc::new(Cell::new(0));
        let mut content = content(&destroyed);
        let mut scheduler = Immediate(Some(tile_bytes(1)));
        content.request(&mut scheduler, 0.0);
        content.update(&frame());
        content.destroy();
        content.destroy();
        drop(content);
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn debug_tint_applies_after_processing() {
        let destroyed = Rc::new(Cell::new(0));
        let mut content = content(&destroyed);
        content.set_debug_coloring(true);
        let mut scheduler = Immediate(Some(tile_bytes(2)));
        content.request(&mut scheduler, 0.0);
        content.update(&frame());
        assert_eq!(content.get_feature(1).color(), ContentConfig::default().debug_color);
        content.apply_debug_settings(false, Color::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(content.get_feature(0).color(), Color::WHITE);
    }
}
