//! Instance collection seam.
//!
//! The model renderer that draws instanced content lives outside this crate.
//! It receives decoded placements plus the batch table and reports its own
//! readiness once its asset is fetched and uploaded.

use super::batch_table::SharedBatchTable;
use crate::frame::FrameState;
use crate::i3dm::{AssetReference, Instance};
use crate::math::BoundingSphere;

/// Readiness reported by an instance collection.
#[derive(Debug)]
pub enum Readiness {
    Pending,
    Ready,
    /// Asset fetch or GPU resource failure.
    Failed(anyhow::Error),
}

/// Everything an instance collection is built from.
#[derive(Debug)]
pub struct InstanceCollectionDescriptor {
    pub instances: Vec<Instance>,
    pub batch_table: SharedBatchTable,
    pub bounding_sphere: BoundingSphere,
    pub asset: AssetReference,
}

pub trait InstanceCollection {
    /// Polled once per frame while the owning content is processing.
    fn poll_readiness(&mut self) -> Readiness;

    /// Per-frame update; pumps deferred asset and upload work.
    fn update(&mut self, frame: &FrameState);

    /// Releases GPU resources. Called at most once.
    fn destroy(&mut self);
}

pub trait InstanceCollectionFactory {
    fn create(&self, descriptor: InstanceCollectionDescriptor) -> anyhow::Result<Box<dyn InstanceCollection>>;
}
