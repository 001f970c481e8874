//! Instanced tile content: batch tables, feature handles and the load state machine

mod batch_table;
mod color;
mod feature;
mod instances;
mod signal;
mod tile_content;

pub use batch_table::{BatchTable, SharedBatchTable};
pub use color::Color;
pub use feature::Feature;
pub use instances::{InstanceCollection, InstanceCollectionDescriptor, InstanceCollectionFactory, Readiness};
pub use signal::Signal;
pub use tile_content::{ContentState, InstancedContent, LoadOutcome};
