//! I3DM (instanced 3D model) tile container
//!
//! Layout (little-endian):
//!
//! ```text
//! 00 [u8; 4] magic "i3dm"
//! 04 u32     version (1)
//! 08 u32     total byte length
//! 0C u32     batch table byte length
//! 10 u32     embedded asset byte length
//! 14 u32     asset format (0 = uri, 1 = embedded bytes)
//! 18 u32     instance count N
//! 1C         batch table JSON (optional)
//! ..         asset bytes
//! ..         N x (f64 longitude, f64 latitude, [u16 batch id if batch table present])
//! ```

mod decode;
mod encode;
mod header;
mod uri;

pub use decode::{decode_i3dm, AssetReference, I3dmPayload, Instance};
pub use encode::{encode_i3dm, AssetPayload, InstanceRecord};
pub use header::{I3dmHeader, HEADER_BYTE_LENGTH, I3DM_MAGIC, I3DM_VERSION};
pub use uri::{base_directory, resolve_uri};
