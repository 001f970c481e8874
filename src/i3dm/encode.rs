use super::header::{I3dmHeader, HEADER_BYTE_LENGTH, I3DM_MAGIC, I3DM_VERSION};

/// Wire-level instance: a position on the ellipsoid surface and its batch id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub batch_id: u32,
}

impl InstanceRecord {
    pub fn new(longitude: f64, latitude: f64, batch_id: u32) -> Self {
        Self {
            longitude,
            latitude,
            batch_id,
        }
    }
}

/// Model to reference from an encoded tile.
#[derive(Debug, Clone, Copy)]
pub enum AssetPayload<'a> {
    Uri(&'a str),
    Embedded(&'a [u8]),
}

/// Encode an I3DM tile.
///
/// Batch ids are written (as `u16`) only when a batch table is given; without one
/// the decoder numbers instances by position and `batch_id` is ignored.
///
/// # Panics
///
/// If a batch table is given and a batch id does not fit in `u16`, or the
/// tile is larger than `u32::MAX` bytes.
pub fn encode_i3dm(
    batch_table: Option<&serde_json::Value>,
    asset: AssetPayload<'_>,
    instances: &[InstanceRecord],
) -> Vec<u8> {
    let batch_table_bytes = batch_table
        .map(|table| table.to_string().into_bytes())
        .unwrap_or_default();
    let (asset_format, asset_bytes): (u32, &[u8]) = match asset {
        AssetPayload::Uri(uri) => (0, uri.as_bytes()),
        AssetPayload::Embedded(bytes) => (1, bytes),
    };
    let record_len = if batch_table_bytes.is_empty() { 16 } else { 18 };
    let byte_length =
        HEADER_BYTE_LENGTH + batch_table_bytes.len() + asset_bytes.len() + instances.len() * record_len;
    assert!(
        byte_length <= u32::MAX as usize,
        "i3dm tile of {} bytes exceeds the u32 length field",
        byte_length
    );
    if record_len == 18 {
        if let Some(record) = instances.iter().find(|r| r.batch_id > u16::MAX as u32) {
            panic!("batch id {} does not fit the u16 wire field", record.batch_id);
        }
    }

    let header = I3dmHeader {
        magic: I3DM_MAGIC,
        version: I3DM_VERSION,
        byte_length: byte_length as u32,
        batch_table_byte_length: batch_table_bytes.len() as u32,
        asset_byte_length: asset_bytes.len() as u32,
        asset_format,
        instances_length: instances.len() as u32,
    };

    let mut out = Vec::with_capacity(byte_length);
    out.extend_from_slice(&header.to_le_bytes());
    out.extend_from_slice(&batch_table_bytes);
    out.extend_from_slice(asset_bytes);
    for instance in instances {
        out.extend_from_slice(&instance.longitude.to_le_bytes());
        out.extend_from_slice(&instance.latitude.to_le_bytes());
        if record_len == 18 {
            out.extend_from_slice(&(instance.batch_id as u16).to_le_bytes());
        }
    }
    out
}
