use glam::DMat4;

use super::header::{I3dmHeader, HEADER_BYTE_LENGTH};
use super::uri::{base_directory, resolve_uri};
use super::encode::InstanceRecord;
use crate::error::FormatError;
use crate::math::{Cartographic, Ellipsoid};

/// Model referenced by an instanced tile.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetReference {
    /// External model, already resolved against the tile URL.
    Uri(String),
    /// Model bytes carried inside the tile; relative references inside them
    /// resolve against `base_path`.
    Embedded { bytes: Vec<u8>, base_path: String },
}

/// A single placement of the instanced model.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Longitude in radians
    pub longitude: f64,
    /// Latitude in radians
    pub latitude: f64,
    pub batch_id: u32,
    /// East-north-up frame at the instance position on the ellipsoid surface
    pub transform: DMat4,
}

impl Instance {
    pub fn record(&self) -> InstanceRecord {
        InstanceRecord {
            longitude: self.longitude,
            latitude: self.latitude,
            batch_id: self.batch_id,
        }
    }
}

/// Decoded I3DM payload
#[derive(Debug, Clone)]
pub struct I3dmPayload {
    pub header: I3dmHeader,
    /// Batch table JSON (parsed, if present)
    pub batch_table: Option<serde_json::Map<String, serde_json::Value>>,
    pub asset: AssetReference,
    pub instances: Vec<Instance>,
}

impl I3dmPayload {
    pub fn instances_length(&self) -> usize {
        self.instances.len()
    }
}

fn take<'a>(data: &'a [u8], offset: usize, len: usize) -> Result<&'a [u8], FormatError> {
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    data.get(offset..end).ok_or(FormatError::Truncated {
        needed: end,
        available: data.len(),
    })
}

fn read_f64(bytes: &[u8], at: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    f64::from_le_bytes(raw)
}

/// Decode an I3DM tile starting at `byte_offset`.
///
/// `base_url` is the URL the tile was fetched from; external asset URIs resolve
/// against it. Decoding is synchronous and has no side effects.
pub fn decode_i3dm(data: &[u8], byte_offset: usize, base_url: &str) -> Result<I3dmPayload, FormatError> {
    let header = I3dmHeader::read(data, byte_offset)?;
    let mut offset = byte_offset + HEADER_BYTE_LENGTH;

    let batch_table = if header.has_batch_table() {
        let bytes = take(data, offset, header.batch_table_byte_length as usize)?;
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| FormatError::BadBatchTable(e.to_string()))?;
        match value {
            serde_json::Value::Object(map) => Some(map),
            other => {
                return Err(FormatError::BadBatchTable(format!(
                    "expected a JSON object, found {other}"
                )))
            }
        }
    } else {
        None
    };
    offset += header.batch_table_byte_length as usize;

    let asset_bytes = take(data, offset, header.asset_byte_length as usize)?;
    let asset = if header.asset_format == 0 {
        let uri = std::str::from_utf8(asset_bytes).map_err(FormatError::BadAssetUri)?;
        let uri = uri.trim_end_matches('\0').trim();
        AssetReference::Uri(resolve_uri(base_url, uri))
    } else {
        AssetReference::Embedded {
            bytes: asset_bytes.to_vec(),
            base_path: base_directory(base_url).to_string(),
        }
    };
    offset += header.asset_byte_length as usize;

    let count = header.instances_length as usize;
    let record_len = header.record_byte_length();
    let records = take(data, offset, count.saturating_mul(record_len))?;

    let ellipsoid = Ellipsoid::WGS84;
    let mut instances = Vec::with_capacity(count);
    for (index, record) in records.chunks_exact(record_len).enumerate() {
        let longitude = read_f64(record, 0);
        let latitude = read_f64(record, 8);
        let batch_id = if header.has_batch_table() {
            let id = u16::from_le_bytes([record[16], record[17]]);
            if id as usize >= count {
                return Err(FormatError::BatchIdOutOfRange {
                    batch_id: id,
                    instances: count,
                });
            }
            id as u32
        } else {
            // Without a batch table instances are numbered in file order.
            index as u32
        };

        let position = ellipsoid.cartographic_to_cartesian(&Cartographic::new(longitude, latitude, 0.0));
        instances.push(Instance {
            longitude,
            latitude,
            batch_id,
            transform: ellipsoid.east_north_up_to_fixed_frame(position),
        });
    }

    log::debug!(
        "decoded i3dm: {} instances, batch table: {}, embedded asset: {}",
        instances.len(),
        batch_table.is_some(),
        header.asset_format == 1
    );

    Ok(I3dmPayload {
        header,
        batch_table,
        asset,
        instances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i3dm::{encode_i3dm, AssetPayload};
    use serde_json::json;

    #[test]
    fn decodes_instances_without_batch_table() {
        let records = [
            InstanceRecord::new(0.1, 0.2, 0),
            InstanceRecord::new(-1.0, 0.5, 1),
        ];
        let data = encode_i3dm(None, AssetPayload::Uri("tree.glb"), &records);
        let payload = decode_i3dm(&data, 0, "https://host/tiles/a.i3dm").unwrap();

        assert!(payload.batch_table.is_none());
        assert_eq!(payload.asset, AssetReference::Uri("https://host/tiles/tree.glb".into()));
        assert_eq!(payload.instances.len(), 2);
        assert_eq!(payload.instances[1].batch_id, 1);
        assert_eq!(payload.instances[1].longitude.to_bits(), (-1.0f64).to_bits());
    }

    #[test]
    fn transform_origin_lies_on_the_ellipsoid() {
        let data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &[InstanceRecord::new(0.0, 0.0, 0)]);
        let payload = decode_i3dm(&data, 0, "").unwrap();
        let origin = payload.instances[0].transform.w_axis.truncate();
        assert!((origin.x - 6_378_137.0).abs() < 1e-6);
        assert!(origin.y.abs() < 1e-6 && origin.z.abs() < 1e-6);
    }

    #[test]
    fn embedded_asset_keeps_base_path() {
        let data = encode_i3dm(None, AssetPayload::Embedded(b"glTF...."), &[]);
        let payload = decode_i3dm(&data, 0, "https://host/tiles/a.i3dm").unwrap();
        assert_eq!(
            payload.asset,
            AssetReference::Embedded {
                bytes: b"glTF....".to_vec(),
                base_path: "https://host/tiles/".into()
            }
        );
        assert_eq!(payload.instances_length(), 0);
    }

    #[test]
    fn batch_table_must_be_an_object() {
        let table = json!([1, 2, 3]);
        let data = encode_i3dm(Some(&table), AssetPayload::Uri("m.glb"), &[]);
        assert!(matches!(
            decode_i3dm(&data, 0, ""),
            Err(FormatError::BadBatchTable(_))
        ));
    }

    #[test]
    fn malformed_batch_table_json_is_rejected() {
        let mut data = encode_i3dm(Some(&json!({"a": [1]})), AssetPayload::Uri("m.glb"), &[InstanceRecord::new(0.0, 0.0, 0)]);
        // Corrupt the opening brace of the JSON.
        data[HEADER_BYTE_LENGTH] = b'x';
        assert!(matches!(
            decode_i3dm(&data, 0, ""),
            Err(FormatError::BadBatchTable(_))
        ));
    }

    #[test]
    fn non_utf8_asset_uri_is_rejected() {
        let mut data = encode_i3dm(None, AssetPayload::Embedded(&[b'a', 0xFF, b'b']), &[]);
        // Same bytes, but declared as an external uri.
        data[20..24].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            decode_i3dm(&data, 0, ""),
            Err(FormatError::BadAssetUri(_))
        ));
    }

    #[test]
    fn batch_id_beyond_instance_count_is_rejected() {
        let table = json!({ "height": [1.0, 2.0] });
        let records = [InstanceRecord::new(0.0, 0.0, 0), InstanceRecord::new(0.0, 0.0, 2)];
        let data = encode_i3dm(Some(&table), AssetPayload::Uri("m.glb"), &records);
        assert_eq!(
            decode_i3dm(&data, 0, "").unwrap_err(),
            FormatError::BatchIdOutOfRange {
                batch_id: 2,
                instances: 2
            }
        );
    }

    #[test]
    fn missing_instance_records_are_truncation() {
        let data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &[InstanceRecord::new(0.0, 0.0, 0)]);
        let cut = &data[..data.len() - 1];
        assert!(matches!(
            decode_i3dm(cut, 0, ""),
            Err(FormatError::Truncated { .. })
        ));
    }
}
