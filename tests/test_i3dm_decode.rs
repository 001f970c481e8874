// tests/test_i3dm_decode.rs
// Decoder contract for instanced-model tiles: exact round trips and header validation.

use globe_tiles::error::FormatError;
use globe_tiles::i3dm::{decode_i3dm, encode_i3dm, AssetPayload, AssetReference, InstanceRecord};
use serde_json::json;

fn sample_records(count: u32) -> Vec<InstanceRecord> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count.max(1) as f64;
            // Awkward values so a lossy path would show up in the bits.
            InstanceRecord::new(-3.0 + 6.0 * t + 1e-13, -1.5 + 3.0 * t / 3.0, (count - 1 - i) % count.max(1))
        })
        .collect()
}

#[test]
fn round_trip_with_batch_table_is_bit_exact() {
    let records = sample_records(5);
    let table = json!({ "height": [1, 2, 3, 4, 5] });
    let data = encode_i3dm(Some(&table), AssetPayload::Uri("models/tree.glb"), &records);

    let payload = decode_i3dm(&data, 0, "https://host/tiles/12/3.i3dm").unwrap();
    assert_eq!(payload.instances_length(), records.len());
    for (instance, record) in payload.instances.iter().zip(&records) {
        let decoded = instance.record();
        assert_eq!(decoded.longitude.to_bits(), record.longitude.to_bits());
        assert_eq!(decoded.latitude.to_bits(), record.latitude.to_bits());
        assert_eq!(decoded.batch_id, record.batch_id);
    }
    assert_eq!(
        payload.asset,
        AssetReference::Uri("https://host/tiles/12/models/tree.glb".into())
    );
    assert_eq!(payload.batch_table.unwrap()["height"], json!([1, 2, 3, 4, 5]));
}

#[test]
fn round_trip_without_batch_table_numbers_by_position() {
    let records: Vec<_> = (0..4).map(|i| InstanceRecord::new(0.25 * i as f64, 0.1, i)).collect();
    let data = encode_i3dm(None, AssetPayload::Embedded(&[1, 2, 3]), &records);
    let payload = decode_i3dm(&data, 0, "tiles/a.i3dm").unwrap();

    let decoded: Vec<_> = payload.instances.iter().map(|i| i.record()).collect();
    assert_eq!(decoded, records);
}

#[test]
fn decodes_at_byte_offset() {
    let records = sample_records(2);
    let mut data = vec![0xAB; 7];
    data.extend(encode_i3dm(None, AssetPayload::Uri("m.glb"), &records));
    let payload = decode_i3dm(&data, 7, "").unwrap();
    assert_eq!(payload.instances.len(), 2);
}

#[test]
fn zero_instances_is_valid() {
    let data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &[]);
    let payload = decode_i3dm(&data, 0, "").unwrap();
    assert!(payload.instances.is_empty());
}

#[test]
fn bad_magic_is_rejected() {
    let mut data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &sample_records(1));
    data[0..4].copy_from_slice(b"b3dm");
    assert_eq!(
        decode_i3dm(&data, 0, "").unwrap_err(),
        FormatError::BadMagic(*b"b3dm")
    );
}

#[test]
fn unsupported_version_is_rejected() {
    let mut data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &sample_records(1));
    data[4..8].copy_from_slice(&2u32.to_le_bytes());
    assert_eq!(
        decode_i3dm(&data, 0, "").unwrap_err(),
        FormatError::UnsupportedVersion(2)
    );
}

#[test]
fn asset_format_outside_zero_or_one_is_rejected() {
    let mut data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &sample_records(1));
    data[20..24].copy_from_slice(&2u32.to_le_bytes());
    assert_eq!(
        decode_i3dm(&data, 0, "").unwrap_err(),
        FormatError::BadAssetFormat(2)
    );
}

#[test]
fn short_header_is_truncation() {
    let data = encode_i3dm(None, AssetPayload::Uri("m.glb"), &[]);
    assert!(matches!(
        decode_i3dm(&data[..10], 0, ""),
        Err(FormatError::Truncated { .. })
    ));
}
