use bytemuck::{Pod, Zeroable};

use crate::error::FormatError;

pub const I3DM_MAGIC: [u8; 4] = *b"i3dm";
pub const I3DM_VERSION: u32 = 1;
pub const HEADER_BYTE_LENGTH: usize = std::mem::size_of::<I3dmHeader>();

/// I3DM file header (28 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct I3dmHeader {
    /// Magic bytes "i3dm"
    pub magic: [u8; 4],
    /// Version (must be 1)
    pub version: u32,
    /// Total byte length of the tile
    pub byte_length: u32,
    pub batch_table_byte_length: u32,
    pub asset_byte_length: u32,
    /// 0 = asset is a URI, 1 = asset is embedded
    pub asset_format: u32,
    pub instances_length: u32,
}

impl I3dmHeader {
    /// Reads and validates the header at `byte_offset`.
    pub fn read(data: &[u8], byte_offset: usize) -> Result<Self, FormatError> {
        let available = data.len().saturating_sub(byte_offset);
        if available < HEADER_BYTE_LENGTH {
            return Err(FormatError::Truncated {
                needed: HEADER_BYTE_LENGTH,
                available,
            });
        }

        let bytes = &data[byte_offset..byte_offset + HEADER_BYTE_LENGTH];
        let header: I3dmHeader = bytemuck::pod_read_unaligned(bytes);
        let header = header.from_le();

        if header.magic != I3DM_MAGIC {
            return Err(FormatError::BadMagic(header.magic));
        }
        if header.version != I3DM_VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }
        if header.asset_format > 1 {
            return Err(FormatError::BadAssetFormat(header.asset_format));
        }
        Ok(header)
    }

    pub fn has_batch_table(&self) -> bool {
        self.batch_table_byte_length > 0
    }

    /// Size of one instance record in bytes.
    pub fn record_byte_length(&self) -> usize {
        if self.has_batch_table() {
            18
        } else {
            16
        }
    }

    fn from_le(self) -> Self {
        Self {
            magic: self.magic,
            version: u32::from_le(self.version),
            byte_length: u32::from_le(self.byte_length),
            batch_table_byte_length: u32::from_le(self.batch_table_byte_length),
            asset_byte_length: u32::from_le(self.asset_byte_length),
            asset_format: u32::from_le(self.asset_format),
            instances_length: u32::from_le(self.instances_length),
        }
    }

    pub(crate) fn to_le_bytes(self) -> [u8; HEADER_BYTE_LENGTH] {
        let le = Self {
            magic: self.magic,
            version: self.version.to_le(),
            byte_length: self.byte_length.to_le(),
            batch_table_byte_length: self.batch_table_byte_length.to_le(),
            asset_byte_length: self.asset_byte_length.to_le(),
            asset_format: self.asset_format.to_le(),
            instances_length: self.instances_length.to_le(),
        };
        let mut out = [0u8; HEADER_BYTE_LENGTH];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: &[u8; 4], version: u32, asset_format: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(magic);
        for v in [version, 28, 0, 0, asset_format, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn header_is_28_bytes() {
        assert_eq!(HEADER_BYTE_LENGTH, 28);
    }

    #[test]
    fn reads_at_unaligned_offset() {
        let mut data = vec![0xAA; 3];
        data.extend(header_bytes(b"i3dm", 1, 1));
        let header = I3dmHeader::read(&data, 3).unwrap();
        assert_eq!(header.byte_length, 28);
        assert_eq!(header.asset_format, 1);
        assert_eq!(header.record_byte_length(), 16);
    }

    #[test]
    fn rejects_bad_fields_in_order() {
        assert_eq!(
            I3dmHeader::read(&header_bytes(b"b3dm", 1, 0), 0),
            Err(FormatError::BadMagic(*b"b3dm"))
        );
        assert_eq!(
            I3dmHeader::read(&header_bytes(b"i3dm", 2, 0), 0),
            Err(FormatError::UnsupportedVersion(2))
        );
        assert_eq!(
            I3dmHeader::read(&header_bytes(b"i3dm", 1, 2), 0),
            Err(FormatError::BadAssetFormat(2))
        );
    }

    #[test]
    fn short_buffer_is_truncated() {
        assert_eq!(
            I3dmHeader::read(b"i3dm", 0),
            Err(FormatError::Truncated {
                needed: 28,
                available: 4
            })
        );
    }
}
