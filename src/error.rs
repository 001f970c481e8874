//! Central error handling for tile decoding and streaming
//!
//! Every failure that can end a tile's content lifecycle is expressed as a
//! [`TileError`]. Failures are isolated per tile: they are reported through the
//! content's terminal signal and never abort the frame loop.

/// Malformed or unsupported instanced-tile container.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid magic {0:?}, expected \"i3dm\"")]
    BadMagic([u8; 4]),

    #[error("unsupported version {0}, expected 1")]
    UnsupportedVersion(u32),

    #[error("invalid asset format {0}, expected 0 (uri) or 1 (embedded)")]
    BadAssetFormat(u32),

    #[error("asset uri is not valid UTF-8: {0}")]
    BadAssetUri(std::str::Utf8Error),

    #[error("invalid batch table: {0}")]
    BadBatchTable(String),

    #[error("buffer truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("batch id {batch_id} out of range for {instances} instances")]
    BatchIdOutOfRange { batch_id: u16, instances: usize },
}

/// Centralized error type for tile content operations
#[derive(thiserror::Error, Debug)]
pub enum TileError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Scheduling failure: {0}")]
    Scheduling(#[source] anyhow::Error),

    #[error("Asset resource failure: {0}")]
    AssetResource(#[source] anyhow::Error),

    /// The content was destroyed while its request was still in flight.
    #[error("content destroyed before delivery completed")]
    Discarded,
}

impl TileError {
    pub fn scheduling<E: Into<anyhow::Error>>(err: E) -> Self {
        TileError::Scheduling(err.into())
    }

    pub fn asset_resource<E: Into<anyhow::Error>>(err: E) -> Self {
        TileError::AssetResource(err.into())
    }

    /// Benign outcomes are not reported to the user.
    pub fn is_benign(&self) -> bool {
        matches!(self, TileError::Discarded)
    }

    pub fn category(&self) -> &'static str {
        match self {
            TileError::Format(_) => "Format",
            TileError::Scheduling(_) => "Scheduling",
            TileError::AssetResource(_) => "AssetResource",
            TileError::Discarded => "Discarded",
        }
    }
}

/// Result type alias for tile operations
pub type TileResult<T> = Result<T, TileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_converts_into_tile_error() {
        let err: TileError = FormatError::UnsupportedVersion(2).into();
        assert_eq!(err.category(), "Format");
        assert!(err.to_string().contains("unsupported version 2"));
        assert!(!err.is_benign());
    }

    #[test]
    fn discarded_is_benign() {
        assert!(TileError::Discarded.is_benign());
        assert!(!TileError::scheduling(anyhow::anyhow!("404")).is_benign());
    }
}
