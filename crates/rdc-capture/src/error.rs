use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RdcError>;

#[derive(Debug, Error)]
pub enum RdcError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("out of memory allocating {len} bytes")]
    OutOfMemory { len: usize },

    #[error("invalid capture magic")]
    InvalidMagic,

    #[error("ascii-stored sections are not supported")]
    AsciiSection,

    #[error("capture has no frame capture section")]
    MissingFrameCapture,

    #[error("corrupt capture: {0}")]
    Corrupt(&'static str),

    #[error("section decoded to {found} bytes, header declares {expected}")]
    DecodedLengthMismatch { expected: u64, found: u64 },

    #[error("chunk flag word is zero at offset {offset}")]
    InvalidChunkFlags { offset: u64 },

    #[error("duplicate resource id {0}")]
    DuplicateResourceId(u64),

    #[error("duplicate initial contents registration for resource id {0}")]
    DuplicateInitialContents(u64),

    #[error("out of bounds: offset={offset} len={len} buffer={buffer}")]
    OutOfBounds { offset: u64, len: u64, buffer: u64 },

    #[error("string of {len} bytes does not fit the {max} byte field")]
    StringTooLong { len: usize, max: usize },

    #[error("bulk patch size mismatch (expected {expected} bytes, found {found})")]
    BulkSizeMismatch { expected: usize, found: usize },

    #[error("pixel dimensions {found_width}x{found_height} do not match resource {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("invalid event range {from}..={to}")]
    InvalidEventRange { from: u32, to: u32 },

    #[error("lz4 decompression failed: {0}")]
    Lz4Decompress(#[from] lz4_flex::block::DecompressError),

    #[error("zstd decompression failed: {0}")]
    ZstdDecompress(io::Error),

    #[error("utf-8 decoding failed: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
