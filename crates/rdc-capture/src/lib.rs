//! RenderDoc `.rdc` capture container engine.
//!
//! Loads a capture into a navigable chunk graph and re-emits a valid,
//! smaller capture: the layered pipeline is section decompression (raw /
//! chained LZ4 / Zstd), chunk record framing, typed payload decoding into a
//! resource graph, soft removal by event range with byte-exact
//! rematerialisation, and zero-copy in-place patching of strings and bulk
//! pixel payloads.
//!
//! The whole engine is synchronous and single-pass by design: the format
//! guarantees resource creators precede their consumers in the byte
//! stream, so the graph is built in one forward walk plus one post-load
//! resolution pass.

mod capture;
mod chunk;
mod chunks;
mod compress;
pub mod d3d11;
mod error;
mod format;
mod io;
mod manager;
mod patch;
mod section;

pub use crate::capture::CaptureFile;
pub use crate::chunk::{ChunkMeta, ChunkTag, MAX_CALLSTACK_FRAMES};
pub use crate::chunks::{
    ChunkPayload, CreateBuffer, CreateSwapBuffer, CreateTexture2d, InitialContents, ResourceType,
    ResourceView, ResourceViewDesc, SubresourceData, UpdateSubresource,
};
pub use crate::compress::{decompress_section, encode_section, LZ4_BLOCK_SIZE};
pub use crate::error::{RdcError, Result};
pub use crate::format::{
    BinaryThumbnail, CaptureMetaData, DriverId, ExtThumbnailHeader, FileHeader, FileType,
    SectionFlags, SectionHeader, SectionType, FILE_MAGIC,
};
pub use crate::io::{align_up, STREAM_ALIGNMENT};
pub use crate::manager::{Chunk, ChunkManager};
pub use crate::patch::{overwrite_strided, overwrite_string, StridedSlot, StringSlot};
pub use crate::section::{ExtendedThumbnail, Section};
