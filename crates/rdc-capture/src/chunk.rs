//! Chunk record framing.
//!
//! A frame-capture section's decompressed buffer is a contiguous sequence of
//! chunk records, each starting on a 64-byte boundary: a 32-bit flag word
//! (low 16 bits are the chunk-type tag), optional callstack / thread id /
//! duration / timestamp fields selected by the flag bits, the payload
//! length, then the payload itself. The declared payload length is ground
//! truth; after payload decode the cursor is forced past it and re-aligned,
//! so a decoder that consumes the wrong number of bytes cannot desync the
//! stream.

use std::io::{Cursor, Seek, SeekFrom};

use tracing::warn;

use crate::error::{RdcError, Result};
use crate::io::{align_up, ReadLeExt, SeekExt, STREAM_ALIGNMENT};

const CHUNK_TAG_MASK: u32 = 0x0000_ffff;
const CHUNK_CALLSTACK: u32 = 0x0001_0000;
const CHUNK_THREAD_ID: u32 = 0x0002_0000;
const CHUNK_DURATION: u32 = 0x0004_0000;
const CHUNK_TIMESTAMP: u32 = 0x0008_0000;
const CHUNK_64BIT_SIZE: u32 = 0x0010_0000;

/// Callstacks this deep are treated as serialisation garbage and skipped.
pub const MAX_CALLSTACK_FRAMES: u32 = 4096;

/// Chunk-type tag: the low 16 bits of the flag word. Tags below
/// [`ChunkTag::FIRST_DRIVER_CHUNK`] are system chunks, tags at or above it
/// belong to the capturing driver (D3D11 here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub u32);

impl ChunkTag {
    pub const DRIVER_INIT: ChunkTag = ChunkTag(1);
    pub const INITIAL_CONTENTS_LIST: ChunkTag = ChunkTag(2);
    pub const INITIAL_CONTENTS: ChunkTag = ChunkTag(3);
    pub const CAPTURE_BEGIN: ChunkTag = ChunkTag(4);
    pub const CAPTURE_SCOPE: ChunkTag = ChunkTag(5);
    pub const CAPTURE_END: ChunkTag = ChunkTag(6);

    pub const FIRST_DRIVER_CHUNK: ChunkTag = ChunkTag(1000);

    pub const DEVICE_INITIALISATION: ChunkTag = ChunkTag(1000);
    pub const SET_RESOURCE_NAME: ChunkTag = ChunkTag(1001);
    pub const RELEASE_RESOURCE: ChunkTag = ChunkTag(1002);
    pub const CREATE_SWAP_BUFFER: ChunkTag = ChunkTag(1003);
    pub const CREATE_TEXTURE_1D: ChunkTag = ChunkTag(1004);
    pub const CREATE_TEXTURE_2D: ChunkTag = ChunkTag(1005);
    pub const CREATE_TEXTURE_3D: ChunkTag = ChunkTag(1006);
    pub const CREATE_BUFFER: ChunkTag = ChunkTag(1007);
    pub const CREATE_SHADER_RESOURCE_VIEW: ChunkTag = ChunkTag(1018);
    pub const CREATE_RENDER_TARGET_VIEW: ChunkTag = ChunkTag(1019);
    pub const CREATE_DEPTH_STENCIL_VIEW: ChunkTag = ChunkTag(1020);
    pub const UPDATE_SUBRESOURCE: ChunkTag = ChunkTag(1095);
    pub const UPDATE_SUBRESOURCE_1: ChunkTag = ChunkTag(1096);
    pub const CREATE_TEXTURE_2D_1: ChunkTag = ChunkTag(1125);

    pub fn is_system(self) -> bool {
        self.0 < Self::FIRST_DRIVER_CHUNK.0
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            ChunkTag::DRIVER_INIT => Some("DriverInit"),
            ChunkTag::INITIAL_CONTENTS_LIST => Some("InitialContentsList"),
            ChunkTag::INITIAL_CONTENTS => Some("InitialContents"),
            ChunkTag::CAPTURE_BEGIN => Some("CaptureBegin"),
            ChunkTag::CAPTURE_SCOPE => Some("CaptureScope"),
            ChunkTag::CAPTURE_END => Some("CaptureEnd"),
            ChunkTag::SET_RESOURCE_NAME => Some("SetResourceName"),
            ChunkTag::RELEASE_RESOURCE => Some("ReleaseResource"),
            ChunkTag::CREATE_SWAP_BUFFER => Some("CreateSwapBuffer"),
            ChunkTag::CREATE_TEXTURE_1D => Some("CreateTexture1D"),
            ChunkTag::CREATE_TEXTURE_2D => Some("CreateTexture2D"),
            ChunkTag::CREATE_TEXTURE_3D => Some("CreateTexture3D"),
            ChunkTag::CREATE_BUFFER => Some("CreateBuffer"),
            ChunkTag::CREATE_SHADER_RESOURCE_VIEW => Some("CreateShaderResourceView"),
            ChunkTag::CREATE_RENDER_TARGET_VIEW => Some("CreateRenderTargetView"),
            ChunkTag::CREATE_DEPTH_STENCIL_VIEW => Some("CreateDepthStencilView"),
            ChunkTag::UPDATE_SUBRESOURCE => Some("UpdateSubresource"),
            ChunkTag::UPDATE_SUBRESOURCE_1 => Some("UpdateSubresource1"),
            ChunkTag::CREATE_TEXTURE_2D_1 => Some("CreateTexture2D1"),
            _ => None,
        }
    }
}

impl core::fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}")
        } else {
            write!(f, "Chunk({})", self.0)
        }
    }
}

/// Framing metadata of one chunk record, independent of its typed payload.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    /// 1-based position in file order.
    pub index: u32,
    /// Position relative to the CaptureBegin chunk; 0 at or before it.
    pub event_id: u32,
    /// Soft delete; the bytes stay in place until rematerialisation.
    pub removed: bool,
    /// Byte offset of the record in the section buffer, 64-aligned.
    pub offset: u64,
    pub header_length: u64,
    pub payload_length: u64,
    pub tag: ChunkTag,
    pub thread_id: u64,
    /// Microseconds; -1 when the capture did not record a duration.
    pub duration_micros: i64,
    pub timestamp_micros: u64,
    pub callstack: Vec<u64>,
}

impl ChunkMeta {
    pub fn full_length(&self) -> u64 {
        self.header_length + self.payload_length
    }

    /// End of the record including alignment padding; the next record (or
    /// the end of the section buffer) starts here.
    pub fn padded_end(&self) -> u64 {
        align_up(self.offset + self.full_length(), STREAM_ALIGNMENT)
    }

    /// Decode one record header at the cursor's (already aligned) position
    /// and leave the cursor at the start of the payload.
    fn decode(cur: &mut Cursor<&[u8]>, index: u32) -> Result<Self> {
        let offset = cur.stream_position()?;

        let flags = cur.read_u32_le()?;
        if flags == 0 {
            return Err(RdcError::InvalidChunkFlags { offset });
        }
        let tag = ChunkTag(flags & CHUNK_TAG_MASK);

        let mut callstack = Vec::new();
        if flags & CHUNK_CALLSTACK != 0 {
            let frames = cur.read_u32_le()?;
            if frames < MAX_CALLSTACK_FRAMES {
                callstack.reserve_exact(frames as usize);
                for _ in 0..frames {
                    callstack.push(cur.read_u64_le()?);
                }
            } else {
                warn!(frames, "invalid callstack frame count, skipping");
                cur.skip_bytes(u64::from(frames) * 8)?;
            }
        }

        let thread_id = if flags & CHUNK_THREAD_ID != 0 {
            cur.read_u64_le()?
        } else {
            0
        };
        let duration_micros = if flags & CHUNK_DURATION != 0 {
            cur.read_i64_le()?
        } else {
            -1
        };
        let timestamp_micros = if flags & CHUNK_TIMESTAMP != 0 {
            cur.read_u64_le()?
        } else {
            0
        };
        let payload_length = if flags & CHUNK_64BIT_SIZE != 0 {
            cur.read_u64_le()?
        } else {
            u64::from(cur.read_u32_le()?)
        };

        let header_length = cur.stream_position()? - offset;

        Ok(Self {
            index,
            event_id: 0,
            removed: false,
            offset,
            header_length,
            payload_length,
            tag,
            thread_id,
            duration_micros,
            timestamp_micros,
            callstack,
        })
    }
}

/// Walk a decompressed frame-capture buffer and produce the ordered record
/// sequence, assigning 1-based indices and CaptureBegin-anchored event ids.
///
/// Returns the records and the index of the CaptureBegin chunk, if any.
pub(crate) fn scan_chunks(data: &[u8]) -> Result<(Vec<ChunkMeta>, Option<u32>)> {
    let mut metas = Vec::new();
    let mut capture_begin: Option<u32> = None;

    let len = data.len() as u64;
    let mut cur = Cursor::new(data);
    let mut index = 1u32;

    loop {
        let pos = cur.align_up_to(STREAM_ALIGNMENT)?;
        if pos >= len {
            break;
        }

        let mut meta = ChunkMeta::decode(&mut cur, index)?;
        let end = meta.offset + meta.full_length();
        if end > len {
            return Err(RdcError::OutOfBounds {
                offset: meta.offset,
                len: meta.full_length(),
                buffer: len,
            });
        }

        if capture_begin.is_none() && meta.tag == ChunkTag::CAPTURE_BEGIN {
            capture_begin = Some(index);
        }
        meta.event_id = match capture_begin {
            Some(begin) => index - begin,
            None => 0,
        };

        // The declared length is ground truth: resynchronise even if a
        // payload decoder would consume a different number of bytes.
        cur.seek(SeekFrom::Start(end))?;
        metas.push(meta);
        index += 1;
    }

    Ok((metas, capture_begin))
}
