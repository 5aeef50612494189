//! Per-section compression backend.
//!
//! Decode dispatches on the section flags: raw passthrough, whole-buffer
//! Zstd, or RenderDoc's chained LZ4 block stream. Encode only ever emits
//! raw bytes; re-compressing on write is out of scope.

use crate::error::{RdcError, Result};
use crate::format::{SectionFlags, SectionHeader};

/// Maximum decoded size of one LZ4 block in the chained stream.
pub const LZ4_BLOCK_SIZE: usize = 64 * 1024;

/// Decompress a section's on-disk bytes to exactly
/// `header.uncompressed_length` bytes.
pub fn decompress_section(header: &SectionHeader, raw: &[u8]) -> Result<Vec<u8>> {
    let expected = header.uncompressed_length;
    let data = if header.flags.contains(SectionFlags::LZ4_COMPRESSED) {
        decompress_lz4_chained(raw, expected)?
    } else if header.flags.contains(SectionFlags::ZSTD_COMPRESSED) {
        let capacity = usize::try_from(expected)
            .map_err(|_| RdcError::Corrupt("section uncompressed length overflow"))?;
        zstd::bulk::decompress(raw, capacity).map_err(RdcError::ZstdDecompress)?
    } else {
        raw.to_vec()
    };

    if data.len() as u64 != expected {
        return Err(RdcError::DecodedLengthMismatch {
            expected,
            found: data.len() as u64,
        });
    }
    Ok(data)
}

/// Raw-only encode: the returned flags carry no compression bits.
pub fn encode_section(data: &[u8]) -> (Vec<u8>, SectionFlags) {
    (data.to_vec(), SectionFlags::empty())
}

/// Decode the chained LZ4 block stream.
///
/// The stream is a sequence of blocks, each prefixed with its own `u32`
/// compressed byte length and decoding to at most [`LZ4_BLOCK_SIZE`] bytes.
/// Matches in block N may reach back into the decoded bytes of block N-1,
/// so decoding alternates between two fixed-size buffers: the previous
/// block stays addressable as the dictionary while the next one is
/// produced.
fn decompress_lz4_chained(raw: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(expected_len)
        .map_err(|_| RdcError::Corrupt("section uncompressed length overflow"))?;
    let mut out = Vec::new();
    out.try_reserve_exact(capacity)
        .map_err(|_| RdcError::OutOfMemory { len: capacity })?;

    let mut cur = vec![0u8; LZ4_BLOCK_SIZE];
    let mut prev = vec![0u8; LZ4_BLOCK_SIZE];
    let mut prev_len = 0usize;

    let mut pos = 0usize;
    while pos < raw.len() {
        if raw.len() - pos < 4 {
            return Err(RdcError::Corrupt("truncated lz4 block length prefix"));
        }
        let block_len = u32::from_le_bytes(raw[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if block_len == 0 || block_len > raw.len() - pos {
            return Err(RdcError::Corrupt("lz4 block length out of range"));
        }

        let block = &raw[pos..pos + block_len];
        pos += block_len;

        let decoded =
            lz4_flex::block::decompress_into_with_dict(block, &mut cur, &prev[..prev_len])?;
        out.extend_from_slice(&cur[..decoded]);

        std::mem::swap(&mut cur, &mut prev);
        prev_len = decoded;
    }

    if out.len() as u64 != expected_len {
        return Err(RdcError::DecodedLengthMismatch {
            expected: expected_len,
            found: out.len() as u64,
        });
    }
    Ok(out)
}
