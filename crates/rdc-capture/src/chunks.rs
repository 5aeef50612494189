//! Typed chunk payload decoding.
//!
//! One decode function per known tag, dispatched by a closed `match` on the
//! wire tag. Unknown tags decode to an opaque payload and rely on the
//! framing parser's resynchronisation. Bulk byte regions are recorded as
//! bounds-checked (offset, length) locators into the section buffer, never
//! copied, so they can be patched in place later.

use std::io::{Cursor, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::chunk::{ChunkMeta, ChunkTag};
use crate::d3d11::{
    subresource_byte_size, BufferDesc, DepthStencilViewDesc, InitParams, RenderTargetViewDesc,
    ShaderResourceViewDesc, Texture2dDesc,
};
use crate::error::{RdcError, Result};
use crate::io::{ReadLeExt, SeekExt, STREAM_ALIGNMENT};
use crate::manager::ChunkManager;

/// Initial-contents resource kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType(pub u32);

impl ResourceType {
    pub const UNKNOWN: ResourceType = ResourceType(0);
    pub const INPUT_LAYOUT: ResourceType = ResourceType(1);
    pub const SAMPLER: ResourceType = ResourceType(2);
    pub const STATE: ResourceType = ResourceType(3);
    pub const TEXTURE_1D: ResourceType = ResourceType(4);
    pub const TEXTURE_2D: ResourceType = ResourceType(5);
    pub const TEXTURE_3D: ResourceType = ResourceType(6);
    pub const BUFFER: ResourceType = ResourceType(7);
}

/// One subresource's bulk bytes, located in the section buffer.
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData {
    pub row_pitch: u32,
    pub slice_pitch: u32,
    pub offset: u64,
    pub len: u64,
}

impl SubresourceData {
    fn shift(&mut self, delta: i64) {
        self.offset = self.offset.wrapping_add_signed(delta);
    }
}

#[derive(Debug, Clone)]
pub struct InitialContents {
    pub resource_type: ResourceType,
    pub subresources: Vec<SubresourceData>,
    pub omitted: bool,
}

#[derive(Debug, Clone)]
pub struct CreateTexture2d {
    pub desc: Texture2dDesc,
    /// Creation-time initial data; empty when the resource is initialised
    /// by a separate InitialContents chunk instead.
    pub initial_data: Vec<SubresourceData>,
}

#[derive(Debug, Clone)]
pub struct CreateSwapBuffer {
    pub buffer: u32,
    pub desc: Texture2dDesc,
}

#[derive(Debug, Clone)]
pub struct CreateBuffer {
    pub desc: BufferDesc,
    pub initial_data: Vec<SubresourceData>,
}

#[derive(Debug, Clone)]
pub enum ResourceViewDesc {
    RenderTarget(RenderTargetViewDesc),
    ShaderResource(ShaderResourceViewDesc),
    DepthStencil(DepthStencilViewDesc),
}

#[derive(Debug, Clone)]
pub struct ResourceView {
    pub desc: Option<ResourceViewDesc>,
}

#[derive(Debug, Clone)]
pub struct UpdateSubresource {
    pub context_id: u64,
    pub dst_subresource: u32,
    pub box_present: bool,
    /// left, top, front, right, bottom, back; serialised even when absent.
    pub dst_box: [u32; 6],
    pub row_pitch: u32,
    pub depth_pitch: u32,
    pub copy_flags: u32,
    pub is_update: bool,
    pub offset: u64,
    pub len: u64,
}

/// Decoded payload of one chunk; `Opaque` carries only the framing
/// metadata.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Opaque,
    DriverInit(InitParams),
    InitialContents(InitialContents),
    CreateTexture2d(CreateTexture2d),
    CreateSwapBuffer(CreateSwapBuffer),
    CreateBuffer(CreateBuffer),
    SetResourceName { name: String },
    ResourceView(ResourceView),
    UpdateSubresource(UpdateSubresource),
}

impl ChunkPayload {
    /// Adjust recorded buffer offsets after the owning chunk was moved by
    /// `delta` bytes during rematerialisation.
    pub(crate) fn shift_offsets(&mut self, delta: i64) {
        match self {
            ChunkPayload::DriverInit(params) => params.adapter_desc.description_slot.shift(delta),
            ChunkPayload::InitialContents(ic) => {
                for sub in &mut ic.subresources {
                    sub.shift(delta);
                }
            }
            ChunkPayload::CreateTexture2d(tex) => {
                for sub in &mut tex.initial_data {
                    sub.shift(delta);
                }
            }
            ChunkPayload::CreateBuffer(buf) => {
                for sub in &mut buf.initial_data {
                    sub.shift(delta);
                }
            }
            ChunkPayload::UpdateSubresource(upd) => {
                upd.offset = upd.offset.wrapping_add_signed(delta);
            }
            _ => {}
        }
    }
}

/// Identity and relations extracted alongside the payload.
#[derive(Debug)]
pub(crate) struct DecodedChunk {
    pub payload: ChunkPayload,
    pub resource_id: u64,
    pub parent_id: u64,
    pub name: Option<String>,
}

impl DecodedChunk {
    fn opaque() -> Self {
        Self {
            payload: ChunkPayload::Opaque,
            resource_id: 0,
            parent_id: 0,
            name: None,
        }
    }
}

/// Decode the payload of one record. The cursor handed to each decoder
/// starts at `meta.offset + meta.header_length`; the caller resynchronises
/// afterwards regardless of how many bytes were consumed.
pub(crate) fn decode_chunk(
    meta: &ChunkMeta,
    data: &[u8],
    mgr: &ChunkManager,
) -> Result<DecodedChunk> {
    let mut cur = Cursor::new(data);
    cur.seek(SeekFrom::Start(meta.offset + meta.header_length))?;

    match meta.tag {
        ChunkTag::DRIVER_INIT => decode_driver_init(&mut cur),
        ChunkTag::INITIAL_CONTENTS => decode_initial_contents(&mut cur, mgr),
        ChunkTag::CREATE_TEXTURE_2D => decode_create_texture2d(&mut cur),
        ChunkTag::CREATE_SWAP_BUFFER => decode_create_swap_buffer(&mut cur),
        ChunkTag::CREATE_BUFFER => decode_create_buffer(&mut cur),
        ChunkTag::SET_RESOURCE_NAME => decode_set_resource_name(&mut cur),
        ChunkTag::CREATE_RENDER_TARGET_VIEW
        | ChunkTag::CREATE_SHADER_RESOURCE_VIEW
        | ChunkTag::CREATE_DEPTH_STENCIL_VIEW => decode_resource_view(&mut cur, meta.tag),
        ChunkTag::UPDATE_SUBRESOURCE | ChunkTag::UPDATE_SUBRESOURCE_1 => {
            decode_update_subresource(&mut cur)
        }
        tag => {
            if !tag.is_system() && tag.name().is_none() {
                debug!(tag = tag.0, index = meta.index, "unknown chunk tag");
            }
            Ok(DecodedChunk::opaque())
        }
    }
}

/// `u64` byte count, alignment padding, then the bytes themselves. Returns
/// the located span and leaves the cursor past it.
fn read_bytes_locator(cur: &mut Cursor<&[u8]>) -> Result<(u64, u64)> {
    let len = cur.read_u64_le()?;
    cur.align_up_to(STREAM_ALIGNMENT)?;
    let offset = cur.stream_position()?;
    let end = offset
        .checked_add(len)
        .ok_or(RdcError::Corrupt("byte array length overflow"))?;
    let buffer = cur.get_ref().len() as u64;
    if end > buffer {
        return Err(RdcError::OutOfBounds {
            offset,
            len,
            buffer,
        });
    }
    cur.seek(SeekFrom::Start(end))?;
    Ok((offset, len))
}

fn decode_driver_init(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let params = InitParams::decode(cur)?;
    Ok(DecodedChunk {
        payload: ChunkPayload::DriverInit(params),
        resource_id: 0,
        parent_id: 0,
        name: None,
    })
}

fn decode_set_resource_name(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let parent_id = cur.read_u64_le()?;
    let name = cur.read_inline_string()?;
    Ok(DecodedChunk {
        payload: ChunkPayload::SetResourceName { name: name.clone() },
        resource_id: 0,
        parent_id,
        name: Some(name),
    })
}

fn decode_create_texture2d(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let desc = Texture2dDesc::decode(cur)?;

    // First pass: the subresource array. The inline byte arrays here are
    // placeholders; the real data follows the resource id.
    let count = cur.read_u64_le()?;
    let mut initial_data = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let (offset, len) = read_bytes_locator(cur)?;
        let row_pitch = cur.read_u32_le()?;
        let slice_pitch = cur.read_u32_le()?;
        initial_data.push(SubresourceData {
            row_pitch,
            slice_pitch,
            offset,
            len,
        });
    }

    let resource_id = cur.read_u64_le()?;

    // Second pass: the actual bytes, one array per subresource, each
    // followed by a u32 length check against the format arithmetic. This
    // layout is independent from the InitialContents chunk layout for the
    // same resource and must stay that way.
    let mips = desc.mip_levels.max(1);
    for (i, sub) in initial_data.iter_mut().enumerate() {
        let (offset, len) = read_bytes_locator(cur)?;
        let check = cur.read_u32_le()?;
        let expected = subresource_byte_size(desc.width, desc.height, 1, desc.format, i as u32 % mips);
        if u64::from(check) != len || u64::from(check) != expected {
            warn!(
                subresource = i,
                check,
                len,
                expected,
                "texture data length check mismatch"
            );
        }
        sub.offset = offset;
        sub.len = len;
    }

    Ok(DecodedChunk {
        payload: ChunkPayload::CreateTexture2d(CreateTexture2d { desc, initial_data }),
        resource_id,
        parent_id: 0,
        name: None,
    })
}

fn decode_create_swap_buffer(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let buffer = cur.read_u32_le()?;
    let resource_id = cur.read_u64_le()?;
    let desc = Texture2dDesc::decode(cur)?;
    Ok(DecodedChunk {
        payload: ChunkPayload::CreateSwapBuffer(CreateSwapBuffer { buffer, desc }),
        resource_id,
        parent_id: 0,
        name: Some("Serialised Swap Chain Buffer".to_owned()),
    })
}

fn decode_create_buffer(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let desc = BufferDesc::decode(cur)?;
    let mut initial_data = Vec::new();
    if cur.read_bool()? {
        let count = cur.read_u64_le()?;
        for _ in 0..count {
            let (offset, len) = read_bytes_locator(cur)?;
            let row_pitch = cur.read_u32_le()?;
            let slice_pitch = cur.read_u32_le()?;
            initial_data.push(SubresourceData {
                row_pitch,
                slice_pitch,
                offset,
                len,
            });
        }
    }
    let resource_id = cur.read_u64_le()?;
    Ok(DecodedChunk {
        payload: ChunkPayload::CreateBuffer(CreateBuffer { desc, initial_data }),
        resource_id,
        parent_id: 0,
        name: None,
    })
}

fn decode_resource_view(cur: &mut Cursor<&[u8]>, tag: ChunkTag) -> Result<DecodedChunk> {
    let parent_id = cur.read_u64_le()?;
    let desc = if cur.read_bool()? {
        Some(match tag {
            ChunkTag::CREATE_RENDER_TARGET_VIEW => {
                ResourceViewDesc::RenderTarget(RenderTargetViewDesc::decode(cur)?)
            }
            ChunkTag::CREATE_SHADER_RESOURCE_VIEW => {
                ResourceViewDesc::ShaderResource(ShaderResourceViewDesc::decode(cur)?)
            }
            _ => ResourceViewDesc::DepthStencil(DepthStencilViewDesc::decode(cur)?),
        })
    } else {
        None
    };
    let resource_id = cur.read_u64_le()?;
    Ok(DecodedChunk {
        payload: ChunkPayload::ResourceView(ResourceView { desc }),
        resource_id,
        parent_id,
        name: None,
    })
}

fn decode_initial_contents(cur: &mut Cursor<&[u8]>, mgr: &ChunkManager) -> Result<DecodedChunk> {
    let resource_type = ResourceType(cur.read_u32_le()?);
    let parent_id = cur.read_u64_le()?;

    let mut contents = InitialContents {
        resource_type,
        subresources: Vec::new(),
        omitted: false,
    };
    let partial = |contents| {
        Ok(DecodedChunk {
            payload: ChunkPayload::InitialContents(contents),
            resource_id: 0,
            parent_id,
            name: None,
        })
    };

    if resource_type != ResourceType::TEXTURE_2D {
        // Buffers, UAVs and 1D textures have their own layouts that this
        // tool has never needed to read.
        return partial(contents);
    }

    // The creator is guaranteed to precede this chunk in file order, but
    // some resource kinds are intentionally never decoded.
    let Some(creator) = mgr.resource_chunk(parent_id) else {
        warn!(resource = parent_id, "initial contents for an undecoded resource");
        return partial(contents);
    };
    let desc = match &creator.payload {
        ChunkPayload::CreateTexture2d(tex) => tex.desc,
        ChunkPayload::CreateSwapBuffer(swap) => swap.desc,
        _ => {
            return Err(RdcError::Corrupt(
                "texture initial contents target a non-texture resource",
            ))
        }
    };

    let expected = desc.subresource_count();
    let count = cur.read_u32_le()?;
    if count != expected {
        warn!(count, expected, "initial contents subresource count mismatch");
    }

    contents.omitted = cur.read_bool()?;
    if contents.omitted {
        return partial(contents);
    }

    // The per-subresource layout here differs from the creation-time one:
    // only the row pitch is stored, and the slice geometry is re-derived
    // from the target's descriptor.
    let mips = desc.mip_levels.max(1);
    contents.subresources.reserve_exact(count.min(1024) as usize);
    for i in 0..count {
        let row_pitch = cur.read_u32_le()?;
        let rows = desc.rows_for_mip(i % mips);
        let (offset, len) = read_bytes_locator(cur)?;
        contents.subresources.push(SubresourceData {
            row_pitch,
            slice_pitch: row_pitch.saturating_mul(rows),
            offset,
            len,
        });
    }

    partial(contents)
}

fn decode_update_subresource(cur: &mut Cursor<&[u8]>) -> Result<DecodedChunk> {
    let context_id = cur.read_u64_le()?;
    let parent_id = cur.read_u64_le()?;
    let dst_subresource = cur.read_u32_le()?;
    let box_present = cur.read_bool()?;
    let mut dst_box = [0u32; 6];
    for field in &mut dst_box {
        *field = cur.read_u32_le()?;
    }
    let row_pitch = cur.read_u32_le()?;
    let depth_pitch = cur.read_u32_le()?;
    let copy_flags = cur.read_u32_le()?;
    let is_update = cur.read_bool()?;
    let (offset, len) = read_bytes_locator(cur)?;

    // The capture stores the byte count again after the data.
    let check = cur.read_u64_le()?;
    if check != len {
        warn!(len, check, "update subresource trailing length mismatch");
    }

    Ok(DecodedChunk {
        payload: ChunkPayload::UpdateSubresource(UpdateSubresource {
            context_id,
            dst_subresource,
            box_present,
            dst_box,
            row_pitch,
            depth_pitch,
            copy_flags,
            is_update,
            offset,
            len,
        }),
        resource_id: 0,
        parent_id,
        name: None,
    })
}
