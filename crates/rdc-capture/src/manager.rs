//! The chunk graph of a frame-capture section.
//!
//! Chunks live in an arena ordered by file position; parent/child links and
//! the resource maps store arena indices, never references, so the graph
//! has no ownership cycles. Construction is a single forward pass (creators
//! precede consumers in the byte stream) followed by one post-load pass for
//! resolution that needs the complete neighbourhood.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::trace;

use crate::chunk::{ChunkMeta, ChunkTag};
use crate::chunks::{decode_chunk, ChunkPayload, SubresourceData};
use crate::d3d11::Texture2dDesc;
use crate::error::{RdcError, Result};
use crate::io::{align_up, STREAM_ALIGNMENT};
use crate::patch;

/// One decoded chunk: framing metadata, identity, graph links and the typed
/// payload.
#[derive(Debug)]
pub struct Chunk {
    pub meta: ChunkMeta,
    /// Non-zero when this chunk creates a resource.
    pub resource_id: u64,
    /// Non-zero when this chunk references another resource.
    pub parent_id: u64,
    /// Display name, usually assigned by a later SetResourceName chunk.
    pub name: Option<String>,
    /// Arena index of the resolved parent; never guaranteed.
    pub parent: Option<usize>,
    /// Arena indices of the chunks that resolved this one as their parent.
    pub children: Vec<usize>,
    pub payload: ChunkPayload,
}

impl Chunk {
    pub fn index(&self) -> u32 {
        self.meta.index
    }

    pub fn event_id(&self) -> u32 {
        self.meta.event_id
    }

    pub fn tag(&self) -> ChunkTag {
        self.meta.tag
    }

    pub fn is_removed(&self) -> bool {
        self.meta.removed
    }
}

#[derive(Debug, Default)]
pub struct ChunkManager {
    chunks: Vec<Chunk>,
    resources: HashMap<u64, usize>,
    initial_contents: HashMap<u64, usize>,
    driver_init: Option<usize>,
    capture_begin: Option<u32>,
}

impl ChunkManager {
    /// Decode every record's payload against the section buffer and link
    /// the graph.
    pub(crate) fn load(
        data: &[u8],
        metas: Vec<ChunkMeta>,
        capture_begin: Option<u32>,
    ) -> Result<Self> {
        let mut mgr = ChunkManager {
            chunks: Vec::with_capacity(metas.len()),
            capture_begin,
            ..ChunkManager::default()
        };

        for meta in metas {
            let decoded = decode_chunk(&meta, data, &mgr)?;
            mgr.add(Chunk {
                meta,
                resource_id: decoded.resource_id,
                parent_id: decoded.parent_id,
                name: decoded.name,
                parent: None,
                children: Vec::new(),
                payload: decoded.payload,
            })?;
        }

        mgr.post_load()?;
        Ok(mgr)
    }

    /// Register one chunk. Resource creators go into the id map (an id
    /// collision is corruption); consumers resolve their parent against the
    /// map as populated so far. A failed lookup is expected for resource
    /// kinds this tool never decodes and leaves the link unset.
    fn add(&mut self, mut chunk: Chunk) -> Result<()> {
        let idx = self.chunks.len();

        if chunk.resource_id != 0 {
            if self.resources.insert(chunk.resource_id, idx).is_some() {
                return Err(RdcError::DuplicateResourceId(chunk.resource_id));
            }
        }

        if chunk.parent_id != 0 {
            if let Some(&parent) = self.resources.get(&chunk.parent_id) {
                chunk.parent = Some(parent);
                self.chunks[parent].children.push(idx);
            } else {
                trace!(
                    index = chunk.meta.index,
                    parent = chunk.parent_id,
                    "parent resource not decoded, leaving link unresolved"
                );
            }
        }

        if matches!(chunk.payload, ChunkPayload::DriverInit(_)) {
            self.driver_init = Some(idx);
        }

        self.chunks.push(chunk);
        Ok(())
    }

    /// Second pass over the complete arena, in file order.
    fn post_load(&mut self) -> Result<()> {
        for idx in 0..self.chunks.len() {
            match &self.chunks[idx].payload {
                ChunkPayload::SetResourceName { name } => {
                    // Some resource kinds (shaders, state objects) are never
                    // decoded, so the name simply has nowhere to land.
                    let name = name.clone();
                    match self.chunks[idx].parent {
                        Some(parent) => self.chunks[parent].name = Some(name),
                        None => trace!(name = %name, "resource name without a resolved target"),
                    }
                }
                ChunkPayload::InitialContents(_) => {
                    if self.chunks[idx].parent.is_some() {
                        let id = self.chunks[idx].parent_id;
                        if self.initial_contents.insert(id, idx).is_some() {
                            return Err(RdcError::DuplicateInitialContents(id));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Count of chunks that will survive rematerialisation.
    pub fn live_len(&self) -> usize {
        self.chunks.iter().filter(|c| !c.meta.removed).count()
    }

    /// 1-based index of the CaptureBegin chunk, the event id anchor.
    pub fn capture_begin_index(&self) -> Option<u32> {
        self.capture_begin
    }

    pub fn resource_chunk(&self, resource_id: u64) -> Option<&Chunk> {
        self.resources.get(&resource_id).map(|&idx| &self.chunks[idx])
    }

    pub fn initial_contents_chunk(&self, resource_id: u64) -> Option<&Chunk> {
        self.initial_contents
            .get(&resource_id)
            .map(|&idx| &self.chunks[idx])
    }

    pub fn driver_init_chunk(&self) -> Option<&Chunk> {
        self.driver_init.map(|idx| &self.chunks[idx])
    }

    /// Resolve a texture resource to its descriptor and subresource data,
    /// preferring creation-time data and falling back to the resource's
    /// InitialContents chunk.
    pub fn texture_subresources(
        &self,
        resource_id: u64,
    ) -> Option<(&Texture2dDesc, &[SubresourceData])> {
        let chunk = self.resource_chunk(resource_id)?;
        let desc = match &chunk.payload {
            ChunkPayload::CreateTexture2d(tex) => {
                if !tex.initial_data.is_empty() {
                    return Some((&tex.desc, &tex.initial_data));
                }
                &tex.desc
            }
            ChunkPayload::CreateSwapBuffer(swap) => &swap.desc,
            _ => return None,
        };
        match &self.initial_contents_chunk(resource_id)?.payload {
            ChunkPayload::InitialContents(ic) if !ic.subresources.is_empty() => {
                Some((desc, &ic.subresources))
            }
            _ => None,
        }
    }

    /// Patch the adapter description inside the driver-init chunk.
    pub(crate) fn set_device_name(&mut self, data: &mut [u8], name: &str) -> Result<()> {
        let idx = self
            .driver_init
            .ok_or(RdcError::Corrupt("capture has no driver init chunk"))?;
        let ChunkPayload::DriverInit(params) = &mut self.chunks[idx].payload else {
            unreachable!("driver_init indexes a DriverInit chunk");
        };
        patch::overwrite_string(data, params.adapter_desc.description_slot, name)?;
        params.adapter_desc.description = name.to_owned();
        Ok(())
    }

    /// Translate an inclusive event-id range to chunk indices and flip
    /// their removed flags. Rejected ranges leave every flag untouched.
    pub(crate) fn mark_removed(&mut self, from_event: u32, to_event: u32) -> Result<()> {
        let begin = self.capture_begin.ok_or(RdcError::InvalidEventRange {
            from: from_event,
            to: to_event,
        })?;

        let invalid = RdcError::InvalidEventRange {
            from: from_event,
            to: to_event,
        };
        if from_event > to_event {
            return Err(invalid);
        }
        let from_index = begin + from_event;
        let to_index = begin + to_event;
        if to_index as usize > self.chunks.len() {
            return Err(invalid);
        }

        for chunk in &mut self.chunks[from_index as usize - 1..to_index as usize] {
            chunk.meta.removed = true;
        }
        Ok(())
    }

    /// Rebuild an aligned, gap-free buffer with every removed record
    /// dropped, and rebase the surviving records' recorded offsets onto it.
    /// Indices, event ids and encoded resource references are left exactly
    /// as they were.
    pub(crate) fn materialize(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());

        for chunk in &mut self.chunks {
            if chunk.meta.removed {
                continue;
            }

            out.resize(align_up(out.len() as u64, STREAM_ALIGNMENT) as usize, 0);
            let new_offset = out.len() as u64;

            let start = chunk.meta.offset as usize;
            let end = start + chunk.meta.full_length() as usize;
            out.extend_from_slice(&data[start..end]);
            out.resize(align_up(out.len() as u64, STREAM_ALIGNMENT) as usize, 0);

            let delta = new_offset as i64 - chunk.meta.offset as i64;
            if delta != 0 {
                chunk.meta.offset = new_offset;
                chunk.payload.shift_offsets(delta);
            }
        }

        out
    }

    /// Human-readable chunk listing, one line per record.
    pub fn dump_chunk_infos(&self) -> String {
        let mut s = String::new();
        for chunk in &self.chunks {
            let _ = write!(
                s,
                "{:<4} {:<28} eid:{:<5} offset:{:<10} len:{:<8}",
                chunk.meta.index,
                chunk.meta.tag.to_string(),
                chunk.meta.event_id,
                chunk.meta.offset,
                chunk.meta.full_length(),
            );
            if chunk.meta.removed {
                s.push_str(" removed");
            }
            if let Some(name) = &chunk.name {
                let _ = write!(s, " {name}");
            }
            s.push('\n');
        }
        s
    }
}
