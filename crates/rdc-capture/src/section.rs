//! A named, typed, independently compressed region of the capture file.
//!
//! Frame-capture sections get the full chunk treatment; extended-thumbnail
//! sections expose their small sub-header and pixel bytes; every other
//! section type is an opaque blob that survives re-save untouched.

use std::io::{Cursor, Read, Seek, Write};

use tracing::{debug, warn};

use crate::chunk::scan_chunks;
use crate::compress;
use crate::error::{RdcError, Result};
use crate::format::{ExtThumbnailHeader, SectionHeader, SectionType};
use crate::io::ReadLeExt;
use crate::manager::ChunkManager;

/// Decoded payload of an extended-thumbnail section.
#[derive(Debug, Clone)]
pub struct ExtendedThumbnail {
    pub header: ExtThumbnailHeader,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub struct Section {
    pub header: SectionHeader,
    /// Raw bytes as stored on disk (possibly compressed).
    disk_data: Vec<u8>,
    /// Decompressed bytes; the buffer every chunk offset points into.
    data: Vec<u8>,
    thumbnail: Option<ExtendedThumbnail>,
    manager: Option<ChunkManager>,
    /// Set when the frame-capture stream failed to decode; the section's
    /// bytes are still held so the rest of the capture stays usable.
    chunk_error: Option<RdcError>,
}

impl Section {
    pub(crate) fn decode<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let header = SectionHeader::decode(r)?;
        let len = usize::try_from(header.compressed_length)
            .map_err(|_| RdcError::Corrupt("section compressed length overflow"))?;
        let disk_data = r.read_exact_vec(len)?;
        let data = compress::decompress_section(&header, &disk_data)?;

        let mut section = Section {
            header,
            disk_data,
            data,
            thumbnail: None,
            manager: None,
            chunk_error: None,
        };

        match section.header.section_type {
            SectionType::FRAME_CAPTURE => match section.process_chunks() {
                Ok(manager) => section.manager = Some(manager),
                Err(err) => {
                    warn!(%err, "frame capture stream failed to decode");
                    section.chunk_error = Some(err);
                }
            },
            SectionType::EXTENDED_THUMBNAIL => {
                section.thumbnail = Some(section.parse_thumbnail()?);
            }
            other => debug!(section = %other, "keeping section as an opaque blob"),
        }

        Ok(section)
    }

    fn process_chunks(&self) -> Result<ChunkManager> {
        let (metas, capture_begin) = scan_chunks(&self.data)?;
        ChunkManager::load(&self.data, metas, capture_begin)
    }

    fn parse_thumbnail(&self) -> Result<ExtendedThumbnail> {
        let mut cur = Cursor::new(self.data.as_slice());
        let header = ExtThumbnailHeader::decode(&mut cur)?;
        let pixels = cur.read_exact_vec(header.len as usize)?;
        Ok(ExtendedThumbnail { header, pixels })
    }

    /// Re-emit the section with its current (decompressed) payload; the
    /// written header always describes a raw section.
    pub(crate) fn encode<W: Write>(&mut self, w: &mut W) -> Result<()> {
        self.header.set_uncompressed(self.data.len() as u64);
        self.header.encode(w)?;
        w.write_all(&self.data)?;
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the decompressed buffer for in-place patching.
    /// Patches cannot change the buffer length, so recorded chunk offsets
    /// stay valid.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// On-disk bytes as originally read, before decompression.
    pub fn disk_data(&self) -> &[u8] {
        &self.disk_data
    }

    pub fn manager(&self) -> Option<&ChunkManager> {
        self.manager.as_ref()
    }

    pub fn chunk_error(&self) -> Option<&RdcError> {
        self.chunk_error.as_ref()
    }

    pub fn thumbnail(&self) -> Option<&ExtendedThumbnail> {
        self.thumbnail.as_ref()
    }

    /// Replace an extended thumbnail's pixel bytes, rebuilding the section
    /// buffer from the sub-header and the new payload. The pixel file must
    /// keep the recorded dimensions.
    pub fn set_thumbnail_pixels(&mut self, width: u16, height: u16, pixels: Vec<u8>) -> Result<()> {
        let thumb = self
            .thumbnail
            .as_mut()
            .ok_or(RdcError::Corrupt("section has no thumbnail payload"))?;
        if width != thumb.header.width || height != thumb.header.height {
            return Err(RdcError::DimensionMismatch {
                width: u32::from(thumb.header.width),
                height: u32::from(thumb.header.height),
                found_width: u32::from(width),
                found_height: u32::from(height),
            });
        }

        thumb.header.len = pixels
            .len()
            .try_into()
            .map_err(|_| RdcError::Corrupt("thumbnail payload too large"))?;
        thumb.pixels = pixels;

        let mut data = Vec::with_capacity(ExtThumbnailHeader::SIZE + thumb.pixels.len());
        thumb.header.encode(&mut data)?;
        data.extend_from_slice(&thumb.pixels);
        self.data = data;
        self.header.set_uncompressed(self.data.len() as u64);
        Ok(())
    }

    /// Patch the device name stored in the driver-init chunk (the graph
    /// keeps the recorded byte span; the write lands in this section's
    /// buffer).
    pub fn set_device_name(&mut self, name: &str) -> Result<()> {
        let manager = self
            .manager
            .as_mut()
            .ok_or(RdcError::MissingFrameCapture)?;
        manager.set_device_name(&mut self.data, name)
    }

    /// Soft-delete every chunk in the inclusive event-id range.
    pub fn remove_event_range(&mut self, from_event: u32, to_event: u32) -> Result<()> {
        let manager = self
            .manager
            .as_mut()
            .ok_or(RdcError::MissingFrameCapture)?;
        manager.mark_removed(from_event, to_event)
    }

    /// Drop removed chunks from the buffer, realigning the survivors.
    pub(crate) fn materialize_removals(&mut self) {
        if let Some(manager) = self.manager.as_mut() {
            self.data = manager.materialize(&self.data);
            self.header.set_uncompressed(self.data.len() as u64);
        }
    }
}
