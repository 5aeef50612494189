//! The loaded capture file: header, thumbnails, metadata and sections.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{RdcError, Result};
use crate::format::{
    skip_header_padding, BinaryThumbnail, CaptureMetaData, FileHeader, SectionType,
};
use crate::io::WriteLeExt;
use crate::manager::ChunkManager;
use crate::section::Section;

#[derive(Debug)]
pub struct CaptureFile {
    pub header: FileHeader,
    pub thumbnail: BinaryThumbnail,
    pub meta: CaptureMetaData,
    sections: Vec<Section>,
}

impl CaptureFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening capture");
        let file = File::open(path)?;
        let capture = Self::load(BufReader::new(file))?;
        info!(
            path = %path.display(),
            sections = capture.sections.len(),
            "capture loaded"
        );
        Ok(capture)
    }

    /// Load a capture from any seekable byte source. A capture without a
    /// frame-capture section is rejected outright.
    pub fn load<R: Read + Seek>(mut r: R) -> Result<Self> {
        let file_len = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(0))?;

        let header = FileHeader::decode(&mut r)?;
        let thumbnail = BinaryThumbnail::decode(&mut r)?;
        let meta = CaptureMetaData::decode(&mut r)?;
        skip_header_padding(&mut r, header.header_length)?;

        let mut sections = Vec::new();
        while r.stream_position()? < file_len {
            sections.push(Section::decode(&mut r)?);
        }

        let capture = Self {
            header,
            thumbnail,
            meta,
            sections,
        };
        if capture.section(SectionType::FRAME_CAPTURE).is_none() {
            return Err(RdcError::MissingFrameCapture);
        }
        Ok(capture)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.header.section_type == section_type)
    }

    pub fn section_mut(&mut self, section_type: SectionType) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.header.section_type == section_type)
    }

    pub fn frame_capture(&self) -> &Section {
        self.section(SectionType::FRAME_CAPTURE)
            .expect("validated at load time")
    }

    pub fn frame_capture_mut(&mut self) -> &mut Section {
        self.section_mut(SectionType::FRAME_CAPTURE)
            .expect("validated at load time")
    }

    pub fn thumbnail_section(&self) -> Option<&Section> {
        self.section(SectionType::EXTENDED_THUMBNAIL)
    }

    pub fn thumbnail_section_mut(&mut self) -> Option<&mut Section> {
        self.section_mut(SectionType::EXTENDED_THUMBNAIL)
    }

    /// The frame-capture section's chunk graph; `None` when its stream
    /// failed to decode (see [`Section::chunk_error`]).
    pub fn chunk_manager(&self) -> Option<&ChunkManager> {
        self.frame_capture().manager()
    }

    /// Overwrite the adapter description recorded by the driver-init chunk.
    pub fn set_device_name(&mut self, name: &str) -> Result<()> {
        self.frame_capture_mut().set_device_name(name)
    }

    /// Soft-delete every chunk in the inclusive event-id range; the bytes
    /// disappear at the next save.
    pub fn remove_event_range(&mut self, from_event: u32, to_event: u32) -> Result<()> {
        self.frame_capture_mut()
            .remove_event_range(from_event, to_event)
    }

    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        info!(path = %path.as_ref().display(), "capture saved");
        Ok(())
    }

    /// Re-emit the capture: header, thumbnail, metadata, header padding,
    /// then every section uncompressed. Pending removals are materialised
    /// first.
    pub fn write_to<W: Write + Seek>(&mut self, w: &mut W) -> Result<()> {
        self.frame_capture_mut().materialize_removals();

        self.header.encode(w)?;
        self.thumbnail.encode(w)?;
        self.meta.encode(w)?;

        let pos = w.stream_position()?;
        let header_length = u64::from(self.header.header_length);
        if pos > header_length {
            return Err(RdcError::Corrupt("metadata overruns the declared header length"));
        }
        for _ in pos..header_length {
            w.write_u8(0)?;
        }

        for section in &mut self.sections {
            section.encode(w)?;
        }
        Ok(())
    }
}
