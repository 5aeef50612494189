//! On-disk structures of the container layer: file header, thumbnails,
//! capture metadata and section headers. Everything little-endian.

use std::io::{Read, Seek, Write};

use bitflags::bitflags;

use crate::error::{RdcError, Result};
use crate::io::{ReadLeExt, WriteLeExt};

/// First five bytes of every capture file; the remaining three are reserved.
pub const FILE_MAGIC: &[u8; 5] = b"RDOC\0";
pub const MAGIC_LENGTH: usize = 8;
pub const PRODUCER_VERSION_LENGTH: usize = 16;

/// Upper bound on the embedded JPEG thumbnail, straight from the format.
pub const MAX_THUMBNAIL_SIZE: u32 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionType(pub u32);

impl SectionType {
    pub const UNKNOWN: SectionType = SectionType(0);
    pub const FRAME_CAPTURE: SectionType = SectionType(1);
    pub const RESOLVE_DATABASE: SectionType = SectionType(2);
    pub const BOOKMARKS: SectionType = SectionType(3);
    pub const NOTES: SectionType = SectionType(4);
    pub const RESOURCE_RENAMES: SectionType = SectionType(5);
    pub const AMD_RGP_PROFILE: SectionType = SectionType(6);
    pub const EXTENDED_THUMBNAIL: SectionType = SectionType(7);

    pub fn name(self) -> Option<&'static str> {
        match self {
            SectionType::UNKNOWN => Some("UNKNOWN"),
            SectionType::FRAME_CAPTURE => Some("FRAME_CAPTURE"),
            SectionType::RESOLVE_DATABASE => Some("RESOLVE_DATABASE"),
            SectionType::BOOKMARKS => Some("BOOKMARKS"),
            SectionType::NOTES => Some("NOTES"),
            SectionType::RESOURCE_RENAMES => Some("RESOURCE_RENAMES"),
            SectionType::AMD_RGP_PROFILE => Some("AMD_RGP_PROFILE"),
            SectionType::EXTENDED_THUMBNAIL => Some("EXTENDED_THUMBNAIL"),
            _ => None,
        }
    }
}

impl core::fmt::Display for SectionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}({})", self.0)
        } else {
            write!(f, "SectionType({})", self.0)
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        const ASCII_STORED = 0x1;
        const LZ4_COMPRESSED = 0x2;
        const ZSTD_COMPRESSED = 0x4;
    }
}

/// Graphics API that produced the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(pub u32);

impl DriverId {
    pub const UNKNOWN: DriverId = DriverId(0);
    pub const D3D11: DriverId = DriverId(1);
    pub const OPENGL: DriverId = DriverId(2);
    pub const MANTLE: DriverId = DriverId(3);
    pub const D3D12: DriverId = DriverId(4);
    pub const D3D10: DriverId = DriverId(5);
    pub const D3D9: DriverId = DriverId(6);
    pub const IMAGE: DriverId = DriverId(7);
    pub const VULKAN: DriverId = DriverId(8);
    pub const OPENGL_ES: DriverId = DriverId(9);
    pub const D3D8: DriverId = DriverId(10);

    pub fn name(self) -> Option<&'static str> {
        match self {
            DriverId::UNKNOWN => Some("Unknown"),
            DriverId::D3D11 => Some("D3D11"),
            DriverId::OPENGL => Some("OpenGL"),
            DriverId::MANTLE => Some("Mantle"),
            DriverId::D3D12 => Some("D3D12"),
            DriverId::D3D10 => Some("D3D10"),
            DriverId::D3D9 => Some("D3D9"),
            DriverId::IMAGE => Some("Image"),
            DriverId::VULKAN => Some("Vulkan"),
            DriverId::OPENGL_ES => Some("OpenGLES"),
            DriverId::D3D8 => Some("D3D8"),
            _ => None,
        }
    }
}

/// Pixel file container formats used by thumbnail sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileType(pub u32);

impl FileType {
    pub const DDS: FileType = FileType(0);
    pub const PNG: FileType = FileType(1);
    pub const JPG: FileType = FileType(2);
    pub const BMP: FileType = FileType(3);
    pub const TGA: FileType = FileType(4);
    pub const HDR: FileType = FileType(5);
    pub const EXR: FileType = FileType(6);
    pub const RAW: FileType = FileType(7);
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub magic: [u8; MAGIC_LENGTH],
    pub version: u32,
    /// Total byte length of header + thumbnail + metadata, including the
    /// zero padding that follows them.
    pub header_length: u32,
    pub producer_version: [u8; PRODUCER_VERSION_LENGTH],
}

impl FileHeader {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; MAGIC_LENGTH];
        r.read_exact(&mut magic)?;
        if !magic.starts_with(FILE_MAGIC) {
            return Err(RdcError::InvalidMagic);
        }
        let version = r.read_u32_le()?;
        let header_length = r.read_u32_le()?;
        let mut producer_version = [0u8; PRODUCER_VERSION_LENGTH];
        r.read_exact(&mut producer_version)?;
        Ok(Self {
            magic,
            version,
            header_length,
            producer_version,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_bytes(&self.magic)?;
        w.write_u32_le(self.version)?;
        w.write_u32_le(self.header_length)?;
        w.write_bytes(&self.producer_version)
    }
}

/// The JPEG preview embedded right after the file header.
#[derive(Debug, Clone)]
pub struct BinaryThumbnail {
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

impl BinaryThumbnail {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let width = r.read_u16_le()?;
        let height = r.read_u16_le()?;
        let len = r.read_u32_le()?;
        if len > MAX_THUMBNAIL_SIZE {
            return Err(RdcError::Corrupt("thumbnail byte length out of range"));
        }
        let data = r.read_exact_vec(len as usize)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16_le(self.width)?;
        w.write_u16_le(self.height)?;
        let len: u32 = self
            .data
            .len()
            .try_into()
            .map_err(|_| RdcError::Corrupt("thumbnail too large"))?;
        w.write_u32_le(len)?;
        w.write_bytes(&self.data)
    }
}

#[derive(Debug, Clone)]
pub struct CaptureMetaData {
    pub machine_ident: u64,
    pub driver_id: DriverId,
    pub driver_name: String,
}

impl CaptureMetaData {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let machine_ident = r.read_u64_le()?;
        let driver_id = DriverId(r.read_u32_le()?);
        let driver_name = r.read_string_u8()?;
        Ok(Self {
            machine_ident,
            driver_id,
            driver_name,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64_le(self.machine_ident)?;
        w.write_u32_le(self.driver_id.0)?;
        w.write_string_u8(&self.driver_name)
    }
}

#[derive(Debug, Clone)]
pub struct SectionHeader {
    pub section_type: SectionType,
    pub compressed_length: u64,
    pub uncompressed_length: u64,
    pub version: u64,
    pub flags: SectionFlags,
    pub name: String,
}

impl SectionHeader {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let is_ascii = r.read_u8()?;
        if is_ascii != 0 {
            return Err(RdcError::AsciiSection);
        }
        let mut reserved = [0u8; 3];
        r.read_exact(&mut reserved)?;
        let section_type = SectionType(r.read_u32_le()?);
        let compressed_length = r.read_u64_le()?;
        let uncompressed_length = r.read_u64_le()?;
        let version = r.read_u64_le()?;
        let flags = SectionFlags::from_bits_retain(r.read_u32_le()?);
        let name = r.read_string_u32()?;
        Ok(Self {
            section_type,
            compressed_length,
            uncompressed_length,
            version,
            flags,
            name,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u8(0)?; // isASCII
        w.write_bytes(&[0u8; 3])?;
        w.write_u32_le(self.section_type.0)?;
        w.write_u64_le(self.compressed_length)?;
        w.write_u64_le(self.uncompressed_length)?;
        w.write_u64_le(self.version)?;
        w.write_u32_le(self.flags.bits())?;
        w.write_string_u32(&self.name)
    }

    /// Re-encoded sections are always stored raw.
    pub fn set_uncompressed(&mut self, len: u64) {
        self.flags
            .remove(SectionFlags::LZ4_COMPRESSED | SectionFlags::ZSTD_COMPRESSED);
        self.compressed_length = len;
        self.uncompressed_length = len;
    }
}

/// Sub-header of an extended-thumbnail section's decompressed payload.
#[derive(Debug, Clone, Copy)]
pub struct ExtThumbnailHeader {
    pub width: u16,
    pub height: u16,
    pub len: u32,
    pub format: FileType,
}

impl ExtThumbnailHeader {
    pub const SIZE: usize = 2 + 2 + 4 + 4;

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let width = r.read_u16_le()?;
        let height = r.read_u16_le()?;
        let len = r.read_u32_le()?;
        let format = FileType(r.read_u32_le()?);
        Ok(Self {
            width,
            height,
            len,
            format,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16_le(self.width)?;
        w.write_u16_le(self.height)?;
        w.write_u32_le(self.len)?;
        w.write_u32_le(self.format.0)
    }
}

/// Skip the zero padding between the metadata block and the first section.
pub(crate) fn skip_header_padding<R: Read + Seek>(r: &mut R, header_length: u32) -> Result<()> {
    let pos = r.stream_position()?;
    if pos > u64::from(header_length) {
        return Err(RdcError::Corrupt("file header overruns its declared length"));
    }
    r.seek(std::io::SeekFrom::Start(u64::from(header_length)))?;
    Ok(())
}
