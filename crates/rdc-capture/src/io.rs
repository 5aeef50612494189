//! Little-endian wire primitives shared by every layer of the container.
//!
//! The format stores three different string encodings: NUL-terminated with a
//! `u8` length prefix (driver name), NUL-terminated with a `u32` length
//! prefix (section names), and bare `u32`-prefixed without a terminator
//! (strings inside chunk payloads). All length prefixes of the terminated
//! forms count the terminator.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{RdcError, Result};

/// Chunk records and their bulk payloads start and end on this boundary.
pub const STREAM_ALIGNMENT: u64 = 64;

pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

pub trait ReadLeExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i64_le(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Single-byte boolean as serialised by the capture layer.
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| RdcError::OutOfMemory { len })?;
        buf.resize(len, 0);
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// NUL-terminated string with a `u8` length prefix counting the NUL.
    fn read_string_u8(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_terminated_string(len)
    }

    /// NUL-terminated string with a `u32` length prefix counting the NUL.
    fn read_string_u32(&mut self) -> Result<String> {
        let len = self.read_u32_le()? as usize;
        self.read_terminated_string(len)
    }

    fn read_terminated_string(&mut self, len: usize) -> Result<String> {
        if len == 0 {
            return Err(RdcError::Corrupt(
                "string length must be at least 1 to hold the terminator",
            ));
        }
        let mut bytes = self.read_exact_vec(len)?;
        bytes.truncate(len - 1);
        Ok(String::from_utf8(bytes)?)
    }

    /// Bare `u32`-prefixed string without a terminator, as stored inside
    /// chunk payloads.
    fn read_inline_string(&mut self) -> Result<String> {
        let len = self.read_u32_le()? as usize;
        let bytes = self.read_exact_vec(len)?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl<T: Read + ?Sized> ReadLeExt for T {}

pub trait WriteLeExt: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_u16_le(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u32_le(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u64_le(&mut self, v: u64) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }

    /// NUL-terminated string with a `u8` length prefix counting the NUL.
    fn write_string_u8(&mut self, s: &str) -> Result<()> {
        let len = s.len() + 1;
        let len: u8 = len
            .try_into()
            .map_err(|_| RdcError::Corrupt("string does not fit a u8 length prefix"))?;
        self.write_u8(len)?;
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }

    /// NUL-terminated string with a `u32` length prefix counting the NUL.
    fn write_string_u32(&mut self, s: &str) -> Result<()> {
        let len: u32 = (s.len() + 1)
            .try_into()
            .map_err(|_| RdcError::Corrupt("string does not fit a u32 length prefix"))?;
        self.write_u32_le(len)?;
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }
}

impl<T: Write + ?Sized> WriteLeExt for T {}

pub trait SeekExt: Seek {
    /// Advance to the next multiple of `align`, returning the new position.
    fn align_up_to(&mut self, align: u64) -> Result<u64> {
        let pos = self.stream_position()?;
        let aligned = align_up(pos, align);
        if aligned != pos {
            self.seek(SeekFrom::Start(aligned))?;
        }
        Ok(aligned)
    }

    fn skip_bytes(&mut self, len: u64) -> Result<u64> {
        let pos = self.seek(SeekFrom::Current(
            i64::try_from(len).map_err(|_| RdcError::Corrupt("skip length overflow"))?,
        ))?;
        Ok(pos)
    }
}

impl<T: Seek + ?Sized> SeekExt for T {}
