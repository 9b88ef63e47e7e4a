//! crates/protocol/src/codec.rs
//!
//! Little-endian channel primitives shared by every wire encoding in the
//! workspace. The 64-bit form is the legacy marker encoding: values that
//! fit in 31 bits travel as a plain int, anything wider as a `0xFFFFFFFF`
//! marker followed by the low and high 32-bit halves.

use std::io::{Read, Write};

use crate::error::ProtocolResult;

/// Reads one byte.
pub fn read_byte<R: Read + ?Sized>(r: &mut R) -> ProtocolResult<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a 16-bit little-endian integer.
pub fn read_shortint<R: Read + ?Sized>(r: &mut R) -> ProtocolResult<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads a 32-bit little-endian integer.
pub fn read_int<R: Read + ?Sized>(r: &mut R) -> ProtocolResult<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Reads a 64-bit integer in the marker encoding.
pub fn read_longint<R: Read + ?Sized>(r: &mut R) -> ProtocolResult<i64> {
    let tmp = read_int(r)?;
    if tmp != -1 {
        return Ok(i64::from(tmp));
    }
    let low = read_int(r)? as u32;
    let high = read_int(r)?;
    Ok((i64::from(high) << 32) | i64::from(low))
}

/// Reads exactly `buf.len()` bytes.
pub fn read_buf<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> ProtocolResult<()> {
    r.read_exact(buf)?;
    Ok(())
}

/// Writes one byte.
pub fn write_byte<W: Write + ?Sized>(w: &mut W, value: u8) -> ProtocolResult<()> {
    w.write_all(&[value])?;
    Ok(())
}

/// Writes a 16-bit little-endian integer.
pub fn write_shortint<W: Write + ?Sized>(w: &mut W, value: u16) -> ProtocolResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Writes a 32-bit little-endian integer.
pub fn write_int<W: Write + ?Sized>(w: &mut W, value: i32) -> ProtocolResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Writes a 64-bit integer in the marker encoding.
pub fn write_longint<W: Write + ?Sized>(w: &mut W, value: i64) -> ProtocolResult<()> {
    if (0..=0x7FFF_FFFF).contains(&value) {
        return write_int(w, value as i32);
    }
    write_int(w, -1)?;
    write_int(w, (value & 0xFFFF_FFFF) as i32)?;
    write_int(w, (value >> 32) as i32)?;
    Ok(())
}

/// Writes `buf` in full.
pub fn write_buf<W: Write + ?Sized>(w: &mut W, buf: &[u8]) -> ProtocolResult<()> {
    w.write_all(buf)?;
    Ok(())
}
