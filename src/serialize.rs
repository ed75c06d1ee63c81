//! Deterministic, endian-stable wire encoding shared by every page family.
//!
//! Every `write_*` returns the number of bytes written; every `read_*`
//! consumes exactly that many bytes or fails. All multi-byte integers are
//! big-endian. Floats are the reinterpreted bits of their IEEE-754
//! representation, width-identical to `u32`.

use crate::error::{Result, StorageError};
use std::io::{Read, Write};

pub fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16(r: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_i32(r: &mut impl Read) -> Result<i32> {
    Ok(read_u32(r)? as i32)
}

pub fn read_f32(r: &mut impl Read) -> Result<f32> {
    Ok(f32::from_bits(read_u32(r)?))
}

pub fn read_bool(r: &mut impl Read) -> Result<bool> {
    Ok(read_u8(r)? != 0)
}

pub fn write_u8(w: &mut impl Write, v: u8) -> Result<usize> {
    w.write_all(&[v])?;
    Ok(1)
}

pub fn write_u16(w: &mut impl Write, v: u16) -> Result<usize> {
    w.write_all(&v.to_be_bytes())?;
    Ok(2)
}

pub fn write_u32(w: &mut impl Write, v: u32) -> Result<usize> {
    w.write_all(&v.to_be_bytes())?;
    Ok(4)
}

pub fn write_i32(w: &mut impl Write, v: i32) -> Result<usize> {
    write_u32(w, v as u32)
}

pub fn write_f32(w: &mut impl Write, v: f32) -> Result<usize> {
    write_u32(w, v.to_bits())
}

pub fn write_bool(w: &mut impl Write, v: bool) -> Result<usize> {
    write_u8(w, v as u8)
}

/// Reads until the stream is exhausted, returning `Ok(None)` exactly once EOF
/// is hit on a clean record boundary. A short read partway through a record
/// is corruption, not EOF, and is surfaced to the caller as an I/O error.
pub fn is_eof(r: &mut impl Read) -> Result<bool> {
    let mut probe = [0u8; 1];
    match r.read(&mut probe) {
        Ok(0) => Ok(true),
        Ok(_) => Err(StorageError::corruption(
            "stream",
            "unexpected trailing bytes after a supposedly exhausted block",
        )),
        Err(e) => Err(e.into()),
    }
}
