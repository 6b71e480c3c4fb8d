//! Size-framed records.
//!
//! Every record on disk (LE):
//!   size[4]    = payload length n
//!   payload[n]
//!   size[4]    = n again
//!
//! Type-2 files put a name wrapper in front of each record, itself a record
//! with an 8-byte payload:
//!   [8][name[4] next[4]][8]
//! where `next` is the full size of the following record (n + 8).

use crate::consts::{MARKER_BYTES, NAME_LEN, WRAPPER_BYTES};
use crate::errors::{Result, SnapError, Stage};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> { w.write_u32::<LE>(v) }
pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> { r.read_u32::<LE>() }

/// Size marker for a payload, or `TooLarge` if it cannot be represented.
pub fn size_marker(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SnapError::TooLarge(len))
}

/// Read one framed record. Returns the declared size and the payload.
pub fn read_record<R: Read>(r: &mut R, stage: Stage) -> Result<(u32, Vec<u8>)> {
    let leading = read_u32(r)?;
    // grow with the data instead of trusting `leading` for the allocation
    let mut payload = Vec::new();
    r.by_ref().take(u64::from(leading)).read_to_end(&mut payload)?;
    if payload.len() != leading as usize {
        return Err(SnapError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{stage}: record declares {leading} bytes, only {} present", payload.len()),
        )));
    }
    let trailing = read_u32(r)?;
    if trailing != leading {
        return Err(SnapError::SizeMismatch { stage, leading, trailing });
    }
    tracing::debug!(%stage, size = leading, "record read");
    Ok((leading, payload))
}

/// Write `payload` framed by its length on both sides.
pub fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> Result<()> {
    let size = size_marker(payload.len())?;
    write_u32(w, size)?;
    w.write_all(payload)?;
    write_u32(w, size)?;
    Ok(())
}

/// Read a type-2 name wrapper. Returns the name and the declared size of
/// the record that follows (including its two markers).
pub fn read_wrapper<R: Read>(r: &mut R, stage: Stage) -> Result<([u8; NAME_LEN], u32)> {
    let leading = read_u32(r)?;
    if leading != WRAPPER_BYTES {
        return Err(SnapError::BadWrapper { stage, found: leading });
    }
    let mut name = [0u8; NAME_LEN];
    r.read_exact(&mut name)?;
    let next = read_u32(r)?;
    let trailing = read_u32(r)?;
    if trailing != WRAPPER_BYTES {
        return Err(SnapError::SizeMismatch { stage, leading, trailing });
    }
    Ok((name, next))
}

/// Write a type-2 name wrapper announcing a record with `payload_len` bytes.
pub fn write_wrapper<W: Write>(w: &mut W, name: &[u8; NAME_LEN], payload_len: usize) -> Result<()> {
    let next = size_marker(payload_len)?
        .checked_add(2 * MARKER_BYTES)
        .ok_or(SnapError::TooLarge(payload_len))?;
    write_u32(w, WRAPPER_BYTES)?;
    w.write_all(name)?;
    write_u32(w, next)?;
    write_u32(w, WRAPPER_BYTES)?;
    Ok(())
}

/// Log when a wrapper's next-record size disagrees with the record read.
pub(crate) fn check_announced(stage: Stage, name: &[u8; NAME_LEN], announced: u32, payload_len: u32) {
    let expected = u64::from(payload_len) + u64::from(2 * MARKER_BYTES);
    if u64::from(announced) != expected {
        tracing::warn!(
            %stage,
            name = %String::from_utf8_lossy(name),
            announced,
            expected,
            "name wrapper announces a different record size"
        );
    }
}
