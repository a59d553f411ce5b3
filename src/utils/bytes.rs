//! Byte-slice utilities for bounds-oriented parsing.
//!
//! Every helper reads a **big-endian** primitive out of `&[u8]` at a fixed offset and returns
//! `None` when the read would run past the end of the slice. Callers map `None` into their own
//! error type, attaching what was being read.
//!
//! ```ignore
//! use crate::utils::bytes;
//!
//! let version = bytes::read_u32_be(buf, 4).ok_or(...)?;
//! let name = bytes::read_array::<32>(buf, entry_offset).ok_or(...)?;
//! ```

use byteorder::{BigEndian, ByteOrder};

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a `u32` (big-endian) at `offset`.
pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> Option<u32> {
    Some(BigEndian::read_u32(&read_array::<4>(buf, offset)?))
}

/// Read a `u64` (big-endian) at `offset`.
pub(crate) fn read_u64_be(buf: &[u8], offset: usize) -> Option<u64> {
    Some(BigEndian::read_u64(&read_array::<8>(buf, offset)?))
}

/// Borrow `len` bytes at `offset`, or `None` when `offset + len` overflows or exceeds the slice.
pub(crate) fn slice(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    buf.get(offset..end)
}
