//! Low-level read primitives shared by all parsers.
//!
//! Each function reads exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity. Header windows are decoded through a
//! [`std::io::Cursor`] over a byte slice, so a short window surfaces as
//! [`Error::Truncated`] instead of an out-of-bounds index.

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::{Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(bytesa(r)?))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(bytesa(r)?))
}

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(bytesa(r)?))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(bytesa(r)?))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::BadMagic`] on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(r: &mut R, expected: &[u8; N]) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::BadMagic);
    }
    Ok(())
}

/// Cursor over `buf` positioned at `offset`.
#[inline]
pub(crate) fn cursor_at(buf: &[u8], offset: u64) -> Cursor<&[u8]> {
    let mut c = Cursor::new(buf);
    c.set_position(offset);
    c
}

/// Skip `n` bytes forward.
#[inline]
pub(crate) fn skip<R: Seek>(r: &mut R, n: i64) -> Result<()> {
    r.seek(SeekFrom::Current(n))?;
    Ok(())
}

/// Borrow `len` bytes at `offset`, or [`Error::Truncated`].
#[inline]
pub(crate) fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(Error::Truncated)
}

/// Big-endian `u32` at `offset` in `buf`, if in bounds.
#[inline]
pub(crate) fn be_u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    let b = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Cut a fixed-width field at its first NUL byte.
#[inline]
pub(crate) fn until_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endian_reads() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let mut c = Cursor::new(&data[..]);
        assert_eq!(be_u16(&mut c).unwrap(), 0x1234);
        assert_eq!(le_u16(&mut c).unwrap(), 0x7856);
        assert_eq!(be_u32(&mut Cursor::new(&data[4..])).unwrap(), 0x9ABCDEF0);
        c.set_position(4);
        assert_eq!(le_u32(&mut c).unwrap(), 0xF0DEBC9A);
    }

    #[test]
    fn test_short_read_is_truncated() {
        let mut c = Cursor::new(&[1u8, 2, 3][..]);
        assert!(matches!(be_u32(&mut c), Err(Error::Truncated)));
    }

    #[test]
    fn test_magic() {
        let mut c = Cursor::new(&b"XDBF"[..]);
        assert!(magic(&mut c, b"XDBF").is_ok());
        let mut c = Cursor::new(&b"XDBX"[..]);
        assert!(matches!(magic(&mut c, b"XDBF"), Err(Error::BadMagic)));
    }

    #[test]
    fn test_slice_bounds() {
        let buf = [0u8; 8];
        assert_eq!(slice(&buf, 4, 4).unwrap().len(), 4);
        assert!(slice(&buf, 5, 4).is_err());
        assert!(slice(&buf, usize::MAX, 2).is_err());
        assert_eq!(be_u32_at(&buf, 4), Some(0));
        assert_eq!(be_u32_at(&buf, 5), None);
    }

    #[test]
    fn test_until_nul() {
        assert_eq!(until_nul(b"ABC\0DEF"), b"ABC");
        assert_eq!(until_nul(b"ABCD"), b"ABCD");
    }
}
