//! Wire bytes back to typed values.
//!
//! These read response payloads produced by the server. Every read is
//! bounds-checked; a payload shorter than its type byte promises yields
//! [`ProtoError::Truncated`].

use crate::buffer::{ByteBuffer, Primitive};
use crate::error::{ProtoError, Result};
use crate::ser::BIG_ARRAY_ATTRIBUTE;
use crate::types::{Type, WireType, ERROR_TYPE};

fn truncated(needed: usize, buf: &ByteBuffer) -> ProtoError {
    ProtoError::Truncated {
        needed,
        available: buf.len(),
    }
}

/// Type byte of the value held in `buf`.
pub fn peek_type(buf: &ByteBuffer) -> Result<i8> {
    buf.get::<i8>(0).ok_or_else(|| truncated(1, buf))
}

/// Fail with [`ProtoError::Remote`] if `buf` holds a server error object.
pub fn check_error(buf: &ByteBuffer) -> Result<()> {
    if buf.get::<i8>(0) != Some(ERROR_TYPE) {
        return Ok(());
    }
    let message = read_cstr(buf, 1)?;
    Err(ProtoError::Remote(message))
}

fn read_cstr(buf: &ByteBuffer, offset: usize) -> Result<String> {
    let tail = buf.as_slice().get(offset..).unwrap_or_default();
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| truncated(buf.len() + 1, buf))?;
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

fn expect_type(buf: &ByteBuffer, expected: i8) -> Result<()> {
    check_error(buf)?;
    let found = peek_type(buf)?;
    if found != expected {
        return Err(ProtoError::UnexpectedType { expected, found });
    }
    Ok(())
}

/// Read an atom of wire type `T`.
pub fn deserialize_atom<T: WireType>(buf: &ByteBuffer) -> Result<T::Value> {
    expect_type(buf, -T::TYPE.code())?;
    buf.get::<T::Value>(1)
        .ok_or_else(|| truncated(1 + <T::Value as Primitive>::SIZE, buf))
}

/// Read a vector of wire type `T`, honoring the 8-byte count of big arrays.
/// Attributes other than the big-array marker are ignored.
pub fn deserialize_vector<T: WireType>(buf: &ByteBuffer) -> Result<Vec<T::Value>> {
    expect_type(buf, T::TYPE.code())?;
    let attribute = buf.get::<u8>(1).ok_or_else(|| truncated(2, buf))?;

    let (count, mut cursor) = if attribute == BIG_ARRAY_ATTRIBUTE {
        let count = buf.get::<u64>(2).ok_or_else(|| truncated(10, buf))?;
        (count, 10)
    } else {
        let count = buf.get::<u32>(2).ok_or_else(|| truncated(6, buf))?;
        (u64::from(count), 6)
    };

    let width = <T::Value as Primitive>::SIZE;
    let needed = usize::try_from(count)
        .ok()
        .and_then(|count| count.checked_mul(width))
        .and_then(|body| body.checked_add(cursor))
        .ok_or(ProtoError::Allocation { size: count })?;
    if needed > buf.len() {
        return Err(truncated(needed, buf));
    }

    let count = (needed - cursor) / width;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(buf.read::<T::Value>(&mut cursor));
    }
    Ok(values)
}

/// Read a symbol atom.
pub fn deserialize_symbol(buf: &ByteBuffer) -> Result<String> {
    expect_type(buf, -Type::Symbol.code())?;
    read_cstr(buf, 1)
}
