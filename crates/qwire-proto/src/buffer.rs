use bytes::Bytes;
use serde::Serialize;

use crate::error::{ProtoError, Result};
use crate::types::Guid;

/// Byte order of a buffer's multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    /// Byte order of the host.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;

    /// Decode header byte 0: 1 means little-endian, anything else big-endian.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    /// Header byte 0 for this byte order.
    pub fn flag(self) -> u8 {
        match self {
            Endian::Little => 1,
            Endian::Big => 0,
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::NATIVE
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width values that can be stored in a [`ByteBuffer`].
pub trait Primitive: Copy + sealed::Sealed {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Write into the first `SIZE` bytes of `dst` in `endian` order.
    fn put(self, dst: &mut [u8], endian: Endian);

    /// Read from the first `SIZE` bytes of `src` in `endian` order.
    fn get(src: &[u8], endian: Endian) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put(self, dst: &mut [u8], endian: Endian) {
                    let raw = match endian {
                        Endian::Little => self.to_le_bytes(),
                        Endian::Big => self.to_be_bytes(),
                    };
                    dst[..Self::SIZE].copy_from_slice(&raw);
                }

                #[inline]
                fn get(src: &[u8], endian: Endian) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&src[..Self::SIZE]);
                    match endian {
                        Endian::Little => <$ty>::from_le_bytes(raw),
                        Endian::Big => <$ty>::from_be_bytes(raw),
                    }
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn put(self, dst: &mut [u8], _endian: Endian) {
        dst[0] = u8::from(self);
    }

    #[inline]
    fn get(src: &[u8], _endian: Endian) -> Self {
        src[0] != 0
    }
}

impl sealed::Sealed for Guid {}

// GUIDs are raw bytes on the wire and never swapped.
impl Primitive for Guid {
    const SIZE: usize = 16;

    #[inline]
    fn put(self, dst: &mut [u8], _endian: Endian) {
        dst[..16].copy_from_slice(&self.0);
    }

    #[inline]
    fn get(src: &[u8], _endian: Endian) -> Self {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&src[..16]);
        Guid(raw)
    }
}

/// An owned, length-tracked byte block with a declared byte order.
///
/// Typed reads and writes convert between the declared order and host
/// order. Offsets are computed by the caller: reading or writing past
/// [`ByteBuffer::len`] is a programming error and panics. Use
/// [`ByteBuffer::get`] when the offset comes from untrusted data.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    endian: Endian,
}

impl ByteBuffer {
    /// A zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize, endian: Endian) -> Self {
        Self {
            data: vec![0; len],
            endian,
        }
    }

    /// Like [`ByteBuffer::zeroed`] but reports allocation failure instead of
    /// aborting. Used for sizes read off the wire.
    pub fn try_zeroed(len: usize, endian: Endian) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ProtoError::Allocation { size: len as u64 })?;
        data.resize(len, 0);
        Ok(Self { data, endian })
    }

    /// Wrap existing bytes.
    pub fn from_vec(data: Vec<u8>, endian: Endian) -> Self {
        Self { data, endian }
    }

    /// Copy a slice into a new buffer.
    pub fn from_slice(data: &[u8], endian: Endian) -> Self {
        Self {
            data: data.to_vec(),
            endian,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Re-tag the byte order, e.g. once a frame header has been decoded.
    /// The stored bytes are not touched.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Shrink to `len` bytes. No-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Convert into shared immutable bytes.
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.data)
    }

    /// Read a value at `offset` without moving any cursor.
    #[inline]
    pub fn read_at<T: Primitive>(&self, offset: usize) -> T {
        debug_assert!(offset + T::SIZE <= self.data.len());
        T::get(&self.data[offset..], self.endian)
    }

    /// Write a value at `offset` without moving any cursor.
    #[inline]
    pub fn write_at<T: Primitive>(&mut self, offset: usize, value: T) {
        debug_assert!(offset + T::SIZE <= self.data.len());
        value.put(&mut self.data[offset..], self.endian);
    }

    /// Read a value at `*cursor` and advance the cursor past it.
    #[inline]
    pub fn read<T: Primitive>(&self, cursor: &mut usize) -> T {
        let value = self.read_at(*cursor);
        *cursor += T::SIZE;
        value
    }

    /// Write a value at `*cursor` and advance the cursor past it.
    #[inline]
    pub fn write<T: Primitive>(&mut self, cursor: &mut usize, value: T) {
        self.write_at(*cursor, value);
        *cursor += T::SIZE;
    }

    /// Checked read: `None` if the value would run past the end.
    pub fn get<T: Primitive>(&self, offset: usize) -> Option<T> {
        let end = offset.checked_add(T::SIZE)?;
        let src = self.data.get(offset..end)?;
        Some(T::get(src, self.endian))
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.data.len())
            .field("endian", &self.endian)
            .finish()
    }
}
