//! Typed values to wire bytes.

use crate::buffer::{ByteBuffer, Endian, Primitive};
use crate::error::{ProtoError, Result};
use crate::level::ProtocolLevel;
use crate::types::WireType;

/// Vectors longer than this need protocol level 6.
pub const MAX_SMALL_ARRAY_LEN: usize = 2_000_000_000;

/// Attribute byte marking a vector with an 8-byte element count.
pub const BIG_ARRAY_ATTRIBUTE: u8 = 128;

/// Counts at or above this need the 8-byte count field.
const BIG_ARRAY_LEN: u64 = 1 << 32;

/// Serializes atoms and vectors for a connection's negotiated level.
///
/// Output buffers use the serializer's byte order, host order unless set
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    level: ProtocolLevel,
    endian: Endian,
}

impl Serializer {
    pub fn new(level: ProtocolLevel) -> Self {
        Self {
            level,
            endian: Endian::NATIVE,
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn level(&self) -> ProtocolLevel {
        self.level
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    fn check_type<T: WireType>(&self) -> Result<()> {
        if !self.level.supports_type(T::TYPE) {
            return Err(ProtoError::UnsupportedType {
                ty: T::TYPE,
                level: self.level,
            });
        }
        Ok(())
    }

    /// Encode a single value: negated type code, then the value.
    ///
    /// ```
    /// use qwire_proto::{wire, Endian, ProtocolLevel, Serializer};
    ///
    /// let ser = Serializer::new(ProtocolLevel::LATEST).with_endian(Endian::Little);
    /// let buf = ser.atom::<wire::Int>(7).unwrap();
    /// assert_eq!(buf.as_slice(), &[0xfa, 7, 0, 0, 0]);
    /// ```
    pub fn atom<T: WireType>(&self, value: T::Value) -> Result<ByteBuffer> {
        self.check_type::<T>()?;

        let mut buf = ByteBuffer::zeroed(1 + <T::Value as Primitive>::SIZE, self.endian);
        let mut cursor = 0;
        buf.write(&mut cursor, -T::TYPE.code());
        buf.write(&mut cursor, value);
        Ok(buf)
    }

    /// Encode a homogeneous vector: type code, attribute, element count,
    /// then the elements.
    ///
    /// The count field is 4 bytes, or 8 bytes with attribute 128 once the
    /// count reaches 2^32. All level checks happen before anything is
    /// allocated.
    pub fn vector<T, I>(&self, values: I) -> Result<ByteBuffer>
    where
        T: WireType,
        I: IntoIterator<Item = T::Value>,
        I::IntoIter: ExactSizeIterator,
    {
        self.check_type::<T>()?;

        let values = values.into_iter();
        let count = values.len();
        if count > MAX_SMALL_ARRAY_LEN && !self.level.supports_large_arrays() {
            return Err(ProtoError::ArrayTooLarge {
                len: count,
                level: self.level,
            });
        }

        let big = count as u64 >= BIG_ARRAY_LEN;
        let prefix = if big { 2 + 8 } else { 2 + 4 };
        let size = count
            .checked_mul(<T::Value as Primitive>::SIZE)
            .and_then(|body| body.checked_add(prefix))
            .ok_or(ProtoError::Allocation { size: u64::MAX })?;

        let mut buf = ByteBuffer::try_zeroed(size, self.endian)?;
        let mut cursor = 0;
        buf.write(&mut cursor, T::TYPE.code());
        if big {
            buf.write(&mut cursor, BIG_ARRAY_ATTRIBUTE);
            buf.write(&mut cursor, count as u64);
        } else {
            buf.write(&mut cursor, 0u8);
            buf.write(&mut cursor, count as u32);
        }

        // A lying ExactSizeIterator must not write past the buffer.
        for value in values.take(count) {
            buf.write(&mut cursor, value);
        }
        Ok(buf)
    }
}
