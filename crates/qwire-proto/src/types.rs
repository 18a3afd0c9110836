//! Wire type catalogue.

use std::fmt;

use serde::Serialize;

use crate::buffer::Primitive;

/// A 16-byte GUID, stored on the wire as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

/// Wire type codes. Atoms carry the negated code, vectors the positive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(i8)]
pub enum Type {
    Boolean = 1,
    Guid = 2,
    Byte = 4,
    Short = 5,
    Int = 6,
    Long = 7,
    Real = 8,
    Float = 9,
    Char = 10,
    Symbol = 11,
    Timestamp = 12,
    Month = 13,
    Date = 14,
    Datetime = 15,
    Timespan = 16,
    Minute = 17,
    Second = 18,
    Time = 19,
}

/// Type byte of a server error object.
pub const ERROR_TYPE: i8 = -128;

impl Type {
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Look up a type by its positive or negative code.
    pub fn from_code(code: i8) -> Option<Self> {
        let ty = match code.checked_abs()? {
            1 => Type::Boolean,
            2 => Type::Guid,
            4 => Type::Byte,
            5 => Type::Short,
            6 => Type::Int,
            7 => Type::Long,
            8 => Type::Real,
            9 => Type::Float,
            10 => Type::Char,
            11 => Type::Symbol,
            12 => Type::Timestamp,
            13 => Type::Month,
            14 => Type::Date,
            15 => Type::Datetime,
            16 => Type::Timespan,
            17 => Type::Minute,
            18 => Type::Second,
            19 => Type::Time,
            _ => return None,
        };
        Some(ty)
    }

    /// Encoded width of one value; `None` for variable-width symbols.
    pub fn width(self) -> Option<usize> {
        match self {
            Type::Boolean | Type::Byte | Type::Char => Some(1),
            Type::Short => Some(2),
            Type::Int
            | Type::Real
            | Type::Month
            | Type::Date
            | Type::Minute
            | Type::Second
            | Type::Time => Some(4),
            Type::Long | Type::Float | Type::Timestamp | Type::Datetime | Type::Timespan => {
                Some(8)
            }
            Type::Guid => Some(16),
            Type::Symbol => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Boolean => "boolean",
            Type::Guid => "guid",
            Type::Byte => "byte",
            Type::Short => "short",
            Type::Int => "int",
            Type::Long => "long",
            Type::Real => "real",
            Type::Float => "float",
            Type::Char => "char",
            Type::Symbol => "symbol",
            Type::Timestamp => "timestamp",
            Type::Month => "month",
            Type::Date => "date",
            Type::Datetime => "datetime",
            Type::Timespan => "timespan",
            Type::Minute => "minute",
            Type::Second => "second",
            Type::Time => "time",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binds a fixed-width wire type to the Rust type that represents it.
pub trait WireType {
    const TYPE: Type;
    type Value: Primitive;
}

/// Zero-sized markers for each fixed-width wire type.
pub mod wire {
    use super::{Guid as GuidValue, Type, WireType};

    macro_rules! wire_types {
        ($($(#[$doc:meta])* $name:ident => $value:ty),* $(,)?) => {
            $(
                $(#[$doc])*
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl WireType for $name {
                    const TYPE: Type = Type::$name;
                    type Value = $value;
                }
            )*
        };
    }

    wire_types! {
        Boolean => bool,
        /// Requires protocol level 3.
        Guid => GuidValue,
        Byte => u8,
        Short => i16,
        Int => i32,
        Long => i64,
        Real => f32,
        Float => f64,
        Char => u8,
        /// Nanoseconds since 2000.01.01. Requires protocol level 1.
        Timestamp => i64,
        /// Months since 2000.01.
        Month => i32,
        /// Days since 2000.01.01.
        Date => i32,
        /// Fractional days since 2000.01.01.
        Datetime => f64,
        /// Nanoseconds. Requires protocol level 1.
        Timespan => i64,
        Minute => i32,
        Second => i32,
        /// Milliseconds since midnight.
        Time => i32,
    }
}
