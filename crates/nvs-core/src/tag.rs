// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type tags, payload shapes and dynamically typed values.
//!
//! Tag byte layout: the high nibble selects the category (`0x0` unsigned,
//! `0x1` signed, anything else a standalone tag) and the low nibble of an
//! integer tag is its width in bytes. `0x21` is text and `0x42` is a blob.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NvsError;

/// Integer width carried by the integer tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// One byte.
    W8,
    /// Two bytes.
    W16,
    /// Four bytes.
    W32,
    /// Eight bytes.
    W64,
}

impl Width {
    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    /// Width in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    /// Largest unsigned value of this width.
    pub fn max(self) -> u64 {
        match self {
            Self::W8 => u64::from(u8::MAX),
            Self::W16 => u64::from(u16::MAX),
            Self::W32 => u64::from(u32::MAX),
            Self::W64 => u64::MAX,
        }
    }
}

/// Storage representation of an entry, as named by its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TypeTag {
    /// Unsigned 8-bit integer.
    U8 = 0x01,
    /// Unsigned 16-bit integer.
    U16 = 0x02,
    /// Unsigned 32-bit integer.
    U32 = 0x04,
    /// Unsigned 64-bit integer.
    U64 = 0x08,
    /// Signed 8-bit integer.
    I8 = 0x11,
    /// Signed 16-bit integer.
    I16 = 0x12,
    /// Signed 32-bit integer.
    I32 = 0x14,
    /// Signed 64-bit integer.
    I64 = 0x18,
    /// Length-prefixed text.
    Str = 0x21,
    /// Length-prefixed raw bytes.
    Blob = 0x42,
}

/// Every tag, in ascending byte order.
pub const ALL_TAGS: [TypeTag; 10] = [
    TypeTag::U8,
    TypeTag::U16,
    TypeTag::U32,
    TypeTag::U64,
    TypeTag::I8,
    TypeTag::I16,
    TypeTag::I32,
    TypeTag::I64,
    TypeTag::Str,
    TypeTag::Blob,
];

/// Payload shape a tag selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Fixed-width big-endian integer.
    Uint(Width),
    /// u32 length followed by text bytes.
    Text,
    /// u32 length followed by raw bytes.
    Blob,
}

impl Payload {
    /// Kind of value this payload decodes into.
    pub fn kind(self) -> ValueKind {
        match self {
            Self::Uint(_) => ValueKind::Uint,
            Self::Text => ValueKind::Text,
            Self::Blob => ValueKind::Blob,
        }
    }
}

/// Kind of a [`Value`], independent of integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Integer (all widths and both signednesses).
    Uint,
    /// Text.
    Text,
    /// Raw bytes.
    Blob,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uint => "integer",
            Self::Text => "text",
            Self::Blob => "blob",
        })
    }
}

impl TypeTag {
    /// Parse a tag byte. Bytes outside the closed set are rejected.
    pub fn from_byte(byte: u8) -> Result<Self, NvsError> {
        match byte {
            0x01 => Ok(Self::U8),
            0x02 => Ok(Self::U16),
            0x04 => Ok(Self::U32),
            0x08 => Ok(Self::U64),
            0x11 => Ok(Self::I8),
            0x12 => Ok(Self::I16),
            0x14 => Ok(Self::I32),
            0x18 => Ok(Self::I64),
            0x21 => Ok(Self::Str),
            0x42 => Ok(Self::Blob),
            other => Err(NvsError::UnknownTypeTag(other)),
        }
    }

    /// The tag byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Payload shape for this tag.
    pub fn payload(self) -> Payload {
        match self {
            Self::U8 | Self::I8 => Payload::Uint(Width::W8),
            Self::U16 | Self::I16 => Payload::Uint(Width::W16),
            Self::U32 | Self::I32 => Payload::Uint(Width::W32),
            Self::U64 | Self::I64 => Payload::Uint(Width::W64),
            Self::Str => Payload::Text,
            Self::Blob => Payload::Blob,
        }
    }

    /// Kind of value stored under this tag.
    pub fn kind(self) -> ValueKind {
        self.payload().kind()
    }

    /// True for the `I*` tags.
    pub fn is_signed(self) -> bool {
        self.as_byte() >> 4 == 0x1
    }

    /// Two's-complement reading of a raw integer for the signed tags.
    ///
    /// Decoding never calls this: signed payloads are stored as the raw
    /// unsigned value. Returns `None` for unsigned, text and blob tags.
    pub fn sign_extend(self, raw: u64) -> Option<i64> {
        if !self.is_signed() {
            return None;
        }
        let Payload::Uint(width) = self.payload() else {
            return None;
        };
        let shift = 64 - width.bits();
        #[allow(clippy::cast_possible_wrap)]
        Some(((raw << shift) as i64) >> shift)
    }

    /// Lowercase name (`u8`, `i32`, `str`, `blob`).
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Str => "str",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ALL_TAGS
            .into_iter()
            .find(|tag| tag.name() == lower)
            .ok_or_else(|| format!("unknown tag `{s}` (expected one of u8..u64, i8..i64, str, blob)"))
    }
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Any integer tag, read as unsigned.
    Uint(u64),
    /// Text with NUL bytes removed.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Uint(_) => ValueKind::Uint,
            Self::Text(_) => ValueKind::Text,
            Self::Blob(_) => ValueKind::Blob,
        }
    }

    /// Check that this value can be encoded under `tag`: same kind, and for
    /// integers no wider than the tag's width.
    ///
    /// Entries accept any value; this check runs where bytes are produced.
    pub fn check_fits(&self, tag: TypeTag) -> Result<(), NvsError> {
        match (tag.payload(), self) {
            (Payload::Uint(width), Self::Uint(n)) if *n > width.max() => {
                Err(NvsError::ValueOutOfRange { tag, value: *n })
            }
            _ if self.kind() != tag.kind() => Err(NvsError::TypeMismatch {
                tag,
                expected: tag.kind(),
            }),
            _ => Ok(()),
        }
    }

    /// Parse `raw` into a value of the kind `tag` stores.
    ///
    /// Integers accept decimal or `0x`-prefixed hex (a leading `-` is allowed
    /// for signed tags and stored as its two's-complement bit pattern), text
    /// is taken verbatim and blobs are hex.
    pub fn parse(tag: TypeTag, raw: &str) -> Result<Self, String> {
        match tag.payload() {
            Payload::Uint(width) => parse_int(tag, width, raw).map(Value::Uint),
            Payload::Text => Ok(Value::Text(raw.to_owned())),
            Payload::Blob => parse_hex(raw).map(Value::Blob),
        }
    }
}

fn parse_int(tag: TypeTag, width: Width, raw: &str) -> Result<u64, String> {
    let bad = |e: std::num::ParseIntError| format!("invalid {tag} value `{raw}`: {e}");
    let value = if let Some(negative) = raw.strip_prefix('-') {
        if !tag.is_signed() {
            return Err(format!("{tag} cannot hold negative value `{raw}`"));
        }
        let magnitude: u64 = negative.parse().map_err(bad)?;
        if magnitude > (width.max() >> 1) + 1 {
            return Err(format!("{raw} does not fit in {tag}"));
        }
        magnitude.wrapping_neg() & width.max()
    } else if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(bad)?
    } else {
        raw.parse::<u64>().map_err(bad)?
    };
    if value > width.max() {
        return Err(format!("{raw} does not fit in {tag}"));
    }
    Ok(value)
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, String> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).map_err(|e| format!("invalid blob hex `{raw}`: {e}"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
            Self::Blob(raw) => {
                for (i, byte) in raw.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{byte}")?;
                }
                Ok(())
            }
        }
    }
}
