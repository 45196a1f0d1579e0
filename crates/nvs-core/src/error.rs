// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy shared by the cursor, the containers and the wire shapes.

use thiserror::Error;

use crate::tag::{TypeTag, ValueKind};

/// Errors produced while decoding, encoding or looking up NVS data.
///
/// None of these are recovered locally. A failed decode never yields a
/// partially populated [`Store`](crate::Store); the caller decides whether to
/// re-fetch the dump or abandon the edit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NvsError {
    /// Attempted to read beyond the end of the buffer.
    #[error("out of data: needed {needed} byte(s) at offset {offset}, {available} available")]
    OutOfData {
        /// Cursor position at which the read was attempted.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
        /// Number of bytes that were left.
        available: usize,
    },
    /// Tag byte outside the closed set of representations.
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTypeTag(u8),
    /// Lookup of a namespace that was never materialized.
    #[error("namespace `{0}` not found")]
    NamespaceNotFound(String),
    /// Value kind does not match the kind the tag names.
    #[error("type mismatch: tag {tag} holds {expected} values")]
    TypeMismatch {
        /// Tag the access was made under.
        tag: TypeTag,
        /// Value kind that tag requires.
        expected: ValueKind,
    },
    /// Integer does not fit in the width its tag names.
    #[error("value {value} does not fit in {tag}")]
    ValueOutOfRange {
        /// Tag the value was written under.
        tag: TypeTag,
        /// Offending value.
        value: u64,
    },
    /// A field is too long for its length prefix.
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        /// Which field overflowed.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Largest length the prefix can carry.
        max: usize,
    },
    /// Bytes left over after a fixed-shape payload was fully read.
    #[error("{count} trailing byte(s) after payload")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
}
