// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Big-endian cursor and writer for the NVS dump format.
//!
//! The cursor is strictly forward: every read consumes from the front and
//! there is no seek. Text reads drop every NUL byte in the field (not only a
//! trailing terminator) so fixed-size C-string fields decode to their content.

use crate::error::NvsError;
use crate::tag::{Payload, TypeTag, Value, Width};

/// Largest namespace or key name the dump's 1-byte length prefix can carry.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Largest text or blob payload the 4-byte length prefix can carry.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Sequential reader over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the first byte of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// True while unread bytes remain.
    pub fn has_more(&self) -> bool {
        self.remaining() > 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], NvsError> {
        let available = self.remaining();
        if len > available {
            return Err(NvsError::OutOfData {
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let end = self.offset + len;
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Read an unsigned big-endian integer of `width`, zero-extended to `u64`.
    pub fn read_uint(&mut self, width: Width) -> Result<u64, NvsError> {
        let chunk = self.take(width.bytes())?;
        Ok(chunk
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, NvsError> {
        let chunk = self.take(1)?;
        Ok(chunk[0])
    }

    /// Read a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, NvsError> {
        let chunk = self.take(4)?;
        let raw: [u8; 4] = chunk.try_into().map_err(|_| NvsError::OutOfData {
            offset: self.offset,
            needed: 4,
            available: chunk.len(),
        })?;
        Ok(u32::from_be_bytes(raw))
    }

    /// Read the next `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], NvsError> {
        self.take(len)
    }

    /// Read `len` bytes as text, dropping every NUL byte in the field.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected; device-side
    /// names are C strings and carry no encoding guarantee.
    pub fn read_text(&mut self, len: usize) -> Result<String, NvsError> {
        let raw = self.take(len)?;
        let stripped: Vec<u8> = raw.iter().copied().filter(|b| *b != 0).collect();
        Ok(String::from_utf8_lossy(&stripped).into_owned())
    }

    /// Read one record payload in the shape `tag` names.
    ///
    /// Signed tags go through the unsigned reader; see [`TypeTag::sign_extend`].
    pub fn read_payload(&mut self, tag: TypeTag) -> Result<Value, NvsError> {
        match tag.payload() {
            Payload::Uint(width) => self.read_uint(width).map(Value::Uint),
            Payload::Text => {
                let len = self.read_u32()? as usize;
                self.read_text(len).map(Value::Text)
            }
            Payload::Blob => {
                let len = self.read_u32()? as usize;
                self.read_bytes(len).map(|raw| Value::Blob(raw.to_vec()))
            }
        }
    }
}

/// Big-endian writer producing records in the dump layout.
#[derive(Debug, Default)]
pub struct DumpWriter {
    buf: Vec<u8>,
}

impl DumpWriter {
    /// Create a writer with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a big-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write the low `width` bytes of `value`, big-endian. Higher bytes are
    /// dropped; [`write_payload`](Self::write_payload) is the checked path.
    pub fn write_uint(&mut self, width: Width, value: u64) {
        let bytes = value.to_be_bytes();
        self.buf.extend_from_slice(&bytes[8 - width.bytes()..]);
    }

    /// Write bytes behind a big-endian u32 length prefix.
    pub fn write_len_prefixed(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), NvsError> {
        let len = u32::try_from(bytes.len()).map_err(|_| NvsError::FieldTooLong {
            field,
            len: bytes.len(),
            max: MAX_PAYLOAD_LEN,
        })?;
        self.write_u32(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write one payload in the shape `tag` names.
    ///
    /// Integers wider than the tag's width are rejected, never truncated.
    pub fn write_payload(&mut self, tag: TypeTag, value: &Value) -> Result<(), NvsError> {
        value.check_fits(tag)?;
        match (tag.payload(), value) {
            (Payload::Uint(width), Value::Uint(n)) => {
                self.write_uint(width, *n);
                Ok(())
            }
            (Payload::Text, Value::Text(text)) => self.write_len_prefixed("text", text.as_bytes()),
            (Payload::Blob, Value::Blob(raw)) => self.write_len_prefixed("blob", raw),
            (payload, _) => Err(NvsError::TypeMismatch {
                tag,
                expected: payload.kind(),
            }),
        }
    }

    /// Append one full dump record.
    pub fn write_record(
        &mut self,
        namespace: &str,
        key: &str,
        tag: TypeTag,
        value: &Value,
    ) -> Result<(), NvsError> {
        let ns_len = name_len("namespace", namespace)?;
        let key_len = name_len("key", key)?;
        self.write_u8(ns_len);
        self.write_u8(key_len);
        self.write_u8(tag.as_byte());
        self.write_bytes(namespace.as_bytes());
        self.write_bytes(key.as_bytes());
        self.write_payload(tag, value)
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

fn name_len(field: &'static str, name: &str) -> Result<u8, NvsError> {
    u8::try_from(name.len()).map_err(|_| NvsError::FieldTooLong {
        field,
        len: name.len(),
        max: MAX_NAME_LEN,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn read_uint_is_big_endian() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_uint(Width::W16).unwrap(), 0x1234);
        assert_eq!(cursor.read_uint(Width::W8).unwrap(), 0x56);
        assert_eq!(cursor.read_uint(Width::W8).unwrap(), 0x78);
        assert!(!cursor.has_more());
    }

    #[test]
    fn all_ones_read_as_width_max() {
        for width in [Width::W8, Width::W16, Width::W32, Width::W64] {
            let bytes = vec![0xFF; width.bytes()];
            let mut cursor = ByteCursor::new(&bytes);
            assert_eq!(cursor.read_uint(width).unwrap(), width.max());
        }
    }

    #[test]
    fn short_read_reports_position_and_need() {
        let bytes = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.read_u8().unwrap();
        let err = cursor.read_uint(Width::W32).unwrap_err();
        assert_eq!(
            err,
            NvsError::OutOfData {
                offset: 1,
                needed: 4,
                available: 2
            }
        );
        // A failed read does not consume.
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn text_drops_every_nul() {
        let bytes = b"a\0b\0";
        let mut cursor = ByteCursor::new(bytes);
        assert_eq!(cursor.read_text(4).unwrap(), "ab");
    }

    #[test]
    fn text_of_only_nuls_is_empty() {
        let bytes = [0u8; 8];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_text(8).unwrap(), "");
    }

    #[test]
    fn writer_truncates_to_width() {
        let mut w = DumpWriter::default();
        w.write_uint(Width::W16, 0x0001_2345);
        assert_eq!(w.into_vec(), vec![0x23, 0x45]);
    }

    #[test]
    fn record_layout_matches_dump_format() {
        let mut w = DumpWriter::default();
        w.write_record("mas", "cds", TypeTag::U8, &Value::Uint(2)).unwrap();
        assert_eq!(w.into_vec(), b"\x03\x03\x01mascds\x02".to_vec());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut w = DumpWriter::default();
        let long = "n".repeat(256);
        let err = w
            .write_record(&long, "k", TypeTag::U8, &Value::Uint(0))
            .unwrap_err();
        assert!(matches!(
            err,
            NvsError::FieldTooLong {
                field: "namespace",
                len: 256,
                ..
            }
        ));
    }

    #[test]
    fn oversized_integer_payload_is_rejected() {
        let mut w = DumpWriter::default();
        let err = w
            .write_record("mas", "cds", TypeTag::U8, &Value::Uint(300))
            .unwrap_err();
        assert_eq!(
            err,
            NvsError::ValueOutOfRange {
                tag: TypeTag::U8,
                value: 300
            }
        );
        w.write_payload(TypeTag::U16, &Value::Uint(0xFFFF)).unwrap();
    }

    #[test]
    fn payload_kind_must_match_tag() {
        let mut w = DumpWriter::default();
        let err = w
            .write_payload(TypeTag::Str, &Value::Uint(1))
            .unwrap_err();
        assert!(matches!(err, NvsError::TypeMismatch { tag: TypeTag::Str, .. }));
    }
}
