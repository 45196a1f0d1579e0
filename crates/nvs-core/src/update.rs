// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-field update payload sent to the device for one changed entry.
//!
//! Layout (big-endian): u32 namespace length, namespace bytes, u32 key
//! length, key bytes, tag byte, raw value bytes. The value runs to the end of
//! the buffer. This shape is versioned independently of the dump format,
//! which uses 1-byte name lengths.

use serde::{Deserialize, Serialize};

use crate::codec::{ByteCursor, DumpWriter};
use crate::error::NvsError;
use crate::tag::{Payload, TypeTag, Value};

/// One field write addressed to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Namespace name.
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Storage representation.
    pub tag: TypeTag,
    /// New value.
    pub value: Value,
}

impl UpdatePayload {
    /// Build a payload, checking that `value` fits `tag`.
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        tag: TypeTag,
        value: Value,
    ) -> Result<Self, NvsError> {
        value.check_fits(tag)?;
        Ok(Self {
            namespace: namespace.into(),
            key: key.into(),
            tag,
            value,
        })
    }

    /// Raw value bytes: integers as `width` big-endian bytes, text as UTF-8,
    /// blobs verbatim.
    pub fn value_bytes(&self) -> Result<Vec<u8>, NvsError> {
        self.value.check_fits(self.tag)?;
        let mut writer = DumpWriter::default();
        match (self.tag.payload(), &self.value) {
            (Payload::Uint(width), Value::Uint(n)) => writer.write_uint(width, *n),
            (Payload::Text, Value::Text(text)) => writer.write_bytes(text.as_bytes()),
            (Payload::Blob, Value::Blob(raw)) => writer.write_bytes(raw),
            (payload, _) => {
                return Err(NvsError::TypeMismatch {
                    tag: self.tag,
                    expected: payload.kind(),
                })
            }
        }
        Ok(writer.into_vec())
    }

    /// Encode to the wire shape.
    pub fn encode(&self) -> Result<Vec<u8>, NvsError> {
        let value = self.value_bytes()?;
        let mut writer =
            DumpWriter::with_capacity(9 + self.namespace.len() + self.key.len() + value.len());
        writer.write_len_prefixed("namespace", self.namespace.as_bytes())?;
        writer.write_len_prefixed("key", self.key.as_bytes())?;
        writer.write_u8(self.tag.as_byte());
        writer.write_bytes(&value);
        Ok(writer.into_vec())
    }

    /// Decode from the wire shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, NvsError> {
        let mut cursor = ByteCursor::new(bytes);
        let ns_len = cursor.read_u32()? as usize;
        let namespace = cursor.read_text(ns_len)?;
        let key_len = cursor.read_u32()? as usize;
        let key = cursor.read_text(key_len)?;
        let tag = TypeTag::from_byte(cursor.read_u8()?)?;
        let value = match tag.payload() {
            Payload::Uint(width) => {
                let n = cursor.read_uint(width)?;
                if cursor.has_more() {
                    return Err(NvsError::TrailingBytes {
                        count: cursor.remaining(),
                    });
                }
                Value::Uint(n)
            }
            Payload::Text => Value::Text(cursor.read_text(cursor.remaining())?),
            Payload::Blob => Value::Blob(cursor.read_bytes(cursor.remaining())?.to_vec()),
        };
        Ok(Self {
            namespace,
            key,
            tag,
            value,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn master_count_update_layout() {
        let payload = UpdatePayload::new("mas", "cds", TypeTag::U8, Value::Uint(2)).unwrap();
        assert_eq!(
            hex::encode(payload.encode().unwrap()),
            "000000036d6173000000036364730102"
        );
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let err = UpdatePayload::new("mas", "cds", TypeTag::U8, Value::Uint(300)).unwrap_err();
        assert_eq!(
            err,
            NvsError::ValueOutOfRange {
                tag: TypeTag::U8,
                value: 300
            }
        );
        let built = UpdatePayload {
            namespace: "mas".into(),
            key: "cds".into(),
            tag: TypeTag::U16,
            value: Value::Uint(0x1_0000),
        };
        assert!(built.encode().is_err());
    }

    #[test]
    fn integers_use_the_tag_width() {
        let payload =
            UpdatePayload::new("a_cu1", "rate", TypeTag::U32, Value::Uint(115_200)).unwrap();
        assert_eq!(payload.value_bytes().unwrap(), vec![0x00, 0x01, 0xC2, 0x00]);
    }

    #[test]
    fn decode_reads_back_text_to_end_of_buffer() {
        let payload = UpdatePayload::new(
            "a_nw1",
            "hostname",
            TypeTag::Str,
            Value::Text("bridge-01".into()),
        )
        .unwrap();
        let bytes = payload.encode().unwrap();
        assert_eq!(UpdatePayload::decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn integer_payload_with_extra_bytes_is_rejected() {
        let mut bytes = UpdatePayload::new("mas", "cn", TypeTag::U8, Value::Uint(1))
            .unwrap()
            .encode()
            .unwrap();
        bytes.push(0);
        assert_eq!(
            UpdatePayload::decode(&bytes).unwrap_err(),
            NvsError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn short_integer_payload_is_out_of_data() {
        let mut bytes = UpdatePayload::new("mas", "ip", TypeTag::U32, Value::Uint(1))
            .unwrap()
            .encode()
            .unwrap();
        bytes.pop();
        assert!(matches!(
            UpdatePayload::decode(&bytes),
            Err(NvsError::OutOfData { .. })
        ));
    }

    #[test]
    fn mismatched_value_is_rejected_up_front() {
        assert!(UpdatePayload::new("mas", "cds", TypeTag::U8, Value::Text("2".into())).is_err());
    }
}
