// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The document root: namespaces by name, plus the dump decoder.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codec::{ByteCursor, DumpWriter};
use crate::entry::{Entry, EntryValue};
use crate::error::NvsError;
use crate::namespace::Namespace;
use crate::session::EditSession;
use crate::tag::{TypeTag, Value};

/// One entry, detached from the store, for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Namespace name.
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Tag partition.
    pub tag: TypeTag,
    /// Current value, `None` if never written.
    pub value: Option<Value>,
}

impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} = ", self.namespace, self.key)?;
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("<unset>"),
        }
    }
}

/// Named collection of namespaces.
///
/// A store is owned by one document (committed data or a staged edit). The
/// [`Clone`] impl is a deep copy: new namespaces, new entries, values kept,
/// subscribers dropped.
#[derive(Debug, Default)]
pub struct Store {
    namespaces: Vec<Namespace>,
    index: HashMap<String, usize>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a full dump.
    ///
    /// Either every record decodes or the whole dump is rejected; no partial
    /// store is returned.
    pub fn decode(bytes: &[u8]) -> Result<Self, NvsError> {
        let mut cursor = ByteCursor::new(bytes);
        let mut store = Self::new();
        let mut records = 0usize;

        while cursor.has_more() {
            let start = cursor.position();
            let ns_len = usize::from(cursor.read_u8()?);
            let key_len = usize::from(cursor.read_u8()?);
            let tag_byte = cursor.read_u8()?;
            let namespace = cursor.read_text(ns_len)?;
            let key = cursor.read_text(key_len)?;
            let tag = TypeTag::from_byte(tag_byte)?;
            let value = cursor.read_payload(tag)?;
            debug!(offset = start, %namespace, %key, %tag, "decoded record");
            store.set(&namespace, &key, value, tag)?;
            records += 1;
        }

        info!(
            records,
            namespaces = store.len(),
            bytes = bytes.len(),
            "decoded nvs dump"
        );
        Ok(store)
    }

    /// Encode every entry that holds a value, in display order.
    pub fn encode(&self) -> Result<Vec<u8>, NvsError> {
        let mut writer = DumpWriter::default();
        for record in self.records() {
            if let Some(value) = &record.value {
                writer.write_record(&record.namespace, &record.key, record.tag, value)?;
            }
        }
        Ok(writer.into_vec())
    }

    /// Namespace `name`, created empty if absent. This is the write path.
    pub fn namespace_or_create(&mut self, name: &str) -> Namespace {
        if let Some(&i) = self.index.get(name) {
            return self.namespaces[i].clone();
        }
        let ns = Namespace::new(name);
        self.insert(ns.clone());
        ns
    }

    fn insert(&mut self, ns: Namespace) {
        self.index.insert(ns.name().to_owned(), self.namespaces.len());
        self.namespaces.push(ns);
    }

    /// Write `value` into (`namespace`, `tag`, `key`), creating both as needed,
    /// and notify the entry's subscribers.
    pub fn set(
        &mut self,
        namespace: &str,
        key: &str,
        value: Value,
        tag: TypeTag,
    ) -> Result<Value, NvsError> {
        self.namespace_or_create(namespace)
            .set_value(key, tag, value)
    }

    /// Current value of (`namespace`, `tag`, `key`).
    ///
    /// The namespace must exist; the entry is created (absent) if it does
    /// not.
    pub fn get(&self, namespace: &str, key: &str, tag: TypeTag) -> Result<Option<Value>, NvsError> {
        self.get_ns(namespace)?.get_value(key, tag)
    }

    /// Typed entry handle for (`namespace`, `tag`, `key`).
    pub fn entry<T: EntryValue>(
        &self,
        namespace: &str,
        key: &str,
        tag: TypeTag,
    ) -> Result<Entry<T>, NvsError> {
        self.get_ns(namespace)?.entry(key, tag)
    }

    /// Existing namespace `name`. Never creates one.
    pub fn get_ns(&self, name: &str) -> Result<Namespace, NvsError> {
        self.index
            .get(name)
            .map(|&i| self.namespaces[i].clone())
            .ok_or_else(|| NvsError::NamespaceNotFound(name.to_owned()))
    }

    /// True if a namespace called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// True if the store holds no namespaces.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Namespaces in creation order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    /// Every entry: namespaces in creation order, then tag, then insertion.
    pub fn records(&self) -> Vec<EntryRecord> {
        self.namespaces.iter().flat_map(Namespace::records).collect()
    }

    /// Human-readable listing, one `<namespace>.<key> = <value>` line per entry.
    pub fn dump_script(&self) -> Vec<String> {
        self.namespaces.iter().flat_map(Namespace::dump).collect()
    }

    /// Start an edit session over a deep copy of this store.
    pub fn snapshot(&self) -> EditSession {
        EditSession::new(self)
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        for ns in &self.namespaces {
            copy.insert(ns.fork());
        }
        copy
    }
}
