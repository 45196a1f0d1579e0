// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named groups of entries, partitioned by tag.
//!
//! The same key may exist once per tag: `("port", U8)` and `("port", Str)`
//! are different entries. Lookups are get-or-create and identity-preserving,
//! so observers bound to a returned [`Entry`] stay valid across lookups.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::entry::{Entry, EntryValue};
use crate::error::NvsError;
use crate::store::EntryRecord;
use crate::tag::{TypeTag, Value, ValueKind};

pub(crate) struct NamespaceInner {
    pub(crate) name: String,
    partitions: RefCell<BTreeMap<TypeTag, Box<dyn Partition>>>,
}

/// One tag partition: keys in insertion order.
trait Partition {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn fork(&self, owner: &Weak<NamespaceInner>) -> Box<dyn Partition>;
    fn len(&self) -> usize;
    fn records(&self) -> Vec<EntryRecord>;
}

struct Slots<T: EntryValue> {
    entries: Vec<Entry<T>>,
    index: HashMap<String, usize>,
}

impl<T: EntryValue> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: EntryValue> Slots<T> {
    fn get(&self, key: &str) -> Option<Entry<T>> {
        self.index.get(key).map(|&i| self.entries[i].clone())
    }

    fn get_or_insert(&mut self, key: &str, make: impl FnOnce() -> Entry<T>) -> Entry<T> {
        if let Some(existing) = self.get(key) {
            return existing;
        }
        let entry = make();
        self.index.insert(key.to_owned(), self.entries.len());
        self.entries.push(entry.clone());
        entry
    }
}

impl<T: EntryValue> Partition for Slots<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn fork(&self, owner: &Weak<NamespaceInner>) -> Box<dyn Partition> {
        Box::new(Self {
            entries: self
                .entries
                .iter()
                .map(|entry| entry.fork(Weak::clone(owner)))
                .collect(),
            index: self.index.clone(),
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn records(&self) -> Vec<EntryRecord> {
        self.entries.iter().map(Entry::record).collect()
    }
}

/// Handle to a named group of entries.
///
/// Cloning the handle shares the namespace; [`Namespace::fork`] makes an
/// independent deep copy.
#[derive(Clone)]
pub struct Namespace {
    inner: Rc<NamespaceInner>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(NamespaceInner {
                name: name.into(),
                partitions: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<NamespaceInner>) -> Self {
        Self { inner }
    }

    /// Namespace name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get or create the entry for (`tag`, `key`).
    ///
    /// Repeated calls return handles to the same cell. Fails with
    /// [`NvsError::TypeMismatch`] when `T` is not the type `tag` stores.
    pub fn entry<T: EntryValue>(&self, key: &str, tag: TypeTag) -> Result<Entry<T>, NvsError> {
        check_kind::<T>(tag)?;
        let mut partitions = self.inner.partitions.borrow_mut();
        let partition = partitions
            .entry(tag)
            .or_insert_with(|| Box::new(Slots::<T>::default()) as Box<dyn Partition>);
        let slots = partition
            .as_any_mut()
            .downcast_mut::<Slots<T>>()
            .ok_or(NvsError::TypeMismatch {
                tag,
                expected: tag.kind(),
            })?;
        let owner = Rc::downgrade(&self.inner);
        Ok(slots.get_or_insert(key, || Entry::new(owner, key, tag)))
    }

    /// Existing entry for (`tag`, `key`), without creating one.
    pub fn lookup<T: EntryValue>(&self, key: &str, tag: TypeTag) -> Option<Entry<T>> {
        if T::KIND != tag.kind() {
            return None;
        }
        let partitions = self.inner.partitions.borrow();
        partitions
            .get(&tag)?
            .as_any()
            .downcast_ref::<Slots<T>>()?
            .get(key)
    }

    /// Current value of (`tag`, `key`), creating the entry if needed.
    pub fn get_value(&self, key: &str, tag: TypeTag) -> Result<Option<Value>, NvsError> {
        Ok(match tag.kind() {
            ValueKind::Uint => self.entry::<u64>(key, tag)?.get().map(Value::Uint),
            ValueKind::Text => self.entry::<String>(key, tag)?.get().map(Value::Text),
            ValueKind::Blob => self.entry::<Vec<u8>>(key, tag)?.get().map(Value::Blob),
        })
    }

    /// Current value of (`tag`, `key`) if that entry exists.
    pub fn peek_value(&self, key: &str, tag: TypeTag) -> Option<Value> {
        match tag.kind() {
            ValueKind::Uint => self.lookup::<u64>(key, tag)?.get().map(Value::Uint),
            ValueKind::Text => self.lookup::<String>(key, tag)?.get().map(Value::Text),
            ValueKind::Blob => self.lookup::<Vec<u8>>(key, tag)?.get().map(Value::Blob),
        }
    }

    /// Write a dynamically typed value into (`tag`, `key`).
    ///
    /// The partition borrow is released before subscribers run, so callbacks
    /// may look up or create entries in this namespace.
    pub fn set_value(&self, key: &str, tag: TypeTag, value: Value) -> Result<Value, NvsError> {
        if value.kind() != tag.kind() {
            return Err(NvsError::TypeMismatch {
                tag,
                expected: tag.kind(),
            });
        }
        Ok(match value {
            Value::Uint(n) => Value::Uint(self.entry::<u64>(key, tag)?.set(n)),
            Value::Text(text) => Value::Text(self.entry::<String>(key, tag)?.set(text)),
            Value::Blob(raw) => Value::Blob(self.entry::<Vec<u8>>(key, tag)?.set(raw)),
        })
    }

    /// Deep copy: same name, a fresh entry per existing entry holding a copy
    /// of its value. Subscribers are not carried over.
    pub fn fork(&self) -> Namespace {
        let forked = Rc::new(NamespaceInner {
            name: self.inner.name.clone(),
            partitions: RefCell::new(BTreeMap::new()),
        });
        let owner = Rc::downgrade(&forked);
        let copied: BTreeMap<TypeTag, Box<dyn Partition>> = self
            .inner
            .partitions
            .borrow()
            .iter()
            .map(|(tag, partition)| (*tag, partition.fork(&owner)))
            .collect();
        *forked.partitions.borrow_mut() = copied;
        Namespace { inner: forked }
    }

    /// Number of entries across all partitions.
    pub fn len(&self) -> usize {
        self.inner
            .partitions
            .borrow()
            .values()
            .map(|p| p.len())
            .sum()
    }

    /// True if no entry has been created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry, ordered by tag byte, then insertion.
    pub fn records(&self) -> Vec<EntryRecord> {
        self.inner
            .partitions
            .borrow()
            .values()
            .flat_map(|p| p.records())
            .collect()
    }

    /// `(tag, key)` pairs in [`records`](Self::records) order.
    pub fn keys(&self) -> Vec<(TypeTag, String)> {
        self.records()
            .into_iter()
            .map(|record| (record.tag, record.key))
            .collect()
    }

    /// Textual dump lines, one per entry.
    pub fn dump(&self) -> Vec<String> {
        self.records().iter().map(ToString::to_string).collect()
    }

    /// True if both handles refer to the same namespace.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn check_kind<T: EntryValue>(tag: TypeTag) -> Result<(), NvsError> {
    if T::KIND == tag.kind() {
        Ok(())
    } else {
        Err(NvsError::TypeMismatch {
            tag,
            expected: tag.kind(),
        })
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.inner.name)
            .field("entries", &self.len())
            .finish()
    }
}
