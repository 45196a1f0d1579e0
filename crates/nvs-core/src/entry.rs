// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed, observable storage cells.
//!
//! An [`Entry`] is a shared handle: cloning it yields another reference to
//! the same cell, and [`Entry::ptr_eq`] tells handles apart. Subscribers get
//! replay(1) semantics: a late subscriber immediately observes the current
//! value, then every later write.
//!
//! Notification is synchronous and re-entrant. A callback may write to any
//! entry, including its own; once one entry is [`MAX_NOTIFY_DEPTH`] writes
//! deep in its own notification pass, further writes still land but skip
//! notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::namespace::{Namespace, NamespaceInner};
use crate::store::EntryRecord;
use crate::tag::{TypeTag, Value, ValueKind};

/// Nesting limit for notifications triggered from within a subscriber.
pub const MAX_NOTIFY_DEPTH: u32 = 32;

/// Rust types an entry can hold, one per [`ValueKind`].
pub trait EntryValue: Clone + PartialEq + fmt::Debug + 'static {
    /// Kind of value this type represents.
    const KIND: ValueKind;

    /// Wrap into the dynamic [`Value`].
    fn into_value(self) -> Value;

    /// Unwrap from a dynamic [`Value`] of the matching kind.
    fn from_value(value: Value) -> Option<Self>;
}

impl EntryValue for u64 {
    const KIND: ValueKind = ValueKind::Uint;

    fn into_value(self) -> Value {
        Value::Uint(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Uint(n) => Some(n),
            _ => None,
        }
    }
}

impl EntryValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl EntryValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;

    fn into_value(self) -> Value {
        Value::Blob(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Blob(raw) => Some(raw),
            _ => None,
        }
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct EntryInner<T: EntryValue> {
    namespace: Weak<NamespaceInner>,
    key: String,
    tag: TypeTag,
    value: RefCell<Option<T>>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_subscriber: Cell<u64>,
    depth: Cell<u32>,
}

/// Handle to one typed cell identified by (namespace, key, tag).
pub struct Entry<T: EntryValue> {
    inner: Rc<EntryInner<T>>,
}

impl<T: EntryValue> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: EntryValue> Entry<T> {
    pub(crate) fn new(namespace: Weak<NamespaceInner>, key: &str, tag: TypeTag) -> Self {
        Self::with_value(namespace, key, tag, None)
    }

    fn with_value(namespace: Weak<NamespaceInner>, key: &str, tag: TypeTag, value: Option<T>) -> Self {
        Self {
            inner: Rc::new(EntryInner {
                namespace,
                key: key.to_owned(),
                tag,
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber: Cell::new(0),
                depth: Cell::new(0),
            }),
        }
    }

    /// Copy of this entry owned by another namespace: same key, tag and
    /// value, no subscribers.
    pub(crate) fn fork(&self, namespace: Weak<NamespaceInner>) -> Self {
        Self::with_value(namespace, &self.inner.key, self.inner.tag, self.get())
    }

    /// Key within the owning namespace.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Tag partition this entry lives in.
    pub fn tag(&self) -> TypeTag {
        self.inner.tag
    }

    /// Owning namespace, if it is still alive.
    pub fn namespace(&self) -> Option<Namespace> {
        self.inner.namespace.upgrade().map(Namespace::from_inner)
    }

    /// Name of the owning namespace (`?` once it has been dropped).
    pub fn namespace_name(&self) -> String {
        self.inner
            .namespace
            .upgrade()
            .map_or_else(|| "?".to_owned(), |ns| ns.name.clone())
    }

    /// Current value, or `None` before the first write.
    pub fn get(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// True once a value has been written.
    pub fn is_set(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Assign `value`, then notify every subscriber in subscription order.
    ///
    /// Notification runs over the subscriber list as it was when the write
    /// started, so callbacks may subscribe or unsubscribe freely.
    pub fn set(&self, value: T) -> T {
        *self.inner.value.borrow_mut() = Some(value.clone());
        trace!(namespace = %self.namespace_name(), key = %self.inner.key, tag = %self.inner.tag, "entry set");

        let depth = self.inner.depth.get();
        if depth >= MAX_NOTIFY_DEPTH {
            warn!(
                namespace = %self.namespace_name(),
                key = %self.inner.key,
                depth,
                "re-entrant write limit reached, skipping notification"
            );
            return value;
        }

        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();

        let _guard = DepthGuard::enter(&self.inner.depth);
        for callback in callbacks {
            callback(&value);
        }
        value
    }

    /// Register `callback`. If a value is present it is delivered right away.
    ///
    /// The returned [`Subscription`] removes the callback when
    /// [`unsubscribe`](Subscription::unsubscribe)d; dropping it leaves the
    /// callback registered.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);

        let callback: Callback<T> = Rc::new(callback);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::clone(&callback)));

        let current = self.get();
        if let Some(value) = current {
            callback(&value);
        }

        Subscription {
            entry: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// True if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Serializable view of this entry.
    pub fn record(&self) -> EntryRecord {
        EntryRecord {
            namespace: self.namespace_name(),
            key: self.inner.key.clone(),
            tag: self.inner.tag,
            value: self.get().map(EntryValue::into_value),
        }
    }
}

impl<T: EntryValue> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("namespace", &self.namespace_name())
            .field("key", &self.inner.key)
            .field("tag", &self.inner.tag)
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T: EntryValue> fmt::Display for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}>", self.namespace_name(), self.inner.key)
    }
}

struct DepthGuard<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Registration returned by [`Entry::subscribe`].
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription<T: EntryValue> {
    entry: Weak<EntryInner<T>>,
    id: u64,
}

impl<T: EntryValue> Subscription<T> {
    /// Remove the callback. A no-op if the entry is gone.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.entry.upgrade() {
            inner.subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T: EntryValue> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detached(key: &str, tag: TypeTag) -> Entry<u64> {
        Entry::new(Weak::new(), key, tag)
    }

    #[test]
    fn starts_absent() {
        let entry = detached("k", TypeTag::U8);
        assert_eq!(entry.get(), None);
        assert!(!entry.is_set());
    }

    #[test]
    fn set_returns_value_and_notifies_in_order() {
        let entry = detached("k", TypeTag::U8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        let b = Rc::clone(&seen);
        let _s1 = entry.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let _s2 = entry.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        assert_eq!(entry.set(7), 7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn late_subscriber_sees_latest_value() {
        let entry = detached("k", TypeTag::U8);
        entry.set(5);
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let _sub = entry.subscribe(move |v| sink.set(*v));
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let entry = detached("k", TypeTag::U8);
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let sub = entry.subscribe(move |_| sink.set(sink.get() + 1));
        entry.set(1);
        sub.unsubscribe();
        entry.set(2);
        assert_eq!(count.get(), 1);
        assert_eq!(entry.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribing_mid_pass_keeps_the_pass_stable() {
        let entry = detached("k", TypeTag::U8);
        let second_seen = Rc::new(RefCell::new(Vec::new()));
        let pending: Rc<RefCell<Option<Subscription<u64>>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&pending);
        let _first = entry.subscribe(move |_| {
            if let Some(sub) = slot.borrow_mut().take() {
                sub.unsubscribe();
            }
        });
        let sink = Rc::clone(&second_seen);
        let second = entry.subscribe(move |v| sink.borrow_mut().push(*v));
        *pending.borrow_mut() = Some(second);

        entry.set(1);
        entry.set(2);
        assert_eq!(*second_seen.borrow(), vec![1]);
    }

    #[test]
    fn self_writing_subscriber_terminates() {
        let entry = detached("k", TypeTag::U32);
        let handle = entry.clone();
        let calls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&calls);
        let _sub = entry.subscribe(move |v| {
            counter.set(counter.get() + 1);
            handle.set(v + 1);
        });
        entry.set(0);
        assert_eq!(calls.get(), MAX_NOTIFY_DEPTH);
        assert_eq!(entry.get(), Some(u64::from(MAX_NOTIFY_DEPTH)));
    }

    #[test]
    fn fork_copies_value_but_not_subscribers() {
        let entry = detached("k", TypeTag::U8);
        entry.set(3);
        let _sub = entry.subscribe(|_| {});
        let copy = entry.fork(Weak::new());
        assert_eq!(copy.get(), Some(3));
        assert_eq!(copy.subscriber_count(), 0);
        assert!(!copy.ptr_eq(&entry));
        copy.set(9);
        assert_eq!(entry.get(), Some(3));
    }

    #[test]
    fn display_names_the_cell() {
        let entry = detached("cds", TypeTag::U8);
        assert_eq!(entry.to_string(), "<?.cds>");
    }
}
