// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Edit sessions: stage changes on a deep copy, then commit or discard.
//!
//! A session holds two copies of the committed store taken at snapshot
//! time: a baseline that is never touched and the staged copy that editors
//! write to. [`EditSession::commit`] applies only the fields whose staged
//! value differs from the baseline, through [`Entry::set`](crate::Entry::set),
//! so subscribers bound to the committed store fire and keep their handles.

use tracing::debug;

use crate::error::NvsError;
use crate::store::Store;
use crate::update::UpdatePayload;

/// Staged edits over a snapshot of a [`Store`].
#[derive(Debug)]
pub struct EditSession {
    baseline: Store,
    staged: Store,
}

impl EditSession {
    pub(crate) fn new(committed: &Store) -> Self {
        Self {
            baseline: committed.clone(),
            staged: committed.clone(),
        }
    }

    /// The staged document, for reading.
    pub fn store(&self) -> &Store {
        &self.staged
    }

    /// The staged document, for editing.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.staged
    }

    /// Fields whose staged value differs from the snapshot, in display order.
    ///
    /// Entries that were created in the session but never written are not
    /// changes.
    pub fn changes(&self) -> Vec<UpdatePayload> {
        self.staged
            .records()
            .into_iter()
            .filter_map(|record| {
                let value = record.value?;
                let before = self
                    .baseline
                    .get_ns(&record.namespace)
                    .ok()
                    .and_then(|ns| ns.peek_value(&record.key, record.tag));
                (before.as_ref() != Some(&value)).then(|| UpdatePayload {
                    namespace: record.namespace,
                    key: record.key,
                    tag: record.tag,
                    value,
                })
            })
            .collect()
    }

    /// True if any field differs from the snapshot.
    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Apply the staged changes to `committed` and return one update payload
    /// per changed field.
    ///
    /// Missing namespaces and entries are created on the committed side.
    /// Every change must be encodable under its tag; otherwise nothing is
    /// applied.
    pub fn commit(self, committed: &mut Store) -> Result<Vec<UpdatePayload>, NvsError> {
        let changes = self.changes();
        for change in &changes {
            change.value.check_fits(change.tag)?;
        }
        for change in &changes {
            committed.set(&change.namespace, &change.key, change.value.clone(), change.tag)?;
        }
        debug!(changes = changes.len(), "committed edit session");
        Ok(changes)
    }

    /// Drop the staged changes. The committed store is never touched by a
    /// session until [`commit`](Self::commit).
    pub fn discard(self) {
        debug!(pending = self.changes().len(), "discarded edit session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::tag::{TypeTag, Value};

    fn committed() -> Store {
        let mut store = Store::new();
        store.set("mas", "cds", Value::Uint(1), TypeTag::U8).unwrap();
        store
            .set("a_nw1", "ssid", Value::Text("lab".into()), TypeTag::Str)
            .unwrap();
        store
    }

    #[test]
    fn staged_edits_are_invisible_until_commit() {
        let store = committed();
        let mut session = store.snapshot();
        session
            .store_mut()
            .set("mas", "cds", Value::Uint(2), TypeTag::U8)
            .unwrap();
        assert_eq!(store.get("mas", "cds", TypeTag::U8).unwrap(), Some(Value::Uint(1)));
        assert_eq!(
            session.store().get("mas", "cds", TypeTag::U8).unwrap(),
            Some(Value::Uint(2))
        );
        assert!(session.is_dirty());
    }

    #[test]
    fn commit_updates_bound_entries_and_reports_changes() {
        let mut store = committed();
        let cds = store.entry::<u64>("mas", "cds", TypeTag::U8).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = cds.subscribe(move |v| sink.borrow_mut().push(*v));

        let mut session = store.snapshot();
        let staged = session.store_mut();
        staged.set("mas", "cds", Value::Uint(2), TypeTag::U8).unwrap();
        staged.set("mas", "cn", Value::Uint(1), TypeTag::U8).unwrap();
        staged
            .set("a_nw1", "ssid", Value::Text("lab".into()), TypeTag::Str)
            .unwrap();

        let changes = session.commit(&mut store).unwrap();
        assert_eq!(
            changes,
            vec![
                UpdatePayload::new("mas", "cds", TypeTag::U8, Value::Uint(2)).unwrap(),
                UpdatePayload::new("mas", "cn", TypeTag::U8, Value::Uint(1)).unwrap(),
            ]
        );
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(store
            .entry::<u64>("mas", "cds", TypeTag::U8)
            .unwrap()
            .ptr_eq(&cds));
        assert_eq!(store.get("mas", "cn", TypeTag::U8).unwrap(), Some(Value::Uint(1)));
    }

    #[test]
    fn commit_rejects_values_wider_than_their_tag() {
        let mut store = committed();
        let mut session = store.snapshot();
        let staged = session.store_mut();
        staged.set("mas", "cn", Value::Uint(1), TypeTag::U8).unwrap();
        staged.set("mas", "cds", Value::Uint(257), TypeTag::U8).unwrap();

        let err = session.commit(&mut store).unwrap_err();
        assert_eq!(
            err,
            NvsError::ValueOutOfRange {
                tag: TypeTag::U8,
                value: 257
            }
        );
        assert_eq!(store.dump_script(), committed().dump_script());
    }

    #[test]
    fn discard_leaves_committed_untouched() {
        let store = committed();
        let mut session = store.snapshot();
        session
            .store_mut()
            .set("new_ns", "k", Value::Uint(9), TypeTag::U16)
            .unwrap();
        session.discard();
        assert!(!store.contains("new_ns"));
        assert_eq!(store.dump_script(), committed().dump_script());
    }

    #[test]
    fn unwritten_entries_are_not_changes() {
        let store = committed();
        let session = store.snapshot();
        session
            .store()
            .get_ns("mas")
            .unwrap()
            .entry::<u64>("cdu", TypeTag::U8)
            .unwrap();
        assert!(!session.is_dirty());
    }
}
