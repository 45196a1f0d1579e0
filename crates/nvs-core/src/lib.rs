// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed, observable document model for NVS configuration dumps.
//!
//! A dump is a flat run of records, each naming a namespace, a key and a
//! [`TypeTag`] followed by its payload. [`Store::decode`] turns the bytes into
//! namespaces of [`Entry`] cells that editors read, write and observe.
//! Edits are staged on an [`EditSession`] and committed as a list of
//! [`UpdatePayload`]s, one per changed field.
//!
//! # Signed tags
//!
//! Payloads under the `I*` tags are read with the unsigned reader and stored
//! as the raw bit pattern. Callers that want the signed reading ask for it
//! with [`TypeTag::sign_extend`].
//!
//! # Threading
//!
//! Everything here is single-threaded: handles are `Rc`-based and `!Send`.
//! Subscribers run synchronously inside [`Entry::set`].
#![forbid(unsafe_code)]

pub mod codec;
mod entry;
mod error;
mod namespace;
mod session;
mod store;
pub mod tag;
pub mod update;

pub use codec::{ByteCursor, DumpWriter};
pub use entry::{Entry, EntryValue, Subscription, MAX_NOTIFY_DEPTH};
pub use error::NvsError;
pub use namespace::Namespace;
pub use session::EditSession;
pub use store::{EntryRecord, Store};
pub use tag::{Payload, TypeTag, Value, ValueKind, Width, ALL_TAGS};
pub use update::UpdatePayload;
