//! Value Objects - Immutable, identity-less domain primitives

mod entry_id;
mod target_key;

pub use entry_id::EntryId;
pub use target_key::{ALL, TargetKey};
