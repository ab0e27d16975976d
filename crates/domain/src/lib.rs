//! Domain layer for the MTD bus monitor
//!
//! Contains the configured monitoring targets, their identity keys and the
//! domain errors. No I/O happens in this crate.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
