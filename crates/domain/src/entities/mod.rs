//! Entities - configured monitoring targets

mod stop_filter;

pub use stop_filter::{StopFilterConfig, validate_targets};
