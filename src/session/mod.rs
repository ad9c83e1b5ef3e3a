//! Persisted ambient session.

pub mod record;
pub mod store;
