//! Persistence layer for the taxonomy.
//!
//! # Responsibility
//! - Map logical collections onto the key-value store (`collections`).
//! - Own CRUD and the per-profession join (`taxonomy_store`).
//! - Fold legacy single-profession data into the current layout (`legacy`).
//!
//! # Invariants
//! - Read failures recover to empty collections and never surface as errors.
//! - Write failures surface as `StoreError::PersistFailed`, never as panics.

pub mod collections;
pub mod legacy;
pub mod taxonomy_store;
