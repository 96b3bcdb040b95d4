//! Read-only analysis over the per-profession join view.
//!
//! # Responsibility
//! - Rank professions with a confidence metric (`recommendation`).
//! - Compute side-by-side statistics (`comparison`).
//!
//! # Invariants
//! - Never mutates storage and never needs validation.
//! - Multi-profession entry points read the store through one batched join.

pub mod comparison;
pub mod recommendation;
