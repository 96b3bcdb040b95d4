//! Flutter-facing bindings over `metiers_core`.

pub mod api;
