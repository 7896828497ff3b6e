//! Domain entities for HostSync.
//!
//! Pure business data with no infrastructure dependencies: the canonical
//! record types the state layer caches, and the projection functions that
//! derive the views the UI actually renders.  Outer layers (stores, event
//! wiring, the demo binary) depend on this module; it depends on nothing but
//! serde and chrono.

/// Canonical record types.
pub mod records;

/// Pure derived views recomputed from store caches.
pub mod projections;
