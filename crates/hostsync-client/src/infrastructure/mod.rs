//! Infrastructure layer for the HostSync client.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hostsync_core`, but must not be imported by them.
//!
//! # Sub-modules
//!
//! - **`events`** – The listener registry: deduplicated local subscriptions,
//!   multiplexed backend push subscriptions, scoped RAII cleanup.
//!
//! - **`memory`** – A complete in-process [`crate::application::bridge::BackendBridge`]
//!   implementation.  Integration tests and the demo binary run against it;
//!   the shipping application swaps in the real privileged backend.
//!
//! - **`settings`** – TOML-persisted client settings (log level, startup
//!   refresh behavior).
//!
//! - **`ui_bridge`** – The assembly handed to the visual layer: the store
//!   set, snapshot DTOs, and the uniform result envelope.

pub mod events;
pub mod memory;
pub mod settings;
pub mod ui_bridge;
