//! Application layer for the HostSync client.
//!
//! # What lives here?
//!
//! - **`bridge`** – The [`bridge::BackendBridge`] port: every asynchronous
//!   call the privileged backend answers, plus its push-notification hooks.
//!   Infrastructure provides the implementations; this layer only holds the
//!   trait.
//!
//! - **`ops`** – The async-operation policies shared by every store action:
//!   loading-flag lifecycle, reload-after-success, and log-then-propagate
//!   error handling.
//!
//! - **`stores`** – The three entity stores (configurations, backups, remote
//!   sources).  Each owns an authoritative cache that is only ever replaced
//!   wholesale by a full reload.
//!
//! - **`gate`** – The admin capability gate: one flag answering "may this
//!   process write the system hosts file right now?".

pub mod bridge;
pub mod gate;
pub mod ops;
pub mod stores;
