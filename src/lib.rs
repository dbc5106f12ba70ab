//! Streaming assistant chat client for the property-management dashboard.
//!
//! See [`ai`] for the transport and wire formats, [`conversation`] for the
//! message list a view binds to.

pub mod ai;
pub mod config;
pub mod conversation;
pub mod types;
