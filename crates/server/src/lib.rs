//! HTTP surface for the Gondola inventory dashboard backend.

pub mod api;
pub mod metrics;
pub mod sessions;
pub mod state;
