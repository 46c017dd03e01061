//! Feature registry: HTTP endpoints for reviewing proposed account features,
//! browsing the tag and score master data, and starting the notebook that
//! generates new candidates.

pub mod api;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
