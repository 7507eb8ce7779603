//! HTTP service
//!
//! Forwards geospatial queries to the upstream client and reports how long
//! each call took.

mod handlers;
mod router;
mod types;

pub use router::{serve, AppState};
