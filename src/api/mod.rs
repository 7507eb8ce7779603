//! Upstream geospatial API client

mod client;

pub use client::{GeoClient, QueryResult};
