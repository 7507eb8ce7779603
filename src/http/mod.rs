//! HTTP transport module
//!
//! Provides the timed-out reqwest client used for every upstream call.

mod client;

pub use client::{
    HttpClient, RequestMethod, ResponseBody, UpstreamError, UpstreamRequest, DEFAULT_TIMEOUT,
};
