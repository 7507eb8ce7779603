//! Data models
//!
//! Request types, call log records and the error taxonomy.

mod error;
mod geo;
mod record;

pub use error::ApiError;
pub use geo::{parse_param, Coordinates, Operation, ParamValue, Parameters};
pub use record::{CallRecord, Outcome};
