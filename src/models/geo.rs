//! Geospatial request models
//!
//! Coordinates, pass-through parameters and the upstream operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A WGS84 point in decimal degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Scalar value of an extra upstream parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl ParamValue {
    /// Value as it appears in a JSON body
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Number(n) => serde_json::Value::Number(n.clone()),
            ParamValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&ParamValue> for ParamValue {
    fn from(value: &ParamValue) -> Self {
        value.clone()
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Number(n.into())
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        match serde_json::Number::from_f64(n) {
            Some(n) => ParamValue::Number(n),
            None => ParamValue::Text(n.to_string()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Extra upstream parameters, passed through verbatim
pub type Parameters = BTreeMap<String, ParamValue>;

/// Parse a `key=value` pair as given on the command line
pub fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((key.to_string(), ParamValue::Text(value.trim().to_string())))
}

/// Upstream operations exposed by the client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ThematicStatistics,
    Routing,
    Geoid,
}

impl Operation {
    pub fn all() -> [Operation; 3] {
        [Operation::ThematicStatistics, Operation::Routing, Operation::Geoid]
    }

    /// Name used in the call log and in result maps
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ThematicStatistics => "thematic_statistics",
            Operation::Routing => "routing",
            Operation::Geoid => "geoid",
        }
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            Operation::ThematicStatistics => "Thematic Statistics",
            Operation::Routing => "Routing",
            Operation::Geoid => "Geoid",
        }
    }

    /// Path appended to the service base URL
    pub fn path(&self) -> &'static str {
        match self {
            Operation::ThematicStatistics => "/statistics",
            Operation::Routing => "/route",
            Operation::Geoid => "/data",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "thematic_statistics" | "thematic" | "statistics" | "stats" => {
                Some(Operation::ThematicStatistics)
            }
            "routing" | "route" => Some(Operation::Routing),
            "geoid" => Some(Operation::Geoid),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
