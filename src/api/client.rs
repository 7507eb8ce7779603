//! Geospatial upstream client
//!
//! Translates domain requests (coordinates plus pass-through parameters)
//! into exactly one upstream GET and the JSON answer into a `QueryResult`.

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{AppConfig, ServicesConfig};
use crate::http::{HttpClient, UpstreamError, UpstreamRequest};
use crate::models::{Coordinates, Operation, Parameters};

/// What a query was about, echoed back in the result
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuerySubject {
    Point {
        coordinates: Coordinates,
    },
    Route {
        origin: Coordinates,
        destination: Coordinates,
    },
}

/// Upstream payload, keyed by operation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Payload {
    #[serde(rename = "statistics")]
    Statistics(Value),
    #[serde(rename = "route")]
    Route(Value),
    #[serde(rename = "geoid_data")]
    GeoidData(Value),
}

impl Payload {
    fn for_operation(operation: Operation, value: Value) -> Self {
        match operation {
            Operation::ThematicStatistics => Payload::Statistics(value),
            Operation::Routing => Payload::Route(value),
            Operation::Geoid => Payload::GeoidData(value),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Payload::Statistics(v) | Payload::Route(v) | Payload::GeoidData(v) => v,
        }
    }
}

/// Successful upstream query
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResult {
    pub timestamp: String,
    #[serde(flatten)]
    pub subject: QuerySubject,
    pub parameters_used: Parameters,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Client for the thematic statistics, routing and geoid services
#[derive(Clone, Debug)]
pub struct GeoClient {
    http: HttpClient,
    services: ServicesConfig,
    token_param: String,
}

impl GeoClient {
    pub fn new(http: HttpClient, services: ServicesConfig, token_param: impl Into<String>) -> Self {
        Self {
            http,
            services,
            token_param: token_param.into(),
        }
    }

    /// Build a client from the resolved configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let http = HttpClient::build(config.timeout(), config.accept_invalid_certs)?;
        Ok(Self::new(http, config.services.clone(), config.token_param.clone()))
    }

    /// Thematic statistics for a point
    pub async fn thematic_statistics(
        &self,
        coordinates: Coordinates,
        parameters: &Parameters,
    ) -> Result<QueryResult, UpstreamError> {
        let base = [("lat", coordinates.lat), ("lng", coordinates.lng)];
        self.query(
            Operation::ThematicStatistics,
            &base,
            parameters,
            QuerySubject::Point { coordinates },
        )
        .await
    }

    /// Route between two points
    pub async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        parameters: &Parameters,
    ) -> Result<QueryResult, UpstreamError> {
        let base = [
            ("origin_lat", origin.lat),
            ("origin_lng", origin.lng),
            ("dest_lat", destination.lat),
            ("dest_lng", destination.lng),
        ];
        self.query(
            Operation::Routing,
            &base,
            parameters,
            QuerySubject::Route {
                origin,
                destination,
            },
        )
        .await
    }

    /// Geoid data for a point
    pub async fn geoid(
        &self,
        coordinates: Coordinates,
        parameters: &Parameters,
    ) -> Result<QueryResult, UpstreamError> {
        let base = [("lat", coordinates.lat), ("lng", coordinates.lng)];
        self.query(
            Operation::Geoid,
            &base,
            parameters,
            QuerySubject::Point { coordinates },
        )
        .await
    }

    /// Thematic statistics or geoid for a point, chosen by `operation`
    pub async fn point_query(
        &self,
        operation: Operation,
        coordinates: Coordinates,
        parameters: &Parameters,
    ) -> Result<QueryResult, UpstreamError> {
        match operation {
            Operation::ThematicStatistics => self.thematic_statistics(coordinates, parameters).await,
            Operation::Geoid => self.geoid(coordinates, parameters).await,
            Operation::Routing => Err(UpstreamError::NotPointQuery(operation.name().to_string())),
        }
    }

    /// Build the upstream request for an operation
    pub fn build_request(
        &self,
        operation: Operation,
        base: &[(&str, f64)],
        parameters: &Parameters,
    ) -> Result<UpstreamRequest, UpstreamError> {
        let service = self.services.get(operation);
        let base_url = service
            .base_url
            .as_deref()
            .ok_or_else(|| UpstreamError::NotConfigured(operation.name().to_string()))?;

        let url = format!("{}{}", base_url.trim_end_matches('/'), operation.path());
        let mut request = UpstreamRequest::get(url)
            .params(base.iter().map(|(k, v)| (*k, *v)))
            .params(parameters.iter().map(|(k, v)| (k.as_str(), v)));

        if let Some(token) = &service.token {
            request = request.param(self.token_param.as_str(), token.as_str());
        }

        Ok(request)
    }

    async fn query(
        &self,
        operation: Operation,
        base: &[(&str, f64)],
        parameters: &Parameters,
        subject: QuerySubject,
    ) -> Result<QueryResult, UpstreamError> {
        let request = self.build_request(operation, base, parameters)?;
        let value = self.http.get_json(&request).await?;
        debug!("{} returned {}", operation, summarize(&value));

        Ok(QueryResult {
            timestamp: Local::now().to_rfc3339(),
            subject,
            parameters_used: parameters.clone(),
            payload: Payload::for_operation(operation, value),
        })
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => format!("{} fields", map.len()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;
    use crate::testutil;
    use serde_json::json;

    fn client_at(base: &str) -> GeoClient {
        let http = HttpClient::with_timeout(std::time::Duration::from_secs(5)).unwrap();
        GeoClient::new(http, ServicesConfig::all_at(base), "token")
    }

    #[test]
    fn test_build_request_order_and_token() {
        let mut services = ServicesConfig::all_at("http://upstream.local/api/");
        services.routing.token = Some("secret".to_string());
        let client = GeoClient::new(HttpClient::new().unwrap(), services, "key");

        let mut params = Parameters::new();
        params.insert("mode".to_string(), ParamValue::from("car"));

        let req = client
            .build_request(
                Operation::Routing,
                &[("origin_lat", 1.5), ("origin_lng", 2.25)],
                &params,
            )
            .unwrap();

        assert_eq!(req.url, "http://upstream.local/api/route");
        let keys: Vec<&str> = req.parameters.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["origin_lat", "origin_lng", "mode", "key"]);
        assert_eq!(req.parameters[3].1, ParamValue::from("secret"));
    }

    #[test]
    fn test_missing_base_url() {
        let client = GeoClient::new(HttpClient::new().unwrap(), ServicesConfig::default(), "token");
        let err = client
            .build_request(Operation::Geoid, &[], &Parameters::new())
            .unwrap_err();
        assert!(matches!(err, UpstreamError::NotConfigured(ref s) if s == "geoid"));
    }

    #[tokio::test]
    async fn test_thematic_statistics_result_shape() {
        let upstream = testutil::spawn_stub_upstream().await;
        let client = client_at(&upstream.base_url());
        let coords = Coordinates::new(12.9716, 77.5946);

        let result = client
            .thematic_statistics(coords, &Parameters::new())
            .await
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert!(value["timestamp"].is_string());
        assert_eq!(value["coordinates"], json!({"lat": 12.9716, "lng": 77.5946}));
        assert_eq!(value["parameters_used"], json!({}));
        assert_eq!(value["statistics"]["query"]["lat"], "12.9716");
        assert_eq!(value["statistics"]["query"]["lng"], "77.5946");
    }

    #[tokio::test]
    async fn test_route_echoes_both_points() {
        let upstream = testutil::spawn_stub_upstream().await;
        let client = client_at(&upstream.base_url());
        let origin = Coordinates::new(12.9716, 77.5946);
        let destination = Coordinates::new(28.6139, 77.2090);

        let result = client
            .route(origin, destination, &Parameters::new())
            .await
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["origin"]["lat"], 12.9716);
        assert_eq!(value["destination"]["lng"], 77.209);
        assert_eq!(value["route"]["query"]["dest_lat"], "28.6139");
        assert!(value.get("coordinates").is_none());
    }

    #[tokio::test]
    async fn test_geoid_passes_extra_parameters() {
        let upstream = testutil::spawn_stub_upstream().await;
        let client = client_at(&upstream.base_url());

        let mut params = Parameters::new();
        params.insert("model".to_string(), ParamValue::from("egm2008"));

        let result = client
            .geoid(Coordinates::new(13.0827, 80.2707), &params)
            .await
            .unwrap();

        assert_eq!(result.payload.value()["query"]["model"], "egm2008");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["parameters_used"]["model"], "egm2008");
        assert!(value["geoid_data"].is_object());
    }

    #[tokio::test]
    async fn test_point_query_dispatch() {
        let upstream = testutil::spawn_stub_upstream().await;
        let client = client_at(&upstream.base_url());
        let here = Coordinates::new(12.9716, 77.5946);

        let err = client
            .point_query(Operation::Routing, here, &Parameters::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::NotPointQuery(ref s) if s == "routing"));
        assert_eq!(upstream.hits(), 0);

        let stats = client
            .point_query(Operation::ThematicStatistics, here, &Parameters::new())
            .await
            .unwrap();
        assert!(matches!(stats.payload, Payload::Statistics(_)));

        let geoid = client
            .point_query(Operation::Geoid, here, &Parameters::new())
            .await
            .unwrap();
        assert!(matches!(geoid.payload, Payload::GeoidData(_)));
        assert_eq!(upstream.hits(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_carries_status() {
        let upstream = testutil::spawn_stub_upstream().await;
        let client = client_at(&format!("{}/broken", upstream.base_url()));

        let err = client
            .geoid(Coordinates::new(0.0, 0.0), &Parameters::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.body().unwrap().contains("maintenance"));
    }
}
