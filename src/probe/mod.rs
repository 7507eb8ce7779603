//! Parameter probe
//!
//! Diagnostic helper for discovering how an upstream endpoint wants its
//! parameters: candidates are tried in order and the first 2xx answer with
//! a non-empty body wins. Later candidates are not sent.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::http::{HttpClient, RequestMethod, ResponseBody, UpstreamRequest};
use crate::models::Parameters;
use crate::utils::time_async;

/// One parameter set to try
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    #[serde(default)]
    pub params: Parameters,
}

/// Endpoint plus ordered candidates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbePlan {
    pub url: String,

    #[serde(default)]
    pub method: RequestMethod,

    /// Sent with every candidate; candidate values win on conflict
    #[serde(default)]
    pub base_params: Parameters,

    pub candidates: Vec<Candidate>,
}

impl ProbePlan {
    /// Load a plan from YAML or JSON, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read probe plan {}", path.display()))?;

        let plan: ProbePlan = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON probe plan {}", path.display()))?,
            _ => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML probe plan {}", path.display()))?,
        };

        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("Probe plan has no url");
        }
        if self.candidates.is_empty() {
            bail!("Probe plan has no candidates");
        }
        Ok(())
    }

    fn request(&self, candidate: &Candidate) -> UpstreamRequest {
        let mut params = self.base_params.clone();
        params.extend(candidate.params.clone());

        let request = match self.method {
            RequestMethod::Get => UpstreamRequest::get(&self.url),
            RequestMethod::Post => UpstreamRequest::post(&self.url),
        };
        request.params(params.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

/// One sent candidate
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attempt {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: f64,
    pub empty: bool,
}

/// The winning candidate
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hit {
    pub label: String,
    pub status: u16,
    pub body: ResponseBody,
}

/// Every attempt made, plus the hit if there was one
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub attempts: Vec<Attempt>,
    pub hit: Option<Hit>,
}

/// Try candidates in order, stopping at the first useful answer
pub async fn run(plan: &ProbePlan, http: &HttpClient) -> ProbeOutcome {
    let mut attempts = Vec::new();

    for candidate in &plan.candidates {
        let request = plan.request(candidate);
        debug!("Probing {} with {}", plan.url, candidate.label);

        let timed = time_async(http.send(&request)).await;
        match timed.value {
            Ok(response) => {
                let empty = response.body.is_empty();
                attempts.push(Attempt {
                    label: candidate.label.clone(),
                    status: Some(response.status_code),
                    error: None,
                    duration_ms: timed.duration_ms,
                    empty,
                });

                if response.is_success() && !empty {
                    info!("Candidate {} answered HTTP {}", candidate.label, response.status_code);
                    return ProbeOutcome {
                        attempts,
                        hit: Some(Hit {
                            label: candidate.label.clone(),
                            status: response.status_code,
                            body: response.body,
                        }),
                    };
                }
            }
            Err(e) => {
                debug!("Candidate {} failed: {}", candidate.label, e);
                attempts.push(Attempt {
                    label: candidate.label.clone(),
                    status: None,
                    error: Some(e.to_string()),
                    duration_ms: timed.duration_ms,
                    empty: true,
                });
            }
        }
    }

    info!("No candidate out of {} produced data", attempts.len());
    ProbeOutcome { attempts, hit: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{spawn_stub_upstream, unused_addr};

    fn candidate(label: &str, params: &[(&str, &str)]) -> Candidate {
        Candidate {
            label: label.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), (*v).into())).collect(),
        }
    }

    #[test]
    fn test_load_yaml_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(
            &path,
            r#"
url: https://geo.example.org/hobli
base_params:
  lat: 12.97
candidates:
  - label: code
    params:
      code: "1234"
  - label: hoblicode
    params:
      hoblicode: "1234"
      exact: true
"#,
        )
        .unwrap();

        let plan = ProbePlan::load(&path).unwrap();
        assert_eq!(plan.method, RequestMethod::Get);
        assert_eq!(plan.candidates.len(), 2);
        assert_eq!(plan.candidates[1].label, "hoblicode");
        assert_eq!(plan.base_params.len(), 1);
    }

    #[test]
    fn test_plan_without_candidates_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, r#"{"url": "http://x", "candidates": []}"#).unwrap();
        assert!(ProbePlan::load(&path).is_err());
    }

    #[test]
    fn test_candidate_overrides_base_params() {
        let mut plan = ProbePlan {
            url: "http://x/data".into(),
            method: RequestMethod::Get,
            base_params: Parameters::new(),
            candidates: vec![candidate("a", &[("code", "2")])],
        };
        plan.base_params.insert("code".into(), "1".into());

        let request = plan.request(&plan.candidates[0]);
        assert_eq!(
            request.parameters,
            vec![("code".to_string(), crate::models::ParamValue::from("2"))]
        );
    }

    #[tokio::test]
    async fn test_post_plan_sends_typed_json() {
        let app = axum::Router::new().route(
            "/zoning",
            axum::routing::post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                axum::Json(serde_json::json!({ "received": body }))
            }),
        );
        let addr = crate::testutil::spawn(app).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(
            &path,
            format!(
                r#"
url: http://{addr}/zoning
method: POST
candidates:
  - label: gps
    params:
      Gps_Lat: 12.97
      ID: 1
      exact: true
      zone: "R1"
"#
            ),
        )
        .unwrap();

        let plan = ProbePlan::load(&path).unwrap();
        let outcome = run(&plan, &HttpClient::new().unwrap()).await;

        let hit = outcome.hit.unwrap();
        let ResponseBody::Json(body) = hit.body else {
            panic!("expected a JSON answer");
        };
        assert_eq!(
            body["received"],
            serde_json::json!({"Gps_Lat": 12.97, "ID": 1, "exact": true, "zone": "R1"})
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_non_empty_answer() {
        let stub = spawn_stub_upstream().await;
        let base = stub.base_url();
        let http = HttpClient::new().unwrap();

        let empty = ProbePlan {
            url: format!("{base}/empty/data"),
            method: RequestMethod::Get,
            base_params: Parameters::new(),
            candidates: vec![candidate("first", &[("a", "1")])],
        };
        let outcome = run(&empty, &http).await;
        assert!(outcome.hit.is_none());
        assert!(outcome.attempts[0].empty);
        assert_eq!(outcome.attempts[0].status, Some(200));

        let plan = ProbePlan {
            url: format!("{base}/statistics"),
            method: RequestMethod::Get,
            base_params: Parameters::new(),
            candidates: vec![
                candidate("winner", &[("code", "1")]),
                candidate("never sent", &[("code", "2")]),
            ],
        };
        let before = stub.hits();
        let outcome = run(&plan, &http).await;

        let hit = outcome.hit.unwrap();
        assert_eq!(hit.label, "winner");
        assert_eq!(hit.status, 200);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(stub.hits() - before, 1);
    }

    #[tokio::test]
    async fn test_errors_and_bad_statuses_move_on() {
        let stub = spawn_stub_upstream().await;
        let http = HttpClient::new().unwrap();

        let plan = ProbePlan {
            url: format!("{}/broken/route", stub.base_url()),
            method: RequestMethod::Get,
            base_params: Parameters::new(),
            candidates: vec![candidate("a", &[]), candidate("b", &[])],
        };
        let outcome = run(&plan, &http).await;
        assert!(outcome.hit.is_none());
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[1].status, Some(503));

        let offline = ProbePlan {
            url: format!("http://{}/data", unused_addr()),
            ..plan
        };
        let outcome = run(&offline, &http).await;
        assert_eq!(outcome.attempts.len(), 2);
        assert!(outcome.attempts.iter().all(|a| a.error.is_some()));
    }
}
