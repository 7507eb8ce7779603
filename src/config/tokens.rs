//! Upstream credential validation
//!
//! Reports which services have a base URL and an access token. Missing
//! tokens are a warning at startup, never a hard failure.

use serde::Serialize;
use tracing::{info, warn};

use super::AppConfig;
use crate::models::Operation;

/// Configuration state of one service
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub service: Operation,
    pub base_url_set: bool,
    pub token_set: bool,
    /// Masked token preview
    pub token_preview: Option<String>,
    pub essential: bool,
}

/// Token validation report
#[derive(Clone, Debug, Serialize)]
pub struct TokenReport {
    pub services: Vec<ServiceStatus>,
}

impl TokenReport {
    /// Build the report from a resolved configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let services = Operation::all()
            .into_iter()
            .map(|service| {
                let settings = config.services.get(service);
                ServiceStatus {
                    service,
                    base_url_set: settings.base_url.is_some(),
                    token_set: settings.token.is_some(),
                    token_preview: settings.token.as_deref().map(mask_token),
                    essential: true,
                }
            })
            .collect();

        Self { services }
    }

    /// True when every essential service has a token
    pub fn valid(&self) -> bool {
        self.missing_essential().is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.services.iter().filter(|s| s.token_set).count()
    }

    pub fn available(&self) -> Vec<Operation> {
        self.services
            .iter()
            .filter(|s| s.token_set)
            .map(|s| s.service)
            .collect()
    }

    pub fn missing_essential(&self) -> Vec<Operation> {
        self.services
            .iter()
            .filter(|s| s.essential && !s.token_set)
            .map(|s| s.service)
            .collect()
    }

    /// Log one line per service; warnings for missing essentials
    pub fn log(&self) {
        for status in &self.services {
            if !status.base_url_set {
                warn!("{}: no base URL configured", status.service);
            }
            if status.token_set {
                info!("{}: token present", status.service);
            } else if status.essential {
                warn!("{}: access token missing", status.service);
            }
        }
    }

    /// Render as a table
    pub fn format_table(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:<22} {:<10} {:<10} {}\n", "SERVICE", "BASE URL", "TOKEN", "PREVIEW"));
        output.push_str(&format!("{:-<60}\n", ""));
        for status in &self.services {
            output.push_str(&format!(
                "{:<22} {:<10} {:<10} {}\n",
                status.service.name(),
                if status.base_url_set { "✓ set" } else { "✗ missing" },
                if status.token_set { "✓ set" } else { "✗ missing" },
                status.token_preview.as_deref().unwrap_or("")
            ));
        }
        output.push_str(&format!(
            "\nTokens configured: {}/{}  Essential services: {}\n",
            self.total_tokens(),
            self.services.len(),
            if self.valid() { "✓ PASSED" } else { "✗ FAILED" }
        ));
        output
    }
}

/// Show only the first characters of a token
pub(super) fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() > 4 {
        format!("{prefix}…")
    } else {
        "…".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tokens_reported() {
        let mut config = AppConfig::default();
        config.services.geoid.token = Some("abcdef123456".to_string());

        let report = TokenReport::from_config(&config);

        assert!(!report.valid());
        assert_eq!(report.total_tokens(), 1);
        assert_eq!(report.available(), vec![Operation::Geoid]);
        assert_eq!(
            report.missing_essential(),
            vec![Operation::ThematicStatistics, Operation::Routing]
        );
    }

    #[test]
    fn test_all_tokens_valid() {
        let mut config = AppConfig::default();
        for op in Operation::all() {
            config.services.get_mut(op).token = Some("t0k3n-value".to_string());
        }
        let report = TokenReport::from_config(&config);
        assert!(report.valid());
        assert!(report.format_table().contains("✓ PASSED"));
    }

    #[test]
    fn test_mask_token_hides_secret() {
        assert_eq!(mask_token("abcdef123456"), "abcd…");
        assert_eq!(mask_token("abc"), "…");
    }
}
