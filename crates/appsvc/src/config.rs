//! Service configuration

use anyhow::{Context, Result};
use appsvc_core::StaticConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration read from `APPSVC_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name used in structured log records
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP listen port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Orchestration service base URL
    pub jukeboxsvc_url: String,

    /// JSON catalog seed file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// JSON array of data centers, West to East
    pub data_centers: String,

    /// JSON object of runner name to runner configuration
    pub runners_conf: String,

    /// JSON object of streaming daemon hardware requirements
    #[serde(default = "default_streamd_reqs")]
    pub streamd_reqs: String,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

fn default_streamd_reqs() -> String {
    "{}".to_string()
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("APPSVC"))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid or incomplete APPSVC_* configuration")
    }

    /// Parse the static launch configuration
    pub fn static_config(&self) -> Result<StaticConfig> {
        StaticConfig::from_json(&self.data_centers, &self.runners_conf, &self.streamd_reqs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("APPSVC").source(Some(source))
    }

    #[test]
    fn test_load_with_defaults() {
        let config = ServiceConfig::from_source(env(&[
            ("APPSVC_JUKEBOXSVC_URL", "http://jukeboxsvc:8000"),
            ("APPSVC_DATA_CENTERS", r#"["us-west-1","eu-central-1"]"#),
            ("APPSVC_RUNNERS_CONF", r#"{"wine":{"ver":"9.0","window_system":"x11"}}"#),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.catalog_path, PathBuf::from("catalog.json"));
        assert_eq!(config.streamd_reqs, "{}");

        let static_config = config.static_config().unwrap();
        assert_eq!(static_config.known_dcs, vec!["us-west-1", "eu-central-1"]);
        tokio_test::assert_ok!(static_config.runner("wine"));
    }

    #[test]
    fn test_port_override() {
        let config = ServiceConfig::from_source(env(&[
            ("APPSVC_JUKEBOXSVC_URL", "http://jukeboxsvc:8000"),
            ("APPSVC_DATA_CENTERS", "[]"),
            ("APPSVC_RUNNERS_CONF", "{}"),
            ("APPSVC_API_PORT", "9090"),
        ]))
        .unwrap();
        assert_eq!(config.api_port, 9090);
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let result = ServiceConfig::from_source(env(&[("APPSVC_DATA_CENTERS", "[]")]));
        tokio_test::assert_err!(result);
    }

    #[test]
    fn test_malformed_static_config_fails() {
        let config = ServiceConfig::from_source(env(&[
            ("APPSVC_JUKEBOXSVC_URL", "http://jukeboxsvc:8000"),
            ("APPSVC_DATA_CENTERS", "us-west-1"),
            ("APPSVC_RUNNERS_CONF", "{}"),
        ]))
        .unwrap();
        assert!(config.static_config().is_err());
    }
}
