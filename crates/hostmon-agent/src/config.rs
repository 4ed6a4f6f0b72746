use crate::error::AgentError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Collection endpoint receiving one POST per iteration.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_resource_id")]
    pub resource_id: String,
    /// Use the host name as resource id, falling back to `resource_id`
    /// when the platform does not report one.
    #[serde(default)]
    pub resource_id_from_hostname: bool,
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Root of the procfs mount the sources read from.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

fn default_endpoint() -> String {
    "http://localhost:5000/metrics".to_string()
}

fn default_resource_id() -> String {
    "test".to_string()
}

fn default_collection_interval() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    5
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            resource_id: default_resource_id(),
            resource_id_from_hostname: false,
            collection_interval_secs: default_collection_interval(),
            request_timeout_secs: default_request_timeout(),
            proc_root: default_proc_root(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given (it must exist); otherwise loads `fallback`
    /// when present and uses built-in defaults when it is not.
    pub fn resolve_from(explicit: Option<&str>, fallback: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if fallback.exists() => Self::load(&fallback.to_string_lossy()),
            None => {
                tracing::info!(path = %fallback.display(), "No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn resolve(explicit: Option<&str>) -> anyhow::Result<Self> {
        Self::resolve_from(explicit, Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.collection_interval_secs == 0 {
            return Err(AgentError::Config(
                "collection_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AgentError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.resource_id.trim().is_empty() {
            return Err(AgentError::Config("resource_id must not be empty".to_string()));
        }
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| AgentError::Config(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AgentError::Config(format!(
                "endpoint must be an absolute http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The resource id stamped on every envelope.
    pub fn effective_resource_id(&self) -> String {
        if self.resource_id_from_hostname {
            match sysinfo::System::host_name().filter(|h| !h.trim().is_empty()) {
                Some(host) => return host,
                None => tracing::warn!(
                    fallback = %self.resource_id,
                    "Host name unavailable, using configured resource_id"
                ),
            }
        }
        self.resource_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_fixed_behaviour() {
        let config = AgentConfig::default();
        assert_eq!(config.endpoint, "http://localhost:5000/metrics");
        assert_eq!(config.resource_id, "test");
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_resource_id(), "test");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            endpoint = "http://collector.internal:8080/metrics"
            collection_interval_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://collector.internal:8080/metrics");
        assert_eq!(config.collection_interval_secs, 10);
        assert_eq!(config.resource_id, "test");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn example_config_matches_defaults() {
        let example: AgentConfig =
            toml::from_str(include_str!("../../../config/agent.example.toml")).unwrap();
        let defaults = AgentConfig::default();
        assert_eq!(example.endpoint, defaults.endpoint);
        assert_eq!(example.resource_id, defaults.resource_id);
        assert_eq!(example.collection_interval_secs, defaults.collection_interval_secs);
        assert_eq!(example.request_timeout_secs, defaults.request_timeout_secs);
        assert_eq!(example.proc_root, defaults.proc_root);
    }

    #[test]
    fn validate_rejects_zero_interval_and_timeout() {
        let config = AgentConfig {
            collection_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));

        let config = AgentConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_endpoints() {
        for endpoint in ["localhost:5000/metrics", "ftp://host/metrics", "not a url"] {
            let config = AgentConfig {
                endpoint: endpoint.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{endpoint} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_blank_resource_id() {
        let config = AgentConfig {
            resource_id: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_uses_defaults_when_fallback_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::resolve_from(None, &dir.path().join("agent.toml")).unwrap();
        assert_eq!(config.endpoint, default_endpoint());
    }

    #[test]
    fn resolve_reads_fallback_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "resource_id = \"web-01\"\n").unwrap();
        let config = AgentConfig::resolve_from(None, &path).unwrap();
        assert_eq!(config.resource_id, "web-01");
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AgentConfig::resolve_from(missing.to_str(), &missing).is_err());
    }

    #[test]
    fn invalid_file_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "collection_interval_secs = 0\n").unwrap();
        assert!(AgentConfig::load(path.to_str().unwrap()).is_err());
    }
}
