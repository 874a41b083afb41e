//! Config file loading.
//!
//! Resolution (later wins):
//!   1. built-in defaults
//!   2. `config.toml` (`<config dir>/upskill/config.toml` unless given)
//!   3. `UPSKILL_ENDPOINT` environment variable
//!   4. command-line flags (applied by the binary)
//!
//! ```toml
//! endpoint = "http://localhost:5000/api/chat"
//! data_dir = "/home/me/.local/share/upskill"
//! domain = "business"
//! request_timeout_secs = 30
//! ```

use crate::domain::SkillDomain;
use crate::{Result, UpskillConfig, UpskillError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENDPOINT_ENV: &str = "UPSKILL_ENDPOINT";

#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    endpoint: Option<String>,
    data_dir: Option<PathBuf>,
    domain: Option<SkillDomain>,
    request_timeout_secs: Option<u64>,
}

/// `<config dir>/upskill/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("upskill").join("config.toml"))
}

/// `<data dir>/upskill`, falling back to `./.upskill`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("upskill"))
        .unwrap_or_else(|| PathBuf::from(".upskill"))
}

/// Resolve the configuration from defaults, file and environment.
///
/// An explicitly given `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<UpskillConfig> {
    let mut config = UpskillConfig::new(default_data_dir());

    let file = match path {
        Some(p) if !p.exists() => {
            return Err(UpskillError::Config(format!(
                "config file {} does not exist",
                p.display()
            )));
        }
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    if let Some(file) = file {
        let content = std::fs::read_to_string(&file)?;
        config = apply_toml(config, &content)
            .map_err(|e| UpskillError::Config(format!("{}: {}", file.display(), e)))?;
        info!("Loaded config from {}", file.display());
    }

    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.trim().is_empty() {
            debug!("Endpoint overridden by {}", ENDPOINT_ENV);
            config = config.with_endpoint(endpoint.trim());
        }
    }

    Ok(config)
}

fn apply_toml(mut config: UpskillConfig, content: &str) -> std::result::Result<UpskillConfig, toml::de::Error> {
    let parsed: ConfigToml = toml::from_str(content)?;

    if let Some(endpoint) = parsed.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(data_dir) = parsed.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(domain) = parsed.domain {
        config = config.with_initial_domain(domain);
    }
    if let Some(secs) = parsed.request_timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_ENDPOINT;
    use tempfile::TempDir;

    #[test]
    fn test_apply_toml_overrides() {
        let base = UpskillConfig::new(PathBuf::from("/tmp/upskill"));
        let config = apply_toml(
            base,
            r#"
endpoint = "http://example.test/api/chat"
domain = "data-science"
request_timeout_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "http://example.test/api/chat");
        assert_eq!(config.initial_domain, SkillDomain::DataScience);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/upskill"));
    }

    #[test]
    fn test_empty_toml_keeps_defaults() {
        let config = apply_toml(UpskillConfig::new(PathBuf::from("/d")), "").unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.initial_domain, SkillDomain::Both);
    }

    #[test]
    fn test_bad_domain_is_rejected() {
        let result = apply_toml(UpskillConfig::new(PathBuf::from("/d")), r#"domain = "marketing""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_config(Some(&temp_dir.path().join("nope.toml")));
        assert!(matches!(result, Err(UpskillError::Config(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/srv/upskill\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/upskill"));
    }
}
