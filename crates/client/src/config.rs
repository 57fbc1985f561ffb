//! Client configuration loader.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use wolf_protocol::{AgentEncoding, Role};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 100;

/// Resolved connection and behavior settings for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Role requested from the arbiter; `none` is sent when unset.
    pub role: Option<Role>,
    /// Overrides the player's own name in NAME replies.
    pub name: Option<String>,
    pub response_timeout_ms: u64,
    /// Promote schema fallbacks and response timeouts to fatal errors.
    pub strict_mode: bool,
    pub agent_encoding: AgentEncoding,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            role: None,
            name: None,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            strict_mode: false,
            agent_encoding: AgentEncoding::Index,
        }
    }
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// # Errors
    /// Returns `ConfigError` for an empty host, port 0 or a zero timeout.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::ConfigError("host must be non-empty".to_string()));
        }
        if self.port == 0 {
            return Err(ClientError::ConfigError("port must be non-zero".to_string()));
        }
        if self.response_timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "response_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load client configuration from a YAML file.
///
/// Missing fields take their defaults.
///
/// # Errors
/// Returns `ConfigError` if the file is missing, empty, not valid YAML, or
/// fails validation.
pub fn load_client_config(config_path: &str) -> Result<ClientConfig, ClientError> {
    let config_file = Path::new(config_path);

    if !config_file.exists() {
        return Err(ClientError::ConfigError(format!(
            "Config file not found: {}",
            config_path
        )));
    }

    let content = std::fs::read_to_string(config_file)?;

    if content.trim().is_empty() {
        return Err(ClientError::ConfigError("Config file is empty".to_string()));
    }

    let config: ClientConfig = serde_yaml::from_str(&content)
        .map_err(|e| ClientError::ConfigError(format!("Invalid YAML: {}", e)))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("client.yaml");
        fs::write(
            &config_file,
            "host: arbiter.local\nport: 10001\nrole: SEER\nname: wolfie\nresponse_timeout_ms: 250\nstrict_mode: true\nagent_encoding: object\n",
        )
        .unwrap();

        let config = load_client_config(config_file.to_str().unwrap()).unwrap();
        assert_eq!(config.host, "arbiter.local");
        assert_eq!(config.port, 10001);
        assert_eq!(config.role, Some(Role::Seer));
        assert_eq!(config.name.as_deref(), Some("wolfie"));
        assert_eq!(config.response_timeout(), Duration::from_millis(250));
        assert!(config.strict_mode);
        assert_eq!(config.agent_encoding, AgentEncoding::Object);
    }

    #[test]
    fn test_missing_fields_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("client.yaml");
        fs::write(&config_file, "port: 12000\n").unwrap();

        let config = load_client_config(config_file.to_str().unwrap()).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 12000);
        assert_eq!(config.role, None);
        assert_eq!(config.response_timeout_ms, DEFAULT_RESPONSE_TIMEOUT_MS);
        assert!(!config.strict_mode);
    }

    #[test]
    fn test_config_file_not_found() {
        let result = load_client_config("/nonexistent/client.yaml");
        match result {
            Err(ClientError::ConfigError(msg)) => assert!(msg.contains("Config file not found")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("client.yaml");
        fs::write(&config_file, "   \n").unwrap();

        match load_client_config(config_file.to_str().unwrap()) {
            Err(ClientError::ConfigError(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("client.yaml");
        fs::write(&config_file, "role: VAMPIRE\n").unwrap();

        match load_client_config(config_file.to_str().unwrap()) {
            Err(ClientError::ConfigError(msg)) => assert!(msg.contains("Invalid YAML")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig {
            port: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            response_timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            host: " ".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(ClientConfig::default().validate().is_ok());
    }
}
