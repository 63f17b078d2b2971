// crates/toolgate-mcp/src/config.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, toolgate-schema
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! fail-closed validation. The file declares the served identities, the
//! exposed tools (the data-driven registration that replaces runtime
//! introspection), and an optional message catalog for tool and field
//! descriptions. Missing or invalid configuration prevents the gateway
//! from starting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use toolgate_schema::CatalogResolver;
use toolgate_schema::TypeShape;

use crate::identity::Identity;
use crate::identity::StaticIdentityProvider;
use crate::openapi::DEFAULT_OPENAPI_TIMEOUT_SECS;
use crate::registry::OperationDescriptor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Default bind address for the gateway server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8111";
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default protocol endpoint path.
pub const DEFAULT_MCP_PATH: &str = "/mcp";
/// Maximum number of configured identities.
pub(crate) const MAX_IDENTITIES: usize = 256;
/// Maximum length of an access key or secret key.
pub(crate) const MAX_KEY_LENGTH: usize = 256;
/// Maximum number of configured tools.
pub(crate) const MAX_TOOLS: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config at {path}: {message}")]
    Read {
        /// Path that failed to load.
        path: String,
        /// Underlying failure description.
        message: String,
    },
    /// The config file exceeds the size limit.
    #[error("config file at {path} is {size} bytes (limit {limit})")]
    TooLarge {
        /// Path that failed to load.
        path: String,
        /// Actual file size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        limit: u64,
    },
    /// The config file could not be parsed.
    #[error("failed to parse config at {path}: {message}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying failure description.
        message: String,
    },
    /// The configuration is structurally invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Toolgate gateway configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolgateConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway behavior configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Served identities (flat accesskey-to-secret mapping).
    #[serde(default)]
    pub identities: Vec<IdentityConfig>,
    /// Exposed tools, registered declaratively.
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    /// Message catalog for tool and field descriptions.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum allowed request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Gateway behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Protocol endpoint path.
    #[serde(default = "default_mcp_path")]
    pub mcp_path: String,
    /// Path prefix under which requests must be signed.
    #[serde(default = "default_mcp_path")]
    pub protected_prefix: String,
    /// Timeout in seconds for forwarded backend calls.
    #[serde(default = "default_openapi_timeout_secs")]
    pub openapi_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mcp_path: default_mcp_path(),
            protected_prefix: default_mcp_path(),
            openapi_timeout_secs: default_openapi_timeout_secs(),
        }
    }
}

/// One served identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Access key identifier.
    pub access_key: String,
    /// Shared secret for the access key.
    pub secret_key: String,
    /// Attributes injected into the request context on successful
    /// verification.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// One exposed tool registered declaratively.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Explicit tool name; absent falls back to `method_id`.
    #[serde(default)]
    pub name: Option<String>,
    /// Identifier of the backing operation.
    pub method_id: String,
    /// Label key resolved into the tool description.
    pub label: String,
    /// Base path of the owning API group.
    #[serde(default)]
    pub base_path: String,
    /// Relative path of the operation.
    pub path: String,
    /// Structured input shape; absent means no structured arguments.
    #[serde(default)]
    pub input: Option<TypeShape>,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default protocol endpoint path.
fn default_mcp_path() -> String {
    DEFAULT_MCP_PATH.to_string()
}

/// Default forwarding timeout in seconds.
const fn default_openapi_timeout_secs() -> u64 {
    DEFAULT_OPENAPI_TIMEOUT_SECS
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ToolgateConfig {
    /// Loads configuration from the given path, the `TOOLGATE_CONFIG`
    /// environment variable, or the default filename, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(
            || env::var(CONFIG_ENV_VAR).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from),
            Path::to_path_buf,
        );
        let shown = path.display().to_string();

        let size = fs::metadata(&path)
            .map_err(|err| ConfigError::Read {
                path: shown.clone(),
                message: err.to_string(),
            })?
            .len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: shown,
                size,
                limit: MAX_CONFIG_FILE_SIZE,
            });
        }

        let text = fs::read_to_string(&path).map_err(|err| ConfigError::Read {
            path: shown.clone(),
            message: err.to_string(),
        })?;
        let config: Self = toml::from_str(&text).map_err(|err| ConfigError::Parse {
            path: shown,
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration; failures are fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.server.bind)))?;
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be positive".to_string()));
        }
        if !self.gateway.mcp_path.starts_with('/') {
            return Err(ConfigError::Invalid("mcp_path must start with '/'".to_string()));
        }
        if !self.gateway.protected_prefix.starts_with('/') {
            return Err(ConfigError::Invalid("protected_prefix must start with '/'".to_string()));
        }
        if self.gateway.openapi_timeout_secs == 0 {
            return Err(ConfigError::Invalid("openapi_timeout_secs must be positive".to_string()));
        }

        if self.identities.len() > MAX_IDENTITIES {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_IDENTITIES} identities are supported"
            )));
        }
        let mut seen_keys = BTreeSet::new();
        for identity in &self.identities {
            if identity.access_key.trim().is_empty() {
                return Err(ConfigError::Invalid("identity access_key must not be blank".to_string()));
            }
            if identity.secret_key.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "identity '{}' secret_key must not be blank",
                    identity.access_key
                )));
            }
            if identity.access_key.len() > MAX_KEY_LENGTH
                || identity.secret_key.len() > MAX_KEY_LENGTH
            {
                return Err(ConfigError::Invalid(format!(
                    "identity '{}' keys exceed {MAX_KEY_LENGTH} bytes",
                    identity.access_key
                )));
            }
            if !seen_keys.insert(identity.access_key.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate identity access_key '{}'",
                    identity.access_key
                )));
            }
        }

        if self.tools.len() > MAX_TOOLS {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_TOOLS} tools are supported"
            )));
        }
        for tool in &self.tools {
            if tool.method_id.trim().is_empty() {
                return Err(ConfigError::Invalid("tool method_id must not be blank".to_string()));
            }
            if tool.label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "tool '{}' label must not be blank",
                    tool.method_id
                )));
            }
            if tool.path.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "tool '{}' path must not be blank",
                    tool.method_id
                )));
            }
        }
        Ok(())
    }

    /// Builds the operation descriptors registered with the tool registry.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationDescriptor> {
        self.tools
            .iter()
            .map(|tool| OperationDescriptor {
                name: tool.name.clone(),
                method_id: tool.method_id.clone(),
                label_key: tool.label.clone(),
                base_path: tool.base_path.clone(),
                method_path: tool.path.clone(),
                input: tool.input.clone(),
            })
            .collect()
    }

    /// Builds the identity provider backing the session gate.
    #[must_use]
    pub fn identity_provider(&self) -> StaticIdentityProvider {
        StaticIdentityProvider::new(self.identities.iter().map(|identity| {
            (identity.access_key.clone(), Identity {
                secret_key: identity.secret_key.clone(),
                attributes: identity.attributes.clone(),
            })
        }))
    }

    /// Builds the message resolver backing descriptions.
    #[must_use]
    pub fn message_resolver(&self) -> CatalogResolver {
        CatalogResolver::new(self.messages.clone())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
