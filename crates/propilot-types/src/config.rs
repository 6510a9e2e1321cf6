//! Configuration loading for the ProPilot gateway.
//!
//! Layered config, later sources override earlier ones:
//! 1. Built-in defaults
//! 2. Config file (~/.config/propilot/config.toml)
//! 3. CLI-specified config file
//! 4. `PROPILOT_*` environment variables (`__` separates nested keys)
//! 5. Well-known unprefixed variables (`VECTOR_DB`, `PINECONE_API_KEY`, ...)
//!
//! CLI flags are applied by the caller after loading.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::VectorBackend;
use crate::error::ConfigError;

/// Unprefixed environment variables and the settings keys they map to.
pub const WELL_KNOWN_ENV_VARS: &[(&str, &str)] = &[
    ("VECTOR_DB", "vector_db"),
    ("PINECONE_API_KEY", "pinecone.api_key"),
    ("PINECONE_ENVIRONMENT", "pinecone.environment"),
    ("AUTH0_DOMAIN", "auth.domain"),
    ("API_IDENTIFIER", "auth.audience"),
    ("AUTH_MODE", "auth.mode"),
];

/// Well-known variables present in `env`. Names only; values may hold secrets.
fn env_override_names(env: &HashMap<String, String>) -> Vec<&'static str> {
    WELL_KNOWN_ENV_VARS
        .iter()
        .map(|(var, _)| *var)
        .filter(|var| env.contains_key(*var))
        .collect()
}

/// Metrics accepted by the managed index API.
const SUPPORTED_METRICS: &[&str] = &["cosine", "euclidean", "dotproduct"];

/// Pinecone backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeSettings {
    /// API key (normally from PINECONE_API_KEY, never written to disk)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Pod environment, e.g. "us-east1-gcp". When unset, serverless is used.
    #[serde(default)]
    pub environment: Option<String>,

    /// Name of the index to open or create
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Dimensionality used when the index has to be created
    #[serde(default = "default_dimension")]
    pub dimension: u32,

    /// Similarity metric used when the index has to be created
    #[serde(default = "default_metric")]
    pub metric: String,

    /// Control plane base URL
    #[serde(default = "default_controller_url")]
    pub controller_url: String,

    /// Serverless cloud (only used without `environment`)
    #[serde(default = "default_cloud")]
    pub cloud: String,

    /// Serverless region (only used without `environment`)
    #[serde(default = "default_region")]
    pub region: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_pinecone_timeout")]
    pub timeout_secs: u64,

    /// Attempts per control plane call before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval between attempts
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_index_name() -> String {
    "propilot-index".to_string()
}

fn default_dimension() -> u32 {
    1536
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_controller_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_pinecone_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            index_name: default_index_name(),
            dimension: default_dimension(),
            metric: default_metric(),
            controller_url: default_controller_url(),
            cloud: default_cloud(),
            region: default_region(),
            timeout_secs: default_pinecone_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Local persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaSettings {
    /// Store directory, relative to the working directory unless absolute
    #[serde(default = "default_chroma_path")]
    pub path: String,
}

fn default_chroma_path() -> String {
    "./chroma_db".to_string()
}

impl Default for ChromaSettings {
    fn default() -> Self {
        Self {
            path: default_chroma_path(),
        }
    }
}

/// How bearer tokens are verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Verify RS256 tokens against the identity provider's JWKS
    #[default]
    Auth0,
    /// Accept any bearer token and return a fixed identity
    Bypass,
}

/// Bearer token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthMode,

    /// Identity provider domain (AUTH0_DOMAIN), e.g. "tenant.eu.auth0.com"
    #[serde(default)]
    pub domain: Option<String>,

    /// Expected audience (API_IDENTIFIER)
    #[serde(default)]
    pub audience: Option<String>,

    /// How long a fetched key set stays fresh
    #[serde(default = "default_jwks_cache_secs")]
    pub jwks_cache_secs: u64,

    /// Timeout for key set requests
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

fn default_jwks_cache_secs() -> u64 {
    600
}

fn default_auth_timeout() -> u64 {
    10
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            domain: None,
            audience: None,
            jwks_cache_secs: default_jwks_cache_secs(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

impl AuthSettings {
    /// Issuer expected in verified tokens.
    pub fn issuer(&self) -> Option<String> {
        self.domain.as_ref().map(|d| format!("https://{}/", d))
    }

    /// Where the identity provider publishes its signing keys.
    pub fn jwks_url(&self) -> Option<String> {
        self.domain
            .as_ref()
            .map(|d| format!("https://{}/.well-known/jwks.json", d))
    }
}

/// WebSocket session limits. Zero disables a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketSettings {
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_max_lifetime() -> u64 {
    3600
}

fn default_max_message_bytes() -> usize {
    1024 * 1024
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Selected vector database backend
    #[serde(default)]
    pub vector_db: VectorBackend,

    /// HTTP listen host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub pinecone: PineconeSettings,

    #[serde(default)]
    pub chroma: ChromaSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub websocket: WebSocketSettings,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vector_db: VectorBackend::default(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            pinecone: PineconeSettings::default(),
            chroma: ChromaSettings::default(),
            auth: AuthSettings::default(),
            websocket: WebSocketSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default sources and the process environment.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_from(cli_config_path, &env)
    }

    /// Load settings against an explicit environment map.
    ///
    /// `VECTOR_DB` is resolved before the rest of the tree so an unknown
    /// backend always surfaces as [`ConfigError::InvalidBackend`].
    pub fn load_from(
        cli_config_path: Option<&str>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "propilot")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("vector_db", VectorBackend::default().as_str())?
            .set_default("http_host", default_http_host())?
            .set_default("http_port", default_http_port() as i64)?
            .set_default("log_level", default_log_level())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // PROPILOT_HTTP_PORT, PROPILOT_PINECONE__INDEX_NAME, ...
        builder = builder.add_source(
            Environment::with_prefix("PROPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        for (var, key) in WELL_KNOWN_ENV_VARS {
            builder = builder.set_override_option(*key, env.get(*var).cloned())?;
        }

        debug!(
            default_config = %default_config_path.display(),
            cli_config = ?cli_config_path,
            env_overrides = ?env_override_names(env),
            "Loading configuration"
        );

        let config = builder.build()?;

        let backend = config.get_string("vector_db")?;
        backend.parse::<VectorBackend>()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pinecone.dimension == 0 {
            return Err(ConfigError::Invalid(
                "pinecone.dimension must be > 0".to_string(),
            ));
        }
        if !SUPPORTED_METRICS.contains(&self.pinecone.metric.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "pinecone.metric must be one of {:?}, got '{}'",
                SUPPORTED_METRICS, self.pinecone.metric
            )));
        }
        if self.pinecone.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "pinecone.max_retries must be >= 1".to_string(),
            ));
        }
        if self.chroma.path.trim().is_empty() {
            return Err(ConfigError::Invalid("chroma.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Expand ~ in the local store path
    pub fn expanded_chroma_path(&self) -> PathBuf {
        if let Some(rest) = self.chroma.path.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.chroma.path)
    }

    /// Settings as JSON with secrets masked, for display.
    pub fn redacted(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(key) = value.pointer_mut("/pinecone/api_key") {
            if !key.is_null() {
                *key = serde_json::Value::String("********".to_string());
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.vector_db, VectorBackend::Chroma);
        assert_eq!(settings.http_port, 8000);
        assert_eq!(settings.pinecone.index_name, "propilot-index");
        assert_eq!(settings.pinecone.dimension, 1536);
        assert_eq!(settings.pinecone.metric, "cosine");
        assert_eq!(settings.chroma.path, "./chroma_db");
        assert_eq!(settings.auth.mode, AuthMode::Auth0);
    }

    #[test]
    fn test_load_with_empty_env_defaults_to_chroma() {
        let settings = Settings::load_from(None, &HashMap::new()).unwrap();
        assert_eq!(settings.vector_db, VectorBackend::Chroma);
        assert_eq!(settings.http_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_load_well_known_vars() {
        let settings = Settings::load_from(
            None,
            &env(&[
                ("VECTOR_DB", "pinecone"),
                ("PINECONE_API_KEY", "pc-secret"),
                ("PINECONE_ENVIRONMENT", "us-east1-gcp"),
                ("AUTH0_DOMAIN", "tenant.auth0.com"),
                ("API_IDENTIFIER", "https://api.propilot.dev"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.vector_db, VectorBackend::Pinecone);
        assert_eq!(settings.pinecone.api_key.as_deref(), Some("pc-secret"));
        assert_eq!(
            settings.pinecone.environment.as_deref(),
            Some("us-east1-gcp")
        );
        assert_eq!(settings.auth.domain.as_deref(), Some("tenant.auth0.com"));
        assert_eq!(
            settings.auth.audience.as_deref(),
            Some("https://api.propilot.dev")
        );
        assert_eq!(
            settings.auth.issuer().as_deref(),
            Some("https://tenant.auth0.com/")
        );
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        for value in ["qdrant", "", "Pinecone"] {
            let err = Settings::load_from(None, &env(&[("VECTOR_DB", value)])).unwrap_err();
            match err {
                ConfigError::InvalidBackend(got) => assert_eq!(got, value),
                other => panic!("expected InvalidBackend, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_prefixed_env_nested_keys() {
        let settings = Settings::load_from(
            None,
            &env(&[
                ("PROPILOT_HTTP_PORT", "9100"),
                ("PROPILOT_PINECONE__INDEX_NAME", "other-index"),
                ("PROPILOT_WEBSOCKET__IDLE_TIMEOUT_SECS", "0"),
                ("PROPILOT_AUTH__MODE", "bypass"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.http_port, 9100);
        assert_eq!(settings.pinecone.index_name, "other-index");
        assert_eq!(settings.websocket.idle_timeout_secs, 0);
        assert_eq!(settings.auth.mode, AuthMode::Bypass);
    }

    #[test]
    fn test_unprefixed_var_overrides_prefixed() {
        let settings = Settings::load_from(
            None,
            &env(&[("PROPILOT_VECTOR_DB", "pinecone"), ("VECTOR_DB", "chroma")]),
        )
        .unwrap();
        assert_eq!(settings.vector_db, VectorBackend::Chroma);
    }

    #[test]
    fn test_config_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propilot.toml");
        std::fs::write(
            &path,
            "vector_db = \"pinecone\"\nhttp_port = 7000\n\n[chroma]\npath = \"/var/lib/propilot\"\n",
        )
        .unwrap();

        let settings =
            Settings::load_from(Some(path.to_str().unwrap()), &HashMap::new()).unwrap();
        assert_eq!(settings.vector_db, VectorBackend::Pinecone);
        assert_eq!(settings.http_port, 7000);
        assert_eq!(settings.chroma.path, "/var/lib/propilot");
    }

    #[test]
    fn test_missing_cli_config_file_fails() {
        let err = Settings::load_from(Some("/nonexistent/propilot.toml"), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.pinecone.metric = "hamming".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        settings.pinecone.metric = "dotproduct".to_string();
        settings.pinecone.dimension = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_override_names_omit_values() {
        let names = env_override_names(&env(&[
            ("PINECONE_API_KEY", "pc-secret"),
            ("VECTOR_DB", "chroma"),
            ("HOME", "/root"),
        ]));
        assert_eq!(names, vec!["VECTOR_DB", "PINECONE_API_KEY"]);
    }

    #[test]
    fn test_redacted_leaves_unset_key_null() {
        let value = Settings::default().redacted().unwrap();
        assert!(value["pinecone"]["api_key"].is_null());
        assert_eq!(value["http_port"], 8000);
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut settings = Settings::default();
        settings.pinecone.api_key = Some("pc-secret".to_string());

        let value = settings.redacted().unwrap();
        assert_eq!(value["pinecone"]["api_key"], "********");
        assert_eq!(value["vector_db"], "chroma");
        assert!(!value.to_string().contains("pc-secret"));
    }

    #[test]
    fn test_expanded_chroma_path_relative() {
        let settings = Settings::default();
        assert_eq!(settings.expanded_chroma_path(), PathBuf::from("./chroma_db"));
    }
}
