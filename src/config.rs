use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "RISKLENS_BACKEND_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Backend Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `POST` target for on-demand analysis.
    pub fn analyze_url(&self) -> eyre::Result<reqwest::Url> {
        let base = base_dir_url(&self.base_url)?;
        base.join("analyze")
            .map_err(|e| eyre::eyre!("Invalid analyze URL under '{}': {}", self.base_url, e))
    }

    /// WebSocket URL of the live feed: same host, `ws`/`wss` scheme.
    pub fn stream_url(&self, path: &str) -> eyre::Result<reqwest::Url> {
        let mut url = base_dir_url(&self.base_url)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| eyre::eyre!("Cannot derive a {} URL from '{}'", scheme, self.base_url))?;
        url.join(path.trim_start_matches('/'))
            .map_err(|e| eyre::eyre!("Invalid stream path '{}': {}", path, e))
    }
}

fn parse_base_url(raw: &str) -> eyre::Result<reqwest::Url> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| eyre::eyre!("Invalid backend URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre::eyre!(
            "Backend URL '{}' must use http or https, got '{}'",
            raw,
            other
        )),
    }
}

/// Base URL with a trailing `/` so relative joins keep any path prefix.
fn base_dir_url(raw: &str) -> eyre::Result<reqwest::Url> {
    let mut url = parse_base_url(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ============================================================
// Stream Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_stream_path")]
    pub path: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_stream_path(),
            capacity: default_capacity(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stream_path() -> String {
    "/ws/stream".to_string()
}

fn default_capacity() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    5
}

// ============================================================
// Mock Feed Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct MockConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_mock_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_capacity")]
    pub initial_count: usize,
    #[serde(default = "default_amount_ceiling")]
    pub amount_ceiling: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_mock_interval_ms(),
            initial_count: default_capacity(),
            amount_ceiling: default_amount_ceiling(),
        }
    }
}

fn default_mock_interval_ms() -> u64 {
    2000
}

fn default_amount_ceiling() -> f64 {
    50_000.0
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent,
    /// then apply the environment override and validate.
    pub fn load(path: &str) -> eyre::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
            Self::from_toml(&content)
                .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?
        } else {
            tracing::info!(path, "Config file not found, using defaults");
            Config::default()
        };

        config.apply_env_override(std::env::var(BACKEND_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env_override(&mut self, backend_url: Option<String>) {
        if let Some(url) = backend_url.filter(|u| !u.trim().is_empty()) {
            tracing::info!(%url, "Backend URL overridden from {}", BACKEND_URL_ENV);
            self.backend.base_url = url.trim().to_string();
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        parse_base_url(&self.backend.base_url)?;
        if self.stream.capacity == 0 {
            return Err(eyre::eyre!("stream.capacity must be at least 1"));
        }
        if !self.stream.path.starts_with('/') {
            return Err(eyre::eyre!(
                "stream.path '{}' must start with '/'",
                self.stream.path
            ));
        }
        let reconnect = &self.stream.reconnect;
        if reconnect.initial_delay_ms == 0 || reconnect.initial_delay_ms > reconnect.max_delay_ms {
            return Err(eyre::eyre!(
                "stream.reconnect delays must satisfy 0 < initial_delay_ms ({}) <= max_delay_ms ({})",
                reconnect.initial_delay_ms,
                reconnect.max_delay_ms
            ));
        }
        if self.mock.interval_ms == 0 {
            return Err(eyre::eyre!("mock.interval_ms must be positive"));
        }
        if !(self.mock.amount_ceiling.is_finite() && self.mock.amount_ceiling > 0.0) {
            return Err(eyre::eyre!(
                "mock.amount_ceiling must be a positive number, got {}",
                self.mock.amount_ceiling
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[backend]
base_url = "https://risk.example.com"

[stream]
capacity = 16

[stream.reconnect]
max_retries = 2

[mock]
enabled = false
"#;

        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.backend.base_url, "https://risk.example.com");
        assert_eq!(config.backend.request_timeout_ms, 10_000); // default
        assert_eq!(config.stream.capacity, 16);
        assert_eq!(config.stream.path, "/ws/stream"); // default
        assert_eq!(config.stream.reconnect.max_retries, 2);
        assert_eq!(config.stream.reconnect.initial_delay_ms, 500); // default
        assert!(!config.mock.enabled);
        assert_eq!(config.mock.interval_ms, 2000); // default
        assert_eq!(config.api.port, 3000); // default
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8001");
        assert_eq!(config.stream.capacity, 8);
        assert_eq!(config.mock.initial_count, 8);
        assert_eq!(config.mock.amount_ceiling, 50_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/risklens-config.toml").unwrap();
        assert_eq!(config.stream.capacity, 8);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env_override(Some("  http://10.0.0.5:9000 ".to_string()));
        assert_eq!(config.backend.base_url, "http://10.0.0.5:9000");

        config.apply_env_override(Some("".to_string()));
        assert_eq!(config.backend.base_url, "http://10.0.0.5:9000");

        config.apply_env_override(None);
        assert_eq!(config.backend.base_url, "http://10.0.0.5:9000");
    }

    #[test]
    fn test_derived_urls() {
        let backend = BackendConfig::default();
        assert_eq!(
            backend.analyze_url().unwrap().as_str(),
            "http://127.0.0.1:8001/analyze"
        );
        assert_eq!(
            backend.stream_url("/ws/stream").unwrap().as_str(),
            "ws://127.0.0.1:8001/ws/stream"
        );

        let secure = BackendConfig {
            base_url: "https://risk.example.com".to_string(),
            request_timeout_ms: 1000,
        };
        assert_eq!(
            secure.stream_url("/ws/stream").unwrap().as_str(),
            "wss://risk.example.com/ws/stream"
        );
    }

    #[test]
    fn test_derived_urls_keep_path_prefix() {
        for base_url in ["https://gw.example.com/risk", "https://gw.example.com/risk/"] {
            let backend = BackendConfig {
                base_url: base_url.to_string(),
                request_timeout_ms: 1000,
            };
            assert_eq!(
                backend.analyze_url().unwrap().as_str(),
                "https://gw.example.com/risk/analyze"
            );
            assert_eq!(
                backend.stream_url("/ws/stream").unwrap().as_str(),
                "wss://gw.example.com/risk/ws/stream"
            );
            assert_eq!(
                backend.stream_url("ws/stream").unwrap().as_str(),
                "wss://gw.example.com/risk/ws/stream"
            );
        }
    }

    #[test]
    fn test_validate_bad_backend_url() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://127.0.0.1".to_string();
        assert!(config.validate().is_err());

        config.backend.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = Config::default();
        config.stream.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_reconnect_delays() {
        let mut config = Config::default();
        config.stream.reconnect.initial_delay_ms = 60_000;
        config.stream.reconnect.max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_amount_ceiling() {
        let mut config = Config::default();
        config.mock.amount_ceiling = 0.0;
        assert!(config.validate().is_err());
    }
}
