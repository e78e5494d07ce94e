use std::path::PathBuf;
use std::time::Duration;

use facit_core::DecimalStyle;
use facit_extract::OracleConfig;

/// Process-wide settings, read from the environment exactly once at startup
/// and handed to constructors as explicit values.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ledger_path: PathBuf,
    pub decimal_style: DecimalStyle,
    pub oracle_api_key: Option<String>,
    pub oracle_endpoint: Option<String>,
    pub oracle_model: Option<String>,
    pub oracle_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("FACIT_HOST", "127.0.0.1"),
            port: std::env::var("FACIT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            ledger_path: env_or("FACIT_LEDGER_PATH", "financial_report.csv").into(),
            decimal_style: std::env::var("FACIT_OCR_DECIMAL_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            oracle_api_key: std::env::var("OPENAI_API_KEY").ok(),
            oracle_endpoint: std::env::var("FACIT_ORACLE_ENDPOINT").ok(),
            oracle_model: std::env::var("FACIT_ORACLE_MODEL").ok(),
            oracle_timeout: std::env::var("FACIT_ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60)),
        }
    }

    /// None when the credential is absent; the server then answers
    /// processing requests with a configuration error instead of calling out.
    pub fn oracle_config(&self) -> Option<OracleConfig> {
        let key = self.oracle_api_key.as_deref()?;
        let mut config = OracleConfig::new(key);
        if let Some(endpoint) = &self.oracle_endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.oracle_model {
            config.model = model.clone();
        }
        config.timeout = self.oracle_timeout;
        Some(config)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
