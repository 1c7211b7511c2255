use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::{ProviderCredentials, Vendor};
use crate::selector::ProviderDefaults;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_UI_DIR: &str = "web";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STUB_DELAY_MS: u64 = 1000;

/**
 * \brief Base URLs of the upstream vendor APIs.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub gemini: String,
    pub openai: String,
    pub anthropic: String,
    pub openrouter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gemini: "https://generativelanguage.googleapis.com".to_string(),
            openai: "https://api.openai.com".to_string(),
            anthropic: "https://api.anthropic.com".to_string(),
            openrouter: "https://openrouter.ai".to_string(),
        }
    }
}

impl Endpoints {
    /** \brief Points every vendor at the same base, used against local fakes. */
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            gemini: base.clone(),
            openai: base.clone(),
            anthropic: base.clone(),
            openrouter: base,
        }
    }

    pub fn base(&self, vendor: Vendor) -> &str {
        let raw = match vendor {
            Vendor::Gemini => &self.gemini,
            Vendor::OpenAI => &self.openai,
            Vendor::Anthropic => &self.anthropic,
            Vendor::OpenRouter => &self.openrouter,
        };
        raw.trim_end_matches('/')
    }

    fn set(&mut self, vendor: Vendor, base: String) {
        match vendor {
            Vendor::Gemini => self.gemini = base,
            Vendor::OpenAI => self.openai = base,
            Vendor::Anthropic => self.anthropic = base,
            Vendor::OpenRouter => self.openrouter = base,
        }
    }
}

/**
 * \brief How much failure detail the request handler logs.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Diagnostics {
    /** \brief Full error chain and debug representation. */
    #[default]
    Verbose,
    /** \brief Display message only. */
    Terse,
}

impl FromStr for Diagnostics {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" => Ok(Diagnostics::Verbose),
            "terse" => Ok(Diagnostics::Terse),
            other => Err(ConfigError::InvalidValue {
                var: "CHATRELAY_DIAGNOSTICS",
                value: other.to_string(),
            }),
        }
    }
}

/**
 * \brief Process-wide configuration, built once at startup and passed down explicitly.
 */
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /** \brief Listen address, e.g. "127.0.0.1:3000" */
    pub addr: String,
    /** \brief Directory of the static chat UI */
    pub ui_dir: PathBuf,
    /** \brief Default credentials, consulted when a request carries no override */
    pub credentials: ProviderCredentials,
    pub endpoints: Endpoints,
    /** \brief Upper bound for one outbound vendor call */
    pub upstream_timeout: Duration,
    /** \brief Artificial latency of the stub adapter */
    pub stub_delay: Duration,
    pub diagnostics: Diagnostics,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            ui_dir: PathBuf::from(DEFAULT_UI_DIR),
            credentials: ProviderCredentials::default(),
            endpoints: Endpoints::default(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            stub_delay: Duration::from_millis(DEFAULT_STUB_DELAY_MS),
            diagnostics: Diagnostics::default(),
        }
    }
}

impl ServerConfig {
    /**
     * \brief Reads the configuration from process environment variables.
     */
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /**
     * \brief Builds the configuration from an arbitrary variable lookup.
     */
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("CHATRELAY_ADDR") {
            config.addr = addr;
        }
        if let Some(dir) = get("CHATRELAY_UI_DIR") {
            config.ui_dir = PathBuf::from(dir);
        }
        for vendor in Vendor::ALL {
            if let Some(secret) = get(vendor.env_var()) {
                config.credentials.set(vendor, secret);
            }
            let var = format!("CHATRELAY_{}_BASE_URL", vendor.key().to_ascii_uppercase());
            if let Some(base) = get(&var) {
                config.endpoints.set(vendor, base);
            }
        }
        if let Some(raw) = get("CHATRELAY_UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout =
                Duration::from_secs(parse_number("CHATRELAY_UPSTREAM_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("CHATRELAY_STUB_DELAY_MS") {
            config.stub_delay =
                Duration::from_millis(parse_number("CHATRELAY_STUB_DELAY_MS", &raw)?);
        }
        if let Some(raw) = get("CHATRELAY_DIAGNOSTICS") {
            config.diagnostics = raw.parse()?;
        }
        Ok(config)
    }

    /**
     * \brief Builds the read-only defaults handed to the provider selector.
     */
    pub fn provider_defaults(&self) -> Result<ProviderDefaults, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(self.upstream_timeout)
            .build()?;
        Ok(ProviderDefaults {
            credentials: self.credentials.clone(),
            endpoints: self.endpoints.clone(),
            stub_delay: self.stub_delay,
            http,
        })
    }
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
