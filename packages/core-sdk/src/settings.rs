use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::models::{ProviderCredentials, Vendor};

/** \brief Fixed key of the settings blob. */
pub const SETTINGS_KEY: &str = "chatbot-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(anyhow!("unknown theme: {}", other)),
        }
    }
}

/**
 * \brief Keys entered by the user; empty string means not set.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub gemini: String,
    pub openai: String,
    pub anthropic: String,
    pub openrouter: String,
    pub grok: String,
    pub deepseek: String,
}

impl ApiKeys {
    pub const NAMES: [&'static str; 6] =
        ["gemini", "openai", "anthropic", "openrouter", "grok", "deepseek"];

    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "gemini" => &self.gemini,
            "openai" => &self.openai,
            "anthropic" => &self.anthropic,
            "openrouter" => &self.openrouter,
            "grok" => &self.grok,
            "deepseek" => &self.deepseek,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn set(&mut self, name: &str, key: impl Into<String>) -> Result<()> {
        let slot = match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => &mut self.gemini,
            "openai" => &mut self.openai,
            "anthropic" => &mut self.anthropic,
            "openrouter" => &mut self.openrouter,
            "grok" => &mut self.grok,
            "deepseek" => &mut self.deepseek,
            other => return Err(anyhow!("unknown provider key: {}", other)),
        };
        *slot = key.into();
        Ok(())
    }

    /**
     * \brief Per-request overrides for the vendors that have an adapter.
     */
    pub fn credentials(&self) -> ProviderCredentials {
        let mut creds = ProviderCredentials::new();
        for vendor in Vendor::ALL {
            if let Some(key) = self.get(vendor.key()) {
                creds.set(vendor, key);
            }
        }
        creds
    }
}

/**
 * \brief Client-local preferences: theme and API keys.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    #[serde(rename = "apiKeys")]
    pub api_keys: ApiKeys,
}

impl Settings {
    /**
     * \brief Decodes a stored blob; missing fields take their defaults.
     */
    pub fn from_blob(blob: &str) -> Result<Self> {
        Ok(serde_json::from_str(blob)?)
    }

    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/**
 * \brief Settings persisted as one JSON blob under a fixed key.
 * \details Load once at startup, save after every mutation.
 */
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: db::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::migrate(&conn)?;
        Ok(Self { conn })
    }

    /**
     * \brief Reads the blob; absent or malformed blobs fall back to defaults.
     */
    pub fn load(&self) -> Settings {
        let blob = match db::get_value(&self.conn, SETTINGS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Settings::default(),
            Err(err) => {
                tracing::warn!("failed to read settings: {}", err);
                return Settings::default();
            }
        };
        Settings::from_blob(&blob).unwrap_or_else(|err| {
            tracing::warn!("failed to parse settings, using defaults: {}", err);
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        db::set_value(&self.conn, SETTINGS_KEY, &settings.to_blob()?)
    }

    pub fn update_api_key(&self, name: &str, key: &str) -> Result<Settings> {
        let mut settings = self.load();
        settings.api_keys.set(name, key)?;
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<Settings> {
        let mut settings = self.load();
        settings.theme = theme;
        self.save(&settings)?;
        Ok(settings)
    }

    #[cfg(test)]
    fn write_raw(&self, blob: &str) {
        db::set_value(&self.conn, SETTINGS_KEY, blob).expect("write raw blob");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_blob_gives_defaults() {
        let store = SettingsStore::in_memory().expect("store");
        let settings = store.load();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.api_keys, ApiKeys::default());
    }

    #[test]
    fn test_malformed_blob_gives_defaults() {
        let store = SettingsStore::in_memory().expect("store");
        store.write_raw("{not json");
        assert_eq!(store.load(), Settings::default());
        store.write_raw(r#"{"theme":"sepia"}"#);
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_partial_blob_merges_over_defaults() {
        let store = SettingsStore::in_memory().expect("store");
        store.write_raw(r#"{"apiKeys":{"openai":"sk-1"}}"#);
        let settings = store.load();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.api_keys.openai, "sk-1");
        assert_eq!(settings.api_keys.gemini, "");
    }

    #[test]
    fn test_mutations_are_saved_immediately() {
        let store = SettingsStore::in_memory().expect("store");
        store.set_theme(Theme::Light).expect("theme");
        store.update_api_key("anthropic", "ak-1").expect("key");
        store.update_api_key("grok", "xai-1").expect("key");

        let settings = store.load();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.api_keys.anthropic, "ak-1");
        assert_eq!(settings.api_keys.grok, "xai-1");

        assert!(store.update_api_key("cohere", "x").is_err());
    }

    #[test]
    fn test_blob_uses_camel_case_keys() {
        let blob = Settings::default().to_blob().expect("blob");
        let v: serde_json::Value = serde_json::from_str(&blob).expect("json");
        assert_eq!(v["theme"], "dark");
        assert!(v["apiKeys"].is_object());
        assert_eq!(v["apiKeys"]["deepseek"], "");
    }

    #[test]
    fn test_credentials_skip_blank_and_adapterless_keys() {
        let mut keys = ApiKeys::default();
        keys.set("gemini", "g-1").expect("set");
        keys.set("deepseek", "ds-1").expect("set");
        let creds = keys.credentials();
        assert_eq!(creds.get(Vendor::Gemini), Some("g-1"));
        assert_eq!(creds.get(Vendor::OpenAI), None);
        assert!(!creds.contains(Vendor::OpenRouter));
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("Light".parse::<Theme>().expect("theme"), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
