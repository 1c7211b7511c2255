use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/**
 * \brief Message role: system/user/assistant.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/**
 * \brief One conversation turn, aligned with the OpenAI chat message shape.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /** \brief Role of the author */
    pub role: Role,
    /** \brief Text content */
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/**
 * \brief Upstream vendors with an implemented adapter.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Gemini,
    OpenAI,
    Anthropic,
    OpenRouter,
}

impl Vendor {
    pub const ALL: [Vendor; 4] = [
        Vendor::Gemini,
        Vendor::OpenAI,
        Vendor::Anthropic,
        Vendor::OpenRouter,
    ];

    /** \brief Human readable vendor name, embedded in error messages. */
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Gemini => "Google Gemini",
            Vendor::OpenAI => "OpenAI",
            Vendor::Anthropic => "Anthropic",
            Vendor::OpenRouter => "OpenRouter",
        }
    }

    /** \brief Short key used in settings and override headers. */
    pub fn key(&self) -> &'static str {
        match self {
            Vendor::Gemini => "gemini",
            Vendor::OpenAI => "openai",
            Vendor::Anthropic => "anthropic",
            Vendor::OpenRouter => "openrouter",
        }
    }

    /** \brief Request header carrying a per-request credential override. */
    pub fn header(&self) -> &'static str {
        match self {
            Vendor::Gemini => "x-gemini-key",
            Vendor::OpenAI => "x-openai-key",
            Vendor::Anthropic => "x-anthropic-key",
            Vendor::OpenRouter => "x-openrouter-key",
        }
    }

    /** \brief Environment variable holding the process-wide default credential. */
    pub fn env_var(&self) -> &'static str {
        match self {
            Vendor::Gemini => "GEMINI_API_KEY",
            Vendor::OpenAI => "OPENAI_API_KEY",
            Vendor::Anthropic => "ANTHROPIC_API_KEY",
            Vendor::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/**
 * \brief Vendor -> secret mapping. Blank secrets count as absent.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    secrets: BTreeMap<Vendor, String>,
}

impl ProviderCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, vendor: Vendor, secret: impl Into<String>) -> Self {
        self.set(vendor, secret);
        self
    }

    pub fn set(&mut self, vendor: Vendor, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.trim().is_empty() {
            self.secrets.remove(&vendor);
        } else {
            self.secrets.insert(vendor, secret);
        }
    }

    pub fn get(&self, vendor: Vendor) -> Option<&str> {
        self.secrets.get(&vendor).map(|s| s.as_str())
    }

    pub fn contains(&self, vendor: Vendor) -> bool {
        self.secrets.contains_key(&vendor)
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/**
 * \brief Entry of the model catalog shown by clients.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /** \brief Logical model identifier sent by clients */
    pub id: &'static str,
    /** \brief Display name */
    pub name: &'static str,
    /** \brief Backing vendor; `None` means no adapter exists yet */
    pub vendor: Option<Vendor>,
}

/** \brief Identifier that always resolves to the stub adapter. */
pub const STUB_MODEL_ID: &str = "mock";

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini",
        name: "Gemini",
        vendor: Some(Vendor::Gemini),
    },
    ModelInfo {
        id: "gpt-4",
        name: "GPT-4",
        vendor: Some(Vendor::OpenAI),
    },
    ModelInfo {
        id: "claude-3",
        name: "Claude 3",
        vendor: Some(Vendor::Anthropic),
    },
    ModelInfo {
        id: "openrouter",
        name: "OpenRouter",
        vendor: Some(Vendor::OpenRouter),
    },
    ModelInfo {
        id: "grok",
        name: "Grok",
        vendor: None,
    },
    ModelInfo {
        id: "deepseek",
        name: "DeepSeek",
        vendor: None,
    },
    ModelInfo {
        id: "mistral",
        name: "Mistral",
        vendor: None,
    },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::assistant("hi");
        let v = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(v, serde_json::json!({"role": "assistant", "content": "hi"}));
        let back: ChatMessage =
            serde_json::from_str(r#"{"role":"system","content":"x"}"#).expect("deserialize");
        assert_eq!(back.role, Role::System);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let res = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_blank_secret_counts_as_absent() {
        let creds = ProviderCredentials::new()
            .with(Vendor::Gemini, "   ")
            .with(Vendor::OpenAI, "sk-1");
        assert_eq!(creds.get(Vendor::Gemini), None);
        assert_eq!(creds.get(Vendor::OpenAI), Some("sk-1"));

        let mut creds = creds;
        creds.set(Vendor::OpenAI, "");
        assert!(creds.is_empty());
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(find_model("claude-3").and_then(|m| m.vendor), Some(Vendor::Anthropic));
        assert_eq!(find_model("grok").map(|m| m.vendor), Some(None));
        assert!(find_model("gpt-5").is_none());
        assert!(find_model(STUB_MODEL_ID).is_none());
    }
}
