use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::error::ChatError;
use crate::models::{ChatMessage, Role, Vendor, STUB_MODEL_ID};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

const GEMINI_MODEL: &str = "gemini-1.5-flash";
const OPENAI_MODEL: &str = "gpt-4";
const ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";
const OPENROUTER_MODEL: &str = "openai/gpt-3.5-turbo";

/**
 * \brief Connection details shared by every real vendor adapter.
 */
#[derive(Debug, Clone)]
pub struct Upstream {
    /** \brief Vendor secret; blank means the adapter refuses to run */
    secret: String,
    /** \brief API base, without trailing slash */
    base_url: String,
    /** \brief Downstream model selected by the adapter, never by the caller */
    model: String,
    http: Client,
}

impl Upstream {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(test)]
    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

/**
 * \brief Fallback adapter that simulates a reply without network access.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubAdapter {
    pub delay: Duration,
}

impl StubAdapter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /**
     * \brief Sleeps for the configured delay and echoes the newest message.
     */
    pub async fn generate(&self, messages: &[ChatMessage]) -> String {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        format!(
            "[MOCK] This is a simulated response for the last message: \"{}\". \n\n Configure API keys to get real responses.",
            last
        )
    }
}

/**
 * \brief Closed set of adapters: one variant per vendor plus the stub.
 */
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(Upstream),
    OpenAI(Upstream),
    Anthropic(Upstream),
    OpenRouter(Upstream),
    Stub(StubAdapter),
}

impl Provider {
    /**
     * \brief Builds the adapter for `vendor` with its default downstream model.
     */
    pub fn for_vendor(
        vendor: Vendor,
        secret: impl Into<String>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        let model = match vendor {
            Vendor::Gemini => GEMINI_MODEL,
            Vendor::OpenAI => OPENAI_MODEL,
            Vendor::Anthropic => ANTHROPIC_MODEL,
            Vendor::OpenRouter => OPENROUTER_MODEL,
        };
        let upstream = Upstream {
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.to_string(),
            http,
        };
        match vendor {
            Vendor::Gemini => Provider::Gemini(upstream),
            Vendor::OpenAI => Provider::OpenAI(upstream),
            Vendor::Anthropic => Provider::Anthropic(upstream),
            Vendor::OpenRouter => Provider::OpenRouter(upstream),
        }
    }

    pub fn stub(delay: Duration) -> Self {
        Provider::Stub(StubAdapter::new(delay))
    }

    /** \brief Stable adapter id, matching the logical model id that selects it. */
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Gemini(_) => "gemini",
            Provider::OpenAI(_) => "gpt-4",
            Provider::Anthropic(_) => "claude-3",
            Provider::OpenRouter(_) => "openrouter",
            Provider::Stub(_) => STUB_MODEL_ID,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.vendor() {
            Some(vendor) => vendor.name(),
            None => "Mock Provider",
        }
    }

    pub fn vendor(&self) -> Option<Vendor> {
        match self {
            Provider::Gemini(_) => Some(Vendor::Gemini),
            Provider::OpenAI(_) => Some(Vendor::OpenAI),
            Provider::Anthropic(_) => Some(Vendor::Anthropic),
            Provider::OpenRouter(_) => Some(Vendor::OpenRouter),
            Provider::Stub(_) => None,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Provider::Stub(_))
    }

    /**
     * \brief Non-streaming call; returns the full generated text.
     * \details Exactly one outbound request per call for real vendors, none for the stub.
     */
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        match self {
            Provider::Gemini(up) => chat_once_gemini(up, messages).await,
            Provider::OpenAI(up) => chat_once_openai(Vendor::OpenAI, up, messages).await,
            Provider::Anthropic(up) => chat_once_claude(up, messages).await,
            Provider::OpenRouter(up) => chat_once_openai(Vendor::OpenRouter, up, messages).await,
            Provider::Stub(stub) => Ok(stub.generate(messages).await),
        }
    }
}

fn ensure_secret(vendor: Vendor, up: &Upstream) -> Result<(), ChatError> {
    if up.secret.trim().is_empty() {
        return Err(ChatError::MissingCredential { vendor });
    }
    Ok(())
}

async fn chat_once_gemini(up: &Upstream, messages: &[ChatMessage]) -> Result<String, ChatError> {
    let vendor = Vendor::Gemini;
    ensure_secret(vendor, up)?;

    let url = format!("{}/v1beta/models/{}:generateContent", up.base_url, up.model);
    let body = json!({ "contents": gemini_payload(messages) });
    let request = up
        .http
        .post(url)
        .query(&[("key", up.secret.as_str())])
        .header(CONTENT_TYPE, "application/json")
        .json(&body);

    let v = send_json(vendor, up, messages.len(), request).await?;
    extract_text(vendor, &v, "/candidates/0/content/parts/0/text")
}

async fn chat_once_openai(
    vendor: Vendor,
    up: &Upstream,
    messages: &[ChatMessage],
) -> Result<String, ChatError> {
    ensure_secret(vendor, up)?;

    let url = match vendor {
        Vendor::OpenRouter => format!("{}/api/v1/chat/completions", up.base_url),
        _ => format!("{}/v1/chat/completions", up.base_url),
    };
    let body = json!({
        "model": up.model,
        "messages": openai_payload(messages),
    });
    let request = up
        .http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", up.secret))
        .json(&body);

    let v = send_json(vendor, up, messages.len(), request).await?;
    extract_text(vendor, &v, "/choices/0/message/content")
}

async fn chat_once_claude(up: &Upstream, messages: &[ChatMessage]) -> Result<String, ChatError> {
    let vendor = Vendor::Anthropic;
    ensure_secret(vendor, up)?;

    let url = format!("{}/v1/messages", up.base_url);
    let (system_prompt, payload_messages) = anthropic_payload(messages);

    let mut body = json!({
        "model": up.model,
        "max_tokens": ANTHROPIC_MAX_TOKENS,
        "messages": payload_messages,
    });
    if let Some(sys) = system_prompt {
        body["system"] = json!(sys);
    }

    let request = up
        .http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header("x-api-key", up.secret.as_str())
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body);

    let v = send_json(vendor, up, messages.len(), request).await?;
    extract_text(vendor, &v, "/content/0/text")
}

/**
 * \brief Sends the request and decodes a 2xx JSON body.
 * \details Non-2xx replies fail with the raw body text for operator diagnosis.
 */
async fn send_json(
    vendor: Vendor,
    up: &Upstream,
    message_count: usize,
    request: RequestBuilder,
) -> Result<Value, ChatError> {
    tracing::debug!(
        vendor = vendor.key(),
        model = %up.model,
        messages = message_count,
        "sending upstream request"
    );

    let resp = request
        .send()
        .await
        .map_err(|source| ChatError::Transport { vendor, source })?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(vendor = vendor.key(), status, "failed to read upstream error body: {}", err);
                format!("<unreadable body: {}>", err)
            }
        };
        tracing::warn!(vendor = vendor.key(), status, "upstream returned an error status");
        return Err(ChatError::Upstream {
            vendor,
            status,
            body,
        });
    }

    resp.json::<Value>().await.map_err(|e| ChatError::Parse {
        vendor,
        detail: e.to_string(),
    })
}

fn extract_text(vendor: Vendor, v: &Value, pointer: &str) -> Result<String, ChatError> {
    v.pointer(pointer)
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ChatError::Parse {
            vendor,
            detail: format!("no text at {} in response: {}", pointer, v),
        })
}

/**
 * \brief Gemini turn list: `user` stays user, every other role becomes `model`.
 */
fn gemini_payload(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant | Role::System => "model",
            };
            json!({
                "role": role,
                "parts": [{"text": msg.content}]
            })
        })
        .collect()
}

fn openai_payload(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| json!({"role": msg.role.as_str(), "content": msg.content}))
        .collect()
}

/**
 * \brief Splits out the system prompt for the Messages API.
 * \details Only the first system message is forwarded; later ones are dropped.
 */
fn anthropic_payload(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let system_prompt = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.clone());
    let items = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|msg| json!({"role": msg.role.as_str(), "content": msg.content}))
        .collect();
    (system_prompt, items)
}
