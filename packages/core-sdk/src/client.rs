use std::sync::Arc;

use anyhow::{bail, Result};
use reqwest::Client;
use serde_json::json;

use crate::models::{ChatMessage, Role, Vendor};
use crate::selector::{self, ProviderDefaults};
use crate::server::ChatReply;
use crate::settings::ApiKeys;

/** \brief Assistant message shown in place of any failure. */
pub const FALLBACK_REPLY: &str = "I'm sorry, I encountered an error. Please try again.";

pub fn welcome_message(model: &str) -> String {
    format!(
        "Hello! I'm ready to help you using **{}**. How can I assist you today?",
        model
    )
}

/**
 * \brief HTTP client for a running chat server.
 */
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /**
     * \brief POST /api/chat with one key header per vendor; any non-2xx reply is an error.
     */
    pub async fn send(&self, messages: &[ChatMessage], model: &str, keys: &ApiKeys) -> Result<String> {
        let mut request = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&json!({ "messages": messages, "model": model }));
        for vendor in Vendor::ALL {
            request = request.header(vendor.header(), keys.get(vendor.key()).unwrap_or(""));
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("chat request failed: {} -> {}", status, text);
        }
        let reply: ChatReply = resp.json().await?;
        Ok(reply.content)
    }
}

/**
 * \brief Where a session sends its conversation.
 */
#[derive(Debug, Clone)]
pub enum Backend {
    /** \brief A chat server reached over HTTP */
    Remote(ChatClient),
    /** \brief In-process selection, no server in between */
    Local(Arc<ProviderDefaults>),
}

impl Backend {
    /**
     * \brief Runs one chat turn; errors are returned, not replaced by the fallback reply.
     */
    pub async fn complete(&self, messages: &[ChatMessage], model: &str, keys: &ApiKeys) -> Result<String> {
        match self {
            Backend::Remote(client) => client.send(messages, model, keys).await,
            Backend::Local(defaults) => {
                let provider = selector::select(model, Some(&keys.credentials()), defaults);
                Ok(provider.generate(messages).await?)
            }
        }
    }
}

/**
 * \brief One visible conversation, kept in memory only.
 * \details `submit` borrows the session mutably, so only one submission is in flight.
 */
pub struct ChatSession {
    backend: Backend,
    model: String,
    keys: ApiKeys,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(backend: Backend, model: impl Into<String>, keys: ApiKeys) -> Self {
        let model = model.into();
        let messages = vec![ChatMessage::assistant(welcome_message(&model))];
        Self {
            backend,
            model,
            keys,
            messages,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /**
     * \brief Switches model; an untouched conversation gets a fresh welcome message.
     */
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        if self.messages.len() == 1 && self.messages[0].role == Role::Assistant {
            self.messages[0] = ChatMessage::assistant(welcome_message(&self.model));
        }
    }

    /**
     * \brief Starts a new chat: drops the history and puts back the welcome message.
     */
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::assistant(welcome_message(&self.model)));
    }

    /**
     * \brief Sends `input` with the full history and appends the reply.
     * \return The appended assistant message, or `None` for blank input.
     */
    pub async fn submit(&mut self, input: &str) -> Option<&ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::user(input));

        let reply = match self
            .backend
            .complete(&self.messages, &self.model, &self.keys)
            .await
        {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(model = %self.model, "chat submission failed: {:#}", err);
                FALLBACK_REPLY.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(reply));
        self.messages.last()
    }
}
