use std::time::Duration;

use reqwest::Client;

use crate::config::Endpoints;
use crate::llm::Provider;
use crate::models::{find_model, ProviderCredentials};

/**
 * \brief Read-only defaults consulted by the selector, built once at startup.
 */
#[derive(Debug, Clone)]
pub struct ProviderDefaults {
    /** \brief Process-wide default credentials */
    pub credentials: ProviderCredentials,
    pub endpoints: Endpoints,
    /** \brief Latency simulated by the stub adapter */
    pub stub_delay: Duration,
    /** \brief Shared HTTP client carrying the upstream timeout */
    pub http: Client,
}

impl ProviderDefaults {
    pub fn new(credentials: ProviderCredentials, endpoints: Endpoints, stub_delay: Duration) -> Self {
        Self {
            credentials,
            endpoints,
            stub_delay,
            http: Client::new(),
        }
    }
}

/**
 * \brief Maps a logical model id to an adapter. Never fails.
 * \details Secret resolution: per-request override, else process default. Unknown ids,
 * ids without an adapter and ids without any secret all get the stub.
 */
pub fn select(
    model_id: &str,
    overrides: Option<&ProviderCredentials>,
    defaults: &ProviderDefaults,
) -> Provider {
    let Some(vendor) = find_model(model_id).and_then(|m| m.vendor) else {
        tracing::debug!(model = model_id, "no adapter for model, using stub");
        return Provider::stub(defaults.stub_delay);
    };

    let secret = overrides
        .and_then(|o| o.get(vendor))
        .or_else(|| defaults.credentials.get(vendor));

    match secret {
        Some(secret) => {
            tracing::debug!(
                model = model_id,
                vendor = vendor.key(),
                overridden = overrides.map(|o| o.contains(vendor)).unwrap_or(false),
                "selected vendor adapter"
            );
            Provider::for_vendor(
                vendor,
                secret,
                defaults.endpoints.base(vendor),
                defaults.http.clone(),
            )
        }
        None => {
            tracing::debug!(
                model = model_id,
                vendor = vendor.key(),
                "no credential for vendor, using stub"
            );
            Provider::stub(defaults.stub_delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, Vendor, MODELS, STUB_MODEL_ID};

    fn defaults(credentials: ProviderCredentials) -> ProviderDefaults {
        ProviderDefaults::new(credentials, Endpoints::default(), Duration::ZERO)
    }

    #[test]
    fn test_known_vendor_without_secret_gets_stub() {
        let d = defaults(ProviderCredentials::new());
        for model in MODELS {
            assert!(select(model.id, None, &d).is_stub(), "model {}", model.id);
        }
    }

    #[test]
    fn test_unknown_and_unimplemented_ids_get_stub() {
        let all = ProviderCredentials::new()
            .with(Vendor::Gemini, "g")
            .with(Vendor::OpenAI, "o")
            .with(Vendor::Anthropic, "a")
            .with(Vendor::OpenRouter, "r");
        let d = defaults(all.clone());
        for id in ["grok", "deepseek", "mistral", "gpt-5", "", STUB_MODEL_ID] {
            assert!(select(id, Some(&all), &d).is_stub(), "model {:?}", id);
        }
    }

    #[test]
    fn test_default_secret_selects_vendor() {
        let d = defaults(ProviderCredentials::new().with(Vendor::Anthropic, "ak-default"));
        let provider = select("claude-3", None, &d);
        assert_eq!(provider.vendor(), Some(Vendor::Anthropic));
        assert_eq!(provider.id(), "claude-3");
        assert!(select("gemini", None, &d).is_stub());
    }

    #[test]
    fn test_override_takes_precedence_over_default() {
        let d = defaults(ProviderCredentials::new().with(Vendor::OpenAI, "sk-default"));
        let overrides = ProviderCredentials::new().with(Vendor::OpenAI, "sk-override");
        match select("gpt-4", Some(&overrides), &d) {
            Provider::OpenAI(up) => {
                assert_eq!(up.secret(), "sk-override");
                assert_eq!(up.model(), "gpt-4");
                assert_eq!(up.base_url(), "https://api.openai.com");
            }
            other => panic!("unexpected adapter: {other:?}"),
        }
    }

    #[test]
    fn test_blank_override_falls_back_to_default() {
        let d = defaults(ProviderCredentials::new().with(Vendor::OpenRouter, "or-default"));
        let overrides = ProviderCredentials::new().with(Vendor::OpenRouter, "");
        match select("openrouter", Some(&overrides), &d) {
            Provider::OpenRouter(up) => assert_eq!(up.secret(), "or-default"),
            other => panic!("unexpected adapter: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_selection_is_deterministic() {
        let d = defaults(ProviderCredentials::new());
        let first = select("gemini", None, &d);
        let second = select("gemini", None, &d);
        assert_eq!(first.id(), second.id());
        let messages = [ChatMessage::user("Hello")];
        let a = first.generate(&messages).await.expect("stub");
        let b = second.generate(&messages).await.expect("stub");
        assert_eq!(a, b);
    }
}
