use thiserror::Error;

use crate::models::Vendor;

/**
 * \brief Failures raised while building or invoking an adapter.
 * \details Transport and parse failures render a generic message; the detail is
 * kept in the error source/fields for server-side logging only.
 */
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{vendor} API key missing")]
    MissingCredential { vendor: Vendor },

    #[error("{vendor} API error (status {status}): {body}")]
    Upstream {
        vendor: Vendor,
        status: u16,
        body: String,
    },

    #[error("{vendor} request failed")]
    Transport {
        vendor: Vendor,
        #[source]
        source: reqwest::Error,
    },

    #[error("{vendor} returned an unexpected response")]
    Parse { vendor: Vendor, detail: String },
}

impl ChatError {
    pub fn vendor(&self) -> Vendor {
        match self {
            ChatError::MissingCredential { vendor }
            | ChatError::Upstream { vendor, .. }
            | ChatError::Transport { vendor, .. }
            | ChatError::Parse { vendor, .. } => *vendor,
        }
    }

    /** \brief Extra detail that never reaches the response envelope. */
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            ChatError::Transport { source, .. } => Some(source.to_string()),
            ChatError::Parse { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_embeds_vendor_and_body() {
        let err = ChatError::Upstream {
            vendor: Vendor::OpenAI,
            status: 403,
            body: "invalid api key".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("OpenAI"));
        assert!(msg.contains("invalid api key"));
        assert!(msg.contains("403"));
    }

    #[test]
    fn test_parse_message_hides_detail() {
        let err = ChatError::Parse {
            vendor: Vendor::Gemini,
            detail: "missing field `candidates`".to_string(),
        };
        assert_eq!(err.to_string(), "Google Gemini returned an unexpected response");
        assert_eq!(err.diagnostic().as_deref(), Some("missing field `candidates`"));
        assert_eq!(err.vendor(), Vendor::Gemini);
    }

    #[test]
    fn test_missing_credential_message() {
        let err = ChatError::MissingCredential {
            vendor: Vendor::Anthropic,
        };
        assert_eq!(err.to_string(), "Anthropic API key missing");
        assert!(err.diagnostic().is_none());
    }
}
