use thiserror::Error;

/// Failure of a single provider invocation. Every variant is recoverable by
/// moving on to the next provider in the cascade.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured")]
    NotConfigured { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned no usable text")]
    EmptyPayload { provider: &'static str },

    #[error("{provider} returned a malformed payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Request URLs are dropped from the message; they can carry credentials.
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.without_url().to_string()
        };
        Self::Transport { provider, message }
    }

    pub fn undecodable(provider: &'static str, err: reqwest::Error) -> Self {
        Self::Malformed {
            provider,
            message: err.without_url().to_string(),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::NotConfigured { provider }
            | Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::EmptyPayload { provider }
            | Self::Malformed { provider, .. } => provider,
        }
    }
}
