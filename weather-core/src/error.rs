use thiserror::Error;

/// Errors surfaced by the normalization client and the proxy.
///
/// `Upstream` displays its message verbatim so callers can show it as-is.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response contained no {0} data")]
    MissingData(&'static str),
}

impl WeatherError {
    /// Build an upstream error from a status and an optional provider message.
    pub fn upstream(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::Upstream { status, message }
    }

    /// HTTP status associated with the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
