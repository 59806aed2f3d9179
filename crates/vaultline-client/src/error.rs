//! Error types for the vaultline client.
//!
//! Only [`VaultError::InvalidConfig`] is raised by the request pipeline
//! itself. Every other variant is a failure that happened somewhere else (a
//! token file, a custom resolver, the network) and is passed through as-is.

use crate::config::RequestConfig;

/// All errors that can occur when sending a request through [`crate::Vault`].
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The resolved request config is structurally invalid.
    ///
    /// Raised before any network call when the transport, address, API
    /// version or token is missing, when no engine can be resolved, or when
    /// the engine's pre-request transform produced an inconsistent request.
    /// Also raised after dispatch when a post-request hook leaves no response.
    /// The partially resolved config is attached for diagnostics; its `Debug`
    /// output never contains the token.
    #[error("invalid vault request config: {reason}")]
    InvalidConfig {
        /// What was missing or inconsistent.
        reason: String,
        /// The config as it was when the check failed.
        config: Box<RequestConfig>,
    },

    /// Reading the token file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A caller-supplied resolver failed.
    #[error("vault resolver error: {0}")]
    Resolver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Network or HTTP client error.
    #[error("vault network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("vault API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("vault json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    pub(crate) fn invalid_config(reason: impl Into<String>, config: RequestConfig) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
            config: Box::new(config),
        }
    }

    /// The request config attached to an [`VaultError::InvalidConfig`].
    pub fn config(&self) -> Option<&RequestConfig> {
        match self {
            Self::InvalidConfig { config, .. } => Some(config),
            _ => None,
        }
    }

    /// Whether this error was raised by the pipeline's config checks.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
