//! Unified error handling for the theme engine.
//!
//! The engine distinguishes four failure classes when talking to the
//! backend: transport failures, non-2xx responses with a JSON error body,
//! non-2xx responses with an HTML body (a backend inconsistency the cart-add
//! path detects explicitly), and application-level `success: false` payloads
//! that may carry a `requiresAuth` flag.
//!
//! Policy: transport and parse failures in the cart-count path degrade to a
//! safe default rather than propagating; authentication-required responses
//! route to the login modal; other application failures surface a toast.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the storefront API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend wants the customer to sign in before this operation.
    ///
    /// Detected via any of: an HTML error page with status 401/404, a JSON
    /// parse failure with status 401/404, an explicit `requiresAuth` flag,
    /// or a bare 401/404 status.
    #[error("Authentication required")]
    AuthRequired,

    /// Application-level failure (`success: false` or non-2xx with a JSON
    /// error body).
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// A successful envelope with no `data` payload.
    #[error("Response has no data")]
    MissingData,
}

impl ApiError {
    /// Whether this error should route to the login modal.
    ///
    /// Besides [`ApiError::AuthRequired`], backend error messages that talk
    /// about signing in are treated as authentication failures, matching the
    /// defensive contract with an imperfect backend.
    #[must_use]
    pub fn is_auth_required(&self) -> bool {
        match self {
            Self::AuthRequired => true,
            Self::Backend { message, .. } => {
                message.contains("Authentication required")
                    || message.contains("Please sign in")
                    || message.contains("unauthorized")
            }
            _ => false,
        }
    }

    /// Message suitable for a user-facing toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Top-level error type for fallible engine operations.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Storefront API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// HTML fragment rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Result type alias for `ThemeError`.
pub type Result<T> = std::result::Result<T, ThemeError>;
