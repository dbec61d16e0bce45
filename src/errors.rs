use std::fmt;

use thiserror::Error;

/// Why the credential exchange did not produce a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailureReason {
    Rejected(GatewayFailure),
    MissingToken,
    Transport(String),
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailureReason::Rejected(failure) => write!(f, "{}", failure),
            AuthFailureReason::MissingToken => write!(f, "response has no access token"),
            AuthFailureReason::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Failure details of a gateway call: HTTP status and the gateway's message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayFailure {
    pub http_status: Option<u16>,
    pub gateway_message: Option<String>,
}

impl GatewayFailure {
    pub fn new(http_status: Option<u16>, gateway_message: Option<String>) -> Self {
        Self {
            http_status,
            gateway_message,
        }
    }
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.http_status, &self.gateway_message) {
            (Some(status), Some(message)) => write!(f, "HTTP {}: {}", status, message),
            (Some(status), None) => write!(f, "HTTP {}", status),
            (None, Some(message)) => write!(f, "{}", message),
            (None, None) => write!(f, "no response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Gateway authentication failed: {0}")]
    AuthFailure(AuthFailureReason),
    #[error("Card tokenization failed: {0}")]
    TokenizeFailure(GatewayFailure),
    #[error("Payment authorization failed: {0}")]
    PaymentFailure(GatewayFailure),
    #[error("A payment attempt is already in progress for this session")]
    AttemptInFlight,
}

impl CheckoutError {
    /// Message the gateway attached to a rejected call at any step.
    pub fn gateway_message(&self) -> Option<&str> {
        match self {
            CheckoutError::AuthFailure(AuthFailureReason::Rejected(failure))
            | CheckoutError::TokenizeFailure(failure)
            | CheckoutError::PaymentFailure(failure) => failure.gateway_message.as_deref(),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            CheckoutError::AuthFailure(AuthFailureReason::Rejected(failure))
            | CheckoutError::TokenizeFailure(failure)
            | CheckoutError::PaymentFailure(failure) => failure.http_status,
            _ => None,
        }
    }

    /// True for failures raised before any network activity.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CheckoutError::Configuration(_)
                | CheckoutError::Validation(_)
                | CheckoutError::AttemptInFlight
        )
    }
}
