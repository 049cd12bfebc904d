//! Client-side OAuth error taxonomy.
//!
//! This module defines every error the protocol engine can report. Errors
//! split into three groups the caller must treat differently:
//!
//! - caller misuse (`InvalidArgument`, `InvalidState`): fatal to the current
//!   build or call, never retried;
//! - protocol and security errors (`AuthorizationResponse`, `TokenResponse`,
//!   `StateMismatch`, `NotFound`, `MalformedToken`): structured values for
//!   the caller's retry/abort policy;
//! - transport errors (`Network`): opaque pass-through from the transport
//!   collaborator.
//!
//! `StateMismatch` signals a possible redirect-injection attack and must be
//! surfaced as-is, never downgraded to a generic failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type alias for protocol-engine results.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Errors reported by the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    /// The authorization endpoint returned an RFC 6749 §4.1.2.1 error
    /// via the redirect.
    #[error("Authorization endpoint error: {error}")]
    AuthorizationResponse {
        /// Classified error code (`Unknown` when the string is not a
        /// registered code).
        code: AuthorizationErrorCode,
        /// The raw `error` parameter as received.
        error: String,
        /// Optional human-readable `error_description`.
        description: Option<String>,
        /// Optional `error_uri` pointing at documentation.
        uri: Option<String>,
    },

    /// The token or device-authorization endpoint returned an
    /// RFC 6749 §5.2 / RFC 8628 §3.5 error body.
    #[error("Token endpoint error: {error}")]
    TokenResponse {
        /// Classified error code (`Unknown` when the string is not a
        /// registered code).
        code: TokenErrorCode,
        /// The raw `error` member as received.
        error: String,
        /// Optional human-readable `error_description`.
        description: Option<String>,
        /// Optional `error_uri` pointing at documentation.
        uri: Option<String>,
    },

    /// Transport-level failure reported by the HTTP collaborator.
    /// Opaque to this layer; never produced by the engine itself.
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// A compact identity token could not be decoded structurally.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the structural defect.
        message: String,
    },

    /// A builder was finalized with missing or contradictory mandatory
    /// fields, or an operation was invoked in the wrong state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// The caller supplied an invalid value.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid input.
        message: String,
    },

    /// The state carried by a response does not equal the state of the
    /// request it claims to answer. Security-relevant: the payload cannot
    /// be trusted as originating from the expected flow.
    #[error("State mismatch: expected {expected:?}, received {received:?}")]
    StateMismatch {
        /// The state token of the pending request.
        expected: String,
        /// The state received in the redirect, if any.
        received: Option<String>,
    },

    /// No pending request is registered under the given state token.
    /// Either the entry was already consumed or the token is stale.
    #[error("No pending request for state token {state:?}")]
    NotFound {
        /// The state token that missed.
        state: String,
    },
}

impl OAuthError {
    /// Creates a `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates an `InvalidState` error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a `StateMismatch` error.
    #[must_use]
    pub fn state_mismatch(expected: impl Into<String>, received: Option<String>) -> Self {
        Self::StateMismatch {
            expected: expected.into(),
            received,
        }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(state: impl Into<String>) -> Self {
        Self::NotFound {
            state: state.into(),
        }
    }

    /// Returns `true` if this error is caller misuse (never retried).
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::InvalidArgument { .. }
        )
    }

    /// Returns `true` if this error was reported by the authorization
    /// server (via redirect or JSON error body).
    #[must_use]
    pub fn is_server_reported(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationResponse { .. } | Self::TokenResponse { .. }
        )
    }

    /// Returns `true` if this error is security-relevant and must be
    /// surfaced to the end of the call chain.
    #[must_use]
    pub fn is_security_error(&self) -> bool {
        matches!(self, Self::StateMismatch { .. })
    }

    /// Returns `true` if this error came from the transport collaborator.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthorizationResponse { .. } | Self::TokenResponse { .. } => {
                ErrorCategory::Protocol
            }
            Self::Network { .. } => ErrorCategory::Transport,
            Self::MalformedToken { .. } | Self::NotFound { .. } => ErrorCategory::Protocol,
            Self::InvalidState { .. } | Self::InvalidArgument { .. } => ErrorCategory::Usage,
            Self::StateMismatch { .. } => ErrorCategory::Security,
        }
    }
}

/// Categories of client errors for logging and caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller misuse: invalid arguments or builder misuse.
    Usage,
    /// Protocol-level failures reported as structured values.
    Protocol,
    /// Security-relevant conditions that must never be swallowed.
    Security,
    /// Transport failures passed through from the HTTP collaborator.
    Transport,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "usage"),
            Self::Protocol => write!(f, "protocol"),
            Self::Security => write!(f, "security"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

// =============================================================================
// Authorization endpoint error codes
// =============================================================================

/// OAuth 2.0 authorization endpoint error codes.
///
/// Defined in RFC 6749 Section 4.1.2.1. Strings outside the registered set
/// classify as [`AuthorizationErrorCode::Unknown`]; the raw string is kept on
/// the [`OAuthError::AuthorizationResponse`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,
    /// The client is not authorized to use this method.
    UnauthorizedClient,
    /// The resource owner or server denied the request.
    AccessDenied,
    /// The server does not support this response type.
    UnsupportedResponseType,
    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,
    /// The server encountered an unexpected condition.
    ServerError,
    /// The server is temporarily overloaded or under maintenance.
    TemporarilyUnavailable,
    /// Any error string not registered by RFC 6749.
    Unknown,
}

impl AuthorizationErrorCode {
    /// Classifies a raw `error` string.
    #[must_use]
    pub fn parse(error: &str) -> Self {
        match error {
            "invalid_request" => Self::InvalidRequest,
            "unauthorized_client" => Self::UnauthorizedClient,
            "access_denied" => Self::AccessDenied,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            "invalid_scope" => Self::InvalidScope,
            "server_error" => Self::ServerError,
            "temporarily_unavailable" => Self::TemporarilyUnavailable,
            _ => Self::Unknown,
        }
    }

    /// Returns the registered error string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Token endpoint error codes
// =============================================================================

/// OAuth 2.0 token endpoint error codes.
///
/// The RFC 6749 Section 5.2 set plus the RFC 8628 Section 3.5 device-flow
/// codes (`authorization_pending`, `slow_down`, `expired_token`). Strings
/// outside the registered set classify as [`TokenErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// The grant or refresh token is invalid, expired, or revoked.
    InvalidGrant,
    /// The client is not authorized to use this grant type.
    UnauthorizedClient,
    /// The grant type is not supported by the server.
    UnsupportedGrantType,
    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,
    /// Device flow: the user has not yet completed authorization.
    AuthorizationPending,
    /// Device flow: the client is polling too fast.
    SlowDown,
    /// Device flow: the device code has expired.
    ExpiredToken,
    /// The resource owner denied the authorization request.
    AccessDenied,
    /// Any error string not registered by RFC 6749 or RFC 8628.
    Unknown,
}

impl TokenErrorCode {
    /// Classifies a raw `error` string.
    #[must_use]
    pub fn parse(error: &str) -> Self {
        match error {
            "invalid_request" => Self::InvalidRequest,
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "unauthorized_client" => Self::UnauthorizedClient,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "invalid_scope" => Self::InvalidScope,
            "authorization_pending" => Self::AuthorizationPending,
            "slow_down" => Self::SlowDown,
            "expired_token" => Self::ExpiredToken,
            "access_denied" => Self::AccessDenied,
            _ => Self::Unknown,
        }
    }

    /// Returns the registered error string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::ExpiredToken => "expired_token",
            Self::AccessDenied => "access_denied",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` if a device-flow poll loop should continue after
    /// receiving this code (`authorization_pending` or `slow_down`).
    /// All other codes are terminal for the flow.
    #[must_use]
    pub fn is_device_flow_retry(&self) -> bool {
        matches!(self, Self::AuthorizationPending | Self::SlowDown)
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Wire-level error payload
// =============================================================================

/// Error payload as it appears on the wire.
///
/// Carried either as redirect parameters (`error`, `error_description`,
/// `error_uri`) or as a JSON error body from the token and
/// device-authorization endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The raw error code string.
    pub error: String,

    /// Human-readable error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI identifying a human-readable error page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl ErrorResponse {
    /// Creates an error payload with just a code string.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: None,
            error_uri: None,
        }
    }

    /// Classifies this payload as an authorization endpoint error.
    #[must_use]
    pub fn into_authorization_error(self) -> OAuthError {
        OAuthError::AuthorizationResponse {
            code: AuthorizationErrorCode::parse(&self.error),
            error: self.error,
            description: self.error_description,
            uri: self.error_uri,
        }
    }

    /// Classifies this payload as a token endpoint error.
    #[must_use]
    pub fn into_token_error(self) -> OAuthError {
        OAuthError::TokenResponse {
            code: TokenErrorCode::parse(&self.error),
            error: self.error,
            description: self.error_description,
            uri: self.error_uri,
        }
    }
}
