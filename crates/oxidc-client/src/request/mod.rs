//! Request models.
//!
//! Immutable, builder-constructed value objects for the four outbound
//! request types, plus the [`Request`] sum type used for cross-process
//! handoff and the [`TransportRequest`] form handed to the HTTP
//! collaborator.
//!
//! Builders validate at `build()` only; a built request is never mutated
//! and its canonical parameter set is a pure function of its fields.

mod authorization;
mod device;
mod end_session;
mod token;

pub use authorization::{
    AuthorizationRequest, AuthorizationRequestBuilder, RESPONSE_TYPE_CODE, ResponseMode,
};
pub use device::{DeviceAuthorizationRequest, DeviceAuthorizationRequestBuilder};
pub use end_session::{EndSessionRequest, EndSessionRequestBuilder};
pub use token::{GrantType, TokenRequest, TokenRequestBuilder};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client_auth::ClientAuthentication;
use crate::config::ServiceConfiguration;
use crate::error::{OAuthError, OAuthResult};
use crate::params;

/// Generates a state token: 16 cryptographically random bytes,
/// base64url-encoded without padding.
///
/// The token is both the CSRF defense on the authorization redirect and
/// the correlation key into the pending-request store.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a nonce with the same shape as [`generate_state`].
#[must_use]
pub fn generate_nonce() -> String {
    generate_state()
}

// =============================================================================
// Request sum type
// =============================================================================

/// Any request this engine can produce, tagged for serialization.
///
/// This is the cross-process handoff form: a pending request serialized in
/// one process can be deserialized in another and matched against the
/// redirect that answers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum Request {
    /// Front-channel authorization request.
    Authorization(AuthorizationRequest),
    /// Front-channel RP-initiated logout request.
    EndSession(EndSessionRequest),
    /// Back-channel device authorization request.
    DeviceAuthorization(DeviceAuthorizationRequest),
    /// Back-channel token request.
    Token(TokenRequest),
}

impl Request {
    /// Returns the state token, for the variants that carry one.
    ///
    /// Only front-channel requests have a state; token and
    /// device-authorization requests are correlated by their transport
    /// round-trip instead.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        match self {
            Self::Authorization(request) => Some(request.state.as_str()),
            Self::EndSession(request) => Some(request.state.as_str()),
            Self::DeviceAuthorization(_) | Self::Token(_) => None,
        }
    }

    /// Returns the service configuration the request was built against.
    #[must_use]
    pub fn configuration(&self) -> &ServiceConfiguration {
        match self {
            Self::Authorization(request) => &request.configuration,
            Self::EndSession(request) => &request.configuration,
            Self::DeviceAuthorization(request) => &request.configuration,
            Self::Token(request) => &request.configuration,
        }
    }

    /// Serializes the request to its JSON handoff document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if serialization fails (should not happen for
    /// a built request).
    pub fn to_json(&self) -> OAuthResult<String> {
        serde_json::to_string(self)
            .map_err(|e| OAuthError::invalid_state(format!("request serialization failed: {e}")))
    }

    /// Deserializes a request from its JSON handoff document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the document does not parse.
    pub fn from_json(json: &str) -> OAuthResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| OAuthError::invalid_argument(format!("invalid request document: {e}")))
    }
}

impl From<AuthorizationRequest> for Request {
    fn from(request: AuthorizationRequest) -> Self {
        Self::Authorization(request)
    }
}

impl From<EndSessionRequest> for Request {
    fn from(request: EndSessionRequest) -> Self {
        Self::EndSession(request)
    }
}

impl From<DeviceAuthorizationRequest> for Request {
    fn from(request: DeviceAuthorizationRequest) -> Self {
        Self::DeviceAuthorization(request)
    }
}

impl From<TokenRequest> for Request {
    fn from(request: TokenRequest) -> Self {
        Self::Token(request)
    }
}

// =============================================================================
// Transport form
// =============================================================================

/// An outbound HTTP exchange, ready for the transport collaborator.
///
/// The engine performs no I/O; back-channel requests reduce to this value
/// and the caller's HTTP client carries it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// HTTP method; always `POST` for token and device-authorization
    /// exchanges.
    pub method: &'static str,

    /// The endpoint to call.
    pub url: Url,

    /// Headers, including `Content-Type` and any client-authentication
    /// header.
    pub headers: Vec<(String, String)>,

    /// `application/x-www-form-urlencoded` body.
    pub body: String,
}

/// Assembles a form POST with client authentication applied.
///
/// Body parameters contributed by the authentication strategy are merged
/// into the request's own parameters; a conflicting duplicate is rejected
/// so credentials can never travel with two different values.
pub(crate) fn form_post(
    url: Url,
    mut parameters: IndexMap<String, String>,
    client_id: &str,
    authentication: &ClientAuthentication,
) -> OAuthResult<TransportRequest> {
    for (key, value) in authentication.body_parameters(client_id) {
        match parameters.get(&key) {
            Some(existing) if existing != &value => {
                return Err(OAuthError::invalid_argument(format!(
                    "client authentication conflicts with request parameter {key:?}"
                )));
            }
            Some(_) => {}
            None => {
                parameters.insert(key, value);
            }
        }
    }

    let mut headers = vec![
        (
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ),
        ("Accept".to_string(), "application/json".to_string()),
    ];
    headers.extend(authentication.request_headers(client_id));

    Ok(TransportRequest {
        method: "POST",
        url,
        headers,
        body: params::form_urlencode(&parameters),
    })
}
