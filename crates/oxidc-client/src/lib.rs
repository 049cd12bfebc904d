//! # oxidc-client
//!
//! OAuth 2.0 / OpenID Connect client protocol engine.
//!
//! This crate provides:
//! - RFC-correct request construction for the authorization, end-session,
//!   device-authorization, and token endpoints (RFC 6749, RFC 7636,
//!   RFC 8628, OIDC Core and RP-Initiated Logout)
//! - State-token correlation of asynchronous redirect responses back to
//!   the request that produced them
//! - Structural parsing of identity tokens (no signature verification)
//! - Client authentication strategies for the token endpoint
//! - A structured error taxonomy for OAuth error responses
//!
//! ## Overview
//!
//! The engine performs no I/O. Front-channel requests reduce to a
//! browser-navigable URI; back-channel requests reduce to a
//! [`TransportRequest`] the caller's HTTP client carries out; responses
//! come back in as redirect URIs or JSON bodies. In between, requests wait
//! in a [`PendingRequestStore`] keyed by their unpredictable state token,
//! which doubles as the CSRF defense.
//!
//! ## Modules
//!
//! - [`config`] - Authorization server endpoints and provider metadata
//! - [`request`] - Builder-constructed request models
//! - [`response`] - Response models and the redirect dispatcher
//! - [`store`] - Single-use state correlation store
//! - [`pkce`] - Code verifier/challenge generation
//! - [`client_auth`] - Token endpoint client authentication
//! - [`id_token`] - Structural identity-token parsing
//! - [`error`] - Error taxonomy
//! - [`clock`] - Injectable time source
//!
//! ## Example
//!
//! ```
//! use oxidc_client::prelude::*;
//! use url::Url;
//!
//! # fn main() -> OAuthResult<()> {
//! let configuration = ServiceConfiguration::new(
//!     Url::parse("https://auth.example.com/authorize").unwrap(),
//!     Url::parse("https://auth.example.com/token").unwrap(),
//! );
//!
//! let request = AuthorizationRequest::builder(configuration, "my-app")
//!     .response_type(RESPONSE_TYPE_CODE)
//!     .redirect_uri(Url::parse("https://app.example.com/callback").unwrap())
//!     .scopes(["openid", "profile"])
//!     .code_verifier(CodeVerifier::generate())
//!     .build()?;
//!
//! // Hand `request.request_uri()` to the browser collaborator; when the
//! // redirect comes back, `dispatch_authorization_redirect` matches it.
//! let _uri = request.request_uri();
//! # Ok(())
//! # }
//! ```

pub mod client_auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod id_token;
pub mod params;
pub mod pkce;
pub mod request;
pub mod response;
pub mod store;

pub use client_auth::ClientAuthentication;
pub use clock::{Clock, SystemClock};
pub use config::{ProviderMetadata, ServiceConfiguration};
pub use error::{
    AuthorizationErrorCode, ErrorCategory, ErrorResponse, OAuthError, OAuthResult, TokenErrorCode,
};
pub use id_token::{IdTokenClaims, parse_id_token};
pub use params::AdditionalParameters;
pub use pkce::{CodeChallenge, CodeChallengeMethod, CodeVerifier};
pub use request::{
    AuthorizationRequest, DeviceAuthorizationRequest, EndSessionRequest, GrantType, RESPONSE_TYPE_CODE,
    Request, ResponseMode, TokenRequest, TransportRequest, generate_nonce, generate_state,
};
pub use response::{
    AuthorizationResponse, DeviceAuthorizationResponse, DispatchedResponse, EndSessionResponse,
    TokenResponse, dispatch_authorization_redirect, dispatch_end_session_redirect,
    dispatch_pending_redirect,
};
pub use store::{InMemoryPendingRequestStore, PendingRequest, PendingRequestStore};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oxidc_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client_auth::ClientAuthentication;
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{ProviderMetadata, ServiceConfiguration};
    pub use crate::error::{
        AuthorizationErrorCode, ErrorCategory, ErrorResponse, OAuthError, OAuthResult,
        TokenErrorCode,
    };
    pub use crate::id_token::{IdTokenClaims, parse_id_token};
    pub use crate::pkce::{CodeChallenge, CodeChallengeMethod, CodeVerifier};
    pub use crate::request::{
        AuthorizationRequest, DeviceAuthorizationRequest, EndSessionRequest, GrantType,
        RESPONSE_TYPE_CODE, Request, ResponseMode, TokenRequest, TransportRequest,
    };
    pub use crate::response::{
        AuthorizationResponse, DeviceAuthorizationResponse, DispatchedResponse,
        EndSessionResponse, TokenResponse, dispatch_authorization_redirect,
        dispatch_end_session_redirect, dispatch_pending_redirect,
    };
    pub use crate::store::{InMemoryPendingRequestStore, PendingRequest, PendingRequestStore};
}
