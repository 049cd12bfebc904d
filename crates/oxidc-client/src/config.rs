//! Authorization server configuration.
//!
//! [`ServiceConfiguration`] is the set of endpoint URIs every request is
//! built against. It is supplied by the caller, typed in directly or
//! derived from a provider's discovery document via
//! [`ServiceConfiguration::from_provider_metadata`]. Fetching the discovery
//! document over HTTP is the transport collaborator's job, not this crate's.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OAuthError, OAuthResult};

/// Endpoint URIs of an authorization server.
///
/// Passed by reference into every request builder and embedded in each
/// serialized request so a flow can resume in another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    /// URL of the authorization endpoint.
    pub authorization_endpoint: Url,

    /// URL of the token endpoint.
    pub token_endpoint: Url,

    /// URL of the RP-initiated logout endpoint, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<Url>,

    /// URL of the RFC 8628 device authorization endpoint, if the provider
    /// has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<Url>,
}

impl ServiceConfiguration {
    /// Creates a configuration with the two endpoints every provider has.
    #[must_use]
    pub fn new(authorization_endpoint: Url, token_endpoint: Url) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            end_session_endpoint: None,
            device_authorization_endpoint: None,
        }
    }

    /// Sets the end-session endpoint.
    #[must_use]
    pub fn with_end_session_endpoint(mut self, endpoint: Url) -> Self {
        self.end_session_endpoint = Some(endpoint);
        self
    }

    /// Sets the device authorization endpoint.
    #[must_use]
    pub fn with_device_authorization_endpoint(mut self, endpoint: Url) -> Self {
        self.device_authorization_endpoint = Some(endpoint);
        self
    }

    /// Builds a configuration from a parsed OIDC discovery document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a present endpoint is not a valid URL.
    pub fn from_provider_metadata(metadata: &ProviderMetadata) -> OAuthResult<Self> {
        let parse = |name: &str, value: &str| {
            Url::parse(value).map_err(|e| {
                OAuthError::invalid_argument(format!("discovery field {name} is not a URL: {e}"))
            })
        };

        let mut configuration = Self::new(
            parse("authorization_endpoint", &metadata.authorization_endpoint)?,
            parse("token_endpoint", &metadata.token_endpoint)?,
        );
        if let Some(endpoint) = &metadata.end_session_endpoint {
            configuration.end_session_endpoint = Some(parse("end_session_endpoint", endpoint)?);
        }
        if let Some(endpoint) = &metadata.device_authorization_endpoint {
            configuration.device_authorization_endpoint =
                Some(parse("device_authorization_endpoint", endpoint)?);
        }
        Ok(configuration)
    }
}

// =============================================================================
// Provider metadata
// =============================================================================

/// The client-relevant subset of an OIDC discovery document
/// (`.well-known/openid-configuration`).
///
/// Only the fields this engine consults are modeled; the document itself is
/// fetched and deserialized by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// URL the provider asserts as its issuer identifier.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the RP-initiated logout endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// URL of the RFC 8628 device authorization endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,

    /// OAuth 2.0 scope values the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// `response_type` values the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,

    /// `response_mode` values the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<String>>,

    /// Grant types the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// PKCE code challenge methods the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,

    /// Client authentication methods the token endpoint supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
}

impl ProviderMetadata {
    /// Returns `true` if the provider supports the given grant type.
    ///
    /// When `grant_types_supported` is absent, the OIDC default applies:
    /// `authorization_code` and `implicit` are assumed supported.
    #[must_use]
    pub fn supports_grant_type(&self, grant_type: &str) -> bool {
        match &self.grant_types_supported {
            Some(grants) => grants.iter().any(|g| g == grant_type),
            None => grant_type == "authorization_code" || grant_type == "implicit",
        }
    }

    /// Returns `true` if the provider supports the given PKCE method.
    #[must_use]
    pub fn supports_code_challenge_method(&self, method: &str) -> bool {
        self.code_challenge_methods_supported
            .as_ref()
            .is_some_and(|methods| methods.iter().any(|m| m == method))
    }

    /// Returns `true` if the token endpoint supports the given client
    /// authentication method.
    #[must_use]
    pub fn supports_token_auth_method(&self, method: &str) -> bool {
        self.token_endpoint_auth_methods_supported
            .as_ref()
            .is_some_and(|methods| methods.iter().any(|m| m == method))
    }

    /// Returns `true` if the provider supports the given response mode.
    #[must_use]
    pub fn supports_response_mode(&self, mode: &str) -> bool {
        self.response_modes_supported
            .as_ref()
            .is_some_and(|modes| modes.iter().any(|m| m == mode))
    }
}
