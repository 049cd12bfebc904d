//! Token endpoint request.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client_auth::ClientAuthentication;
use crate::config::ServiceConfiguration;
use crate::error::{OAuthError, OAuthResult};
use crate::params::{self, AdditionalParameters};
use crate::pkce;

use super::{TransportRequest, form_post};

const RESERVED_PARAMETERS: &[&str] = &[
    "client_id",
    "client_secret",
    "grant_type",
    "code",
    "redirect_uri",
    "refresh_token",
    "scope",
    "code_verifier",
    "device_code",
];

// =============================================================================
// Grant type
// =============================================================================

/// OAuth 2.0 grant types this engine can exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    /// Authorization code exchange (RFC 6749 §4.1.3).
    #[serde(rename = "authorization_code")]
    AuthorizationCode,

    /// Refresh token exchange (RFC 6749 §6).
    #[serde(rename = "refresh_token")]
    RefreshToken,

    /// Device code polling exchange (RFC 8628 §3.4).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,

    /// Client credentials exchange (RFC 6749 §4.4).
    #[serde(rename = "client_credentials")]
    ClientCredentials,
}

impl GrantType {
    /// Parses a grant type from its wire form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unrecognized grant types.
    pub fn parse(grant_type: &str) -> OAuthResult<Self> {
        match grant_type {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            "urn:ietf:params:oauth:grant-type:device_code" => Ok(Self::DeviceCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            other => Err(OAuthError::invalid_argument(format!(
                "unsupported grant type {other:?}"
            ))),
        }
    }

    /// Returns the `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Token request
// =============================================================================

/// A request to the token endpoint.
///
/// Covers every supported grant. Usually derived from a prior response:
/// [`crate::response::AuthorizationResponse::create_token_exchange_request`]
/// for code exchange, [`crate::response::DeviceAuthorizationResponse::token_request`]
/// for device polling. It can also be built directly, e.g. for refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Endpoints this request was built against.
    pub configuration: ServiceConfiguration,

    /// The client identifier. Always sent as a body parameter; a
    /// [`ClientAuthentication`] strategy may additionally authenticate it.
    pub client_id: String,

    /// The grant being exchanged.
    pub grant_type: GrantType,

    /// Authorization code (for [`GrantType::AuthorizationCode`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,

    /// Redirect URI the code was issued against (required for code
    /// exchange).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<Url>,

    /// Refresh token (for [`GrantType::RefreshToken`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Device code (for [`GrantType::DeviceCode`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_code: Option<String>,

    /// Space-delimited scope string, if scopes were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// PKCE verifier disclosed during code exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,

    /// Caller-supplied parameters outside the protocol set.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_parameters: AdditionalParameters,
}

impl TokenRequest {
    /// Starts building a token request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
    ) -> TokenRequestBuilder {
        TokenRequestBuilder {
            configuration,
            client_id: client_id.into(),
            grant_type: None,
            authorization_code: None,
            redirect_uri: None,
            refresh_token: None,
            device_code: None,
            scopes: Vec::new(),
            code_verifier: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// The canonical parameter set of this request.
    #[must_use]
    pub fn to_parameters(&self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("client_id".to_string(), self.client_id.clone());
        parameters.insert("grant_type".to_string(), self.grant_type.as_str().to_string());
        if let Some(code) = &self.authorization_code {
            parameters.insert("code".to_string(), code.clone());
        }
        if let Some(uri) = &self.redirect_uri {
            parameters.insert("redirect_uri".to_string(), uri.to_string());
        }
        if let Some(token) = &self.refresh_token {
            parameters.insert("refresh_token".to_string(), token.clone());
        }
        if let Some(code) = &self.device_code {
            parameters.insert("device_code".to_string(), code.clone());
        }
        if let Some(scope) = &self.scope {
            parameters.insert("scope".to_string(), scope.clone());
        }
        if let Some(verifier) = &self.code_verifier {
            parameters.insert("code_verifier".to_string(), verifier.clone());
        }
        for (key, value) in &self.additional_parameters {
            parameters.insert(key.clone(), value.clone());
        }
        parameters
    }

    /// The outbound form POST for the transport collaborator, with the
    /// given client authentication applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the authentication strategy conflicts
    /// with an existing request parameter.
    pub fn transport_request(
        &self,
        authentication: &ClientAuthentication,
    ) -> OAuthResult<TransportRequest> {
        form_post(
            self.configuration.token_endpoint.clone(),
            self.to_parameters(),
            &self.client_id,
            authentication,
        )
    }
}

/// Builder for [`TokenRequest`].
///
/// When no explicit grant type is set, `build()` infers one: an
/// authorization code implies `authorization_code`, else a refresh token
/// implies `refresh_token`, else building fails.
#[derive(Debug)]
pub struct TokenRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    grant_type: Option<GrantType>,
    authorization_code: Option<String>,
    redirect_uri: Option<Url>,
    refresh_token: Option<String>,
    device_code: Option<String>,
    scopes: Vec<String>,
    code_verifier: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl TokenRequestBuilder {
    /// Sets an explicit grant type, overriding inference.
    #[must_use]
    pub fn grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant_type = Some(grant_type);
        self
    }

    /// Sets the authorization code to exchange.
    #[must_use]
    pub fn authorization_code(mut self, code: impl Into<String>) -> Self {
        self.authorization_code = Some(code.into());
        self
    }

    /// Sets the redirect URI the code was issued against.
    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: Url) -> Self {
        self.redirect_uri = Some(redirect_uri);
        self
    }

    /// Sets the refresh token to exchange.
    #[must_use]
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Sets the device code to poll with.
    #[must_use]
    pub fn device_code(mut self, code: impl Into<String>) -> Self {
        self.device_code = Some(code.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the PKCE verifier for code exchange.
    #[must_use]
    pub fn code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    /// Adds a non-protocol parameter. Reserved names are rejected at
    /// build time.
    #[must_use]
    pub fn additional_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_parameters.insert(key.into(), value.into());
        self
    }

    /// Validates, infers the grant type if needed, and finalizes the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no grant can be inferred or the
    /// inferred/explicit grant is missing a mandatory field, and
    /// `InvalidArgument` for reserved additional-parameter names or a
    /// malformed code verifier.
    pub fn build(self) -> OAuthResult<TokenRequest> {
        let grant_type = match self.grant_type {
            Some(grant_type) => grant_type,
            None if self.authorization_code.is_some() => GrantType::AuthorizationCode,
            None if self.refresh_token.is_some() => GrantType::RefreshToken,
            None => {
                return Err(OAuthError::invalid_state(
                    "token request needs a grant type, an authorization code, or a refresh token",
                ));
            }
        };

        match grant_type {
            GrantType::AuthorizationCode => {
                if self.authorization_code.is_none() {
                    return Err(OAuthError::invalid_state(
                        "authorization_code grant needs an authorization code",
                    ));
                }
                if self.redirect_uri.is_none() {
                    return Err(OAuthError::invalid_state(
                        "authorization_code grant needs the redirect URI the code was issued against",
                    ));
                }
            }
            GrantType::RefreshToken => {
                if self.refresh_token.is_none() {
                    return Err(OAuthError::invalid_state(
                        "refresh_token grant needs a refresh token",
                    ));
                }
            }
            GrantType::DeviceCode => {
                if self.device_code.is_none() {
                    return Err(OAuthError::invalid_state(
                        "device_code grant needs a device code",
                    ));
                }
            }
            GrantType::ClientCredentials => {}
        }

        if let Some(verifier) = &self.code_verifier {
            if grant_type != GrantType::AuthorizationCode {
                return Err(OAuthError::invalid_state(
                    "code_verifier only applies to the authorization_code grant",
                ));
            }
            pkce::check_verifier(verifier)?;
        }

        params::ensure_no_reserved_keys(&self.additional_parameters, RESERVED_PARAMETERS)?;

        let scope = match params::scopes_to_string(&self.scopes)? {
            joined if joined.is_empty() => None,
            joined => Some(joined),
        };

        Ok(TokenRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            grant_type,
            authorization_code: self.authorization_code,
            redirect_uri: self.redirect_uri,
            refresh_token: self.refresh_token,
            device_code: self.device_code,
            scope,
            code_verifier: self.code_verifier,
            additional_parameters: self.additional_parameters,
        })
    }
}
