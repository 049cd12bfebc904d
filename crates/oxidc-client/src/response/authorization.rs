//! Authorization endpoint response.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::OAuthResult;
use crate::params::AdditionalParameters;
use crate::request::{AuthorizationRequest, TokenRequest};

// Parameter names the response model claims for itself; everything else in
// the redirect payload lands in `additional_parameters`.
const KNOWN_PARAMETERS: &[&str] = &[
    "state",
    "code",
    "access_token",
    "token_type",
    "id_token",
    "scope",
];

/// A successful answer from the authorization endpoint.
///
/// Always bound to the request it answers; the dispatcher has already
/// checked state equality before this value exists. Retaining the request
/// is what lets [`create_token_exchange_request`](Self::create_token_exchange_request)
/// build the next leg without the caller re-supplying redirect URI or PKCE
/// verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// The request this response answers.
    pub request: AuthorizationRequest,

    /// The state echoed by the server; equal to `request.state`.
    pub state: String,

    /// Authorization code, present in the code flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,

    /// Access token, present when the response type issues one directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Token type accompanying a directly-issued access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Identity token, present for `id_token` response types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Scope granted, when it differs from the scope requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Every redirect parameter outside the protocol set, kept verbatim.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_parameters: AdditionalParameters,
}

impl AuthorizationResponse {
    /// Builds a response from already-parsed redirect parameters.
    ///
    /// Called by the dispatcher after the state and error checks passed.
    #[must_use]
    pub(crate) fn from_redirect_parameters(
        request: AuthorizationRequest,
        parameters: IndexMap<String, String>,
    ) -> Self {
        let get = |key: &str| parameters.get(key).cloned();
        let additional_parameters = parameters
            .iter()
            .filter(|(key, _)| !KNOWN_PARAMETERS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            state: request.state.clone(),
            authorization_code: get("code"),
            access_token: get("access_token"),
            token_type: get("token_type"),
            id_token: get("id_token"),
            scope: get("scope"),
            additional_parameters,
            request,
        }
    }

    /// Derives the token request for exchanging this response's
    /// authorization code.
    ///
    /// The code, redirect URI, and PKCE verifier come from the response
    /// and its retained request; `additional_parameters` is merged in and
    /// validated against the token endpoint's reserved names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the response carries no authorization
    /// code, and the usual builder errors for reserved parameter names.
    pub fn create_token_exchange_request(
        &self,
        additional_parameters: AdditionalParameters,
    ) -> OAuthResult<TokenRequest> {
        let code = self.authorization_code.clone().ok_or_else(|| {
            crate::error::OAuthError::invalid_state(
                "authorization response carries no authorization code",
            )
        })?;

        let mut builder = TokenRequest::builder(
            self.request.configuration.clone(),
            self.request.client_id.clone(),
        )
        .authorization_code(code)
        .redirect_uri(self.request.redirect_uri.clone());

        if let Some(verifier) = &self.request.code_verifier {
            builder = builder.code_verifier(verifier.as_str());
        }
        for (key, value) in additional_parameters {
            builder = builder.additional_parameter(key, value);
        }
        builder.build()
    }
}
