//! End-session (RP-initiated logout) request.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ServiceConfiguration;
use crate::error::{OAuthError, OAuthResult};
use crate::params::{self, AdditionalParameters};

use super::generate_state;

const RESERVED_PARAMETERS: &[&str] = &[
    "client_id",
    "id_token_hint",
    "post_logout_redirect_uri",
    "state",
];

/// A request to the provider's end-session endpoint
/// (OIDC RP-Initiated Logout 1.0).
///
/// Like the authorization request, this is a front-channel round-trip: the
/// browser navigates to [`EndSessionRequest::request_uri`] and the provider
/// redirects back with the `state` echoed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSessionRequest {
    /// Endpoints this request was built against. The end-session endpoint
    /// must be present.
    pub configuration: ServiceConfiguration,

    /// The client identifier.
    pub client_id: String,

    /// Identity token previously issued to the client, passed as a hint
    /// about the session being terminated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_hint: Option<String>,

    /// Where the provider redirects after logout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<Url>,

    /// Correlation token; auto-generated when not supplied.
    pub state: String,

    /// Caller-supplied parameters outside the protocol set.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_parameters: AdditionalParameters,
}

impl EndSessionRequest {
    /// Starts building an end-session request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
    ) -> EndSessionRequestBuilder {
        EndSessionRequestBuilder {
            configuration,
            client_id: client_id.into(),
            id_token_hint: None,
            post_logout_redirect_uri: None,
            state: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// The canonical parameter set of this request.
    #[must_use]
    pub fn to_parameters(&self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("client_id".to_string(), self.client_id.clone());
        if let Some(hint) = &self.id_token_hint {
            parameters.insert("id_token_hint".to_string(), hint.clone());
        }
        if let Some(uri) = &self.post_logout_redirect_uri {
            parameters.insert("post_logout_redirect_uri".to_string(), uri.to_string());
        }
        parameters.insert("state".to_string(), self.state.clone());
        for (key, value) in &self.additional_parameters {
            parameters.insert(key.clone(), value.clone());
        }
        parameters
    }

    /// The browser-navigable end-session URI.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the configuration lost its end-session
    /// endpoint (possible only for hand-edited handoff documents; the
    /// builder validates presence).
    pub fn request_uri(&self) -> OAuthResult<Url> {
        let mut url = self
            .configuration
            .end_session_endpoint
            .clone()
            .ok_or_else(|| {
                OAuthError::invalid_state("service configuration has no end-session endpoint")
            })?;
        url.query_pairs_mut().extend_pairs(self.to_parameters());
        Ok(url)
    }
}

/// Builder for [`EndSessionRequest`].
#[derive(Debug)]
pub struct EndSessionRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    id_token_hint: Option<String>,
    post_logout_redirect_uri: Option<Url>,
    state: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl EndSessionRequestBuilder {
    /// Sets the identity-token hint.
    #[must_use]
    pub fn id_token_hint(mut self, id_token: impl Into<String>) -> Self {
        self.id_token_hint = Some(id_token.into());
        self
    }

    /// Sets the post-logout redirect URI.
    #[must_use]
    pub fn post_logout_redirect_uri(mut self, uri: Url) -> Self {
        self.post_logout_redirect_uri = Some(uri);
        self
    }

    /// Supplies an explicit state token instead of the generated one.
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Adds a non-protocol parameter. Reserved names are rejected at
    /// build time.
    #[must_use]
    pub fn additional_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_parameters.insert(key.into(), value.into());
        self
    }

    /// Validates and finalizes the request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the configuration has no end-session
    /// endpoint, and `InvalidArgument` for reserved additional-parameter
    /// names.
    pub fn build(self) -> OAuthResult<EndSessionRequest> {
        if self.configuration.end_session_endpoint.is_none() {
            return Err(OAuthError::invalid_state(
                "service configuration has no end-session endpoint",
            ));
        }
        params::ensure_no_reserved_keys(&self.additional_parameters, RESERVED_PARAMETERS)?;

        Ok(EndSessionRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            id_token_hint: self.id_token_hint,
            post_logout_redirect_uri: self.post_logout_redirect_uri,
            state: self.state.unwrap_or_else(generate_state),
            additional_parameters: self.additional_parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> ServiceConfiguration {
        ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
        .with_end_session_endpoint(Url::parse("https://auth.example.com/logout").unwrap())
    }

    #[test]
    fn test_build_generates_state() {
        let request = EndSessionRequest::builder(configuration(), "my-app")
            .build()
            .unwrap();
        assert_eq!(request.state.len(), 22);
    }

    #[test]
    fn test_build_requires_end_session_endpoint() {
        let bare = ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        );
        let result = EndSessionRequest::builder(bare, "my-app").build();
        assert!(matches!(result, Err(OAuthError::InvalidState { .. })));
    }

    #[test]
    fn test_request_uri_carries_parameters() {
        let request = EndSessionRequest::builder(configuration(), "my-app")
            .id_token_hint("eyJ.hint")
            .post_logout_redirect_uri(Url::parse("https://app.example.com/bye").unwrap())
            .state("logout-state")
            .build()
            .unwrap();

        let uri = request.request_uri().unwrap();
        assert!(uri.as_str().starts_with("https://auth.example.com/logout?"));
        let query: Vec<(String, String)> = uri
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("id_token_hint".to_string(), "eyJ.hint".to_string())));
        assert!(query.contains(&("state".to_string(), "logout-state".to_string())));
        assert!(query.contains(&(
            "post_logout_redirect_uri".to_string(),
            "https://app.example.com/bye".to_string()
        )));
    }

    #[test]
    fn test_reserved_additional_parameter_rejected() {
        let result = EndSessionRequest::builder(configuration(), "my-app")
            .additional_parameter("id_token_hint", "forged")
            .build();
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_serde_roundtrip() {
        let request = EndSessionRequest::builder(configuration(), "my-app")
            .id_token_hint("token")
            .additional_parameter("ui_locales", "en")
            .build()
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        let back: EndSessionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }
}
