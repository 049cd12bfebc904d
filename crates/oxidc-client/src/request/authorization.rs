//! Authorization endpoint request.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ServiceConfiguration;
use crate::error::{OAuthError, OAuthResult};
use crate::params::{self, AdditionalParameters};
use crate::pkce::{CodeChallenge, CodeChallengeMethod, CodeVerifier};

use super::generate_state;

/// The `response_type` for the authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Parameter names the authorization request claims for itself.
/// Additional parameters may not shadow these.
const RESERVED_PARAMETERS: &[&str] = &[
    "client_id",
    "response_type",
    "redirect_uri",
    "scope",
    "state",
    "nonce",
    "response_mode",
    "code_challenge",
    "code_challenge_method",
];

/// How the authorization response is delivered on the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Parameters in the query component.
    Query,
    /// Parameters in the fragment component.
    Fragment,
}

impl ResponseMode {
    /// Returns the wire form of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to the authorization endpoint (RFC 6749 §4.1.1).
///
/// Built through [`AuthorizationRequest::builder`]; immutable once built.
/// The `state` field doubles as the correlation key under which the request
/// is registered while the browser round-trip is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Endpoints this request was built against.
    pub configuration: ServiceConfiguration,

    /// The client identifier.
    pub client_id: String,

    /// The `response_type` parameter, e.g. [`RESPONSE_TYPE_CODE`].
    pub response_type: String,

    /// Where the authorization server redirects back to.
    pub redirect_uri: Url,

    /// Space-delimited scope string, if any scopes were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// CSRF/correlation token; auto-generated when not supplied.
    pub state: String,

    /// OIDC nonce, bound into the identity token when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Explicit response mode, if the default for the response type is not
    /// wanted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,

    /// PKCE verifier held back for the code exchange. Never sent on the
    /// authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<CodeVerifier>,

    /// PKCE challenge derived from the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<CodeChallenge>,

    /// Method the challenge was derived with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// Caller-supplied parameters outside the protocol set.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_parameters: AdditionalParameters,
}

impl AuthorizationRequest {
    /// Starts building an authorization request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
    ) -> AuthorizationRequestBuilder {
        AuthorizationRequestBuilder {
            configuration,
            client_id: client_id.into(),
            response_type: None,
            redirect_uri: None,
            scopes: Vec::new(),
            state: None,
            nonce: None,
            response_mode: None,
            code_verifier: None,
            code_challenge_method: CodeChallengeMethod::default(),
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// The canonical parameter set of this request.
    ///
    /// Pure and deterministic: repeated calls on the same request yield
    /// identical maps.
    #[must_use]
    pub fn to_parameters(&self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("client_id".to_string(), self.client_id.clone());
        parameters.insert("response_type".to_string(), self.response_type.clone());
        parameters.insert("redirect_uri".to_string(), self.redirect_uri.to_string());
        if let Some(scope) = &self.scope {
            parameters.insert("scope".to_string(), scope.clone());
        }
        parameters.insert("state".to_string(), self.state.clone());
        if let Some(nonce) = &self.nonce {
            parameters.insert("nonce".to_string(), nonce.clone());
        }
        if let Some(mode) = self.response_mode {
            parameters.insert("response_mode".to_string(), mode.as_str().to_string());
        }
        if let Some(challenge) = &self.code_challenge {
            parameters.insert("code_challenge".to_string(), challenge.as_str().to_string());
            let method = self.code_challenge_method.unwrap_or_default();
            parameters.insert(
                "code_challenge_method".to_string(),
                method.as_str().to_string(),
            );
        }
        for (key, value) in &self.additional_parameters {
            parameters.insert(key.clone(), value.clone());
        }
        parameters
    }

    /// The browser-navigable authorization URI.
    #[must_use]
    pub fn request_uri(&self) -> Url {
        let mut url = self.configuration.authorization_endpoint.clone();
        url.query_pairs_mut().extend_pairs(self.to_parameters());
        url
    }

    /// The response mode the redirect will actually use: the explicit mode
    /// if one was set, else the RFC default for the response type (`query`
    /// for the code flow, `fragment` when a token is issued directly).
    #[must_use]
    pub fn effective_response_mode(&self) -> ResponseMode {
        if let Some(mode) = self.response_mode {
            return mode;
        }
        let issues_token = self
            .response_type
            .split_ascii_whitespace()
            .any(|part| part == "token" || part == "id_token");
        if issues_token {
            ResponseMode::Fragment
        } else {
            ResponseMode::Query
        }
    }
}

/// Builder for [`AuthorizationRequest`].
#[derive(Debug)]
pub struct AuthorizationRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    response_type: Option<String>,
    redirect_uri: Option<Url>,
    scopes: Vec<String>,
    state: Option<String>,
    nonce: Option<String>,
    response_mode: Option<ResponseMode>,
    code_verifier: Option<CodeVerifier>,
    code_challenge_method: CodeChallengeMethod,
    additional_parameters: AdditionalParameters,
}

impl AuthorizationRequestBuilder {
    /// Sets the response type, e.g. [`RESPONSE_TYPE_CODE`].
    #[must_use]
    pub fn response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: Url) -> Self {
        self.redirect_uri = Some(redirect_uri);
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

    /// Supplies an explicit state token instead of the generated one.
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the OIDC nonce.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Forces a response mode instead of the response type's default.
    #[must_use]
    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    /// Attaches a PKCE verifier; the challenge is derived at build time
    /// with S256 unless [`code_challenge_method`](Self::code_challenge_method)
    /// says otherwise.
    #[must_use]
    pub fn code_verifier(mut self, verifier: CodeVerifier) -> Self {
        self.code_verifier = Some(verifier);
        self
    }

    /// Overrides the challenge method. `plain` must be requested this way;
    /// it is never the default.
    #[must_use]
    pub fn code_challenge_method(mut self, method: CodeChallengeMethod) -> Self {
        self.code_challenge_method = method;
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
    /// Returns `InvalidState` when the response type or redirect URI is
    /// missing, and `InvalidArgument` for bad scopes or reserved
    /// additional-parameter names.
    pub fn build(self) -> OAuthResult<AuthorizationRequest> {
        let response_type = self
            .response_type
            .filter(|rt| !rt.is_empty())
            .ok_or_else(|| OAuthError::invalid_state("authorization request needs a response type"))?;
        let redirect_uri = self
            .redirect_uri
            .ok_or_else(|| OAuthError::invalid_state("authorization request needs a redirect URI"))?;

        params::ensure_no_reserved_keys(&self.additional_parameters, RESERVED_PARAMETERS)?;

        let scope = match params::scopes_to_string(&self.scopes)? {
            joined if joined.is_empty() => None,
            joined => Some(joined),
        };

        let (code_challenge, code_challenge_method) = match &self.code_verifier {
            Some(verifier) => (
                Some(CodeChallenge::derive(verifier, self.code_challenge_method)),
                Some(self.code_challenge_method),
            ),
            None => (None, None),
        };

        Ok(AuthorizationRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            response_type,
            redirect_uri,
            scope,
            state: self.state.unwrap_or_else(generate_state),
            nonce: self.nonce,
            response_mode: self.response_mode,
            code_verifier: self.code_verifier,
            code_challenge,
            code_challenge_method,
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
    }

    fn redirect() -> Url {
        Url::parse("https://app.example.com/callback").unwrap()
    }

    #[test]
    fn test_build_minimal() {
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .build()
            .unwrap();

        assert_eq!(request.client_id, "my-app");
        assert_eq!(request.response_type, "code");
        assert_eq!(request.state.len(), 22);
        assert!(request.scope.is_none());
        assert!(request.code_challenge.is_none());
    }

    #[test]
    fn test_build_requires_response_type() {
        let result = AuthorizationRequest::builder(configuration(), "my-app")
            .redirect_uri(redirect())
            .build();
        assert!(matches!(result, Err(OAuthError::InvalidState { .. })));
    }

    #[test]
    fn test_build_requires_redirect_uri() {
        let result = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .build();
        assert!(matches!(result, Err(OAuthError::InvalidState { .. })));
    }

    #[test]
    fn test_explicit_state_is_kept() {
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .state("caller-state")
            .build()
            .unwrap();
        assert_eq!(request.state, "caller-state");
    }

    #[test]
    fn test_to_parameters_is_deterministic() {
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .scopes(["openid", "profile"])
            .nonce("n-1")
            .additional_parameter("prompt", "consent")
            .build()
            .unwrap();

        assert_eq!(request.to_parameters(), request.to_parameters());
    }

    #[test]
    fn test_pkce_parameters_present() {
        let verifier = CodeVerifier::generate();
        let expected = CodeChallenge::derive(&verifier, CodeChallengeMethod::S256);

        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .code_verifier(verifier)
            .build()
            .unwrap();

        let parameters = request.to_parameters();
        assert_eq!(
            parameters.get("code_challenge"),
            Some(&expected.as_str().to_string())
        );
        assert_eq!(
            parameters.get("code_challenge_method"),
            Some(&"S256".to_string())
        );
        // The verifier itself stays out of the front channel.
        assert!(!parameters.contains_key("code_verifier"));
    }

    #[test]
    fn test_plain_method_must_be_explicit() {
        let verifier = CodeVerifier::generate();
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .code_verifier(verifier.clone())
            .code_challenge_method(CodeChallengeMethod::Plain)
            .build()
            .unwrap();

        let parameters = request.to_parameters();
        assert_eq!(
            parameters.get("code_challenge"),
            Some(&verifier.as_str().to_string())
        );
        assert_eq!(
            parameters.get("code_challenge_method"),
            Some(&"plain".to_string())
        );
    }

    #[test]
    fn test_reserved_additional_parameter_rejected() {
        let result = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .additional_parameter("state", "forged")
            .build();
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_request_uri_carries_parameters() {
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .scopes(["openid"])
            .build()
            .unwrap();

        let uri = request.request_uri();
        assert_eq!(uri.host_str(), Some("auth.example.com"));
        let query: Vec<(String, String)> = uri
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("client_id".to_string(), "my-app".to_string())));
        assert!(query.contains(&("scope".to_string(), "openid".to_string())));
        assert!(query.contains(&("state".to_string(), request.state.clone())));
    }

    #[test]
    fn test_effective_response_mode_defaults() {
        let code = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type("code")
            .redirect_uri(redirect())
            .build()
            .unwrap();
        assert_eq!(code.effective_response_mode(), ResponseMode::Query);

        let implicit = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type("id_token token")
            .redirect_uri(redirect())
            .build()
            .unwrap();
        assert_eq!(implicit.effective_response_mode(), ResponseMode::Fragment);

        let forced = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type("code")
            .redirect_uri(redirect())
            .response_mode(ResponseMode::Fragment)
            .build()
            .unwrap();
        assert_eq!(forced.effective_response_mode(), ResponseMode::Fragment);
    }

    #[test]
    fn test_serde_roundtrip_preserves_all_fields() {
        let request = AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(redirect())
            .scopes(["openid", "email"])
            .nonce("n-1")
            .code_verifier(CodeVerifier::generate())
            .additional_parameter("audience", "https://api.example.com")
            .build()
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        let back: AuthorizationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
        assert_eq!(
            back.additional_parameters.get("audience"),
            Some(&"https://api.example.com".to_string())
        );
    }
}
