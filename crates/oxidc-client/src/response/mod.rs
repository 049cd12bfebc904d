//! Response models and the redirect dispatcher.
//!
//! Front-channel responses arrive as redirect URIs; back-channel responses
//! as JSON bodies. Either way, classification follows a fixed order:
//!
//! 1. state presence and equality with the issuing request,
//! 2. the `error` parameter,
//! 3. success parsing.
//!
//! The order matters: a payload whose state does not match cannot be
//! trusted as originating from the expected flow, so a mismatched state
//! wins over any error the payload also carries.

mod authorization;
mod device;
mod end_session;
mod token;

pub use authorization::AuthorizationResponse;
pub use device::DeviceAuthorizationResponse;
pub use end_session::EndSessionResponse;
pub use token::TokenResponse;

use indexmap::IndexMap;
use serde_json::Value;
use url::Url;
use url::form_urlencoded;

use crate::error::{ErrorResponse, OAuthError, OAuthResult};
use crate::request::{AuthorizationRequest, EndSessionRequest, Request, ResponseMode};
use crate::store::PendingRequestStore;

/// Extracts response parameters from a redirect URI.
///
/// The query component is parsed strictly (it was produced by a server);
/// the fragment component tolerates malformed `key=value` pairs; they are
/// skipped with a warning rather than failing the whole parse, so a
/// damaged fragment can still deliver a usable error payload.
#[must_use]
pub fn parse_redirect_parameters(uri: &Url, mode: ResponseMode) -> IndexMap<String, String> {
    match mode {
        ResponseMode::Query => uri
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect(),
        ResponseMode::Fragment => parse_fragment(uri.fragment().unwrap_or_default()),
    }
}

fn parse_fragment(fragment: &str) -> IndexMap<String, String> {
    let mut parameters = IndexMap::new();
    for pair in fragment.split('&') {
        if pair.is_empty() {
            continue;
        }
        if !pair.contains('=') {
            tracing::warn!(pair = %pair, "Skipping malformed fragment pair");
            continue;
        }
        if let Some((key, value)) = form_urlencoded::parse(pair.as_bytes()).next() {
            parameters.insert(key.into_owned(), value.into_owned());
        }
    }
    parameters
}

fn error_from_parameters(parameters: &IndexMap<String, String>) -> Option<ErrorResponse> {
    parameters.get("error").map(|error| ErrorResponse {
        error: error.clone(),
        error_description: parameters.get("error_description").cloned(),
        error_uri: parameters.get("error_uri").cloned(),
    })
}

fn check_state(expected: &str, parameters: &IndexMap<String, String>) -> OAuthResult<()> {
    match parameters.get("state") {
        Some(received) if received == expected => Ok(()),
        received => Err(OAuthError::state_mismatch(expected, received.cloned())),
    }
}

/// Classifies a redirect against the authorization request that issued it.
///
/// # Errors
///
/// `StateMismatch` when the redirect's state is absent or differs from the
/// request's (checked before anything else), `AuthorizationResponse` when
/// the server reported an error.
pub fn dispatch_authorization_redirect(
    request: &AuthorizationRequest,
    redirect_uri: &Url,
) -> OAuthResult<AuthorizationResponse> {
    let parameters = parse_redirect_parameters(redirect_uri, request.effective_response_mode());
    check_state(&request.state, &parameters)?;
    if let Some(error) = error_from_parameters(&parameters) {
        return Err(error.into_authorization_error());
    }
    Ok(AuthorizationResponse::from_redirect_parameters(
        request.clone(),
        parameters,
    ))
}

/// Classifies a redirect against the end-session request that issued it.
///
/// # Errors
///
/// Same order and classification as [`dispatch_authorization_redirect`].
pub fn dispatch_end_session_redirect(
    request: &EndSessionRequest,
    redirect_uri: &Url,
) -> OAuthResult<EndSessionResponse> {
    let parameters = parse_redirect_parameters(redirect_uri, ResponseMode::Query);
    check_state(&request.state, &parameters)?;
    if let Some(error) = error_from_parameters(&parameters) {
        return Err(error.into_authorization_error());
    }
    Ok(EndSessionResponse::new(request.clone()))
}

// =============================================================================
// Store-correlated dispatch
// =============================================================================

/// A response matched back to its pending request through the correlation
/// store, along with the continuation registered when the request was
/// dispatched.
#[derive(Debug, Clone)]
pub enum DispatchedResponse {
    /// An authorization round-trip completed.
    Authorization {
        /// The parsed response, bound to its originating request.
        response: AuthorizationResponse,
        /// The opaque continuation registered with the request.
        continuation: Value,
    },
    /// An end-session round-trip completed.
    EndSession {
        /// The parsed response, bound to its originating request.
        response: EndSessionResponse,
        /// The opaque continuation registered with the request.
        continuation: Value,
    },
}

/// Correlates an incoming redirect with the pending request that produced
/// it, consuming the correlation entry.
///
/// The state token is read from the query component first, then from the
/// fragment. Consumption is single-use: replaying the same redirect
/// reports `NotFound`.
///
/// # Errors
///
/// `InvalidArgument` when the redirect carries no state at all, `NotFound`
/// when no pending request is registered under the state, and the
/// [`dispatch_authorization_redirect`] classifications after that.
pub async fn dispatch_pending_redirect(
    store: &dyn PendingRequestStore,
    redirect_uri: &Url,
) -> OAuthResult<DispatchedResponse> {
    let state = parse_redirect_parameters(redirect_uri, ResponseMode::Query)
        .shift_remove("state")
        .or_else(|| {
            parse_redirect_parameters(redirect_uri, ResponseMode::Fragment).shift_remove("state")
        })
        .ok_or_else(|| {
            OAuthError::invalid_argument("redirect URI carries no state parameter")
        })?;

    let entry = store.consume(&state).await?;
    match entry.request {
        Request::Authorization(request) => {
            let response = dispatch_authorization_redirect(&request, redirect_uri)?;
            Ok(DispatchedResponse::Authorization {
                response,
                continuation: entry.continuation,
            })
        }
        Request::EndSession(request) => {
            let response = dispatch_end_session_redirect(&request, redirect_uri)?;
            Ok(DispatchedResponse::EndSession {
                response,
                continuation: entry.continuation,
            })
        }
        Request::DeviceAuthorization(_) | Request::Token(_) => Err(OAuthError::invalid_state(
            "pending entry is not a front-channel request",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfiguration;
    use crate::error::AuthorizationErrorCode;
    use crate::request::RESPONSE_TYPE_CODE;

    fn configuration() -> ServiceConfiguration {
        ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
    }

    fn code_request(state: &str) -> AuthorizationRequest {
        AuthorizationRequest::builder(configuration(), "my-app")
            .response_type(RESPONSE_TYPE_CODE)
            .redirect_uri(Url::parse("https://app.example.com/callback").unwrap())
            .state(state)
            .build()
            .unwrap()
    }

    #[test]
    fn test_query_parameters_parsed() {
        let uri = Url::parse("https://app.example.com/callback?code=abc&state=s1").unwrap();
        let parameters = parse_redirect_parameters(&uri, ResponseMode::Query);
        assert_eq!(parameters.get("code"), Some(&"abc".to_string()));
        assert_eq!(parameters.get("state"), Some(&"s1".to_string()));
    }

    #[test]
    fn test_fragment_parameters_parsed() {
        let uri =
            Url::parse("https://app.example.com/callback#access_token=tok&state=s1&scope=openid")
                .unwrap();
        let parameters = parse_redirect_parameters(&uri, ResponseMode::Fragment);
        assert_eq!(parameters.get("access_token"), Some(&"tok".to_string()));
        assert_eq!(parameters.get("scope"), Some(&"openid".to_string()));
    }

    #[test]
    fn test_fragment_skips_malformed_pairs() {
        let uri = Url::parse("https://app.example.com/callback#garbage&state=s1&also-garbage")
            .unwrap();
        let parameters = parse_redirect_parameters(&uri, ResponseMode::Fragment);
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters.get("state"), Some(&"s1".to_string()));
    }

    #[test]
    fn test_fragment_decodes_percent_escapes() {
        let uri = Url::parse(
            "https://app.example.com/callback#state=s1&error_description=user%20said%20no",
        )
        .unwrap();
        let parameters = parse_redirect_parameters(&uri, ResponseMode::Fragment);
        assert_eq!(
            parameters.get("error_description"),
            Some(&"user said no".to_string())
        );
    }

    #[test]
    fn test_success_dispatch() {
        let request = code_request("s1");
        let uri = Url::parse("https://app.example.com/callback?code=abc&state=s1").unwrap();

        let response = dispatch_authorization_redirect(&request, &uri).unwrap();
        assert_eq!(response.authorization_code, Some("abc".to_string()));
        assert_eq!(response.state, "s1");
    }

    #[test]
    fn test_error_dispatch() {
        let request = code_request("s1");
        let uri = Url::parse(
            "https://app.example.com/callback?state=s1&error=access_denied&error_description=nope",
        )
        .unwrap();

        let result = dispatch_authorization_redirect(&request, &uri);
        match result {
            Err(OAuthError::AuthorizationResponse {
                code, description, ..
            }) => {
                assert_eq!(code, AuthorizationErrorCode::AccessDenied);
                assert_eq!(description, Some("nope".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_state_mismatch_wins_over_error() {
        let request = code_request("expected");
        let uri = Url::parse(
            "https://app.example.com/callback?state=forged&error=access_denied",
        )
        .unwrap();

        let result = dispatch_authorization_redirect(&request, &uri);
        match result {
            Err(OAuthError::StateMismatch { expected, received }) => {
                assert_eq!(expected, "expected");
                assert_eq!(received, Some("forged".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_state_is_a_mismatch() {
        let request = code_request("expected");
        let uri = Url::parse("https://app.example.com/callback?code=abc").unwrap();

        let result = dispatch_authorization_redirect(&request, &uri);
        assert!(matches!(
            result,
            Err(OAuthError::StateMismatch { received: None, .. })
        ));
    }

    #[test]
    fn test_end_session_dispatch() {
        let configuration = configuration()
            .with_end_session_endpoint(Url::parse("https://auth.example.com/logout").unwrap());
        let request = EndSessionRequest::builder(configuration, "my-app")
            .state("logout-1")
            .build()
            .unwrap();

        let uri = Url::parse("https://app.example.com/bye?state=logout-1").unwrap();
        let response = dispatch_end_session_redirect(&request, &uri).unwrap();
        assert_eq!(response.request.state, "logout-1");

        let bad = Url::parse("https://app.example.com/bye?state=other").unwrap();
        assert!(matches!(
            dispatch_end_session_redirect(&request, &bad),
            Err(OAuthError::StateMismatch { .. })
        ));
    }

    mod pending {
        use super::*;
        use crate::store::{InMemoryPendingRequestStore, PendingRequest};
        use serde_json::json;

        #[tokio::test]
        async fn test_dispatch_pending_redirect_consumes_entry() {
            let store = InMemoryPendingRequestStore::new();
            let request = code_request("s1");
            store
                .register(PendingRequest::new(
                    request.clone().into(),
                    json!({"tab": 7}),
                ))
                .await
                .unwrap();

            let uri = Url::parse("https://app.example.com/callback?code=abc&state=s1").unwrap();
            let dispatched = dispatch_pending_redirect(&store, &uri).await.unwrap();
            match dispatched {
                DispatchedResponse::Authorization {
                    response,
                    continuation,
                } => {
                    assert_eq!(response.authorization_code, Some("abc".to_string()));
                    assert_eq!(continuation, json!({"tab": 7}));
                }
                other => panic!("unexpected dispatch: {other:?}"),
            }

            // Replaying the redirect finds nothing: the entry was consumed.
            let replay = dispatch_pending_redirect(&store, &uri).await;
            assert!(matches!(replay, Err(OAuthError::NotFound { .. })));
        }

        #[tokio::test]
        async fn test_dispatch_pending_redirect_without_state() {
            let store = InMemoryPendingRequestStore::new();
            let uri = Url::parse("https://app.example.com/callback?code=abc").unwrap();
            let result = dispatch_pending_redirect(&store, &uri).await;
            assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
        }

        #[tokio::test]
        async fn test_dispatch_pending_redirect_reads_fragment_state() {
            let store = InMemoryPendingRequestStore::new();
            let request = AuthorizationRequest::builder(configuration(), "my-app")
                .response_type("id_token token")
                .redirect_uri(Url::parse("https://app.example.com/callback").unwrap())
                .state("frag-1")
                .build()
                .unwrap();
            store
                .register(PendingRequest::new(request.into(), Value::Null))
                .await
                .unwrap();

            let uri = Url::parse(
                "https://app.example.com/callback#access_token=tok&token_type=Bearer&state=frag-1",
            )
            .unwrap();
            let dispatched = dispatch_pending_redirect(&store, &uri).await.unwrap();
            match dispatched {
                DispatchedResponse::Authorization { response, .. } => {
                    assert_eq!(response.access_token, Some("tok".to_string()));
                }
                other => panic!("unexpected dispatch: {other:?}"),
            }
        }
    }
}
