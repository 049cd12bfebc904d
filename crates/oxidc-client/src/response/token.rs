//! Token endpoint response (RFC 6749 §5.1).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::{ErrorResponse, OAuthError, OAuthResult};
use crate::id_token::{self, IdTokenClaims};
use crate::request::TokenRequest;

/// A successful answer from the token endpoint.
///
/// Bound to the token request that produced it. The `expires_in` lifetime
/// from the wire is converted into an absolute instant at parse time, so
/// later expiry checks need only a clock, not the original receive time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The request this response answers.
    pub request: TokenRequest,

    /// The issued access token.
    pub access_token: String,

    /// Token type, `Bearer` in practice.
    pub token_type: String,

    /// When the access token expires, if the server said.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub access_token_expires_at: Option<OffsetDateTime>,

    /// Refresh token, when one was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Identity token, when the `openid` scope was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scope, when it differs from the requested one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Every response member outside the protocol set, kept verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(flatten)]
    additional_parameters: Map<String, Value>,
}

impl TokenResponse {
    /// Parses a token endpoint body against its request.
    ///
    /// An `error` member classifies as a token-endpoint error before any
    /// success parsing; the device-flow codes land here too, so a polling
    /// caller matches on [`OAuthError::TokenResponse`] to decide whether
    /// to keep polling.
    ///
    /// # Errors
    ///
    /// `TokenResponse` for error bodies, `InvalidArgument` for bodies that
    /// are not valid JSON or miss a mandatory member.
    pub fn from_json(request: TokenRequest, body: &str, clock: &dyn Clock) -> OAuthResult<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            OAuthError::invalid_argument(format!("token response is not valid JSON: {e}"))
        })?;

        if value.get("error").is_some() {
            let error: ErrorResponse = serde_json::from_value(value).map_err(|e| {
                OAuthError::invalid_argument(format!("malformed error body: {e}"))
            })?;
            return Err(error.into_token_error());
        }

        let payload: TokenPayload = serde_json::from_value(value).map_err(|e| {
            OAuthError::invalid_argument(format!("malformed token response: {e}"))
        })?;

        Ok(Self {
            request,
            access_token: payload.access_token,
            token_type: payload.token_type,
            access_token_expires_at: payload
                .expires_in
                .map(|seconds| clock.now_utc() + time::Duration::seconds(seconds)),
            refresh_token: payload.refresh_token,
            id_token: payload.id_token,
            scope: payload.scope,
            additional_parameters: payload.additional_parameters,
        })
    }

    /// Returns `true` once the access token has expired. Always `false`
    /// when the server gave no lifetime.
    #[must_use]
    pub fn has_access_token_expired(&self, clock: &dyn Clock) -> bool {
        self.access_token_expires_at
            .is_some_and(|expires_at| clock.now_utc() > expires_at)
    }

    /// Structurally parses the identity token carried by this response.
    ///
    /// The claims come back unverified; signature verification is the
    /// caller's job before trusting them.
    ///
    /// # Errors
    ///
    /// `InvalidState` when the response carries no identity token,
    /// `MalformedToken` when it does not decode.
    pub fn id_token_claims(&self) -> OAuthResult<IdTokenClaims> {
        let token = self.id_token.as_deref().ok_or_else(|| {
            OAuthError::invalid_state("token response carries no identity token")
        })?;
        id_token::parse_id_token(token)
    }
}
