//! Device authorization response (RFC 8628 §3.2) and polling semantics.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::{ErrorResponse, OAuthError, OAuthResult, TokenErrorCode};
use crate::request::{DeviceAuthorizationRequest, GrantType, TokenRequest};

/// Poll interval to use when the server does not advertise one (RFC 8628
/// §3.5).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Increment applied to the poll interval after a `slow_down` error
/// (RFC 8628 §3.5).
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// A successful answer from the device authorization endpoint.
///
/// Carries the codes for the secondary-device flow and the timing facts
/// the caller's poll loop needs. The polling loop itself (sleeping, calling the
/// transport, feeding errors back into [`next_poll_interval`](Self::next_poll_interval))
/// belongs to the caller; every method here is a pure function of the
/// response and the injected clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// The request this response answers.
    pub request: DeviceAuthorizationRequest,

    /// Code the client polls the token endpoint with.
    pub device_code: String,

    /// Code the user types on the secondary device.
    pub user_code: String,

    /// URI the user visits to enter the user code.
    pub verification_uri: String,

    /// Verification URI with the user code already embedded, when the
    /// server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,

    /// When the device and user codes expire, computed from the server's
    /// `expires_in` at parse time.
    #[serde(with = "time::serde::rfc3339")]
    pub code_expires_at: OffsetDateTime,

    /// Advertised minimum poll interval in seconds, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,

    /// Every response member outside the protocol set, kept verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationPayload {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    expires_in: i64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(flatten)]
    additional_parameters: Map<String, Value>,
}

impl DeviceAuthorizationResponse {
    /// Parses a device authorization endpoint body against its request.
    ///
    /// An `error` member classifies as a token-endpoint error before any
    /// success parsing. The code expiration instant is fixed here, from
    /// the injected clock plus the server's `expires_in`.
    ///
    /// # Errors
    ///
    /// `TokenResponse` for error bodies, `InvalidArgument` for bodies that
    /// are not valid JSON or miss a mandatory member.
    pub fn from_json(
        request: DeviceAuthorizationRequest,
        body: &str,
        clock: &dyn Clock,
    ) -> OAuthResult<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            OAuthError::invalid_argument(format!(
                "device authorization response is not valid JSON: {e}"
            ))
        })?;

        if value.get("error").is_some() {
            let error: ErrorResponse = serde_json::from_value(value).map_err(|e| {
                OAuthError::invalid_argument(format!("malformed error body: {e}"))
            })?;
            return Err(error.into_token_error());
        }

        let payload: DeviceAuthorizationPayload =
            serde_json::from_value(value).map_err(|e| {
                OAuthError::invalid_argument(format!(
                    "malformed device authorization response: {e}"
                ))
            })?;

        Ok(Self {
            request,
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            verification_uri_complete: payload.verification_uri_complete,
            code_expires_at: clock.now_utc() + time::Duration::seconds(payload.expires_in),
            interval: payload.interval,
            additional_parameters: payload.additional_parameters,
        })
    }

    /// Returns `true` once the device and user codes have expired.
    #[must_use]
    pub fn has_code_expired(&self, clock: &dyn Clock) -> bool {
        clock.now_utc() > self.code_expires_at
    }

    /// The interval the caller must wait between token-endpoint polls.
    ///
    /// The advertised interval when present and sane; otherwise
    /// [`DEFAULT_POLL_INTERVAL`]. A zero interval is treated as absent
    /// rather than honored, since it would busy-poll the endpoint.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        match self.interval {
            Some(seconds) if seconds >= 1 => Duration::from_secs(seconds),
            _ => DEFAULT_POLL_INTERVAL,
        }
    }

    /// Adjusts the poll interval after a token-endpoint error, per
    /// RFC 8628 §3.5: `slow_down` adds five seconds, every other code
    /// leaves the interval unchanged (terminal codes end the loop via
    /// [`TokenErrorCode::is_device_flow_retry`]).
    #[must_use]
    pub fn next_poll_interval(&self, current: Duration, code: TokenErrorCode) -> Duration {
        if code == TokenErrorCode::SlowDown {
            current + SLOW_DOWN_INCREMENT
        } else {
            current
        }
    }

    /// Derives the token request that polls for this device grant.
    ///
    /// # Errors
    ///
    /// Propagates builder validation errors.
    pub fn token_request(&self) -> OAuthResult<TokenRequest> {
        TokenRequest::builder(
            self.request.configuration.clone(),
            self.request.client_id.clone(),
        )
        .grant_type(GrantType::DeviceCode)
        .device_code(self.device_code.clone())
        .build()
    }
}
