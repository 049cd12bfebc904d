//! Structural identity-token parsing.
//!
//! Decodes the claim set of a compact identity token without verifying its
//! signature. Signature verification requires key material and algorithm
//! policy that live outside this engine; callers must layer it on before
//! trusting any claim parsed here.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::{OAuthError, OAuthResult};

/// Parsed, unverified identity-token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer identifier (`iss`).
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Subject identifier (`sub`).
    #[serde(rename = "sub")]
    pub subject: String,

    /// Audience(s) the token is intended for (`aud`).
    /// A single-string audience is normalized to a one-element list.
    #[serde(rename = "aud", deserialize_with = "deserialize_audience")]
    pub audience: Vec<String>,

    /// Expiration time as seconds since the Unix epoch (`exp`).
    #[serde(rename = "exp")]
    pub expiration: i64,

    /// Issue time as seconds since the Unix epoch (`iat`).
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Nonce echoed from the authorization request, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Authorized party (`azp`), when present.
    #[serde(rename = "azp", default, skip_serializing_if = "Option::is_none")]
    pub authorized_party: Option<String>,

    /// Every claim not covered by a named field, kept verbatim.
    #[serde(flatten)]
    pub additional_claims: Map<String, Value>,
}

impl IdTokenClaims {
    /// Returns the expiration instant.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if `exp` is outside the representable range.
    pub fn expiration_time(&self) -> OAuthResult<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.expiration)
            .map_err(|_| OAuthError::malformed_token("exp claim is out of range"))
    }

    /// Returns `true` if the token's `exp` lies in the past of the given
    /// clock. A structural check only; an unexpired token is still
    /// untrusted until its signature is verified.
    #[must_use]
    pub fn has_expired(&self, clock: &dyn Clock) -> bool {
        clock.now_utc().unix_timestamp() > self.expiration
    }
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Audience::deserialize(deserializer)? {
        Audience::One(audience) => vec![audience],
        Audience::Many(audiences) => audiences,
    })
}

/// Parses a compact identity token into its claim set.
///
/// The token is split on `.`; the header section must decode to
/// well-formed JSON (it is not otherwise interpreted), and the claims
/// section must carry `iss`, `sub`, `aud`, and numeric `exp`/`iat`.
/// Any trailing signature section is ignored; no verification happens here.
///
/// # Errors
///
/// Returns `MalformedToken` when the token has fewer than two sections, a
/// section is not base64url, or a mandatory claim is missing or mistyped.
pub fn parse_id_token(token: &str) -> OAuthResult<IdTokenClaims> {
    let mut sections = token.split('.');
    let (Some(header), Some(claims)) = (sections.next(), sections.next()) else {
        return Err(OAuthError::malformed_token(
            "identity token has fewer than two sections",
        ));
    };
    if claims.is_empty() {
        return Err(OAuthError::malformed_token(
            "identity token has fewer than two sections",
        ));
    }

    // The header is decoded only to confirm well-formedness.
    let header_json = decode_section(header, "header")?;
    serde_json::from_slice::<Value>(&header_json)
        .map_err(|e| OAuthError::malformed_token(format!("header is not valid JSON: {e}")))?;

    let claims_json = decode_section(claims, "claims")?;
    serde_json::from_slice(&claims_json)
        .map_err(|e| OAuthError::malformed_token(format!("claims section is invalid: {e}")))
}

fn decode_section(section: &str, name: &str) -> OAuthResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(section)
        .map_err(|_| OAuthError::malformed_token(format!("{name} section is not base64url")))
}
