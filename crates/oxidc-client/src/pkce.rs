//! PKCE (Proof Key for Code Exchange) support.
//!
//! Implements the client side of RFC 7636: generating a high-entropy code
//! verifier and deriving the challenge sent with the authorization request.
//! The default challenge method is S256; `plain` is only used when a caller
//! requests it explicitly (for servers that advertise nothing better).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OAuthError, OAuthResult};

/// Minimum verifier length per RFC 7636 §4.1.
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum verifier length per RFC 7636 §4.1.
pub const MAX_VERIFIER_LENGTH: usize = 128;

// =============================================================================
// Challenge method
// =============================================================================

/// PKCE code challenge method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    /// SHA-256 of the verifier, base64url-encoded without padding.
    #[default]
    #[serde(rename = "S256")]
    S256,

    /// The verifier itself. Only for servers that cannot do S256;
    /// must be requested explicitly.
    #[serde(rename = "plain")]
    Plain,
}

impl CodeChallengeMethod {
    /// Parses a challenge method from its wire form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for anything other than `S256` or `plain`.
    pub fn parse(method: &str) -> OAuthResult<Self> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(OAuthError::invalid_argument(format!(
                "unsupported code challenge method {other:?}"
            ))),
        }
    }

    /// Returns the wire form of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Code verifier
// =============================================================================

/// PKCE code verifier.
///
/// A cryptographically random string of 43 to 128 characters drawn from the
/// RFC 3986 unreserved set `[A-Za-z0-9-._~]`. The verifier never appears in
/// the authorization request; it is disclosed only during code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Validates and wraps an existing verifier string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the length is outside 43..=128 or the
    /// string contains characters outside the unreserved set.
    pub fn new(verifier: String) -> OAuthResult<Self> {
        check_verifier(&verifier)?;
        Ok(Self(verifier))
    }

    /// Generates a cryptographically random verifier.
    ///
    /// 32 random bytes, base64url-encoded without padding (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the verifier and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for CodeVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates verifier shape without constructing a [`CodeVerifier`].
///
/// # Errors
///
/// Returns `InvalidArgument` on length or character-set violations.
pub fn check_verifier(verifier: &str) -> OAuthResult<()> {
    let len = verifier.len();
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&len) {
        return Err(OAuthError::invalid_argument(format!(
            "code verifier must be {MIN_VERIFIER_LENGTH}-{MAX_VERIFIER_LENGTH} characters, got {len}"
        )));
    }
    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(OAuthError::invalid_argument(
            "code verifier contains characters outside [A-Za-z0-9-._~]",
        ));
    }
    Ok(())
}

// =============================================================================
// Code challenge
// =============================================================================

/// PKCE code challenge, derived from a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    /// Derives the challenge for a verifier under the given method.
    ///
    /// `S256` computes `BASE64URL(SHA256(ASCII(verifier)))`; `plain`
    /// returns the verifier unchanged.
    #[must_use]
    pub fn derive(verifier: &CodeVerifier, method: CodeChallengeMethod) -> Self {
        match method {
            CodeChallengeMethod::S256 => {
                let mut hasher = Sha256::new();
                hasher.update(verifier.as_str().as_bytes());
                Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
            }
            CodeChallengeMethod::Plain => Self(verifier.as_str().to_string()),
        }
    }

    /// Returns the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the challenge and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for CodeChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_verifier_shape() {
        let verifier = CodeVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        assert!(check_verifier(verifier.as_str()).is_ok());
    }

    #[test]
    fn test_generated_verifiers_are_unique() {
        let a = CodeVerifier::generate();
        let b = CodeVerifier::generate();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_verifier_length_bounds() {
        assert!(CodeVerifier::new("a".repeat(42)).is_err());
        assert!(CodeVerifier::new("a".repeat(43)).is_ok());
        assert!(CodeVerifier::new("a".repeat(128)).is_ok());
        assert!(CodeVerifier::new("a".repeat(129)).is_err());
    }

    #[test]
    fn test_verifier_charset() {
        let valid = "abcXYZ0189-._~".chars().cycle().take(64).collect::<String>();
        assert!(CodeVerifier::new(valid).is_ok());

        let invalid = "a".repeat(42) + "!";
        let result = CodeVerifier::new(invalid);
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_plain_challenge_is_verifier() {
        let verifier = CodeVerifier::generate();
        let challenge = CodeChallenge::derive(&verifier, CodeChallengeMethod::Plain);
        assert_eq!(challenge.as_str(), verifier.as_str());
    }

    #[test]
    fn test_s256_challenge_length() {
        let verifier = CodeVerifier::generate();
        let challenge = CodeChallenge::derive(&verifier, CodeChallengeMethod::S256);
        // SHA-256 digest is 32 bytes, 43 characters in base64url without padding.
        assert_eq!(challenge.as_str().len(), 43);
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier =
            CodeVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string()).unwrap();
        let challenge = CodeChallenge::derive(&verifier, CodeChallengeMethod::S256);
        assert_eq!(
            challenge.as_str(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            CodeChallengeMethod::parse("S256").unwrap(),
            CodeChallengeMethod::S256
        );
        assert_eq!(
            CodeChallengeMethod::parse("plain").unwrap(),
            CodeChallengeMethod::Plain
        );
        assert!(CodeChallengeMethod::parse("S512").is_err());
    }

    #[test]
    fn test_method_default_is_s256() {
        assert_eq!(CodeChallengeMethod::default(), CodeChallengeMethod::S256);
    }

    #[test]
    fn test_method_serde_wire_form() {
        assert_eq!(
            serde_json::to_string(&CodeChallengeMethod::S256).unwrap(),
            "\"S256\""
        );
        assert_eq!(
            serde_json::to_string(&CodeChallengeMethod::Plain).unwrap(),
            "\"plain\""
        );
    }
}
