//! Parameter encoding and decoding.
//!
//! Scope lists, space-delimited strings, `application/x-www-form-urlencoded`
//! bodies, and the guard that keeps caller-supplied additional parameters
//! away from protocol-reserved names. Each request type enumerates its own
//! reserved set; the lists are intentionally independent.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::error::{OAuthError, OAuthResult};

/// Additional, non-protocol parameters attached to a request.
///
/// Keys are unique; insertion order is preserved so canonical parameter
/// sets stay deterministic.
pub type AdditionalParameters = IndexMap<String, String>;

/// Joins a scope set into the space-delimited wire form.
///
/// An empty set produces an empty string. Round-trips with
/// [`string_to_scopes`] for sets without duplicate or empty members.
///
/// # Errors
///
/// Returns `InvalidArgument` if any element is empty or contains
/// whitespace (which would corrupt the delimiting).
pub fn scopes_to_string<I, S>(scopes: I) -> OAuthResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for scope in scopes {
        let scope = scope.as_ref();
        if scope.is_empty() {
            return Err(OAuthError::invalid_argument("scope element is empty"));
        }
        if scope.contains(char::is_whitespace) {
            return Err(OAuthError::invalid_argument(format!(
                "scope element {scope:?} contains whitespace"
            )));
        }
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(scope);
    }
    Ok(joined)
}

/// Splits a space-delimited scope string into a set.
///
/// Empty segments (repeated delimiters, leading/trailing spaces) are
/// dropped, so the result never contains the empty scope.
#[must_use]
pub fn string_to_scopes(scope: &str) -> BTreeSet<String> {
    scope
        .split_ascii_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Encodes parameters as an `application/x-www-form-urlencoded` body.
///
/// Values are percent-encoded; keys are emitted verbatim (protocol
/// parameter names are plain ASCII identifiers). An empty map produces an
/// empty string.
#[must_use]
pub fn form_urlencode(parameters: &IndexMap<String, String>) -> String {
    let mut body = String::new();
    for (key, value) in parameters {
        if !body.is_empty() {
            body.push('&');
        }
        body.push_str(key);
        body.push('=');
        body.extend(form_urlencoded::byte_serialize(value.as_bytes()));
    }
    body
}

/// Rejects additional parameters that shadow protocol-reserved names.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the first offending key.
pub fn ensure_no_reserved_keys(
    parameters: &AdditionalParameters,
    reserved: &[&str],
) -> OAuthResult<()> {
    for key in parameters.keys() {
        if reserved.contains(&key.as_str()) {
            return Err(OAuthError::invalid_argument(format!(
                "additional parameter {key:?} shadows a protocol parameter"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_to_string_joins_with_spaces() {
        let scopes = BTreeSet::from(["openid".to_string(), "profile".to_string()]);
        let joined = scopes_to_string(&scopes).unwrap();
        assert_eq!(joined, "openid profile");
    }

    #[test]
    fn test_scopes_to_string_empty_set() {
        let scopes: BTreeSet<String> = BTreeSet::new();
        assert_eq!(scopes_to_string(&scopes).unwrap(), "");
    }

    #[test]
    fn test_scopes_to_string_rejects_empty_element() {
        let result = scopes_to_string(["openid", ""]);
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_scopes_to_string_rejects_whitespace() {
        let result = scopes_to_string(["openid profile"]);
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_scope_round_trip() {
        let scopes = BTreeSet::from([
            "openid".to_string(),
            "profile".to_string(),
            "email".to_string(),
        ]);
        let joined = scopes_to_string(&scopes).unwrap();
        assert_eq!(string_to_scopes(&joined), scopes);
    }

    #[test]
    fn test_string_to_scopes_collapses_delimiters() {
        let scopes = string_to_scopes("  openid   profile ");
        assert_eq!(
            scopes,
            BTreeSet::from(["openid".to_string(), "profile".to_string()])
        );
    }

    #[test]
    fn test_form_urlencode_empty_map() {
        assert_eq!(form_urlencode(&IndexMap::new()), "");
    }

    #[test]
    fn test_form_urlencode_percent_encodes_values() {
        let mut params = IndexMap::new();
        params.insert(
            "redirect_uri".to_string(),
            "https://app.example.com/cb?x=1".to_string(),
        );
        params.insert("scope".to_string(), "openid profile".to_string());

        let body = form_urlencode(&params);
        assert_eq!(
            body,
            "redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb%3Fx%3D1&scope=openid+profile"
        );
    }

    #[test]
    fn test_form_urlencode_preserves_insertion_order() {
        let mut params = IndexMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());
        assert_eq!(form_urlencode(&params), "b=2&a=1");
    }

    #[test]
    fn test_reserved_key_guard() {
        let mut params = AdditionalParameters::new();
        params.insert("prompt".to_string(), "consent".to_string());
        assert!(ensure_no_reserved_keys(&params, &["client_id", "scope"]).is_ok());

        params.insert("client_id".to_string(), "sneaky".to_string());
        let result = ensure_no_reserved_keys(&params, &["client_id", "scope"]);
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
        assert!(result.unwrap_err().to_string().contains("client_id"));
    }
}
