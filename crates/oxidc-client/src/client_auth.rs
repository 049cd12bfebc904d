//! Client authentication for the token and device-authorization endpoints.
//!
//! The engine supports the RFC 6749 client authentication methods that do
//! not require asymmetric keys:
//!
//! - `none` - public clients; `client_id` travels in the request body only
//! - `client_secret_basic` - `Authorization: Basic base64(id:secret)`
//! - `client_secret_post` - `client_id` and `client_secret` body parameters
//!
//! Each variant injects credentials through exactly one channel: headers or
//! body parameters, never both.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Client authentication strategy applied to an outbound token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientAuthentication {
    /// No authentication; used by public clients.
    None,

    /// Shared secret via the HTTP `Authorization` header.
    ClientSecretBasic {
        /// The client secret.
        client_secret: String,
    },

    /// Shared secret via `client_id`/`client_secret` body parameters.
    ClientSecretPost {
        /// The client secret.
        client_secret: String,
    },
}

impl ClientAuthentication {
    /// Returns the OIDC `token_endpoint_auth_method` name of this strategy.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic { .. } => "client_secret_basic",
            Self::ClientSecretPost { .. } => "client_secret_post",
        }
    }

    /// Headers this strategy contributes to the token request.
    ///
    /// Only `client_secret_basic` produces a header. Client id and secret
    /// are form-encoded before the base64 step, per RFC 6749 §2.3.1.
    #[must_use]
    pub fn request_headers(&self, client_id: &str) -> Vec<(String, String)> {
        match self {
            Self::ClientSecretBasic { client_secret } => {
                let credentials = format!(
                    "{}:{}",
                    form_encode_component(client_id),
                    form_encode_component(client_secret)
                );
                vec![(
                    "Authorization".to_string(),
                    format!("Basic {}", STANDARD.encode(credentials)),
                )]
            }
            Self::None | Self::ClientSecretPost { .. } => Vec::new(),
        }
    }

    /// Body parameters this strategy contributes to the token request.
    ///
    /// Only `client_secret_post` produces body parameters.
    #[must_use]
    pub fn body_parameters(&self, client_id: &str) -> Vec<(String, String)> {
        match self {
            Self::ClientSecretPost { client_secret } => vec![
                ("client_id".to_string(), client_id.to_string()),
                ("client_secret".to_string(), client_secret.to_string()),
            ],
            Self::None | Self::ClientSecretBasic { .. } => Vec::new(),
        }
    }
}

fn form_encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
