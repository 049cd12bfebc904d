//! Device authorization request (RFC 8628 §3.1).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::client_auth::ClientAuthentication;
use crate::config::ServiceConfiguration;
use crate::error::{OAuthError, OAuthResult};
use crate::params::{self, AdditionalParameters};

use super::{TransportRequest, form_post};

// The device-authorization endpoint reserves fewer names than the token
// endpoint; the sets are deliberately independent.
const RESERVED_PARAMETERS: &[&str] = &["client_id", "client_secret", "scope"];

/// A request to the device authorization endpoint.
///
/// Starts the RFC 8628 flow: the server answers with a user code to show
/// on a secondary device and a device code to poll the token endpoint with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAuthorizationRequest {
    /// Endpoints this request was built against. The device authorization
    /// endpoint must be present.
    pub configuration: ServiceConfiguration,

    /// The client identifier.
    pub client_id: String,

    /// Space-delimited scope string, if scopes were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Caller-supplied parameters outside the protocol set.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_parameters: AdditionalParameters,
}

impl DeviceAuthorizationRequest {
    /// Starts building a device authorization request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
    ) -> DeviceAuthorizationRequestBuilder {
        DeviceAuthorizationRequestBuilder {
            configuration,
            client_id: client_id.into(),
            scopes: Vec::new(),
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// The canonical parameter set of this request.
    #[must_use]
    pub fn to_parameters(&self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("client_id".to_string(), self.client_id.clone());
        if let Some(scope) = &self.scope {
            parameters.insert("scope".to_string(), scope.clone());
        }
        for (key, value) in &self.additional_parameters {
            parameters.insert(key.clone(), value.clone());
        }
        parameters
    }

    /// The outbound form POST for the transport collaborator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the configuration lost its
    /// device-authorization endpoint, or `InvalidArgument` on credential
    /// conflicts.
    pub fn transport_request(
        &self,
        authentication: &ClientAuthentication,
    ) -> OAuthResult<TransportRequest> {
        let endpoint = self
            .configuration
            .device_authorization_endpoint
            .clone()
            .ok_or_else(|| {
                OAuthError::invalid_state(
                    "service configuration has no device authorization endpoint",
                )
            })?;
        form_post(
            endpoint,
            self.to_parameters(),
            &self.client_id,
            authentication,
        )
    }
}

/// Builder for [`DeviceAuthorizationRequest`].
#[derive(Debug)]
pub struct DeviceAuthorizationRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    scopes: Vec<String>,
    additional_parameters: AdditionalParameters,
}

impl DeviceAuthorizationRequestBuilder {
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
    /// Returns `InvalidState` when the configuration has no
    /// device-authorization endpoint, and `InvalidArgument` for bad scopes
    /// or reserved additional-parameter names.
    pub fn build(self) -> OAuthResult<DeviceAuthorizationRequest> {
        if self.configuration.device_authorization_endpoint.is_none() {
            return Err(OAuthError::invalid_state(
                "service configuration has no device authorization endpoint",
            ));
        }
        params::ensure_no_reserved_keys(&self.additional_parameters, RESERVED_PARAMETERS)?;

        let scope = match params::scopes_to_string(&self.scopes)? {
            joined if joined.is_empty() => None,
            joined => Some(joined),
        };

        Ok(DeviceAuthorizationRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            scope,
            additional_parameters: self.additional_parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn configuration() -> ServiceConfiguration {
        ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
        .with_device_authorization_endpoint(
            Url::parse("https://auth.example.com/device").unwrap(),
        )
    }

    #[test]
    fn test_build_requires_device_endpoint() {
        let bare = ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        );
        let result = DeviceAuthorizationRequest::builder(bare, "tv-app").build();
        assert!(matches!(result, Err(OAuthError::InvalidState { .. })));
    }

    #[test]
    fn test_to_parameters() {
        let request = DeviceAuthorizationRequest::builder(configuration(), "tv-app")
            .scopes(["openid", "offline_access"])
            .build()
            .unwrap();

        let parameters = request.to_parameters();
        assert_eq!(parameters.get("client_id"), Some(&"tv-app".to_string()));
        assert_eq!(
            parameters.get("scope"),
            Some(&"openid offline_access".to_string())
        );
    }

    #[test]
    fn test_transport_request_targets_device_endpoint() {
        let request = DeviceAuthorizationRequest::builder(configuration(), "tv-app")
            .build()
            .unwrap();

        let transport = request
            .transport_request(&ClientAuthentication::None)
            .unwrap();
        assert_eq!(transport.url.as_str(), "https://auth.example.com/device");
        assert_eq!(transport.method, "POST");
        assert!(transport.body.contains("client_id=tv-app"));
    }

    #[test]
    fn test_reserved_additional_parameter_rejected() {
        let result = DeviceAuthorizationRequest::builder(configuration(), "tv-app")
            .additional_parameter("scope", "admin")
            .build();
        assert!(matches!(result, Err(OAuthError::InvalidArgument { .. })));
    }

    #[test]
    fn test_audience_parameter_is_not_reserved() {
        // The device endpoint's reserved list is narrower than the token
        // endpoint's; grant-specific names are usable here.
        let request = DeviceAuthorizationRequest::builder(configuration(), "tv-app")
            .additional_parameter("audience", "https://api.example.com")
            .build()
            .unwrap();
        assert_eq!(
            request.to_parameters().get("audience"),
            Some(&"https://api.example.com".to_string())
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let request = DeviceAuthorizationRequest::builder(configuration(), "tv-app")
            .scopes(["openid"])
            .build()
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        let back: DeviceAuthorizationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }
}
