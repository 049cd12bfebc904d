//! End-session response.

use serde::{Deserialize, Serialize};

use crate::request::EndSessionRequest;

/// A successful answer from the end-session endpoint.
///
/// The provider redirects back to the post-logout URI with the state
/// echoed; once the dispatcher has checked state equality there is nothing
/// else to carry, so this is little more than the bound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSessionResponse {
    /// The request this response answers.
    pub request: EndSessionRequest,
}

impl EndSessionResponse {
    /// Binds a response to its request.
    #[must_use]
    pub fn new(request: EndSessionRequest) -> Self {
        Self { request }
    }

    /// The state echoed by the provider; equal to the request's state.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.request.state
    }
}
