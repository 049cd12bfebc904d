//! State correlation store.
//!
//! While a front-channel round-trip is in flight, the issuing request is
//! parked here under its state token, together with an opaque continuation
//! the caller wants back when the redirect arrives. Consumption is
//! single-use and atomic: a redirect can complete a flow exactly once, and
//! a replayed redirect finds nothing.
//!
//! The store is an explicitly constructed, injectable instance owned by the
//! caller's session context (never a process-wide singleton), so multiple
//! independent flows can coexist and tests get a fresh store each.
//!
//! Orphaned entries (the user abandoned the browser tab) are the owner's
//! concern: [`PendingRequestStore::remove`] supports explicit cancellation,
//! and the engine runs no cleanup timers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{OAuthError, OAuthResult};
use crate::request::Request;

/// A request parked while its browser round-trip is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// The front-channel request awaiting its redirect.
    pub request: Request,

    /// Opaque continuation handed back on consumption. The engine never
    /// interprets it; callers typically park a session or UI handle here.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub continuation: Value,
}

impl PendingRequest {
    /// Pairs a request with its continuation.
    #[must_use]
    pub fn new(request: Request, continuation: Value) -> Self {
        Self {
            request,
            continuation,
        }
    }

    /// The state token this entry is keyed by.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.request.state()
    }
}

/// Storage for pending front-channel requests.
///
/// `register` and `consume` must be atomic with respect to each other:
/// two concurrent consumes of the same token must not both succeed.
#[async_trait]
pub trait PendingRequestStore: Send + Sync {
    /// Parks a request under its state token.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the request carries no state token (only
    /// front-channel requests do) or when the token is already registered:
    /// a 128-bit collision means caller misuse, and silently replacing the
    /// entry could let a stale redirect complete against the wrong
    /// continuation.
    async fn register(&self, entry: PendingRequest) -> OAuthResult<()>;

    /// Retrieves and removes the entry for a state token. Single-use:
    /// a second call with the same token reports `NotFound`.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing is registered under the token.
    async fn consume(&self, state: &str) -> OAuthResult<PendingRequest>;

    /// Drops the entry for a state token without consuming it, e.g. when
    /// the caller cancels the flow. Returns whether an entry existed.
    async fn remove(&self, state: &str) -> OAuthResult<bool>;
}

/// In-memory [`PendingRequestStore`].
///
/// A single `RwLock` over the map makes register/consume atomic; entries
/// do not survive the process, which is exactly the correlation lifetime
/// this engine promises (longer-lived handoff goes through the serialized
/// [`PendingRequest`] document).
#[derive(Debug, Default)]
pub struct InMemoryPendingRequestStore {
    entries: RwLock<HashMap<String, PendingRequest>>,
}

impl InMemoryPendingRequestStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests currently awaiting their redirect.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` when no request is awaiting a redirect.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PendingRequestStore for InMemoryPendingRequestStore {
    async fn register(&self, entry: PendingRequest) -> OAuthResult<()> {
        let state = entry
            .state()
            .ok_or_else(|| {
                OAuthError::invalid_argument("only requests with a state token can be registered")
            })?
            .to_string();

        let mut entries = self.entries.write().await;
        if entries.contains_key(&state) {
            return Err(OAuthError::invalid_argument(format!(
                "state token {state:?} is already registered"
            )));
        }
        tracing::debug!(state = %state, "Registered pending request");
        entries.insert(state, entry);
        Ok(())
    }

    async fn consume(&self, state: &str) -> OAuthResult<PendingRequest> {
        let mut entries = self.entries.write().await;
        match entries.remove(state) {
            Some(entry) => {
                tracing::debug!(state = %state, "Consumed pending request");
                Ok(entry)
            }
            None => Err(OAuthError::not_found(state)),
        }
    }

    async fn remove(&self, state: &str) -> OAuthResult<bool> {
        let removed = self.entries.write().await.remove(state).is_some();
        if removed {
            tracing::debug!(state = %state, "Removed pending request");
        }
        Ok(removed)
    }
}
