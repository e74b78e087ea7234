//! The resource-client seam the executor drives.
use async_trait::async_trait;
use eventrec_core::{ErrorResponse, EventKey, EventPatch, EventRecord, MergeStrategy};
use thiserror::Error;

/// Boxed error for transport and auth failures originating below this seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by a [`ResourceClient`] implementation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The target object does not exist.
    ///
    /// Recoverable locally: "no prior record" during lookup, "already
    /// absent" during deletion, "create instead" while patching.
    #[error("resource not found")]
    NotFound,

    /// The stored resource does not support the attempted patch strategy.
    ///
    /// Recoverable inside the negotiator, which falls through to the next
    /// strategy in the caller's order.
    #[error("{strategy} patch rejected: {message}")]
    MergeRejected {
        /// The rejected strategy
        strategy: MergeStrategy,
        /// Server-side rejection detail
        message: String,
    },

    /// A concurrent writer got there first (stale resource version).
    #[error("write conflict: {0}")]
    Conflict(#[source] ErrorResponse),

    /// Authentication or authorization failed.
    #[error("auth error: {0}")]
    Auth(#[source] BoxError),

    /// The transport below the client failed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Any other error status from the API server.
    #[error("api error: {0}")]
    Api(#[source] ErrorResponse),
}

/// Typed CRUD access to Event resources in the cluster store.
///
/// Implementations own the wire: HTTP, TLS, tokens, serialization. The
/// executor layers its own per-call deadline, conflict retries and
/// cancellation on top, so implementations should surface failures
/// verbatim rather than retry.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch the record under `key`, `None` when it does not exist.
    async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>, ClientError>;

    /// Create `record`; fails when the object already exists.
    async fn create(&self, record: &EventRecord) -> Result<EventRecord, ClientError>;

    /// Apply `patch` to the record under `key`, using the strategy the
    /// body was built for.
    async fn patch(&self, key: &EventKey, patch: &EventPatch) -> Result<EventRecord, ClientError>;

    /// Replace the record under `key` wholesale.
    async fn replace(
        &self,
        key: &EventKey,
        record: &EventRecord,
    ) -> Result<EventRecord, ClientError>;

    /// Delete the record under `key`; [`ClientError::NotFound`] when it is
    /// already gone.
    async fn delete(&self, key: &EventKey) -> Result<(), ClientError>;
}
