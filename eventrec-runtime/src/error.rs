//! The executor's error taxonomy.
use std::time::Duration;

use eventrec_core::MergeStrategy;
use thiserror::Error;

use crate::client::ClientError;

/// Failures terminating a reconciliation.
///
/// Everything here is fatal to the current invocation; the recoverable
/// cases (`NotFound` on lookup or delete, `MergeRejected` during
/// negotiation, `Conflict` within the retry budget) are absorbed before
/// they reach the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// The input failed validation; no client call was made.
    #[error("invalid input: {0}")]
    Invalid(#[source] eventrec_core::Error),

    /// A patch body could not be built.
    #[error("failed to build patch body: {0}")]
    BuildPatch(#[source] serde_json::Error),

    /// Every supplied patch strategy was rejected by the server.
    #[error("all patch strategies rejected (attempted: {attempted:?})")]
    MergeStrategyExhausted {
        /// Strategies attempted, in order
        attempted: Vec<MergeStrategy>,
    },

    /// Write conflicts persisted through every retry.
    #[error("write conflict persisted after {attempts} attempts")]
    ConflictExhausted {
        /// Lookup-derive-apply attempts performed
        attempts: u32,
        /// The conflict from the final attempt
        #[source]
        source: ClientError,
    },

    /// A client call exceeded the configured deadline.
    #[error("client call exceeded {0:?}")]
    Timeout(Duration),

    /// The caller aborted between state-machine steps.
    #[error("reconciliation aborted")]
    Aborted,

    /// Unrecoverable client failure, surfaced verbatim.
    #[error("client error: {0}")]
    Client(#[source] ClientError),
}
