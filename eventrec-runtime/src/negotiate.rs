//! Ordered merge-strategy fallback against the resource client.
use std::time::Duration;

use eventrec_core::{EventFragment, EventKey, EventPatch, EventRecord, MergeStrategy};

use crate::client::{ClientError, ResourceClient};
use crate::error::Error;
use crate::reconcile::bounded;

/// What a successful negotiation produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Negotiated {
    /// The server accepted a patch; this is the record as stored.
    Applied(EventRecord),
    /// The patch target vanished since lookup; the caller should create
    /// instead of patch.
    Missing,
}

/// Try each strategy in order until the server accepts one.
///
/// A [`ClientError::MergeRejected`] moves on to the next strategy; exactly
/// one patch call is made per strategy, with no retry within a strategy.
/// Any other failure stops the negotiation. [`ClientError::NotFound`]
/// means the target vanished since lookup and is reported as
/// [`Negotiated::Missing`]. When every strategy is rejected the
/// negotiation fails with [`Error::MergeStrategyExhausted`] listing the
/// attempted strategies — nothing was written in that case.
///
/// Each patch call is bounded by `deadline` when one is supplied.
#[tracing::instrument(level = "debug", skip(client, fragment, deadline))]
pub async fn negotiate<C>(
    client: &C,
    key: &EventKey,
    fragment: &EventFragment,
    strategies: &[MergeStrategy],
    deadline: Option<Duration>,
) -> Result<Negotiated, Error>
where
    C: ResourceClient + ?Sized,
{
    let mut attempted = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        let patch = EventPatch::for_strategy(strategy, fragment).map_err(Error::BuildPatch)?;
        match bounded(deadline, client.patch(key, &patch)).await? {
            Ok(record) => return Ok(Negotiated::Applied(record)),
            Err(ClientError::NotFound) => return Ok(Negotiated::Missing),
            Err(ClientError::MergeRejected { strategy, message }) => {
                tracing::debug!(%key, %strategy, %message, "patch strategy rejected, falling back");
                attempted.push(strategy);
            }
            Err(err) => return Err(Error::Client(err)),
        }
    }
    Err(Error::MergeStrategyExhausted { attempted })
}
