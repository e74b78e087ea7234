//! The reconciliation executor: lookup, derive, apply.
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eventrec_core::{
    next_state, DesiredState, EventFragment, EventKey, EventRecord, EventSpec, MergeStrategy,
};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ResourceClient};
use crate::error::Error;
use crate::negotiate::{negotiate, Negotiated};

/// Wall clock used to stamp derived state; substitutable for tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Settings governing retries, deadlines and cancellation.
#[derive(Clone, Debug)]
pub struct ReconcileParams {
    /// Lookup-derive-apply attempts permitted when writes conflict
    pub conflict_retries: u32,
    /// Deadline applied to every individual client call
    pub call_timeout: Option<Duration>,
    /// Token checked between state-machine steps
    pub cancel: Option<CancellationToken>,
}

impl Default for ReconcileParams {
    fn default() -> Self {
        Self {
            conflict_retries: 3,
            call_timeout: None,
            cancel: None,
        }
    }
}

impl ReconcileParams {
    /// Set the number of attempts permitted when writes conflict.
    ///
    /// Clamped to at least one; the first run always happens.
    #[must_use]
    pub fn retries(mut self, attempts: u32) -> Self {
        self.conflict_retries = attempts.max(1);
        self
    }

    /// Bound every client call by `limit`.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    /// Abort between state-machine steps once `token` is cancelled.
    ///
    /// A call already in flight is not interrupted; the abort takes effect
    /// at the next step boundary.
    #[must_use]
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Result of a reconciliation.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The record as stored after a create, patch or replace.
    Applied(EventRecord),
    /// The record is gone — deleted now, or already absent.
    Deleted,
}

impl Outcome {
    /// The stored record, when the outcome left one behind.
    pub fn record(&self) -> Option<&EventRecord> {
        match self {
            Outcome::Applied(record) => Some(record),
            Outcome::Deleted => None,
        }
    }
}

/// Drives a single Event toward the caller's desired state.
///
/// The executor performs no I/O itself; every side effect goes through the
/// [`ResourceClient`] it wraps.
pub struct Reconciler<C> {
    client: C,
    params: ReconcileParams,
    clock: Clock,
}

impl<C: ResourceClient> Reconciler<C> {
    /// Build an executor over `client` with default [`ReconcileParams`].
    pub fn new(client: C) -> Self {
        Self {
            client,
            params: ReconcileParams::default(),
            clock: Utc::now,
        }
    }

    /// Replace the execution parameters.
    #[must_use]
    pub fn with_params(mut self, params: ReconcileParams) -> Self {
        self.params = params;
        self
    }

    /// Substitute the wall clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Reconcile one Event described by `spec`.
    ///
    /// Validates the input, then runs lookup, derive, apply. On a write
    /// conflict the whole sequence re-runs against freshly fetched state,
    /// up to the configured number of attempts; timeouts are surfaced, not
    /// retried.
    ///
    /// Reconciling twice with an unchanged `reason` increments `count` by
    /// exactly one per run, preserves `firstTimestamp` and advances
    /// `lastTimestamp`.
    #[tracing::instrument(level = "debug", skip(self, spec), fields(event = %spec.key()))]
    pub async fn reconcile(&self, spec: &EventSpec) -> Result<Outcome, Error> {
        spec.validate().map_err(Error::Invalid)?;
        let strategies = spec.merge_strategies();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(spec, &strategies).await {
                Err(Error::Client(ClientError::Conflict(cause))) => {
                    if attempt < self.params.conflict_retries {
                        tracing::debug!(attempt, "write conflict, re-running from lookup");
                        continue;
                    }
                    return Err(Error::ConflictExhausted {
                        attempts: attempt,
                        source: ClientError::Conflict(cause),
                    });
                }
                outcome => return outcome,
            }
        }
    }

    /// One pass of the state machine: LOOKUP, then the branch the desired
    /// state and prior record select.
    async fn attempt(&self, spec: &EventSpec, strategies: &[MergeStrategy]) -> Result<Outcome, Error> {
        let key = spec.key();
        self.ensure_live()?;
        let prior = self.call(self.client.get(&key)).await?;

        if spec.state == DesiredState::Absent {
            return self.delete(&key).await;
        }

        match prior {
            None => self.create(spec).await,
            Some(prior) if spec.force => self.replace(spec, &key, &prior).await,
            Some(prior) => self.patch(spec, &key, &prior, strategies).await,
        }
    }

    async fn delete(&self, key: &EventKey) -> Result<Outcome, Error> {
        self.ensure_live()?;
        match self.call(self.client.delete(key)).await {
            Ok(()) => Ok(Outcome::Deleted),
            Err(Error::Client(ClientError::NotFound)) => {
                tracing::debug!(event = %key, "already absent");
                Ok(Outcome::Deleted)
            }
            Err(err) => Err(err),
        }
    }

    async fn create(&self, spec: &EventSpec) -> Result<Outcome, Error> {
        self.ensure_live()?;
        let derived = next_state(None, &spec.reason, (self.clock)());
        let record = EventRecord::compose(spec, &derived, None);
        let stored = self.call(self.client.create(&record)).await?;
        tracing::debug!(event = %stored.key(), "created");
        Ok(Outcome::Applied(stored))
    }

    async fn replace(
        &self,
        spec: &EventSpec,
        key: &EventKey,
        prior: &EventRecord,
    ) -> Result<Outcome, Error> {
        self.ensure_live()?;
        let derived = next_state(Some(prior), &spec.reason, (self.clock)());
        let record = EventRecord::compose(spec, &derived, Some(prior));
        let stored = self.call(self.client.replace(key, &record)).await?;
        Ok(Outcome::Applied(stored))
    }

    async fn patch(
        &self,
        spec: &EventSpec,
        key: &EventKey,
        prior: &EventRecord,
        strategies: &[MergeStrategy],
    ) -> Result<Outcome, Error> {
        self.ensure_live()?;
        let derived = next_state(Some(prior), &spec.reason, (self.clock)());
        let desired = EventRecord::compose(spec, &derived, Some(prior));
        let fragment = EventFragment::between(prior, &desired);
        match negotiate(
            &self.client,
            key,
            &fragment,
            strategies,
            self.params.call_timeout,
        )
        .await?
        {
            Negotiated::Applied(stored) => Ok(Outcome::Applied(stored)),
            // the target vanished between lookup and patch
            Negotiated::Missing => self.create(spec).await,
        }
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, Error> {
        bounded(self.params.call_timeout, fut)
            .await?
            .map_err(Error::Client)
    }

    fn ensure_live(&self) -> Result<(), Error> {
        match &self.params.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Aborted),
            _ => Ok(()),
        }
    }
}

/// Bound `fut` by `limit` when one is set.
///
/// The outer error is the elapsed deadline; the inner result is the
/// client's own, left intact so callers can branch on recoverable
/// variants.
pub(crate) async fn bounded<T, F>(
    limit: Option<Duration>,
    fut: F,
) -> Result<Result<T, ClientError>, Error>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit)),
        None => Ok(fut.await),
    }
}
