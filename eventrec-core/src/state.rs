//! Dedup counting and timestamp derivation for Event lineages.
use chrono::{DateTime, Utc};

use crate::record::EventRecord;

/// Count and timestamps to write on the next apply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DerivedState {
    /// Occurrence count for the current reason lineage
    pub count: i32,
    /// When the current lineage was first recorded
    pub first_timestamp: DateTime<Utc>,
    /// The current reconciliation time
    pub last_timestamp: DateTime<Utc>,
}

/// Compute the next dedup state for an Event lineage.
///
/// Three cases:
/// - no prior record: a lineage starts now (`count = 1`);
/// - the stored reason matches `reason`: the occurrence repeats, so the
///   count increments and `firstTimestamp` is preserved;
/// - the stored reason differs: the lineage resets (`count = 1`,
///   `firstTimestamp = now`).
///
/// `lastTimestamp` is always the current reconciliation time. The count
/// saturates at `i32::MAX` rather than wrapping.
///
/// Pure over its inputs; `now` is injected so callers can pin the clock.
pub fn next_state(prior: Option<&EventRecord>, reason: &str, now: DateTime<Utc>) -> DerivedState {
    match prior {
        Some(prior) if prior.reason == reason => DerivedState {
            count: prior.count.saturating_add(1),
            first_timestamp: prior.first_timestamp,
            last_timestamp: now,
        },
        Some(_) | None => DerivedState {
            count: 1,
            first_timestamp: now,
            last_timestamp: now,
        },
    }
}
