//! Reconciles a single Kubernetes Event toward a caller-described state.
//!
//! The [`Reconciler`] runs the lookup, derive, apply cycle over any
//! [`ResourceClient`] implementation: it fetches the prior Event, derives
//! the next dedup count and timestamps, assembles the desired object, and
//! creates, patches, replaces or deletes it. Patching goes through an
//! ordered merge-strategy negotiation ([`negotiate`]) that falls back when
//! a target rejects a strategy.
//!
//! Transport, TLS and auth live behind the [`ResourceClient`] seam and are
//! not this crate's concern.

pub mod client;
pub use client::{BoxError, ClientError, ResourceClient};

mod error;
pub use error::Error;

pub mod negotiate;
pub use negotiate::{negotiate, Negotiated};

pub mod reconcile;
pub use reconcile::{Clock, Outcome, ReconcileParams, Reconciler};

pub use eventrec_core as core;

#[cfg(test)] mod testing;
