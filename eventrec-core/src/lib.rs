//! Types and pure logic for Kubernetes Event reconciliation.
//!
//! This crate carries everything that does not talk to a cluster: the
//! [`EventRecord`] object model, the caller-facing [`EventSpec`] input and
//! its validation, the merge-strategy and patch-body types negotiated
//! against an API server, and the dedup state derivation
//! ([`next_state`]) that implements Kubernetes Event counting semantics.
//!
//! The companion `eventrec-runtime` crate drives these types against a
//! resource client.

mod error;
pub use error::{Error, ErrorResponse};

pub mod input;
pub use input::{DesiredState, EventSpec, InvolvedObjectSpec};

pub mod params;
pub use params::{EventFragment, EventPatch, MergeStrategy, MetaFragment};

pub mod record;
pub use record::{EventKey, EventRecord, EventSource, EventType, InvolvedObjectRef, ObjectMeta};

pub mod state;
pub use state::{next_state, DerivedState};

/// Alias for `Result` with this crate's validation error.
pub type Result<T, E = Error> = std::result::Result<T, E>;
