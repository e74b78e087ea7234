//! The Event object model under reconciliation.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::input::EventSpec;
use crate::state::DerivedState;

/// Identity sentinel for involved-object fields recorded before the
/// referenced object is fully known.
pub const UNKNOWN_IDENTITY: &str = "1";

fn unknown_identity() -> String {
    UNKNOWN_IDENTITY.to_string()
}

/// Uniquely identifies an Event resource within the cluster.
///
/// Immutable once the Event is created.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EventKey {
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
}

impl EventKey {
    /// Construct a key from name and namespace.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The metadata subset an Event carries.
#[derive(Deserialize, Serialize, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Name of the object
    pub name: String,
    /// Namespace of the object
    pub namespace: String,
    /// Opaque version used for optimistic concurrency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Server-assigned unique identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Reference to the object an Event reports about.
///
/// `uid` and `resource_version` fall back to the [`UNKNOWN_IDENTITY`]
/// sentinel so an Event can be recorded before the referenced object is
/// fully known. Once stored they are kept stable across reconciliations
/// rather than recomputed (see [`EventRecord::compose`]).
#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObjectRef {
    /// API version of the referenced object
    pub api_version: String,
    /// Kind of the referenced object
    pub kind: String,
    /// Name of the referenced object
    pub name: String,
    /// Namespace of the referenced object
    pub namespace: String,
    /// Unique identifier of the referenced object
    #[serde(default = "unknown_identity")]
    pub uid: String,
    /// Version of the referenced object when the Event was recorded
    #[serde(default = "unknown_identity")]
    pub resource_version: String,
}

/// The event severity or type.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventType {
    /// An expected, informational occurrence.
    Normal,
    /// Something is not working as expected.
    Warning,
}

/// The component reporting this Event (the `source` block).
#[derive(Deserialize, Serialize, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// Name of the reporting component
    pub component: String,
}

/// The full Event entity under reconciliation.
///
/// Treated as externally persisted state: the reconciliation executor
/// reads it, derives the next dedup state, and writes it back.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Versioned schema of this representation
    pub api_version: String,
    /// Always `"Event"`
    pub kind: String,
    /// Standard object metadata
    pub metadata: ObjectMeta,
    /// The object this Event reports about
    pub involved_object: InvolvedObjectRef,
    /// Human-readable status description
    pub message: String,
    /// Machine-readable reason for the transition into the current status
    pub reason: String,
    /// Component responsible for the event
    pub reporting_component: String,
    /// Instance of the reporting component, empty when unknown
    #[serde(default)]
    pub reporting_instance: String,
    /// The component reporting this Event
    pub source: EventSource,
    /// Severity, unset when the caller did not specify one
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<EventType>,
    /// Number of times this occurrence has been recorded for the current
    /// reason lineage
    pub count: i32,
    /// Time this lineage was first recorded; write-once per reason
    pub first_timestamp: DateTime<Utc>,
    /// Time this occurrence was most recently recorded
    pub last_timestamp: DateTime<Utc>,
    /// MicroTime variant, kept `null` for deduplicated events
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// API version Events are served under.
    pub const API_VERSION: &'static str = "v1";
    /// Kind constant for Event objects.
    pub const KIND: &'static str = "Event";

    /// Assemble the desired record from a validated spec and derived state.
    ///
    /// Identity is kept stable across reconciliations: the involved
    /// object's `uid`/`resourceVersion` and the record's own
    /// `metadata.resourceVersion`/`uid` are carried over from `prior` when
    /// present. Caller-supplied involved-object identity wins over the
    /// stored values; with neither, the [`UNKNOWN_IDENTITY`] sentinel is
    /// used.
    pub fn compose(spec: &EventSpec, derived: &DerivedState, prior: Option<&EventRecord>) -> Self {
        let uid = spec
            .involved_object
            .uid
            .clone()
            .or_else(|| prior.map(|p| p.involved_object.uid.clone()))
            .unwrap_or_else(unknown_identity);
        let resource_version = spec
            .involved_object
            .resource_version
            .clone()
            .or_else(|| prior.map(|p| p.involved_object.resource_version.clone()))
            .unwrap_or_else(unknown_identity);

        EventRecord {
            api_version: Self::API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: ObjectMeta {
                name: spec.name.clone(),
                namespace: spec.namespace.clone(),
                resource_version: prior.and_then(|p| p.metadata.resource_version.clone()),
                uid: prior.and_then(|p| p.metadata.uid.clone()),
            },
            involved_object: InvolvedObjectRef {
                api_version: spec.involved_object.api_version.clone(),
                kind: spec.involved_object.kind.clone(),
                name: spec.involved_object.name.clone(),
                namespace: spec.involved_object.namespace.clone(),
                uid,
                resource_version,
            },
            message: spec.message.clone(),
            reason: spec.reason.clone(),
            reporting_component: spec.reporting_component.clone(),
            reporting_instance: String::new(),
            source: spec.source.clone(),
            type_: spec.type_,
            count: derived.count,
            first_timestamp: derived.first_timestamp,
            last_timestamp: derived.last_timestamp,
            event_time: None,
        }
    }

    /// The record's identity within the cluster.
    pub fn key(&self) -> EventKey {
        EventKey::new(self.metadata.name.clone(), self.metadata.namespace.clone())
    }
}
