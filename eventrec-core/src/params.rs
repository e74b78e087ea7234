//! Merge strategies and the patch bodies negotiated against the cluster.
use std::fmt;

use chrono::{DateTime, Utc};
use json_patch::{AddOperation, PatchOperation, TestOperation};
use jsonptr::PointerBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{EventRecord, EventSource, EventType, InvolvedObjectRef};

/// Patch semantics understood by the API server.
///
/// Strategies are attempted in caller order; a target that rejects one
/// (custom resources typically reject strategic merge) falls through to
/// the next.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// RFC 6902 JSON patch
    Json,
    /// RFC 7386 JSON merge patch
    Merge,
    /// Strategic merge patch with schema-aware list and map handling
    StrategicMerge,
}

impl MergeStrategy {
    /// Order attempted when the caller does not specify one.
    pub const DEFAULT_ORDER: [MergeStrategy; 2] =
        [MergeStrategy::StrategicMerge, MergeStrategy::Merge];

    /// The `Content-Type` the API server expects for this strategy.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json-patch+json",
            Self::Merge => "application/merge-patch+json",
            Self::StrategicMerge => "application/strategic-merge-patch+json",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Merge => "merge",
            Self::StrategicMerge => "strategic-merge",
        })
    }
}

/// Metadata subset carried in a patch body.
#[derive(Serialize, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaFragment {
    /// Version precondition taken from the record read during lookup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// The caller-controlled subset of an Event, diffed against a prior record.
///
/// Serialized as-is for merge and strategic-merge bodies; converted to
/// RFC 6902 operations for JSON patch bodies.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventFragment {
    /// Optimistic-concurrency precondition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetaFragment>,
    /// New status description, when changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// New transition reason, when changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// New responsible component, when changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_component: Option<String>,
    /// New severity, when changed
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<EventType>,
    /// New reporting source, when changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    /// New involved-object reference, when changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub involved_object: Option<InvolvedObjectRef>,
    /// Derived occurrence count; always carried
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
    /// Lineage start time; carried when the lineage resets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Reconciliation time; always carried
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl EventFragment {
    /// Diff `desired` against `prior`, restricted to the fields the caller
    /// controls.
    ///
    /// The derived `count` and `lastTimestamp` are always carried;
    /// `firstTimestamp` only when the lineage reset; the remaining fields
    /// only when they differ from the stored record. The prior record's
    /// `metadata.resourceVersion` rides along as the write precondition.
    pub fn between(prior: &EventRecord, desired: &EventRecord) -> Self {
        fn changed<T: Clone + PartialEq>(prior: &T, desired: &T) -> Option<T> {
            (prior != desired).then(|| desired.clone())
        }
        EventFragment {
            metadata: prior.metadata.resource_version.clone().map(|rv| MetaFragment {
                resource_version: Some(rv),
            }),
            message: changed(&prior.message, &desired.message),
            reason: changed(&prior.reason, &desired.reason),
            reporting_component: changed(&prior.reporting_component, &desired.reporting_component),
            type_: desired.type_.filter(|t| prior.type_.as_ref() != Some(t)),
            source: changed(&prior.source, &desired.source),
            involved_object: changed(&prior.involved_object, &desired.involved_object),
            count: Some(desired.count),
            first_timestamp: changed(&prior.first_timestamp, &desired.first_timestamp),
            last_timestamp: Some(desired.last_timestamp),
        }
    }

    /// RFC 6902 representation: a `test` guard on the resource version
    /// followed by member upserts.
    pub fn to_json_ops(&self) -> Result<json_patch::Patch, serde_json::Error> {
        fn upsert<T: Serialize>(
            ops: &mut Vec<PatchOperation>,
            field: &str,
            value: &Option<T>,
        ) -> Result<(), serde_json::Error> {
            if let Some(value) = value {
                ops.push(PatchOperation::Add(AddOperation {
                    path: PointerBuf::from_tokens([field]),
                    value: serde_json::to_value(value)?,
                }));
            }
            Ok(())
        }

        let mut ops = Vec::new();
        if let Some(rv) = self.metadata.as_ref().and_then(|m| m.resource_version.clone()) {
            ops.push(PatchOperation::Test(TestOperation {
                path: PointerBuf::from_tokens(["metadata", "resourceVersion"]),
                value: Value::String(rv),
            }));
        }
        upsert(&mut ops, "message", &self.message)?;
        upsert(&mut ops, "reason", &self.reason)?;
        upsert(&mut ops, "reportingComponent", &self.reporting_component)?;
        upsert(&mut ops, "type", &self.type_)?;
        upsert(&mut ops, "source", &self.source)?;
        upsert(&mut ops, "involvedObject", &self.involved_object)?;
        upsert(&mut ops, "count", &self.count)?;
        upsert(&mut ops, "firstTimestamp", &self.first_timestamp)?;
        upsert(&mut ops, "lastTimestamp", &self.last_timestamp)?;
        Ok(json_patch::Patch(ops))
    }
}

/// A patch body bound to the strategy it must be sent with.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPatch {
    /// RFC 6902 operations
    Json(json_patch::Patch),
    /// RFC 7386 merge body
    Merge(EventFragment),
    /// Strategic merge body
    Strategic(EventFragment),
}

impl EventPatch {
    /// Build the body for `strategy` from a field diff.
    pub fn for_strategy(
        strategy: MergeStrategy,
        fragment: &EventFragment,
    ) -> Result<Self, serde_json::Error> {
        Ok(match strategy {
            MergeStrategy::Json => EventPatch::Json(fragment.to_json_ops()?),
            MergeStrategy::Merge => EventPatch::Merge(fragment.clone()),
            MergeStrategy::StrategicMerge => EventPatch::Strategic(fragment.clone()),
        })
    }

    /// The strategy this body must be sent with.
    pub fn strategy(&self) -> MergeStrategy {
        match self {
            Self::Json(_) => MergeStrategy::Json,
            Self::Merge(_) => MergeStrategy::Merge,
            Self::Strategic(_) => MergeStrategy::StrategicMerge,
        }
    }

    /// The `Content-Type` for the request.
    pub fn content_type(&self) -> &'static str {
        self.strategy().content_type()
    }

    /// The serialized request body.
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Json(patch) => serde_json::to_vec(patch),
            Self::Merge(fragment) | Self::Strategic(fragment) => serde_json::to_vec(fragment),
        }
    }
}
