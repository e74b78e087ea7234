//! Caller-facing reconciliation input and its validation.
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::params::MergeStrategy;
use crate::record::{EventKey, EventSource, EventType};

/// Whether the Event should exist after reconciliation.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Create the Event, or update it if it already exists.
    #[default]
    Present,
    /// Delete the Event if it exists.
    Absent,
}

/// Involved-object fields supplied by the caller.
#[derive(Deserialize, Serialize, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObjectSpec {
    /// API version of the referenced object
    pub api_version: String,
    /// Kind of the referenced object
    pub kind: String,
    /// Name of the referenced object
    pub name: String,
    /// Namespace of the referenced object
    pub namespace: String,
    /// Fresh unique identifier; stored identity is reused when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Fresh object version; stored identity is reused when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// Description of a single Event occurrence to reconcile.
///
/// Construct with [`EventSpec::new`] and the builder-style setters, or
/// deserialize from the caller's wire format. Required fields are checked
/// by [`EventSpec::validate`] before any API call is made.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSpec {
    /// Event object name
    pub name: String,
    /// Event object namespace
    pub namespace: String,
    /// Human-readable status description
    pub message: String,
    /// Reason for the transition into the object's current status
    pub reason: String,
    /// Component responsible for the event
    pub reporting_component: String,
    /// Event severity; absent means unset
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<EventType>,
    /// The component reporting this Event
    pub source: EventSource,
    /// The object the Event reports about
    pub involved_object: InvolvedObjectSpec,
    /// Whether the Event should exist after reconciliation
    #[serde(default)]
    pub state: DesiredState,
    /// Replace instead of patch when the Event already exists
    #[serde(default)]
    pub force: bool,
    /// Patch strategies to attempt, in order; `None` uses
    /// [`MergeStrategy::DEFAULT_ORDER`]
    #[serde(default, alias = "merge_type", skip_serializing_if = "Option::is_none")]
    pub merge_type: Option<Vec<MergeStrategy>>,
}

impl EventSpec {
    /// Start a spec for the Event `name` in `namespace`.
    ///
    /// The remaining required fields are filled with the builder-style
    /// setters and enforced by [`EventSpec::validate`].
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Set the human-readable status description.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the transition reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the component responsible for the event.
    #[must_use]
    pub fn reporting_component(mut self, component: impl Into<String>) -> Self {
        self.reporting_component = component.into();
        self
    }

    /// Set the reporting source component.
    #[must_use]
    pub fn source_component(mut self, component: impl Into<String>) -> Self {
        self.source = EventSource {
            component: component.into(),
        };
        self
    }

    /// Set the event severity.
    #[must_use]
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.type_ = Some(event_type);
        self
    }

    /// Set the involved-object reference.
    #[must_use]
    pub fn involved_object(mut self, involved_object: InvolvedObjectSpec) -> Self {
        self.involved_object = involved_object;
        self
    }

    /// Request deletion instead of presence.
    #[must_use]
    pub fn absent(mut self) -> Self {
        self.state = DesiredState::Absent;
        self
    }

    /// Replace the stored Event instead of patching it.
    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Override the patch strategies to attempt, in order.
    #[must_use]
    pub fn merge_type(mut self, strategies: Vec<MergeStrategy>) -> Self {
        self.merge_type = Some(strategies);
        self
    }

    /// The key the reconciliation operates on.
    pub fn key(&self) -> EventKey {
        EventKey::new(self.name.clone(), self.namespace.clone())
    }

    /// Strategies to attempt, in caller order.
    pub fn merge_strategies(&self) -> Vec<MergeStrategy> {
        self.merge_type
            .clone()
            .unwrap_or_else(|| MergeStrategy::DEFAULT_ORDER.to_vec())
    }

    /// Check required fields.
    ///
    /// Runs before any resource-client call; a failure here is fatal and
    /// guarantees nothing was written.
    pub fn validate(&self) -> Result<(), Error> {
        fn required(field: &'static str, value: &str) -> Result<(), Error> {
            if value.is_empty() {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
            Ok(())
        }
        required("name", &self.name)?;
        required("namespace", &self.namespace)?;
        required("message", &self.message)?;
        required("reason", &self.reason)?;
        required("reportingComponent", &self.reporting_component)?;
        required("source.component", &self.source.component)?;
        required("involvedObject.apiVersion", &self.involved_object.api_version)?;
        required("involvedObject.kind", &self.involved_object.kind)?;
        required("involvedObject.name", &self.involved_object.name)?;
        required("involvedObject.namespace", &self.involved_object.namespace)?;
        if let Some(strategies) = &self.merge_type {
            if strategies.is_empty() {
                return Err(Error::Validation(
                    "mergeType must name at least one strategy".into(),
                ));
            }
        }
        Ok(())
    }
}
