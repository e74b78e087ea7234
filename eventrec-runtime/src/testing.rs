//! In-memory fake cluster backing the unit tests.
//!
//! Behaves like the real store where the executor can tell the
//! difference: resource versions bump on every write and stale-version
//! writes conflict. Failures can be scripted per call and every call is
//! journaled for assertions.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eventrec_core::{
    ErrorResponse, EventFragment, EventKey, EventPatch, EventRecord, EventSource,
    InvolvedObjectRef, MergeStrategy, ObjectMeta,
};

use crate::client::{ClientError, ResourceClient};

/// Which client method a call hit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Get,
    Create,
    Patch(MergeStrategy),
    Replace,
    Delete,
}

#[derive(Default)]
struct Inner {
    store: HashMap<EventKey, EventRecord>,
    rv: u64,
    reject: Vec<MergeStrategy>,
    fail_next: VecDeque<ClientError>,
    journal: Vec<Call>,
    delay: Option<Duration>,
    vanish_after_get: bool,
}

/// A minimal in-memory stand-in for the cluster's Event store.
///
/// Clonable like a real client; all clones share the same store.
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Mutex<Inner>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject these strategies with `MergeRejected` on patch.
    pub fn reject_strategies(&self, strategies: &[MergeStrategy]) {
        self.inner.lock().unwrap().reject = strategies.to_vec();
    }

    /// Queue an error consumed by the next mutating call (create, patch,
    /// replace or delete); lookups never consume it.
    pub fn fail_next(&self, err: ClientError) {
        self.inner.lock().unwrap().fail_next.push_back(err);
    }

    /// Delay every call by `delay` (virtual time under a paused runtime).
    pub fn delay_calls(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    /// Simulate a concurrent deleter: the next successful lookup returns
    /// the record and removes it from the store.
    pub fn vanish_after_get(&self) {
        self.inner.lock().unwrap().vanish_after_get = true;
    }

    /// Seed a bare stored record under `key`, as if created earlier.
    pub fn seed_minimal(&self, key: &EventKey) {
        let t0 = Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0).unwrap();
        let mut inner = self.inner.lock().unwrap();
        let rv = Self::next_rv(&mut inner);
        inner.store.insert(
            key.clone(),
            EventRecord {
                api_version: EventRecord::API_VERSION.to_string(),
                kind: EventRecord::KIND.to_string(),
                metadata: ObjectMeta {
                    name: key.name.clone(),
                    namespace: key.namespace.clone(),
                    resource_version: Some(rv),
                    uid: None,
                },
                involved_object: InvolvedObjectRef {
                    api_version: "v1".into(),
                    kind: "Pod".into(),
                    name: "web-0".into(),
                    namespace: key.namespace.clone(),
                    uid: "1".into(),
                    resource_version: "1".into(),
                },
                message: "seeded".into(),
                reason: "Scheduled".into(),
                reporting_component: "metering".into(),
                reporting_instance: String::new(),
                source: EventSource {
                    component: "metering-operator".into(),
                },
                type_: None,
                count: 1,
                first_timestamp: t0,
                last_timestamp: t0,
                event_time: None,
            },
        );
    }

    pub fn journal(&self) -> Vec<Call> {
        self.inner.lock().unwrap().journal.clone()
    }

    pub fn stored(&self, key: &EventKey) -> Option<EventRecord> {
        self.inner.lock().unwrap().store.get(key).cloned()
    }

    fn next_rv(inner: &mut Inner) -> String {
        inner.rv += 1;
        inner.rv.to_string()
    }

    async fn pause(&self) {
        let delay = self.inner.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn take_scripted_failure(inner: &mut Inner) -> Option<ClientError> {
        inner.fail_next.pop_front()
    }
}

fn check_version(current: &EventRecord, supplied: Option<&str>) -> Result<(), ClientError> {
    match supplied {
        Some(rv) if current.metadata.resource_version.as_deref() != Some(rv) => Err(
            ClientError::Conflict(ErrorResponse::conflict("object was modified")),
        ),
        _ => Ok(()),
    }
}

fn overlay(mut record: EventRecord, fragment: &EventFragment) -> EventRecord {
    if let Some(message) = &fragment.message {
        record.message = message.clone();
    }
    if let Some(reason) = &fragment.reason {
        record.reason = reason.clone();
    }
    if let Some(component) = &fragment.reporting_component {
        record.reporting_component = component.clone();
    }
    if let Some(event_type) = fragment.type_ {
        record.type_ = Some(event_type);
    }
    if let Some(source) = &fragment.source {
        record.source = source.clone();
    }
    if let Some(involved) = &fragment.involved_object {
        record.involved_object = involved.clone();
    }
    if let Some(count) = fragment.count {
        record.count = count;
    }
    if let Some(first) = fragment.first_timestamp {
        record.first_timestamp = first;
    }
    if let Some(last) = fragment.last_timestamp {
        record.last_timestamp = last;
    }
    record
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>, ClientError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.journal.push(Call::Get);
        let record = inner.store.get(key).cloned();
        if record.is_some() && inner.vanish_after_get {
            inner.vanish_after_get = false;
            inner.store.remove(key);
        }
        Ok(record)
    }

    async fn create(&self, record: &EventRecord) -> Result<EventRecord, ClientError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.journal.push(Call::Create);
        if let Some(err) = Self::take_scripted_failure(&mut inner) {
            return Err(err);
        }
        let key = record.key();
        if inner.store.contains_key(&key) {
            return Err(ClientError::Api(ErrorResponse {
                status: "Failure".into(),
                message: format!("events \"{}\" already exists", key.name),
                reason: "AlreadyExists".into(),
                code: 409,
            }));
        }
        let mut stored = record.clone();
        stored.metadata.resource_version = Some(Self::next_rv(&mut inner));
        inner.store.insert(key, stored.clone());
        Ok(stored)
    }

    async fn patch(&self, key: &EventKey, patch: &EventPatch) -> Result<EventRecord, ClientError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.journal.push(Call::Patch(patch.strategy()));
        if let Some(err) = Self::take_scripted_failure(&mut inner) {
            return Err(err);
        }
        if inner.reject.contains(&patch.strategy()) {
            return Err(ClientError::MergeRejected {
                strategy: patch.strategy(),
                message: "merge type not supported by the stored resource".into(),
            });
        }
        let Some(current) = inner.store.get(key).cloned() else {
            return Err(ClientError::NotFound);
        };
        let mut updated = match patch {
            EventPatch::Merge(fragment) | EventPatch::Strategic(fragment) => {
                let supplied = fragment
                    .metadata
                    .as_ref()
                    .and_then(|m| m.resource_version.as_deref());
                check_version(&current, supplied)?;
                overlay(current, fragment)
            }
            EventPatch::Json(ops) => {
                let mut value = serde_json::to_value(&current).expect("record serializes");
                json_patch::patch(&mut value, ops).map_err(|_| {
                    ClientError::Conflict(ErrorResponse::conflict("json patch test failed"))
                })?;
                serde_json::from_value(value).expect("patched record deserializes")
            }
        };
        updated.metadata.resource_version = Some(Self::next_rv(&mut inner));
        inner.store.insert(key.clone(), updated.clone());
        Ok(updated)
    }

    async fn replace(
        &self,
        key: &EventKey,
        record: &EventRecord,
    ) -> Result<EventRecord, ClientError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.journal.push(Call::Replace);
        if let Some(err) = Self::take_scripted_failure(&mut inner) {
            return Err(err);
        }
        let Some(current) = inner.store.get(key).cloned() else {
            return Err(ClientError::NotFound);
        };
        check_version(&current, record.metadata.resource_version.as_deref())?;
        let mut stored = record.clone();
        stored.metadata.resource_version = Some(Self::next_rv(&mut inner));
        inner.store.insert(key.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, key: &EventKey) -> Result<(), ClientError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.journal.push(Call::Delete);
        if let Some(err) = Self::take_scripted_failure(&mut inner) {
            return Err(err);
        }
        match inner.store.remove(key) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound),
        }
    }
}
