#![allow(dead_code)]

use fluent_event_sink::domain::{Event, EventSource, InvolvedObject, ObjectMeta, StringMap};
use fluent_event_sink::sender::{Transport, TransportError};
use fluent_event_sink::TransportRecord;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn string_map(pairs: &[(&str, &str)]) -> StringMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// The pod-killing event used across the sink tests.
pub fn killing_event() -> Event {
    Event {
        metadata: ObjectMeta {
            name: "x.17c2a1b3".to_string(),
            namespace: "default".to_string(),
            labels: string_map(&[("team.example.com/owner", "infra")]),
            ..Default::default()
        },
        reason: "Killing".to_string(),
        message: "Stopping container app".to_string(),
        event_type: "Normal".to_string(),
        count: 1,
        source: EventSource {
            component: "kubelet".to_string(),
            host: "node-1".to_string(),
        },
        involved_object: InvolvedObject {
            kind: "Pod".to_string(),
            namespace: "default".to_string(),
            name: "x".to_string(),
            api_version: "v1".to_string(),
            labels: string_map(&[("app.kubernetes.io/name", "x")]),
            annotations: string_map(&[("prometheus.io/scrape", "true")]),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[derive(Debug, Default)]
struct Inner {
    posts: Mutex<Vec<(String, TransportRecord)>>,
    pending_failures: AtomicUsize,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
}

/// In-memory transport that records every post. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Inner>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` posts fail with a lost connection.
    pub fn fail_next_posts(&self, count: usize) {
        self.inner.pending_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.inner.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<(String, TransportRecord)> {
        self.inner.posts.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    async fn post(&self, tag: &str, record: &TransportRecord) -> Result<(), TransportError> {
        let should_fail = self
            .inner
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::ConnectionLost(
                "connection reset by peer".to_string(),
            ));
        }

        self.inner
            .posts
            .lock()
            .unwrap()
            .push((tag.to_string(), record.clone()));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionLost("broken pipe".to_string()));
        }
        Ok(())
    }
}
