//! Testing utilities for the arbor workspace
//!
//! Shared scripted chat model and session fixtures.

#![allow(missing_docs)]

use arbor_core::{ChatModel, ModelError, ModelOutput, ModelRequest, Session};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted model response, optionally delayed to exercise
/// completion-order interleavings.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub delay: Duration,
    pub value: Value,
}

impl ScriptedReply {
    pub fn new(value: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            value,
        }
    }

    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Chat model that replays a scripted queue of replies in call order.
///
/// When the queue is exhausted the configured fallback reply is served,
/// or the call fails if no fallback is set. Total calls are counted so
/// tests can assert "zero external calls" properties.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<Value>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_fallback(replies: Vec<ScriptedReply>, fallback: Value) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: Some(fallback),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _request: ModelRequest) -> Result<ModelOutput, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                Ok(ModelOutput::new(reply.value))
            }
            None => match &self.fallback {
                Some(value) => Ok(ModelOutput::new(value.clone())),
                None => Err(ModelError::Request("script exhausted".to_string())),
            },
        }
    }
}

/// Build a structured reply carrying nested instructions.
pub fn expandable_reply(label: &str, instructions: &[&str]) -> Value {
    let instructs: Vec<Value> = instructions
        .iter()
        .map(|text| json!({"instruction": text}))
        .collect();
    json!({"summary": label, "instructs": instructs})
}

/// Build a structured reply with no nested instructions.
pub fn structured_reply(label: &str) -> Value {
    json!({"summary": label, "instructs": []})
}

/// Session backed by a scripted model.
pub fn scripted_session(replies: Vec<ScriptedReply>) -> (Session, Arc<ScriptedModel>) {
    let model = ScriptedModel::new(replies);
    (Session::new(model.clone()), model)
}

/// Session backed by a scripted model with a fallback reply.
pub fn scripted_session_with_fallback(
    replies: Vec<ScriptedReply>,
    fallback: Value,
) -> (Session, Arc<ScriptedModel>) {
    let model = ScriptedModel::with_fallback(replies, fallback);
    (Session::new(model.clone()), model)
}
