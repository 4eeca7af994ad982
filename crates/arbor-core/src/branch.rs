//! Conversation branches
//!
//! A [`Branch`] is one isolated conversation context: an append-only
//! message log plus the chat model handle. Branches are cheap `Arc`
//! handles; the log is exclusively owned by the branch and concurrency
//! is achieved by forking, never by sharing one branch across tasks.

use crate::error::CoreError;
use crate::instruct::{Instruct, NESTED_INSTRUCTS_FIELD};
use crate::message::{ActivityEntry, ActivityStatus, Message, MessageStore};
use crate::model::{ChatModel, ModelRequest};
use crate::types::{BranchConfig, BranchId, OperateParams};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of a branch operation
///
/// A closed sum over the shapes a structured model response can take,
/// so the runner branches on a variant tag instead of probing for
/// capabilities at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OperateResponse {
    /// Plain value with no nested instructions
    Plain(Value),
    /// Structured value carrying nested instructions eligible for
    /// recursive execution
    Expandable {
        /// Full response payload
        value: Value,
        /// Extracted nested instructions
        instructs: Vec<Instruct>,
    },
}

impl OperateResponse {
    /// Response payload
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            OperateResponse::Plain(value) | OperateResponse::Expandable { value, .. } => value,
        }
    }

    /// Nested instructions; empty for plain responses
    #[inline]
    #[must_use]
    pub fn instructs(&self) -> &[Instruct] {
        match self {
            OperateResponse::Plain(_) => &[],
            OperateResponse::Expandable { instructs, .. } => instructs,
        }
    }

    /// Whether the response carries nested instructions
    #[inline]
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        matches!(self, OperateResponse::Expandable { .. })
    }

    /// Consume into the payload
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            OperateResponse::Plain(value) | OperateResponse::Expandable { value, .. } => value,
        }
    }
}

#[derive(Debug)]
struct BranchInner {
    id: BranchId,
    config: BranchConfig,
    model: Arc<dyn ChatModel>,
    store: Mutex<MessageStore>,
}

/// One isolated conversation context
#[derive(Debug, Clone)]
pub struct Branch {
    inner: Arc<BranchInner>,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Branch {}

impl Branch {
    /// Create a new branch; a configured system message seeds the log
    #[must_use]
    pub fn new(config: BranchConfig, model: Arc<dyn ChatModel>) -> Self {
        let mut store = MessageStore::new();
        if let Some(system) = &config.system {
            store.append(Message::system(system.clone(), config.system_datetime));
        }
        Self {
            inner: Arc::new(BranchInner {
                id: BranchId::new(),
                config,
                model,
                store: Mutex::new(store),
            }),
        }
    }

    /// Branch identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> BranchId {
        self.inner.id
    }

    /// Branch configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BranchConfig {
        &self.inner.config
    }

    /// Point-in-time copy of this branch under a fresh identity
    ///
    /// The fork receives a snapshot of the message history and an empty
    /// activity log; later mutation of either side does not affect the
    /// other.
    #[must_use = "the fork is not registered anywhere"]
    pub async fn fork(&self) -> Branch {
        let history = self.inner.store.lock().await.messages().to_vec();
        Branch {
            inner: Arc::new(BranchInner {
                id: BranchId::new(),
                config: self.inner.config.clone(),
                model: Arc::clone(&self.inner.model),
                store: Mutex::new(MessageStore::from_history(history)),
            }),
        }
    }

    /// Dispatch an instruction and classify the structured response
    ///
    /// Appends the user message, suspends on the model call, then appends
    /// the assistant message. A response object carrying a malformed
    /// nested-instruction payload is [`CoreError::MalformedResponse`];
    /// model failures propagate unmodified.
    pub async fn operate(
        &self,
        instruct: &Instruct,
        params: &OperateParams,
    ) -> Result<OperateResponse, CoreError> {
        let value = self.invoke("operate", instruct, params).await?;
        match classify(value) {
            Ok(response) => {
                let mut store = self.inner.store.lock().await;
                store.append(Message::assistant(response.value().clone()));
                store
                    .activity_mut()
                    .record(self.id(), "operate", ActivityStatus::Completed);
                Ok(response)
            }
            Err(err) => {
                let mut store = self.inner.store.lock().await;
                store
                    .activity_mut()
                    .record(self.id(), "operate", ActivityStatus::Failed);
                Err(err)
            }
        }
    }

    /// Dispatch an instruction for a plain response
    ///
    /// No nested-instruction extraction; the payload is returned as-is.
    pub async fn communicate(
        &self,
        instruct: &Instruct,
        params: &OperateParams,
    ) -> Result<Value, CoreError> {
        let value = self.invoke("communicate", instruct, params).await?;
        let mut store = self.inner.store.lock().await;
        store.append(Message::assistant(value.clone()));
        store
            .activity_mut()
            .record(self.id(), "communicate", ActivityStatus::Completed);
        Ok(value)
    }

    async fn invoke(
        &self,
        action: &str,
        instruct: &Instruct,
        params: &OperateParams,
    ) -> Result<Value, CoreError> {
        let request = {
            let mut store = self.inner.store.lock().await;
            store.append(Message::user(instruct.to_content()));
            ModelRequest {
                messages: store.messages().to_vec(),
                extra: params.extra.clone(),
            }
        };

        match self.inner.model.complete(request).await {
            Ok(output) => Ok(output.value),
            Err(err) => {
                let mut store = self.inner.store.lock().await;
                store
                    .activity_mut()
                    .record(self.id(), action, ActivityStatus::Failed);
                Err(err.into())
            }
        }
    }

    /// Snapshot of the message history
    #[must_use]
    pub async fn history(&self) -> Vec<Message> {
        self.inner.store.lock().await.messages().to_vec()
    }

    /// Number of messages in the log
    #[must_use]
    pub async fn message_count(&self) -> usize {
        self.inner.store.lock().await.len()
    }

    /// Drain pending activity entries to the tracing sink
    pub async fn drain_activity(&self) -> Vec<ActivityEntry> {
        self.inner.store.lock().await.activity_mut().drain()
    }

    /// Number of activity drains performed on this branch
    #[must_use]
    pub async fn activity_drain_count(&self) -> usize {
        self.inner.store.lock().await.activity().drain_count()
    }
}

/// Classify a raw model payload into the response sum type
fn classify(value: Value) -> Result<OperateResponse, CoreError> {
    let Value::Object(map) = value else {
        return Ok(OperateResponse::Plain(value));
    };

    let Some(raw) = map.get(NESTED_INSTRUCTS_FIELD) else {
        return Ok(OperateResponse::Plain(Value::Object(map)));
    };

    let instructs: Vec<Instruct> = serde_json::from_value(raw.clone()).map_err(|err| {
        CoreError::MalformedResponse(format!(
            "field `{NESTED_INSTRUCTS_FIELD}` is not a list of instructions: {err}"
        ))
    })?;

    Ok(OperateResponse::Expandable {
        value: Value::Object(map),
        instructs,
    })
}
