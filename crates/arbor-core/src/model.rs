//! Chat model boundary
//!
//! The core treats the language model as an opaque async collaborator
//! behind the [`ChatModel`] trait. A call takes the full message history
//! and returns a single JSON value: plain text arrives as a string,
//! structured output as an object.

use crate::error::ModelError;
use crate::message::Message;
use async_trait::async_trait;
use serde_json::Value;

/// Request handed to the chat model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Full ordered message history, latest instruction last
    pub messages: Vec<Message>,
    /// Opaque pass-through parameters
    pub extra: serde_json::Map<String, Value>,
}

/// Response from the chat model
#[derive(Debug, Clone)]
pub struct ModelOutput {
    /// Response payload
    pub value: Value,
}

impl ModelOutput {
    /// Wrap a payload
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

/// External chat model collaborator
///
/// Every invocation is a suspension point; the core performs no retries
/// and applies no timeout at this layer.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Complete the conversation with one model response
    async fn complete(&self, request: ModelRequest) -> Result<ModelOutput, ModelError>;
}
