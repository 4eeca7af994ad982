//! Structured instructions
//!
//! An [`Instruct`] is the unit of work dispatched to a branch: instruction
//! text, optional guidance, and an optional context payload. Instructions
//! are immutable once dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name under which a structured response carries nested instructions
pub const NESTED_INSTRUCTS_FIELD: &str = "instructs";

/// A structured request dispatched to a branch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instruct {
    /// Instruction text
    pub instruction: String,
    /// Optional guidance prepended by operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    /// Optional context payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
}

impl Instruct {
    /// Create new instruction
    #[inline]
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            guidance: None,
            context: Vec::new(),
        }
    }

    /// With guidance
    #[inline]
    #[must_use]
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// With an additional context item
    #[inline]
    #[must_use]
    pub fn with_context(mut self, item: Value) -> Self {
        self.context.push(item);
        self
    }

    /// Guidance text, empty when unset
    #[inline]
    #[must_use]
    pub fn guidance_text(&self) -> &str {
        self.guidance.as_deref().unwrap_or("")
    }

    /// Render as message content for the model
    #[must_use]
    pub fn to_content(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("instruction".to_string(), Value::String(self.instruction.clone()));
        if let Some(guidance) = &self.guidance {
            map.insert("guidance".to_string(), Value::String(guidance.clone()));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), Value::Array(self.context.clone()));
        }
        Value::Object(map)
    }
}
