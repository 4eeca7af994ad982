//! Tool invocation
//!
//! A [`Tool`] is an async callable invoked by name with JSON arguments.
//! [`ToolCall`] wraps one invocation: arguments flow through the tool's
//! preprocess hook, the call itself, and the postprocess hook, while the
//! wrapper times the whole pipeline and keeps a structured outcome record.

use crate::error::ToolError;
use crate::message::ActivityStatus;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// An async callable exposed to the model
///
/// The hook defaults are identity; implementors override them to rewrite
/// arguments before the call or the response after it.
#[async_trait]
pub trait Tool: Send + Sync + std::fmt::Debug {
    /// Name the tool is invoked by
    fn name(&self) -> &str;

    /// Rewrite arguments before the call
    async fn preprocess(&self, arguments: Value) -> Result<Value, ToolError> {
        Ok(arguments)
    }

    /// Execute with the preprocessed arguments
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;

    /// Rewrite the response after the call
    async fn postprocess(&self, response: Value) -> Result<Value, ToolError> {
        Ok(response)
    }
}

/// Outcome record of one tool invocation
#[derive(Debug, Clone, Serialize)]
pub struct ToolRecord {
    /// Invoked tool name
    pub function: String,
    /// Arguments as given, before preprocessing
    pub arguments: Value,
    /// Response of a completed invocation
    pub response: Option<Value>,
    /// Error text of a failed invocation
    pub error: Option<String>,
    /// Wall time spent across hooks and call
    pub elapsed: Duration,
    /// Invocation outcome
    pub status: ActivityStatus,
}

/// One invocation of a tool with fixed arguments
#[derive(Debug, Clone)]
pub struct ToolCall {
    tool: Arc<dyn Tool>,
    arguments: Value,
    record: Option<ToolRecord>,
}

impl ToolCall {
    /// Bind a tool to the arguments it will be invoked with
    #[must_use]
    pub fn new(tool: Arc<dyn Tool>, arguments: Value) -> Self {
        Self {
            tool,
            arguments,
            record: None,
        }
    }

    /// Arguments the call was constructed with
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Run preprocess, call, and postprocess, timing the pipeline
    ///
    /// The outcome record is replaced on every invocation; a failed hook or
    /// call leaves a `Failed` record carrying the error text.
    ///
    /// # Errors
    /// Propagates the first [`ToolError`] raised by a hook or the call.
    pub async fn invoke(&mut self) -> Result<Value, ToolError> {
        let start = Instant::now();
        let outcome = self.run().await;
        let elapsed = start.elapsed();

        let record = match &outcome {
            Ok(response) => ToolRecord {
                function: self.tool.name().to_string(),
                arguments: self.arguments.clone(),
                response: Some(response.clone()),
                error: None,
                elapsed,
                status: ActivityStatus::Completed,
            },
            Err(err) => ToolRecord {
                function: self.tool.name().to_string(),
                arguments: self.arguments.clone(),
                response: None,
                error: Some(err.to_string()),
                elapsed,
                status: ActivityStatus::Failed,
            },
        };
        tracing::debug!(
            function = %record.function,
            status = ?record.status,
            elapsed = ?record.elapsed,
            "tool call finished",
        );
        self.record = Some(record);
        outcome
    }

    async fn run(&self) -> Result<Value, ToolError> {
        let arguments = self.tool.preprocess(self.arguments.clone()).await?;
        let response = self.tool.call(arguments).await?;
        self.tool.postprocess(response).await
    }

    /// Record of the most recent invocation, if any
    #[inline]
    #[must_use]
    pub fn record(&self) -> Option<&ToolRecord> {
        self.record.as_ref()
    }
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tool.name(), self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct SumTool;

    #[async_trait]
    impl Tool for SumTool {
        fn name(&self) -> &str {
            "sum"
        }

        async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
            let items = arguments
                .as_array()
                .ok_or_else(|| ToolError::Arguments("expected an array".to_string()))?;
            let mut total = 0.0;
            for item in items {
                total += item
                    .as_f64()
                    .ok_or_else(|| ToolError::Arguments(format!("not a number: {item}")))?;
            }
            Ok(json!(total))
        }
    }

    // Halves every argument on the way in, labels the result on the way out.
    #[derive(Debug)]
    struct HookedTool;

    #[async_trait]
    impl Tool for HookedTool {
        fn name(&self) -> &str {
            "hooked"
        }

        async fn preprocess(&self, arguments: Value) -> Result<Value, ToolError> {
            let halved: Vec<Value> = arguments
                .as_array()
                .into_iter()
                .flatten()
                .map(|item| json!(item.as_f64().unwrap_or_default() / 2.0))
                .collect();
            Ok(Value::Array(halved))
        }

        async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
            SumTool.call(arguments).await
        }

        async fn postprocess(&self, response: Value) -> Result<Value, ToolError> {
            Ok(json!({ "total": response }))
        }
    }

    #[derive(Debug)]
    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(json!("done"))
        }
    }

    #[tokio::test]
    async fn completed_invocation_records_response_and_status() {
        let mut call = ToolCall::new(Arc::new(SumTool), json!([1, 2, 3]));

        let response = call.invoke().await.unwrap();
        assert_eq!(response, json!(6.0));

        let record = call.record().unwrap();
        assert_eq!(record.function, "sum");
        assert_eq!(record.status, ActivityStatus::Completed);
        assert_eq!(record.response, Some(json!(6.0)));
        assert_eq!(record.error, None);
    }

    #[tokio::test]
    async fn failed_invocation_records_error_and_status() {
        let mut call = ToolCall::new(Arc::new(SumTool), json!("not a list"));

        let err = call.invoke().await.unwrap_err();
        assert!(matches!(err, ToolError::Arguments(_)));

        let record = call.record().unwrap();
        assert_eq!(record.status, ActivityStatus::Failed);
        assert_eq!(record.response, None);
        assert!(record.error.as_deref().unwrap().contains("expected an array"));
        // The raw arguments are kept, not the preprocessed ones.
        assert_eq!(record.arguments, json!("not a list"));
    }

    #[tokio::test]
    async fn hooks_run_before_and_after_the_call() {
        let mut call = ToolCall::new(Arc::new(HookedTool), json!([2, 4, 6]));

        let response = call.invoke().await.unwrap();
        assert_eq!(response, json!({ "total": 6.0 }));
        assert_eq!(
            call.record().unwrap().response,
            Some(json!({ "total": 6.0 }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_covers_the_call() {
        let mut call = ToolCall::new(Arc::new(SlowTool), json!({}));

        call.invoke().await.unwrap();

        let record = call.record().unwrap();
        assert!(record.elapsed >= Duration::from_millis(250));
        assert_eq!(record.status, ActivityStatus::Completed);
    }

    #[tokio::test]
    async fn reinvocation_replaces_the_record() {
        let mut call = ToolCall::new(Arc::new(SumTool), json!([1, 1]));

        call.invoke().await.unwrap();
        assert_eq!(call.record().unwrap().status, ActivityStatus::Completed);

        call.invoke().await.unwrap();
        assert_eq!(call.record().unwrap().response, Some(json!(2.0)));
    }

    #[test]
    fn display_shows_name_and_arguments() {
        let call = ToolCall::new(Arc::new(SumTool), json!([1, 2]));
        assert_eq!(call.to_string(), "sum([1,2])");
    }
}
