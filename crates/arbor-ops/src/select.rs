//! Select operation
//!
//! Issues one instruction embedding an enumerated choice set, expects a
//! structured `selected` list back, and corrects each raw token against
//! the canonical choice identifiers by closest-string match. Not
//! recursive; exactly one external call.

use crate::error::OperationError;
use crate::similarity;
use crate::target::{resolve_branch, BranchSelector};
use arbor_core::{BranchConfig, Instruct, OperateParams, Session};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PROMPT: &str = "Select up to {max_num_selections} items from the \
following choices: {choices}. Return the chosen identifiers under \
`selected`.";

/// Choice set offered to the model
#[derive(Debug, Clone)]
pub enum Choices {
    /// Plain string choices; the identifier is the representation
    Plain(Vec<String>),
    /// Keyed choices; the key is the identifier, the value its
    /// representation (and what a corrected selection resolves to)
    Keyed(IndexMap<String, Value>),
    /// Raw JSON values, normalized when the operation runs
    Values(Vec<Value>),
}

/// Normalized (key, representation, resolved value) triples
#[derive(Debug, Clone)]
struct NormalizedChoices {
    entries: Vec<(String, String, Value)>,
}

impl NormalizedChoices {
    fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _, _)| key.as_str())
    }

    fn resolve(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, _, value)| value)
    }
}

impl Choices {
    /// Reduce to uniform (key, representation) pairs
    ///
    /// # Errors
    /// [`OperationError::Normalization`] on an empty set or a raw value
    /// list that is not uniformly strings.
    fn normalized(&self) -> Result<NormalizedChoices, OperationError> {
        let entries = match self {
            Choices::Plain(items) => items
                .iter()
                .map(|s| (s.clone(), s.clone(), Value::String(s.clone())))
                .collect::<Vec<_>>(),
            Choices::Keyed(map) => map
                .iter()
                .map(|(key, value)| {
                    let rep = match value {
                        Value::String(s) => s.clone(),
                        other => serde_json::to_string_pretty(other).unwrap_or_default(),
                    };
                    (key.clone(), rep, value.clone())
                })
                .collect(),
            Choices::Values(values) => {
                let mut entries = Vec::with_capacity(values.len());
                for value in values {
                    let Value::String(s) = value else {
                        return Err(OperationError::Normalization(format!(
                            "choice list is not uniformly strings: {value}"
                        )));
                    };
                    entries.push((s.clone(), s.clone(), Value::String(s.clone())));
                }
                entries
            }
        };

        if entries.is_empty() {
            return Err(OperationError::Normalization(
                "choice set is empty".to_string(),
            ));
        }
        Ok(NormalizedChoices { entries })
    }
}

/// Structured selection response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionModel {
    /// Selected choice identifiers (corrected to canonical form)
    #[serde(default)]
    pub selected: Vec<Value>,
}

/// Select configuration
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Maximum selections allowed
    pub max_num_selections: usize,
    /// Emit progress events
    pub verbose: bool,
    /// Pass-through model parameters
    pub params: OperateParams,
    /// Configuration for a freshly created branch
    pub branch_config: Option<BranchConfig>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            max_num_selections: 1,
            verbose: false,
            params: OperateParams::new(),
            branch_config: None,
        }
    }
}

impl SelectOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With selection limit
    #[inline]
    #[must_use]
    pub fn with_max_num_selections(mut self, max: usize) -> Self {
        self.max_num_selections = max;
        self
    }

    /// With verbose progress
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Perform a selection from the given choices
///
/// # Errors
/// Normalization failures are raised before any model call; model and
/// registry failures propagate.
pub async fn select(
    session: &Session,
    target: BranchSelector,
    instruct: Instruct,
    choices: &Choices,
    options: SelectOptions,
) -> Result<SelectionModel, OperationError> {
    let normalized = choices.normalized()?;

    if options.verbose {
        tracing::info!(
            max_num_selections = options.max_num_selections,
            "starting selection",
        );
    }

    let branch = resolve_branch(session, target, options.branch_config.clone()).await;

    let keys: Vec<&str> = normalized.keys().collect();
    let prompt = PROMPT
        .replace(
            "{max_num_selections}",
            &options.max_num_selections.to_string(),
        )
        .replace("{choices}", &keys.join(", "));

    let mut built = instruct;
    built.instruction = if built.instruction.is_empty() {
        prompt
    } else {
        format!("{}\n\n{prompt}", built.instruction)
    };
    for (key, rep, _) in &normalized.entries {
        built.context.push(serde_json::json!({ key: rep }));
    }

    let outcome = branch.operate(&built, &options.params).await;
    branch.drain_activity().await;
    let response = outcome?;

    let raw = parse_selected(response.value());
    if options.verbose {
        tracing::info!(selected = ?raw, "received selection");
    }

    let mut corrected = Vec::with_capacity(raw.len());
    for token in raw {
        let token_text = match &token {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if let Some(key) = similarity::closest(&token_text, normalized.keys()) {
            if let Some(value) = normalized.resolve(key) {
                corrected.push(value.clone());
            }
        }
    }

    Ok(SelectionModel {
        selected: corrected,
    })
}

/// Extract raw selected tokens from a response payload
fn parse_selected(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => match map.get("selected") {
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
            None => Vec::new(),
        },
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_test_utils::{scripted_session, ScriptedReply};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn colors() -> Choices {
        Choices::Plain(vec![
            "red".to_string(),
            "green".to_string(),
            "blue".to_string(),
        ])
    }

    #[tokio::test]
    async fn select_corrects_typos_to_canonical_choice() {
        let (session, model) = scripted_session(vec![ScriptedReply::new(json!({
            "selected": ["gren"],
        }))]);

        let selection = select(
            &session,
            BranchSelector::New,
            Instruct::new("pick a color"),
            &colors(),
            SelectOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(selection.selected, vec![json!("green")]);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn non_uniform_choices_fail_before_any_model_call() {
        let (session, model) = scripted_session(vec![ScriptedReply::new(json!({
            "selected": ["red"],
        }))]);
        let mixed = Choices::Values(vec![json!("red"), json!(42)]);

        let err = select(
            &session,
            BranchSelector::New,
            Instruct::new("pick"),
            &mixed,
            SelectOptions::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OperationError::Normalization(_)));
        assert_eq!(model.call_count(), 0);
        assert_eq!(session.branch_count().await, 0);
    }

    #[tokio::test]
    async fn keyed_choices_resolve_to_their_values() {
        let (session, _) = scripted_session(vec![ScriptedReply::new(json!({
            "selected": ["fast"],
        }))]);

        let mut map = IndexMap::new();
        map.insert("fast".to_string(), json!({"timeout_ms": 100}));
        map.insert("thorough".to_string(), json!({"timeout_ms": 5000}));

        let selection = select(
            &session,
            BranchSelector::New,
            Instruct::new("pick a mode"),
            &Choices::Keyed(map),
            SelectOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(selection.selected, vec![json!({"timeout_ms": 100})]);
    }

    #[tokio::test]
    async fn choice_context_is_embedded_in_the_instruction() {
        let (session, _) = scripted_session(vec![ScriptedReply::new(json!({
            "selected": ["red"],
        }))]);

        select(
            &session,
            BranchSelector::New,
            Instruct::new("pick a color"),
            &colors(),
            SelectOptions::new().with_max_num_selections(2),
        )
        .await
        .unwrap();

        let branch = session.default_branch().await.unwrap();
        let history = branch.history().await;
        let user = &history[0];
        let content = user.content.to_string();
        assert!(content.contains("red, green, blue"));
        assert!(content.contains("up to 2"));
    }

    #[tokio::test]
    async fn plain_string_response_is_treated_as_single_token() {
        let (session, _) = scripted_session(vec![ScriptedReply::new(json!("bluee"))]);

        let selection = select(
            &session,
            BranchSelector::New,
            Instruct::new("pick"),
            &colors(),
            SelectOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(selection.selected, vec![json!("blue")]);
    }

    #[test]
    fn empty_choice_set_is_a_normalization_error() {
        let err = Choices::Plain(Vec::new()).normalized().unwrap_err();
        assert!(matches!(err, OperationError::Normalization(_)));
    }
}
