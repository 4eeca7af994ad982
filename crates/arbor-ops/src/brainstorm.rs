//! Brainstorm operation
//!
//! One round of idea generation produces nested instructions; each runs
//! concurrently on its own forked branch with one level of recursive
//! expansion. An optional explore phase takes the deduplicated nested
//! instructions from round one and runs each through a plain communicate
//! call, pairing instruction and response.

use crate::error::OperationError;
use crate::runner::{preview, run_instruct, Expansion};
use crate::target::{resolve_branch, BranchSelector};
use arbor_core::{BranchConfig, Instruct, OperateParams, OperateResponse, Session};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

const PROMPT: &str = "Brainstorm exactly {num_instruct} distinct follow-up \
ideas for the task. Return each idea as a structured instruction under \
`instructs`, specific enough to run on its own.";

fn brainstorm_guidance(num_instruct: usize) -> String {
    PROMPT.replace("{num_instruct}", &num_instruct.to_string())
}

/// Brainstorm configuration
#[derive(Debug, Clone)]
pub struct BrainstormOptions {
    /// Number of ideas requested from the model
    pub num_instruct: usize,
    /// Run the generated instructions after the initial round
    pub auto_run: bool,
    /// Explore round-one ideas through plain communicate calls;
    /// requires `auto_run`
    pub auto_explore: bool,
    /// Emit progress events
    pub verbose: bool,
    /// Pass-through model parameters
    pub params: OperateParams,
    /// Pass-through parameters for the explore phase
    pub explore_params: OperateParams,
    /// Configuration for a freshly created branch
    pub branch_config: Option<BranchConfig>,
}

impl Default for BrainstormOptions {
    fn default() -> Self {
        Self {
            num_instruct: 2,
            auto_run: true,
            auto_explore: false,
            verbose: false,
            params: OperateParams::new(),
            explore_params: OperateParams::new(),
            branch_config: None,
        }
    }
}

impl BrainstormOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With idea count
    #[inline]
    #[must_use]
    pub fn with_num_instruct(mut self, num_instruct: usize) -> Self {
        self.num_instruct = num_instruct;
        self
    }

    /// With auto-run
    #[inline]
    #[must_use]
    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// With auto-explore
    #[inline]
    #[must_use]
    pub fn with_auto_explore(mut self, auto_explore: bool) -> Self {
        self.auto_explore = auto_explore;
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

/// One explored idea: the instruction and the plain response it drew
#[derive(Debug, Clone, Serialize)]
pub struct ExploredIdea {
    /// Instruction that was explored
    pub instruct: Instruct,
    /// Plain communicate response
    pub response: Value,
}

/// Brainstorm results
#[derive(Debug, Clone, Serialize)]
pub struct BrainstormOperation {
    /// Initial idea-generation response
    pub initial: OperateResponse,
    /// Flattened, deduplicated structured results of the executed ideas
    pub brainstorm: Option<Vec<OperateResponse>>,
    /// Explore-phase records
    pub explore: Option<Vec<ExploredIdea>>,
}

impl BrainstormOperation {
    /// Initial result first, then the executed idea results in order
    #[must_use]
    pub fn flattened(&self) -> Vec<&OperateResponse> {
        let mut out = vec![&self.initial];
        if let Some(results) = &self.brainstorm {
            out.extend(results.iter());
        }
        out
    }
}

/// Perform a brainstorming session
///
/// # Errors
/// `auto_explore` without `auto_run` is rejected before any branch is
/// touched; model and registry failures propagate with no partial-result
/// salvage.
pub async fn brainstorm(
    session: &Session,
    target: BranchSelector,
    instruct: Instruct,
    options: BrainstormOptions,
) -> Result<BrainstormOperation, OperationError> {
    if options.auto_explore && !options.auto_run {
        return Err(OperationError::InvalidArgument(
            "auto_explore requires auto_run".to_string(),
        ));
    }

    if options.verbose {
        tracing::info!(num_instruct = options.num_instruct, "starting brainstorm");
    }

    let branch = resolve_branch(session, target, options.branch_config.clone()).await;

    let guidance = format!(
        "\n{}{}",
        brainstorm_guidance(options.num_instruct),
        instruct.guidance_text()
    );
    let seeded = instruct.with_guidance(guidance);

    let outcome = branch.operate(&seeded, &options.params).await;
    branch.drain_activity().await;
    let initial = outcome?;

    if options.verbose {
        tracing::info!("initial brainstorm complete");
    }

    let mut operation = BrainstormOperation {
        initial,
        brainstorm: None,
        explore: None,
    };

    if !options.auto_run {
        return Ok(operation);
    }

    let ideas = operation.initial.instructs().to_vec();
    let mut kept = Vec::new();
    if !ideas.is_empty() {
        let mut futures = Vec::with_capacity(ideas.len());
        for idea in ideas {
            let fork = session.split(&branch).await?;
            futures.push(run_instruct(
                session,
                fork,
                idea,
                Expansion::Levels(1),
                &options.params,
                options.verbose,
            ));
        }
        let settled = join_all(futures).await;

        let mut flat = Vec::new();
        for result in settled {
            flat.extend(result?);
        }
        kept = dedupe_structured(flat);
        operation.brainstorm = Some(kept.clone());
    }

    if options.auto_explore && !kept.is_empty() {
        let candidates = explore_candidates(&operation.initial, &kept);
        let mut futures = Vec::with_capacity(candidates.len());
        for instruct in candidates {
            let fork = session.split(&branch).await?;
            let explore_params = &options.explore_params;
            let verbose = options.verbose;
            futures.push(async move {
                if verbose {
                    tracing::info!(
                        branch = %fork.id(),
                        guidance = %preview(instruct.guidance_text()),
                        "exploring idea",
                    );
                }
                let outcome = fork.communicate(&instruct, explore_params).await;
                fork.drain_activity().await;
                let response = outcome?;
                Ok::<_, OperationError>(ExploredIdea { instruct, response })
            });
        }
        let settled = join_all(futures).await;

        let mut explored = Vec::with_capacity(settled.len());
        for result in settled {
            explored.push(result?);
        }
        operation.explore = Some(explored);
    }

    Ok(operation)
}

/// Keep structured (object) results, dropping primitive placeholders and
/// duplicates while preserving order
fn dedupe_structured(results: Vec<OperateResponse>) -> Vec<OperateResponse> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for result in results {
        if !result.value().is_object() {
            continue;
        }
        if seen.insert(result.value().to_string()) {
            out.push(result);
        }
    }
    out
}

/// Deduplicated nested instructions carried by the initial result and the
/// kept round-one results, in encounter order
fn explore_candidates(initial: &OperateResponse, kept: &[OperateResponse]) -> Vec<Instruct> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for response in std::iter::once(initial).chain(kept.iter()) {
        for instruct in response.instructs() {
            let key = serde_json::to_string(instruct).unwrap_or_default();
            if seen.insert(key) {
                out.push(instruct.clone());
            }
        }
    }
    out
}

/// Tunable parameters of a persisted brainstorm form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormParameters {
    /// Ideas requested per round
    pub num_ideas: usize,
    /// Confidence cutoff for keeping an idea
    pub min_confidence_score: f64,
    /// Near-duplicate tolerance
    pub max_similar_ideas: usize,
}

/// Persisted brainstorm session state
///
/// Boundary format: the JSON object keeps exactly the keys `metrics`,
/// `results`, `filters`, and `parameters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrainstormForm {
    /// Named metric values
    pub metrics: serde_json::Map<String, Value>,
    /// Accumulated idea records
    pub results: Vec<Value>,
    /// Active result filters
    pub filters: Vec<Value>,
    /// Tunable parameters
    pub parameters: FormParameters,
}

impl BrainstormForm {
    /// Save as JSON
    ///
    /// # Errors
    /// Serialization or file-system failures.
    pub fn save(&self, path: &Path) -> Result<(), OperationError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON
    ///
    /// # Errors
    /// Deserialization or file-system failures.
    pub fn load(path: &Path) -> Result<Self, OperationError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
