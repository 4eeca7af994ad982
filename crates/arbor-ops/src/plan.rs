//! Plan operation
//!
//! One planning call generates a fixed number of steps; with auto-run the
//! steps execute sequentially against the same branch, accumulating an
//! ordered result list. No forking and no recursive expansion.

use crate::error::OperationError;
use crate::runner::preview;
use crate::target::{resolve_branch, BranchSelector};
use arbor_core::{Branch, BranchConfig, Instruct, OperateParams, OperateResponse, Session};
use serde::Serialize;

const PROMPT: &str = "Devise a plan with exactly {num_steps} steps. \
Return each step as a structured instruction under `instructs`, ordered so \
that every step builds on the ones before it.";

fn plan_guidance(num_steps: usize) -> String {
    PROMPT.replace("{num_steps}", &num_steps.to_string())
}

/// Plan configuration
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Number of steps requested from the model
    pub num_steps: usize,
    /// Execute the generated steps after planning
    pub auto_run: bool,
    /// Emit progress events
    pub verbose: bool,
    /// Pass-through model parameters
    pub params: OperateParams,
    /// Configuration for a freshly created branch
    pub branch_config: Option<BranchConfig>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            num_steps: 3,
            auto_run: true,
            verbose: false,
            params: OperateParams::new(),
            branch_config: None,
        }
    }
}

impl PlanOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With step count
    #[inline]
    #[must_use]
    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    /// With auto-run
    #[inline]
    #[must_use]
    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
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

/// Ordered plan results: the planning response first, then one result per
/// executed step
#[derive(Debug, Clone, Serialize)]
pub struct PlanOperation {
    results: Vec<OperateResponse>,
}

impl PlanOperation {
    fn new(initial: OperateResponse) -> Self {
        Self {
            results: vec![initial],
        }
    }

    /// All results in execution order
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[OperateResponse] {
        &self.results
    }

    /// The planning response
    #[inline]
    #[must_use]
    pub fn initial(&self) -> &OperateResponse {
        &self.results[0]
    }

    /// Results of the executed steps, in order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[OperateResponse] {
        self.results.get(1..).unwrap_or(&[])
    }

    /// Consume into the result list
    #[inline]
    #[must_use]
    pub fn into_results(self) -> Vec<OperateResponse> {
        self.results
    }
}

/// Create and optionally execute a multi-step plan
///
/// # Errors
/// Propagates model and registry failures; already-completed step results
/// are discarded on failure.
pub async fn plan(
    session: &Session,
    target: BranchSelector,
    instruct: Instruct,
    options: PlanOptions,
) -> Result<PlanOperation, OperationError> {
    if options.verbose {
        tracing::info!(num_steps = options.num_steps, "planning execution");
    }

    let branch = resolve_branch(session, target, options.branch_config.clone()).await;

    let guidance = format!(
        "\n{}\n{}",
        plan_guidance(options.num_steps),
        instruct.guidance_text()
    );
    let seeded = instruct.with_guidance(guidance);

    let outcome = branch.operate(&seeded, &options.params).await;
    branch.drain_activity().await;
    let initial = outcome?;

    if options.verbose {
        tracing::info!("initial planning complete");
    }

    let mut operation = PlanOperation::new(initial);
    if !options.auto_run {
        return Ok(operation);
    }

    let steps = operation.initial().instructs().to_vec();
    for (idx, step) in steps.iter().enumerate() {
        if options.verbose {
            tracing::info!(
                step = idx + 1,
                total = steps.len(),
                guidance = %preview(step.guidance_text()),
                "executing step",
            );
        }
        operation
            .results
            .push(run_step(&branch, step, &options.params).await?);
    }

    if options.verbose {
        tracing::info!("all steps completed");
    }
    Ok(operation)
}

/// Execute a single plan step on the shared branch
async fn run_step(
    branch: &Branch,
    step: &Instruct,
    params: &OperateParams,
) -> Result<OperateResponse, OperationError> {
    let outcome = branch.operate(step, params).await;
    branch.drain_activity().await;
    Ok(outcome?)
}
