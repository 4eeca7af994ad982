//! Recursive instruction runner
//!
//! Drives one instruction through a branch, then, within the expansion
//! budget, forks one branch per nested instruction and recurses over them
//! concurrently. Fan-in preserves input order, not completion order.
//!
//! Failure policy: all siblings in a fan-out batch are awaited to
//! completion, then the first failure in input order is surfaced;
//! completed sibling results are discarded on failure.

use crate::error::OperationError;
use arbor_core::{Branch, Instruct, OperateParams, OperateResponse, Session};
use futures::future::{join_all, BoxFuture};

/// Recursion-depth budget for nested-instruction expansion
///
/// Passed down explicitly: each recursion level hands its children one
/// level less, so expansion bottoms out instead of toggling flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Never expand nested instructions
    Disabled,
    /// Expand up to this many levels deep
    Levels(u8),
}

impl Expansion {
    /// Whether expansion applies at the current level
    #[inline]
    #[must_use]
    pub fn enabled(self) -> bool {
        matches!(self, Expansion::Levels(n) if n > 0)
    }

    /// Budget handed to the next recursion level
    #[inline]
    #[must_use]
    pub fn child(self) -> Expansion {
        match self {
            Expansion::Levels(n) if n > 1 => Expansion::Levels(n - 1),
            _ => Expansion::Disabled,
        }
    }
}

/// Truncated guidance preview for progress logging
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > 100 {
        let short: String = text.chars().take(100).collect();
        format!("{short}...")
    } else {
        text.to_string()
    }
}

/// Run one instruction, expanding nested instructions within budget
///
/// Returns a flat ordered list: the parent result first, then each
/// child's flattened results in input order. The branch's activity log is
/// drained once per operate call, completed or failed.
pub fn run_instruct<'a>(
    session: &'a Session,
    branch: Branch,
    instruct: Instruct,
    expansion: Expansion,
    params: &'a OperateParams,
    verbose: bool,
) -> BoxFuture<'a, Result<Vec<OperateResponse>, OperationError>> {
    Box::pin(async move {
        if verbose {
            tracing::info!(
                branch = %branch.id(),
                guidance = %preview(instruct.guidance_text()),
                "running instruction",
            );
        }

        let outcome = branch.operate(&instruct, params).await;
        branch.drain_activity().await;
        let response = outcome?;

        let nested = response.instructs().to_vec();
        if !expansion.enabled() || nested.is_empty() {
            return Ok(vec![response]);
        }

        let mut futures = Vec::with_capacity(nested.len());
        for instruct in nested {
            let fork = session.split(&branch).await?;
            futures.push(run_instruct(
                session,
                fork,
                instruct,
                expansion.child(),
                params,
                verbose,
            ));
        }
        let settled = join_all(futures).await;

        let mut results = vec![response];
        for result in settled {
            results.extend(result?);
        }
        Ok(results)
    })
}
