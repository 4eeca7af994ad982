//! Operation branch targeting
//!
//! Operations accept an explicit target instead of a union-typed branch
//! argument: an existing branch handle, a member identity, or a request
//! for a fresh branch.

use arbor_core::{Branch, BranchConfig, BranchId, Session};

/// Which branch an operation should run on
#[derive(Debug, Clone)]
pub enum BranchSelector {
    /// Use this branch; it is registered with the session if not already
    /// a member
    Existing(Branch),
    /// Look up a member by identity; falls back to a fresh branch when
    /// the identity is unknown
    Id(BranchId),
    /// Create a fresh branch
    New,
}

/// Resolve a selector against the session
///
/// Lookup failures recover by creating a new branch with `config`; every
/// returned branch is a session member.
pub async fn resolve_branch(
    session: &Session,
    target: BranchSelector,
    config: Option<BranchConfig>,
) -> Branch {
    match target {
        BranchSelector::Existing(branch) => {
            session.include(branch.clone()).await;
            branch
        }
        BranchSelector::Id(id) => match session.get(id).await {
            Ok(branch) => branch,
            Err(err) => {
                tracing::debug!(%err, "branch lookup failed, creating a new branch");
                session.new_branch(config).await
            }
        },
        BranchSelector::New => session.new_branch(config).await,
    }
}
