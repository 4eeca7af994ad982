//! Arbor Operations
//!
//! Orchestration policies over sessions and branches:
//! - A recursive runner that fans out nested instructions across forked
//!   branches and collects results in input order
//! - Plan: fixed step count, sequential execution on one branch
//! - Brainstorm: concurrent idea execution with optional exploration
//! - Select: enumerated choice with closest-string correction
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_core::{Instruct, Session};
//! use arbor_ops::{brainstorm, BrainstormOptions, BranchSelector};
//!
//! # async fn example(session: Session) -> Result<(), Box<dyn std::error::Error>> {
//! let operation = brainstorm(
//!     &session,
//!     BranchSelector::New,
//!     Instruct::new("ways to speed up the indexer"),
//!     BrainstormOptions::new().with_num_instruct(3),
//! )
//! .await?;
//!
//! for result in operation.flattened() {
//!     println!("{}", result.value());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Operation modules
pub mod brainstorm;
pub mod error;
pub mod plan;
pub mod runner;
pub mod select;
pub mod similarity;
pub mod target;

// Re-exports for convenience
pub use brainstorm::{
    brainstorm, BrainstormForm, BrainstormOperation, BrainstormOptions, ExploredIdea,
    FormParameters,
};
pub use error::OperationError;
pub use plan::{plan, PlanOperation, PlanOptions};
pub use runner::{run_instruct, Expansion};
pub use select::{select, Choices, SelectOptions, SelectionModel};
pub use target::{resolve_branch, BranchSelector};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
