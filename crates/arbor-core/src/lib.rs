//! Arbor Core
//!
//! Sessions, branches, and the chat model boundary:
//! - A session owns a registry of conversation branches
//! - Branches hold an append-only message log and fork for isolation
//! - Operations dispatch structured instructions through `Branch::operate`
//! - Model responses classify into a closed result sum type
//! - Tools wrap async callables with hooked, timed, recorded invocation
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_core::{Instruct, OperateParams, Session};
//!
//! # async fn example(model: std::sync::Arc<dyn arbor_core::ChatModel>) -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(model);
//! let branch = session.new_branch(None).await;
//!
//! let res = branch.operate(&Instruct::new("say hi"), &OperateParams::new()).await?;
//! println!("{}", res.value());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod branch;
pub mod error;
pub mod instruct;
pub mod message;
pub mod model;
pub mod session;
pub mod tool;
pub mod types;

// Re-exports for convenience
pub use branch::{Branch, OperateResponse};
pub use error::{CoreError, ModelError, SessionError, ToolError};
pub use instruct::{Instruct, NESTED_INSTRUCTS_FIELD};
pub use message::{ActivityEntry, ActivityLog, ActivityStatus, Message, MessageRole, MessageStore};
pub use model::{ChatModel, ModelOutput, ModelRequest};
pub use session::Session;
pub use tool::{Tool, ToolCall, ToolRecord};
pub use types::{BranchConfig, BranchId, MessageId, OperateParams, SessionId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with arbor core
    pub use crate::{
        Branch, BranchConfig, BranchId, ChatModel, CoreError, Instruct, OperateParams,
        OperateResponse, Session, SessionError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
