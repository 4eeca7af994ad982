//! Sessions: branch ownership and forking
//!
//! A [`Session`] owns a set of branches keyed by identity. All mutation of
//! the member set happens inside one scoped exclusive region (a
//! `tokio::sync::Mutex`), so concurrent forks never interleave partial
//! registry updates. Reads outside that region are point-in-time
//! snapshots.

use crate::branch::Branch;
use crate::error::SessionError;
use crate::model::ChatModel;
use crate::types::{BranchConfig, BranchId, SessionId};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ordered branch membership for one session
#[derive(Debug, Default)]
struct BranchRegistry {
    members: IndexMap<BranchId, Branch>,
    default_branch: Option<BranchId>,
}

impl BranchRegistry {
    /// Insert a branch, keeping the first insertion as the default
    fn insert(&mut self, branch: Branch) -> bool {
        let id = branch.id();
        let inserted = self.members.insert(id, branch).is_none();
        if self.default_branch.is_none() {
            self.default_branch = Some(id);
        }
        inserted
    }
}

/// Owner and registry of conversation branches
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    model: Arc<dyn ChatModel>,
    default_config: BranchConfig,
    branches: Mutex<BranchRegistry>,
}

impl Session {
    /// Create a session backed by the given chat model
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            id: SessionId::new(),
            model,
            default_config: BranchConfig::default(),
            branches: Mutex::new(BranchRegistry::default()),
        }
    }

    /// With a default configuration applied to new branches
    #[inline]
    #[must_use]
    pub fn with_default_config(mut self, config: BranchConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Session identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Create and register a new branch
    ///
    /// `config` falls back to the session default. No two branches share
    /// identity.
    pub async fn new_branch(&self, config: Option<BranchConfig>) -> Branch {
        let config = config.unwrap_or_else(|| self.default_config.clone());
        let branch = Branch::new(config, Arc::clone(&self.model));
        let mut registry = self.branches.lock().await;
        registry.insert(branch.clone());
        branch
    }

    /// Fork a member branch and register the fork
    ///
    /// The fork's history equals the source's history at fork time; the
    /// two diverge afterwards. Safe to call concurrently from many tasks:
    /// registration happens under the registry lock on every path.
    ///
    /// # Errors
    /// [`SessionError::UnknownBranch`] if `branch` is not a member.
    pub async fn split(&self, branch: &Branch) -> Result<Branch, SessionError> {
        let mut registry = self.branches.lock().await;
        if !registry.members.contains_key(&branch.id()) {
            return Err(SessionError::UnknownBranch(branch.id()));
        }
        let fork = branch.fork().await;
        registry.insert(fork.clone());
        Ok(fork)
    }

    /// Idempotently add an externally created branch to the member set
    ///
    /// Returns `true` if the branch was newly registered.
    pub async fn include(&self, branch: Branch) -> bool {
        let mut registry = self.branches.lock().await;
        if registry.members.contains_key(&branch.id()) {
            return false;
        }
        registry.insert(branch)
    }

    /// Membership test
    pub async fn contains(&self, id: BranchId) -> bool {
        self.branches.lock().await.members.contains_key(&id)
    }

    /// Look up a member branch by identity
    ///
    /// # Errors
    /// [`SessionError::UnknownBranch`] if `id` is not a member.
    pub async fn get(&self, id: BranchId) -> Result<Branch, SessionError> {
        self.branches
            .lock()
            .await
            .members
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownBranch(id))
    }

    /// The designated default branch, if any
    pub async fn default_branch(&self) -> Option<Branch> {
        let registry = self.branches.lock().await;
        registry
            .default_branch
            .and_then(|id| registry.members.get(&id).cloned())
    }

    /// Designate a member branch as the default
    ///
    /// # Errors
    /// [`SessionError::UnknownBranch`] if `id` is not a member.
    pub async fn set_default(&self, id: BranchId) -> Result<(), SessionError> {
        let mut registry = self.branches.lock().await;
        if !registry.members.contains_key(&id) {
            return Err(SessionError::UnknownBranch(id));
        }
        registry.default_branch = Some(id);
        Ok(())
    }

    /// Number of member branches
    pub async fn branch_count(&self) -> usize {
        self.branches.lock().await.members.len()
    }

    /// Member identities in insertion order
    pub async fn branch_ids(&self) -> Vec<BranchId> {
        self.branches.lock().await.members.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::instruct::Instruct;
    use crate::model::{ChatModel, ModelOutput, ModelRequest};
    use crate::types::OperateParams;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, request: ModelRequest) -> Result<ModelOutput, ModelError> {
            let text = request
                .messages
                .last()
                .map(crate::message::Message::text)
                .unwrap_or_default();
            Ok(ModelOutput::new(json!(format!("echo: {text}"))))
        }
    }

    fn session() -> Session {
        Session::new(Arc::new(EchoModel))
    }

    #[tokio::test]
    async fn new_branch_registers_member() {
        let session = session();
        let branch = session.new_branch(None).await;

        assert!(session.contains(branch.id()).await);
        assert_eq!(session.branch_count().await, 1);
        assert_eq!(
            session.default_branch().await.map(|b| b.id()),
            Some(branch.id())
        );
    }

    #[tokio::test]
    async fn split_registers_detached_fork() {
        let session = session();
        let branch = session.new_branch(None).await;
        branch
            .operate(&Instruct::new("seed"), &OperateParams::new())
            .await
            .unwrap();

        let fork = session.split(&branch).await.unwrap();

        assert_ne!(fork.id(), branch.id());
        assert!(session.contains(fork.id()).await);
        assert_eq!(fork.message_count().await, branch.message_count().await);

        // Later mutation of the source is invisible to the fork.
        branch
            .operate(&Instruct::new("more"), &OperateParams::new())
            .await
            .unwrap();
        assert_eq!(fork.message_count().await, 2);
        assert_eq!(branch.message_count().await, 4);
    }

    #[tokio::test]
    async fn split_requires_membership() {
        let session = session();
        let outsider = Branch::new(BranchConfig::new(), Arc::new(EchoModel));

        let err = session.split(&outsider).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownBranch(id) if id == outsider.id()));
    }

    #[tokio::test]
    async fn concurrent_splits_lose_no_registrations() {
        let session = Arc::new(session());
        let branch = session.new_branch(None).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let session = Arc::clone(&session);
            let branch = branch.clone();
            handles.push(tokio::spawn(async move {
                session.split(&branch).await.map(|fork| fork.id())
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 16);
        assert_eq!(session.branch_count().await, 17);
    }

    #[tokio::test]
    async fn include_is_idempotent() {
        let session = session();
        let outsider = Branch::new(BranchConfig::new(), Arc::new(EchoModel));

        assert!(session.include(outsider.clone()).await);
        assert!(!session.include(outsider.clone()).await);
        assert_eq!(session.branch_count().await, 1);
    }

    #[tokio::test]
    async fn set_default_rejects_non_members() {
        let session = session();
        let first = session.new_branch(None).await;
        let second = session.new_branch(None).await;

        assert_eq!(
            session.default_branch().await.map(|b| b.id()),
            Some(first.id())
        );
        session.set_default(second.id()).await.unwrap();
        assert_eq!(
            session.default_branch().await.map(|b| b.id()),
            Some(second.id())
        );

        let err = session.set_default(BranchId::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownBranch(_)));
    }
}
