//! The Board: the API resource handlers call.
//!
//! The Board ties the evaluator, the grant mutator, and the share token
//! service to one injected store, and adds the paths that need a
//! collaborator: content creation with auto-grant, guarded content access,
//! and the aggregation queries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use liteboard_core::{
    Action, Clock, ContentId, ContentType, GrantRecord, Project, ProjectMember, ShareLevel,
    ShareToken, ShareTokenId, UserId, ValidationError,
};
use liteboard_perms::{
    Evaluator, GrantMutator, MutationOutcome, PermsError, ShareTokenService,
};
use liteboard_store::{GrantFilter, GrantStore, GrantStoreExt, ShareTokenStore};

use crate::collab::{ContentRepository, IdentityDirectory};
use crate::config::BoardConfig;
use crate::error::{BoardError, Result};

/// Authorization and sharing engine for one board.
pub struct Board<S: GrantStore + ShareTokenStore> {
    store: Arc<S>,
    evaluator: Evaluator<S>,
    mutator: Arc<GrantMutator<S>>,
    tokens: ShareTokenService<S>,
    content: Arc<dyn ContentRepository>,
    directory: Arc<dyn IdentityDirectory>,
    config: BoardConfig,
}

impl<S: GrantStore + ShareTokenStore> Board<S> {
    pub fn new(
        store: S,
        content: Arc<dyn ContentRepository>,
        directory: Arc<dyn IdentityDirectory>,
        clock: Arc<dyn Clock>,
        config: BoardConfig,
    ) -> Self {
        let store = Arc::new(store);
        let mutator = Arc::new(GrantMutator::new(
            Arc::clone(&store),
            config.mutator.clone(),
        ));
        let tokens = ShareTokenService::new(
            Arc::clone(&store),
            Arc::clone(&mutator),
            clock,
            config.tokens.clone(),
        );

        Self {
            evaluator: Evaluator::new(Arc::clone(&store)),
            store,
            mutator,
            tokens,
            content,
            directory,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn has_permission(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
        action: Action,
    ) -> Result<bool> {
        Ok(self
            .evaluator
            .has_permission(user_id, content_type, content_id, action)
            .await?)
    }

    /// String-level check for callers holding raw tags. Unknown content types
    /// and actions are denied.
    pub async fn check_permission(
        &self,
        user_id: UserId,
        content_type: &str,
        content_id: ContentId,
        action: &str,
    ) -> Result<bool> {
        Ok(self
            .evaluator
            .check(user_id, content_type, content_id, action)
            .await?)
    }

    /// `Ok(())` if allowed, `Forbidden` otherwise.
    pub async fn authorize(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
        action: Action,
    ) -> Result<()> {
        if self
            .has_permission(user_id, content_type, content_id, action)
            .await?
        {
            return Ok(());
        }

        tracing::debug!(
            user = %user_id,
            content_type = %content_type,
            content = %content_id,
            action = %action,
            "denied"
        );
        Err(BoardError::Forbidden {
            user_id,
            action,
            content_type,
            content_id,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Mutation
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn add_grant(
        &self,
        user_id: UserId,
        content_type: ContentType,
        action: Action,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        Ok(self
            .mutator
            .add(user_id, content_type, action, content_id)
            .await?)
    }

    pub async fn remove_grant(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        Ok(self
            .mutator
            .remove(user_id, content_type, content_id)
            .await?)
    }

    pub async fn retarget_grant(
        &self,
        user_id: UserId,
        content_type: ContentType,
        action: Action,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        Ok(self
            .mutator
            .retarget(user_id, content_type, action, content_id)
            .await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a project, content list, or content entry and grant its creator
    /// admin and read on it.
    ///
    /// If the item was stored but either grant failed, returns
    /// `GrantPropagation`: the item exists and its creator cannot reach it.
    pub async fn create_content(
        &self,
        creator: UserId,
        content_type: ContentType,
        mut body: Value,
    ) -> Result<ContentId> {
        creator.validate()?;
        if !content_type.is_creatable() {
            return Err(ValidationError::NotCreatable(content_type.to_string()).into());
        }
        if content_type == ContentType::Project {
            let fields = body.as_object_mut().ok_or(ValidationError::BodyNotObject)?;
            fields.insert("creator_id".into(), Value::from(creator.get()));
        }

        let content_id = self.content.create(content_type, body).await?;

        if let Err(source) = self.seed_creator(creator, content_type, content_id).await {
            tracing::error!(
                user = %creator,
                content_type = %content_type,
                content = %content_id,
                error = %source,
                "item created but creator grants failed"
            );
            return Err(BoardError::GrantPropagation {
                content_type,
                content_id,
                source,
            });
        }

        tracing::info!(
            user = %creator,
            content_type = %content_type,
            content = %content_id,
            "created"
        );
        Ok(content_id)
    }

    async fn seed_creator(
        &self,
        creator: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> std::result::Result<(), PermsError> {
        self.mutator
            .add(creator, content_type, Action::Admin, content_id)
            .await?;
        self.mutator
            .add(creator, content_type, Action::Read, content_id)
            .await?;
        Ok(())
    }

    /// Read an item. Requires read.
    pub async fn get_content(
        &self,
        actor: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<Value> {
        self.authorize(actor, content_type, content_id, Action::Read)
            .await?;
        self.content
            .get(content_type, content_id)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("{} {}", content_type, content_id)))
    }

    /// Replace an item's body. Requires write.
    pub async fn update_content(
        &self,
        actor: UserId,
        content_type: ContentType,
        content_id: ContentId,
        body: Value,
    ) -> Result<()> {
        self.authorize(actor, content_type, content_id, Action::Write)
            .await?;
        if !self.content.update(content_type, content_id, body).await? {
            return Err(BoardError::NotFound(format!(
                "{} {}",
                content_type, content_id
            )));
        }
        Ok(())
    }

    /// Delete an item. Requires admin. Grants mentioning it are left behind;
    /// aggregation queries skip them.
    pub async fn delete_content(
        &self,
        actor: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<()> {
        self.authorize(actor, content_type, content_id, Action::Admin)
            .await?;
        if !self.content.delete(content_type, content_id).await? {
            return Err(BoardError::NotFound(format!(
                "{} {}",
                content_type, content_id
            )));
        }
        tracing::info!(
            user = %actor,
            content_type = %content_type,
            content = %content_id,
            "deleted"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Project Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// Give `target` exactly `level` on the project, replacing any other tier
    /// they held on it. The actor must be a project admin.
    pub async fn share_project(
        &self,
        actor: UserId,
        project_id: ContentId,
        target: UserId,
        level: Action,
    ) -> Result<MutationOutcome> {
        self.authorize(actor, ContentType::Project, project_id, Action::Admin)
            .await?;
        let outcome = self
            .mutator
            .retarget(target, ContentType::Project, level, project_id)
            .await?;

        tracing::info!(
            actor = %actor,
            target = %target,
            project = %project_id,
            level = %level,
            "shared project"
        );
        Ok(outcome)
    }

    /// Revoke every tier `target` holds on the project. The actor must be a
    /// project admin.
    pub async fn unshare_project(
        &self,
        actor: UserId,
        project_id: ContentId,
        target: UserId,
    ) -> Result<MutationOutcome> {
        self.authorize(actor, ContentType::Project, project_id, Action::Admin)
            .await?;
        let outcome = self
            .mutator
            .remove(target, ContentType::Project, project_id)
            .await?;

        tracing::info!(
            actor = %actor,
            target = %target,
            project = %project_id,
            "unshared project"
        );
        Ok(outcome)
    }

    pub async fn generate_share_token(
        &self,
        actor: UserId,
        project_id: ContentId,
        level: ShareLevel,
        expires_in_hours: Option<i64>,
    ) -> Result<ShareToken> {
        self.authorize(actor, ContentType::Project, project_id, Action::Admin)
            .await?;
        Ok(self
            .tokens
            .generate(project_id, level, expires_in_hours)
            .await?)
    }

    /// Active tokens for the project. The actor must be a project admin.
    pub async fn share_tokens(&self, actor: UserId, project_id: ContentId) -> Result<Vec<ShareToken>> {
        self.authorize(actor, ContentType::Project, project_id, Action::Admin)
            .await?;
        Ok(self.tokens.list(project_id).await?)
    }

    /// Hard delete, regardless of expiry.
    pub async fn delete_share_token(&self, token_id: ShareTokenId) -> Result<bool> {
        Ok(self.tokens.delete(token_id).await?)
    }

    /// Redeem a token for `user_id`, returning the project it grants.
    pub async fn redeem_share_token(&self, token: &str, user_id: UserId) -> Result<ContentId> {
        Ok(self.tokens.redeem(token, user_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Aggregation
    // ─────────────────────────────────────────────────────────────────────────

    /// Projects the user can at least read, ascending by id. Grants pointing
    /// at projects that no longer exist are skipped.
    pub async fn projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>> {
        user_id.validate()?;

        let records = self.store.grants_for(user_id, ContentType::Project).await?;
        let ids: BTreeSet<ContentId> = records
            .iter()
            .filter(|r| r.action.level().satisfies(Action::Read))
            .flat_map(|r| r.content_ids.iter())
            .collect();

        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(body) = self.content.get(ContentType::Project, id).await? else {
                tracing::warn!(user = %user_id, project = %id, "skipping grant for missing project");
                continue;
            };
            match project_from_body(id, body) {
                Ok(project) => projects.push(project),
                Err(e) => {
                    tracing::warn!(project = %id, error = %e, "skipping malformed project");
                }
            }
        }
        Ok(projects)
    }

    /// Every user with access to the project, once each at their highest
    /// tier, ascending by user id. Requires read on the project.
    pub async fn permissions_for_project(
        &self,
        actor: UserId,
        project_id: ContentId,
    ) -> Result<Vec<ProjectMember>> {
        self.authorize(actor, ContentType::Project, project_id, Action::Read)
            .await?;

        let filter = GrantFilter::new().content_type(ContentType::Project);
        let records = self.store.query_grants(&filter).await?;

        let mut highest: BTreeMap<UserId, Action> = BTreeMap::new();
        for record in records.iter().filter(|r| r.covers(project_id)) {
            highest
                .entry(record.user_id)
                .and_modify(|a| *a = (*a).max(record.action))
                .or_insert(record.action);
        }

        let mut members = Vec::with_capacity(highest.len());
        for (user_id, level) in highest {
            let Some(profile) = self.directory.user_profile(user_id).await? else {
                tracing::warn!(user = %user_id, project = %project_id, "skipping unknown user");
                continue;
            };
            members.push(ProjectMember {
                user_id,
                username: profile.username,
                email: profile.email,
                level,
            });
        }
        Ok(members)
    }

    /// Raw grant rows held by a user, ordered by id.
    pub async fn grants_for_user(&self, user_id: UserId) -> Result<Vec<GrantRecord>> {
        user_id.validate()?;
        Ok(self
            .store
            .query_grants(&GrantFilter::new().user(user_id))
            .await?)
    }
}

/// Build a [`Project`] from its stored body, taking the id from the key.
fn project_from_body(id: ContentId, body: Value) -> serde_json::Result<Project> {
    let mut body = body;
    if let Some(fields) = body.as_object_mut() {
        fields.insert("id".into(), Value::from(id.get()));
    }
    serde_json::from_value(body)
}
