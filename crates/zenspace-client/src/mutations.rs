//! Create / update / delete for every entity kind.
//!
//! Every remote mutation follows the same shape: check preconditions against
//! the cache (failing with zero requests), release the lock, await the
//! service, then apply the confirmed record. A failed call leaves the cache
//! exactly as it was.
//!
//! Deletes cascade locally no matter what the service did with children.
//! With `reconcile_after_cascade` set, project and workspace deletes are
//! followed by a task re-read to catch server-side drift.

use tracing::{debug, info};
use zenspace_types::{
    Comment, CommentId, FileAsset, FileId, NewProject, NewTask, Project, ProjectId, ProjectPatch,
    Task, TaskId, TaskPatch, TaskStatus, User, UserId, UserPatch, ValidationError, Workspace,
    WorkspaceId,
};

use crate::cache::CascadeReport;
use crate::error::{StoreError, StoreResult};
use crate::fetch::FetchFamily;
use crate::store::{Store, require};

impl Store {
    // ── Workspaces ───────────────────────────────────────────────────────

    /// Create a workspace owned by the current user and switch to it.
    pub async fn create_workspace(&self, name: &str) -> StoreResult<Workspace> {
        require("name", name)?;
        let owner = self.require_user()?;
        let workspace = self
            .call("create_workspace", self.remote.create_workspace(name.trim(), &owner))
            .await?;
        {
            let mut state = self.state.lock();
            state.cache.prepend_workspace(workspace.clone());
            state.activate(Some(workspace.id.clone()), &self.persistence);
        }
        info!("Created workspace {} ({})", workspace.name, workspace.id);
        self.sync().await?;
        Ok(workspace)
    }

    pub async fn rename_workspace(&self, id: &WorkspaceId, name: &str) -> StoreResult<Workspace> {
        require("name", name)?;
        self.require_user()?;
        self.ensure_workspace(id)?;
        let workspace = self
            .call("rename_workspace", self.remote.rename_workspace(id, name.trim()))
            .await?;
        let mut state = self.state.lock();
        if state.cache.replace_workspace(workspace.clone())
            && state.active_workspace.as_ref() == Some(&workspace.id)
        {
            self.persistence.save_active_workspace(Some(&workspace));
        }
        Ok(workspace)
    }

    /// Delete a workspace and everything under it. If it was active, the
    /// first remaining workspace (or none) takes over.
    pub async fn delete_workspace(&self, id: &WorkspaceId) -> StoreResult<CascadeReport> {
        self.require_user()?;
        self.ensure_workspace(id)?;
        self.call("delete_workspace", self.remote.delete_workspace(id)).await?;
        let report = {
            let mut state = self.state.lock();
            let report = state.cache.remove_workspace(id);
            if state.active_workspace.as_ref() == Some(id) {
                let next = state.cache.workspaces().next().map(|w| w.id.clone());
                info!("Active workspace {} deleted, now {:?}", id, next);
                state.preferred_workspace = None;
                state.activate(next, &self.persistence);
            }
            report
        };
        info!("Deleted workspace {} ({} dependents)", id, report.dependents());
        self.sync().await?;
        if self.config.reconcile_after_cascade {
            self.sync_family(FetchFamily::Tasks, true).await?;
        }
        Ok(report)
    }

    // ── Projects ─────────────────────────────────────────────────────────

    /// Create a project. Returns `Ok(None)` when dropped as a duplicate of a
    /// create that is still in flight or just settled.
    pub async fn create_project(&self, input: NewProject) -> StoreResult<Option<Project>> {
        self.require_user()?;
        input.validate()?;
        self.ensure_workspace(&input.workspace_id)?;

        let Some(permit) = self.create_guard.try_begin() else {
            info!("Dropped duplicate create_project '{}'", input.name);
            return Ok(None);
        };
        let project = self
            .call("create_project", self.remote.create_project(&input, permit.key()))
            .await?;

        let mut state = self.state.lock();
        if state.active_workspace.as_ref() == Some(&project.workspace_id) {
            state.cache.prepend_project(project.clone());
        } else {
            debug!("Created project {} outside the active workspace", project.id);
        }
        info!("Created project {} ({})", project.name, project.id);
        Ok(Some(project))
    }

    pub async fn update_project(
        &self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> StoreResult<Project> {
        self.require_user()?;
        let current = self.cached_project(id)?;
        if patch.is_empty() {
            return Ok(current);
        }
        let project = self.call("update_project", self.remote.update_project(id, &patch)).await?;
        self.state.lock().cache.replace_project(project.clone());
        Ok(project)
    }

    /// Add `user` to the project's members. Already a member: no request.
    pub async fn add_project_member(&self, id: &ProjectId, user: &UserId) -> StoreResult<Project> {
        let project = self.cached_project(id)?;
        if project.has_member(user) {
            return Ok(project);
        }
        let mut members = project.member_ids.clone();
        members.push(user.clone());
        self.update_project(id, ProjectPatch::members(members)).await
    }

    /// Remove `user` from the project's members. The lead cannot be removed.
    pub async fn remove_project_member(
        &self,
        id: &ProjectId,
        user: &UserId,
    ) -> StoreResult<Project> {
        let project = self.cached_project(id)?;
        if project.lead_id == *user {
            return Err(
                ValidationError::invalid("memberIds", "the project lead cannot be removed").into(),
            );
        }
        if !project.has_member(user) {
            return Ok(project);
        }
        let members = project.member_ids.iter().filter(|m| *m != user).cloned().collect();
        self.update_project(id, ProjectPatch::members(members)).await
    }

    /// Delete a project with its tasks, files, and comments.
    pub async fn delete_project(&self, id: &ProjectId) -> StoreResult<CascadeReport> {
        self.require_user()?;
        self.cached_project(id)?;
        self.call("delete_project", self.remote.delete_project(id)).await?;
        let report = self.state.lock().cache.remove_project(id);
        info!(
            "Deleted project {} with {} tasks, {} files, {} comments",
            id, report.tasks, report.files, report.comments
        );
        if self.config.reconcile_after_cascade {
            self.sync_family(FetchFamily::Tasks, true).await?;
        }
        Ok(report)
    }

    // ── Tasks ────────────────────────────────────────────────────────────

    /// Create a task. Its project must already be loaded.
    pub async fn create_task(&self, input: NewTask) -> StoreResult<Task> {
        self.require_user()?;
        input.validate()?;
        if self.state.lock().cache.project(&input.project_id).is_none() {
            return Err(ValidationError::invalid("projectId", "project is not loaded").into());
        }
        let task = self.call("create_task", self.remote.create_task(&input)).await?;
        if !self.state.lock().cache.prepend_task(task.clone()) {
            debug!("Project {} went away before task {} landed", task.project_id, task.id);
        }
        Ok(task)
    }

    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> StoreResult<Task> {
        self.require_user()?;
        let current = self.cached_task(id)?;
        if patch.is_empty() {
            return Ok(current);
        }
        let task = self.call("update_task", self.remote.update_task(id, &patch)).await?;
        self.state.lock().cache.replace_task(task.clone());
        Ok(task)
    }

    /// Board drag: a status-only update. Dropping on the current column
    /// sends nothing and returns `None`.
    pub async fn move_task(&self, id: &TaskId, status: TaskStatus) -> StoreResult<Option<Task>> {
        let current = self.cached_task(id)?;
        if current.status == status {
            debug!("Task {} already {}", id, status);
            return Ok(None);
        }
        self.update_task(id, TaskPatch::status(status)).await.map(Some)
    }

    pub async fn delete_task(&self, id: &TaskId) -> StoreResult<CascadeReport> {
        self.require_user()?;
        self.cached_task(id)?;
        self.call("delete_task", self.remote.delete_task(id)).await?;
        let report = self.state.lock().cache.remove_task(id);
        debug!("Deleted task {} with {} comments", id, report.comments);
        Ok(report)
    }

    // ── Profile & members ────────────────────────────────────────────────

    pub async fn update_profile(&self, name: &str, email: &str) -> StoreResult<User> {
        require("name", name)?;
        require("email", email)?;
        self.update_user(UserPatch {
            name: Some(name.trim().to_string()),
            email: Some(email.trim().to_string()),
            avatar: None,
        })
        .await
    }

    pub async fn update_avatar(&self, avatar: &str) -> StoreResult<User> {
        require("avatar", avatar)?;
        self.update_user(UserPatch {
            avatar: Some(avatar.trim().to_string()),
            ..Default::default()
        })
        .await
    }

    async fn update_user(&self, patch: UserPatch) -> StoreResult<User> {
        let id = self.require_user()?;
        let user = self.call("update_user", self.remote.update_user(&id, &patch)).await?;
        self.state.lock().cache.upsert_user(user.clone());
        Ok(user)
    }

    /// Look up a registered user by email and add them to the users table.
    pub async fn invite_member(&self, email: &str) -> StoreResult<User> {
        require("email", email)?;
        self.require_user()?;
        let email = email.trim();
        let users = self.call("list_users", self.remote.list_users()).await?;
        let user = users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| StoreError::not_found("user", email))?;
        info!("Invited {}", user);
        self.state.lock().cache.upsert_user(user.clone());
        Ok(user)
    }

    // ── Files & comments (cache only) ────────────────────────────────────

    /// Ingest an uploaded file record. Its project must be loaded.
    pub fn attach_file(&self, file: FileAsset) -> StoreResult<()> {
        let project = file.project_id.clone();
        if self.state.lock().cache.prepend_file(file) {
            Ok(())
        } else {
            Err(StoreError::not_found("project", project))
        }
    }

    pub fn add_comment(&self, comment: Comment) -> StoreResult<()> {
        let project = comment.project_id.clone();
        if self.state.lock().cache.prepend_comment(comment) {
            Ok(())
        } else {
            Err(StoreError::not_found("project", project))
        }
    }

    pub fn remove_file(&self, id: &FileId) -> bool {
        self.state.lock().cache.remove_file(id)
    }

    pub fn remove_comment(&self, id: &CommentId) -> bool {
        self.state.lock().cache.remove_comment(id)
    }

    // ── Preconditions ────────────────────────────────────────────────────

    fn ensure_workspace(&self, id: &WorkspaceId) -> StoreResult<()> {
        match self.state.lock().cache.workspace(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("workspace", id)),
        }
    }

    fn cached_project(&self, id: &ProjectId) -> StoreResult<Project> {
        self.state
            .lock()
            .cache
            .project(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("project", id))
    }

    fn cached_task(&self, id: &TaskId) -> StoreResult<Task> {
        self.state
            .lock()
            .cache
            .task(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", id))
    }
}
