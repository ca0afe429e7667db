//! In-process implementation of [`RemoteService`].
//!
//! Behaves like the REST service: assigns ids, validates references, filters
//! listings the same way (projects by workspace and membership, tasks by
//! assignee, newest first) and honours idempotency keys on project create.
//!
//! For tests it also:
//! - records every call in issue order ([`InMemoryRemote::calls`]),
//! - delays chosen calls ([`InMemoryRemote::delay`], [`InMemoryRemote::delay_for`]),
//! - fails chosen calls once ([`InMemoryRemote::fail_next`]),
//! - can skip server-side cascades ([`InMemoryRemote::set_server_cascade`]).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;
use zenspace_types::{
    NewProject, NewTask, Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, User, UserId,
    UserPatch, UserRole, Workspace, WorkspaceId,
};

use super::{IdempotencyKey, RemoteError, RemoteService};

/// One recorded call, with the arguments that identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Login { email: String },
    Signup { email: String },
    ResolveIdentity(UserId),
    ListUsers,
    UpdateUser(UserId, UserPatch),
    ListWorkspaces(UserId),
    CreateWorkspace { name: String },
    RenameWorkspace(WorkspaceId),
    DeleteWorkspace(WorkspaceId),
    ListProjects {
        user: UserId,
        workspace: WorkspaceId,
    },
    CreateProject { name: String, key: String },
    UpdateProject(ProjectId, ProjectPatch),
    DeleteProject(ProjectId),
    ListTasks(UserId),
    CreateTask { title: String },
    UpdateTask(TaskId, TaskPatch),
    DeleteTask(TaskId),
}

impl RemoteCall {
    /// Operation name, used to select delays and failures.
    pub fn op(&self) -> &'static str {
        match self {
            RemoteCall::Login { .. } => "login",
            RemoteCall::Signup { .. } => "signup",
            RemoteCall::ResolveIdentity(_) => "resolve_identity",
            RemoteCall::ListUsers => "list_users",
            RemoteCall::UpdateUser(..) => "update_user",
            RemoteCall::ListWorkspaces(_) => "list_workspaces",
            RemoteCall::CreateWorkspace { .. } => "create_workspace",
            RemoteCall::RenameWorkspace(_) => "rename_workspace",
            RemoteCall::DeleteWorkspace(_) => "delete_workspace",
            RemoteCall::ListProjects { .. } => "list_projects",
            RemoteCall::CreateProject { .. } => "create_project",
            RemoteCall::UpdateProject(..) => "update_project",
            RemoteCall::DeleteProject(_) => "delete_project",
            RemoteCall::ListTasks(_) => "list_tasks",
            RemoteCall::CreateTask { .. } => "create_task",
            RemoteCall::UpdateTask(..) => "update_task",
            RemoteCall::DeleteTask(_) => "delete_task",
        }
    }

    /// The id (or name) the call is about, for targeted delays.
    fn subject(&self) -> Option<&str> {
        match self {
            RemoteCall::Login { email } | RemoteCall::Signup { email } => Some(email.as_str()),
            RemoteCall::ResolveIdentity(u)
            | RemoteCall::ListWorkspaces(u)
            | RemoteCall::ListTasks(u) => Some(u.as_str()),
            RemoteCall::UpdateUser(u, _) => Some(u.as_str()),
            RemoteCall::ListUsers => None,
            RemoteCall::CreateWorkspace { name } | RemoteCall::CreateProject { name, .. } => {
                Some(name.as_str())
            }
            RemoteCall::CreateTask { title } => Some(title.as_str()),
            RemoteCall::RenameWorkspace(w) | RemoteCall::DeleteWorkspace(w) => Some(w.as_str()),
            RemoteCall::ListProjects { workspace, .. } => Some(workspace.as_str()),
            RemoteCall::UpdateProject(p, _) | RemoteCall::DeleteProject(p) => Some(p.as_str()),
            RemoteCall::UpdateTask(t, _) | RemoteCall::DeleteTask(t) => Some(t.as_str()),
        }
    }
}

#[derive(Default)]
struct Tables {
    users: IndexMap<UserId, (User, String)>,
    workspaces: IndexMap<WorkspaceId, Workspace>,
    workspace_members: HashMap<WorkspaceId, Vec<UserId>>,
    projects: IndexMap<ProjectId, Project>,
    tasks: IndexMap<TaskId, Task>,
    idempotency: HashMap<String, ProjectId>,
}

/// In-memory remote service.
pub struct InMemoryRemote {
    tables: Mutex<Tables>,
    calls: Mutex<Vec<RemoteCall>>,
    delays: Mutex<HashMap<(&'static str, Option<String>), Duration>>,
    failures: Mutex<HashMap<&'static str, VecDeque<RemoteError>>>,
    server_cascade: Mutex<bool>,
    next_id: AtomicU64,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            server_cascade: Mutex::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    /// Demo data: one admin, one workspace, one project with three tasks.
    pub fn seeded() -> Self {
        let remote = Self::new();
        let demo = User {
            id: "u1".into(),
            name: "Demo User".into(),
            email: "demo@example.com".into(),
            avatar: User::default_avatar("demo@example.com"),
            role: UserRole::Admin,
        };
        remote.insert_user(demo.clone(), "Demo@123");
        let ws = Workspace {
            id: "demo-workspace".into(),
            name: "Demo's Workspace".into(),
            owner_id: demo.id.clone(),
        };
        remote.insert_workspace(ws.clone());
        let project = NewProject::new("Website Redesign", demo.id.clone(), ws.id.clone())
            .with_description("Modernizing the landing page with better conversion metrics.")
            .with_priority(zenspace_types::Priority::High)
            .into_project("p1".into());
        remote.insert_project(project.clone());
        for (i, (title, status)) in [
            ("Audit current landing page", zenspace_types::TaskStatus::Done),
            ("Draft new hero copy", zenspace_types::TaskStatus::InProgress),
            ("A/B test signup flow", zenspace_types::TaskStatus::Todo),
        ]
        .into_iter()
        .enumerate()
        {
            let task = NewTask::new(project.id.clone(), title, demo.id.clone())
                .with_status(status)
                .into_task(TaskId::new(format!("t{}", i + 1)), Utc::now());
            remote.insert_task(task);
        }
        remote
    }

    // ── Seeding (not recorded) ───────────────────────────────────────────

    pub fn insert_user(&self, user: User, password: &str) {
        self.tables.lock().users.insert(user.id.clone(), (user, password.to_string()));
    }

    pub fn insert_workspace(&self, workspace: Workspace) {
        let mut t = self.tables.lock();
        t.workspace_members
            .entry(workspace.id.clone())
            .or_default()
            .push(workspace.owner_id.clone());
        t.workspaces.insert(workspace.id.clone(), workspace);
    }

    pub fn add_workspace_member(&self, workspace: &WorkspaceId, user: &UserId) {
        let mut t = self.tables.lock();
        let members = t.workspace_members.entry(workspace.clone()).or_default();
        if !members.contains(user) {
            members.push(user.clone());
        }
    }

    pub fn insert_project(&self, project: Project) {
        self.tables.lock().projects.insert(project.id.clone(), project);
    }

    pub fn insert_task(&self, task: Task) {
        self.tables.lock().tasks.insert(task.id.clone(), task);
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls for `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.tables.lock().projects.get(id).cloned()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.tables.lock().tasks.get(id).cloned()
    }

    pub fn project_count(&self) -> usize {
        self.tables.lock().projects.len()
    }

    // ── Fault injection ──────────────────────────────────────────────────

    /// Delay every `op` call.
    pub fn delay(&self, op: &'static str, by: Duration) {
        self.delays.lock().insert((op, None), by);
    }

    /// Delay `op` calls about `subject` (an id, email, or name).
    pub fn delay_for(&self, op: &'static str, subject: &str, by: Duration) {
        self.delays.lock().insert((op, Some(subject.to_string())), by);
    }

    /// Fail the next `op` call with `err`. Queues if called repeatedly.
    pub fn fail_next(&self, op: &'static str, err: RemoteError) {
        self.failures.lock().entry(op).or_default().push_back(err);
    }

    /// When off, deletes remove only the named row and leave children behind.
    pub fn set_server_cascade(&self, on: bool) {
        *self.server_cascade.lock() = on;
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Record, wait out any delay, then pop an injected failure.
    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        trace!("InMemoryRemote <- {:?}", call);
        let op = call.op();
        let delay = {
            let delays = self.delays.lock();
            call.subject()
                .and_then(|s| delays.get(&(op, Some(s.to_string()))).copied())
                .or_else(|| delays.get(&(op, None)).copied())
        };
        self.calls.lock().push(call);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match self.failures.lock().get_mut(op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn require(field: &str, value: &str) -> Result<(), RemoteError> {
    if value.trim().is_empty() {
        return Err(RemoteError::Validation(format!("Missing required field: {field}")));
    }
    Ok(())
}

#[async_trait]
impl RemoteService for InMemoryRemote {
    async fn login(&self, email: &str, password: &str) -> Result<User, RemoteError> {
        self.enter(RemoteCall::Login {
            email: email.to_string(),
        })
        .await?;
        require("email", email)?;
        require("password", password)?;
        let t = self.tables.lock();
        let (user, stored) = t
            .users
            .values()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| RemoteError::Auth("User not found".into()))?;
        if stored != password {
            return Err(RemoteError::Auth("Wrong password".into()));
        }
        Ok(user.clone())
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, RemoteError> {
        self.enter(RemoteCall::Signup {
            email: email.to_string(),
        })
        .await?;
        require("name", name)?;
        require("email", email)?;
        require("password", password)?;
        if self.tables.lock().users.values().any(|(u, _)| u.email.eq_ignore_ascii_case(email)) {
            return Err(RemoteError::Validation("Email exists".into()));
        }
        let user = User {
            id: UserId::new(self.next_id("u")),
            name: name.to_string(),
            email: email.to_string(),
            avatar: User::default_avatar(email),
            role: UserRole::Member,
        };
        self.insert_user(user.clone(), password);
        self.insert_workspace(Workspace {
            id: WorkspaceId::new(self.next_id("w")),
            name: Workspace::default_name_for(name),
            owner_id: user.id.clone(),
        });
        Ok(user)
    }

    async fn resolve_identity(&self, user: &UserId) -> Result<User, RemoteError> {
        self.enter(RemoteCall::ResolveIdentity(user.clone())).await?;
        self.tables
            .lock()
            .users
            .get(user)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| RemoteError::NotFound("User not found".into()))
    }

    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        self.enter(RemoteCall::ListUsers).await?;
        Ok(self.tables.lock().users.values().map(|(u, _)| u.clone()).collect())
    }

    async fn update_user(&self, user: &UserId, patch: &UserPatch) -> Result<User, RemoteError> {
        self.enter(RemoteCall::UpdateUser(user.clone(), patch.clone())).await?;
        let mut t = self.tables.lock();
        let (current, _) = t
            .users
            .get_mut(user)
            .ok_or_else(|| RemoteError::NotFound("User not found".into()))?;
        *current = current.patched(patch);
        Ok(current.clone())
    }

    async fn list_workspaces(&self, user: &UserId) -> Result<Vec<Workspace>, RemoteError> {
        self.enter(RemoteCall::ListWorkspaces(user.clone())).await?;
        require("userId", user.as_str())?;
        let t = self.tables.lock();
        Ok(t.workspaces
            .values()
            .filter(|w| {
                w.owner_id == *user
                    || t.workspace_members.get(&w.id).is_some_and(|m| m.contains(user))
            })
            .cloned()
            .collect())
    }

    async fn create_workspace(
        &self,
        name: &str,
        owner: &UserId,
    ) -> Result<Workspace, RemoteError> {
        self.enter(RemoteCall::CreateWorkspace {
            name: name.to_string(),
        })
        .await?;
        require("name", name)?;
        require("ownerId", owner.as_str())?;
        let ws = Workspace {
            id: WorkspaceId::new(self.next_id("w")),
            name: name.to_string(),
            owner_id: owner.clone(),
        };
        self.insert_workspace(ws.clone());
        Ok(ws)
    }

    async fn rename_workspace(
        &self,
        id: &WorkspaceId,
        name: &str,
    ) -> Result<Workspace, RemoteError> {
        self.enter(RemoteCall::RenameWorkspace(id.clone())).await?;
        require("name", name)?;
        let mut t = self.tables.lock();
        let ws = t
            .workspaces
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound("Workspace not found".into()))?;
        ws.name = name.to_string();
        Ok(ws.clone())
    }

    async fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::DeleteWorkspace(id.clone())).await?;
        let cascade = *self.server_cascade.lock();
        let mut t = self.tables.lock();
        if t.workspaces.shift_remove(id).is_none() {
            return Err(RemoteError::Server("Delete failed".into()));
        }
        t.workspace_members.remove(id);
        if cascade {
            let doomed: Vec<ProjectId> = t
                .projects
                .values()
                .filter(|p| p.workspace_id == *id)
                .map(|p| p.id.clone())
                .collect();
            t.projects.retain(|_, p| p.workspace_id != *id);
            t.tasks.retain(|_, task| !doomed.contains(&task.project_id));
        }
        Ok(())
    }

    async fn list_projects(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Vec<Project>, RemoteError> {
        self.enter(RemoteCall::ListProjects {
            user: user.clone(),
            workspace: workspace.clone(),
        })
        .await?;
        require("userId", user.as_str())?;
        require("workspaceId", workspace.as_str())?;
        let t = self.tables.lock();
        Ok(t.projects
            .values()
            .rev()
            .filter(|p| p.workspace_id == *workspace && (p.lead_id == *user || p.has_member(user)))
            .cloned()
            .collect())
    }

    async fn create_project(
        &self,
        project: &NewProject,
        key: &IdempotencyKey,
    ) -> Result<Project, RemoteError> {
        self.enter(RemoteCall::CreateProject {
            name: project.name.clone(),
            key: key.as_str().to_string(),
        })
        .await?;
        project.validate().map_err(|e| RemoteError::Validation(e.to_string()))?;

        let mut t = self.tables.lock();
        if let Some(existing) = t.idempotency.get(key.as_str()).and_then(|id| t.projects.get(id)) {
            return Ok(existing.clone());
        }
        if !t.workspaces.contains_key(&project.workspace_id) {
            return Err(RemoteError::NotFound("Workspace not found".into()));
        }
        let created = project.clone().into_project(ProjectId::new(self.next_id("p")));
        t.idempotency.insert(key.as_str().to_string(), created.id.clone());
        t.projects.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Project, RemoteError> {
        self.enter(RemoteCall::UpdateProject(id.clone(), patch.clone())).await?;
        let mut t = self.tables.lock();
        let project = t
            .projects
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound("Project not found".into()))?;
        *project = project.patched(patch);
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::DeleteProject(id.clone())).await?;
        let cascade = *self.server_cascade.lock();
        let mut t = self.tables.lock();
        // deleteMany semantics: deleting a missing project still acks.
        t.projects.shift_remove(id);
        if cascade {
            t.tasks.retain(|_, task| task.project_id != *id);
        }
        Ok(())
    }

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, RemoteError> {
        self.enter(RemoteCall::ListTasks(user.clone())).await?;
        let t = self.tables.lock();
        Ok(t.tasks.values().rev().filter(|task| task.assignee_id == *user).cloned().collect())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError> {
        self.enter(RemoteCall::CreateTask {
            title: task.title.clone(),
        })
        .await?;
        task.validate().map_err(|e| RemoteError::Validation(e.to_string()))?;
        let mut t = self.tables.lock();
        if !t.projects.contains_key(&task.project_id) {
            return Err(RemoteError::NotFound("Project not found".into()));
        }
        if !t.users.contains_key(&task.assignee_id) {
            return Err(RemoteError::NotFound("Assignee not found".into()));
        }
        let created = task.clone().into_task(TaskId::new(self.next_id("t")), Utc::now());
        t.tasks.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        self.enter(RemoteCall::UpdateTask(id.clone(), patch.clone())).await?;
        let mut t = self.tables.lock();
        let task = t
            .tasks
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound("Task not found".into()))?;
        *task = task.patched(patch);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::DeleteTask(id.clone())).await?;
        let mut t = self.tables.lock();
        t.tasks
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound("Task not found".into()))
    }
}
