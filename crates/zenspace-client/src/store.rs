//! The synchronization store.
//!
//! [`Store`] owns the entity cache and is the only thing that mutates it.
//! Everything else reads snapshots. State lives behind one mutex that is
//! never held across an `.await`: each operation locks to decide, releases
//! to talk to the remote service, then locks again to apply the result.
//!
//! Mutations live in `mutations.rs`; this file covers construction, session
//! handling, active workspace selection, and the dependent fetch loop.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zenspace_types::{
    Project, ProjectId, Task, Theme, User, UserId, ValidationError, Workspace, WorkspaceId,
};

use crate::cache::EntityCache;
use crate::config::ClientConfig;
use crate::error::{StoreError, StoreResult};
use crate::fetch::{FetchDeps, FetchFamily, FetchOrchestrator, FetchPlan, FetchTag};
use crate::guard::{FlightPhase, SingleFlight};
use crate::persist::Persistence;
use crate::remote::{RemoteError, RemoteService};
use crate::session::{BootstrapSignal, SessionState};
use crate::views::{self, ProjectStats, WorkspaceOverview};

// ============================================================================
// State
// ============================================================================

pub(crate) struct StoreState {
    pub(crate) session: SessionState,
    pub(crate) current_user: Option<UserId>,
    pub(crate) active_workspace: Option<WorkspaceId>,
    /// Last persisted choice; wins over "first" when the workspace list arrives.
    pub(crate) preferred_workspace: Option<WorkspaceId>,
    pub(crate) theme: Theme,
    pub(crate) cache: EntityCache,
    pub(crate) fetch: FetchOrchestrator,
    /// Bumped whenever the project collection is replaced or cleared.
    pub(crate) project_revision: u64,
}

impl StoreState {
    fn live_deps(&self, family: FetchFamily) -> Option<FetchDeps> {
        let user = self.current_user.as_ref();
        match family {
            FetchFamily::Workspaces => FetchDeps::workspaces(user),
            FetchFamily::Projects => FetchDeps::projects(user, self.active_workspace.as_ref()),
            FetchFamily::Tasks => FetchDeps::tasks(user, self.project_revision),
        }
    }

    /// Keep the current choice if still present, else the persisted one,
    /// else the first workspace, else none.
    pub(crate) fn select_active_workspace(&mut self, persistence: &Persistence) {
        let present = |id: &Option<WorkspaceId>| {
            id.as_ref().filter(|id| self.cache.workspace(id).is_some()).cloned()
        };
        let next = present(&self.active_workspace)
            .or_else(|| present(&self.preferred_workspace))
            .or_else(|| self.cache.workspaces().next().map(|w| w.id.clone()));
        if next != self.active_workspace {
            info!("Active workspace {:?} -> {:?}", self.active_workspace, next);
            self.activate(next, persistence);
        }
    }

    pub(crate) fn activate(&mut self, id: Option<WorkspaceId>, persistence: &Persistence) {
        let snapshot = id.as_ref().and_then(|id| self.cache.workspace(id)).cloned();
        persistence.save_active_workspace(snapshot.as_ref());
        if id.is_some() {
            self.preferred_workspace = id.clone();
        }
        self.active_workspace = id;
    }

    fn clear_family(&mut self, family: FetchFamily) {
        match family {
            FetchFamily::Workspaces => {
                self.cache.clear_workspaces();
                self.active_workspace = None;
            }
            FetchFamily::Projects => {
                self.cache.clear_projects();
                self.project_revision += 1;
            }
            FetchFamily::Tasks => self.cache.clear_tasks(),
        }
    }
}

enum Fetched {
    Workspaces(Vec<Workspace>),
    Projects(Vec<Project>),
    Tasks(Vec<Task>),
}

// ============================================================================
// Store
// ============================================================================

/// Client-side mirror of the team's workspaces, projects, and tasks.
pub struct Store {
    pub(crate) remote: Arc<dyn RemoteService>,
    pub(crate) persistence: Persistence,
    pub(crate) config: ClientConfig,
    pub(crate) state: Mutex<StoreState>,
    pub(crate) create_guard: SingleFlight,
    bootstrap: BootstrapSignal,
}

impl Store {
    /// Build a store. Reads persisted state once; makes no remote calls.
    pub fn new(
        remote: Arc<dyn RemoteService>,
        persistence: Persistence,
        config: ClientConfig,
    ) -> Self {
        let local = persistence.load();
        debug!("Loaded local state: {:?}", local);
        let state = StoreState {
            session: SessionState::Unauthenticated,
            current_user: None,
            active_workspace: None,
            preferred_workspace: local.active_workspace_id,
            theme: local.theme,
            cache: EntityCache::new(),
            fetch: FetchOrchestrator::new(),
            project_revision: 0,
        };
        Self {
            remote,
            persistence,
            create_guard: SingleFlight::new("create_project", config.create_grace()),
            config,
            state: Mutex::new(state),
            bootstrap: BootstrapSignal::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a remote call under the configured request timeout.
    pub(crate) async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        let limit = self.config.request_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("{} failed: {}", op, e);
                Err(e)
            }
            Err(_) => {
                warn!("{} timed out after {:?}", op, limit);
                Err(RemoteError::Timeout(limit))
            }
        }
    }

    pub(crate) fn require_user(&self) -> StoreResult<UserId> {
        self.state
            .lock()
            .current_user
            .clone()
            .ok_or(StoreError::NotAuthenticated)
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Resolve the persisted session, if any, then load dependents.
    ///
    /// No persisted id: zero remote calls. Identity failure: the persisted id
    /// is cleared and the error returned. Either way the bootstrap signal is
    /// raised before this returns.
    pub async fn bootstrap(&self) -> StoreResult<SessionState> {
        let persisted = {
            let mut state = self.state.lock();
            if self.bootstrap.is_raised() || state.session == SessionState::Bootstrapping {
                return Ok(state.session);
            }
            let persisted = self.persistence.session_user_id();
            if persisted.is_some() {
                state.session = SessionState::Bootstrapping;
            }
            persisted
        };
        let Some(user) = persisted else {
            info!("No persisted session");
            self.bootstrap.raise();
            return Ok(SessionState::Unauthenticated);
        };

        info!("Resolving persisted session {}", user);
        match self.call("resolve_identity", self.remote.resolve_identity(&user)).await {
            Ok(resolved) => {
                self.sign_in(resolved);
                self.bootstrap.raise();
            }
            Err(e) => {
                warn!("Session {} could not be resolved, signing out", user);
                self.persistence.save_session_user(None);
                self.state.lock().session = SessionState::Unauthenticated;
                self.bootstrap.raise();
                return Err(e.into());
            }
        }
        self.sync().await?;
        Ok(SessionState::Authenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> StoreResult<User> {
        require("email", email)?;
        require("password", password)?;
        let user = self.call("login", self.remote.login(email.trim(), password)).await?;
        info!("Signed in as {}", user.id);
        self.sign_in(user.clone());
        self.bootstrap.raise();
        self.sync().await?;
        Ok(user)
    }

    /// Create an account (the service also creates its first workspace) and
    /// sign in.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> StoreResult<User> {
        require("name", name)?;
        require("email", email)?;
        require("password", password)?;
        let user = self
            .call("signup", self.remote.signup(name.trim(), email.trim(), password))
            .await?;
        info!("Signed up as {}", user.id);
        self.sign_in(user.clone());
        self.bootstrap.raise();
        self.sync().await?;
        Ok(user)
    }

    /// Forget the user and everything loaded for them. Theme is kept.
    pub fn logout(&self) {
        let mut state = self.state.lock();
        if let Some(user) = state.current_user.take() {
            info!("Signed out {}", user);
        }
        state.session = SessionState::Unauthenticated;
        state.active_workspace = None;
        state.preferred_workspace = None;
        state.cache.clear();
        state.fetch.reset();
        self.persistence.save_session_user(None);
        self.persistence.save_active_workspace(None);
    }

    fn sign_in(&self, user: User) {
        let mut state = self.state.lock();
        if state.current_user.as_ref().is_some_and(|current| *current != user.id) {
            debug!("Switching user, dropping cached data");
            state.cache.clear();
            state.fetch.reset();
            state.active_workspace = None;
        }
        self.persistence.save_session_user(Some(&user.id));
        state.current_user = Some(user.id.clone());
        state.session = SessionState::Authenticated;
        state.cache.upsert_user(user);
    }

    pub fn session_state(&self) -> SessionState {
        self.state.lock().session
    }

    /// Receiver that flips to `true` once bootstrap has finished.
    pub fn bootstrap_signal(&self) -> watch::Receiver<bool> {
        self.bootstrap.subscribe()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrap.is_raised()
    }

    pub fn current_user(&self) -> Option<User> {
        let state = self.state.lock();
        let id = state.current_user.as_ref()?;
        state.cache.user(id).cloned()
    }

    // ── Active workspace ─────────────────────────────────────────────────

    pub fn active_workspace(&self) -> Option<Workspace> {
        let state = self.state.lock();
        state.active_workspace.as_ref().and_then(|id| state.cache.workspace(id)).cloned()
    }

    /// Switch workspace and load its projects. Unknown ids are rejected
    /// without touching state.
    pub async fn set_active_workspace(&self, id: &WorkspaceId) -> StoreResult<()> {
        {
            let mut state = self.state.lock();
            if state.current_user.is_none() {
                return Err(StoreError::NotAuthenticated);
            }
            if state.cache.workspace(id).is_none() {
                return Err(StoreError::not_found("workspace", id));
            }
            if state.active_workspace.as_ref() != Some(id) {
                info!("Switching to workspace {}", id);
                state.activate(Some(id.clone()), &self.persistence);
            }
        }
        self.sync().await
    }

    /// Activate the cached workspace whose id or name matches `code`.
    pub async fn join_workspace(&self, code: &str) -> StoreResult<bool> {
        let found = self
            .state
            .lock()
            .cache
            .workspaces()
            .find(|w| w.matches_code(code))
            .map(|w| w.id.clone());
        match found {
            Some(id) => {
                self.set_active_workspace(&id).await?;
                Ok(true)
            }
            None => {
                debug!("No workspace matches '{}'", code);
                Ok(false)
            }
        }
    }

    // ── Theme ────────────────────────────────────────────────────────────

    pub fn theme(&self) -> Theme {
        self.state.lock().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.state.lock().theme = theme;
        self.persistence.save_theme(theme);
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }

    // ── Dependent fetches ────────────────────────────────────────────────

    /// Bring every fetch family in line with the live dependencies:
    /// workspaces, then projects of the active workspace, then tasks.
    pub async fn sync(&self) -> StoreResult<()> {
        for family in [FetchFamily::Workspaces, FetchFamily::Projects, FetchFamily::Tasks] {
            self.sync_family(family, false).await?;
        }
        Ok(())
    }

    /// Re-read every family even if its deps have not changed.
    pub async fn reconcile(&self) -> StoreResult<()> {
        for family in [FetchFamily::Workspaces, FetchFamily::Projects, FetchFamily::Tasks] {
            self.sync_family(family, true).await?;
        }
        Ok(())
    }

    pub(crate) async fn sync_family(&self, family: FetchFamily, force: bool) -> StoreResult<()> {
        let plan = {
            let mut state = self.state.lock();
            let live = state.live_deps(family);
            state.fetch.observe(family, live, force)
        };
        match plan {
            FetchPlan::Unchanged => Ok(()),
            FetchPlan::Clear(family) => {
                self.state.lock().clear_family(family);
                Ok(())
            }
            FetchPlan::Issue(tag) => self.run_fetch(tag).await,
        }
    }

    async fn run_fetch(&self, tag: FetchTag) -> StoreResult<()> {
        let result = match &tag.deps {
            FetchDeps::Workspaces { user } => self
                .call("list_workspaces", self.remote.list_workspaces(user))
                .await
                .map(Fetched::Workspaces),
            FetchDeps::Projects { user, workspace } => self
                .call("list_projects", self.remote.list_projects(user, workspace))
                .await
                .map(Fetched::Projects),
            FetchDeps::Tasks { user, .. } => {
                self.call("list_tasks", self.remote.list_tasks(user)).await.map(Fetched::Tasks)
            }
        };

        let mut state = self.state.lock();
        let live = state.live_deps(tag.family());
        if let Err(reason) = state.fetch.accept(&tag, live.as_ref()) {
            debug!(
                "Discarding stale {} response (gen {}): {:?}",
                tag.family(),
                tag.generation.0,
                reason
            );
            return Ok(());
        }
        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                state.fetch.failed(&tag);
                // Rows filled under another workspace must not outlive a
                // failed switch.
                if let FetchDeps::Projects { workspace, .. } = &tag.deps {
                    if state.cache.projects().any(|p| p.workspace_id != *workspace) {
                        warn!("Projects for {} failed to load, dropping old rows", workspace);
                        state.clear_family(FetchFamily::Projects);
                    }
                }
                return Err(e.into());
            }
        };
        match fetched {
            Fetched::Workspaces(list) => {
                debug!("Loaded {} workspaces", list.len());
                state.cache.replace_workspaces(list);
                state.select_active_workspace(&self.persistence);
            }
            Fetched::Projects(list) => {
                debug!("Loaded {} projects", list.len());
                state.cache.replace_projects(list);
                state.project_revision += 1;
            }
            Fetched::Tasks(list) => {
                let total = list.len();
                let pruned = state.cache.replace_tasks(list);
                debug!("Loaded {} tasks ({} outside loaded projects)", total, pruned);
            }
        }
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Read-only copy of every table.
    pub fn snapshot(&self) -> EntityCache {
        self.state.lock().cache.clone()
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        self.state.lock().cache.workspaces().cloned().collect()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.lock().cache.projects().cloned().collect()
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.state.lock().cache.project(id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().cache.tasks().cloned().collect()
    }

    pub fn tasks_for(&self, project: &ProjectId) -> Vec<Task> {
        self.state.lock().cache.tasks_in(project).cloned().collect()
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().cache.users().cloned().collect()
    }

    pub fn create_phase(&self) -> FlightPhase {
        self.create_guard.phase()
    }

    // ── Derived views ────────────────────────────────────────────────────

    pub fn project_stats(&self, id: &ProjectId) -> Option<ProjectStats> {
        let state = self.state.lock();
        views::project_stats(&state.cache, id, Utc::now().date_naive())
    }

    /// Stats for every project of the active workspace.
    pub fn workspace_overview(&self) -> StoreResult<WorkspaceOverview> {
        let state = self.state.lock();
        let workspace = state
            .active_workspace
            .as_ref()
            .ok_or(StoreError::NoActiveWorkspace)?;
        let today = Utc::now().date_naive();
        Ok(views::workspace_overview(&state.cache, workspace, today))
    }
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}
