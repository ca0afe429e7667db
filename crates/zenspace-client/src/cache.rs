//! Local mirror of server-owned records.
//!
//! One ordered table per entity kind, keyed by id. Insertion order is what
//! the UI displays, so creates go to the front and updates keep position.
//! Mutators are crate-private: outside the store an [`EntityCache`] is only
//! ever a read-only snapshot.
//!
//! Referential integrity (no task, file, or comment whose project is not
//! cached) is restored by [`EntityCache::prune_orphans`], which every project
//! replace and task apply runs.

use indexmap::IndexMap;
use tracing::debug;
use zenspace_types::{
    Comment, CommentId, FileAsset, FileId, Project, ProjectId, Task, TaskId, User, UserId,
    Workspace, WorkspaceId,
};

/// Counts of what a delete removed, parent included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub workspaces: usize,
    pub projects: usize,
    pub tasks: usize,
    pub files: usize,
    pub comments: usize,
}

impl CascadeReport {
    fn absorb(&mut self, other: CascadeReport) {
        self.workspaces += other.workspaces;
        self.projects += other.projects;
        self.tasks += other.tasks;
        self.files += other.files;
        self.comments += other.comments;
    }

    /// Rows removed below the named parent.
    pub fn dependents(&self) -> usize {
        self.projects + self.tasks + self.files + self.comments
    }
}

/// In-memory tables for every entity kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCache {
    users: IndexMap<UserId, User>,
    workspaces: IndexMap<WorkspaceId, Workspace>,
    projects: IndexMap<ProjectId, Project>,
    tasks: IndexMap<TaskId, Task>,
    files: IndexMap<FileId, FileAsset>,
    comments: IndexMap<CommentId, Comment>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileAsset> {
        self.files.values()
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn workspace(&self, id: &WorkspaceId) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks of one project, in display order.
    pub fn tasks_in<'a>(&'a self, project: &'a ProjectId) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.values().filter(move |t| t.project_id == *project)
    }

    pub fn projects_in<'a>(
        &'a self,
        workspace: &'a WorkspaceId,
    ) -> impl Iterator<Item = &'a Project> + 'a {
        self.projects.values().filter(move |p| p.workspace_id == *workspace)
    }

    pub fn comments_on<'a>(&'a self, task: &'a TaskId) -> impl Iterator<Item = &'a Comment> + 'a {
        self.comments.values().filter(move |c| c.task_id.as_ref() == Some(task))
    }

    pub fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// True when every task, file, and comment points at a cached project.
    pub fn is_consistent(&self) -> bool {
        self.tasks.values().all(|t| self.projects.contains_key(&t.project_id))
            && self.files.values().all(|f| self.projects.contains_key(&f.project_id))
            && self.comments.values().all(|c| self.projects.contains_key(&c.project_id))
    }

    // ── Writes (store only) ──────────────────────────────────────────────

    pub(crate) fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub(crate) fn replace_workspaces(&mut self, workspaces: Vec<Workspace>) {
        self.workspaces = workspaces.into_iter().map(|w| (w.id.clone(), w)).collect();
    }

    /// Full replace; returns how many dependents were pruned as orphans.
    pub(crate) fn replace_projects(&mut self, projects: Vec<Project>) -> usize {
        self.projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        self.prune_orphans()
    }

    /// Full replace; tasks whose project is not cached are dropped.
    pub(crate) fn replace_tasks(&mut self, tasks: Vec<Task>) -> usize {
        self.tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        self.prune_orphans()
    }

    pub(crate) fn prepend_workspace(&mut self, workspace: Workspace) {
        self.workspaces.shift_insert(0, workspace.id.clone(), workspace);
    }

    pub(crate) fn prepend_project(&mut self, project: Project) {
        self.projects.shift_insert(0, project.id.clone(), project);
    }

    /// Returns false (and inserts nothing) if the task's project is not cached.
    pub(crate) fn prepend_task(&mut self, task: Task) -> bool {
        if !self.projects.contains_key(&task.project_id) {
            return false;
        }
        self.tasks.shift_insert(0, task.id.clone(), task);
        true
    }

    pub(crate) fn prepend_file(&mut self, file: FileAsset) -> bool {
        if !self.projects.contains_key(&file.project_id) {
            return false;
        }
        self.files.shift_insert(0, file.id.clone(), file);
        true
    }

    pub(crate) fn prepend_comment(&mut self, comment: Comment) -> bool {
        if !self.projects.contains_key(&comment.project_id) {
            return false;
        }
        self.comments.shift_insert(0, comment.id.clone(), comment);
        true
    }

    /// Replace in place. A record no longer cached stays absent.
    pub(crate) fn replace_workspace(&mut self, workspace: Workspace) -> bool {
        match self.workspaces.get_mut(&workspace.id) {
            Some(slot) => {
                *slot = workspace;
                true
            }
            None => false,
        }
    }

    pub(crate) fn replace_project(&mut self, project: Project) -> bool {
        match self.projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project;
                true
            }
            None => false,
        }
    }

    pub(crate) fn replace_task(&mut self, task: Task) -> bool {
        if !self.projects.contains_key(&task.project_id) {
            return false;
        }
        match self.tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_file(&mut self, id: &FileId) -> bool {
        self.files.shift_remove(id).is_some()
    }

    pub(crate) fn remove_comment(&mut self, id: &CommentId) -> bool {
        self.comments.shift_remove(id).is_some()
    }

    /// Remove a task and the comments on it. Files on the task stay with
    /// the project, detached from the task.
    pub(crate) fn remove_task(&mut self, id: &TaskId) -> CascadeReport {
        let mut report = CascadeReport::default();
        if self.tasks.shift_remove(id).is_none() {
            return report;
        }
        report.tasks = 1;
        let before = self.comments.len();
        self.comments.retain(|_, c| c.task_id.as_ref() != Some(id));
        report.comments = before - self.comments.len();
        for file in self.files.values_mut() {
            if file.task_id.as_ref() == Some(id) {
                file.task_id = None;
            }
        }
        report
    }

    /// Remove a project with every task, file, and comment under it.
    pub(crate) fn remove_project(&mut self, id: &ProjectId) -> CascadeReport {
        let mut report = CascadeReport::default();
        if self.projects.shift_remove(id).is_some() {
            report.projects = 1;
        }
        let tasks = self.tasks.len();
        self.tasks.retain(|_, t| t.project_id != *id);
        report.tasks = tasks - self.tasks.len();
        let files = self.files.len();
        self.files.retain(|_, f| f.project_id != *id);
        report.files = files - self.files.len();
        let comments = self.comments.len();
        self.comments.retain(|_, c| c.project_id != *id);
        report.comments = comments - self.comments.len();
        report
    }

    /// Remove a workspace and everything under its projects.
    pub(crate) fn remove_workspace(&mut self, id: &WorkspaceId) -> CascadeReport {
        let mut report = CascadeReport::default();
        if self.workspaces.shift_remove(id).is_some() {
            report.workspaces = 1;
        }
        let doomed: Vec<ProjectId> = self.projects_in(id).map(|p| p.id.clone()).collect();
        for project in &doomed {
            report.absorb(self.remove_project(project));
        }
        report
    }

    /// Drop tasks, files, and comments whose project is not cached.
    pub(crate) fn prune_orphans(&mut self) -> usize {
        let projects = &self.projects;
        let before = self.tasks.len() + self.files.len() + self.comments.len();
        self.tasks.retain(|_, t| projects.contains_key(&t.project_id));
        self.files.retain(|_, f| projects.contains_key(&f.project_id));
        self.comments.retain(|_, c| projects.contains_key(&c.project_id));
        let pruned = before - (self.tasks.len() + self.files.len() + self.comments.len());
        if pruned > 0 {
            debug!("Pruned {} orphaned rows", pruned);
        }
        pruned
    }

    pub(crate) fn clear_workspaces(&mut self) {
        self.workspaces.clear();
    }

    pub(crate) fn clear_projects(&mut self) -> usize {
        self.projects.clear();
        self.prune_orphans()
    }

    pub(crate) fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use zenspace_types::{NewProject, NewTask};

    fn project(id: &str, ws: &str) -> Project {
        NewProject::new(id, "u1".into(), ws.into()).into_project(id.into())
    }

    fn task(id: &str, project: &str) -> Task {
        NewTask::new(project.into(), id, "u1".into()).into_task(id.into(), Utc::now())
    }

    fn comment(id: &str, project: &str, task: Option<&str>) -> Comment {
        Comment {
            id: id.into(),
            project_id: project.into(),
            task_id: task.map(TaskId::from),
            user_id: "u1".into(),
            content: "looks good".into(),
            created_at: Utc::now(),
        }
    }

    fn seeded() -> EntityCache {
        let mut cache = EntityCache::new();
        cache.replace_workspaces(vec![
            Workspace {
                id: "w1".into(),
                name: "One".into(),
                owner_id: "u1".into(),
            },
            Workspace {
                id: "w2".into(),
                name: "Two".into(),
                owner_id: "u1".into(),
            },
        ]);
        cache.replace_projects(vec![project("p1", "w1"), project("p2", "w1")]);
        cache.replace_tasks(vec![task("t1", "p1"), task("t2", "p1"), task("t3", "p2")]);
        cache
    }

    #[test]
    fn test_prepend_puts_new_rows_first() {
        let mut cache = seeded();
        cache.prepend_project(project("p3", "w1"));
        let ids: Vec<_> = cache.projects().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p3", "p1", "p2"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut cache = seeded();
        let mut renamed = project("p2", "w1");
        renamed.name = "Renamed".into();
        assert!(cache.replace_project(renamed));
        let names: Vec<_> = cache.projects().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["p1", "Renamed"]);
        assert!(!cache.replace_project(project("gone", "w1")));
        assert_eq!(cache.project_count(), 2);
    }

    #[test]
    fn test_project_cascade() {
        let mut cache = seeded();
        assert!(cache.prepend_comment(comment("c1", "p1", Some("t1"))));
        let report = cache.remove_project(&"p1".into());
        assert_eq!(report.projects, 1);
        assert_eq!(report.tasks, 2);
        assert_eq!(report.comments, 1);
        assert!(cache.task(&"t1".into()).is_none());
        assert!(cache.task(&"t2".into()).is_none());
        assert!(cache.task(&"t3".into()).is_some());
        assert!(cache.is_consistent());
    }

    #[test]
    fn test_workspace_cascade() {
        let mut cache = seeded();
        let report = cache.remove_workspace(&"w1".into());
        assert_eq!(report.workspaces, 1);
        assert_eq!(report.projects, 2);
        assert_eq!(report.tasks, 3);
        assert_eq!(cache.workspace_count(), 1);
        assert_eq!(cache.task_count(), 0);
    }

    #[test]
    fn test_task_removal_takes_its_comments() {
        let mut cache = seeded();
        cache.prepend_comment(comment("c1", "p1", Some("t1")));
        cache.prepend_comment(comment("c2", "p1", None));
        let report = cache.remove_task(&"t1".into());
        assert_eq!(report.tasks, 1);
        assert_eq!(report.comments, 1);
        assert_eq!(cache.comments().count(), 1);
    }

    #[test]
    fn test_orphans_pruned_on_replace() {
        let mut cache = seeded();
        let pruned = cache.replace_projects(vec![project("p2", "w1")]);
        assert_eq!(pruned, 2);
        assert!(cache.is_consistent());

        let pruned = cache.replace_tasks(vec![task("t9", "p404"), task("t3", "p2")]);
        assert_eq!(pruned, 1);
        assert_eq!(cache.task_count(), 1);
    }

    #[test]
    fn test_orphan_inserts_refused() {
        let mut cache = seeded();
        assert!(!cache.prepend_task(task("t9", "p404")));
        assert!(!cache.prepend_comment(comment("c9", "p404", None)));
        assert!(cache.is_consistent());
    }
}
