//! Derived views: pure functions over an [`EntityCache`].
//!
//! Nothing here is stored. Every call recomputes from the task table, so a
//! view can never disagree with the cache it was computed from. The
//! server-reported `Project::progress` is ignored.

use chrono::NaiveDate;
use serde::Serialize;
use zenspace_types::{ProjectId, Task, TaskStatus, WorkspaceId};

use crate::cache::EntityCache;

/// Task counts per board column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }

    /// `round(100 * done / total)`, 0 for an empty set.
    pub fn completion_percent(&self) -> u8 {
        percent(self.done, self.total())
    }

    fn add(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Todo => self.todo += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
        }
    }
}

/// Everything the project card shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_id: ProjectId,
    pub name: String,
    pub counts: StatusCounts,
    pub completion: u8,
    pub overdue: usize,
}

/// Per-project stats for a workspace plus the rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceOverview {
    pub workspace_id: WorkspaceId,
    pub projects: Vec<ProjectStats>,
    pub counts: StatusCounts,
    pub completion: u8,
    pub overdue: usize,
}

/// Half-up rounding in integers: 2/3 → 67, 1/2 → 50.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)).min(100) as u8
}

fn scoped<'a>(
    cache: &'a EntityCache,
    project: Option<&'a ProjectId>,
) -> impl Iterator<Item = &'a Task> + 'a {
    cache.tasks().filter(move |t| project.is_none_or(|p| t.project_id == *p))
}

pub fn completion_percent(cache: &EntityCache, project: &ProjectId) -> u8 {
    status_counts(cache, Some(project)).completion_percent()
}

/// Counts for one project, or across every cached task.
pub fn status_counts(cache: &EntityCache, project: Option<&ProjectId>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in scoped(cache, project) {
        counts.add(task.status);
    }
    counts
}

/// Tasks due before `today` and not done.
pub fn overdue_count(cache: &EntityCache, project: Option<&ProjectId>, today: NaiveDate) -> usize {
    scoped(cache, project).filter(|t| t.is_overdue(today)).count()
}

pub fn project_stats(
    cache: &EntityCache,
    project: &ProjectId,
    today: NaiveDate,
) -> Option<ProjectStats> {
    let record = cache.project(project)?;
    let counts = status_counts(cache, Some(project));
    Some(ProjectStats {
        project_id: record.id.clone(),
        name: record.name.clone(),
        counts,
        completion: counts.completion_percent(),
        overdue: overdue_count(cache, Some(project), today),
    })
}

pub fn workspace_overview(
    cache: &EntityCache,
    workspace: &WorkspaceId,
    today: NaiveDate,
) -> WorkspaceOverview {
    let projects: Vec<ProjectStats> = cache
        .projects_in(workspace)
        .filter_map(|p| project_stats(cache, &p.id, today))
        .collect();
    let mut counts = StatusCounts::default();
    let mut overdue = 0;
    for stats in &projects {
        counts.todo += stats.counts.todo;
        counts.in_progress += stats.counts.in_progress;
        counts.done += stats.counts.done;
        overdue += stats.overdue;
    }
    WorkspaceOverview {
        workspace_id: workspace.clone(),
        projects,
        counts,
        completion: counts.completion_percent(),
        overdue,
    }
}
