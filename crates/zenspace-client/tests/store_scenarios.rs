//! Store-level scenarios against the in-memory remote.
//!
//! Each test builds a fresh [`InMemoryRemote`] with a small fixture, wraps it
//! in a [`Store`], and checks both the resulting cache and the exact calls
//! that reached the remote.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use zenspace_client::constants::{KEY_ACTIVE_WORKSPACE, KEY_SESSION_USER, KEY_THEME};
use zenspace_client::{
    ClientConfig, ErrorKind, FlightPhase, InMemoryRemote, KeyValueStore, MemoryStore, Persistence,
    RemoteCall, RemoteError, SessionState, Store, wait_for_bootstrap,
};
use zenspace_types::{
    Comment, NewProject, NewTask, ProjectId, TaskId, TaskPatch, TaskStatus, Theme, User, UserId,
    UserRole, Workspace, WorkspaceId,
};

// ============================================================================
// Fixture
// ============================================================================

fn user(id: &str, name: &str) -> User {
    let email = format!("{}@example.com", name.to_lowercase());
    User {
        id: id.into(),
        avatar: User::default_avatar(&email),
        name: name.into(),
        email,
        role: UserRole::Member,
    }
}

fn workspace(id: &str, name: &str) -> Workspace {
    Workspace {
        id: id.into(),
        name: name.into(),
        owner_id: "u1".into(),
    }
}

fn project(id: &str, ws: &str) -> zenspace_types::Project {
    NewProject::new(format!("Project {id}"), "u1".into(), ws.into()).into_project(id.into())
}

fn task(id: &str, project: &str, status: TaskStatus) -> zenspace_types::Task {
    NewTask::new(project.into(), format!("Task {id}"), "u1".into())
        .with_status(status)
        .into_task(id.into(), Utc::now())
}

/// u1 "Ann" owns w1 (p1, p2) and w2 (p3). p1 holds t1 (Todo) and t2 (Done).
fn team_remote() -> Arc<InMemoryRemote> {
    let remote = InMemoryRemote::new();
    remote.insert_user(user("u1", "Ann"), "pw");
    remote.insert_user(user("u2", "Bob"), "pw");
    remote.insert_workspace(workspace("w1", "Design"));
    remote.insert_workspace(workspace("w2", "Marketing"));
    remote.insert_project(project("p1", "w1"));
    remote.insert_project(project("p2", "w1"));
    remote.insert_project(project("p3", "w2"));
    remote.insert_task(task("t1", "p1", TaskStatus::Todo));
    remote.insert_task(task("t2", "p1", TaskStatus::Done));
    remote.insert_task(task("t3", "p3", TaskStatus::InProgress));
    Arc::new(remote)
}

struct Harness {
    remote: Arc<InMemoryRemote>,
    kv: MemoryStore,
    store: Store,
}

fn harness(
    remote: Arc<InMemoryRemote>,
    entries: &[(&str, &str)],
    config: ClientConfig,
) -> Harness {
    let kv = MemoryStore::with_entries(entries.iter().copied());
    let store = Store::new(remote.clone(), Persistence::new(Arc::new(kv.clone())), config);
    Harness { remote, kv, store }
}

/// Bootstrapped as u1, call log cleared.
async fn signed_in() -> Harness {
    let h = harness(team_remote(), &[(KEY_SESSION_USER, "u1")], ClientConfig::default());
    h.store.bootstrap().await.unwrap();
    h.remote.clear_calls();
    h
}

fn ws(id: &str) -> WorkspaceId {
    WorkspaceId::from(id)
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn bootstrap_without_session_makes_no_calls() {
    let h = harness(team_remote(), &[], ClientConfig::default());
    let mut signal = h.store.bootstrap_signal();

    let state = h.store.bootstrap().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert!(h.remote.calls().is_empty());
    assert!(h.store.current_user().is_none());
    assert!(h.store.is_bootstrapped());
    wait_for_bootstrap(&mut signal).await;
}

#[tokio::test]
async fn bootstrap_failure_clears_persisted_session() {
    let h = harness(team_remote(), &[(KEY_SESSION_USER, "ghost")], ClientConfig::default());

    let err = h.store.bootstrap().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.store.session_state(), SessionState::Unauthenticated);
    assert_eq!(h.kv.get(KEY_SESSION_USER), None);
    assert!(h.store.is_bootstrapped());
    assert_eq!(h.remote.calls(), vec![RemoteCall::ResolveIdentity("ghost".into())]);
}

#[tokio::test]
async fn bootstrap_runs_once() {
    let h = signed_in().await;
    assert_eq!(h.store.bootstrap().await.unwrap(), SessionState::Authenticated);
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn persisted_workspace_wins_over_first() {
    let h = harness(
        team_remote(),
        &[(KEY_SESSION_USER, "u1"), (KEY_ACTIVE_WORKSPACE, r#"{"id":"w2","name":"Marketing"}"#)],
        ClientConfig::default(),
    );
    h.store.bootstrap().await.unwrap();
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w2")));
    assert_eq!(h.store.projects().len(), 1);
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn session_to_drag_end_to_end() {
    let remote = InMemoryRemote::new();
    remote.insert_user(user("u1", "Ann"), "pw");
    remote.insert_workspace(workspace("w1", "Design"));
    remote.insert_project(project("p1", "w1"));
    remote.insert_task(task("t1", "p1", TaskStatus::Todo));
    let h = harness(Arc::new(remote), &[(KEY_SESSION_USER, "u1")], ClientConfig::default());

    assert_eq!(h.store.bootstrap().await.unwrap(), SessionState::Authenticated);
    assert_eq!(h.store.current_user().map(|u| u.name), Some("Ann".to_string()));
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w1")));
    assert_eq!(
        h.remote.calls(),
        vec![
            RemoteCall::ResolveIdentity("u1".into()),
            RemoteCall::ListWorkspaces("u1".into()),
            RemoteCall::ListProjects {
                user: "u1".into(),
                workspace: "w1".into(),
            },
            RemoteCall::ListTasks("u1".into()),
        ]
    );
    let stored = h.kv.get(KEY_ACTIVE_WORKSPACE).unwrap();
    assert!(stored.contains(r#""id":"w1""#));

    h.remote.clear_calls();
    let t1 = TaskId::from("t1");
    let moved = h.store.move_task(&t1, TaskStatus::Done).await.unwrap().unwrap();

    assert_eq!(moved.status, TaskStatus::Done);
    let patch = TaskPatch::status(TaskStatus::Done);
    assert_eq!(h.remote.calls(), vec![RemoteCall::UpdateTask(t1.clone(), patch.clone())]);
    assert_eq!(serde_json::to_value(&patch).unwrap(), serde_json::json!({"status": "Done"}));
    assert_eq!(h.store.snapshot().task(&t1).map(|t| t.status), Some(TaskStatus::Done));
}

// ============================================================================
// Single flight
// ============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_creates_send_one_request() {
    let h = signed_in().await;
    h.remote.delay("create_project", Duration::from_millis(50));
    let input = NewProject::new("Launch", "u1".into(), ws("w1"));

    let results =
        futures::future::join_all((0..3).map(|_| h.store.create_project(input.clone()))).await;

    let created: Vec<_> = results.into_iter().filter_map(|r| r.unwrap()).collect();
    assert_eq!(created.len(), 1);
    assert_eq!(h.remote.count("create_project"), 1);
    assert_eq!(h.store.projects()[0].id, created[0].id);
    assert_eq!(h.store.create_phase(), FlightPhase::Cooling);

    // Inside the grace window a repeat is still dropped.
    assert!(h.store.create_project(input.clone()).await.unwrap().is_none());

    tokio::time::sleep(h.store.config().create_grace()).await;
    assert!(h.store.create_project(input).await.unwrap().is_some());
    assert_eq!(h.remote.count("create_project"), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_create_still_releases_guard() {
    let h = signed_in().await;
    h.remote.fail_next("create_project", RemoteError::Server("db down".into()));
    let input = NewProject::new("Launch", "u1".into(), ws("w1"));
    let before = h.store.snapshot();

    let err = h.store.create_project(input.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(h.store.snapshot(), before);

    tokio::time::sleep(h.store.config().create_grace()).await;
    assert!(h.store.create_project(input).await.unwrap().is_some());
}

// ============================================================================
// Stale fetches
// ============================================================================

async fn switch_race(first_delay: u64, second_delay: u64) {
    let h = signed_in().await;
    h.remote.delay_for("list_projects", "w2", Duration::from_millis(first_delay));
    h.remote.delay_for("list_projects", "w1", Duration::from_millis(second_delay));

    let (w1, w2) = (ws("w1"), ws("w2"));

    let (to_w2, back_to_w1) = tokio::join!(h.store.set_active_workspace(&w2), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.store.set_active_workspace(&w1).await
    });
    to_w2.unwrap();
    back_to_w1.unwrap();

    assert_eq!(h.remote.count("list_projects"), 2);
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w1")));
    let projects = h.store.projects();
    assert_eq!(projects.len(), 2);
    assert!(projects.iter().all(|p| p.workspace_id == ws("w1")));
    assert!(h.store.snapshot().is_consistent());
}

#[tokio::test(start_paused = true)]
async fn stale_response_after_newer_one_is_dropped() {
    switch_race(100, 10).await;
}

#[tokio::test(start_paused = true)]
async fn stale_response_before_newer_one_is_dropped() {
    switch_race(20, 100).await;
}

#[tokio::test]
async fn switching_workspace_rereads_tasks() {
    let h = signed_in().await;
    h.store.set_active_workspace(&ws("w2")).await.unwrap();
    let tasks: Vec<_> = h.store.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(tasks, vec![TaskId::from("t3")]);
    assert_eq!(h.remote.count("list_tasks"), 1);
}

#[tokio::test]
async fn failed_switch_does_not_mix_workspaces() {
    let h = signed_in().await;
    h.remote.fail_next("list_projects", RemoteError::Server("blip".into()));

    let err = h.store.set_active_workspace(&ws("w2")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w2")));
    assert!(h.store.projects().is_empty());
    assert!(h.store.tasks().is_empty());
    assert!(h.store.snapshot().is_consistent());

    let created = h
        .store
        .create_project(NewProject::new("Launch", "u1".into(), ws("w2")))
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<_> = h.store.projects().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![created.id.clone()]);

    h.store.sync().await.unwrap();
    let projects = h.store.projects();
    assert_eq!(projects.len(), 2);
    assert!(projects.iter().all(|p| p.workspace_id == ws("w2")));
    let tasks: Vec<_> = h.store.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(tasks, vec![TaskId::from("t3")]);
}

#[tokio::test]
async fn unknown_workspace_is_rejected() {
    let h = signed_in().await;
    let err = h.store.set_active_workspace(&ws("w9")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w1")));
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn join_by_name_is_case_insensitive() {
    let h = signed_in().await;
    assert!(h.store.join_workspace("marketing").await.unwrap());
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w2")));
    assert!(!h.store.join_workspace("nope").await.unwrap());
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn drag_onto_same_column_sends_nothing() {
    let h = signed_in().await;
    assert!(h.store.move_task(&"t1".into(), TaskStatus::Todo).await.unwrap().is_none());
    assert_eq!(h.remote.count("update_task"), 0);
}

#[tokio::test]
async fn failed_update_leaves_cache_untouched() {
    let h = signed_in().await;
    h.remote.fail_next("update_task", RemoteError::Server("boom".into()));
    let before = h.store.snapshot();

    let err = h.store.move_task(&"t1".into(), TaskStatus::Done).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn delete_project_cascades_locally() {
    let h = signed_in().await;
    h.store
        .add_comment(Comment {
            id: "c1".into(),
            project_id: "p1".into(),
            task_id: Some("t1".into()),
            user_id: "u1".into(),
            content: "ship it".into(),
            created_at: Utc::now(),
        })
        .unwrap();

    let report = h.store.delete_project(&"p1".into()).await.unwrap();

    assert_eq!((report.projects, report.tasks, report.comments), (1, 2, 1));
    let snap = h.store.snapshot();
    assert!(snap.project(&"p1".into()).is_none());
    assert!(snap.task(&"t1".into()).is_none());
    assert!(snap.task(&"t2".into()).is_none());
    assert_eq!(snap.comments().count(), 0);
    assert!(snap.is_consistent());
}

#[tokio::test]
async fn reconcile_after_cascade_rereads_tasks() {
    let h = harness(
        team_remote(),
        &[(KEY_SESSION_USER, "u1")],
        ClientConfig::default().with_reconcile_after_cascade(true),
    );
    h.store.bootstrap().await.unwrap();
    h.remote.set_server_cascade(false);
    h.remote.clear_calls();

    h.store.delete_project(&"p1".into()).await.unwrap();

    assert_eq!(h.remote.count("list_tasks"), 1);
    assert!(h.store.snapshot().is_consistent());
    assert!(h.store.tasks_for(&"p1".into()).is_empty());
}

#[tokio::test]
async fn deleting_active_workspace_selects_next() {
    let h = signed_in().await;

    let report = h.store.delete_workspace(&ws("w1")).await.unwrap();

    assert_eq!(report.projects, 2);
    assert_eq!(h.store.active_workspace().map(|w| w.id), Some(ws("w2")));
    let projects: Vec<ProjectId> = h.store.projects().into_iter().map(|p| p.id).collect();
    assert_eq!(projects, vec![ProjectId::from("p3")]);
    assert!(h.kv.get(KEY_ACTIVE_WORKSPACE).unwrap().contains("w2"));

    h.store.delete_workspace(&ws("w2")).await.unwrap();
    assert!(h.store.active_workspace().is_none());
    assert!(h.store.projects().is_empty());
    assert_eq!(h.kv.get(KEY_ACTIVE_WORKSPACE), None);
}

#[tokio::test]
async fn create_task_needs_loaded_project() {
    let h = signed_in().await;
    let err = h
        .store
        .create_task(NewTask::new("p3".into(), "Write brief", "u1".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.remote.calls().is_empty());

    let created = h
        .store
        .create_task(NewTask::new("p1".into(), "Write brief", "u2".into()))
        .await
        .unwrap();
    assert_eq!(h.store.tasks()[0].id, created.id);
}

#[tokio::test]
async fn project_lead_cannot_be_removed() {
    let h = signed_in().await;
    let p1 = ProjectId::from("p1");
    let err = h.store.remove_project_member(&p1, &"u1".into()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let added = h.store.add_project_member(&p1, &"u2".into()).await.unwrap();
    assert_eq!(added.member_ids, vec![UserId::from("u1"), UserId::from("u2")]);
    h.store.add_project_member(&p1, &"u2".into()).await.unwrap();
    assert_eq!(h.remote.count("update_project"), 1);

    let removed = h.store.remove_project_member(&p1, &"u2".into()).await.unwrap();
    assert_eq!(removed.member_ids, vec![UserId::from("u1")]);
}

#[tokio::test]
async fn integrity_holds_across_a_session() {
    let h = signed_in().await;
    let check = |step: &str| {
        assert!(h.store.snapshot().is_consistent(), "inconsistent after {step}")
    };

    let extra = h
        .store
        .create_project(NewProject::new("Extra", "u1".into(), ws("w1")))
        .await
        .unwrap()
        .unwrap();
    check("create project");
    h.store.create_task(NewTask::new(extra.id.clone(), "First", "u1".into())).await.unwrap();
    check("create task");
    h.store.set_active_workspace(&ws("w2")).await.unwrap();
    check("switch to w2");
    h.store.set_active_workspace(&ws("w1")).await.unwrap();
    check("switch back");
    assert_eq!(h.store.tasks_for(&extra.id).len(), 1);
    h.store.delete_project(&extra.id).await.unwrap();
    check("delete project");
    h.store.delete_task(&"t2".into()).await.unwrap();
    check("delete task");
    h.store.reconcile().await.unwrap();
    check("reconcile");
}

// ============================================================================
// Auth, errors, timeouts
// ============================================================================

#[tokio::test]
async fn login_validates_before_calling() {
    let h = harness(team_remote(), &[], ClientConfig::default());
    let err = h.store.login("ann@example.com", "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.remote.calls().is_empty());

    let err = h.store.login("ann@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(h.store.session_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn signup_then_logout() {
    let h = harness(team_remote(), &[], ClientConfig::default());

    let user = h.store.signup("Cara", "cara@example.com", "pw").await.unwrap();

    assert_eq!(h.kv.get(KEY_SESSION_USER).as_deref(), Some(user.id.as_str()));
    assert_eq!(h.store.active_workspace().map(|w| w.name), Some("Cara's Workspace".to_string()));

    h.store.logout();
    assert_eq!(h.store.session_state(), SessionState::Unauthenticated);
    assert!(h.store.workspaces().is_empty());
    assert!(h.store.current_user().is_none());
    assert_eq!(h.kv.get(KEY_SESSION_USER), None);
    assert_eq!(h.kv.get(KEY_ACTIVE_WORKSPACE), None);
}

#[tokio::test(start_paused = true)]
async fn slow_calls_time_out() {
    let h = harness(
        team_remote(),
        &[(KEY_SESSION_USER, "u1")],
        ClientConfig::default().with_request_timeout(Duration::from_secs(1)),
    );
    h.store.bootstrap().await.unwrap();
    h.remote.delay("list_tasks", Duration::from_secs(5));

    let err = h.store.reconcile().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(err.to_string().contains("timed out"));
    assert!(h.store.snapshot().is_consistent());
}

#[tokio::test]
async fn invite_adds_known_user() {
    let h = signed_in().await;
    let bob = h.store.invite_member("BOB@example.com").await.unwrap();
    assert_eq!(bob.id, UserId::from("u2"));
    assert!(h.store.users().iter().any(|u| u.id == bob.id));

    let err = h.store.invite_member("nobody@example.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn completion_comes_from_tasks_not_server_progress() {
    let h = signed_in().await;
    let stats = h.store.project_stats(&"p1".into()).unwrap();
    assert_eq!(stats.completion, 50);
    assert_eq!(h.store.project_stats(&"p2".into()).unwrap().completion, 0);

    let overview = h.store.workspace_overview().unwrap();
    assert_eq!(overview.projects.len(), 2);
    assert_eq!(overview.counts.total(), 2);
}

#[tokio::test]
async fn overview_needs_an_active_workspace() {
    let h = harness(team_remote(), &[], ClientConfig::default());
    let err = h.store.workspace_overview().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "no active workspace");
}

// ============================================================================
// Theme
// ============================================================================

#[tokio::test]
async fn theme_changes_are_written_through() {
    let h = harness(team_remote(), &[], ClientConfig::default());
    assert_eq!(h.store.theme(), Theme::Light);

    h.store.set_theme(Theme::Dark);
    assert_eq!(h.kv.get(KEY_THEME).as_deref(), Some("dark"));

    assert_eq!(h.store.toggle_theme(), Theme::Light);
    assert_eq!(h.kv.get(KEY_THEME).as_deref(), Some("light"));
    assert_eq!(h.store.toggle_theme(), Theme::Dark);
    assert!(h.remote.calls().is_empty());

    let reopened = Store::new(
        h.remote.clone(),
        Persistence::new(Arc::new(h.kv.clone())),
        ClientConfig::default(),
    );
    assert_eq!(reopened.theme(), Theme::Dark);
}
