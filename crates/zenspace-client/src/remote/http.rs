//! HTTP client for the ZenSpace REST API.
//!
//! Route map:
//!
//! ```text
//! POST   /auth/login            {email, password}         → {user}
//! POST   /auth/signup           {name, email, password}   → {user}
//! GET    /auth/me/{id}                                    → {user}
//! GET    /user                                            → User[]
//! PUT    /user/{id}             UserPatch                 → {user}
//! GET    /workspaces?userId=                              → Workspace[]
//! POST   /workspaces            {name, ownerId}           → Workspace
//! PUT    /workspaces/{id}       {name}                    → Workspace
//! DELETE /workspaces/{id}                                 → ack
//! GET    /projects?userId=&workspaceId=                   → Project[]
//! POST   /projects              NewProject + Idempotency-Key → Project
//! PUT    /projects/{id}         ProjectPatch              → Project
//! DELETE /projects/{id}                                   → ack
//! GET    /tasks?userId=                                   → Task[]
//! POST   /tasks                 NewTask                   → Task
//! PUT    /tasks/{id}            TaskPatch                 → Task
//! DELETE /tasks/{id}                                      → ack
//! ```

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zenspace_types::{
    NewProject, NewTask, Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, User, UserId,
    UserPatch, Workspace, WorkspaceId, normalize_members,
};

use super::{IdempotencyKey, RemoteError, RemoteService};
use crate::config::ClientConfig;

/// JSON-over-HTTP implementation of [`RemoteService`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base: Url,
    client: Client,
}

/// `{ "user": {...} }` envelope used by the auth and user routes.
#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

/// `{ "error": "..." }` body on failures.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Projects come back with their membership join rows rather than a flat id list.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectWire {
    #[serde(flatten)]
    project: Project,
    #[serde(default)]
    users: Vec<ProjectUserWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectUserWire {
    user_id: UserId,
}

impl From<ProjectWire> for Project {
    fn from(wire: ProjectWire) -> Self {
        let mut project = wire.project;
        let mut members = project.member_ids.clone();
        members.extend(wire.users.into_iter().map(|u| u.user_id));
        project.member_ids = normalize_members(&project.lead_id, &members);
        project
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<&'a UserId>,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| {
                RemoteError::Transport(format!("bad base url '{}': {e}", config.base_url))
            })?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!("bad base url '{}'", config.base_url)));
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base, client })
    }

    /// Base URL joined with percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        trace!("{} {}", method, url);
        self.client.request(method, url)
    }

    /// Send and turn a non-2xx answer into the matching [`RemoteError`].
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await.map_err(map_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
        debug!("Remote returned {}: {}", status, message);
        Err(map_status(status, message))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RemoteError> {
        self.execute(builder).await?.json::<T>().await.map_err(map_reqwest)
    }

    /// Deletes answer with anything from an empty body to a message object.
    async fn send_ack(&self, builder: RequestBuilder) -> Result<(), RemoteError> {
        self.execute(builder).await.map(|_| ())
    }
}

fn map_status(status: StatusCode, message: String) -> RemoteError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            RemoteError::Validation(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        _ => RemoteError::Server(format!("{status}: {message}")),
    }
}

fn map_reqwest(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Transport(format!("timed out: {e}"))
    } else if e.is_decode() {
        RemoteError::Server(format!("unreadable response: {e}"))
    } else {
        RemoteError::Transport(e.to_string())
    }
}

/// The auth routes answer bad credentials with 400; those are auth failures.
fn credentials_error(e: RemoteError) -> RemoteError {
    match e {
        RemoteError::Validation(msg) | RemoteError::NotFound(msg) => RemoteError::Auth(msg),
        other => other,
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn login(&self, email: &str, password: &str) -> Result<User, RemoteError> {
        let req = self
            .request(Method::POST, &["auth", "login"])
            .json(&LoginRequest { email, password });
        let env: UserEnvelope = self.send(req).await.map_err(credentials_error)?;
        Ok(env.user)
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, RemoteError> {
        let req = self
            .request(Method::POST, &["auth", "signup"])
            .json(&SignupRequest {
                name,
                email,
                password,
            });
        let env: UserEnvelope = self.send(req).await?;
        Ok(env.user)
    }

    async fn resolve_identity(&self, user: &UserId) -> Result<User, RemoteError> {
        let req = self.request(Method::GET, &["auth", "me", user.as_str()]);
        let env: UserEnvelope = self.send(req).await?;
        Ok(env.user)
    }

    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        self.send(self.request(Method::GET, &["user"])).await
    }

    async fn update_user(&self, user: &UserId, patch: &UserPatch) -> Result<User, RemoteError> {
        let req = self.request(Method::PUT, &["user", user.as_str()]).json(patch);
        let env: UserEnvelope = self.send(req).await?;
        Ok(env.user)
    }

    async fn list_workspaces(&self, user: &UserId) -> Result<Vec<Workspace>, RemoteError> {
        let req = self
            .request(Method::GET, &["workspaces"])
            .query(&[("userId", user.as_str())]);
        self.send(req).await
    }

    async fn create_workspace(
        &self,
        name: &str,
        owner: &UserId,
    ) -> Result<Workspace, RemoteError> {
        let req = self
            .request(Method::POST, &["workspaces"])
            .json(&WorkspaceRequest {
                name,
                owner_id: Some(owner),
            });
        self.send(req).await
    }

    async fn rename_workspace(
        &self,
        id: &WorkspaceId,
        name: &str,
    ) -> Result<Workspace, RemoteError> {
        let req = self
            .request(Method::PUT, &["workspaces", id.as_str()])
            .json(&WorkspaceRequest {
                name,
                owner_id: None,
            });
        self.send(req).await
    }

    async fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), RemoteError> {
        self.send_ack(self.request(Method::DELETE, &["workspaces", id.as_str()])).await
    }

    async fn list_projects(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Vec<Project>, RemoteError> {
        let req = self
            .request(Method::GET, &["projects"])
            .query(&[("userId", user.as_str()), ("workspaceId", workspace.as_str())]);
        let wire: Vec<ProjectWire> = self.send(req).await?;
        Ok(wire.into_iter().map(Project::from).collect())
    }

    async fn create_project(
        &self,
        project: &NewProject,
        key: &IdempotencyKey,
    ) -> Result<Project, RemoteError> {
        let req = self
            .request(Method::POST, &["projects"])
            .header("Idempotency-Key", key.as_str())
            .json(project);
        let wire: ProjectWire = self.send(req).await?;
        Ok(wire.into())
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Project, RemoteError> {
        let req = self.request(Method::PUT, &["projects", id.as_str()]).json(patch);
        let wire: ProjectWire = self.send(req).await?;
        Ok(wire.into())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), RemoteError> {
        self.send_ack(self.request(Method::DELETE, &["projects", id.as_str()])).await
    }

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, RemoteError> {
        let req = self
            .request(Method::GET, &["tasks"])
            .query(&[("userId", user.as_str())]);
        self.send(req).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError> {
        self.send(self.request(Method::POST, &["tasks"]).json(task)).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        let req = self.request(Method::PUT, &["tasks", id.as_str()]).json(patch);
        self.send(req).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError> {
        self.send_ack(self.request(Method::DELETE, &["tasks", id.as_str()])).await
    }
}
