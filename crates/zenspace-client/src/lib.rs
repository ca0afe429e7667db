//! ZenSpace client synchronization store.
//!
//! Mirrors server-owned workspaces, projects, and tasks locally, keeps
//! dependent collections in step with the signed-in user and the active
//! workspace, and pushes mutations through the remote service.
//!
//! ```text
//!  Persistence ──▶ bootstrap ──▶ current user
//!                                   │
//!        ┌──────────────────────────┼───────────────────────┐
//!        ▼                          ▼                       ▼
//!   workspaces(user)    projects(user, active ws)   tasks(user, project rev)
//!        │                          │                       │
//!        └────────── FetchOrchestrator (tagged, stale-drop) ┘
//!                                   │
//!                                   ▼
//!                             EntityCache ◀── mutations (SingleFlight on create)
//!                                   │
//!                                   ▼
//!                             views (stats)
//! ```
//!
//! The store is an explicit value: build one with [`Store::new`] over any
//! [`RemoteService`], or [`open_http`] for the REST API with on-disk state.

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod guard;
mod mutations;
pub mod persist;
pub mod remote;
pub mod session;
pub mod store;
pub mod views;

use std::sync::Arc;

pub use cache::{CascadeReport, EntityCache};
pub use config::{ClientConfig, ConfigError};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use fetch::{
    FetchDeps, FetchFamily, FetchGeneration, FetchOrchestrator, FetchPlan, FetchTag, StaleReason,
};
pub use guard::{FlightPhase, SingleFlight};
pub use persist::{FileStore, KeyValueStore, LocalState, MemoryStore, PersistError, Persistence};
pub use remote::{
    HttpRemote, IdempotencyKey, InMemoryRemote, RemoteCall, RemoteError, RemoteService,
};
pub use session::{BootstrapSignal, SessionState, wait_for_bootstrap};
pub use store::Store;
pub use views::{ProjectStats, StatusCounts, WorkspaceOverview};

/// Store over the HTTP API, with local state in the configured file.
pub fn open_http(config: ClientConfig) -> Result<Store, RemoteError> {
    let remote = HttpRemote::new(&config)?;
    let persistence = Persistence::file(config.state_file());
    Ok(Store::new(Arc::new(remote), persistence, config))
}
