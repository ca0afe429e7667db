//! Dependent-fetch bookkeeping.
//!
//! Each fetch family watches a dependency tuple. When the live tuple differs
//! from the last one observed, [`FetchOrchestrator::observe`] hands out a
//! [`FetchTag`] for a new request (or says to clear the collection when a
//! dependency is empty). When the response comes back,
//! [`FetchOrchestrator::accept`] applies it only if the tag is still current:
//! same deps as now, and the newest generation issued for the family.
//!
//! Superseded requests are not cancelled. They finish and are discarded.
//!
//! ```text
//!  deps change ──▶ observe() ──▶ Issue(tag{family, deps, gen})
//!                                      │ request in flight
//!                                      ▼
//!  response ─────▶ accept(tag, live) ──▶ Ok       → replace collection
//!                                   └─▶ Err(Stale) → drop response
//! ```
//!
//! Holds no entities and performs no I/O, so the decision logic is testable
//! on its own.

use tracing::{debug, trace};
use zenspace_types::{UserId, WorkspaceId};

/// The three dependent collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum FetchFamily {
    Workspaces,
    Projects,
    Tasks,
}

impl FetchFamily {
    const ALL: [FetchFamily; 3] = [
        FetchFamily::Workspaces,
        FetchFamily::Projects,
        FetchFamily::Tasks,
    ];

    fn index(self) -> usize {
        match self {
            FetchFamily::Workspaces => 0,
            FetchFamily::Projects => 1,
            FetchFamily::Tasks => 2,
        }
    }
}

/// A family's dependency tuple, with every component present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDeps {
    Workspaces { user: UserId },
    Projects {
        user: UserId,
        workspace: WorkspaceId,
    },
    /// Tasks are user-scoped, but a new project set can make previously
    /// pruned tasks valid again, so its revision is part of the tuple.
    Tasks { user: UserId, project_revision: u64 },
}

impl FetchDeps {
    pub fn family(&self) -> FetchFamily {
        match self {
            FetchDeps::Workspaces { .. } => FetchFamily::Workspaces,
            FetchDeps::Projects { .. } => FetchFamily::Projects,
            FetchDeps::Tasks { .. } => FetchFamily::Tasks,
        }
    }

    pub fn workspaces(user: Option<&UserId>) -> Option<Self> {
        Some(FetchDeps::Workspaces {
            user: user?.clone(),
        })
    }

    pub fn projects(user: Option<&UserId>, workspace: Option<&WorkspaceId>) -> Option<Self> {
        Some(FetchDeps::Projects {
            user: user?.clone(),
            workspace: workspace?.clone(),
        })
    }

    pub fn tasks(user: Option<&UserId>, project_revision: u64) -> Option<Self> {
        Some(FetchDeps::Tasks {
            user: user?.clone(),
            project_revision,
        })
    }
}

/// Monotonic per-family request counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchGeneration(pub u64);

impl FetchGeneration {
    fn next(self) -> Self {
        FetchGeneration(self.0 + 1)
    }
}

/// Identity of one outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTag {
    pub deps: FetchDeps,
    pub generation: FetchGeneration,
}

impl FetchTag {
    pub fn family(&self) -> FetchFamily {
        self.deps.family()
    }
}

/// What to do after observing a family's live deps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Send a request carrying this tag.
    Issue(FetchTag),
    /// A dependency is empty: clear the collection, fetch nothing.
    Clear(FetchFamily),
    /// Deps unchanged since the last observation.
    Unchanged,
}

/// Why a response was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The live deps moved on while the request was in flight.
    DepsChanged,
    /// A newer request for the same family has been issued.
    Superseded { latest: FetchGeneration },
}

#[derive(Debug, Clone, Default)]
struct FamilyState {
    /// Deps of the last issued request. `None` = nothing issued, or reset.
    observed: Option<FetchDeps>,
    /// Whether the family is currently cleared because a dep was empty.
    cleared: bool,
    generation: FetchGeneration,
}

/// Per-family tracking of observed deps and issued generations.
#[derive(Debug, Clone, Default)]
pub struct FetchOrchestrator {
    families: [FamilyState; 3],
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `live` against what was last observed for `family`.
    ///
    /// `force` issues a request even when deps are unchanged (explicit
    /// reconcile). Clearing and issuing both bump the generation, which
    /// invalidates anything already in flight.
    pub fn observe(
        &mut self,
        family: FetchFamily,
        live: Option<FetchDeps>,
        force: bool,
    ) -> FetchPlan {
        let state = &mut self.families[family.index()];
        match live {
            None => {
                state.observed = None;
                state.generation = state.generation.next();
                if state.cleared {
                    FetchPlan::Unchanged
                } else {
                    state.cleared = true;
                    debug!("{} deps empty, clearing", family);
                    FetchPlan::Clear(family)
                }
            }
            Some(deps) => {
                if !force && state.observed.as_ref() == Some(&deps) {
                    trace!("{} deps unchanged", family);
                    return FetchPlan::Unchanged;
                }
                state.cleared = false;
                state.generation = state.generation.next();
                state.observed = Some(deps.clone());
                trace!("{} issuing generation {}", family, state.generation.0);
                FetchPlan::Issue(FetchTag {
                    deps,
                    generation: state.generation,
                })
            }
        }
    }

    /// Decide whether a response tagged `tag` may be applied, given the
    /// family's live deps at arrival.
    pub fn accept(&self, tag: &FetchTag, live: Option<&FetchDeps>) -> Result<(), StaleReason> {
        let state = &self.families[tag.family().index()];
        if state.generation != tag.generation {
            return Err(StaleReason::Superseded {
                latest: state.generation,
            });
        }
        if live != Some(&tag.deps) {
            return Err(StaleReason::DepsChanged);
        }
        Ok(())
    }

    /// A request failed. If it was the newest, forget its deps so the next
    /// observation retries.
    pub fn failed(&mut self, tag: &FetchTag) {
        let state = &mut self.families[tag.family().index()];
        if state.generation == tag.generation {
            state.observed = None;
        }
    }

    pub fn generation(&self, family: FetchFamily) -> FetchGeneration {
        self.families[family.index()].generation
    }

    /// Invalidate every family: in-flight responses will be discarded and
    /// the next observation issues fresh requests.
    pub fn reset(&mut self) {
        for family in FetchFamily::ALL {
            let state = &mut self.families[family.index()];
            state.observed = None;
            state.cleared = false;
            state.generation = state.generation.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects(ws: &str) -> Option<FetchDeps> {
        FetchDeps::projects(Some(&"u1".into()), Some(&ws.into()))
    }

    fn issued(plan: FetchPlan) -> FetchTag {
        match plan {
            FetchPlan::Issue(tag) => tag,
            other => panic!("expected Issue, got {:?}", other),
        }
    }

    #[test]
    fn test_unchanged_deps_do_not_refetch() {
        let mut fetch = FetchOrchestrator::new();
        issued(fetch.observe(FetchFamily::Projects, projects("w1"), false));
        assert_eq!(
            fetch.observe(FetchFamily::Projects, projects("w1"), false),
            FetchPlan::Unchanged
        );
        issued(fetch.observe(FetchFamily::Projects, projects("w1"), true));
    }

    #[test]
    fn test_switch_discards_older_response() {
        let mut fetch = FetchOrchestrator::new();
        let a = issued(fetch.observe(FetchFamily::Projects, projects("w1"), false));
        let b = issued(fetch.observe(FetchFamily::Projects, projects("w2"), false));

        let live = projects("w2");
        assert!(fetch.accept(&b, live.as_ref()).is_ok());
        assert!(matches!(fetch.accept(&a, live.as_ref()), Err(StaleReason::Superseded { .. })));
    }

    #[test]
    fn test_deps_moved_without_new_request() {
        let mut fetch = FetchOrchestrator::new();
        let a = issued(fetch.observe(FetchFamily::Projects, projects("w1"), false));
        assert_eq!(fetch.accept(&a, projects("w2").as_ref()), Err(StaleReason::DepsChanged));
        assert_eq!(fetch.accept(&a, None), Err(StaleReason::DepsChanged));
    }

    #[test]
    fn test_empty_dep_clears_once_and_invalidates() {
        let mut fetch = FetchOrchestrator::new();
        let a = issued(fetch.observe(FetchFamily::Projects, projects("w1"), false));
        assert_eq!(
            fetch.observe(FetchFamily::Projects, None, false),
            FetchPlan::Clear(FetchFamily::Projects)
        );
        assert_eq!(fetch.observe(FetchFamily::Projects, None, false), FetchPlan::Unchanged);
        assert!(fetch.accept(&a, projects("w1").as_ref()).is_err());
        issued(fetch.observe(FetchFamily::Projects, projects("w1"), false));
    }

    #[test]
    fn test_failure_rearms_family() {
        let mut fetch = FetchOrchestrator::new();
        let deps = FetchDeps::tasks(Some(&"u1".into()), 0);
        let a = issued(fetch.observe(FetchFamily::Tasks, deps, false));
        fetch.failed(&a);
        issued(fetch.observe(FetchFamily::Tasks, FetchDeps::tasks(Some(&"u1".into()), 0), false));
    }

    #[test]
    fn test_reset_invalidates_everything() {
        let mut fetch = FetchOrchestrator::new();
        let deps = FetchDeps::workspaces(Some(&"u1".into()));
        let a = issued(fetch.observe(FetchFamily::Workspaces, deps, false));
        fetch.reset();
        assert!(fetch.accept(&a, Some(&a.deps)).is_err());
        assert_eq!(fetch.generation(FetchFamily::Workspaces), FetchGeneration(2));
    }
}
