//! Single-flight guard for create operations.
//!
//! ```text
//!            try_begin()                 permit dropped
//!   Idle ─────────────────▶ InFlight ───────────────────▶ Cooling
//!    ▲                       (key)                          │
//!    └──────────────── grace elapsed ◀──────────────────────┘
//! ```
//!
//! While `InFlight` or `Cooling`, [`SingleFlight::try_begin`] returns `None`
//! and the caller drops the duplicate. Each flight carries an
//! [`IdempotencyKey`] that is sent to the service, so a duplicate that slips
//! past the grace window still collapses server-side.
//!
//! The permit settles on drop, so a cancelled or failed call releases the
//! guard the same way a successful one does.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::remote::IdempotencyKey;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FlightState {
    Idle,
    InFlight { key: IdempotencyKey },
    Cooling { until: Instant },
    /// Grace too long to represent as a deadline; stays closed.
    Latched,
}

/// Observable phase, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    InFlight,
    Cooling,
}

#[derive(Debug)]
pub struct SingleFlight {
    name: &'static str,
    grace: Duration,
    state: Mutex<FlightState>,
}

impl SingleFlight {
    pub fn new(name: &'static str, grace: Duration) -> Self {
        Self {
            name,
            grace,
            state: Mutex::new(FlightState::Idle),
        }
    }

    /// Claim the guard. `None` means another flight holds it.
    pub fn try_begin(&self) -> Option<FlightPermit<'_>> {
        let mut state = self.state.lock();
        match &*state {
            FlightState::InFlight { key } => {
                debug!("{}: dropping duplicate while {} is in flight", self.name, key);
                return None;
            }
            FlightState::Cooling { until } if Instant::now() < *until => {
                debug!("{}: dropping duplicate inside grace window", self.name);
                return None;
            }
            FlightState::Latched => {
                debug!("{}: dropping duplicate, guard latched", self.name);
                return None;
            }
            _ => {}
        }
        let key = IdempotencyKey::generate();
        *state = FlightState::InFlight { key: key.clone() };
        Some(FlightPermit { guard: self, key })
    }

    pub fn phase(&self) -> FlightPhase {
        match &*self.state.lock() {
            FlightState::Idle => FlightPhase::Idle,
            FlightState::InFlight { .. } => FlightPhase::InFlight,
            FlightState::Cooling { until } if Instant::now() < *until => FlightPhase::Cooling,
            FlightState::Cooling { .. } => FlightPhase::Idle,
            FlightState::Latched => FlightPhase::Cooling,
        }
    }

    fn settle(&self) {
        let mut state = self.state.lock();
        *state = if self.grace.is_zero() {
            FlightState::Idle
        } else {
            match Instant::now().checked_add(self.grace) {
                Some(until) => FlightState::Cooling { until },
                None => {
                    warn!("{}: grace {:?} out of range, latching", self.name, self.grace);
                    FlightState::Latched
                }
            }
        };
    }
}

/// Proof of holding the guard. Dropping it starts the grace window.
#[derive(Debug)]
pub struct FlightPermit<'a> {
    guard: &'a SingleFlight,
    key: IdempotencyKey,
}

impl FlightPermit<'_> {
    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.settle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_dropped_until_grace_elapses() {
        let guard = SingleFlight::new("create_project", Duration::from_millis(500));
        let permit = guard.try_begin().unwrap();
        assert_eq!(guard.phase(), FlightPhase::InFlight);
        assert!(guard.try_begin().is_none());

        drop(permit);
        assert_eq!(guard.phase(), FlightPhase::Cooling);
        assert!(guard.try_begin().is_none());

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(guard.try_begin().is_none());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(guard.phase(), FlightPhase::Idle);
        assert!(guard.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_zero_grace_releases_immediately() {
        let guard = SingleFlight::new("create_project", Duration::ZERO);
        drop(guard.try_begin().unwrap());
        assert_eq!(guard.phase(), FlightPhase::Idle);
        assert!(guard.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_each_flight_gets_a_fresh_key() {
        let guard = SingleFlight::new("create_project", Duration::ZERO);
        let first = guard.try_begin().unwrap().key().clone();
        let second = guard.try_begin().unwrap().key().clone();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_unrepresentable_grace_latches_instead_of_panicking() {
        let guard = SingleFlight::new("create_project", Duration::MAX);
        drop(guard.try_begin().unwrap());
        assert_eq!(guard.phase(), FlightPhase::Cooling);
        assert!(guard.try_begin().is_none());
    }
}
