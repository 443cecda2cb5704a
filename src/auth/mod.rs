//! Login and session management.
//!
//! A caller proves control of an address by signing a one-time challenge
//! ([`challenge`]). A successful proof mints an opaque bearer token
//! ([`session`]) that carries the caller's identity and role.

pub mod challenge;
pub mod session;

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

pub use challenge::{ChallengeAuthenticator, IssuedChallenge, DEFAULT_CHALLENGE_TTL};
pub use session::{Principal, SessionStore};

/// Wall-clock source for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
