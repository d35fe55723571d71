use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// How many polls go by between clock reads when a deadline is set.
const CLOCK_INTERVAL: u32 = 64;

/// The error for work that was stopped before it finished.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// An Interrupt tells long-running search loops when to stop.
/// It stops when its token is cancelled or when its deadline passes.
///
/// Loops call `check` once per iteration. The token is an atomic load, so that is cheap.
/// The clock is only read every CLOCK_INTERVAL polls.
/// An Interrupt belongs to a single query, so it is not Sync.
pub struct Interrupt {
    token: CancellationToken,
    deadline: Option<Instant>,
    polls: Cell<u32>,
    expired: Cell<bool>,
}

impl Interrupt {
    pub fn new(token: CancellationToken) -> Interrupt {
        Interrupt {
            token,
            deadline: None,
            polls: Cell::new(0),
            expired: Cell::new(false),
        }
    }

    /// Never fires.
    pub fn none() -> Interrupt {
        Interrupt::new(CancellationToken::new())
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Interrupt {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Interrupt {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_interrupted(&self) -> bool {
        if self.expired.get() || self.token.is_cancelled() {
            return true;
        }
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => return false,
        };
        let polls = self.polls.get();
        self.polls.set(polls.wrapping_add(1));
        if polls % CLOCK_INTERVAL != 0 {
            return false;
        }
        if Instant::now() >= deadline {
            self.expired.set(true);
            return true;
        }
        false
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}
