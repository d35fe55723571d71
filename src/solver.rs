use std::fmt;
use std::time::Duration;

use crate::kernel::{ClauseSet, Expr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Sat,
    Unsat,
    Unknown,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStatus::Sat => write!(f, "sat"),
            SolverStatus::Unsat => write!(f, "unsat"),
            SolverStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// The SMT solver that runs when the cache misses.
///
/// A solver is created for one query and dropped when the query is done, which is where it
/// releases whatever it holds.
pub trait Solver {
    type Model;

    fn assert_clause(&mut self, clause: &Expr);

    /// Running out of time is Unknown.
    fn check(&mut self, timeout: Duration) -> SolverStatus;

    /// Only called after check returned Sat.
    fn model(&mut self) -> Self::Model;

    /// Only called after check returned Unsat.
    /// The core is a subset of the asserted clauses that is unsatisfiable by itself.
    fn unsat_core(&mut self) -> ClauseSet;
}
