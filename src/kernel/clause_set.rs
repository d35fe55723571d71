use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::kernel::expr::Expr;

/// A conjunction of boolean expressions, either an unsat core or a query.
///
/// The clauses are shared, so the cache can keep a core alive without copying it.
/// Two clause sets are equal when they hold equal clauses in the same order.
#[derive(Clone, PartialEq, Eq)]
pub struct ClauseSet {
    clauses: Arc<[Expr]>,
}

impl ClauseSet {
    pub fn new(clauses: Vec<Expr>) -> ClauseSet {
        debug_assert!(
            clauses.iter().all(|c| c.sort().is_bool()),
            "clauses must be boolean"
        );
        ClauseSet {
            clauses: clauses.into(),
        }
    }

    pub fn empty() -> ClauseSet {
        ClauseSet::new(vec![])
    }

    pub fn clauses(&self) -> &[Expr] {
        &self.clauses
    }

    pub fn ptr_eq(&self, other: &ClauseSet) -> bool {
        Arc::ptr_eq(&self.clauses, &other.clauses)
    }
}

impl Deref for ClauseSet {
    type Target = [Expr];

    fn deref(&self) -> &[Expr] {
        &self.clauses
    }
}

impl FromIterator<Expr> for ClauseSet {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> ClauseSet {
        ClauseSet::new(iter.into_iter().collect())
    }
}

impl From<Vec<Expr>> for ClauseSet {
    fn from(clauses: Vec<Expr>) -> ClauseSet {
        ClauseSet::new(clauses)
    }
}

impl fmt::Display for ClauseSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", clause)?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for ClauseSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
