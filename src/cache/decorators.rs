use crate::cache::UnsatCache;
use crate::interrupt::{Interrupt, Interrupted};
use crate::kernel::ClauseSet;

type ClausePredicate = Box<dyn Fn(&ClauseSet) -> bool + Send + Sync>;

/// Only lets through the cores and queries its predicates accept.
/// A rejected core is dropped, and a rejected query is a miss.
pub struct Filter<C> {
    inner: C,
    core_filter: ClausePredicate,
    query_filter: ClausePredicate,
}

impl<C: UnsatCache> Filter<C> {
    pub fn new(
        inner: C,
        core_filter: impl Fn(&ClauseSet) -> bool + Send + Sync + 'static,
        query_filter: impl Fn(&ClauseSet) -> bool + Send + Sync + 'static,
    ) -> Filter<C> {
        Filter {
            inner,
            core_filter: Box::new(core_filter),
            query_filter: Box::new(query_filter),
        }
    }

    /// Drops cores with more than max_size clauses.
    pub fn max_core_size(inner: C, max_size: usize) -> Filter<C> {
        Filter::new(inner, move |core| core.len() <= max_size, |_| true)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: UnsatCache> UnsatCache for Filter<C> {
    fn add(&self, core: ClauseSet) {
        if (self.core_filter)(&core) {
            self.inner.add(core);
        }
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        if !(self.query_filter)(query) {
            return Ok(false);
        }
        self.inner.check(query, interrupt)
    }
}

/// Rewrites every core and query before the inner cache sees it.
pub struct Preprocessor<C> {
    inner: C,
    transform: Box<dyn Fn(&ClauseSet) -> ClauseSet + Send + Sync>,
}

impl<C: UnsatCache> Preprocessor<C> {
    pub fn new(
        inner: C,
        transform: impl Fn(&ClauseSet) -> ClauseSet + Send + Sync + 'static,
    ) -> Preprocessor<C> {
        Preprocessor {
            inner,
            transform: Box::new(transform),
        }
    }
}

impl<C: UnsatCache> UnsatCache for Preprocessor<C> {
    fn add(&self, core: ClauseSet) {
        self.inner.add((self.transform)(&core));
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        self.inner.check(&(self.transform)(query), interrupt)
    }
}

/// Calls back after every check that finished, with the query and whether it hit.
/// Interrupted checks don't finish, so they aren't reported.
pub struct OnCheckEnd<C> {
    inner: C,
    callback: Box<dyn Fn(&ClauseSet, bool) + Send + Sync>,
}

impl<C: UnsatCache> OnCheckEnd<C> {
    pub fn new(
        inner: C,
        callback: impl Fn(&ClauseSet, bool) + Send + Sync + 'static,
    ) -> OnCheckEnd<C> {
        OnCheckEnd {
            inner,
            callback: Box::new(callback),
        }
    }
}

impl<C: UnsatCache> UnsatCache for OnCheckEnd<C> {
    fn add(&self, core: ClauseSet) {
        self.inner.add(core);
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        let hit = self.inner.check(query, interrupt)?;
        (self.callback)(query, hit);
        Ok(hit)
    }
}

/// Builder-style wrapping for any cache.
pub trait UnsatCacheExt: UnsatCache + Sized {
    fn with_max_core_size(self, max_size: usize) -> Filter<Self> {
        Filter::max_core_size(self, max_size)
    }

    fn with_filter(
        self,
        core_filter: impl Fn(&ClauseSet) -> bool + Send + Sync + 'static,
        query_filter: impl Fn(&ClauseSet) -> bool + Send + Sync + 'static,
    ) -> Filter<Self> {
        Filter::new(self, core_filter, query_filter)
    }

    fn with_preprocessor(
        self,
        transform: impl Fn(&ClauseSet) -> ClauseSet + Send + Sync + 'static,
    ) -> Preprocessor<Self> {
        Preprocessor::new(self, transform)
    }

    fn on_check_end(
        self,
        callback: impl Fn(&ClauseSet, bool) + Send + Sync + 'static,
    ) -> OnCheckEnd<Self> {
        OnCheckEnd::new(self, callback)
    }
}

impl<C: UnsatCache> UnsatCacheExt for C {}
