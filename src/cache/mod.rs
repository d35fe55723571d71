use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::CacheContext;
use crate::index::CandidateIndex;
use crate::interrupt::{Interrupt, Interrupted};
use crate::kernel::ClauseSet;
use crate::matcher::Matcher;

pub mod decorators;

pub use decorators::{Filter, OnCheckEnd, Preprocessor, UnsatCacheExt};

/// An UnsatCache remembers unsatisfiable cores.
///
/// A query is a hit when some stored core is a renaming of a subset of it.
/// Since the core is unsatisfiable, so is the query.
/// A miss says nothing about the query.
pub trait UnsatCache: Send + Sync {
    fn add(&self, core: ClauseSet);

    /// Only fails when the interrupt fires. Whoever asked should treat that as a miss.
    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted>;
}

impl<C: UnsatCache + ?Sized> UnsatCache for Box<C> {
    fn add(&self, core: ClauseSet) {
        (**self).add(core)
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        (**self).check(query, interrupt)
    }
}

impl<C: UnsatCache + ?Sized> UnsatCache for Arc<C> {
    fn add(&self, core: ClauseSet) {
        (**self).add(core)
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        (**self).check(query, interrupt)
    }
}

/// The cache used when caching is turned off.
/// It never hits, and forgets everything it's given.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyUnsatCache;

impl UnsatCache for EmptyUnsatCache {
    fn add(&self, _core: ClauseSet) {}

    fn check(&self, _query: &ClauseSet, _interrupt: &Interrupt) -> Result<bool, Interrupted> {
        Ok(false)
    }
}

/// A cache made of an index that proposes candidate cores and a matcher that confirms them.
pub struct IndexedUnsatCache {
    context: CacheContext,
    index: Box<dyn CandidateIndex>,
    matcher: Box<dyn Matcher>,
}

impl IndexedUnsatCache {
    pub fn new(
        index: Box<dyn CandidateIndex>,
        matcher: Box<dyn Matcher>,
        max_hash_height: Option<usize>,
    ) -> IndexedUnsatCache {
        IndexedUnsatCache {
            context: CacheContext::new(max_hash_height),
            index,
            matcher,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_name(&self) -> &'static str {
        self.index.name()
    }

    pub fn matcher_name(&self) -> &'static str {
        self.matcher.name()
    }
}

impl UnsatCache for IndexedUnsatCache {
    fn add(&self, core: ClauseSet) {
        let key = self.index.core_key(&core, &self.context);
        trace!(index = self.index.name(), size = core.len(), "adding core");
        self.index.insert(key, core);
    }

    fn check(&self, query: &ClauseSet, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        interrupt.check()?;
        let ctx = self.context.query(query, interrupt);
        let key = self.index.query_key(&ctx);
        let mut tested = 0;
        for candidate in self.index.candidates(&key) {
            interrupt.check()?;
            tested += 1;
            if self.matcher.matches(&candidate, &ctx)? {
                debug!(
                    matcher = self.matcher.name(),
                    tested,
                    core_size = candidate.len(),
                    "cache hit"
                );
                return Ok(true);
            }
        }
        trace!(matcher = self.matcher.name(), tested, "cache miss");
        Ok(false)
    }
}
