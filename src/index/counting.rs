use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::context::{CacheContext, QueryContext};
use crate::index::{CandidateIndex, Candidates, IndexKey};
use crate::kernel::ClauseSet;

/// Totals of how many candidates checks actually looked at.
#[derive(Debug, Default)]
pub struct CandidateCounter {
    checks: AtomicU64,
    consumed: AtomicU64,
    last: AtomicU64,
}

impl CandidateCounter {
    pub fn new() -> CandidateCounter {
        CandidateCounter::default()
    }

    fn record(&self, consumed: u64) {
        self.checks.fetch_add(1, Ordering::Relaxed);
        self.consumed.fetch_add(consumed, Ordering::Relaxed);
        self.last.store(consumed, Ordering::Relaxed);
    }

    /// How many candidate iterators have been dropped.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Wraps an index to count the candidates each check consumes.
/// A check that stops early only counts what it pulled.
pub struct CountingIndex {
    inner: Box<dyn CandidateIndex>,
    counter: Arc<CandidateCounter>,
}

impl CountingIndex {
    pub fn new(inner: Box<dyn CandidateIndex>, counter: Arc<CandidateCounter>) -> CountingIndex {
        CountingIndex { inner, counter }
    }

    pub fn counter(&self) -> &Arc<CandidateCounter> {
        &self.counter
    }
}

impl CandidateIndex for CountingIndex {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn core_key(&self, core: &ClauseSet, context: &CacheContext) -> IndexKey {
        self.inner.core_key(core, context)
    }

    fn query_key(&self, ctx: &QueryContext) -> IndexKey {
        self.inner.query_key(ctx)
    }

    fn lookup_key(&self, core_key: &IndexKey) -> IndexKey {
        self.inner.lookup_key(core_key)
    }

    fn insert(&self, key: IndexKey, core: ClauseSet) {
        self.inner.insert(key, core)
    }

    fn candidates(&self, key: &IndexKey) -> Candidates {
        Box::new(Counted {
            inner: self.inner.candidates(key),
            index: self.inner.name(),
            consumed: 0,
            counter: self.counter.clone(),
        })
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

struct Counted {
    inner: Candidates,
    index: &'static str,
    consumed: u64,
    counter: Arc<CandidateCounter>,
}

impl Iterator for Counted {
    type Item = ClauseSet;

    fn next(&mut self) -> Option<ClauseSet> {
        let next = self.inner.next();
        if next.is_some() {
            self.consumed += 1;
        }
        next
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.counter.record(self.consumed);
        debug!(index = self.index, consumed = self.consumed, "candidates consumed");
    }
}
