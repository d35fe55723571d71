use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::context::{CacheContext, QueryContext};
use crate::index::{CandidateIndex, Candidates, IndexKey};
use crate::kernel::ClauseSet;

pub type InnerIndex = Arc<dyn CandidateIndex>;

/// Makes a fresh, empty inner index.
pub type IndexFactory = Box<dyn Fn() -> Box<dyn CandidateIndex> + Send + Sync>;

/// Two levels of indexing. The outer index files inner indexes, and the inner indexes file cores.
///
/// A core goes into every inner index the outer index offers for it. When there are none, a new
/// inner index is filed under the core's outer key. A lookup chains the candidates of every inner
/// index the outer index offers for the query.
pub struct CompositeIndex {
    outer: Box<dyn CandidateIndex<InnerIndex>>,
    make_inner: IndexFactory,

    // Never stores anything. It computes the inner keys.
    keys: Box<dyn CandidateIndex>,

    len: AtomicUsize,
}

impl CompositeIndex {
    pub fn new(outer: Box<dyn CandidateIndex<InnerIndex>>, make_inner: IndexFactory) -> Self {
        let keys = make_inner();
        CompositeIndex {
            outer,
            make_inner,
            keys,
            len: AtomicUsize::new(0),
        }
    }

    /// How many inner indexes there are.
    pub fn inner_count(&self) -> usize {
        self.outer.len()
    }
}

// Keys of another shape come from somewhere else. Flat makes every level offer everything.
fn split(key: &IndexKey) -> (IndexKey, IndexKey) {
    match key {
        IndexKey::Composite(outer, inner) => ((**outer).clone(), (**inner).clone()),
        _ => (IndexKey::Flat, IndexKey::Flat),
    }
}

impl CandidateIndex for CompositeIndex {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn core_key(&self, core: &ClauseSet, context: &CacheContext) -> IndexKey {
        IndexKey::Composite(
            Box::new(self.outer.core_key(core, context)),
            Box::new(self.keys.core_key(core, context)),
        )
    }

    fn query_key(&self, ctx: &QueryContext) -> IndexKey {
        IndexKey::Composite(
            Box::new(self.outer.query_key(ctx)),
            Box::new(self.keys.query_key(ctx)),
        )
    }

    fn lookup_key(&self, core_key: &IndexKey) -> IndexKey {
        let (outer, inner) = split(core_key);
        IndexKey::Composite(
            Box::new(self.outer.lookup_key(&outer)),
            Box::new(self.keys.lookup_key(&inner)),
        )
    }

    fn insert(&self, key: IndexKey, core: ClauseSet) {
        let (outer_key, inner_key) = split(&key);
        let mut inserted = false;
        for inner in self.outer.candidates(&self.outer.lookup_key(&outer_key)) {
            inner.insert(inner_key.clone(), core.clone());
            inserted = true;
        }
        if !inserted {
            let inner = (self.make_inner)();
            inner.insert(inner_key, core);
            self.outer.insert(outer_key, Arc::from(inner));
        }
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    fn candidates(&self, key: &IndexKey) -> Candidates {
        let (outer_key, inner_key) = split(key);
        Box::new(
            self.outer
                .candidates(&outer_key)
                .flat_map(move |inner| inner.candidates(&inner_key)),
        )
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}
