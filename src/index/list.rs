use crate::context::{CacheContext, QueryContext};
use crate::index::{CandidateIndex, Candidates, IndexKey, Store};
use crate::kernel::ClauseSet;

/// Every stored value is a candidate, in insertion order.
pub struct ListIndex<V: Clone = ClauseSet> {
    entries: Store<V>,
}

impl<V: Clone> ListIndex<V> {
    pub fn new() -> ListIndex<V> {
        ListIndex {
            entries: Store::new(),
        }
    }
}

impl<V: Clone> Default for ListIndex<V> {
    fn default() -> Self {
        ListIndex::new()
    }
}

impl<V: Clone + Send + Sync + 'static> CandidateIndex<V> for ListIndex<V> {
    fn name(&self) -> &'static str {
        "list"
    }

    fn core_key(&self, _core: &ClauseSet, _context: &CacheContext) -> IndexKey {
        IndexKey::Flat
    }

    fn query_key(&self, _ctx: &QueryContext) -> IndexKey {
        IndexKey::Flat
    }

    fn insert(&self, _key: IndexKey, value: V) {
        self.entries.push(value);
    }

    fn candidates(&self, _key: &IndexKey) -> Candidates<V> {
        Box::new(self.entries.snapshot().into_iter())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
