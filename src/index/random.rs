use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::context::{CacheContext, QueryContext};
use crate::index::{CandidateIndex, Candidates, IndexKey, Store};
use crate::kernel::fingerprint::combine;
use crate::kernel::ClauseSet;

/// Offers at most a fixed number of stored values, picked uniformly without replacement.
///
/// The sampler is seeded from the configured seed and a digest of the query, so checking the
/// same query against the same store twice sees the same sample.
pub struct RandomIndex<V: Clone = ClauseSet> {
    sample_size: usize,
    seed: u64,
    entries: Store<V>,
}

impl<V: Clone> RandomIndex<V> {
    pub fn new(sample_size: usize, seed: u64) -> RandomIndex<V> {
        RandomIndex {
            sample_size,
            seed,
            entries: Store::new(),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

impl<V: Clone + Send + Sync + 'static> CandidateIndex<V> for RandomIndex<V> {
    fn name(&self) -> &'static str {
        "random"
    }

    fn core_key(&self, _core: &ClauseSet, _context: &CacheContext) -> IndexKey {
        IndexKey::Flat
    }

    fn query_key(&self, ctx: &QueryContext) -> IndexKey {
        // Sorted, so reordering the query doesn't change the sample.
        let mut hashes = ctx.hashes().to_vec();
        hashes.sort_unstable();
        IndexKey::Digest(combine(&hashes))
    }

    fn insert(&self, _key: IndexKey, value: V) {
        self.entries.push(value);
    }

    fn candidates(&self, key: &IndexKey) -> Candidates<V> {
        let digest = match key {
            IndexKey::Digest(digest) => *digest,
            _ => 0,
        };
        let entries = self.entries.snapshot();
        let limit = self.sample_size.min(entries.len());
        Box::new(Sample {
            entries,
            displaced: HashMap::new(),
            next: 0,
            limit,
            rng: StdRng::seed_from_u64(self.seed ^ digest),
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A partial Fisher-Yates shuffle that only does the swaps it needs.
/// Instead of moving entries, it remembers which index now sits at each swapped position.
struct Sample<V: Clone> {
    entries: im::Vector<V>,
    displaced: HashMap<usize, usize>,
    next: usize,
    limit: usize,
    rng: StdRng,
}

impl<V: Clone> Sample<V> {
    fn at(&self, position: usize) -> usize {
        self.displaced.get(&position).copied().unwrap_or(position)
    }
}

impl<V: Clone> Iterator for Sample<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        if self.next >= self.limit {
            return None;
        }
        let chosen = self.rng.gen_range(self.next..self.entries.len());
        let picked = self.at(chosen);
        let current = self.at(self.next);
        self.displaced.insert(chosen, current);
        self.next += 1;
        self.entries.get(picked).cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.limit - self.next;
        (remaining, Some(remaining))
    }
}
