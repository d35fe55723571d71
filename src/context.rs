use std::cell::OnceCell;

use crate::interrupt::Interrupt;
use crate::kernel::{ClauseSet, Expr, StructuralHasher};

/// The CacheContext holds state shared by every operation on one cache.
/// Cores are hashed when they are added, so the core hasher's memo lives as long as the cache.
pub struct CacheContext {
    core_hasher: StructuralHasher,
}

impl CacheContext {
    pub fn new(max_height: Option<usize>) -> CacheContext {
        CacheContext {
            core_hasher: StructuralHasher::new(max_height),
        }
    }

    pub fn core_hasher(&self) -> &StructuralHasher {
        &self.core_hasher
    }

    /// Starts the working state for a single check.
    pub fn query<'a>(&'a self, query: &'a ClauseSet, interrupt: &'a Interrupt) -> QueryContext<'a> {
        QueryContext {
            cache: self,
            query,
            interrupt,
            query_hasher: StructuralHasher::new(self.core_hasher.max_height()),
            hashes: OnceCell::new(),
            buckets: OnceCell::new(),
        }
    }
}

/// The query's clause indices, sorted by structural hash.
pub struct HashBuckets {
    entries: Vec<(u64, usize)>,
}

impl HashBuckets {
    fn new(hashes: &[u64]) -> HashBuckets {
        let mut entries: Vec<(u64, usize)> = hashes
            .iter()
            .enumerate()
            .map(|(i, hash)| (*hash, i))
            .collect();
        entries.sort_unstable();
        HashBuckets { entries }
    }

    /// The indices of the query clauses with this hash.
    pub fn get(&self, hash: u64) -> impl Iterator<Item = usize> + '_ {
        let start = self.entries.partition_point(|(h, _)| *h < hash);
        self.entries[start..]
            .iter()
            .take_while(move |(h, _)| *h == hash)
            .map(|(_, i)| *i)
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.get(hash).next().is_some()
    }
}

/// The QueryContext is the private working state of one check.
/// It is built lazily, and shared by all the candidates tested against the query.
/// It must not outlive the check or be shared between queries.
pub struct QueryContext<'a> {
    cache: &'a CacheContext,
    query: &'a ClauseSet,
    interrupt: &'a Interrupt,
    query_hasher: StructuralHasher,
    hashes: OnceCell<Vec<u64>>,
    buckets: OnceCell<HashBuckets>,
}

impl<'a> QueryContext<'a> {
    pub fn query(&self) -> &'a ClauseSet {
        self.query
    }

    pub fn clause(&self, index: usize) -> &'a Expr {
        &self.query[index]
    }

    pub fn interrupt(&self) -> &'a Interrupt {
        self.interrupt
    }

    pub fn core_hasher(&self) -> &'a StructuralHasher {
        &self.cache.core_hasher
    }

    /// Hashes query expressions with the same height bound as the core hasher.
    pub fn query_hasher(&self) -> &StructuralHasher {
        &self.query_hasher
    }

    /// The structural hash of each query clause, in order.
    pub fn hashes(&self) -> &[u64] {
        self.hashes
            .get_or_init(|| self.query_hasher.hash_all(self.query))
    }

    pub fn buckets(&self) -> &HashBuckets {
        self.buckets.get_or_init(|| HashBuckets::new(self.hashes()))
    }
}
