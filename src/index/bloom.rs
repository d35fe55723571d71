use bit_vec::BitVec;

use crate::context::{CacheContext, QueryContext};
use crate::index::{CandidateIndex, Candidates, IndexKey, Store};
use crate::kernel::ClauseSet;

/// Files each core under a bit set with one bit per clause hash, modulo the width.
///
/// A query is keyed by the complement of its own bit set. A core can only match if every one of
/// its clauses has a hash the query has, so a core whose bits hit the complement is skipped.
/// Collisions make false positives, never false negatives.
pub struct BloomIndex<V: Clone = ClauseSet> {
    nbits: usize,
    entries: Store<(BitVec, V)>,
}

fn bit(hash: u64, nbits: usize) -> usize {
    (hash % nbits as u64) as usize
}

fn intersects(left: &BitVec, right: &BitVec) -> bool {
    left.blocks()
        .zip(right.blocks())
        .any(|(l, r)| l & r != 0)
}

impl<V: Clone> BloomIndex<V> {
    pub fn new(nbits: usize) -> BloomIndex<V> {
        BloomIndex {
            nbits,
            entries: Store::new(),
        }
    }

    pub fn nbits(&self) -> usize {
        self.nbits
    }

    fn origin(&self, hashes: &[u64]) -> BitVec {
        let mut bits = BitVec::from_elem(self.nbits, false);
        for hash in hashes {
            bits.set(bit(*hash, self.nbits), true);
        }
        bits
    }

    fn inverted(&self, hashes: &[u64]) -> BitVec {
        let mut bits = BitVec::from_elem(self.nbits, true);
        for hash in hashes {
            bits.set(bit(*hash, self.nbits), false);
        }
        bits
    }
}

impl<V: Clone + Send + Sync + 'static> CandidateIndex<V> for BloomIndex<V> {
    fn name(&self) -> &'static str {
        "bloom"
    }

    fn core_key(&self, core: &ClauseSet, context: &CacheContext) -> IndexKey {
        IndexKey::Bloom(self.origin(&context.core_hasher().hash_all(core)))
    }

    fn query_key(&self, ctx: &QueryContext) -> IndexKey {
        IndexKey::Bloom(self.inverted(ctx.hashes()))
    }

    // A query containing the core has at least the core's bits, so its key is at most the
    // complement of them.
    fn lookup_key(&self, core_key: &IndexKey) -> IndexKey {
        match core_key {
            IndexKey::Bloom(bits) if bits.len() == self.nbits => {
                let mut inverted = bits.clone();
                inverted.negate();
                IndexKey::Bloom(inverted)
            }
            _ => IndexKey::Flat,
        }
    }

    fn insert(&self, key: IndexKey, value: V) {
        let bits = match key {
            IndexKey::Bloom(bits) if bits.len() == self.nbits => bits,
            // No bits set makes the value a candidate for every query.
            _ => BitVec::from_elem(self.nbits, false),
        };
        self.entries.push((bits, value));
    }

    fn candidates(&self, key: &IndexKey) -> Candidates<V> {
        let snapshot = self.entries.snapshot();
        let inverted = match key {
            IndexKey::Bloom(bits) if bits.len() == self.nbits => bits.clone(),
            _ => return Box::new(snapshot.into_iter().map(|(_, value)| value)),
        };
        Box::new(
            snapshot
                .into_iter()
                .filter(move |(bits, _)| !intersects(&inverted, bits))
                .map(|(_, value)| value),
        )
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
