use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::trace;

use crate::context::QueryContext;
use crate::interrupt::Interrupted;
use crate::kernel::ClauseSet;
use crate::matcher::unifier::Unifier;
use crate::matcher::Matcher;
use crate::substitution::{PossibleTargets, SubstitutionState};

/// The optimized matcher.
///
/// Instead of searching clause assignments, it computes, for each core clause, every
/// substitution that takes it to some query clause. A core clause can only map to query clauses
/// with the same structural hash, so only that bucket is tried.
/// Then the per-clause sets are pruned against each other and joined, smallest first.
pub struct FullOptMatcher;

impl FullOptMatcher {
    /// The distinct substitutions taking one core clause to some query clause.
    fn clause_substitutions(
        clause_index: usize,
        core: &ClauseSet,
        ctx: &QueryContext,
    ) -> Result<Vec<SubstitutionState>, Interrupted> {
        let clause = &core[clause_index];
        let hash = ctx.core_hasher().hash(clause);
        let mut answer: Vec<SubstitutionState> = vec![];
        for query_index in ctx.buckets().get(hash) {
            ctx.interrupt().check()?;
            let mut unifier = Unifier::new(SubstitutionState::new())
                .with_hashers(ctx.core_hasher(), ctx.query_hasher());
            if unifier.unify(clause, ctx.clause(query_index)) {
                let substitution = unifier.into_state();
                if !answer.contains(&substitution) {
                    answer.push(substitution);
                }
            }
        }
        Ok(answer)
    }

    /// Every consistent combination of one substitution from each side.
    fn join_sets(
        left: &[SubstitutionState],
        right: &[SubstitutionState],
        ctx: &QueryContext,
    ) -> Result<Vec<SubstitutionState>, Interrupted> {
        let mut answer: Vec<SubstitutionState> = vec![];
        for l in left {
            for r in right {
                ctx.interrupt().check()?;
                if let Some(joined) = l.join(r) {
                    if !answer.contains(&joined) {
                        answer.push(joined);
                    }
                }
            }
        }
        Ok(answer)
    }
}

impl Matcher for FullOptMatcher {
    fn name(&self) -> &'static str {
        "fullopt"
    }

    fn matches(&self, core: &ClauseSet, ctx: &QueryContext) -> Result<bool, Interrupted> {
        if core.is_empty() {
            return Ok(true);
        }

        // A core clause whose hash is missing from the query can't match anything.
        let buckets = ctx.buckets();
        for clause in core.iter() {
            if !buckets.contains(ctx.core_hasher().hash(clause)) {
                return Ok(false);
            }
        }

        let mut possible = PossibleTargets::new();
        let mut sets: Vec<Vec<SubstitutionState>> = Vec::with_capacity(core.len());
        for i in 0..core.len() {
            let substitutions = FullOptMatcher::clause_substitutions(i, core, ctx)?;
            if substitutions.is_empty() || !possible.narrow(&substitutions) {
                return Ok(false);
            }
            sets.push(substitutions);
        }

        // Sets built before the last narrowing may hold substitutions that are no longer possible.
        for set in sets.iter_mut() {
            set.retain(|substitution| possible.allows(substitution));
            if set.is_empty() {
                return Ok(false);
            }
        }

        let mut slots: Vec<Option<Vec<SubstitutionState>>> = sets.into_iter().map(Some).collect();
        let mut heap: BinaryHeap<Reverse<(usize, usize)>> = slots
            .iter()
            .enumerate()
            .filter_map(|(slot, set)| set.as_ref().map(|set| Reverse((set.len(), slot))))
            .collect();

        loop {
            let Some(Reverse((_, first))) = heap.pop() else {
                // There was nothing to join.
                return Ok(true);
            };
            let Some(Reverse((_, second))) = heap.pop() else {
                trace!(
                    substitutions = slots[first].as_ref().map_or(0, |set| set.len()),
                    "fullopt match"
                );
                return Ok(true);
            };
            let (Some(left), Some(right)) = (slots[first].take(), slots[second].take()) else {
                return Ok(false);
            };
            let joined = FullOptMatcher::join_sets(&left, &right, ctx)?;
            if joined.is_empty() {
                return Ok(false);
            }
            heap.push(Reverse((joined.len(), slots.len())));
            slots.push(Some(joined));
        }
    }
}
