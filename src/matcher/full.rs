use tracing::trace;

use crate::context::QueryContext;
use crate::interrupt::Interrupted;
use crate::kernel::ClauseSet;
use crate::matcher::unifier::Unifier;
use crate::matcher::Matcher;
use crate::substitution::SubstitutionState;

/// Searches every assignment of core clauses to query clauses, depth first.
///
/// Each stack entry is the index of the next core clause plus the substitution built so far.
/// Substitutions are persistent, so pushing a branch doesn't copy anything.
/// Exponential in the worst case: the branching factor is the query size and the depth is
/// the core size.
pub struct FullMatcher;

impl Matcher for FullMatcher {
    fn name(&self) -> &'static str {
        "full"
    }

    fn matches(&self, core: &ClauseSet, ctx: &QueryContext) -> Result<bool, Interrupted> {
        if core.is_empty() {
            return Ok(true);
        }
        let query = ctx.query();
        let mut stack = vec![(0, SubstitutionState::new())];
        while let Some((index, state)) = stack.pop() {
            let clause = &core[index];
            for candidate in query.iter() {
                ctx.interrupt().check()?;
                let mut unifier = Unifier::new(state.clone())
                    .with_hashers(ctx.core_hasher(), ctx.query_hasher());
                if !unifier.unify(clause, candidate) {
                    continue;
                }
                if index + 1 == core.len() {
                    trace!(substitution = %unifier.state(), "full match");
                    return Ok(true);
                }
                stack.push((index + 1, unifier.into_state()));
            }
        }
        Ok(false)
    }
}
