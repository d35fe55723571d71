use crate::context::QueryContext;
use crate::interrupt::Interrupted;
use crate::kernel::ClauseSet;
use crate::matcher::Matcher;

/// Matches only when every core clause literally appears in the query.
/// Nothing is renamed, so this misses most reuse, but it never backtracks.
pub struct SimpleMatcher;

impl Matcher for SimpleMatcher {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn matches(&self, core: &ClauseSet, ctx: &QueryContext) -> Result<bool, Interrupted> {
        let query = ctx.query();
        for clause in core.iter() {
            ctx.interrupt().check()?;
            if !query.iter().any(|candidate| candidate == clause) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
