use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::context::QueryContext;
use crate::interrupt::Interrupted;
use crate::kernel::ClauseSet;

pub mod full;
pub mod full_opt;
pub mod simple;
pub mod unifier;

pub use full::FullMatcher;
pub use full_opt::FullOptMatcher;
pub use simple::SimpleMatcher;

/// A Matcher decides whether a cached core is a renaming of some subset of the query.
///
/// Matching only fails to return an answer when it's interrupted.
pub trait Matcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, core: &ClauseSet, ctx: &QueryContext) -> Result<bool, Interrupted>;
}

/// Which matcher to use, as named in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Simple,
    Full,
    #[default]
    FullOpt,
}

impl MatcherKind {
    pub fn build(&self) -> Box<dyn Matcher> {
        match self {
            MatcherKind::Simple => Box::new(SimpleMatcher),
            MatcherKind::Full => Box::new(FullMatcher),
            MatcherKind::FullOpt => Box::new(FullOptMatcher),
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatcherKind::Simple => "simple",
            MatcherKind::Full => "full",
            MatcherKind::FullOpt => "fullopt",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MatcherKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<MatcherKind, ConfigError> {
        match s {
            "simple" => Ok(MatcherKind::Simple),
            "full" => Ok(MatcherKind::Full),
            "fullopt" => Ok(MatcherKind::FullOpt),
            _ => Err(ConfigError::UnknownTester(s.to_string())),
        }
    }
}
