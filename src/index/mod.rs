use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::context::{CacheContext, QueryContext};
use crate::kernel::ClauseSet;

pub mod bloom;
pub mod composite;
pub mod counting;
pub mod list;
pub mod random;

pub use bloom::BloomIndex;
pub use composite::CompositeIndex;
pub use counting::{CandidateCounter, CountingIndex};
pub use list::ListIndex;
pub use random::RandomIndex;

/// What an index files a core under, or looks candidates up with.
/// Each index only ever sees the kind of key it produces itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexKey {
    Flat,

    // A digest of a query's clause hashes.
    Digest(u64),

    Bloom(BitVec),

    // The outer key, then the inner key.
    Composite(Box<IndexKey>, Box<IndexKey>),
}

pub type Candidates<V = ClauseSet> = Box<dyn Iterator<Item = V> + Send>;

/// A CandidateIndex stores values filed under keys computed from cores, and narrows down which
/// of them could matter for a query.
///
/// The values are cores, except in the outer level of a composite index, where they are inner
/// indexes.
/// Candidates may include cores that don't match, since the matcher confirms them, but an index
/// only leaves out a matching core when it samples on purpose.
pub trait CandidateIndex<V = ClauseSet>: Send + Sync {
    fn name(&self) -> &'static str;

    /// The key for a core, computed once when it's added.
    fn core_key(&self, core: &ClauseSet, context: &CacheContext) -> IndexKey;

    /// The key for a query, computed once per check.
    fn query_key(&self, ctx: &QueryContext) -> IndexKey;

    /// Turns a core key into a lookup key that finds what a query containing that core would find.
    fn lookup_key(&self, core_key: &IndexKey) -> IndexKey {
        core_key.clone()
    }

    fn insert(&self, key: IndexKey, value: V);

    /// The candidates for a lookup key.
    /// The iterator works on a snapshot, so values added while it's consumed are not seen.
    fn candidates(&self, key: &IndexKey) -> Candidates<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only storage behind the indexes.
/// Taking a snapshot is a cheap clone of a persistent vector.
pub struct Store<T: Clone> {
    entries: RwLock<im::Vector<T>>,
}

impl<T: Clone> Store<T> {
    pub fn new() -> Store<T> {
        Store {
            entries: RwLock::new(im::Vector::new()),
        }
    }

    pub fn push(&self, entry: T) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push_back(entry);
    }

    pub fn snapshot(&self) -> im::Vector<T> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T: Clone> Default for Store<T> {
    fn default() -> Self {
        Store::new()
    }
}

/// Which index to use, as named in configuration.
/// The text forms are "list", "random:K" and "bloom:N". "outer/inner" is a composite index, and
/// its outer index can't itself be composite.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndexKind {
    #[default]
    List,
    Random {
        candidates: usize,
    },
    Bloom {
        nbits: usize,
    },
    Composite {
        outer: Box<IndexKind>,
        inner: Box<IndexKind>,
    },
}

impl IndexKind {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            IndexKind::Random { candidates: 0 } => Err(ConfigError::ZeroSampleSize),
            IndexKind::Bloom { nbits: 0 } => Err(ConfigError::ZeroBloomWidth),
            IndexKind::Composite { outer, .. }
                if matches!(**outer, IndexKind::Composite { .. }) =>
            {
                Err(ConfigError::InvalidIndexParameter(self.to_string()))
            }
            IndexKind::Composite { outer, inner } => {
                outer.validate()?;
                inner.validate()
            }
            _ => Ok(()),
        }
    }

    /// The seed only matters for sampling indexes.
    pub fn build(&self, seed: u64) -> Result<Box<dyn CandidateIndex>, ConfigError> {
        self.validate()?;
        Ok(self.make(seed))
    }

    fn make(&self, seed: u64) -> Box<dyn CandidateIndex> {
        match self {
            IndexKind::Composite { outer, inner } => {
                let inner = (**inner).clone();
                Box::new(CompositeIndex::new(
                    outer.make_flat(seed),
                    Box::new(move || inner.make(seed)),
                ))
            }
            flat => flat.make_flat(seed),
        }
    }

    fn make_flat<V>(&self, seed: u64) -> Box<dyn CandidateIndex<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        match *self {
            IndexKind::Random { candidates } => Box::new(RandomIndex::<V>::new(candidates, seed)),
            IndexKind::Bloom { nbits } => Box::new(BloomIndex::<V>::new(nbits)),
            // Only a validated kind gets here, so a composite never sits in the outer position.
            IndexKind::List | IndexKind::Composite { .. } => Box::new(ListIndex::<V>::new()),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::List => write!(f, "list"),
            IndexKind::Random { candidates } => write!(f, "random:{}", candidates),
            IndexKind::Bloom { nbits } => write!(f, "bloom:{}", nbits),
            IndexKind::Composite { outer, inner } => write!(f, "{}/{}", outer, inner),
        }
    }
}

fn parse_parameter(text: &str, parameter: &str) -> Result<usize, ConfigError> {
    parameter
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidIndexParameter(text.to_string()))
}

impl FromStr for IndexKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<IndexKind, ConfigError> {
        // The outer part has no slash, so it is never composite.
        if let Some((outer, inner)) = s.split_once('/') {
            let kind = IndexKind::Composite {
                outer: Box::new(outer.parse()?),
                inner: Box::new(inner.parse()?),
            };
            kind.validate()?;
            return Ok(kind);
        }
        let (name, parameter) = match s.split_once(':') {
            Some((name, parameter)) => (name.trim(), Some(parameter)),
            None => (s.trim(), None),
        };
        let kind = match (name, parameter) {
            ("list", None) => IndexKind::List,
            ("random", Some(p)) => IndexKind::Random {
                candidates: parse_parameter(s, p)?,
            },
            ("bloom", Some(p)) => IndexKind::Bloom {
                nbits: parse_parameter(s, p)?,
            },
            ("random", None) | ("bloom", None) | ("list", Some(_)) => {
                return Err(ConfigError::InvalidIndexParameter(s.to_string()))
            }
            _ => return Err(ConfigError::UnknownIndex(s.to_string())),
        };
        kind.validate()?;
        Ok(kind)
    }
}

impl TryFrom<String> for IndexKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<IndexKind, ConfigError> {
        s.parse()
    }
}

impl From<IndexKind> for String {
    fn from(kind: IndexKind) -> String {
        kind.to_string()
    }
}
