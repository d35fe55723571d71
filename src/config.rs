use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{EmptyUnsatCache, IndexedUnsatCache, UnsatCache, UnsatCacheExt};
use crate::index::{CandidateCounter, CountingIndex, IndexKind};
use crate::kernel::fingerprint::DEFAULT_MAX_HEIGHT;
use crate::matcher::MatcherKind;
use crate::pipeline::CachePipeline;

/// Errors that can occur when reading or applying a cache configuration.
#[derive(Debug)]
pub enum ConfigError {
    UnknownTester(String),
    UnknownIndex(String),

    // The index name was fine but its parameter wasn't.
    InvalidIndexParameter(String),

    ZeroBloomWidth,
    ZeroSampleSize,
    Json(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnknownTester(name) => write!(f, "unknown tester: {}", name),
            ConfigError::UnknownIndex(name) => write!(f, "unknown index: {}", name),
            ConfigError::InvalidIndexParameter(text) => {
                write!(f, "invalid index parameter: {}", text)
            }
            ConfigError::ZeroBloomWidth => write!(f, "bloom index needs at least one bit"),
            ConfigError::ZeroSampleSize => {
                write!(f, "random index needs to sample at least one candidate")
            }
            ConfigError::Json(error) => write!(f, "bad configuration: {}", error),
            ConfigError::Io(error) => write!(f, "cannot read configuration: {}", error),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(error) => Some(error),
            ConfigError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Json(error)
    }
}

impl From<io::Error> for ConfigError {
    fn from(error: io::Error) -> Self {
        ConfigError::Io(error)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Disabled,
    #[default]
    Enabled,
}

/// Everything needed to put a cache together.
/// Missing fields take their defaults, and unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub mode: CacheMode,
    pub tester: MatcherKind,
    pub index: IndexKind,

    // Cores with more clauses than this are not stored.
    pub max_unsat_core_size: Option<usize>,

    // None hashes expressions all the way down.
    pub max_hash_height: Option<usize>,

    pub cache_timeout_ms: Option<u64>,
    pub solver_timeout_ms: u64,

    // Seeds the sampling of random indexes.
    pub seed: u64,

    // Counts the candidates each check looks at.
    pub log_candidates: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            mode: CacheMode::Enabled,
            tester: MatcherKind::FullOpt,
            index: IndexKind::List,
            max_unsat_core_size: None,
            max_hash_height: Some(DEFAULT_MAX_HEIGHT),
            cache_timeout_ms: None,
            solver_timeout_ms: 5000,
            seed: 42,
            log_candidates: false,
        }
    }
}

impl CacheConfig {
    pub fn from_json(text: &str) -> Result<CacheConfig, ConfigError> {
        let config: CacheConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<CacheConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        CacheConfig::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.index.validate()
    }

    pub fn build(&self) -> Result<Arc<dyn UnsatCache>, ConfigError> {
        let (cache, _) = self.build_with_counter()?;
        Ok(cache)
    }

    /// Also returns the candidate counter, when log_candidates is on.
    pub fn build_with_counter(
        &self,
    ) -> Result<(Arc<dyn UnsatCache>, Option<Arc<CandidateCounter>>), ConfigError> {
        self.validate()?;
        if self.mode == CacheMode::Disabled {
            info!("unsat cache disabled");
            return Ok((Arc::new(EmptyUnsatCache), None));
        }

        let mut index = self.index.build(self.seed)?;
        let mut counter = None;
        if self.log_candidates {
            let shared = Arc::new(CandidateCounter::new());
            index = Box::new(CountingIndex::new(index, shared.clone()));
            counter = Some(shared);
        }
        let cache = IndexedUnsatCache::new(index, self.tester.build(), self.max_hash_height);
        info!(
            index = %self.index,
            tester = %self.tester,
            max_hash_height = ?self.max_hash_height,
            "unsat cache built"
        );

        let cache: Arc<dyn UnsatCache> = match self.max_unsat_core_size {
            Some(max_size) => Arc::new(cache.with_max_core_size(max_size)),
            None => Arc::new(cache),
        };
        Ok((cache, counter))
    }

    pub fn build_pipeline(&self) -> Result<CachePipeline, ConfigError> {
        let mut pipeline = CachePipeline::new(self.build()?)
            .with_solver_timeout(Duration::from_millis(self.solver_timeout_ms));
        if let Some(ms) = self.cache_timeout_ms {
            pipeline = pipeline.with_cache_timeout(Duration::from_millis(ms));
        }
        Ok(pipeline)
    }
}
