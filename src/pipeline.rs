use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::cache::UnsatCache;
use crate::interrupt::Interrupt;
use crate::kernel::ClauseSet;
use crate::solver::{Solver, SolverStatus};

pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_millis(5000);

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(0);

/// Where a query is in the pipeline.
/// A query moves from Init to CacheChecking, then either to CacheHit or through Solving to one
/// of the solver outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    CacheChecking,
    CacheHit,
    Solving,
    SolverSat,
    SolverUnsat,
    SolverUnknown,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineResult<M> {
    /// The cache proved the query unsatisfiable.
    CachedUnsat,
    SolverSat(M),
    SolverUnsat(ClauseSet),
    SolverUnknown,
}

impl<M> PipelineResult<M> {
    pub fn is_unsat(&self) -> bool {
        matches!(
            self,
            PipelineResult::CachedUnsat | PipelineResult::SolverUnsat(_)
        )
    }

    /// The state the query ended in.
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineResult::CachedUnsat => PipelineState::CacheHit,
            PipelineResult::SolverSat(_) => PipelineState::SolverSat,
            PipelineResult::SolverUnsat(_) => PipelineState::SolverUnsat,
            PipelineResult::SolverUnknown => PipelineState::SolverUnknown,
        }
    }
}

/// Events are sent in the order they happen, for each query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    CacheChecked {
        query_id: u64,
        hit: bool,

        // Whether the check was cut short. An interrupted check is a miss.
        interrupted: bool,

        duration: Duration,
    },
    Solved {
        query_id: u64,
        status: SolverStatus,
        duration: Duration,
    },
    CoreInserted {
        query_id: u64,
        size: usize,
        duration: Duration,
    },
}

type EventHandler = Box<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Answers satisfiability queries, trying the cache before the solver.
/// Every unsat core the solver finds goes into the cache.
pub struct CachePipeline {
    cache: Arc<dyn UnsatCache>,
    cache_timeout: Option<Duration>,
    solver_timeout: Duration,
    cancellation: CancellationToken,
    event_handler: Option<EventHandler>,
}

impl CachePipeline {
    pub fn new(cache: Arc<dyn UnsatCache>) -> CachePipeline {
        CachePipeline {
            cache,
            cache_timeout: None,
            solver_timeout: DEFAULT_SOLVER_TIMEOUT,
            cancellation: CancellationToken::new(),
            event_handler: None,
        }
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> CachePipeline {
        self.cache_timeout = Some(timeout);
        self
    }

    pub fn with_solver_timeout(mut self, timeout: Duration) -> CachePipeline {
        self.solver_timeout = timeout;
        self
    }

    /// Cancelling the token cuts cache checks short.
    /// The solver has its own timeout and isn't affected.
    pub fn with_cancellation(mut self, token: CancellationToken) -> CachePipeline {
        self.cancellation = token;
        self
    }

    pub fn with_event_handler(
        mut self,
        handler: impl Fn(&PipelineEvent) + Send + Sync + 'static,
    ) -> CachePipeline {
        self.event_handler = Some(Box::new(handler));
        self
    }

    pub fn cache(&self) -> &Arc<dyn UnsatCache> {
        &self.cache
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(handler) = &self.event_handler {
            handler(&event);
        }
    }

    fn transition(&self, query_id: u64, state: PipelineState) {
        trace!(query_id, %state, "pipeline state");
    }

    fn check_cache(&self, query_id: u64, assertions: &ClauseSet) -> bool {
        let mut interrupt = Interrupt::new(self.cancellation.child_token());
        if let Some(timeout) = self.cache_timeout {
            interrupt = interrupt.with_timeout(timeout);
        }
        let start = Instant::now();
        let (hit, interrupted) = match self.cache.check(assertions, &interrupt) {
            Ok(hit) => (hit, false),
            Err(_) => (false, true),
        };
        let duration = start.elapsed();
        debug!(query_id, hit, interrupted, ?duration, "cache checked");
        self.emit(PipelineEvent::CacheChecked {
            query_id,
            hit,
            interrupted,
            duration,
        });
        hit
    }

    /// Decides one query.
    /// make_solver is only called on a cache miss, and the solver is dropped before returning.
    pub fn check<S: Solver>(
        &self,
        assertions: &ClauseSet,
        make_solver: impl FnOnce() -> S,
    ) -> PipelineResult<S::Model> {
        let query_id = NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed);
        self.transition(query_id, PipelineState::Init);

        self.transition(query_id, PipelineState::CacheChecking);
        if self.check_cache(query_id, assertions) {
            self.transition(query_id, PipelineState::CacheHit);
            return PipelineResult::CachedUnsat;
        }

        self.transition(query_id, PipelineState::Solving);
        let mut solver = make_solver();
        for clause in assertions.iter() {
            solver.assert_clause(clause);
        }
        let start = Instant::now();
        let status = solver.check(self.solver_timeout);
        let duration = start.elapsed();
        debug!(query_id, %status, ?duration, "solved");
        self.emit(PipelineEvent::Solved {
            query_id,
            status,
            duration,
        });

        let result = match status {
            SolverStatus::Sat => PipelineResult::SolverSat(solver.model()),
            SolverStatus::Unknown => PipelineResult::SolverUnknown,
            SolverStatus::Unsat => {
                let core = solver.unsat_core();
                let start = Instant::now();
                self.cache.add(core.clone());
                let duration = start.elapsed();
                debug!(query_id, size = core.len(), "unsat core cached");
                self.emit(PipelineEvent::CoreInserted {
                    query_id,
                    size: core.len(),
                    duration,
                });
                PipelineResult::SolverUnsat(core)
            }
        };
        self.transition(query_id, result.state());
        result
    }
}
