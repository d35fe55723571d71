use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cache::UnsatCache;
use crate::config::CacheConfig;
use crate::index::IndexKind;
use crate::interrupt::Interrupt;
use crate::kernel::{ClauseSet, Expr};
use crate::matcher::MatcherKind;
use crate::pipeline::{CachePipeline, PipelineEvent, PipelineResult, PipelineState};
use crate::solver::{Solver, SolverStatus};
use crate::tests::common::*;

struct MockSolver {
    status: SolverStatus,
    core: ClauseSet,
    asserted: Vec<Expr>,
    dropped: Arc<AtomicBool>,
}

impl MockSolver {
    fn new(status: SolverStatus, core: ClauseSet, dropped: &Arc<AtomicBool>) -> MockSolver {
        MockSolver {
            status,
            core,
            asserted: vec![],
            dropped: dropped.clone(),
        }
    }
}

impl Solver for MockSolver {
    type Model = usize;

    fn assert_clause(&mut self, clause: &Expr) {
        self.asserted.push(clause.clone());
    }

    fn check(&mut self, _timeout: Duration) -> SolverStatus {
        self.status
    }

    // The model is how many clauses were asserted.
    fn model(&mut self) -> usize {
        self.asserted.len()
    }

    fn unsat_core(&mut self) -> ClauseSet {
        self.core.clone()
    }
}

impl Drop for MockSolver {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn recording(pipeline: CachePipeline) -> (CachePipeline, Arc<Mutex<Vec<PipelineEvent>>>) {
    let events = Arc::new(Mutex::new(vec![]));
    let sink = events.clone();
    let pipeline = pipeline.with_event_handler(move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    (pipeline, events)
}

fn event_names(events: &Mutex<Vec<PipelineEvent>>) -> Vec<&'static str> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|event| match event {
            PipelineEvent::CacheChecked { .. } => "checked",
            PipelineEvent::Solved { .. } => "solved",
            PipelineEvent::CoreInserted { .. } => "inserted",
        })
        .collect()
}

fn pipeline() -> CachePipeline {
    CachePipeline::new(Arc::new(cache(MatcherKind::FullOpt, IndexKind::List)))
}

#[test]
fn test_unsat_core_is_cached() {
    let p = pred("p", 1);
    let q = pred("q", 1);
    let (pipeline, events) = recording(pipeline());
    let dropped = Arc::new(AtomicBool::new(false));

    let first = clauses(&[apply(&p, &[int_var("a")]), apply(&q, &[int_var("b")])]);
    let core = clauses(&[apply(&p, &[int_var("a")])]);
    let result = pipeline.check(&first, || {
        MockSolver::new(SolverStatus::Unsat, core.clone(), &dropped)
    });
    assert_eq!(result, PipelineResult::SolverUnsat(core));
    assert_eq!(result.state(), PipelineState::SolverUnsat);
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(event_names(&events), vec!["checked", "solved", "inserted"]);

    // A renaming of the core is now answered without a solver.
    let second = clauses(&[apply(&q, &[int_var("c")]), apply(&p, &[int_var("d")])]);
    let result = pipeline.check(&second, || -> MockSolver {
        panic!("the solver should not be created on a cache hit")
    });
    assert_eq!(result, PipelineResult::CachedUnsat);
    assert!(result.is_unsat());
    assert_eq!(
        event_names(&events),
        vec!["checked", "solved", "inserted", "checked"]
    );
    let events = events.lock().unwrap();
    match events.last() {
        Some(PipelineEvent::CacheChecked {
            hit, interrupted, ..
        }) => {
            assert!(*hit);
            assert!(!*interrupted);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_sat_returns_model() {
    let (pipeline, events) = recording(pipeline());
    let dropped = Arc::new(AtomicBool::new(false));
    let query = clauses(&[
        apply(&pred("p", 1), &[int_var("a")]),
        Expr::bool_const(true),
    ]);
    let result = pipeline.check(&query, || {
        MockSolver::new(SolverStatus::Sat, ClauseSet::empty(), &dropped)
    });
    assert_eq!(result, PipelineResult::SolverSat(2));
    assert!(!result.is_unsat());
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(event_names(&events), vec!["checked", "solved"]);
    let events = events.lock().unwrap();
    match &events[1] {
        PipelineEvent::Solved { status, .. } => assert_eq!(*status, SolverStatus::Sat),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_solver_gets_the_configured_timeout() {
    struct TimeoutRecorder(Arc<Mutex<Option<Duration>>>);

    impl Solver for TimeoutRecorder {
        type Model = ();
        fn assert_clause(&mut self, _clause: &Expr) {}
        fn check(&mut self, timeout: Duration) -> SolverStatus {
            *self.0.lock().unwrap() = Some(timeout);
            SolverStatus::Unknown
        }
        fn model(&mut self) {}
        fn unsat_core(&mut self) -> ClauseSet {
            ClauseSet::empty()
        }
    }

    let seen = Arc::new(Mutex::new(None));
    let pipeline = pipeline().with_solver_timeout(Duration::from_millis(250));
    let result = pipeline.check(&clauses(&[Expr::bool_const(true)]), || {
        TimeoutRecorder(seen.clone())
    });
    assert_eq!(result, PipelineResult::SolverUnknown);
    assert_eq!(*seen.lock().unwrap(), Some(Duration::from_millis(250)));
}

#[test]
fn test_unknown_inserts_nothing() {
    let p = pred("p", 1);
    let (pipeline, events) = recording(pipeline());
    let dropped = Arc::new(AtomicBool::new(false));
    let query = clauses(&[apply(&p, &[int_var("a")])]);
    let result = pipeline.check(&query, || {
        MockSolver::new(SolverStatus::Unknown, query.clone(), &dropped)
    });
    assert_eq!(result, PipelineResult::SolverUnknown);
    assert_eq!(result.state(), PipelineState::SolverUnknown);
    assert_eq!(event_names(&events), vec!["checked", "solved"]);
    assert!(!pipeline.cache().check(&query, &Interrupt::none()).unwrap());
}

#[test]
fn test_cancelled_cache_check_is_a_miss() {
    let p = pred("p", 1);
    let token = CancellationToken::new();
    let (pipeline, events) = recording(pipeline().with_cancellation(token.clone()));
    let query = clauses(&[apply(&p, &[int_var("a")])]);
    pipeline.cache().add(clauses(&[apply(&p, &[int_var("x")])]));
    token.cancel();

    let dropped = Arc::new(AtomicBool::new(false));
    let result = pipeline.check(&query, || {
        MockSolver::new(SolverStatus::Unsat, query.clone(), &dropped)
    });
    assert_eq!(result, PipelineResult::SolverUnsat(query.clone()));
    let events = events.lock().unwrap();
    match &events[0] {
        PipelineEvent::CacheChecked {
            hit, interrupted, ..
        } => {
            assert!(!*hit);
            assert!(*interrupted);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_cache_timeout_is_a_miss() {
    let p = pred("p", 1);
    let (pipeline, events) = recording(pipeline().with_cache_timeout(Duration::ZERO));
    pipeline.cache().add(clauses(&[apply(&p, &[int_var("x")])]));
    let query = clauses(&[apply(&p, &[int_var("a")])]);
    let dropped = Arc::new(AtomicBool::new(false));
    let result = pipeline.check(&query, || {
        MockSolver::new(SolverStatus::Unknown, ClauseSet::empty(), &dropped)
    });
    assert_eq!(result, PipelineResult::SolverUnknown);
    assert!(matches!(
        events.lock().unwrap()[0],
        PipelineEvent::CacheChecked {
            interrupted: true,
            ..
        }
    ));
}

#[test]
fn test_pipeline_from_config() {
    let config = CacheConfig::from_json(
        r#"{"tester": "full", "index": "bloom:64", "solver_timeout_ms": 100, "cache_timeout_ms": 10000}"#,
    )
    .unwrap();
    let pipeline = config.build_pipeline().unwrap();
    let p = pred("p", 2);
    let dropped = Arc::new(AtomicBool::new(false));
    let core = clauses(&[apply(&p, &[int_var("a"), int_var("a")])]);
    let first = pipeline.check(&core, || {
        MockSolver::new(SolverStatus::Unsat, core.clone(), &dropped)
    });
    assert!(first.is_unsat());

    let renamed = clauses(&[apply(&p, &[int_var("b"), int_var("b")])]);
    let second = pipeline.check(&renamed, || {
        MockSolver::new(SolverStatus::Sat, ClauseSet::empty(), &dropped)
    });
    assert_eq!(second, PipelineResult::CachedUnsat);

    let different = clauses(&[apply(&p, &[int_var("b"), int_var("c")])]);
    let third = pipeline.check(&different, || {
        MockSolver::new(SolverStatus::Sat, ClauseSet::empty(), &dropped)
    });
    assert_eq!(third, PipelineResult::SolverSat(1));
}
