use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::cache::{EmptyUnsatCache, IndexedUnsatCache, UnsatCache, UnsatCacheExt};
use crate::config::{CacheConfig, CacheMode};
use crate::index::{
    BloomIndex, CandidateCounter, CandidateIndex, CountingIndex, IndexKind, ListIndex,
    RandomIndex,
};
use crate::interrupt::{Interrupt, Interrupted};
use crate::kernel::{ClauseSet, Expr, StructuralHasher};
use crate::matcher::MatcherKind;
use crate::tests::common::*;

fn counted(
    index: Box<dyn CandidateIndex>,
    tester: MatcherKind,
) -> (IndexedUnsatCache, Arc<CandidateCounter>) {
    let counter = Arc::new(CandidateCounter::new());
    let index = Box::new(CountingIndex::new(index, counter.clone()));
    (IndexedUnsatCache::new(index, tester.build(), Some(7)), counter)
}

// A one-clause core p_i(x) whose hash lands on the given bloom bit, or avoids it.
fn core_on_bit(hasher: &StructuralHasher, nbits: u64, bit: u64, on: bool) -> ClauseSet {
    (0..10_000)
        .map(|i| clauses(&[apply(&pred(&format!("p{}", i), 1), &[int_var("x")])]))
        .find(|core| (hasher.hash(&core[0]) % nbits == bit) == on)
        .unwrap()
}

#[test]
fn test_bloom_excludes_core_with_missing_bit() {
    let hasher = StructuralHasher::new(Some(7));
    let core = core_on_bit(&hasher, 8, 3, true);
    let other = core_on_bit(&hasher, 8, 3, false);
    let (cache, counter) = counted(Box::new(BloomIndex::<ClauseSet>::new(8)), MatcherKind::FullOpt);
    cache.add(core.clone());

    // The query has nothing on bit 3, so its inverted key has bit 3 set.
    assert!(!check(&cache, &other));
    assert_eq!(counter.last(), 0);

    let renamed = rename_all(&core, &HashMap::from([("x".to_string(), "a".to_string())]));
    let query: ClauseSet = other.iter().chain(renamed.iter()).cloned().collect();
    assert!(check(&cache, &query));
    assert_eq!(counter.last(), 1);
}

#[test]
fn test_random_index_consumes_sample_size() {
    let (cache, counter) = counted(
        Box::new(RandomIndex::<ClauseSet>::new(2, 42)),
        MatcherKind::Full,
    );
    let q = pred("q", 1);
    for i in 0..10 {
        cache.add(clauses(&[apply(&q, &[Expr::int_const(i)])]));
    }
    let query = clauses(&[apply(&pred("p", 1), &[int_var("a")])]);
    assert!(!check(&cache, &query));
    assert_eq!(counter.last(), 2);
    assert!(!check(&cache, &query));
    assert_eq!(counter.consumed(), 4);
}

#[test]
fn test_random_index_with_small_store() {
    let (cache, counter) = counted(
        Box::new(RandomIndex::<ClauseSet>::new(5, 42)),
        MatcherKind::Full,
    );
    let q = pred("q", 1);
    cache.add(clauses(&[apply(&q, &[Expr::int_const(1)])]));
    assert!(!check(&cache, &clauses(&[Expr::bool_const(true)])));
    assert_eq!(counter.last(), 1);
}

#[test]
fn test_hit_stops_at_first_match() {
    let (cache, counter) = counted(Box::new(ListIndex::<ClauseSet>::new()), MatcherKind::FullOpt);
    let p = pred("p", 1);
    for _ in 0..5 {
        cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    }
    assert!(check(&cache, &clauses(&[apply(&p, &[int_var("a")])])));
    assert_eq!(counter.last(), 1);
}

#[test]
fn test_bloom_never_loses_a_match() {
    let mut generator = Generator::new(StdRng::seed_from_u64(77));
    let bloom = cache(MatcherKind::FullOpt, IndexKind::Bloom { nbits: 16 });
    let list = cache(MatcherKind::Full, IndexKind::List);
    let mut cores = vec![];
    for _ in 0..30 {
        let size = generator.rng().gen_range(1..4);
        let core = generator.clause_set(size, &CORE_VARS);
        bloom.add(core.clone());
        list.add(core.clone());
        cores.push(core);
    }
    let mut hits = 0;
    for i in 0..100 {
        let query = if i % 2 == 0 {
            let core = cores[generator.rng().gen_range(0..cores.len())].clone();
            generator.matching_query(&core, 3, &QUERY_VARS)
        } else {
            generator.clause_set(4, &QUERY_VARS)
        };
        let expected = check(&list, &query);
        if expected {
            hits += 1;
        }
        assert_eq!(check(&bloom, &query), expected, "{}", query);
    }
    assert!(hits >= 50);
}

#[test]
fn test_composite_never_loses_a_match() {
    let mut generator = Generator::new(StdRng::seed_from_u64(78));
    let composite = cache(MatcherKind::FullOpt, "bloom:16/bloom:32".parse().unwrap());
    let list = cache(MatcherKind::Full, IndexKind::List);
    let mut cores = vec![];
    for _ in 0..40 {
        let size = generator.rng().gen_range(1..4);
        let core = generator.clause_set(size, &CORE_VARS);
        composite.add(core.clone());
        list.add(core.clone());
        cores.push(core);
    }
    assert_eq!(composite.len(), 40);
    let mut hits = 0;
    for i in 0..100 {
        let query = if i % 2 == 0 {
            let core = cores[generator.rng().gen_range(0..cores.len())].clone();
            generator.matching_query(&core, 3, &QUERY_VARS)
        } else {
            generator.clause_set(4, &QUERY_VARS)
        };
        let expected = check(&list, &query);
        if expected {
            hits += 1;
        }
        assert_eq!(check(&composite, &query), expected, "{}", query);
    }
    assert!(hits >= 50);
}

#[test]
fn test_check_is_idempotent() {
    let mut generator = Generator::new(StdRng::seed_from_u64(3));
    let cache = cache(MatcherKind::FullOpt, IndexKind::Random { candidates: 3 });
    for _ in 0..20 {
        let core = generator.clause_set(2, &CORE_VARS);
        cache.add(core);
    }
    for _ in 0..50 {
        let query = generator.clause_set(5, &QUERY_VARS);
        let first = check(&cache, &query);
        assert_eq!(check(&cache, &query), first);
    }
}

#[test]
fn test_added_core_is_found() {
    let mut generator = Generator::new(StdRng::seed_from_u64(11));
    for kind in [
        IndexKind::List,
        IndexKind::Bloom { nbits: 64 },
        IndexKind::Random { candidates: 1 },
        "bloom:64/list".parse().unwrap(),
    ] {
        let cache = cache(MatcherKind::FullOpt, kind.clone());
        let core = generator.clause_set(3, &CORE_VARS);
        cache.add(core.clone());
        assert!(check(&cache, &core), "{}", kind);
        let query = generator.matching_query(&core, 2, &QUERY_VARS);
        assert!(check(&cache, &query), "{}", kind);
    }
}

#[test]
fn test_interrupted_check_is_an_error() {
    let cache = cache(MatcherKind::FullOpt, IndexKind::List);
    let p = pred("p", 1);
    cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    let token = CancellationToken::new();
    token.cancel();
    let query = clauses(&[apply(&p, &[int_var("a")])]);
    assert_eq!(cache.check(&query, &Interrupt::new(token)), Err(Interrupted));
    assert_eq!(cache.len(), 1);
    assert!(check(&cache, &query));
}

#[test]
fn test_concurrent_add_and_check() {
    let cache = Arc::new(cache(MatcherKind::FullOpt, IndexKind::List));
    std::thread::scope(|scope| {
        for thread in 0..4 {
            let cache = cache.clone();
            scope.spawn(move || {
                let mut generator = Generator::new(StdRng::seed_from_u64(thread));
                for _ in 0..25 {
                    let core = generator.clause_set(2, &CORE_VARS);
                    cache.add(core.clone());
                    let query = generator.matching_query(&core, 2, &QUERY_VARS);
                    assert!(check(cache.as_ref(), &query));
                }
            });
        }
    });
    assert_eq!(cache.len(), 100);
}

#[test]
fn test_max_core_size() {
    let p = pred("p", 1);
    let q = pred("q", 1);
    let cache = cache(MatcherKind::Full, IndexKind::List).with_max_core_size(1);
    let big = clauses(&[apply(&p, &[int_var("x")]), apply(&q, &[int_var("x")])]);
    cache.add(big.clone());
    assert!(!check(&cache, &big));
    assert_eq!(cache.inner().len(), 0);

    cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    assert!(check(&cache, &big));
}

#[test]
fn test_query_filter_is_a_miss() {
    let p = pred("p", 1);
    let cache =
        cache(MatcherKind::Full, IndexKind::List).with_filter(|_| true, |query| query.len() < 2);
    cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    assert!(check(&cache, &clauses(&[apply(&p, &[int_var("a")])])));
    let long = clauses(&[apply(&p, &[int_var("a")]), apply(&p, &[int_var("b")])]);
    assert!(!check(&cache, &long));
}

#[test]
fn test_preprocessor_applies_to_cores_and_queries() {
    let p = pred("p", 1);
    let drop_literals = |set: &ClauseSet| -> ClauseSet {
        set.iter().filter(|clause| !clause.is_leaf()).cloned().collect()
    };
    let cache = cache(MatcherKind::Full, IndexKind::List).with_preprocessor(drop_literals);
    cache.add(clauses(&[Expr::bool_const(true), apply(&p, &[int_var("x")])]));
    assert!(check(&cache, &clauses(&[apply(&p, &[int_var("a")])])));
}

#[test]
fn test_on_check_end_sees_every_finished_check() {
    let p = pred("p", 1);
    let hits = Arc::new(AtomicUsize::new(0));
    let misses = Arc::new(AtomicUsize::new(0));
    let (h, m) = (hits.clone(), misses.clone());
    let cache = cache(MatcherKind::Full, IndexKind::List).on_check_end(move |_, hit| {
        if hit {
            h.fetch_add(1, Ordering::SeqCst);
        } else {
            m.fetch_add(1, Ordering::SeqCst);
        }
    });
    cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    assert!(check(&cache, &clauses(&[apply(&p, &[int_var("a")])])));
    assert!(!check(&cache, &clauses(&[Expr::bool_const(false)])));

    let token = CancellationToken::new();
    token.cancel();
    assert!(cache
        .check(&clauses(&[Expr::bool_const(false)]), &Interrupt::new(token))
        .is_err());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(misses.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disabled_cache_never_hits() {
    let core = clauses(&[apply(&pred("p", 1), &[int_var("x")])]);
    let config = CacheConfig {
        mode: CacheMode::Disabled,
        ..CacheConfig::default()
    };
    let cache = config.build().unwrap();
    cache.add(core.clone());
    assert!(!check(cache.as_ref(), &core));
    EmptyUnsatCache.add(core.clone());
    assert!(!check(&EmptyUnsatCache, &core));
}

#[test]
fn test_config_built_cache() {
    let config = CacheConfig::from_json(
        r#"{"tester": "fullopt", "index": "bloom:32", "max_unsat_core_size": 2, "log_candidates": true}"#,
    )
    .unwrap();
    let (cache, counter) = config.build_with_counter().unwrap();
    let counter = counter.unwrap();
    let p = pred("p", 1);
    let q = pred("q", 1);
    cache.add(clauses(&[apply(&p, &[int_var("x")])]));
    cache.add(clauses(&[
        apply(&p, &[int_var("x")]),
        apply(&q, &[int_var("x")]),
        apply(&q, &[int_var("y")]),
    ]));
    assert!(check(cache.as_ref(), &clauses(&[apply(&p, &[int_var("a")])])));
    assert_eq!(counter.checks(), 1);
    assert!(!check(cache.as_ref(), &clauses(&[apply(&q, &[int_var("a")])])));
}
