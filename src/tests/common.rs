use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;

use crate::cache::{IndexedUnsatCache, UnsatCache};
use crate::context::CacheContext;
use crate::index::IndexKind;
use crate::interrupt::Interrupt;
use crate::kernel::{ClauseSet, Declaration, Expr, ExprKind, Sort};
use crate::matcher::unifier::Unifier;
use crate::matcher::MatcherKind;
use crate::substitution::SubstitutionState;

pub fn int_decl(name: &str) -> Declaration {
    Declaration::constant(name, Sort::Int)
}

pub fn int_var(name: &str) -> Expr {
    Expr::var(&int_decl(name))
}

/// A predicate over integers.
pub fn pred(name: &str, arity: usize) -> Declaration {
    Declaration::new(name, vec![Sort::Int; arity], Sort::Bool)
}

/// A function from integers to an integer.
pub fn func(name: &str, arity: usize) -> Declaration {
    Declaration::new(name, vec![Sort::Int; arity], Sort::Int)
}

pub fn eq() -> Declaration {
    Declaration::new("=", vec![Sort::Int, Sort::Int], Sort::Bool)
}

pub fn apply(decl: &Declaration, args: &[Expr]) -> Expr {
    Expr::app(decl, args.to_vec())
}

pub fn clauses(exprs: &[Expr]) -> ClauseSet {
    ClauseSet::new(exprs.to_vec())
}

pub fn cache(tester: MatcherKind, index: IndexKind) -> IndexedUnsatCache {
    let index = index.build(42).unwrap();
    IndexedUnsatCache::new(index, tester.build(), Some(7))
}

pub fn check(cache: &dyn UnsatCache, query: &ClauseSet) -> bool {
    cache.check(query, &Interrupt::none()).unwrap()
}

/// Runs one matcher directly, without an index.
pub fn matches(tester: MatcherKind, core: &ClauseSet, query: &ClauseSet) -> bool {
    let context = CacheContext::new(Some(7));
    let interrupt = Interrupt::none();
    let ctx = context.query(query, &interrupt);
    tester.build().matches(core, &ctx).unwrap()
}

/// Tries every way to send core clauses to query clauses.
pub fn brute_force_matches(core: &ClauseSet, query: &ClauseSet) -> bool {
    fn search(core: &[Expr], query: &ClauseSet, state: SubstitutionState) -> bool {
        let Some((first, rest)) = core.split_first() else {
            return true;
        };
        query.iter().any(|candidate| {
            let mut unifier = Unifier::new(state.clone());
            unifier.unify(first, candidate) && search(rest, query, unifier.into_state())
        })
    }
    search(core, query, SubstitutionState::new())
}

/// Replaces free integer variables by name. Only handles applications and leaves.
pub fn rename(expr: &Expr, renaming: &HashMap<String, String>) -> Expr {
    match expr.kind() {
        ExprKind::App { decl, args } if args.is_empty() => match renaming.get(decl.name()) {
            Some(name) => Expr::var(&Declaration::constant(name, decl.sort().clone())),
            None => expr.clone(),
        },
        ExprKind::App { decl, args } => {
            Expr::app(decl, args.iter().map(|a| rename(a, renaming)).collect())
        }
        _ => expr.clone(),
    }
}

pub fn rename_all(set: &ClauseSet, renaming: &HashMap<String, String>) -> ClauseSet {
    set.iter().map(|clause| rename(clause, renaming)).collect()
}

/// Small random problems over a few predicates, functions and variables.
pub struct Generator {
    rng: StdRng,
    predicates: Vec<Declaration>,
    f: Declaration,
}

impl Generator {
    pub fn new(rng: StdRng) -> Generator {
        Generator {
            rng,
            predicates: vec![pred("p", 1), pred("q", 2), pred("r", 2)],
            f: func("f", 1),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn term(&mut self, vars: &[&str]) -> Expr {
        match self.rng.gen_range(0..5) {
            0 => Expr::int_const(self.rng.gen_range(0..2)),
            1 => {
                let var = vars[self.rng.gen_range(0..vars.len())];
                apply(&self.f, &[int_var(var)])
            }
            _ => int_var(vars[self.rng.gen_range(0..vars.len())]),
        }
    }

    pub fn clause(&mut self, vars: &[&str]) -> Expr {
        let p = self.predicates[self.rng.gen_range(0..self.predicates.len())].clone();
        let args: Vec<Expr> = (0..p.arity()).map(|_| self.term(vars)).collect();
        Expr::app(&p, args)
    }

    pub fn clause_set(&mut self, size: usize, vars: &[&str]) -> ClauseSet {
        (0..size).map(|_| self.clause(vars)).collect()
    }

    /// A query that is a renaming of the core plus some unrelated clauses, shuffled.
    pub fn matching_query(&mut self, core: &ClauseSet, noise: usize, vars: &[&str]) -> ClauseSet {
        let mut renaming = HashMap::new();
        for name in ["x", "y", "z"] {
            let target = vars[self.rng.gen_range(0..vars.len())];
            renaming.insert(name.to_string(), target.to_string());
        }
        let mut exprs: Vec<Expr> = rename_all(core, &renaming).iter().cloned().collect();
        for _ in 0..noise {
            let position = self.rng.gen_range(0..=exprs.len());
            let clause = self.clause(vars);
            exprs.insert(position, clause);
        }
        ClauseSet::new(exprs)
    }
}

pub const CORE_VARS: [&str; 3] = ["x", "y", "z"];
pub const QUERY_VARS: [&str; 3] = ["a", "b", "c"];
