// The corecache CLI.
// You can check a cache configuration, or run a synthetic workload through a configured pipeline.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use corecache::config::CacheConfig;
use corecache::kernel::{ClauseSet, Declaration, Expr, Sort};
use corecache::pipeline::PipelineResult;
use corecache::solver::{Solver, SolverStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[clap(
    name = "corecache",
    about = "A cache of unsatisfiable cores for SMT queries",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a configuration file is valid
    Validate {
        #[clap(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Run a synthetic workload of renamed queries through the pipeline
    Synth {
        /// The configuration to use. Defaults are used without one.
        #[clap(long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// How many distinct unsatisfiable shapes the queries are built from
        #[clap(long, default_value_t = 20)]
        families: usize,

        #[clap(long, default_value_t = 500)]
        queries: usize,

        /// Clauses per shape
        #[clap(long, default_value_t = 4)]
        core_size: usize,

        /// Extra clauses added to each query around its core
        #[clap(long, default_value_t = 6)]
        noise: usize,

        #[clap(long, default_value_t = 0)]
        seed: u64,
    },
}

// Each synthetic query knows its own core, so this stands in for a real solver.
struct ScriptedSolver {
    core: ClauseSet,
    asserted: usize,
}

impl Solver for ScriptedSolver {
    type Model = ();

    fn assert_clause(&mut self, _clause: &Expr) {
        self.asserted += 1;
    }

    fn check(&mut self, _timeout: Duration) -> SolverStatus {
        if self.asserted >= self.core.len() {
            SolverStatus::Unsat
        } else {
            SolverStatus::Unknown
        }
    }

    fn model(&mut self) {}

    fn unsat_core(&mut self) -> ClauseSet {
        self.core.clone()
    }
}

struct Workload {
    predicates: Vec<Declaration>,
    noise: Declaration,
    core_size: usize,
    noise_size: usize,
    rng: StdRng,
}

impl Workload {
    fn new(families: usize, core_size: usize, noise_size: usize, seed: u64) -> Workload {
        let predicates = (0..families.max(1) * core_size.max(1))
            .map(|i| Declaration::new(&format!("p{}", i), vec![Sort::Int, Sort::Int], Sort::Bool))
            .collect();
        Workload {
            predicates,
            noise: Declaration::new("noise", vec![Sort::Int, Sort::Int], Sort::Bool),
            core_size: core_size.max(1),
            noise_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // A chain p(v0, v1), p'(v1, v2), ... over variables private to this query.
    fn next_query(&mut self, query_id: usize) -> (ClauseSet, ClauseSet) {
        let families = self.predicates.len() / self.core_size;
        let family = self.rng.gen_range(0..families);
        let var = |i: usize| {
            Expr::var(&Declaration::constant(
                &format!("q{}_v{}", query_id, i),
                Sort::Int,
            ))
        };
        let core: Vec<Expr> = (0..self.core_size)
            .map(|i| {
                let p = &self.predicates[family * self.core_size + i];
                Expr::app(p, vec![var(i), var(i + 1)])
            })
            .collect();
        let mut clauses = core.clone();
        for _ in 0..self.noise_size {
            let value = self.rng.gen_range(0..1000);
            let position = self.rng.gen_range(0..=clauses.len());
            let left = var(self.rng.gen_range(0..=self.core_size));
            clauses.insert(
                position,
                Expr::app(&self.noise, vec![left, Expr::int_const(value)]),
            );
        }
        (ClauseSet::new(clauses), ClauseSet::new(core))
    }
}

fn main() {
    // Use RUST_LOG env var to control log levels, e.g.:
    //   RUST_LOG=corecache::cache=debug corecache synth
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Validate { config } => match CacheConfig::load(&config) {
            Ok(config) => {
                println!(
                    "ok: mode {:?}, tester {}, index {}",
                    config.mode, config.tester, config.index
                );
            }
            Err(e) => {
                println!("{}", e);
                std::process::exit(1);
            }
        },

        Command::Synth {
            config,
            families,
            queries,
            core_size,
            noise,
            seed,
        } => {
            let config = match config {
                Some(path) => CacheConfig::load(&path),
                None => Ok(CacheConfig::default()),
            };
            let config = config.unwrap_or_else(|e| {
                println!("{}", e);
                std::process::exit(1);
            });
            let pipeline = config.build_pipeline().unwrap_or_else(|e| {
                println!("{}", e);
                std::process::exit(1);
            });

            let mut workload = Workload::new(families, core_size, noise, seed);
            let mut hits = 0;
            let mut solved = 0;
            let start = Instant::now();
            for query_id in 0..queries {
                let (query, core) = workload.next_query(query_id);
                let result = pipeline.check(&query, || ScriptedSolver { core, asserted: 0 });
                match result {
                    PipelineResult::CachedUnsat => hits += 1,
                    _ => solved += 1,
                }
            }
            let elapsed = start.elapsed();
            println!(
                "{} queries: {} cache hits, {} solver calls, {:.3}s",
                queries,
                hits,
                solved,
                elapsed.as_secs_f64()
            );
        }
    }
}
