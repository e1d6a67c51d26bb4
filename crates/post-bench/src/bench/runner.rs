//! Benchmark execution runner.

use crate::bench::{
    round_duration, Phase, ResultRow, GENERATION_PRECISION, VALIDATION_PRECISION,
};
use crate::error::BenchError;
use post_core::{num_files, Config, Engine, EngineFactory, PostError};
use std::time::{Duration, Instant};

/// Identity every case initializes space for (`deadbeef`).
pub const DEFAULT_IDENTITY: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

/// Challenge every case answers.
pub const DEFAULT_CHALLENGE: &[u8] = b"this is a challenge";

/// Runs benchmark cases one at a time against engines from a factory.
///
/// Each case goes through initialize, validate, prove, validate and reset
/// before the next case starts, so timings never overlap. The first failure
/// aborts the run: later cases are not attempted and no rows are returned.
pub struct BenchRunner<F> {
    factory: F,
    identity: Vec<u8>,
    challenge: Vec<u8>,
}

impl<F: EngineFactory> BenchRunner<F> {
    /// Create a runner using the default identity and challenge.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            identity: DEFAULT_IDENTITY.to_vec(),
            challenge: DEFAULT_CHALLENGE.to_vec(),
        }
    }

    /// Use a different identity and challenge.
    #[must_use]
    pub fn with_identity(self, identity: &[u8], challenge: &[u8]) -> Self {
        Self {
            identity: identity.to_vec(),
            challenge: challenge.to_vec(),
            ..self
        }
    }

    /// Run every case in order, returning one row per case.
    pub fn run(&self, cases: &[Config]) -> Result<Vec<ResultRow>, BenchError> {
        let total = cases.len();
        let mut rows = Vec::with_capacity(total);

        for (i, config) in cases.iter().enumerate() {
            let case = i + 1;
            tracing::info!("case {case}/{total} starting...");
            let start = Instant::now();

            let row = self.run_case(config, case, total)?;

            tracing::info!(
                "case {case}/{total} completed, {:?}",
                start.elapsed()
            );
            rows.push(row);
        }

        Ok(rows)
    }

    /// Run a single case. `case` and `total` only label errors.
    ///
    /// When a phase fails the engine is still reset, best effort, so the
    /// space does not outlive the run. The returned error is the phase's.
    pub fn run_case(
        &self,
        config: &Config,
        case: usize,
        total: usize,
    ) -> Result<ResultRow, BenchError> {
        let fail = |phase: Phase| {
            move |source: PostError| BenchError::Phase {
                case,
                total,
                phase,
                source,
            }
        };

        let mut engine = self.factory.open(config).map_err(fail(Phase::Open))?;

        let timings = self.measure(&mut engine).map_err(|(phase, source)| {
            if let Err(e) = engine.reset(&self.identity) {
                tracing::warn!("case {case}/{total}: reset after failed {phase} also failed: {e}");
            }
            fail(phase)(source)
        })?;

        engine.reset(&self.identity).map_err(fail(Phase::Reset))?;

        let num_files = num_files(config.space_per_unit(), config.file_size())
            .map_err(fail(Phase::Open))?;
        let write = engine.write_parallelism();
        let read_parallelism = engine.read_parallelism(num_files);

        tracing::debug!(
            "case {case}/{total}: {num_files} files, write {:?}, read {read_parallelism}",
            write
        );

        Ok(ResultRow {
            num_files,
            write_files_parallelism: write.files,
            write_infile_parallelism: write.in_file,
            init: round_duration(timings.init, GENERATION_PRECISION),
            init_validation: round_duration(timings.init_validation, VALIDATION_PRECISION),
            read_parallelism,
            proof: round_duration(timings.proof, GENERATION_PRECISION),
            proof_validation: round_duration(timings.proof_validation, VALIDATION_PRECISION),
        })
    }

    /// The four timed phases, in order.
    fn measure<E: Engine>(&self, engine: &mut E) -> Result<Timings, (Phase, PostError)> {
        let (init_proof, init) = timed(|| engine.initialize(&self.identity))
            .map_err(|e| (Phase::Initialize, e))?;

        let ((), init_validation) =
            timed(|| engine.validate(&init_proof)).map_err(|e| (Phase::ValidateInit, e))?;

        let (proof, proof_time) = timed(|| engine.generate_proof(&self.identity, &self.challenge))
            .map_err(|e| (Phase::Prove, e))?;

        let ((), proof_validation) =
            timed(|| engine.validate(&proof)).map_err(|e| (Phase::ValidateProof, e))?;

        Ok(Timings {
            init,
            init_validation,
            proof: proof_time,
            proof_validation,
        })
    }
}

/// Raw phase durations of one case.
struct Timings {
    init: Duration,
    init_validation: Duration,
    proof: Duration,
    proof_validation: Duration,
}

/// Run `f`, returning its value and how long it took.
fn timed<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<(T, Duration), E> {
    let start = Instant::now();
    let value = f()?;
    Ok((value, start.elapsed()))
}
