//! Sweep, run and report pipeline tests.
//!
//! ```bash
//! cargo test -p post-bench --test pipeline_tests
//! ```

use post_bench::bench::{
    run_and_publish, BenchRunner, Phase, DEFAULT_CHALLENGE, DEFAULT_IDENTITY, RESULT_HEADER,
};
use post_bench::config::{BenchConfig, BenchMode, ReportAnnotations};
use post_bench::metadata::{Metadata, SystemInfo};
use post_bench::results::publish;
use post_bench::{sweep, BenchError};
use post_core::{
    num_files, Config, DiskEngineFactory, Engine, EngineFactory, PostError, Proof,
    WriteParallelism,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tempfile::TempDir;

/// Call counters shared between a factory and the engines it opens.
#[derive(Default)]
struct Calls {
    opened: Cell<usize>,
    validated: Cell<usize>,
    reset: Cell<usize>,
    /// Identities passed to `initialize`, `generate_proof` and `reset`.
    identities: RefCell<Vec<Vec<u8>>>,
    /// Challenges passed to `generate_proof`.
    challenges: RefCell<Vec<Vec<u8>>>,
}

struct StubFactory {
    calls: Rc<Calls>,
    /// Fail the n-th `validate` call (1-based) across all engines.
    fail_validate_at: Option<usize>,
    fail_reset: bool,
}

impl StubFactory {
    fn new() -> Self {
        Self {
            calls: Rc::default(),
            fail_validate_at: None,
            fail_reset: false,
        }
    }

    fn failing_validate_at(n: usize) -> Self {
        Self {
            fail_validate_at: Some(n),
            ..Self::new()
        }
    }
}

struct StubEngine {
    config: Config,
    calls: Rc<Calls>,
    fail_validate_at: Option<usize>,
    fail_reset: bool,
}

impl EngineFactory for StubFactory {
    type Engine = StubEngine;

    fn open(&self, config: &Config) -> post_core::Result<StubEngine> {
        config.validate()?;
        self.calls.opened.set(self.calls.opened.get() + 1);
        Ok(StubEngine {
            config: config.clone(),
            calls: Rc::clone(&self.calls),
            fail_validate_at: self.fail_validate_at,
            fail_reset: self.fail_reset,
        })
    }
}

impl StubEngine {
    fn proof(&self, identity: &[u8], challenge: &[u8]) -> Proof {
        Proof {
            identity: identity.to_vec(),
            challenge: challenge.to_vec(),
            commitment: [0; 32],
            total_labels: self.config.total_labels(),
            indices: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl Engine for StubEngine {
    fn initialize(&mut self, identity: &[u8]) -> post_core::Result<Proof> {
        self.calls.identities.borrow_mut().push(identity.to_vec());
        Ok(self.proof(identity, &[]))
    }

    fn validate(&self, _proof: &Proof) -> post_core::Result<()> {
        let n = self.calls.validated.get() + 1;
        self.calls.validated.set(n);
        if self.fail_validate_at == Some(n) {
            return Err(PostError::InvalidProof("stub rejection".to_string()));
        }
        Ok(())
    }

    fn generate_proof(&mut self, identity: &[u8], challenge: &[u8]) -> post_core::Result<Proof> {
        self.calls.identities.borrow_mut().push(identity.to_vec());
        self.calls.challenges.borrow_mut().push(challenge.to_vec());
        Ok(self.proof(identity, challenge))
    }

    fn reset(&mut self, identity: &[u8]) -> post_core::Result<()> {
        self.calls.identities.borrow_mut().push(identity.to_vec());
        self.calls.reset.set(self.calls.reset.get() + 1);
        if self.fail_reset {
            return Err(PostError::InvalidConfig("stub reset failure".to_string()));
        }
        Ok(())
    }

    fn write_parallelism(&self) -> WriteParallelism {
        WriteParallelism {
            files: self.config.max_write_files_parallelism(),
            in_file: self.config.max_write_infile_parallelism(),
        }
    }

    fn read_parallelism(&self, num_files: usize) -> usize {
        self.config.max_read_files_parallelism().min(num_files)
    }
}

fn baseline() -> Config {
    Config::new("/tmp/postbench-stub").with_max_read_files_parallelism(4)
}

fn stub_metadata(
    config: &Config,
    annotations: &ReportAnnotations,
) -> Result<Metadata, BenchError> {
    Ok(Metadata::compose(config, annotations, &host()))
}

fn host() -> SystemInfo {
    SystemInfo {
        os: "linux".to_string(),
        cpu_model: "Stub CPU".to_string(),
        cpu_flags: vec!["fpu".to_string(), "avx2".to_string()],
        physical_cores: 2,
        logical_cpus: 4,
        free_memory: 1 << 30,
    }
}

#[test]
fn test_stub_pipeline_rows() {
    let cases = sweep::generate(BenchMode::Full, &baseline(), 4);
    let factory = StubFactory::new();
    let calls = Rc::clone(&factory.calls);

    let rows = BenchRunner::new(factory).run(&cases).unwrap();

    assert_eq!(rows.len(), cases.len());
    assert_eq!(calls.opened.get(), cases.len());
    assert_eq!(calls.validated.get(), 2 * cases.len());
    assert_eq!(calls.reset.get(), cases.len());

    for (row, cfg) in rows.iter().zip(&cases) {
        let expected = num_files(cfg.space_per_unit(), cfg.file_size()).unwrap();
        assert_eq!(row.num_files, expected);
        assert_eq!(row.write_files_parallelism, cfg.max_write_files_parallelism());
        assert_eq!(row.write_infile_parallelism, cfg.max_write_infile_parallelism());
        assert_eq!(row.read_parallelism, 4.min(expected));
        // Rounded to whole milliseconds and microseconds
        assert_eq!(row.init.subsec_nanos() % 1_000_000, 0);
        assert_eq!(row.proof.subsec_nanos() % 1_000_000, 0);
        assert_eq!(row.init_validation.subsec_nanos() % 1_000, 0);
        assert_eq!(row.proof_validation.subsec_nanos() % 1_000, 0);
    }
}

#[test]
fn test_validation_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    let mut config = BenchConfig::new(baseline(), BenchMode::Mid);
    config.report_path = dir.path().join("report.csv");

    let cases = sweep::generate(config.mode, &config.base, 4);
    assert!(cases.len() > 1);
    let factory = StubFactory::failing_validate_at(2);
    let calls = Rc::clone(&factory.calls);
    let runner = BenchRunner::new(factory);

    let mut console = Vec::new();
    let err = run_and_publish(&runner, &config, &cases, &mut console, stub_metadata).unwrap_err();

    match err.downcast::<BenchError>().unwrap() {
        BenchError::Phase {
            case,
            total,
            phase,
            source,
        } => {
            assert_eq!(case, 1);
            assert_eq!(total, cases.len());
            assert_eq!(phase, Phase::ValidateProof);
            assert!(matches!(source, PostError::InvalidProof(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.opened.get(), 1);
    // The failed case still cleans up after itself
    assert_eq!(calls.reset.get(), 1);
    assert!(console.is_empty());
    assert!(!config.report_path.exists());
}

#[test]
fn test_successful_run_publishes_report() {
    let dir = TempDir::new().unwrap();
    let mut config = BenchConfig::new(baseline(), BenchMode::Mid);
    config.report_path = dir.path().join("report.csv");

    let cases = sweep::generate(config.mode, &config.base, 2);
    let runner = BenchRunner::new(StubFactory::new());

    let mut console = Vec::new();
    let rows = run_and_publish(&runner, &config, &cases, &mut console, stub_metadata).unwrap();

    assert_eq!(rows.len(), cases.len());
    assert!(String::from_utf8(console).unwrap().contains("- Results -"));
    let csv_text = std::fs::read_to_string(&config.report_path).unwrap();
    assert_eq!(csv_text.lines().count(), 4 + rows.len());
}

#[test]
fn test_failed_reset_keeps_phase_error() {
    let factory = StubFactory {
        fail_reset: true,
        ..StubFactory::failing_validate_at(1)
    };
    let calls = Rc::clone(&factory.calls);

    let err = BenchRunner::new(factory).run(&[baseline()]).unwrap_err();

    assert!(matches!(
        err,
        BenchError::Phase {
            phase: Phase::ValidateInit,
            source: PostError::InvalidProof(_),
            ..
        }
    ));
    assert_eq!(calls.reset.get(), 1);
}

#[test]
fn test_default_identity_and_challenge() {
    let factory = StubFactory::new();
    let calls = Rc::clone(&factory.calls);

    BenchRunner::new(factory).run(&[baseline(), baseline()]).unwrap();

    assert_eq!(calls.identities.borrow().len(), 6);
    assert!(calls.identities.borrow().iter().all(|id| id == &DEFAULT_IDENTITY));
    assert_eq!(*calls.challenges.borrow(), vec![DEFAULT_CHALLENGE.to_vec(); 2]);
}

#[test]
fn test_with_identity_overrides_defaults() {
    let factory = StubFactory::new();
    let calls = Rc::clone(&factory.calls);

    BenchRunner::new(factory)
        .with_identity(b"node-7", b"epoch 42")
        .run(&[baseline()])
        .unwrap();

    assert!(calls.identities.borrow().iter().all(|id| id == b"node-7"));
    assert_eq!(*calls.challenges.borrow(), vec![b"epoch 42".to_vec()]);
}

#[test]
fn test_invalid_case_config_aborts_at_open() {
    // File size larger than the space: rejected before any phase runs
    let cases = vec![baseline(), baseline().with_file_size(1 << 24)];
    let factory = StubFactory::new();
    let calls = Rc::clone(&factory.calls);

    let err = BenchRunner::new(factory).run(&cases).unwrap_err();

    assert!(matches!(
        err,
        BenchError::Phase {
            case: 2,
            phase: Phase::Open,
            source: PostError::InvalidConfig(_),
            ..
        }
    ));
    assert_eq!(calls.opened.get(), 1);
}

#[test]
fn test_csv_report_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.csv");

    let cases = sweep::generate(BenchMode::Mid, &baseline(), 2);
    let rows = BenchRunner::new(StubFactory::new()).run(&cases).unwrap();
    let annotations = ReportAnnotations {
        description: "stub, run".to_string(),
        ..ReportAnnotations::default()
    };
    let metadata = Metadata::compose(&baseline(), &annotations, &host());

    let mut console = Vec::new();
    publish(&mut console, &path, &metadata, &rows).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .unwrap();
    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();

    assert_eq!(records.len(), 4 + rows.len());
    assert_eq!(records[0].iter().collect::<Vec<_>>(), metadata.keys().collect::<Vec<_>>());
    assert_eq!(records[1].iter().collect::<Vec<_>>(), metadata.values().collect::<Vec<_>>());
    assert_eq!(&records[1][0], "stub, run");
    assert_eq!(records[2].len(), 1);
    assert_eq!(&records[2][0], "");
    assert_eq!(records[3].iter().collect::<Vec<_>>(), RESULT_HEADER.to_vec());
    for (record, row) in records[4..].iter().zip(&rows) {
        assert_eq!(record.iter().collect::<Vec<_>>(), row.to_record());
    }
}

#[test]
fn test_empty_annotations_omitted_from_outputs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.csv");

    let rows = BenchRunner::new(StubFactory::new())
        .run(&[baseline()])
        .unwrap();
    let metadata = Metadata::compose(&baseline(), &ReportAnnotations::default(), &host());

    let mut console = Vec::new();
    publish(&mut console, &path, &metadata, &rows).unwrap();
    let console = String::from_utf8(console).unwrap();
    let csv_text = std::fs::read_to_string(&path).unwrap();

    for key in ["DESC", "DISK", "FS"] {
        assert!(!console.contains(&format!("{key}:")), "{key} in console output");
        let header_row = csv_text.lines().next().unwrap();
        assert!(!header_row.split(',').any(|k| k == key), "{key} in CSV");
    }
    assert!(console.contains("CPU_MODEL: Stub CPU"));
    assert!(!console.contains("CPU_FLAGS"));
    assert!(csv_text.contains("fpu avx2"));
}

#[test]
fn test_single_case_against_disk_engine() {
    let dir = TempDir::new().unwrap();
    let base = Config::new(dir.path())
        .with_space_per_unit(1 << 18)
        .with_file_size(1 << 16)
        .with_max_write_files_parallelism(2)
        .with_max_read_files_parallelism(8);

    let cases = sweep::generate(BenchMode::Single, &base, 4);
    let rows = BenchRunner::new(DiskEngineFactory::with_logical_cpus(4))
        .run(&cases)
        .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.num_files, 4);
    assert_eq!(row.write_files_parallelism, 2);
    assert_eq!(row.write_infile_parallelism, 1);
    assert_eq!(row.read_parallelism, 4);

    // Reset leaves nothing behind for the identity
    let leftover = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftover, 0);
}
