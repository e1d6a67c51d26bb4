//! Reference engine storing labels in plain files.
//!
//! Layout under `<data_dir>/<hex(identity)>/`:
//!
//! ```text
//! postdata_0.bin ... postdata_<n-1>.bin   consecutive labels, file_size bytes each
//! postdata_metadata.json                  commitment and layout, written last
//! ```
//!
//! Initialization writes files with up to `files` workers, each filling its
//! file in batches split across `in_file` workers. Proof generation re-reads
//! every file with up to `read` workers and recomputes the commitment before
//! sampling labels, so its cost scales with the stored space.

use crate::config::Config;
use crate::engine::{validate_proof, Engine, EngineFactory, Proof, WriteParallelism};
use crate::error::{PostError, Result};
use crate::label::{derive_indices, fill_labels_parallel, Label, LABEL_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// Labels generated per in-file worker per batch (1 MiB of data).
const BATCH_LABELS_PER_WORKER: usize = 1 << 15;

/// Read buffer size used while hashing files.
const READ_BUFFER_SIZE: usize = 1 << 20;

const METADATA_FILE: &str = "postdata_metadata.json";

/// Persisted description of an initialized space.
#[derive(Debug, Serialize, Deserialize)]
struct SpaceMetadata {
    identity: String,
    num_files: usize,
    file_size: u64,
    total_labels: u64,
    commitment: String,
}

/// Creates [`DiskEngine`]s.
#[derive(Debug, Clone, Copy)]
pub struct DiskEngineFactory {
    logical_cpus: usize,
}

impl Default for DiskEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskEngineFactory {
    /// Factory sized to the host's logical CPU count.
    pub fn new() -> Self {
        let logical_cpus = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::with_logical_cpus(logical_cpus)
    }

    /// Factory that assumes `logical_cpus` CPUs when resolving in-file parallelism.
    pub fn with_logical_cpus(logical_cpus: usize) -> Self {
        Self {
            logical_cpus: logical_cpus.max(1),
        }
    }
}

impl EngineFactory for DiskEngineFactory {
    type Engine = DiskEngine;

    fn open(&self, config: &Config) -> Result<DiskEngine> {
        DiskEngine::new(config.clone(), self.logical_cpus)
    }
}

/// File-backed proof-of-space engine.
#[derive(Debug)]
pub struct DiskEngine {
    config: Config,
    num_files: usize,
    logical_cpus: usize,
}

impl DiskEngine {
    /// Create an engine for a validated config.
    pub fn new(config: Config, logical_cpus: usize) -> Result<Self> {
        config.validate()?;
        let num_files = config.num_files()?;
        Ok(Self {
            config,
            num_files,
            logical_cpus: logical_cpus.max(1),
        })
    }

    /// Directory holding the space for `identity`.
    pub fn identity_dir(&self, identity: &[u8]) -> PathBuf {
        self.config.data_dir().join(hex::encode(identity))
    }

    fn file_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("postdata_{index}.bin"))
    }

    fn write_files(&self, dir: &Path, identity: &[u8]) -> Result<Vec<[u8; 32]>> {
        let parallelism = self.write_parallelism();
        let labels_per_file = self.config.labels_per_file();
        let num_files = self.num_files;

        let per_worker: Vec<Result<Vec<(usize, [u8; 32])>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..parallelism.files)
                .map(|worker| {
                    s.spawn(move || -> Result<Vec<(usize, [u8; 32])>> {
                        (worker..num_files)
                            .step_by(parallelism.files)
                            .map(|index| {
                                let path = Self::file_path(dir, index);
                                let first_label = index as u64 * labels_per_file;
                                write_label_file(
                                    &path,
                                    identity,
                                    first_label,
                                    labels_per_file,
                                    parallelism.in_file,
                                )
                                .map(|digest| (index, digest))
                            })
                            .collect()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| PostError::WorkerPanicked("writer"))?)
                .collect()
        });

        collect_digests(per_worker, num_files)
    }

    fn hash_files(&self, dir: &Path, workers: usize) -> Result<Vec<[u8; 32]>> {
        let num_files = self.num_files;

        let per_worker: Vec<Result<Vec<(usize, [u8; 32])>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    s.spawn(move || -> Result<Vec<(usize, [u8; 32])>> {
                        (worker..num_files)
                            .step_by(workers)
                            .map(|index| {
                                hash_file(&Self::file_path(dir, index)).map(|digest| (index, digest))
                            })
                            .collect()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| PostError::WorkerPanicked("reader"))?)
                .collect()
        });

        collect_digests(per_worker, num_files)
    }

    fn read_labels(&self, dir: &Path, indices: &[u64]) -> Result<Vec<Label>> {
        let labels_per_file = self.config.labels_per_file();
        indices
            .iter()
            .map(|&index| {
                let file_index = usize::try_from(index / labels_per_file).map_err(|_| {
                    PostError::InvalidProof(format!("label index {index} out of range"))
                })?;
                let offset = (index % labels_per_file) * LABEL_SIZE as u64;
                let path = Self::file_path(dir, file_index);

                let mut file = File::open(&path).map_err(|e| PostError::io(&path, e))?;
                file.seek(SeekFrom::Start(offset))
                    .map_err(|e| PostError::io(&path, e))?;
                let mut label = [0u8; LABEL_SIZE];
                file.read_exact(&mut label)
                    .map_err(|e| PostError::io(&path, e))?;
                Ok(label)
            })
            .collect()
    }

    fn load_metadata(&self, dir: &Path, identity: &[u8]) -> Result<SpaceMetadata> {
        let path = dir.join(METADATA_FILE);
        if !path.exists() {
            return Err(PostError::NotInitialized {
                identity: hex::encode(identity),
                dir: dir.to_path_buf(),
            });
        }
        let raw = fs::read(&path).map_err(|e| PostError::io(&path, e))?;
        let metadata: SpaceMetadata =
            serde_json::from_slice(&raw).map_err(|source| PostError::Metadata {
                path: path.clone(),
                source,
            })?;

        if metadata.identity != hex::encode(identity) {
            return Err(PostError::InvalidConfig(format!(
                "space in {} belongs to identity {}",
                dir.display(),
                metadata.identity
            )));
        }

        if metadata.num_files != self.num_files
            || metadata.file_size != self.config.file_size()
            || metadata.total_labels != self.config.total_labels()
        {
            return Err(PostError::InvalidConfig(format!(
                "space in {} was initialized with {} files of {} bytes, config asks for {} files of {} bytes",
                dir.display(),
                metadata.num_files,
                metadata.file_size,
                self.num_files,
                self.config.file_size()
            )));
        }
        Ok(metadata)
    }

    fn store_metadata(&self, dir: &Path, metadata: &SpaceMetadata) -> Result<()> {
        let path = dir.join(METADATA_FILE);
        let raw = serde_json::to_vec_pretty(metadata).map_err(|source| PostError::Metadata {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, raw).map_err(|e| PostError::io(&path, e))
    }

    fn prove_against(
        &self,
        dir: &Path,
        identity: &[u8],
        challenge: &[u8],
        commitment: [u8; 32],
    ) -> Result<Proof> {
        let total_labels = self.config.total_labels();
        let indices = derive_indices(
            challenge,
            &commitment,
            total_labels,
            self.config.labels_per_proof(),
        );
        let labels = self.read_labels(dir, &indices)?;
        Ok(Proof {
            identity: identity.to_vec(),
            challenge: challenge.to_vec(),
            commitment,
            total_labels,
            indices,
            labels,
        })
    }
}

impl Engine for DiskEngine {
    fn initialize(&mut self, identity: &[u8]) -> Result<Proof> {
        let dir = self.identity_dir(identity);
        fs::create_dir_all(&dir).map_err(|e| PostError::io(&dir, e))?;

        let start = Instant::now();
        let digests = self.write_files(&dir, identity)?;
        let commitment = commit(&digests);

        self.store_metadata(
            &dir,
            &SpaceMetadata {
                identity: hex::encode(identity),
                num_files: self.num_files,
                file_size: self.config.file_size(),
                total_labels: self.config.total_labels(),
                commitment: hex::encode(commitment),
            },
        )?;

        tracing::debug!(
            "Initialized {} files of {} bytes in {:?} ({:?})",
            self.num_files,
            self.config.file_size(),
            start.elapsed(),
            self.write_parallelism()
        );

        self.prove_against(&dir, identity, &[], commitment)
    }

    fn validate(&self, proof: &Proof) -> Result<()> {
        if proof.total_labels != self.config.total_labels() {
            return Err(PostError::InvalidProof(format!(
                "proof covers {} labels, config has {}",
                proof.total_labels,
                self.config.total_labels()
            )));
        }
        validate_proof(proof, self.config.labels_per_proof())
    }

    fn generate_proof(&mut self, identity: &[u8], challenge: &[u8]) -> Result<Proof> {
        let dir = self.identity_dir(identity);
        let metadata = self.load_metadata(&dir, identity)?;

        let start = Instant::now();
        let workers = self.read_parallelism(self.num_files);
        let digests = self.hash_files(&dir, workers)?;
        let commitment = commit(&digests);

        if hex::encode(commitment) != metadata.commitment {
            return Err(PostError::CommitmentMismatch { dir });
        }

        tracing::debug!(
            "Re-read {} files with {} workers in {:?}",
            self.num_files,
            workers,
            start.elapsed()
        );

        self.prove_against(&dir, identity, challenge, commitment)
    }

    fn reset(&mut self, identity: &[u8]) -> Result<()> {
        let dir = self.identity_dir(identity);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| PostError::io(&dir, e))?;
            tracing::debug!("Removed {}", dir.display());
        }
        Ok(())
    }

    fn write_parallelism(&self) -> WriteParallelism {
        let files = self
            .config
            .max_write_files_parallelism()
            .min(self.num_files)
            .max(1);
        let in_file = self
            .config
            .max_write_infile_parallelism()
            .min((self.logical_cpus / files).max(1))
            .max(1);
        WriteParallelism { files, in_file }
    }

    fn read_parallelism(&self, num_files: usize) -> usize {
        self.config
            .max_read_files_parallelism()
            .min(num_files)
            .max(1)
    }
}

/// Write `labels` consecutive labels starting at `first_label` into a new file at `path`.
///
/// Returns the SHA-256 digest of the file contents.
fn write_label_file(
    path: &Path,
    identity: &[u8],
    first_label: u64,
    labels: u64,
    in_file_workers: usize,
) -> Result<[u8; 32]> {
    let file = File::create(path).map_err(|e| PostError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut hasher = Sha256::new();

    let batch_labels = BATCH_LABELS_PER_WORKER * in_file_workers;
    let buffer_labels = usize::try_from(labels).map_or(batch_labels, |n| n.min(batch_labels));
    let mut buffer = vec![0u8; buffer_labels * LABEL_SIZE];

    let mut written = 0u64;
    while written < labels {
        let count = usize::try_from(labels - written).map_or(batch_labels, |left| left.min(batch_labels));
        let batch = &mut buffer[..count * LABEL_SIZE];
        fill_labels_parallel(identity, first_label + written, batch, in_file_workers)?;
        hasher.update(&*batch);
        writer.write_all(batch).map_err(|e| PostError::io(path, e))?;
        written += count as u64;
    }

    let file = writer
        .into_inner()
        .map_err(|e| PostError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| PostError::io(path, e))?;

    Ok(hasher.finalize().into())
}

/// SHA-256 digest of the file at `path`.
fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let mut file = File::open(path).map_err(|e| PostError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buffer).map_err(|e| PostError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Commitment over per-file digests, in file order.
fn commit(digests: &[[u8; 32]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for digest in digests {
        hasher.update(digest);
    }
    hasher.finalize().into()
}

fn collect_digests(
    per_worker: Vec<Result<Vec<(usize, [u8; 32])>>>,
    num_files: usize,
) -> Result<Vec<[u8; 32]>> {
    let mut digests = vec![[0u8; 32]; num_files];
    for batch in per_worker {
        for (index, digest) in batch? {
            digests[index] = digest;
        }
    }
    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: Config, cpus: usize) -> DiskEngine {
        DiskEngine::new(config, cpus).unwrap()
    }

    #[test]
    fn test_write_parallelism_clamped_to_file_count() {
        let cfg = Config::new("/tmp/unused").with_max_write_files_parallelism(8);
        // Single file: only one file worker can ever be busy
        assert_eq!(
            engine(cfg.clone(), 8).write_parallelism(),
            WriteParallelism { files: 1, in_file: 1 }
        );

        let split = cfg.with_file_size(1 << 20);
        assert_eq!(engine(split, 8).write_parallelism().files, 8);
    }

    #[test]
    fn test_in_file_parallelism_shares_cpus() {
        let cfg = Config::new("/tmp/unused")
            .with_file_size(1 << 21)
            .with_max_write_files_parallelism(2)
            .with_max_write_infile_parallelism(8);
        assert_eq!(
            engine(cfg, 8).write_parallelism(),
            WriteParallelism { files: 2, in_file: 4 }
        );
    }

    #[test]
    fn test_read_parallelism() {
        let cfg = Config::new("/tmp/unused").with_max_read_files_parallelism(4);
        let engine = engine(cfg, 4);
        assert_eq!(engine.read_parallelism(1), 1);
        assert_eq!(engine.read_parallelism(16), 4);
        assert_eq!(engine.read_parallelism(0), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = Config::new("/tmp/unused").with_file_size(0);
        assert!(matches!(
            DiskEngine::new(cfg, 1),
            Err(PostError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_commit_depends_on_order() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(commit(&[a, b]), commit(&[b, a]));
    }
}
