//! Storage engine contract.
//!
//! The benchmark driver only talks to engines through [`EngineFactory`] and
//! [`Engine`]. An engine owns its internal parallelism; the driver requests
//! caps through [`Config`] and reads back the degrees actually used.

pub mod disk;
mod validate;

pub use validate::validate_proof;

use crate::config::Config;
use crate::error::Result;
use crate::label::Label;

/// Proof artifact produced by initialization and by proof generation.
///
/// An initialization proof carries an empty challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Identity the space was initialized for.
    pub identity: Vec<u8>,
    /// Challenge the proof answers.
    pub challenge: Vec<u8>,
    /// Commitment over all stored labels.
    pub commitment: [u8; 32],
    /// Total number of labels in the space.
    pub total_labels: u64,
    /// Sampled label indices, derived from challenge and commitment.
    pub indices: Vec<u64>,
    /// Labels at `indices`, as read back from storage.
    pub labels: Vec<Label>,
}

/// Write parallelism an engine resolved from its config caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteParallelism {
    /// Files written concurrently.
    pub files: usize,
    /// Workers per file.
    pub in_file: usize,
}

/// One engine life-cycle bound to a single [`Config`].
pub trait Engine {
    /// Build the on-disk space for `identity`.
    fn initialize(&mut self, identity: &[u8]) -> Result<Proof>;

    /// Validate a proof produced by [`Engine::initialize`] or [`Engine::generate_proof`].
    fn validate(&self, proof: &Proof) -> Result<()>;

    /// Answer `challenge` against the space initialized for `identity`.
    fn generate_proof(&mut self, identity: &[u8], challenge: &[u8]) -> Result<Proof>;

    /// Tear down the space for `identity`.
    fn reset(&mut self, identity: &[u8]) -> Result<()>;

    /// Write parallelism used by [`Engine::initialize`].
    fn write_parallelism(&self) -> WriteParallelism;

    /// Read parallelism used by [`Engine::generate_proof`] over `num_files` files.
    fn read_parallelism(&self, num_files: usize) -> usize;
}

/// Creates an [`Engine`] for a config.
pub trait EngineFactory {
    type Engine: Engine;

    fn open(&self, config: &Config) -> Result<Self::Engine>;
}
