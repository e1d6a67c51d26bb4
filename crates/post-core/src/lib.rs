//! Proof-of-space building blocks shared by the benchmark driver.
//!
//! - [`Config`]: immutable parameter set for one engine life-cycle
//! - [`Engine`] / [`EngineFactory`]: the narrow contract a storage engine exposes
//! - [`DiskEngine`]: reference engine that lays labels out in files on disk

pub mod config;
pub mod engine;
pub mod error;
pub mod label;

pub use config::{num_files, Config};
pub use engine::disk::{DiskEngine, DiskEngineFactory};
pub use engine::{Engine, EngineFactory, Proof, WriteParallelism};
pub use error::{PostError, Result};
