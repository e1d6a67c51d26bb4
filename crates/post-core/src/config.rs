//! Engine configuration.
//!
//! A [`Config`] is a value object: every variant is derived from an existing
//! one through the `with_*` methods, which consume a copy and return a new
//! config. Nothing mutates a config once it has been handed out.

use crate::error::{PostError, Result};
use crate::label::LABEL_SIZE;
use std::path::{Path, PathBuf};

/// Default space per unit (8 MiB).
pub const DEFAULT_SPACE_PER_UNIT: u64 = 1 << 23;

/// Default file size (8 MiB, a single file per unit).
pub const DEFAULT_FILE_SIZE: u64 = 1 << 23;

/// Default number of labels sampled into a proof.
pub const DEFAULT_LABELS_PER_PROOF: usize = 16;

/// Parameter set for one engine life-cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    data_dir: PathBuf,
    space_per_unit: u64,
    file_size: u64,
    max_write_files_parallelism: usize,
    max_write_infile_parallelism: usize,
    max_read_files_parallelism: usize,
    labels_per_proof: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

impl Config {
    /// Create a config rooted at `data_dir` with default sizes and parallelism.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            space_per_unit: DEFAULT_SPACE_PER_UNIT,
            file_size: DEFAULT_FILE_SIZE,
            max_write_files_parallelism: 1,
            max_write_infile_parallelism: 1,
            max_read_files_parallelism: 1,
            labels_per_proof: DEFAULT_LABELS_PER_PROOF,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn space_per_unit(&self) -> u64 {
        self.space_per_unit
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn max_write_files_parallelism(&self) -> usize {
        self.max_write_files_parallelism
    }

    pub fn max_write_infile_parallelism(&self) -> usize {
        self.max_write_infile_parallelism
    }

    pub fn max_read_files_parallelism(&self) -> usize {
        self.max_read_files_parallelism
    }

    pub fn labels_per_proof(&self) -> usize {
        self.labels_per_proof
    }

    #[must_use]
    pub fn with_data_dir(self, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_space_per_unit(self, space_per_unit: u64) -> Self {
        Self {
            space_per_unit,
            ..self
        }
    }

    #[must_use]
    pub fn with_file_size(self, file_size: u64) -> Self {
        Self { file_size, ..self }
    }

    #[must_use]
    pub fn with_max_write_files_parallelism(self, degree: usize) -> Self {
        Self {
            max_write_files_parallelism: degree,
            ..self
        }
    }

    #[must_use]
    pub fn with_max_write_infile_parallelism(self, degree: usize) -> Self {
        Self {
            max_write_infile_parallelism: degree,
            ..self
        }
    }

    #[must_use]
    pub fn with_max_read_files_parallelism(self, degree: usize) -> Self {
        Self {
            max_read_files_parallelism: degree,
            ..self
        }
    }

    #[must_use]
    pub fn with_labels_per_proof(self, labels_per_proof: usize) -> Self {
        Self {
            labels_per_proof,
            ..self
        }
    }

    /// Number of files the space is split into.
    pub fn num_files(&self) -> Result<usize> {
        num_files(self.space_per_unit, self.file_size)
    }

    /// Number of labels stored in each file.
    pub fn labels_per_file(&self) -> u64 {
        self.file_size / LABEL_SIZE as u64
    }

    /// Total number of labels across all files.
    pub fn total_labels(&self) -> u64 {
        self.space_per_unit / LABEL_SIZE as u64
    }

    /// Check every invariant an engine relies on.
    pub fn validate(&self) -> Result<()> {
        self.num_files()?;

        if self.file_size % LABEL_SIZE as u64 != 0 {
            return Err(PostError::InvalidConfig(format!(
                "file size {} is not a multiple of the {LABEL_SIZE}-byte label size",
                self.file_size
            )));
        }

        for (name, degree) in [
            ("write-files parallelism", self.max_write_files_parallelism),
            ("write-in-file parallelism", self.max_write_infile_parallelism),
            ("read-files parallelism", self.max_read_files_parallelism),
        ] {
            if degree == 0 {
                return Err(PostError::InvalidConfig(format!(
                    "max {name} must be at least 1"
                )));
            }
        }

        if self.labels_per_proof == 0 {
            return Err(PostError::InvalidConfig(
                "labels per proof must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Number of files a space of `space_per_unit` bytes splits into at `file_size` bytes per file.
///
/// Fails unless both sizes are positive and `file_size` divides `space_per_unit`.
pub fn num_files(space_per_unit: u64, file_size: u64) -> Result<usize> {
    if space_per_unit == 0 {
        return Err(PostError::InvalidConfig(
            "space per unit must be positive".to_string(),
        ));
    }
    if file_size == 0 {
        return Err(PostError::InvalidConfig("file size must be positive".to_string()));
    }
    if file_size > space_per_unit {
        return Err(PostError::InvalidConfig(format!(
            "file size {file_size} exceeds space per unit {space_per_unit}"
        )));
    }
    if space_per_unit % file_size != 0 {
        return Err(PostError::InvalidConfig(format!(
            "space per unit {space_per_unit} is not a multiple of file size {file_size}"
        )));
    }

    usize::try_from(space_per_unit / file_size)
        .map_err(|_| PostError::InvalidConfig("file count exceeds platform limits".to_string()))
}

/// Default data directory: `<platform data dir>/postbench`, or `./postdata`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| PathBuf::from("postdata"), |d| d.join("postbench"))
}
