//! Benchmark case generation.
//!
//! `Single` runs the baseline as given. `Mid` and `Full` start from a derived
//! baseline (one file spanning the whole space, write parallelism forced to 1)
//! and walk four independent axes, each variant derived from that same
//! baseline:
//!
//! 1. in-file parallelism `i` for `i in 1..=P` (P = logical CPUs)
//! 2. file size `>> i` for `i in 1..=6`
//! 3. file size `>> i` and files parallelism `1 << i` for `i in 1..=6`
//! 4. file size `>> i`, files and in-file parallelism `1 << i` for `i in 1..=4`
//!
//! `Full` emits every step; `Mid` emits the first step and the last (the
//! second for axis 4). Shifts are applied as-is: extreme baselines can yield
//! degenerate configs, which the engine rejects when the case runs.

use crate::config::BenchMode;
use post_core::Config;

const FILE_SPLIT_STEPS: usize = 6;
const COMBINED_STEPS: usize = 4;
/// Last combined step `Mid` still emits.
const COMBINED_MID_LAST: usize = 2;

/// Expand `baseline` into the ordered case list for `mode`.
///
/// A `logical_cpus` of 0 is treated as 1.
pub fn generate(mode: BenchMode, baseline: &Config, logical_cpus: usize) -> Vec<Config> {
    if mode == BenchMode::Single {
        return vec![baseline.clone()];
    }
    let logical_cpus = logical_cpus.max(1);

    let def = baseline
        .clone()
        .with_file_size(baseline.space_per_unit())
        .with_max_write_files_parallelism(1)
        .with_max_write_infile_parallelism(1);

    let mut cases = Vec::new();

    // Various in-file parallelism degrees
    cases.extend(
        select(mode, logical_cpus, logical_cpus)
            .map(|i| def.clone().with_max_write_infile_parallelism(i)),
    );

    // Split to files without files parallelism
    cases.extend(
        select(mode, FILE_SPLIT_STEPS, FILE_SPLIT_STEPS)
            .map(|i| def.clone().with_file_size(def.file_size() >> i)),
    );

    // Split to files with files parallelism
    cases.extend(select(mode, FILE_SPLIT_STEPS, FILE_SPLIT_STEPS).map(|i| {
        def.clone()
            .with_file_size(def.file_size() >> i)
            .with_max_write_files_parallelism(def.max_write_files_parallelism() << i)
    }));

    // Split to files with files and in-file parallelism
    cases.extend(select(mode, COMBINED_STEPS, COMBINED_MID_LAST).map(|i| {
        def.clone()
            .with_file_size(def.file_size() >> i)
            .with_max_write_files_parallelism(def.max_write_files_parallelism() << i)
            .with_max_write_infile_parallelism(def.max_write_infile_parallelism() << i)
    }));

    cases
}

/// [`generate`] sized to this host's logical CPU count.
pub fn generate_for_host(mode: BenchMode, baseline: &Config) -> Vec<Config> {
    generate(mode, baseline, logical_cpus())
}

/// Logical CPUs available to this process.
pub fn logical_cpus() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Steps `1..=max` to emit: all of them for `Full`, `1` and `mid_last` for `Mid`.
fn select(mode: BenchMode, max: usize, mid_last: usize) -> impl Iterator<Item = usize> {
    (1..=max).filter(move |&i| mode == BenchMode::Full || i == 1 || i == mid_last)
}
