//! CPU profiling and memory snapshots.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Sampling frequency of the CPU profiler, in Hz.
pub const PROFILE_FREQUENCY: i32 = 997;

/// A running CPU profiler.
///
/// The output file is created up front so a bad path fails before the sweep
/// starts. [`CpuProfiler::finish`] writes a flamegraph when the path ends in
/// `.svg` and a pprof protobuf otherwise.
#[cfg(unix)]
pub struct CpuProfiler {
    guard: pprof::ProfilerGuard<'static>,
    file: std::fs::File,
    path: std::path::PathBuf,
}

#[cfg(unix)]
impl CpuProfiler {
    pub fn start(path: &Path) -> Result<Self> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create CPU profile: {}", path.display()))?;

        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(PROFILE_FREQUENCY)
            .blocklist(&["libc", "libgcc", "pthread", "vdso"])
            .build()
            .context("Failed to start CPU profiler")?;

        tracing::debug!("Started CPU profiler, writing to {}", path.display());
        Ok(Self {
            guard,
            file,
            path: path.to_path_buf(),
        })
    }

    /// Stop sampling and write the profile.
    pub fn finish(self) -> Result<()> {
        use std::io::Write;

        let report = self
            .guard
            .report()
            .build()
            .context("Failed to build profiler report")?;

        let total_samples: isize = report.data.values().copied().sum();
        if total_samples == 0 {
            tracing::warn!("No profiler samples collected for {}", self.path.display());
        }

        let mut file = self.file;
        if is_svg(&self.path) {
            report
                .flamegraph(&mut file)
                .context("Failed to write flamegraph SVG")?;
        } else {
            use pprof::protos::Message;

            let profile = report.pprof().context("Failed to encode pprof profile")?;
            let mut content = Vec::new();
            profile
                .encode(&mut content)
                .context("Failed to encode pprof profile")?;
            file.write_all(&content)
                .with_context(|| format!("Failed to write CPU profile: {}", self.path.display()))?;
        }

        tracing::info!("CPU profile written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(not(unix))]
pub struct CpuProfiler;

#[cfg(not(unix))]
impl CpuProfiler {
    pub fn start(_path: &Path) -> Result<Self> {
        anyhow::bail!("CPU profiling is only supported on unix platforms")
    }

    pub fn finish(self) -> Result<()> {
        Ok(())
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
fn is_svg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// Memory usage of this process at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub pid: u32,
    /// Resident set size in bytes.
    pub resident_bytes: u64,
    /// Virtual memory size in bytes.
    pub virtual_bytes: u64,
}

impl MemorySnapshot {
    pub fn capture() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow::anyhow!("{e}"))?;

        let mut sys = sysinfo::System::new();
        sys.refresh_process(pid);
        let process = sys
            .process(pid)
            .context("Current process not visible to sysinfo")?;

        Ok(Self {
            pid: pid.as_u32(),
            resident_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }
}

/// Capture a [`MemorySnapshot`] and write it to `path` as JSON.
pub fn write_memory_snapshot(path: &Path) -> Result<()> {
    let snapshot = MemorySnapshot::capture()?;
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize memory snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write memory profile: {}", path.display()))?;
    tracing::info!("Memory snapshot written to {}", path.display());
    Ok(())
}
