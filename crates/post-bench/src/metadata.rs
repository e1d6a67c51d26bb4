//! Run metadata: the configuration and host facts a report is tagged with.

use crate::config::ReportAnnotations;
use crate::error::BenchError;
use crate::results::format_size;
use post_core::Config;
use sysinfo::System;

/// Key whose value is left out of the console listing.
pub const CPU_FLAGS_KEY: &str = "CPU_FLAGS";

/// Ordered `(key, value)` pairs describing a run.
///
/// Insertion order is the report order, so this is a plain vector rather
/// than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Append a pair unless `value` is empty.
    fn push_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Value of the first pair with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the report metadata from a config, its annotations and a host probe.
    ///
    /// Empty annotations are skipped. The remaining keys always appear, in
    /// this order: `DESC`, `DATADIR`, `SPACE`, `DISK`, `FS`, `OS`,
    /// `CPU_MODEL`, `CPU_FLAGS`, `CPU_CORES`, `CPU_LOGICAL`, `MEM_FREE`.
    pub fn compose(config: &Config, annotations: &ReportAnnotations, host: &SystemInfo) -> Self {
        let mut m = Self::new();

        m.push_non_empty("DESC", &annotations.description);
        m.push("DATADIR", config.data_dir().display().to_string());
        m.push("SPACE", format_size(config.space_per_unit()));
        m.push_non_empty("DISK", &annotations.disk_type);
        m.push_non_empty("FS", &annotations.fs_type);

        m.push("OS", host.os.as_str());
        m.push("CPU_MODEL", host.cpu_model.as_str());
        m.push(CPU_FLAGS_KEY, host.cpu_flags.join(" "));
        m.push("CPU_CORES", host.physical_cores.to_string());
        m.push("CPU_LOGICAL", host.logical_cpus.to_string());
        m.push("MEM_FREE", format_size(host.free_memory));

        m
    }
}

/// Host facts recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub os: String,
    pub cpu_model: String,
    pub cpu_flags: Vec<String>,
    pub physical_cores: usize,
    pub logical_cpus: usize,
    /// Free memory in bytes.
    pub free_memory: u64,
}

impl SystemInfo {
    /// Probe the current host.
    pub fn probe() -> Result<Self, BenchError> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let cpu_model = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .ok_or_else(|| BenchError::SystemInfo("no CPU reported".to_string()))?;

        let physical_cores = sys.physical_core_count().ok_or_else(|| {
            BenchError::SystemInfo("physical core count unavailable".to_string())
        })?;

        let info = Self {
            os: std::env::consts::OS.to_string(),
            cpu_model,
            cpu_flags: cpu_flags()?,
            physical_cores,
            logical_cpus: crate::sweep::logical_cpus(),
            free_memory: sys.free_memory(),
        };
        tracing::debug!("Probed host: {:?}", info);
        Ok(info)
    }
}

/// Collect the report metadata for `config`.
pub fn collect(config: &Config, annotations: &ReportAnnotations) -> Result<Metadata, BenchError> {
    let host = SystemInfo::probe()?;
    Ok(Metadata::compose(config, annotations, &host))
}

#[cfg(target_os = "linux")]
fn cpu_flags() -> Result<Vec<String>, BenchError> {
    const CPUINFO: &str = "/proc/cpuinfo";

    let text = std::fs::read_to_string(CPUINFO).map_err(|source| BenchError::SystemFile {
        path: CPUINFO.into(),
        source,
    })?;
    Ok(parse_cpu_flags(&text))
}

#[cfg(not(target_os = "linux"))]
fn cpu_flags() -> Result<Vec<String>, BenchError> {
    Ok(Vec::new())
}

/// Flags of the first CPU listed in `/proc/cpuinfo` text.
///
/// x86 names the line `flags`, ARM names it `Features`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_flags(cpuinfo: &str) -> Vec<String> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| matches!(key.trim(), "flags" | "Features"))
        .map(|(_, value)| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
