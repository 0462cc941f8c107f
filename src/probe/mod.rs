//! Resolves the target workload's cgroup, configures the kernel-side filter,
//! and reads back the aggregated read latency stats.

pub mod cgroup;
pub mod proc;

mod stats;

pub use stats::*;

#[cfg(all(target_os = "linux", feature = "bpf"))]
mod bpf;

#[cfg(all(target_os = "linux", feature = "bpf"))]
pub use bpf::{Probe, ReadLatencyStats};

use std::path::PathBuf;

/// Errors produced while resolving a process name to a cgroup directory. Each
/// variant carries the identifying context so callers can report the failure
/// without retrying internally.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("process not found: comm={comm:?}")]
    ProcessNotFound { comm: String },

    #[error("failed to read cgroup membership for pid {pid}")]
    CgroupUnreadable {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("cgroup v2 entry not found in /proc/{pid}/cgroup")]
    CgroupRecordMissing { pid: u32 },

    #[error("cgroup2 mount not found")]
    MountNotFound,

    #[error("not a valid cgroup directory: {}", .path.display())]
    InvalidCgroupDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
