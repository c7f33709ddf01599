//! Startup probe for optional measurement capabilities.
//!
//! The probe runs once; the resulting [`Capabilities`] value is handed to the
//! clock and sampler instead of re-checking at every call site.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// A monotonic high-resolution counter is usable.
    pub has_high_res_clock: bool,
    /// Process memory statistics can be read.
    pub has_memory_introspection: bool,
}

impl Capabilities {
    pub fn probe() -> Self {
        let caps = Self {
            has_high_res_clock: probe_high_res_clock(),
            has_memory_introspection: MemorySnapshot::capture_raw().is_some(),
        };
        tracing::debug!(
            high_res_clock = caps.has_high_res_clock,
            memory_introspection = caps.has_memory_introspection,
            "probed measurement capabilities"
        );
        caps
    }

    /// Coarse clock only, no memory snapshots.
    pub fn minimal() -> Self {
        Self {
            has_high_res_clock: false,
            has_memory_introspection: false,
        }
    }

    /// Take a memory snapshot if the capability is present.
    pub fn memory_snapshot(&self) -> Option<MemorySnapshot> {
        if self.has_memory_introspection {
            MemorySnapshot::capture_raw()
        } else {
            None
        }
    }
}

fn probe_high_res_clock() -> bool {
    // Two reads must not go backwards.
    let a = std::time::Instant::now();
    let b = std::time::Instant::now();
    b >= a
}

/// Process memory figures in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub peak_rss_bytes: u64,
}

/// Signed difference between two snapshots (`after - before`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDelta {
    pub rss_bytes: i64,
    pub virtual_bytes: i64,
    pub peak_rss_bytes: i64,
}

impl MemorySnapshot {
    #[cfg(target_os = "linux")]
    fn capture_raw() -> Option<Self> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_proc_status(&status)
    }

    #[cfg(not(target_os = "linux"))]
    fn capture_raw() -> Option<Self> {
        None
    }

    pub fn delta_to(&self, after: &MemorySnapshot) -> MemoryDelta {
        MemoryDelta {
            rss_bytes: signed_diff(after.rss_bytes, self.rss_bytes),
            virtual_bytes: signed_diff(after.virtual_bytes, self.virtual_bytes),
            peak_rss_bytes: signed_diff(after.peak_rss_bytes, self.peak_rss_bytes),
        }
    }
}

fn signed_diff(after: u64, before: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map_or(i64::MIN, |d| -d)
    }
}

/// Parse `VmRSS`, `VmSize` and `VmHWM` (kB) out of `/proc/<pid>/status`.
pub(crate) fn parse_proc_status(status: &str) -> Option<MemorySnapshot> {
    let field = |key: &str| -> Option<u64> {
        status
            .lines()
            .find(|l| l.starts_with(key))
            .and_then(|l| l[key.len()..].split_whitespace().next())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    let rss = field("VmRSS:")?;
    Some(MemorySnapshot {
        rss_bytes: rss,
        virtual_bytes: field("VmSize:").unwrap_or(0),
        peak_rss_bytes: field("VmHWM:").unwrap_or(rss),
    })
}
