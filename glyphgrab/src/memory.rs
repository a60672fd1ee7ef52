//! Free physical memory probing.
//!
//! The scale planner asks a [`MemoryProbe`] how much memory it may spend on an
//! upscaled raster. [`SystemMemoryProbe`] names the probe for the platform this
//! crate was built for (`/proc/meminfo` on Linux, `GlobalMemoryStatusEx` on
//! Windows); other platforms answer `None`, which disables upscaling.

/// Source of the host's currently available physical memory.
pub trait MemoryProbe: Send + Sync {
    /// Bytes of memory that are free or reclaimable right now, or `None` if
    /// the platform cannot tell.
    fn available_bytes(&self) -> Option<u64>;
}

#[cfg(target_os = "linux")]
pub type SystemMemoryProbe = MeminfoProbe;

#[cfg(windows)]
pub type SystemMemoryProbe = GlobalMemoryProbe;

#[cfg(not(any(target_os = "linux", windows)))]
pub type SystemMemoryProbe = UnsupportedMemoryProbe;

/// Reads `/proc/meminfo`, counting free pages plus buffers and page cache,
/// since the kernel reclaims those under pressure.
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct MeminfoProbe;

#[cfg(target_os = "linux")]
impl MemoryProbe for MeminfoProbe {
    fn available_bytes(&self) -> Option<u64> {
        match std::fs::read_to_string("/proc/meminfo") {
            Ok(contents) => parse_meminfo(&contents),
            Err(e) => {
                tracing::debug!(error = %e, "Cannot read /proc/meminfo");
                None
            }
        }
    }
}

/// Asks `GlobalMemoryStatusEx` for the available physical memory.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalMemoryProbe;

#[cfg(windows)]
impl MemoryProbe for GlobalMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        use windows_sys::Win32::System::SystemInformation::{
            GlobalMemoryStatusEx, MEMORYSTATUSEX,
        };

        // SAFETY: MEMORYSTATUSEX is plain old data; all-zero is a valid value.
        let mut status: MEMORYSTATUSEX = unsafe { std::mem::zeroed() };
        status.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;

        // SAFETY: `status` is a live, writable MEMORYSTATUSEX with `dwLength` set.
        if unsafe { GlobalMemoryStatusEx(&mut status) } == 0 {
            tracing::debug!("GlobalMemoryStatusEx failed");
            return None;
        }
        Some(status.ullAvailPhys)
    }
}

/// Sum `MemFree`, `Buffers` and `Cached` from a `/proc/meminfo` dump, in bytes.
///
/// Returns `None` when none of those keys are present.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn parse_meminfo(contents: &str) -> Option<u64> {
    let mut found = false;
    let mut total_kb: u64 = 0;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        if !matches!(key, "MemFree:" | "Buffers:" | "Cached:") {
            continue;
        }
        found = true;
        let kb = fields
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        total_kb = total_kb.saturating_add(kb);
    }

    found.then(|| total_kb.saturating_mul(1024))
}

/// Probe for platforms without a memory query; always unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedMemoryProbe;

impl MemoryProbe for UnsupportedMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        None
    }
}

/// Probe that reports a fixed amount of memory.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub u64);

impl MemoryProbe for FixedMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}
