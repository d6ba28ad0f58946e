use chrono::{DateTime, Utc};
use std::fs;

/// Seconds since the POSIX epoch with microsecond fraction,
/// e.g. `1700000000.123456`.
pub fn posix_epoch() -> String {
    epoch_string(Utc::now())
}

fn epoch_string(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Name of the platform the run executes on.
///
/// `VMPLATNAME` wins; otherwise the kernel version string, falling back to
/// the OS name where the kernel does not expose one.
pub fn platform() -> String {
    platform_from(std::env::var("VMPLATNAME").ok())
}

fn platform_from(vm_name: Option<String>) -> String {
    if let Some(name) = vm_name {
        return name;
    }
    fs::read_to_string("/proc/sys/kernel/version")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| std::env::consts::OS.to_string())
}
