//! Device pseudonymization for license holders.
//!
//! Hardware identifiers are read through [`SystemInfo`] and only ever leave
//! this module as a keyed hash. [`DeviceReport`] is what a client may send
//! to a server; it carries no raw serial numbers.

use crate::error::LicenseResult;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use licensecore_crypto::keyed_hash;
use serde::{Deserialize, Serialize};
use std::env;

/// Model substrings that indicate a hypervisor guest.
const VM_MARKERS: [&str; 6] = ["vmware", "virtual", "box", "qemu", "xen", "hyper-v"];

const UNKNOWN: &str = "unknown";

/// Source of hardware identifiers.
pub trait SystemInfo: Send + Sync {
    /// Computer model or product name.
    fn computer_model(&self) -> String;
    /// Processor identifier.
    fn cpu_id(&self) -> String;
    /// Serial number of the primary disk.
    fn disk_serial(&self) -> String;
    /// Baseboard (motherboard) serial number.
    fn baseboard_serial(&self) -> String;
}

/// Best-effort [`SystemInfo`] for the running host. Anything that cannot be
/// read reports `"unknown"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSystemInfo;

impl SystemInfo for HostSystemInfo {
    fn computer_model(&self) -> String {
        get_computer_model().unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn cpu_id(&self) -> String {
        get_cpu_id().unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn disk_serial(&self) -> String {
        get_disk_serial().unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn baseboard_serial(&self) -> String {
        get_baseboard_serial().unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Derives a tenant-scoped hardware ID.
pub struct HwidProvider {
    system: Box<dyn SystemInfo>,
    tenant_key: Vec<u8>,
}

impl HwidProvider {
    /// Creates a provider reading from `system`.
    pub fn new(system: Box<dyn SystemInfo>, tenant_key: &[u8]) -> Self {
        Self {
            system,
            tenant_key: tenant_key.to_vec(),
        }
    }

    /// Creates a provider for the running host.
    pub fn for_host(tenant_key: &[u8]) -> Self {
        Self::new(Box::new(HostSystemInfo), tenant_key)
    }

    /// HMAC-SHA-256 of `cpu||disk||board` under the tenant key, base64.
    ///
    /// The same hardware yields different IDs for different tenants.
    pub fn pseudonymized_hwid(&self) -> LicenseResult<String> {
        let raw = format!(
            "{}||{}||{}",
            self.system.cpu_id(),
            self.system.disk_serial(),
            self.system.baseboard_serial()
        );
        let tag = keyed_hash(&self.tenant_key, raw.as_bytes())?;
        Ok(BASE64.encode(tag))
    }

    /// Returns true if the model name looks like a virtual machine.
    /// `model_override` replaces the detected model.
    pub fn is_likely_virtual_machine(&self, model_override: Option<&str>) -> bool {
        let model = match model_override {
            Some(m) => m.to_lowercase(),
            None => self.system.computer_model().to_lowercase(),
        };
        VM_MARKERS.iter().any(|marker| model.contains(marker))
    }

    /// Builds the report a client sends alongside registration.
    pub fn report(&self) -> LicenseResult<DeviceReport> {
        Ok(DeviceReport {
            hwid: self.pseudonymized_hwid()?,
            is_vm: self.is_likely_virtual_machine(None),
            os_name: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
        })
    }
}

impl std::fmt::Debug for HwidProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwidProvider").finish_non_exhaustive()
    }
}

/// Device summary safe to send over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    /// Pseudonymized hardware ID.
    pub hwid: String,
    /// Whether the host looks like a virtual machine.
    pub is_vm: bool,
    /// Operating system name.
    pub os_name: String,
    /// CPU architecture.
    pub arch: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(target_os = "linux")]
fn read_sys(path: &str) -> Option<String> {
    std::fs::read_to_string(path).ok().and_then(non_empty)
}

#[cfg(target_os = "macos")]
fn ioreg_value(class: &str, field: &str) -> Option<String> {
    std::process::Command::new("ioreg")
        .args(["-rd1", "-c", class])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .find(|l| l.contains(field))
                .and_then(|l| l.split('"').nth(3))
                .map(String::from)
        })
        .and_then(non_empty)
}

fn get_computer_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        read_sys("/sys/class/dmi/id/product_name")
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sysctl")
            .args(["-n", "hw.model"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(non_empty)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

fn get_cpu_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|s| format!("{}-{}", s.trim(), env::consts::ARCH))
        })
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sysctl")
            .args(["-n", "machdep.cpu.brand_string"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(non_empty)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

fn get_disk_serial() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let mut devices: Vec<_> = std::fs::read_dir("/sys/block")
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        devices.sort();
        devices.iter().find_map(|dev| {
            read_sys(&dev.join("device/serial").to_string_lossy())
                .or_else(|| read_sys(&dev.join("serial").to_string_lossy()))
        })
    }

    #[cfg(target_os = "macos")]
    {
        ioreg_value("IOPlatformExpertDevice", "IOPlatformUUID")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

fn get_baseboard_serial() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        read_sys("/sys/class/dmi/id/board_serial")
            .or_else(|| read_sys("/etc/machine-id"))
            .or_else(|| read_sys("/var/lib/dbus/machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        ioreg_value("IOPlatformExpertDevice", "IOPlatformSerialNumber")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
