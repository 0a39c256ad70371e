pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sample value the device substitutes when it skipped a reading
/// (onboard buffer under-run). Never a real measurement; the reassembly
/// engine converts it to NaN.
pub const SKIP_SENTINEL: f64 = -9999.0;

/// LabJack device families that support stream mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    T4 = 4,
    T7 = 7,
    T8 = 8,
}

/// Physical transport used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    Usb = 1,
    Ethernet = 3,
    Wifi = 4,
}

/// Library-level policy for how the link returns scans from a blocking read.
///
/// Triggered streams use `AllOrNone` so a read while the trigger is still
/// pending reports [`LinkError::NoScansYet`] instead of a short batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanReturnPolicy {
    All = 1,
    AllOrNone = 2,
}

/// Value written to a named device register.
///
/// The register map mixes integer registers (indices, enables) and
/// floating-point ones (voltage ranges), so writes carry a small tagged
/// value instead of separate method families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    U32(u32),
    F64(f64),
}

impl From<u32> for RegisterValue {
    fn from(value: u32) -> Self {
        RegisterValue::U32(value)
    }
}

impl From<f64> for RegisterValue {
    fn from(value: f64) -> Self {
        RegisterValue::F64(value)
    }
}

/// One batch of interleaved samples returned by a blocking read.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanBatch {
    /// Interleaved samples, channel-major within each scan. May contain
    /// [`SKIP_SENTINEL`] values.
    pub samples: Vec<f64>,
    /// Scans still buffered on the device, not yet transferred.
    pub device_backlog: u32,
    /// Scans buffered inside the link library, not yet handed to the caller.
    pub link_backlog: u32,
}

/// Errors reported by a [`DeviceLink`] implementation.
#[derive(Error, Debug)]
pub enum LinkError {
    /// A blocking read returned before any scans arrived. Expected while a
    /// triggered stream waits for its trigger; not a failure.
    #[error("no scans returned yet")]
    NoScansYet,

    /// A register or channel name has no address on this device.
    #[error("unknown register or channel name '{0}'")]
    UnknownName(String),

    /// The device handle has been closed or was never opened.
    #[error("device handle is not open")]
    NotOpen,

    /// Transport-level I/O failure.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the device or the vendor library.
    #[error("device error {code}: {message}")]
    Device { code: i32, message: String },
}

/// Capability handle to an open DAQ device.
///
/// This is the seam to the vendor communication library: everything the
/// streaming core needs from the hardware, and nothing else. The wire
/// protocol behind these calls is out of scope. Ownership of the
/// connection stays with the caller; the streaming core borrows the link
/// for one operation at a time and never closes it.
///
/// A link is not safe to share across overlapping stream sessions, which
/// the `&mut self` receivers enforce at compile time.
pub trait DeviceLink {
    /// Resolve a register or channel name to its hardware address.
    fn resolve_address(&mut self, name: &str) -> Result<u32, LinkError>;

    /// Read a named register.
    fn read_register(&mut self, name: &str) -> Result<RegisterValue, LinkError>;

    /// Write a named register.
    fn write_register(&mut self, name: &str, value: RegisterValue) -> Result<(), LinkError>;

    /// Write a sequence of registers in order, stopping at the first failure.
    fn write_registers(&mut self, entries: &[(String, RegisterValue)]) -> Result<(), LinkError> {
        for (name, value) in entries {
            self.write_register(name, *value)?;
        }
        Ok(())
    }

    /// Set the library-level scan-return policy for blocking reads.
    fn set_scan_return_policy(&mut self, policy: ScanReturnPolicy) -> Result<(), LinkError>;

    /// Set the blocking-read timeout in milliseconds. `0` blocks
    /// indefinitely.
    fn set_receive_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), LinkError>;

    /// Start streaming the given channel addresses. Returns the actual
    /// per-channel scan rate granted by the device, which may differ
    /// slightly from the requested one.
    fn start_stream(
        &mut self,
        scans_per_read: usize,
        addresses: &[u32],
        per_channel_rate_hz: f64,
    ) -> Result<f64, LinkError>;

    /// Block until one batch of `scans_per_read` scans is available.
    ///
    /// While a triggered stream is waiting for its trigger this returns
    /// [`LinkError::NoScansYet`], which callers must treat as "try again".
    fn blocking_read(&mut self) -> Result<ScanBatch, LinkError>;

    /// Stop the running stream.
    fn stop_stream(&mut self) -> Result<(), LinkError>;

    /// Release the device handle. Called by the owner of the connection,
    /// never by the streaming core.
    fn close(&mut self) -> Result<(), LinkError>;
}
