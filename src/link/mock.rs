//! In-memory [`DeviceLink`] for tests and offline demos.
//!
//! Reads are scripted ahead of time and register writes are recorded, so
//! every driver path, including the failure paths, can be exercised
//! without hardware.

use std::collections::{HashMap, VecDeque};

use crate::link::{
    DeviceKind, DeviceLink, LinkError, RegisterValue, ScanBatch, ScanReturnPolicy, Transport,
};

/// Arguments of a recorded `start_stream` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StartStreamCall {
    pub scans_per_read: usize,
    pub addresses: Vec<u32>,
    pub per_channel_rate_hz: f64,
}

/// Scriptable in-memory device link.
///
/// Blocking reads pop from a queue seeded with [`MockLink::push_scans`],
/// [`MockLink::push_no_scans`] and [`MockLink::push_read_error`]; stop
/// failures are queued with [`MockLink::push_stop_error`]. Register writes,
/// library configuration and stream start/stop calls are recorded for
/// inspection after the operation under test returns the link.
pub struct MockLink {
    pub kind: DeviceKind,
    pub transport: Transport,
    pub identifier: String,

    open: bool,
    streaming: bool,
    addresses: HashMap<String, u32>,
    reads: VecDeque<Result<ScanBatch, LinkError>>,
    stop_errors: VecDeque<LinkError>,

    /// Register writes in issue order.
    pub writes: Vec<(String, RegisterValue)>,
    /// `start_stream` calls in issue order.
    pub start_calls: Vec<StartStreamCall>,
    /// Number of `stop_stream` calls, successful or not.
    pub stop_calls: usize,
    /// Last configured scan-return policy, if any.
    pub scan_return_policy: Option<ScanReturnPolicy>,
    /// Last configured receive timeout, if any.
    pub receive_timeout_ms: Option<u64>,
}

impl MockLink {
    /// Open a mock handle, mirroring the vendor `open(kind, transport,
    /// identifier)` call. The default address table covers AIN0..AIN13
    /// and DIO0..DIO22 with T-series modbus addresses.
    pub fn open(kind: DeviceKind, transport: Transport, identifier: &str) -> Self {
        let mut addresses = HashMap::new();
        for i in 0..14u32 {
            // Analog inputs are 32-bit floats, two modbus registers each.
            addresses.insert(format!("AIN{i}"), 2 * i);
        }
        for i in 0..23u32 {
            addresses.insert(format!("DIO{i}"), 2000 + i);
        }
        Self {
            kind,
            transport,
            identifier: identifier.to_string(),
            open: true,
            streaming: false,
            addresses,
            reads: VecDeque::new(),
            stop_errors: VecDeque::new(),
            writes: Vec::new(),
            start_calls: Vec::new(),
            stop_calls: 0,
            scan_return_policy: None,
            receive_timeout_ms: None,
        }
    }

    /// Queue one successful read returning the given interleaved samples.
    pub fn push_scans(&mut self, samples: Vec<f64>) {
        self.push_scans_with_backlog(samples, 0, 0);
    }

    /// Queue one successful read with explicit backlog figures.
    pub fn push_scans_with_backlog(
        &mut self,
        samples: Vec<f64>,
        device_backlog: u32,
        link_backlog: u32,
    ) {
        self.reads.push_back(Ok(ScanBatch {
            samples,
            device_backlog,
            link_backlog,
        }));
    }

    /// Queue one "trigger still pending" read.
    pub fn push_no_scans(&mut self) {
        self.reads.push_back(Err(LinkError::NoScansYet));
    }

    /// Queue one failing read.
    pub fn push_read_error(&mut self, err: LinkError) {
        self.reads.push_back(Err(err));
    }

    /// Queue a failure for the next `stop_stream` call.
    pub fn push_stop_error(&mut self, err: LinkError) {
        self.stop_errors.push_back(err);
    }

    /// Whether a stream is currently running on this handle.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Value of the last write to a register, if it was written.
    pub fn last_write(&self, name: &str) -> Option<RegisterValue> {
        self.writes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    fn check_open(&self) -> Result<(), LinkError> {
        if self.open {
            Ok(())
        } else {
            Err(LinkError::NotOpen)
        }
    }
}

impl DeviceLink for MockLink {
    fn resolve_address(&mut self, name: &str) -> Result<u32, LinkError> {
        self.check_open()?;
        self.addresses
            .get(name)
            .copied()
            .ok_or_else(|| LinkError::UnknownName(name.to_string()))
    }

    fn read_register(&mut self, name: &str) -> Result<RegisterValue, LinkError> {
        self.check_open()?;
        self.writes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| LinkError::UnknownName(name.to_string()))
    }

    fn write_register(&mut self, name: &str, value: RegisterValue) -> Result<(), LinkError> {
        self.check_open()?;
        self.writes.push((name.to_string(), value));
        Ok(())
    }

    fn set_scan_return_policy(&mut self, policy: ScanReturnPolicy) -> Result<(), LinkError> {
        self.check_open()?;
        self.scan_return_policy = Some(policy);
        Ok(())
    }

    fn set_receive_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), LinkError> {
        self.check_open()?;
        self.receive_timeout_ms = Some(timeout_ms);
        Ok(())
    }

    fn start_stream(
        &mut self,
        scans_per_read: usize,
        addresses: &[u32],
        per_channel_rate_hz: f64,
    ) -> Result<f64, LinkError> {
        self.check_open()?;
        self.start_calls.push(StartStreamCall {
            scans_per_read,
            addresses: addresses.to_vec(),
            per_channel_rate_hz,
        });
        self.streaming = true;
        Ok(per_channel_rate_hz)
    }

    fn blocking_read(&mut self) -> Result<ScanBatch, LinkError> {
        self.check_open()?;
        if !self.streaming {
            return Err(LinkError::Device {
                code: 2620,
                message: "stream is not running".to_string(),
            });
        }
        self.reads.pop_front().unwrap_or_else(|| {
            Err(LinkError::Device {
                code: 1301,
                message: "mock read script exhausted".to_string(),
            })
        })
    }

    fn stop_stream(&mut self) -> Result<(), LinkError> {
        self.check_open()?;
        self.stop_calls += 1;
        self.streaming = false;
        match self.stop_errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), LinkError> {
        self.check_open()?;
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> MockLink {
        MockLink::open(DeviceKind::T7, Transport::Ethernet, "192.168.1.128")
    }

    #[test]
    fn resolves_default_address_table() {
        let mut link = link();
        assert_eq!(link.resolve_address("AIN0").unwrap(), 0);
        assert_eq!(link.resolve_address("AIN2").unwrap(), 4);
        assert_eq!(link.resolve_address("DIO0").unwrap(), 2000);
        assert!(matches!(
            link.resolve_address("AIN99"),
            Err(LinkError::UnknownName(_))
        ));
    }

    #[test]
    fn closed_handle_reports_not_open() {
        let mut link = link();
        link.close().unwrap();
        assert!(matches!(
            link.write_register("STREAM_TRIGGER_INDEX", 0u32.into()),
            Err(LinkError::NotOpen)
        ));
    }

    #[test]
    fn scripted_reads_pop_in_order() {
        let mut link = link();
        link.push_no_scans();
        link.push_scans(vec![1.0, 2.0]);
        link.start_stream(1, &[0, 2], 1000.0).unwrap();
        assert!(matches!(link.blocking_read(), Err(LinkError::NoScansYet)));
        assert_eq!(link.blocking_read().unwrap().samples, vec![1.0, 2.0]);
    }

    #[test]
    fn read_before_start_is_a_device_error() {
        let mut link = link();
        link.push_scans(vec![1.0]);
        assert!(matches!(
            link.blocking_read(),
            Err(LinkError::Device { .. })
        ));
    }
}
