use crate::error::DaqError;
use serde::Serialize;

/// Authoritative device-level parameters for one stream operation.
///
/// Computed once by [`plan`] from the user-level request and owned by the
/// stream driver for the lifetime of that operation. The derived fields are
/// kept numerically consistent with each other rather than with the raw
/// request: rounding the sample count up to whole scans stretches the
/// effective duration, and the per-channel rate is derived from the rounded
/// scan count so `effective_duration_s * per_channel_rate_hz` recovers the
/// per-channel scan count exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanPlan {
    /// Number of channels in each scan.
    pub channel_count: usize,
    /// Duration the caller asked for, in seconds.
    pub requested_duration_s: f64,
    /// Aggregate sample rate over all channels, in Hz.
    pub total_rate_hz: f64,
    /// Scan rate per channel, derived from the rounded scan count.
    pub per_channel_rate_hz: f64,
    /// Total samples across all channels; always a multiple of
    /// `channel_count` so the final scan is complete.
    pub total_scan_count: usize,
    /// Scans handed back by each blocking read.
    pub scans_per_read: usize,
    /// Number of blocking reads needed to cover the plan.
    pub read_count: usize,
    /// Duration actually covered once rounding is accounted for.
    /// Always `>= requested_duration_s`.
    pub effective_duration_s: f64,
}

impl ScanPlan {
    /// Scans per channel, `total_scan_count / channel_count`.
    pub fn scans_per_channel(&self) -> usize {
        self.total_scan_count / self.channel_count
    }

    /// Total samples the read loop is expected to deliver.
    pub fn expected_samples(&self) -> usize {
        self.total_scan_count
    }
}

/// Convert user-level scan parameters into a [`ScanPlan`].
///
/// Pure arithmetic, no device access. Fails with
/// [`DaqError::InvalidPlan`] on non-positive inputs or when the resolved
/// scans-per-read comes out zero.
///
/// When no `scans_per_read` hint is given, one read covers the whole
/// requested duration (`floor(per_channel_rate * requested_duration)`).
pub fn plan(
    channel_count: usize,
    requested_duration_s: f64,
    total_rate_hz: f64,
    scans_per_read: Option<usize>,
) -> Result<ScanPlan, DaqError> {
    if channel_count < 1 {
        return Err(DaqError::InvalidPlan(
            "channel_count must be at least 1".to_string(),
        ));
    }
    if !(requested_duration_s > 0.0) {
        return Err(DaqError::InvalidPlan(format!(
            "requested_duration_s must be positive, got {requested_duration_s}"
        )));
    }
    if !(total_rate_hz > 0.0) {
        return Err(DaqError::InvalidPlan(format!(
            "total_rate_hz must be positive, got {total_rate_hz}"
        )));
    }

    // Round the raw sample count up to whole scans so the last scan
    // contains every channel.
    let raw_total_samples = (total_rate_hz * requested_duration_s).ceil() as usize;
    let scans_per_channel = raw_total_samples.div_ceil(channel_count);
    let total_scan_count = scans_per_channel * channel_count;

    let effective_duration_s = total_scan_count as f64 / total_rate_hz;
    let per_channel_rate_hz = scans_per_channel as f64 / effective_duration_s;

    let scans_per_read = match scans_per_read {
        Some(hint) => hint,
        None => (per_channel_rate_hz * requested_duration_s).floor() as usize,
    };
    if scans_per_read == 0 {
        return Err(DaqError::InvalidPlan(
            "resolved scans_per_read is zero; raise the rate or duration, or pass an explicit value"
                .to_string(),
        ));
    }
    let read_count = scans_per_channel.div_ceil(scans_per_read);

    Ok(ScanPlan {
        channel_count,
        requested_duration_s,
        total_rate_hz,
        per_channel_rate_hz,
        total_scan_count,
        scans_per_read,
        read_count,
        effective_duration_s,
    })
}
