use crate::error::{DaqError, Phase};
use crate::link::{DeviceLink, LinkError, RegisterValue, ScanBatch};
use crate::plan::{plan, ScanPlan};
use crate::records::{count_sentinels, reassemble, ChannelRecord};
use crate::trigger::{self, TriggerSpec};
use chrono::{DateTime, Utc};
use crossbeam_channel::bounded;
use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;

/// Negative-channel register value selecting single-ended readings.
const GND: u32 = 199;
/// Default analog input range, +-10 V.
const AIN_RANGE_V: f64 = 10.0;
/// Bounded hand-off depth between the read loop and the accumulator
/// worker in pipelined mode.
const HANDOFF_CAPACITY: usize = 4;

/// User-level description of one stream operation.
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    /// Channel names to scan, in scan-list order, e.g. `["AIN0", "AIN1"]`.
    pub channels: Vec<String>,
    /// Requested acquisition duration in seconds.
    pub duration_s: f64,
    /// Aggregate sample rate over all channels, in Hz.
    pub total_rate_hz: f64,
    /// Scans per blocking read; `None` covers the whole duration in one read.
    pub scans_per_read: Option<usize>,
    /// Hardware trigger gating the stream, if any.
    pub trigger: Option<TriggerSpec>,
}

impl StreamRequest {
    pub fn builder() -> StreamRequestBuilder {
        StreamRequestBuilder::default()
    }
}

/// Builder for [`StreamRequest`].
#[derive(Debug, Default)]
pub struct StreamRequestBuilder {
    channels: Vec<String>,
    duration_s: Option<f64>,
    total_rate_hz: Option<f64>,
    scans_per_read: Option<usize>,
    trigger: Option<TriggerSpec>,
}

impl StreamRequestBuilder {
    /// Set the scan channels (required).
    pub fn channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the acquisition duration in seconds (required).
    pub fn duration_s(mut self, duration_s: f64) -> Self {
        self.duration_s = Some(duration_s);
        self
    }

    /// Set the aggregate sample rate in Hz (required).
    pub fn total_rate_hz(mut self, total_rate_hz: f64) -> Self {
        self.total_rate_hz = Some(total_rate_hz);
        self
    }

    /// Set an explicit scans-per-read instead of the planner's default.
    pub fn scans_per_read(mut self, scans_per_read: usize) -> Self {
        self.scans_per_read = Some(scans_per_read);
        self
    }

    /// Gate the stream on a hardware trigger.
    pub fn trigger(mut self, trigger: TriggerSpec) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn build(self) -> Result<StreamRequest, DaqError> {
        let duration_s = self
            .duration_s
            .ok_or_else(|| DaqError::InvalidPlan("duration_s is required".to_string()))?;
        let total_rate_hz = self
            .total_rate_hz
            .ok_or_else(|| DaqError::InvalidPlan("total_rate_hz is required".to_string()))?;
        if self.channels.is_empty() {
            return Err(DaqError::InvalidPlan(
                "at least one scan channel is required".to_string(),
            ));
        }
        if let Some(trigger) = &self.trigger {
            trigger.validate()?;
        }
        Ok(StreamRequest {
            channels: self.channels,
            duration_s,
            total_rate_hz,
            scans_per_read: self.scans_per_read,
            trigger: self.trigger,
        })
    }
}

/// Driver states across one stream operation. `Failed` is terminal and
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamPhase {
    Idle,
    Configuring,
    Arming,
    Streaming,
    Draining,
    Stopped,
    Failed,
}

/// Metadata for one completed blocking read.
#[derive(Debug, Clone, Serialize)]
pub struct ReadStats {
    /// Read-loop iteration, 0-based. "No scans yet" retries do not
    /// consume an index.
    pub index: usize,
    /// When the read returned.
    pub returned_at: DateTime<Utc>,
    /// Interleaved samples delivered by this read.
    pub sample_count: usize,
    /// Skip sentinels in this read's batch.
    pub skipped: usize,
    /// Scans still buffered on the device after this read.
    pub device_backlog: u32,
    /// Scans still buffered in the link library after this read.
    pub link_backlog: u32,
}

/// Durable output of a successful stream operation.
#[derive(Debug, Clone, Serialize)]
pub struct StreamResult {
    pub plan: ScanPlan,
    pub trigger: Option<TriggerSpec>,
    /// Per-channel records, in scan-list order.
    pub records: IndexMap<String, ChannelRecord>,
    /// Total skip sentinels across all reads and channels.
    pub skipped_samples: usize,
    /// Per-read backlog and skew metrics, in read order.
    pub reads: Vec<ReadStats>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of the read loop, before draining.
struct LoopOutcome {
    samples: Vec<f64>,
    skipped: usize,
    reads: Vec<ReadStats>,
    failure: Option<DaqError>,
}

/// Owns the configure → arm → start → read → drain sequence against a
/// borrowed device link.
///
/// The link is exclusively borrowed for the duration of one operation and
/// handed back afterward; the driver never opens or closes the connection.
/// A "stop stream" call is issued on every exit path once streaming has
/// started, so no orphaned stream state is left on the device even when a
/// read fails mid-loop.
pub struct StreamDriver<'a, L: DeviceLink> {
    link: &'a mut L,
    phase: StreamPhase,
    pipelined: bool,
    drained: bool,
}

/// Run one stream operation with the synchronous (baseline) driver.
pub fn stream<L: DeviceLink>(
    link: &mut L,
    request: &StreamRequest,
) -> Result<StreamResult, DaqError> {
    StreamDriver::new(link).run(request)
}

impl<'a, L: DeviceLink> StreamDriver<'a, L> {
    pub fn new(link: &'a mut L) -> Self {
        Self {
            link,
            phase: StreamPhase::Idle,
            pipelined: false,
            drained: false,
        }
    }

    /// Hand raw batches to a background accumulator worker so sentinel
    /// scanning overlaps the next blocking read. Reduces the chance of a
    /// device-side buffer overrun between reads at high rates.
    pub fn pipelined(mut self, pipelined: bool) -> Self {
        self.pipelined = pipelined;
        self
    }

    /// Current driver state, for observability.
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Execute one full stream operation.
    ///
    /// On failure the returned error names the phase it occurred in;
    /// partial data accumulated before a read failure is discarded.
    pub fn run(&mut self, request: &StreamRequest) -> Result<StreamResult, DaqError> {
        self.drained = false;

        let plan = plan(
            request.channels.len(),
            request.duration_s,
            request.total_rate_hz,
            request.scans_per_read,
        )?;
        if let Some(trigger) = &request.trigger {
            trigger.validate()?;
        }
        info!(
            "streaming {} channels for {:.3} s: {} scans/channel at {:.1} Hz, {} reads of {} scans",
            plan.channel_count,
            plan.effective_duration_s,
            plan.scans_per_channel(),
            plan.per_channel_rate_hz,
            plan.read_count,
            plan.scans_per_read,
        );

        self.set_phase(StreamPhase::Configuring);
        if let Err(e) = self.configure_baseline() {
            self.set_phase(StreamPhase::Failed);
            return Err(e);
        }

        if let Some(trigger) = &request.trigger {
            self.set_phase(StreamPhase::Arming);
            if let Err(e) = trigger::arm(self.link, trigger) {
                self.set_phase(StreamPhase::Failed);
                return Err(e);
            }
        }

        let addresses = match self.resolve_scan_list(&request.channels) {
            Ok(addresses) => addresses,
            Err(e) => {
                self.set_phase(StreamPhase::Failed);
                return Err(e);
            }
        };

        let started_at = Utc::now();
        match self
            .link
            .start_stream(plan.scans_per_read, &addresses, plan.per_channel_rate_hz)
        {
            Ok(actual_rate) => {
                self.set_phase(StreamPhase::Streaming);
                info!("stream started, device granted {actual_rate:.1} Hz/channel");
                if request.trigger.is_some() {
                    info!("waiting for trigger...");
                }
            }
            Err(e) => {
                self.set_phase(StreamPhase::Failed);
                return Err(DaqError::from_link(Phase::Start, e));
            }
        }

        let outcome = if self.pipelined {
            self.read_loop_pipelined(&plan)
        } else {
            self.read_loop_sync(&plan)
        };

        // Drain unconditionally: a stream left running after an error
        // leaks device resources and blocks the next session.
        self.set_phase(StreamPhase::Draining);
        if let Err(stop_err) = self.drain() {
            self.set_phase(StreamPhase::Failed);
            return Err(match stop_err {
                LinkError::NotOpen => DaqError::NoConnection,
                e => DaqError::StreamStop {
                    source: e,
                    read_error: outcome.failure.map(Box::new),
                },
            });
        }

        if let Some(failure) = outcome.failure {
            self.set_phase(StreamPhase::Failed);
            return Err(failure);
        }
        self.set_phase(StreamPhase::Stopped);
        let finished_at = Utc::now();

        let records = reassemble(
            &outcome.samples,
            &request.channels,
            plan.per_channel_rate_hz,
            Some(plan.scans_per_channel()),
        );
        info!(
            "stream complete: {} samples total, {} skipped",
            outcome.samples.len(),
            outcome.skipped
        );

        Ok(StreamResult {
            plan,
            trigger: request.trigger.clone(),
            records,
            skipped_samples: outcome.skipped,
            reads: outcome.reads,
            started_at,
            finished_at,
        })
    }

    fn set_phase(&mut self, phase: StreamPhase) {
        debug!("stream driver {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Baseline stream registers: untriggered, internally clocked, default
    /// settling and resolution, single-ended inputs at +-10 V.
    fn configure_baseline(&mut self) -> Result<(), DaqError> {
        let registers: Vec<(String, RegisterValue)> = vec![
            ("STREAM_TRIGGER_INDEX".to_string(), 0u32.into()),
            ("STREAM_CLOCK_SOURCE".to_string(), 0u32.into()),
            ("STREAM_SETTLING_US".to_string(), 0u32.into()),
            ("STREAM_RESOLUTION_INDEX".to_string(), 0u32.into()),
            ("AIN_ALL_NEGATIVE_CH".to_string(), GND.into()),
            ("AIN_ALL_RANGE".to_string(), AIN_RANGE_V.into()),
        ];
        self.link
            .write_registers(&registers)
            .map_err(|e| DaqError::from_link(Phase::Configure, e))
    }

    fn resolve_scan_list(&mut self, channels: &[String]) -> Result<Vec<u32>, DaqError> {
        channels
            .iter()
            .map(|name| {
                self.link.resolve_address(name).map_err(|e| match e {
                    LinkError::NotOpen => DaqError::NoConnection,
                    e => DaqError::ChannelResolution {
                        name: name.clone(),
                        source: e,
                    },
                })
            })
            .collect()
    }

    /// Baseline model: read, scan sentinels, and accumulate on the
    /// calling thread.
    fn read_loop_sync(&mut self, plan: &ScanPlan) -> LoopOutcome {
        let mut samples = Vec::with_capacity(plan.expected_samples());
        let mut skipped = 0usize;
        let mut reads = Vec::with_capacity(plan.read_count);

        let mut completed = 0usize;
        while completed < plan.read_count {
            let batch = match self.next_batch() {
                Ok(Some(batch)) => batch,
                Ok(None) => continue,
                Err(failure) => {
                    return LoopOutcome {
                        samples,
                        skipped,
                        reads,
                        failure: Some(failure),
                    }
                }
            };
            let batch_skipped = count_sentinels(&batch.samples);
            skipped += batch_skipped;
            reads.push(Self::stats_for(completed, plan, &batch, batch_skipped));
            samples.extend_from_slice(&batch.samples);
            completed += 1;
        }
        LoopOutcome {
            samples,
            skipped,
            reads,
            failure: None,
        }
    }

    /// Pipelined model: the loop thread only performs the blocking read
    /// and hands each batch to a single-consumer worker over a bounded
    /// channel. Hand-offs are processed strictly in read order, and the
    /// worker is joined before the caller proceeds to stream-stop.
    fn read_loop_pipelined(&mut self, plan: &ScanPlan) -> LoopOutcome {
        let (tx, rx) = bounded::<ScanBatch>(HANDOFF_CAPACITY);
        let expected = plan.expected_samples();

        let (samples, skipped, per_read_skipped, mut reads, failure) =
            std::thread::scope(|scope| {
                let worker = scope.spawn(move || {
                    let mut samples = Vec::with_capacity(expected);
                    let mut skipped = 0usize;
                    let mut per_read = Vec::new();
                    for batch in rx {
                        let batch_skipped = count_sentinels(&batch.samples);
                        skipped += batch_skipped;
                        per_read.push(batch_skipped);
                        samples.extend_from_slice(&batch.samples);
                    }
                    (samples, skipped, per_read)
                });

                let mut reads = Vec::with_capacity(plan.read_count);
                let mut failure = None;
                let mut completed = 0usize;
                while completed < plan.read_count {
                    match self.next_batch() {
                        Ok(Some(batch)) => {
                            // Sentinel count is filled in after the join.
                            reads.push(Self::stats_for(completed, plan, &batch, 0));
                            if tx.send(batch).is_err() {
                                break;
                            }
                            completed += 1;
                        }
                        Ok(None) => continue,
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }

                // Join barrier: every queued hand-off is absorbed before
                // the driver moves on to stream-stop.
                drop(tx);
                match worker.join() {
                    Ok((samples, skipped, per_read)) => {
                        (samples, skipped, per_read, reads, failure)
                    }
                    Err(_) => {
                        let panic_failure = DaqError::StreamRead(LinkError::Device {
                            code: -1,
                            message: "sample accumulator worker panicked".to_string(),
                        });
                        (
                            Vec::new(),
                            0,
                            Vec::new(),
                            reads,
                            Some(failure.unwrap_or(panic_failure)),
                        )
                    }
                }
            });

        for (stats, batch_skipped) in reads.iter_mut().zip(per_read_skipped) {
            stats.skipped = batch_skipped;
        }
        LoopOutcome {
            samples,
            skipped,
            reads,
            failure,
        }
    }

    /// One blocking read. `Ok(None)` means the trigger is still pending
    /// and the iteration must be retried; that condition is inherent to
    /// triggered mode and never surfaces as an error.
    fn next_batch(&mut self) -> Result<Option<ScanBatch>, DaqError> {
        match self.link.blocking_read() {
            Ok(batch) => Ok(Some(batch)),
            Err(LinkError::NoScansYet) => {
                debug!("no scans returned yet, trigger pending");
                Ok(None)
            }
            Err(e) => Err(DaqError::from_link(Phase::Read, e)),
        }
    }

    fn stats_for(index: usize, plan: &ScanPlan, batch: &ScanBatch, skipped: usize) -> ReadStats {
        let stats = ReadStats {
            index,
            returned_at: Utc::now(),
            sample_count: batch.samples.len(),
            skipped,
            device_backlog: batch.device_backlog,
            link_backlog: batch.link_backlog,
        };
        debug!(
            "read {}/{}: {} samples, {} skipped, backlog device={} link={}",
            index + 1,
            plan.read_count,
            stats.sample_count,
            skipped,
            stats.device_backlog,
            stats.link_backlog
        );
        stats
    }

    /// Issue the stop-stream call at most once per operation. A repeated
    /// drain is a no-op so a later failure cannot mask the first outcome.
    fn drain(&mut self) -> Result<(), LinkError> {
        if self.drained {
            return Ok(());
        }
        self.drained = true;
        debug!("stopping stream");
        self.link.stop_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mock::MockLink;
    use crate::link::{DeviceKind, ScanReturnPolicy, Transport, SKIP_SENTINEL};
    use crate::trigger::TriggerSpec;

    fn link() -> MockLink {
        MockLink::open(DeviceKind::T7, Transport::Ethernet, "192.168.1.128")
    }

    /// 2 channels, 4 scans/channel split over 2 reads of 2 scans.
    fn two_read_request() -> StreamRequest {
        StreamRequest::builder()
            .channels(["AIN0", "AIN1"])
            .duration_s(1.0)
            .total_rate_hz(8.0)
            .scans_per_read(2)
            .build()
            .unwrap()
    }

    fn seed_two_reads(link: &mut MockLink) {
        link.push_scans(vec![1.0, 10.0, 2.0, 11.0]);
        link.push_scans(vec![3.0, 12.0, 4.0, 13.0]);
    }

    #[test]
    fn untriggered_stream_end_to_end() {
        let mut link = link();
        seed_two_reads(&mut link);

        let result = stream(&mut link, &two_read_request()).unwrap();

        assert_eq!(result.plan.read_count, 2);
        assert_eq!(result.records["AIN0"].values.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            result.records["AIN1"].values.to_vec(),
            vec![10.0, 11.0, 12.0, 13.0]
        );
        assert_eq!(result.skipped_samples, 0);
        assert_eq!(result.reads.len(), 2);
        assert_eq!(result.reads[1].index, 1);
        assert!(result.finished_at >= result.started_at);

        // Baseline registers were written and the stream was stopped.
        assert_eq!(
            link.last_write("STREAM_TRIGGER_INDEX"),
            Some(RegisterValue::U32(0))
        );
        assert_eq!(
            link.last_write("AIN_ALL_NEGATIVE_CH"),
            Some(RegisterValue::U32(199))
        );
        assert_eq!(link.stop_calls, 1);
        assert!(!link.is_streaming());
        // The library-level scan policy is only touched on the trigger path.
        assert_eq!(link.scan_return_policy, None);

        // Scan list resolved to hardware addresses in channel order.
        assert_eq!(link.start_calls.len(), 1);
        assert_eq!(link.start_calls[0].addresses, vec![0, 2]);
        assert_eq!(link.start_calls[0].scans_per_read, 2);
        assert_eq!(link.start_calls[0].per_channel_rate_hz, 4.0);
    }

    #[test]
    fn triggered_stream_retries_while_trigger_pending() {
        let mut link = link();
        link.push_no_scans();
        link.push_scans(vec![1.0, 10.0, 2.0, 11.0]);
        link.push_no_scans();
        link.push_no_scans();
        link.push_scans(vec![3.0, 12.0, 4.0, 13.0]);

        let request = StreamRequest::builder()
            .channels(["AIN0", "AIN1"])
            .duration_s(1.0)
            .total_rate_hz(8.0)
            .scans_per_read(2)
            .trigger(TriggerSpec::new("DIO0").timeout_s(2.5))
            .build()
            .unwrap();

        let result = stream(&mut link, &request).unwrap();

        // Retries did not consume read-loop iterations.
        assert_eq!(result.reads.len(), 2);
        assert_eq!(result.records["AIN0"].sample_count, 4);

        // Trigger path configured the library-level read semantics and
        // repointed the trigger index at DIO0 after the baseline cleared it.
        assert_eq!(link.scan_return_policy, Some(ScanReturnPolicy::AllOrNone));
        assert_eq!(link.receive_timeout_ms, Some(2500));
        assert_eq!(
            link.last_write("STREAM_TRIGGER_INDEX"),
            Some(RegisterValue::U32(2000))
        );
        assert_eq!(link.stop_calls, 1);
    }

    #[test]
    fn sentinels_are_counted_and_converted() {
        let mut link = link();
        link.push_scans(vec![1.0, SKIP_SENTINEL, 2.0, 11.0]);
        link.push_scans(vec![SKIP_SENTINEL, 12.0, 4.0, 13.0]);

        let result = stream(&mut link, &two_read_request()).unwrap();

        assert_eq!(result.skipped_samples, 2);
        assert_eq!(result.reads[0].skipped, 1);
        assert_eq!(result.reads[1].skipped, 1);
        assert!(result.records["AIN1"].values[0].is_nan());
        assert!(result.records["AIN0"].values[2].is_nan());
        let missing: usize = result.records.values().map(|r| r.missing_count()).sum();
        assert_eq!(missing, 2);
    }

    #[test]
    fn read_failure_still_stops_exactly_once() {
        let mut link = link();
        link.push_scans(vec![1.0, 10.0, 2.0, 11.0]);
        link.push_read_error(LinkError::Device {
            code: 1301,
            message: "buffer overrun".to_string(),
        });

        let err = stream(&mut link, &two_read_request()).unwrap_err();
        assert!(matches!(err, DaqError::StreamRead(_)));
        assert_eq!(link.stop_calls, 1);
        assert!(!link.is_streaming());
    }

    #[test]
    fn stop_failure_chains_prior_read_error() {
        let mut link = link();
        link.push_read_error(LinkError::Device {
            code: 1301,
            message: "buffer overrun".to_string(),
        });
        link.push_stop_error(LinkError::Device {
            code: 2605,
            message: "stop refused".to_string(),
        });

        let err = stream(&mut link, &two_read_request()).unwrap_err();
        match err {
            DaqError::StreamStop { read_error, .. } => {
                assert!(matches!(*read_error.unwrap(), DaqError::StreamRead(_)));
            }
            other => panic!("expected StreamStop, got {other:?}"),
        }
    }

    #[test]
    fn stop_failure_alone_reports_stream_stop() {
        let mut link = link();
        seed_two_reads(&mut link);
        link.push_stop_error(LinkError::Device {
            code: 2605,
            message: "stop refused".to_string(),
        });

        let err = stream(&mut link, &two_read_request()).unwrap_err();
        assert!(matches!(
            err,
            DaqError::StreamStop {
                read_error: None,
                ..
            }
        ));
    }

    #[test]
    fn drain_is_idempotent() {
        let mut link = link();
        link.start_stream(1, &[0], 100.0).unwrap();
        let mut driver = StreamDriver::new(&mut link);
        driver.drain().unwrap();
        // Second drain is a no-op: no extra stop call, no new failure.
        driver.drain().unwrap();
        assert_eq!(link.stop_calls, 1);
    }

    #[test]
    fn pipelined_matches_synchronous_output() {
        let request = two_read_request();

        let mut sync_link = link();
        sync_link.push_scans(vec![1.0, SKIP_SENTINEL, 2.0, 11.0]);
        sync_link.push_scans(vec![3.0, 12.0, 4.0, 13.0]);
        let sync = stream(&mut sync_link, &request).unwrap();

        let mut piped_link = link();
        piped_link.push_scans(vec![1.0, SKIP_SENTINEL, 2.0, 11.0]);
        piped_link.push_scans(vec![3.0, 12.0, 4.0, 13.0]);
        let piped = StreamDriver::new(&mut piped_link)
            .pipelined(true)
            .run(&request)
            .unwrap();

        assert_eq!(piped.skipped_samples, sync.skipped_samples);
        assert_eq!(piped.reads.len(), sync.reads.len());
        assert_eq!(piped.reads[0].skipped, sync.reads[0].skipped);
        for (name, record) in &sync.records {
            let piped_values = piped.records[name].values.to_vec();
            for (a, b) in record.values.iter().zip(piped_values) {
                assert!(a.eq(&b) || (a.is_nan() && b.is_nan()));
            }
        }
        assert_eq!(piped_link.stop_calls, 1);
    }

    #[test]
    fn pipelined_read_failure_still_drains() {
        let mut link = link();
        link.push_scans(vec![1.0, 10.0, 2.0, 11.0]);
        link.push_read_error(LinkError::Device {
            code: 1301,
            message: "buffer overrun".to_string(),
        });

        let err = StreamDriver::new(&mut link)
            .pipelined(true)
            .run(&two_read_request())
            .unwrap_err();
        assert!(matches!(err, DaqError::StreamRead(_)));
        assert_eq!(link.stop_calls, 1);
    }

    #[test]
    fn closed_link_reports_no_connection() {
        let mut link = link();
        link.close().unwrap();
        let err = stream(&mut link, &two_read_request()).unwrap_err();
        assert!(matches!(err, DaqError::NoConnection));
    }

    #[test]
    fn builder_requires_channels_and_rate() {
        assert!(matches!(
            StreamRequest::builder().duration_s(1.0).total_rate_hz(1e3).build(),
            Err(DaqError::InvalidPlan(_))
        ));
        assert!(matches!(
            StreamRequest::builder().channels(["AIN0"]).duration_s(1.0).build(),
            Err(DaqError::InvalidPlan(_))
        ));
    }
}
