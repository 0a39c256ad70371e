use crate::error::{DaqError, Phase};
use crate::link::{DeviceLink, LinkError, RegisterValue, ScanReturnPolicy};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Extended-feature trigger modes supported for stream gating.
///
/// The discriminants are the device's extended-feature index bases; see
/// the T-series special stream modes documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Trigger on the frequency-in feature (edge-to-edge interval timer).
    FrequencyIn = 3,
    /// Trigger on the pulse-width-in feature.
    PulseWidthIn = 5,
    /// Trigger on conditional reset.
    ConditionalReset = 12,
}

/// Which signal edge arms the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEdge {
    Falling = 0,
    Rising = 1,
}

impl From<TriggerEdge> for u32 {
    fn from(edge: TriggerEdge) -> Self {
        edge as u32
    }
}

impl TriggerMode {
    /// Resolve the extended-feature index to write for this mode and edge.
    ///
    /// Known limitation: `PulseWidthIn` uses a fixed index and ignores the
    /// edge, matching observed device behavior. Only `FrequencyIn` selects
    /// its index by edge; `ConditionalReset` applies the edge through
    /// `EF_CONFIG_A` instead.
    pub fn ef_index(self, edge: TriggerEdge) -> u32 {
        match self {
            TriggerMode::FrequencyIn => match edge {
                TriggerEdge::Rising => 3,
                TriggerEdge::Falling => 4,
            },
            TriggerMode::PulseWidthIn => 5,
            TriggerMode::ConditionalReset => 12,
        }
    }
}

/// Hardware trigger for a stream operation, supplied at stream start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Digital channel that gates the stream, e.g. "DIO0".
    pub channel: String,
    pub mode: TriggerMode,
    pub edge: TriggerEdge,
    /// How long a blocking read waits for the trigger, in seconds.
    /// `None` waits indefinitely.
    pub timeout_s: Option<f64>,
}

impl TriggerSpec {
    /// Trigger on DIO0, conditional reset, rising edge, indefinite wait.
    /// The device defaults for gated acquisition.
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            mode: TriggerMode::ConditionalReset,
            edge: TriggerEdge::Rising,
            timeout_s: None,
        }
    }

    pub fn mode(mut self, mode: TriggerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn edge(mut self, edge: TriggerEdge) -> Self {
        self.edge = edge;
        self
    }

    pub fn timeout_s(mut self, timeout_s: f64) -> Self {
        self.timeout_s = Some(timeout_s);
        self
    }

    /// Library-level receive timeout in milliseconds; `0` blocks
    /// indefinitely.
    pub fn timeout_ms(&self) -> u64 {
        match self.timeout_s {
            Some(t) => (t * 1000.0).round() as u64,
            None => 0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), DaqError> {
        if let Some(t) = self.timeout_s {
            if !(t > 0.0) {
                return Err(DaqError::InvalidPlan(format!(
                    "trigger timeout_s must be positive or None for indefinite wait, got {t}"
                )));
            }
        }
        Ok(())
    }
}

/// Arm the stream trigger on the device.
///
/// Writes the extended-feature register sequence for the requested mode,
/// points the stream-trigger-index register at the trigger channel, and
/// switches the link to all-or-nothing scan returns with the requested
/// receive timeout. Not retried on failure; the caller must re-arm from
/// scratch.
pub fn arm<L: DeviceLink>(link: &mut L, spec: &TriggerSpec) -> Result<(), DaqError> {
    spec.validate()?;

    let address = link.resolve_address(&spec.channel).map_err(|e| match e {
        LinkError::NotOpen => DaqError::NoConnection,
        e => DaqError::ChannelResolution {
            name: spec.channel.clone(),
            source: e,
        },
    })?;
    debug!("trigger channel {} resolved to address {address}", spec.channel);

    let arm_err = |e| DaqError::from_link(Phase::Arm, e);

    // Clear any previous extended-feature configuration before touching
    // the index registers.
    link.write_register(&format!("{}_EF_ENABLE", spec.channel), 0u32.into())
        .map_err(arm_err)?;

    let ef_index = spec.mode.ef_index(spec.edge);
    let mut registers: Vec<(String, RegisterValue)> = vec![
        (format!("{}_EF_INDEX", spec.channel), ef_index.into()),
        ("STREAM_TRIGGER_INDEX".to_string(), address.into()),
    ];
    if spec.mode == TriggerMode::ConditionalReset {
        registers.push((
            format!("{}_EF_CONFIG_A", spec.channel),
            u32::from(spec.edge).into(),
        ));
    }
    link.write_registers(&registers).map_err(arm_err)?;

    link.write_register(&format!("{}_EF_ENABLE", spec.channel), 1u32.into())
        .map_err(arm_err)?;

    // Library-level read semantics for gated streams: a read returns a
    // full batch or reports "no scans yet" while the trigger is pending.
    link.set_scan_return_policy(ScanReturnPolicy::AllOrNone)
        .map_err(arm_err)?;
    link.set_receive_timeout_ms(spec.timeout_ms())
        .map_err(arm_err)?;

    info!(
        "armed {:?}/{:?} trigger on {} (ef_index {ef_index}, timeout {} ms)",
        spec.mode,
        spec.edge,
        spec.channel,
        spec.timeout_ms()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mock::MockLink;
    use crate::link::{DeviceKind, Transport};

    fn link() -> MockLink {
        MockLink::open(DeviceKind::T7, Transport::Ethernet, "192.168.1.128")
    }

    #[test]
    fn conditional_reset_writes_full_sequence() {
        let mut link = link();
        let spec = TriggerSpec::new("DIO0");
        arm(&mut link, &spec).unwrap();

        let names: Vec<&str> = link.writes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "DIO0_EF_ENABLE",
                "DIO0_EF_INDEX",
                "STREAM_TRIGGER_INDEX",
                "DIO0_EF_CONFIG_A",
                "DIO0_EF_ENABLE",
            ]
        );
        assert_eq!(link.writes[0].1, RegisterValue::U32(0));
        assert_eq!(link.last_write("DIO0_EF_INDEX"), Some(RegisterValue::U32(12)));
        // Rising edge applied through EF_CONFIG_A.
        assert_eq!(
            link.last_write("DIO0_EF_CONFIG_A"),
            Some(RegisterValue::U32(1))
        );
        // Trigger index points at DIO0's address.
        assert_eq!(
            link.last_write("STREAM_TRIGGER_INDEX"),
            Some(RegisterValue::U32(2000))
        );
        assert_eq!(link.last_write("DIO0_EF_ENABLE"), Some(RegisterValue::U32(1)));
        assert_eq!(link.scan_return_policy, Some(ScanReturnPolicy::AllOrNone));
    }

    #[test]
    fn frequency_in_selects_index_by_edge() {
        let mut link = link();
        let spec = TriggerSpec::new("DIO2").mode(TriggerMode::FrequencyIn);
        arm(&mut link, &spec).unwrap();
        assert_eq!(link.last_write("DIO2_EF_INDEX"), Some(RegisterValue::U32(3)));

        let mut link2 = self::link();
        arm(
            &mut link2,
            &TriggerSpec::new("DIO2")
                .mode(TriggerMode::FrequencyIn)
                .edge(TriggerEdge::Falling),
        )
        .unwrap();
        assert_eq!(
            link2.last_write("DIO2_EF_INDEX"),
            Some(RegisterValue::U32(4))
        );
    }

    #[test]
    fn pulse_width_ignores_edge() {
        for edge in [TriggerEdge::Rising, TriggerEdge::Falling] {
            let mut link = link();
            let spec = TriggerSpec::new("DIO1")
                .mode(TriggerMode::PulseWidthIn)
                .edge(edge);
            arm(&mut link, &spec).unwrap();
            assert_eq!(
                link.last_write("DIO1_EF_INDEX"),
                Some(RegisterValue::U32(5))
            );
            assert_eq!(link.last_write("DIO1_EF_CONFIG_A"), None);
        }
    }

    #[test]
    fn timeout_converts_to_milliseconds() {
        let mut bounded = link();
        arm(&mut bounded, &TriggerSpec::new("DIO0").timeout_s(2.5)).unwrap();
        assert_eq!(bounded.receive_timeout_ms, Some(2500));

        let mut indefinite = link();
        arm(&mut indefinite, &TriggerSpec::new("DIO0")).unwrap();
        assert_eq!(indefinite.receive_timeout_ms, Some(0));
    }

    #[test]
    fn unknown_channel_fails_resolution() {
        let mut link = link();
        let err = arm(&mut link, &TriggerSpec::new("DIO99")).unwrap_err();
        assert!(matches!(err, DaqError::ChannelResolution { .. }));
        // Nothing was written before resolution failed.
        assert!(link.writes.is_empty());
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        let mut link = link();
        let err = arm(&mut link, &TriggerSpec::new("DIO0").timeout_s(0.0)).unwrap_err();
        assert!(matches!(err, DaqError::InvalidPlan(_)));
    }
}
