use crate::link::LinkError;
use thiserror::Error;

/// Errors surfaced by a stream operation, one variant per phase.
///
/// The transient "no scans yet" condition reported by the link while a
/// trigger is pending never appears here; the read loop swallows it.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Scan parameters could not be turned into a valid plan. Local,
    /// never retried.
    #[error("invalid scan plan: {0}")]
    InvalidPlan(String),

    /// A channel name could not be resolved to a hardware address.
    #[error("unknown channel '{name}': {source}")]
    ChannelResolution {
        name: String,
        #[source]
        source: LinkError,
    },

    /// Writing the baseline stream registers failed.
    #[error("device configuration failed: {0}")]
    DeviceConfiguration(#[source] LinkError),

    /// Arming the stream trigger failed. The caller must re-arm from
    /// scratch; partial trigger state is not retried.
    #[error("trigger configuration failed: {0}")]
    TriggerConfiguration(#[source] LinkError),

    /// The device rejected the start-stream call. No reads were attempted.
    #[error("stream start failed: {0}")]
    StreamStart(#[source] LinkError),

    /// A blocking read failed mid-stream. The drain step still ran.
    #[error("stream read failed: {0}")]
    StreamRead(#[source] LinkError),

    /// The stop-stream call failed. If a read error preceded it, that
    /// error is recorded here so no failure information is lost.
    #[error("stream stop failed: {source}")]
    StreamStop {
        #[source]
        source: LinkError,
        /// Read failure that triggered the drain, if any.
        read_error: Option<Box<DaqError>>,
    },

    /// An operation was attempted without an open device handle.
    #[error("no open device connection")]
    NoConnection,
}

impl DaqError {
    /// Wrap a link failure for the given phase, routing `NotOpen` to
    /// `NoConnection` regardless of where it happened.
    pub(crate) fn from_link(phase: Phase, err: LinkError) -> Self {
        if matches!(err, LinkError::NotOpen) {
            return DaqError::NoConnection;
        }
        match phase {
            Phase::Configure => DaqError::DeviceConfiguration(err),
            Phase::Arm => DaqError::TriggerConfiguration(err),
            Phase::Start => DaqError::StreamStart(err),
            Phase::Read => DaqError::StreamRead(err),
            Phase::Stop => DaqError::StreamStop {
                source: err,
                read_error: None,
            },
        }
    }
}

/// Device-facing phases of a stream operation, used to wrap link errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Configure,
    Arm,
    Start,
    Read,
    Stop,
}
