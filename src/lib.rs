pub mod config;
pub mod error;
pub mod link;
pub mod plan;
pub mod records;
pub mod stream;
pub mod trigger;

pub use config::{load_config, load_config_or_default, AppConfig};
pub use error::DaqError;
pub use link::mock::MockLink;
pub use link::{
    DeviceKind, DeviceLink, LinkError, RegisterValue, ScanBatch, ScanReturnPolicy, Transport,
    SKIP_SENTINEL,
};
pub use plan::{plan, ScanPlan};
pub use records::{count_sentinels, reassemble, ChannelRecord};
pub use stream::{
    stream, ReadStats, StreamDriver, StreamPhase, StreamRequest, StreamRequestBuilder,
    StreamResult,
};
pub use trigger::{arm, TriggerEdge, TriggerMode, TriggerSpec};
