use clap::Parser;
use env_logger::Env;
use log::info;
use serde::Serialize;
use std::f64::consts::TAU;
use std::path::PathBuf;

use streamjack::{
    load_config_or_default, plan, DeviceLink, MockLink, StreamDriver, StreamResult, SKIP_SENTINEL,
};

/// Offline streaming demo: runs one triggered or untriggered stream
/// operation against a synthetic in-memory device link and prints a JSON
/// summary of the resulting channel records.
#[derive(Parser, Debug)]
#[command(name = "stream-demo")]
#[command(about = "Stream acquisition demo against a synthetic device", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Replace every Nth sample with the device skip sentinel
    #[arg(long, value_name = "N")]
    simulate_skips: Option<usize>,
}

#[derive(Serialize)]
struct ChannelSummary {
    sample_count: usize,
    missing: usize,
    first_timestamp_s: f64,
    last_timestamp_s: f64,
}

#[derive(Serialize)]
struct Summary {
    effective_duration_s: f64,
    per_channel_rate_hz: f64,
    reads: usize,
    skipped_samples: usize,
    channels: Vec<(String, ChannelSummary)>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config_or_default(args.config.as_deref())?;

    let level = args
        .log_level
        .unwrap_or_else(|| config.console.verbosity.clone());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let request = config.to_request()?;
    let mut link = MockLink::open(
        config.device.kind,
        config.device.transport,
        &config.device.identifier,
    );
    seed_synthetic_reads(&mut link, &config, args.simulate_skips)?;

    let result = StreamDriver::new(&mut link)
        .pipelined(config.stream.pipelined)
        .run(&request)?;

    info!(
        "stream finished: {} reads, {} skipped samples",
        result.reads.len(),
        result.skipped_samples
    );
    println!("{}", serde_json::to_string_pretty(&summarize(&result))?);

    link.close()?;
    Ok(())
}

/// Script the mock link with interleaved sine waves matching the plan the
/// driver will derive, plus a few pending-trigger returns when a trigger
/// is configured.
fn seed_synthetic_reads(
    link: &mut MockLink,
    config: &streamjack::AppConfig,
    simulate_skips: Option<usize>,
) -> Result<(), streamjack::DaqError> {
    let channels = &config.stream.channels;
    let plan = plan(
        channels.len(),
        config.stream.duration_s,
        config.stream.total_rate_hz,
        config.stream.scans_per_read,
    )?;

    if config.trigger.is_some() {
        for _ in 0..3 {
            link.push_no_scans();
        }
    }

    let tone_hz = 50.0;
    let mut sample_index = 0usize;
    for read in 0..plan.read_count {
        let mut samples = Vec::with_capacity(plan.scans_per_read * plan.channel_count);
        for scan in 0..plan.scans_per_read {
            let k = read * plan.scans_per_read + scan;
            let t = k as f64 / plan.per_channel_rate_hz;
            for (c, _) in channels.iter().enumerate() {
                let value = match simulate_skips {
                    Some(n) if n > 0 && sample_index % n == n - 1 => SKIP_SENTINEL,
                    _ => (c + 1) as f64 * (TAU * tone_hz * t).sin(),
                };
                samples.push(value);
                sample_index += 1;
            }
        }
        link.push_scans(samples);
    }
    Ok(())
}

fn summarize(result: &StreamResult) -> Summary {
    Summary {
        effective_duration_s: result.plan.effective_duration_s,
        per_channel_rate_hz: result.plan.per_channel_rate_hz,
        reads: result.reads.len(),
        skipped_samples: result.skipped_samples,
        channels: result
            .records
            .iter()
            .map(|(name, record)| {
                let n = record.timestamps.len();
                (
                    name.clone(),
                    ChannelSummary {
                        sample_count: record.sample_count,
                        missing: record.missing_count(),
                        first_timestamp_s: record.timestamps.first().copied().unwrap_or(0.0),
                        last_timestamp_s: if n > 0 { record.timestamps[n - 1] } else { 0.0 },
                    },
                )
            })
            .collect(),
    }
}
