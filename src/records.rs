use crate::link::SKIP_SENTINEL;
use indexmap::IndexMap;
use ndarray::Array1;
use serde::Serialize;

/// One channel's time series after deinterleaving.
///
/// `values` and `timestamps` always have the same length; skipped samples
/// are NaN rather than dropped, so positions stay time-aligned across
/// channels.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRecord {
    pub channel_name: String,
    /// Measured values in scan order, NaN where the device skipped.
    pub values: Array1<f64>,
    /// Seconds since stream start, `k / per_channel_rate_hz` for scan `k`.
    pub timestamps: Array1<f64>,
    pub sample_count: usize,
}

impl ChannelRecord {
    /// Number of missing (skipped) samples in this record.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Count skip-sentinel samples in a raw interleaved buffer.
pub fn count_sentinels(samples: &[f64]) -> usize {
    samples.iter().filter(|&&v| v == SKIP_SENTINEL).count()
}

/// Deinterleave a flat sample buffer into per-channel records.
///
/// Sample `i` belongs to channel `i % N` at scan index `i / N`, with the
/// channel order fixed by `channel_names`. Skip sentinels become NaN. Every
/// record comes out with the same length: at least `min_scans` if given,
/// and whole scans covering the buffer otherwise, padding ragged tails
/// with NaN. The padding path is defensive; a stream that completed all
/// its reads delivers an exact multiple of the channel count.
pub fn reassemble(
    samples: &[f64],
    channel_names: &[String],
    per_channel_rate_hz: f64,
    min_scans: Option<usize>,
) -> IndexMap<String, ChannelRecord> {
    let channel_count = channel_names.len();
    if channel_count == 0 {
        return IndexMap::new();
    }

    let covered_scans = samples.len().div_ceil(channel_count);
    let scans = covered_scans.max(min_scans.unwrap_or(0));

    let mut records = IndexMap::with_capacity(channel_count);
    for (c, name) in channel_names.iter().enumerate() {
        let mut values = Vec::with_capacity(scans);
        for k in 0..scans {
            let value = match samples.get(k * channel_count + c) {
                Some(&v) if v == SKIP_SENTINEL => f64::NAN,
                Some(&v) => v,
                None => f64::NAN,
            };
            values.push(value);
        }
        let timestamps: Vec<f64> = (0..scans).map(|k| k as f64 / per_channel_rate_hz).collect();

        records.insert(
            name.clone(),
            ChannelRecord {
                channel_name: name.clone(),
                values: Array1::from_vec(values),
                timestamps: Array1::from_vec(timestamps),
                sample_count: scans,
            },
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_trips_interleaved_channels() {
        let ain0 = [0.0, 1.0, 2.0, 3.0];
        let ain1 = [10.0, 11.0, 12.0, 13.0];
        let flat: Vec<f64> = ain0
            .iter()
            .zip(ain1.iter())
            .flat_map(|(&a, &b)| [a, b])
            .collect();

        let records = reassemble(&flat, &names(&["AIN0", "AIN1"]), 100.0, None);
        assert_eq!(records.len(), 2);
        // Insertion order follows the scan list.
        let keys: Vec<&String> = records.keys().collect();
        assert_eq!(keys, vec!["AIN0", "AIN1"]);
        assert_eq!(records["AIN0"].values.to_vec(), ain0.to_vec());
        assert_eq!(records["AIN1"].values.to_vec(), ain1.to_vec());
    }

    #[test]
    fn timestamps_follow_scan_rate() {
        let flat = vec![0.0; 6];
        let records = reassemble(&flat, &names(&["AIN0", "AIN1", "AIN2"]), 50.0, None);
        let t = &records["AIN1"].timestamps;
        assert_eq!(t.to_vec(), vec![0.0, 0.02]);
        assert_eq!(records["AIN1"].sample_count, 2);
    }

    #[test]
    fn sentinels_become_nan_and_are_counted() {
        let flat = vec![1.0, SKIP_SENTINEL, SKIP_SENTINEL, 2.0, 3.0, 4.0];
        assert_eq!(count_sentinels(&flat), 2);

        let records = reassemble(&flat, &names(&["AIN0", "AIN1"]), 1000.0, None);
        let total_missing: usize = records.values().map(|r| r.missing_count()).sum();
        assert_eq!(total_missing, count_sentinels(&flat));

        // The sentinel slots stay positionally aligned.
        assert!(records["AIN1"].values[0].is_nan());
        assert!(records["AIN0"].values[1].is_nan());
        assert_eq!(records["AIN0"].values[0], 1.0);
        assert_eq!(records["AIN1"].values[2], 4.0);
    }

    #[test]
    fn ragged_tail_pads_with_nan() {
        // 5 samples over 2 channels: AIN1 is short one sample.
        let flat = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let records = reassemble(&flat, &names(&["AIN0", "AIN1"]), 10.0, None);
        assert_eq!(records["AIN0"].sample_count, 3);
        assert_eq!(records["AIN1"].sample_count, 3);
        assert_eq!(records["AIN0"].values[2], 5.0);
        assert!(records["AIN1"].values[2].is_nan());
    }

    #[test]
    fn min_scans_pads_under_delivery() {
        let flat = vec![1.0, 2.0];
        let records = reassemble(&flat, &names(&["AIN0", "AIN1"]), 10.0, Some(4));
        for record in records.values() {
            assert_eq!(record.sample_count, 4);
            assert_eq!(record.values.len(), record.timestamps.len());
        }
        assert!(records["AIN0"].values[3].is_nan());
    }

    #[test]
    fn empty_channel_list_yields_no_records() {
        let records = reassemble(&[1.0, 2.0], &[], 10.0, None);
        assert!(records.is_empty());
    }
}
