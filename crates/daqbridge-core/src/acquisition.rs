//! Per-signal sample buffers and timestamp formatting.
//!
//! A [`SampleBuffer`] belongs to one signal handle. It is uninitialised
//! until the first [`SampleBuffer::read`], holds the samples of the most
//! recent read afterwards, and is uninitialised again after
//! [`SampleBuffer::erase`]. The stream reader is created on the first read
//! and kept, so consecutive reads return consecutive samples.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use daqbridge_sdk::{Signal, TimeReader, TimedSample};
use daqbridge_types::{DaqError, DaqResult};
use tracing::debug;

/// Largest sample count a single read, multi read or test packet accepts.
pub const MAX_READ_COUNT: usize = 1 << 24;

/// Reject counts above [`MAX_READ_COUNT`].
///
/// # Errors
///
/// [`DaqError::InvalidValue`] naming the count.
pub fn check_count(count: usize) -> DaqResult<usize> {
    if count > MAX_READ_COUNT {
        return Err(DaqError::InvalidValue {
            item: "count".to_string(),
            value: count.to_string(),
        });
    }
    Ok(count)
}

#[derive(Default)]
pub struct SampleBuffer {
    reader: Option<TimeReader>,
    readings: Vec<f64>,
    timestamps: Vec<i64>,
    initialized: bool,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer with up to `count` samples read from `signal`
    /// within `timeout`. Returns how many samples were read.
    pub fn read(&mut self, signal: &Arc<Signal>, count: usize, timeout: Duration) -> usize {
        let reader = self.reader.get_or_insert_with(|| TimeReader::new(signal.clone()));
        let samples: Vec<TimedSample> = reader.read(count, timeout);
        debug!(signal = %signal.global_id(), requested = count, read = samples.len(), "samples read");
        self.readings = samples.iter().map(|s| s.value).collect();
        self.timestamps = samples.iter().map(|s| s.timestamp_ns).collect();
        self.initialized = true;
        samples.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn check(&self) -> DaqResult<()> {
        if self.initialized { Ok(()) } else { Err(DaqError::Uninitialized) }
    }

    /// # Errors
    ///
    /// [`DaqError::Uninitialized`] before the first read or after an erase.
    pub fn read_count(&self) -> DaqResult<usize> {
        self.check().map(|_| self.readings.len())
    }

    /// The whole buffer. Valid until the next read or erase.
    pub fn readings(&self) -> DaqResult<&[f64]> {
        self.check().map(|_| self.readings.as_slice())
    }

    pub fn timestamps(&self) -> DaqResult<&[i64]> {
        self.check().map(|_| self.timestamps.as_slice())
    }

    /// Copy at most `out.len()` readings into `out`; returns how many were
    /// copied.
    pub fn copy_readings(&self, out: &mut [f64]) -> DaqResult<usize> {
        copy_prefix(self.readings()?, out)
    }

    pub fn copy_timestamps(&self, out: &mut [i64]) -> DaqResult<usize> {
        copy_prefix(self.timestamps()?, out)
    }

    /// Drop the buffered samples. The reader stays connected.
    pub fn erase(&mut self) {
        self.readings.clear();
        self.timestamps.clear();
        self.initialized = false;
    }
}

fn copy_prefix<T: Copy>(src: &[T], out: &mut [T]) -> DaqResult<usize> {
    let n = src.len().min(out.len());
    out[..n].copy_from_slice(&src[..n]);
    Ok(n)
}

/// Render nanoseconds since the Unix epoch as
/// `YYYY-MM-DD HH:MM:SS.fffffff` in UTC.
pub fn format_timestamp(ns: i64) -> String {
    let secs = ns.div_euclid(1_000_000_000);
    let nanos = ns.rem_euclid(1_000_000_000) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(t) => format!("{}.{:07}", t.format("%Y-%m-%d %H:%M:%S"), nanos / 100),
        None => format!("{ns}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqbridge_sdk::descriptor::{DataDescriptor, DataRule, SampleType};
    use daqbridge_types::ErrorCode;

    fn signal_pair() -> Arc<Signal> {
        let value = Signal::new("/t", "v")
            .with_descriptor(DataDescriptor::builder().name("v").sample_type(SampleType::Float64).build());
        let domain = Signal::new("/t", "d").with_descriptor(
            DataDescriptor::builder()
                .sample_type(SampleType::Int64)
                .rule(DataRule::linear(1, 0))
                .tick_resolution(1, 1_000_000)
                .build(),
        );
        value.set_domain_signal(Some(domain));
        value
    }

    #[test]
    fn buffer_lifecycle() {
        let signal = signal_pair();
        let mut buffer = SampleBuffer::new();
        assert_eq!(buffer.read_count().unwrap_err().code(), ErrorCode::Uninitialized);

        // First read connects; nothing was sent before that.
        assert_eq!(buffer.read(&signal, 20, Duration::ZERO), 0);
        signal.send_values((0..30).map(f64::from).collect()).unwrap();
        assert_eq!(buffer.read(&signal, 20, Duration::from_millis(50)), 20);
        assert_eq!(buffer.read_count().unwrap(), 20);

        let mut wide = [0.0; 50];
        assert_eq!(buffer.copy_readings(&mut wide).unwrap(), 20);
        assert_eq!(wide[19], 19.0);
        assert_eq!(wide[20], 0.0);

        let mut narrow = [0i64; 5];
        assert_eq!(buffer.copy_timestamps(&mut narrow).unwrap(), 5);
        assert_eq!(narrow[4], 4_000);

        // The next read continues where the last one stopped.
        assert_eq!(buffer.read(&signal, 20, Duration::from_millis(10)), 10);
        assert_eq!(buffer.readings().unwrap()[0], 20.0);

        buffer.erase();
        assert!(!buffer.is_initialized());
        assert!(buffer.timestamps().is_err());
    }

    #[test]
    fn counts_above_the_limit_are_rejected() {
        assert_eq!(check_count(MAX_READ_COUNT).unwrap(), MAX_READ_COUNT);
        let err = check_count(MAX_READ_COUNT + 1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Generic);
        assert!(err.to_string().contains("'count'"));
    }

    #[test]
    fn timestamps_render_with_100ns_digits() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.0000000");
        assert_eq!(format_timestamp(1_700_000_000_123_456_789), "2023-11-14 22:13:20.1234567");
        assert_eq!(format_timestamp(-100), "1969-12-31 23:59:59.9999999");
    }
}
