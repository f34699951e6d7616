//! Blocking readers over signal connections.
//!
//! * [`StreamReader`] returns raw values with their domain ticks.
//! * [`TimeReader`] converts ticks to epoch nanoseconds through the domain
//!   signal's descriptor.
//! * [`MultiReader`] reads the same number of samples from several signals.
//!
//! All readers wait at most `timeout` and return fewer samples instead of
//! failing when the deadline passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::packet::{Connection, Sample};
use crate::signal::Signal;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A value with its absolute timestamp in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    pub value: f64,
    pub timestamp_ns: i64,
}

pub struct StreamReader {
    signal: Arc<Signal>,
    connection: Arc<Connection>,
}

impl StreamReader {
    /// Connect to `signal`. Only samples sent after this call are seen.
    pub fn new(signal: Arc<Signal>) -> Self {
        let connection = signal.connect();
        Self { signal, connection }
    }

    pub fn signal(&self) -> &Arc<Signal> {
        &self.signal
    }

    /// Samples currently queued, after letting the source catch up.
    pub fn available(&self) -> usize {
        self.signal.pump();
        self.connection.available()
    }

    /// Read up to `count` samples, waiting at most `timeout` for them. The
    /// result grows with what arrives, never with `count` alone.
    pub fn read(&self, count: usize, timeout: Duration) -> Vec<Sample> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        loop {
            self.signal.pump();
            out.extend(self.connection.take(count - out.len()));
            if out.len() >= count {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.connection.wait((deadline - now).min(POLL_INTERVAL));
        }
        trace!(signal = %self.signal.global_id(), requested = count, read = out.len(), "stream read");
        out
    }

    fn take(&self, count: usize) -> Vec<Sample> {
        self.connection.take(count)
    }
}

/// Converts domain ticks of one signal into epoch nanoseconds.
fn timestamp(signal: &Signal, tick: i64) -> i64 {
    signal
        .domain_signal()
        .and_then(|d| d.descriptor())
        .and_then(|d| d.tick_to_nanos(tick))
        .unwrap_or(tick)
}

fn to_timed(signal: &Signal, samples: Vec<Sample>) -> Vec<TimedSample> {
    samples
        .into_iter()
        .map(|s| TimedSample {
            value: s.value,
            timestamp_ns: timestamp(signal, s.tick),
        })
        .collect()
}

pub struct TimeReader {
    stream: StreamReader,
}

impl TimeReader {
    pub fn new(signal: Arc<Signal>) -> Self {
        Self {
            stream: StreamReader::new(signal),
        }
    }

    pub fn signal(&self) -> &Arc<Signal> {
        self.stream.signal()
    }

    /// Read up to `count` samples with absolute timestamps. Signals without
    /// a usable domain report their raw ticks.
    pub fn read(&self, count: usize, timeout: Duration) -> Vec<TimedSample> {
        let samples = self.stream.read(count, timeout);
        to_timed(self.stream.signal(), samples)
    }
}

/// Reads equally sized blocks from several signals.
pub struct MultiReader {
    readers: Vec<StreamReader>,
}

impl MultiReader {
    pub fn new(signals: Vec<Arc<Signal>>) -> Self {
        Self {
            readers: signals.into_iter().map(StreamReader::new).collect(),
        }
    }

    pub fn signal_count(&self) -> usize {
        self.readers.len()
    }

    /// Wait until every signal has `count` samples queued or `timeout`
    /// passes, then take the same number from each: `count`, or whatever
    /// the slowest signal has.
    pub fn read(&self, count: usize, timeout: Duration) -> Vec<Vec<TimedSample>> {
        if self.readers.is_empty() {
            return Vec::new();
        }
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self.readers.iter().map(StreamReader::available).min().unwrap_or(0);
            let now = Instant::now();
            if ready >= count || now >= deadline {
                let n = ready.min(count);
                return self
                    .readers
                    .iter()
                    .map(|r| to_timed(r.signal(), r.take(n)))
                    .collect();
            }
            if let Some(first) = self.readers.first() {
                first.connection.wait((deadline - now).min(POLL_INTERVAL));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DataDescriptor, DataRule, SampleType};
    use crate::packet::DataPacket;

    fn pair() -> (Arc<Signal>, Arc<Signal>) {
        let value = Signal::new("/t", "v").with_descriptor(
            DataDescriptor::builder().name("v").sample_type(SampleType::Float64).build(),
        );
        let domain = Signal::new("/t", "d").with_descriptor(
            DataDescriptor::builder()
                .sample_type(SampleType::Int64)
                .rule(DataRule::linear(1, 0))
                .origin("1970-01-01T00:00:10Z")
                .tick_resolution(1, 1000)
                .build(),
        );
        value.set_domain_signal(Some(domain.clone()));
        (value, domain)
    }

    #[test]
    fn stream_read_returns_available_after_timeout() {
        let (value, _) = pair();
        let reader = StreamReader::new(value.clone());
        value.send_packet(&DataPacket::new(vec![1.0, 2.0, 3.0], vec![0, 1, 2]));
        let got = reader.read(5, Duration::from_millis(20));
        assert_eq!(got.len(), 3);
        assert!(reader.read(5, Duration::ZERO).is_empty());
    }

    #[test]
    fn huge_counts_only_allocate_what_arrives() {
        let (value, _) = pair();
        let reader = StreamReader::new(value.clone());
        value.send_packet(&DataPacket::new(vec![1.0, 2.0], vec![0, 1]));
        let got = reader.read(1usize << 40, Duration::ZERO);
        assert_eq!(got.len(), 2);
        assert!(got.capacity() < 1024);
    }

    #[test]
    fn stream_read_stops_at_count() {
        let (value, _) = pair();
        let reader = StreamReader::new(value.clone());
        value.send_packet(&DataPacket::new(vec![1.0, 2.0, 3.0], vec![0, 1, 2]));
        assert_eq!(reader.read(2, Duration::from_secs(1)).len(), 2);
        assert_eq!(reader.read(2, Duration::ZERO).len(), 1);
    }

    #[test]
    fn time_reader_applies_origin_and_resolution() {
        let (value, _) = pair();
        let reader = TimeReader::new(value.clone());
        value.send_packet(&DataPacket::new(vec![4.0], vec![250]));
        let got = reader.read(1, Duration::ZERO);
        assert_eq!(got[0].timestamp_ns, 10_250_000_000);
        assert_eq!(got[0].value, 4.0);
    }

    #[test]
    fn multi_reader_takes_the_common_minimum() {
        let (a, _) = pair();
        let (b, _) = pair();
        let reader = MultiReader::new(vec![a.clone(), b.clone()]);
        a.send_packet(&DataPacket::new(vec![1.0; 5], (0..5).collect()));
        b.send_packet(&DataPacket::new(vec![2.0; 3], (0..3).collect()));
        let blocks = reader.read(4, Duration::from_millis(10));
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.len() == 3));
    }
}
