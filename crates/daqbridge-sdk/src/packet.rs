//! Data packets and the per-consumer queues they are delivered into.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

/// Samples one consumer queue holds before the oldest are dropped.
pub const QUEUE_CAPACITY: usize = 1 << 20;

/// One sample together with its domain tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub tick: i64,
}

/// A block of samples sent by a signal. `ticks` is either empty or exactly
/// as long as `values`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPacket {
    pub values: Vec<f64>,
    pub ticks: Vec<i64>,
}

impl DataPacket {
    pub fn new(values: Vec<f64>, ticks: Vec<i64>) -> Self {
        Self { values, ticks }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.values.iter().enumerate().map(|(i, &value)| Sample {
            value,
            tick: self.ticks.get(i).copied().unwrap_or(0),
        })
    }
}

/// Bounded queue between one signal and one consumer. When a consumer falls
/// behind by more than the capacity, the oldest samples are dropped.
#[derive(Debug)]
pub struct Connection {
    queue: Mutex<VecDeque<Sample>>,
    ready: Condvar,
    capacity: usize,
}

impl Default for Connection {
    fn default() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&self, packet: &DataPacket) {
        let mut queue = self.queue.lock();
        queue.extend(packet.samples());
        let overflow = queue.len().saturating_sub(self.capacity);
        if overflow > 0 {
            queue.drain(..overflow);
            debug!(dropped = overflow, capacity = self.capacity, "consumer queue full, oldest samples dropped");
        }
        drop(queue);
        self.ready.notify_all();
    }

    pub fn available(&self) -> usize {
        self.queue.lock().len()
    }

    /// Pop up to `max` samples.
    pub fn take(&self, max: usize) -> Vec<Sample> {
        let mut queue = self.queue.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Block until a push happens or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Duration) {
        let mut queue: MutexGuard<'_, VecDeque<Sample>> = self.queue.lock();
        self.ready.wait_for(&mut queue, timeout);
    }
}
