//! Signals: named sample streams with a descriptor, an optional domain
//! signal, and any number of connected consumers.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use daqbridge_types::{DaqError, DaqResult};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::descriptor::DataDescriptor;
use crate::packet::{Connection, DataPacket};
use crate::property::PropertyObject;

/// Something that produces packets for a signal on demand.
///
/// Readers call [`Signal::pump`] before they look at their queue; the
/// source then sends whatever samples are due.
pub trait SampleSource: Send + Sync {
    fn pump(&self);
}

pub struct Signal {
    local_id: String,
    global_id: String,
    properties: PropertyObject,
    descriptor: RwLock<Option<DataDescriptor>>,
    domain_signal: RwLock<Option<Arc<Signal>>>,
    related: RwLock<Vec<Arc<Signal>>>,
    public: AtomicBool,
    active: AtomicBool,
    listeners: Mutex<Vec<Weak<Connection>>>,
    source: RwLock<Option<Weak<dyn SampleSource>>>,
    next_sample: AtomicI64,
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("global_id", &self.global_id).finish()
    }
}

impl Signal {
    /// Create a signal below `parent_global_id`.
    pub fn new(parent_global_id: &str, local_id: &str) -> Arc<Self> {
        Arc::new(Self {
            local_id: local_id.to_string(),
            global_id: format!("{parent_global_id}/Sig/{local_id}"),
            properties: PropertyObject::new("Signal"),
            descriptor: RwLock::new(None),
            domain_signal: RwLock::new(None),
            related: RwLock::new(Vec::new()),
            public: AtomicBool::new(true),
            active: AtomicBool::new(true),
            listeners: Mutex::new(Vec::new()),
            source: RwLock::new(None),
            next_sample: AtomicI64::new(0),
        })
    }

    pub fn with_descriptor(self: Arc<Self>, descriptor: DataDescriptor) -> Arc<Self> {
        self.set_descriptor(descriptor);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn properties(&self) -> &PropertyObject {
        &self.properties
    }

    pub fn descriptor(&self) -> Option<DataDescriptor> {
        self.descriptor.read().clone()
    }

    pub fn set_descriptor(&self, descriptor: DataDescriptor) {
        debug!(signal = %self.global_id, name = %descriptor.name, "descriptor changed");
        *self.descriptor.write() = Some(descriptor);
    }

    /// Name from the descriptor, if there is one with a name.
    pub fn name(&self) -> Option<String> {
        self.descriptor.read().as_ref().map(|d| d.name.clone()).filter(|n| !n.is_empty())
    }

    pub fn domain_signal(&self) -> Option<Arc<Signal>> {
        self.domain_signal.read().clone()
    }

    pub fn set_domain_signal(&self, domain: Option<Arc<Signal>>) {
        *self.domain_signal.write() = domain;
    }

    pub fn related_signals(&self) -> Vec<Arc<Signal>> {
        self.related.read().clone()
    }

    pub fn add_related_signal(&self, signal: Arc<Signal>) {
        self.related.write().push(signal);
    }

    pub fn is_public(&self) -> bool {
        self.public.load(Ordering::SeqCst)
    }

    pub fn set_public(&self, public: bool) {
        self.public.store(public, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Attach the producer that [`Signal::pump`] drives. The signal only
    /// keeps a weak reference; the owner keeps the source alive.
    pub fn set_source(&self, source: Weak<dyn SampleSource>) {
        *self.source.write() = Some(source);
    }

    /// Let the attached source produce any samples that are due.
    pub fn pump(&self) {
        let source = self.source.read().as_ref().and_then(Weak::upgrade);
        if let Some(source) = source {
            source.pump();
        }
    }

    /// Register a new consumer queue.
    pub fn connect(&self) -> Arc<Connection> {
        let connection = Arc::new(Connection::new());
        self.listeners.lock().push(Arc::downgrade(&connection));
        connection
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Deliver `packet` to every live consumer. Inactive signals drop their
    /// packets.
    pub fn send_packet(&self, packet: &DataPacket) {
        if !self.is_active() || packet.is_empty() {
            return;
        }
        let mut listeners = self.listeners.lock();
        listeners.retain(|weak| match weak.upgrade() {
            Some(conn) => {
                conn.push(packet);
                true
            }
            None => false,
        });
        trace!(signal = %self.global_id, samples = packet.len(), consumers = listeners.len(), "packet sent");
    }

    /// Send raw values, generating domain ticks from the domain signal's
    /// linear rule and forwarding them to the domain signal.
    ///
    /// # Errors
    ///
    /// [`DaqError::NotAvailable`] when the signal has no descriptor.
    pub fn send_values(&self, values: Vec<f64>) -> DaqResult<()> {
        if self.descriptor.read().is_none() {
            return Err(DaqError::not_available("signal descriptor"));
        }
        let count = values.len() as i64;
        let first = self.next_sample.fetch_add(count, Ordering::SeqCst);
        let domain = self.domain_signal();
        let (delta, start) = domain
            .as_ref()
            .and_then(|d| d.descriptor())
            .and_then(|d| d.rule.linear_parameters())
            .unwrap_or((1, 0));
        let ticks: Vec<i64> = (first..first + count).map(|i| start + i * delta).collect();

        if let Some(domain) = domain {
            domain.send_packet(&DataPacket::new(ticks.iter().map(|&t| t as f64).collect(), ticks.clone()));
        }
        self.send_packet(&DataPacket::new(values, ticks));
        Ok(())
    }
}
