//! Input ports of function blocks.

use std::sync::Arc;

use daqbridge_types::{DaqError, DaqResult};
use parking_lot::RwLock;
use tracing::info;

use crate::packet::{Connection, Sample};
use crate::property::PropertyObject;
use crate::signal::Signal;

struct Link {
    signal: Arc<Signal>,
    connection: Arc<Connection>,
}

pub struct InputPort {
    local_id: String,
    global_id: String,
    requires_signal: bool,
    properties: PropertyObject,
    link: RwLock<Option<Link>>,
}

impl InputPort {
    pub fn new(parent_global_id: &str, local_id: &str, requires_signal: bool) -> Arc<Self> {
        Arc::new(Self {
            local_id: local_id.to_string(),
            global_id: format!("{parent_global_id}/IP/{local_id}"),
            requires_signal,
            properties: PropertyObject::new("InputPort"),
            link: RwLock::new(None),
        })
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn name(&self) -> &str {
        &self.local_id
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn requires_signal(&self) -> bool {
        self.requires_signal
    }

    pub fn properties(&self) -> &PropertyObject {
        &self.properties
    }

    /// Connect to `signal`, replacing any previous connection.
    pub fn connect(&self, signal: Arc<Signal>) {
        info!(port = %self.global_id, signal = %signal.global_id(), "input port connected");
        let connection = signal.connect();
        *self.link.write() = Some(Link { signal, connection });
    }

    /// # Errors
    ///
    /// [`DaqError::NotAvailable`] when nothing is connected.
    pub fn disconnect(&self) -> DaqResult<()> {
        match self.link.write().take() {
            Some(link) => {
                info!(port = %self.global_id, signal = %link.signal.global_id(), "input port disconnected");
                Ok(())
            }
            None => Err(DaqError::not_available("input port is not connected")),
        }
    }

    pub fn signal(&self) -> Option<Arc<Signal>> {
        self.link.read().as_ref().map(|l| l.signal.clone())
    }

    /// Pull everything the connected signal has produced so far.
    pub fn drain(&self) -> Vec<Sample> {
        let link = self.link.read();
        match link.as_ref() {
            Some(link) => {
                link.signal.pump();
                link.connection.take(usize::MAX)
            }
            None => Vec::new(),
        }
    }
}
