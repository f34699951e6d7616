//! Function blocks and channels.
//!
//! A channel is a function block that belongs to a device's acquisition
//! I/O tree and may carry tags; everything else is shared.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::descriptor::{DataDescriptor, SampleType};
use crate::input_port::InputPort;
use crate::property::{Property, PropertyObject};
use crate::signal::{SampleSource, Signal};
use crate::value::Value;

/// Static description of a function block type offered by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBlockType {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl FunctionBlockType {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    /// Read-only property view used when the type is browsed as an object.
    pub fn info_object(&self) -> PropertyObject {
        PropertyObject::new("FunctionBlockType")
            .with_property(Property::string("Id", &self.id).read_only())
            .with_property(Property::string("Name", &self.name).read_only())
            .with_property(Property::string("Description", &self.description).read_only())
    }
}

pub struct FunctionBlock {
    local_id: String,
    global_id: String,
    fb_type: FunctionBlockType,
    is_channel: bool,
    tags: RwLock<Vec<String>>,
    properties: PropertyObject,
    signals: RwLock<Vec<Arc<Signal>>>,
    input_ports: RwLock<Vec<Arc<InputPort>>>,
    status_signal: Arc<Signal>,
    processor: Mutex<Option<Arc<dyn SampleSource>>>,
}

impl std::fmt::Debug for FunctionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBlock")
            .field("global_id", &self.global_id)
            .field("type", &self.fb_type.id)
            .finish()
    }
}

impl FunctionBlock {
    /// A function block placed at `{parent_global_id}/FB/{local_id}`.
    pub fn new(parent_global_id: &str, local_id: &str, fb_type: FunctionBlockType) -> Self {
        Self::build(format!("{parent_global_id}/FB/{local_id}"), local_id, fb_type, false)
    }

    /// A channel placed at `{parent_global_id}/IO/AI/{local_id}`.
    pub fn new_channel(parent_global_id: &str, local_id: &str, fb_type: FunctionBlockType) -> Self {
        Self::build(format!("{parent_global_id}/IO/AI/{local_id}"), local_id, fb_type, true)
    }

    fn build(global_id: String, local_id: &str, fb_type: FunctionBlockType, is_channel: bool) -> Self {
        let status_signal = Signal::new(&global_id, "Status").with_descriptor(
            DataDescriptor::builder()
                .name("Status")
                .sample_type(SampleType::Int32)
                .build(),
        );
        status_signal.set_public(false);
        let properties = PropertyObject::new(if is_channel { "Channel" } else { "FunctionBlock" })
            .with_property(Property::string("Name", local_id).with_description("User visible name"));
        Self {
            local_id: local_id.to_string(),
            global_id,
            fb_type,
            is_channel,
            tags: RwLock::new(Vec::new()),
            properties,
            signals: RwLock::new(Vec::new()),
            input_ports: RwLock::new(Vec::new()),
            status_signal,
            processor: Mutex::new(None),
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn name(&self) -> String {
        match self.properties.value("Name") {
            Ok(Value::String(name)) if !name.is_empty() => name,
            _ => self.local_id.clone(),
        }
    }

    pub fn function_block_type(&self) -> &FunctionBlockType {
        &self.fb_type
    }

    pub fn is_channel(&self) -> bool {
        self.is_channel
    }

    pub fn properties(&self) -> &PropertyObject {
        &self.properties
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.read().clone()
    }

    pub fn add_tag(&self, tag: &str) {
        let mut tags = self.tags.write();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    /// Output signals; the status signal is not part of this list.
    pub fn signals(&self) -> Vec<Arc<Signal>> {
        self.signals.read().clone()
    }

    pub fn add_signal(&self, signal: Arc<Signal>) {
        self.signals.write().push(signal);
    }

    pub fn input_ports(&self) -> Vec<Arc<InputPort>> {
        self.input_ports.read().clone()
    }

    pub fn add_input_port(&self, port: Arc<InputPort>) {
        self.input_ports.write().push(port);
    }

    pub fn status_signal(&self) -> Arc<Signal> {
        self.status_signal.clone()
    }

    /// Install the processor that feeds this block's output signals and
    /// register it as their source.
    pub fn set_processor(&self, processor: Arc<dyn SampleSource>) {
        for signal in self.signals.read().iter() {
            signal.set_source(Arc::downgrade(&processor));
        }
        *self.processor.lock() = Some(processor);
    }
}
