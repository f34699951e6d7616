//! [`DaqObject`] – one SDK object together with the kind it is handled as.

use std::fmt;
use std::sync::Arc;

use daqbridge_sdk::{DataDescriptor, Device, FunctionBlock, InputPort, PropertyObject, Signal, SyncComponent};
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

#[derive(Clone)]
pub enum DaqObject {
    Device(Arc<Device>),
    Channel(Arc<FunctionBlock>),
    FunctionBlock(Arc<FunctionBlock>),
    Signal(Arc<Signal>),
    InputPort(Arc<InputPort>),
    DataDescriptor(Arc<DataDescriptor>),
    SyncComponent(SyncComponent),
    PropertyObject(PropertyObject),
}

impl DaqObject {
    /// Wrap a block as a channel or a plain function block.
    pub fn from_block(block: Arc<FunctionBlock>) -> Self {
        if block.is_channel() {
            DaqObject::Channel(block)
        } else {
            DaqObject::FunctionBlock(block)
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            DaqObject::Device(_) => ObjectKind::Device,
            DaqObject::Channel(_) => ObjectKind::Channel,
            DaqObject::FunctionBlock(_) => ObjectKind::FunctionBlock,
            DaqObject::Signal(_) => ObjectKind::Signal,
            DaqObject::InputPort(_) => ObjectKind::InputPort,
            DaqObject::DataDescriptor(_) => ObjectKind::DataDescriptor,
            DaqObject::SyncComponent(_) => ObjectKind::SyncComponent,
            DaqObject::PropertyObject(_) => ObjectKind::PropertyObject,
        }
    }

    /// The property system behind this object. Descriptors have none.
    pub fn property_object(&self) -> Option<PropertyObject> {
        match self {
            DaqObject::Device(d) => Some(d.properties().clone()),
            DaqObject::Channel(b) | DaqObject::FunctionBlock(b) => Some(b.properties().clone()),
            DaqObject::Signal(s) => Some(s.properties().clone()),
            DaqObject::InputPort(p) => Some(p.properties().clone()),
            DaqObject::SyncComponent(s) => Some(s.properties().clone()),
            DaqObject::PropertyObject(p) => Some(p.clone()),
            DaqObject::DataDescriptor(_) => None,
        }
    }

    fn mismatch(&self, expected: ObjectKind) -> DaqError {
        DaqError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// # Errors
    ///
    /// [`DaqError::TypeMismatch`] for anything but a device.
    pub fn as_device(&self) -> DaqResult<&Arc<Device>> {
        match self {
            DaqObject::Device(d) => Ok(d),
            _ => Err(self.mismatch(ObjectKind::Device)),
        }
    }

    /// Channels are accepted wherever a function block is expected.
    ///
    /// # Errors
    ///
    /// [`DaqError::TypeMismatch`] for anything but a function block or channel.
    pub fn as_block(&self) -> DaqResult<&Arc<FunctionBlock>> {
        match self {
            DaqObject::Channel(b) | DaqObject::FunctionBlock(b) => Ok(b),
            _ => Err(self.mismatch(ObjectKind::FunctionBlock)),
        }
    }

    /// # Errors
    ///
    /// [`DaqError::TypeMismatch`] for anything but a signal.
    pub fn as_signal(&self) -> DaqResult<&Arc<Signal>> {
        match self {
            DaqObject::Signal(s) => Ok(s),
            _ => Err(self.mismatch(ObjectKind::Signal)),
        }
    }

    /// # Errors
    ///
    /// [`DaqError::TypeMismatch`] for anything but an input port.
    pub fn as_input_port(&self) -> DaqResult<&Arc<InputPort>> {
        match self {
            DaqObject::InputPort(p) => Ok(p),
            _ => Err(self.mismatch(ObjectKind::InputPort)),
        }
    }

    /// A signal's current descriptor, or the descriptor object itself.
    ///
    /// # Errors
    ///
    /// [`DaqError::NotAvailable`] for a signal without descriptor,
    /// [`DaqError::TypeMismatch`] for other kinds.
    pub fn descriptor(&self) -> DaqResult<Arc<DataDescriptor>> {
        match self {
            DaqObject::DataDescriptor(d) => Ok(d.clone()),
            DaqObject::Signal(s) => s
                .descriptor()
                .map(Arc::new)
                .ok_or_else(|| DaqError::not_available("signal has no descriptor")),
            _ => Err(self.mismatch(ObjectKind::DataDescriptor)),
        }
    }
}

impl fmt::Debug for DaqObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            DaqObject::Device(d) => d.global_id().to_string(),
            DaqObject::Channel(b) | DaqObject::FunctionBlock(b) => b.global_id().to_string(),
            DaqObject::Signal(s) => s.global_id().to_string(),
            DaqObject::InputPort(p) => p.global_id().to_string(),
            DaqObject::DataDescriptor(d) => d.name.clone(),
            DaqObject::SyncComponent(_) => "sync".to_string(),
            DaqObject::PropertyObject(p) => p.class_name(),
        };
        write!(f, "{}({id})", self.kind())
    }
}
