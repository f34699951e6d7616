//! Devices: the nodes of the object tree. A device owns sub-devices,
//! channels, function blocks and a sync component, and creates new
//! children through the shared [`ModuleManager`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use daqbridge_types::{DaqError, DaqResult};
use parking_lot::RwLock;
use tracing::info;

use crate::function_block::{FunctionBlock, FunctionBlockType};
use crate::module::{DeviceContext, ModuleManager};
use crate::property::{Property, PropertyObject};
use crate::signal::Signal;
use crate::sync::SyncComponent;

/// Names of the device-information fields, as exposed to callers.
pub const INFO_FIELDS: [&str; 8] = [
    "name",
    "location",
    "model",
    "serial-number",
    "platform",
    "firmware-version",
    "connection-string",
    "manufacturer",
];

/// Identification of a device, either connected or discoverable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub location: String,
    pub model: String,
    pub serial_number: String,
    pub platform: String,
    pub firmware_version: String,
    pub connection_string: String,
    pub manufacturer: String,
}

impl DeviceInfo {
    /// Look up a field by its exposed name (see [`INFO_FIELDS`]).
    pub fn field(&self, item: &str) -> Option<&str> {
        let value = match item {
            "name" => &self.name,
            "location" => &self.location,
            "model" => &self.model,
            "serial-number" => &self.serial_number,
            "platform" => &self.platform,
            "firmware-version" => &self.firmware_version,
            "connection-string" => &self.connection_string,
            "manufacturer" => &self.manufacturer,
            _ => return None,
        };
        Some(value)
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        INFO_FIELDS
            .iter()
            .map(|&name| (name, self.field(name).unwrap_or_default().to_string()))
            .collect()
    }

    /// Read-only property view of the fields.
    pub fn info_object(&self) -> PropertyObject {
        let obj = PropertyObject::new("DeviceInfo");
        for (name, value) in self.fields() {
            obj.add_property(Property::string(name, &value).read_only());
        }
        obj
    }
}

pub struct Device {
    local_id: String,
    global_id: String,
    info: RwLock<DeviceInfo>,
    properties: PropertyObject,
    sync: SyncComponent,
    modules: Arc<ModuleManager>,
    devices: RwLock<Vec<Arc<Device>>>,
    channels: RwLock<Vec<Arc<FunctionBlock>>>,
    function_blocks: RwLock<Vec<Arc<FunctionBlock>>>,
    signals: RwLock<Vec<Arc<Signal>>>,
    fb_counter: AtomicUsize,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("global_id", &self.global_id).finish()
    }
}

impl Device {
    /// A device nested at `{parent_global_id}/Dev/{local_id}`.
    pub fn new(parent_global_id: &str, local_id: &str, info: DeviceInfo, modules: Arc<ModuleManager>) -> Self {
        Self::build(format!("{parent_global_id}/Dev/{local_id}"), local_id, info, modules)
    }

    /// The root of a tree, at `/{local_id}`.
    pub fn new_root(local_id: &str, info: DeviceInfo, modules: Arc<ModuleManager>) -> Self {
        Self::build(format!("/{local_id}"), local_id, info, modules)
    }

    fn build(global_id: String, local_id: &str, info: DeviceInfo, modules: Arc<ModuleManager>) -> Self {
        Self {
            local_id: local_id.to_string(),
            global_id,
            info: RwLock::new(info),
            properties: PropertyObject::new("Device"),
            sync: SyncComponent::new(),
            modules,
            devices: RwLock::new(Vec::new()),
            channels: RwLock::new(Vec::new()),
            function_blocks: RwLock::new(Vec::new()),
            signals: RwLock::new(Vec::new()),
            fb_counter: AtomicUsize::new(0),
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn info(&self) -> DeviceInfo {
        self.info.read().clone()
    }

    pub fn set_location(&self, location: &str) {
        self.info.write().location = location.to_string();
    }

    pub fn properties(&self) -> &PropertyObject {
        &self.properties
    }

    pub fn sync_component(&self) -> &SyncComponent {
        &self.sync
    }

    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }

    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.read().clone()
    }

    pub fn channels(&self) -> Vec<Arc<FunctionBlock>> {
        self.channels.read().clone()
    }

    pub fn add_channel(&self, channel: Arc<FunctionBlock>) {
        self.channels.write().push(channel);
    }

    pub fn function_blocks(&self) -> Vec<Arc<FunctionBlock>> {
        self.function_blocks.read().clone()
    }

    pub fn add_signal(&self, signal: Arc<Signal>) {
        self.signals.write().push(signal);
    }

    /// Signals of this device: its own, then those of its channels and
    /// function blocks. Sub-devices are not included.
    pub fn signals(&self) -> Vec<Arc<Signal>> {
        let mut out = self.signals.read().clone();
        for block in self.channels().iter().chain(self.function_blocks().iter()) {
            out.extend(block.signals());
        }
        out
    }

    /// Every signal in this subtree, sub-devices included.
    pub fn signals_recursive(&self) -> Vec<Arc<Signal>> {
        let mut out = self.signals();
        for device in self.devices() {
            out.extend(device.signals_recursive());
        }
        out
    }

    /// Find a signal anywhere in the subtree by its global id.
    pub fn find_signal(&self, global_id: &str) -> Option<Arc<Signal>> {
        self.signals_recursive().into_iter().find(|s| s.global_id() == global_id)
    }

    pub fn available_devices(&self) -> Vec<DeviceInfo> {
        self.modules.available_devices()
    }

    pub fn available_function_block_types(&self) -> Vec<FunctionBlockType> {
        self.modules.function_block_types()
    }

    /// Connect the device behind `connection_string` as a child.
    ///
    /// # Errors
    ///
    /// [`DaqError::Sdk`] if it is already connected here,
    /// [`DaqError::InvalidId`] if no module accepts it.
    pub fn add_device(&self, connection_string: &str) -> DaqResult<Arc<Device>> {
        if self
            .devices()
            .iter()
            .any(|d| d.info().connection_string == connection_string)
        {
            return Err(DaqError::sdk(format!("Device '{connection_string}' is already connected.")));
        }
        let context = DeviceContext {
            parent_global_id: self.global_id.clone(),
            modules: self.modules.clone(),
        };
        let device = self.modules.create_device(connection_string, &context)?;
        info!(parent = %self.global_id, device = %device.global_id(), connection_string, "device added");
        self.devices.write().push(device.clone());
        Ok(device)
    }

    /// # Errors
    ///
    /// [`DaqError::OutOfBounds`] for a bad index.
    pub fn remove_device_at(&self, index: usize) -> DaqResult<Arc<Device>> {
        let mut devices = self.devices.write();
        if index >= devices.len() {
            return Err(DaqError::OutOfBounds {
                index,
                len: devices.len(),
            });
        }
        let removed = devices.remove(index);
        info!(device = %removed.global_id(), "device removed");
        Ok(removed)
    }

    /// # Errors
    ///
    /// [`DaqError::NotAvailable`] if `device` is not a child of this device.
    pub fn remove_device(&self, device: &Arc<Device>) -> DaqResult<()> {
        let index = self
            .devices()
            .iter()
            .position(|d| Arc::ptr_eq(d, device))
            .ok_or_else(|| DaqError::not_available("device is not a child"))?;
        self.remove_device_at(index).map(|_| ())
    }

    /// Create a function block of `type_id` with a generated local id.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidId`] when no module offers `type_id`.
    pub fn add_function_block(&self, type_id: &str) -> DaqResult<Arc<FunctionBlock>> {
        let n = self.fb_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.add_function_block_with_id(type_id, &format!("{type_id}_{n}"))
    }

    /// # Errors
    ///
    /// [`DaqError::Sdk`] if `local_id` is taken, otherwise as
    /// [`Device::add_function_block`].
    pub fn add_function_block_with_id(&self, type_id: &str, local_id: &str) -> DaqResult<Arc<FunctionBlock>> {
        if self.function_blocks().iter().any(|fb| fb.local_id() == local_id) {
            return Err(DaqError::sdk(format!("Function block '{local_id}' already exists.")));
        }
        let block = self.modules.create_function_block(type_id, &self.global_id, local_id)?;
        info!(parent = %self.global_id, block = %block.global_id(), type_id, "function block added");
        self.function_blocks.write().push(block.clone());
        Ok(block)
    }

    /// # Errors
    ///
    /// [`DaqError::OutOfBounds`] for a bad index.
    pub fn remove_function_block_at(&self, index: usize) -> DaqResult<Arc<FunctionBlock>> {
        let mut blocks = self.function_blocks.write();
        if index >= blocks.len() {
            return Err(DaqError::OutOfBounds {
                index,
                len: blocks.len(),
            });
        }
        let removed = blocks.remove(index);
        for port in removed.input_ports() {
            let _ = port.disconnect();
        }
        info!(block = %removed.global_id(), "function block removed");
        Ok(removed)
    }

    /// # Errors
    ///
    /// [`DaqError::NotAvailable`] if `block` is not a child of this device.
    pub fn remove_function_block(&self, block: &Arc<FunctionBlock>) -> DaqResult<()> {
        let index = self
            .function_blocks()
            .iter()
            .position(|b| Arc::ptr_eq(b, block))
            .ok_or_else(|| DaqError::not_available("function block is not a child"))?;
        self.remove_function_block_at(index).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceConfig, ReferenceModule};

    fn root() -> Device {
        let mut modules = ModuleManager::new();
        modules.register(Box::new(ReferenceModule::new(ReferenceConfig::default())));
        Device::new_root("Root", DeviceInfo::default(), Arc::new(modules))
    }

    #[test]
    fn info_fields_by_exposed_name() {
        let info = DeviceInfo {
            serial_number: "SN1".into(),
            ..DeviceInfo::default()
        };
        assert_eq!(info.field("serial-number"), Some("SN1"));
        assert_eq!(info.field("serialNumber"), None);
        assert_eq!(info.fields().len(), INFO_FIELDS.len());
        assert_eq!(info.info_object().display_value("serial-number").unwrap(), "SN1");
    }

    #[test]
    fn add_and_remove_devices() {
        let root = root();
        let dev = root.add_device("daqref://device0").unwrap();
        assert_eq!(root.devices().len(), 1);
        assert!(root.add_device("daqref://device0").is_err());
        assert_eq!(
            root.add_device("bogus://x").unwrap_err().code(),
            daqbridge_types::ErrorCode::InvalidId
        );
        root.remove_device(&dev).unwrap();
        assert!(root.devices().is_empty());
        assert!(root.remove_device_at(0).is_err());
    }

    #[test]
    fn signals_recursive_reaches_sub_devices() {
        let root = root();
        let dev = root.add_device("daqref://device0").unwrap();
        assert!(root.signals().is_empty());
        let all = root.signals_recursive();
        assert_eq!(all.len(), dev.signals().len());
        let first = all[0].global_id().to_string();
        assert!(root.find_signal(&first).is_some());
    }

    #[test]
    fn function_block_ids_are_generated() {
        let root = root();
        let a = root.add_function_block("RefFBModuleScaling").unwrap();
        let b = root.add_function_block("RefFBModuleScaling").unwrap();
        assert_ne!(a.local_id(), b.local_id());
        assert!(root.add_function_block_with_id("RefFBModuleScaling", a.local_id()).is_err());
        root.remove_function_block(&a).unwrap();
        assert_eq!(root.function_blocks().len(), 1);
    }
}
