//! The root of an object tree.

use std::sync::Arc;

use crate::device::{Device, DeviceInfo};
use crate::module::ModuleManager;
use crate::reference::{ReferenceConfig, ReferenceModule};

pub const ROOT_ID: &str = "Instance";

/// Owns the root device and, through it, the module manager.
pub struct Instance {
    root: Arc<Device>,
}

impl Instance {
    /// An instance with only the reference module loaded.
    pub fn new(reference: ReferenceConfig) -> Self {
        let mut modules = ModuleManager::new();
        modules.register(Box::new(ReferenceModule::new(reference)));
        Self::with_modules(modules)
    }

    pub fn with_modules(modules: ModuleManager) -> Self {
        let info = DeviceInfo {
            name: "daqbridge instance".to_string(),
            model: "Instance".to_string(),
            manufacturer: "daqbridge".to_string(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            ..DeviceInfo::default()
        };
        let root = Device::new_root(ROOT_ID, info, Arc::new(modules));
        Self { root: Arc::new(root) }
    }

    pub fn root(&self) -> &Arc<Device> {
        &self.root
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new(ReferenceConfig::default())
    }
}
