//! [`Module`] trait and the [`ModuleManager`] that routes device and
//! function-block creation to whichever module accepts the request.
//!
//! Modules are the only place where concrete devices and blocks are built;
//! the rest of the tree talks to them through the manager.

use std::sync::Arc;

use daqbridge_types::{DaqError, DaqResult};
use tracing::{debug, info};

use crate::device::{Device, DeviceInfo};
use crate::function_block::{FunctionBlock, FunctionBlockType};

/// Where a newly created device is attached.
#[derive(Clone)]
pub struct DeviceContext {
    pub parent_global_id: String,
    pub modules: Arc<ModuleManager>,
}

/// A provider of devices and function block types.
pub trait Module: Send + Sync {
    /// Stable identifier, e.g. `"daqref"`.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Devices this module can currently connect to.
    fn available_devices(&self) -> Vec<DeviceInfo>;

    fn accepts_connection_string(&self, connection_string: &str) -> bool;

    /// Create and initialise the device behind `connection_string`.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidId`] if the connection string names no device of
    /// this module.
    fn create_device(&self, connection_string: &str, context: &DeviceContext) -> DaqResult<Arc<Device>>;

    fn function_block_types(&self) -> Vec<FunctionBlockType>;

    /// # Errors
    ///
    /// [`DaqError::InvalidId`] if `type_id` is not one of
    /// [`Module::function_block_types`].
    fn create_function_block(
        &self,
        type_id: &str,
        parent_global_id: &str,
        local_id: &str,
    ) -> DaqResult<Arc<FunctionBlock>>;
}

#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn Module>) {
        info!(module = module.id(), "module loaded");
        self.modules.push(module);
    }

    pub fn module_ids(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn available_devices(&self) -> Vec<DeviceInfo> {
        self.modules.iter().flat_map(|m| m.available_devices()).collect()
    }

    pub fn function_block_types(&self) -> Vec<FunctionBlockType> {
        self.modules.iter().flat_map(|m| m.function_block_types()).collect()
    }

    /// # Errors
    ///
    /// [`DaqError::InvalidId`] when no module accepts the connection string,
    /// or the accepting module's own error.
    pub fn create_device(&self, connection_string: &str, context: &DeviceContext) -> DaqResult<Arc<Device>> {
        let module = self
            .modules
            .iter()
            .find(|m| m.accepts_connection_string(connection_string))
            .ok_or_else(|| DaqError::InvalidId(connection_string.to_string()))?;
        debug!(module = module.id(), connection_string, "creating device");
        module.create_device(connection_string, context)
    }

    /// # Errors
    ///
    /// [`DaqError::InvalidId`] when no module offers `type_id`.
    pub fn create_function_block(
        &self,
        type_id: &str,
        parent_global_id: &str,
        local_id: &str,
    ) -> DaqResult<Arc<FunctionBlock>> {
        let module = self
            .modules
            .iter()
            .find(|m| m.function_block_types().iter().any(|t| t.id == type_id))
            .ok_or_else(|| DaqError::InvalidId(type_id.to_string()))?;
        debug!(module = module.id(), type_id, local_id, "creating function block");
        module.create_function_block(type_id, parent_global_id, local_id)
    }
}
