//! The reference module: simulated devices reachable as
//! `daqref://device0 .. daqref://device{N-1}` and two processing function
//! block types.
//!
//! # Example
//!
//! ```rust
//! use daqbridge_sdk::instance::Instance;
//! use daqbridge_sdk::reference::ReferenceConfig;
//!
//! let instance = Instance::new(ReferenceConfig::default());
//! let device = instance.root().add_device("daqref://device0").unwrap();
//! assert_eq!(device.channels().len(), 2);
//! ```

mod device;
mod function_blocks;

use std::sync::Arc;

use daqbridge_types::{DaqError, DaqResult};

use crate::device::{Device, DeviceInfo};
use crate::function_block::{FunctionBlock, FunctionBlockType};
use crate::module::{DeviceContext, Module};

pub use function_blocks::{SCALING_TYPE_ID, STATISTICS_TYPE_ID};

pub const CONNECTION_PREFIX: &str = "daqref://";

/// Shape of the simulated hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceConfig {
    pub device_count: usize,
    pub channel_count: usize,
    /// Default sample rate of new devices, in Hz.
    pub sample_rate: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            device_count: 2,
            channel_count: 2,
            sample_rate: 1000.0,
        }
    }
}

pub struct ReferenceModule {
    config: ReferenceConfig,
}

impl ReferenceModule {
    pub fn new(config: ReferenceConfig) -> Self {
        Self { config }
    }

    fn device_info(&self, index: usize) -> DeviceInfo {
        DeviceInfo {
            name: format!("Reference device {index}"),
            location: String::new(),
            model: "Reference device".to_string(),
            serial_number: format!("DevSer{index}"),
            platform: "simulated".to_string(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            connection_string: format!("{CONNECTION_PREFIX}device{index}"),
            manufacturer: "daqbridge".to_string(),
        }
    }

    fn device_index(&self, connection_string: &str) -> Option<usize> {
        connection_string
            .strip_prefix(CONNECTION_PREFIX)?
            .strip_prefix("device")?
            .parse::<usize>()
            .ok()
            .filter(|&i| i < self.config.device_count)
    }
}

impl Module for ReferenceModule {
    fn id(&self) -> &str {
        "daqref"
    }

    fn name(&self) -> &str {
        "Reference device module"
    }

    fn available_devices(&self) -> Vec<DeviceInfo> {
        (0..self.config.device_count).map(|i| self.device_info(i)).collect()
    }

    fn accepts_connection_string(&self, connection_string: &str) -> bool {
        connection_string.starts_with(CONNECTION_PREFIX)
    }

    fn create_device(&self, connection_string: &str, context: &DeviceContext) -> DaqResult<Arc<Device>> {
        let index = self
            .device_index(connection_string)
            .ok_or_else(|| DaqError::InvalidId(connection_string.to_string()))?;
        Ok(device::build(index, self.device_info(index), &self.config, context))
    }

    fn function_block_types(&self) -> Vec<FunctionBlockType> {
        function_blocks::types()
    }

    fn create_function_block(
        &self,
        type_id: &str,
        parent_global_id: &str,
        local_id: &str,
    ) -> DaqResult<Arc<FunctionBlock>> {
        match type_id {
            SCALING_TYPE_ID => Ok(function_blocks::scaling(parent_global_id, local_id)),
            STATISTICS_TYPE_ID => Ok(function_blocks::statistics(parent_global_id, local_id)),
            other => Err(DaqError::InvalidId(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_strings_are_bounded_by_device_count() {
        let module = ReferenceModule::new(ReferenceConfig::default());
        assert_eq!(module.device_index("daqref://device1"), Some(1));
        assert_eq!(module.device_index("daqref://device2"), None);
        assert_eq!(module.device_index("daqref://dev0"), None);
        assert!(module.accepts_connection_string("daqref://anything"));
        assert!(!module.accepts_connection_string("daq.opcua://1.2.3.4"));
    }

    #[test]
    fn discovery_lists_every_device() {
        let module = ReferenceModule::new(ReferenceConfig {
            device_count: 3,
            ..ReferenceConfig::default()
        });
        let infos = module.available_devices();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[2].connection_string, "daqref://device2");
        assert_eq!(infos[2].serial_number, "DevSer2");
    }

    #[test]
    fn offers_two_function_block_types() {
        let module = ReferenceModule::new(ReferenceConfig::default());
        let ids: Vec<_> = module.function_block_types().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![SCALING_TYPE_ID.to_string(), STATISTICS_TYPE_ID.to_string()]);
        assert!(module.create_function_block("Nope", "/r", "x").is_err());
    }
}
