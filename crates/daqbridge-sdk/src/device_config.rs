//! JSON save/load of a device subtree.
//!
//! Every object in the document carries a `"__type"` tag with its
//! [`ObjectKind`]. Loading connects missing sub-devices, recreates missing
//! function blocks by type, applies property values and finally restores
//! input-port connections by global signal id.

use std::collections::BTreeMap;
use std::sync::Arc;

use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::function_block::FunctionBlock;
use crate::input_port::InputPort;
use crate::value::Value;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceConfig {
    #[serde(rename = "__type")]
    kind: ObjectKind,
    local_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    connection_string: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default)]
    sync_component: BTreeMap<String, Value>,
    #[serde(default)]
    devices: Vec<DeviceConfig>,
    #[serde(default)]
    channels: Vec<BlockConfig>,
    #[serde(default)]
    function_blocks: Vec<BlockConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockConfig {
    #[serde(rename = "__type")]
    kind: ObjectKind,
    local_id: String,
    type_id: String,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default)]
    signals: Vec<SignalConfig>,
    #[serde(default)]
    input_ports: Vec<PortConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalConfig {
    #[serde(rename = "__type")]
    kind: ObjectKind,
    local_id: String,
    public: bool,
    active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortConfig {
    #[serde(rename = "__type")]
    kind: ObjectKind,
    local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signal: Option<String>,
}

fn snapshot_device(device: &Device) -> DeviceConfig {
    let info = device.info();
    DeviceConfig {
        kind: ObjectKind::Device,
        local_id: device.local_id().to_string(),
        connection_string: info.connection_string,
        location: info.location,
        properties: device.properties().writable_values(),
        sync_component: device.sync_component().properties().writable_values(),
        devices: device.devices().iter().map(|d| snapshot_device(d)).collect(),
        channels: device.channels().iter().map(|c| snapshot_block(c)).collect(),
        function_blocks: device.function_blocks().iter().map(|b| snapshot_block(b)).collect(),
    }
}

fn snapshot_block(block: &FunctionBlock) -> BlockConfig {
    BlockConfig {
        kind: if block.is_channel() {
            ObjectKind::Channel
        } else {
            ObjectKind::FunctionBlock
        },
        local_id: block.local_id().to_string(),
        type_id: block.function_block_type().id.clone(),
        properties: block.properties().writable_values(),
        signals: block
            .signals()
            .iter()
            .map(|s| SignalConfig {
                kind: ObjectKind::Signal,
                local_id: s.local_id().to_string(),
                public: s.is_public(),
                active: s.is_active(),
            })
            .collect(),
        input_ports: block
            .input_ports()
            .iter()
            .map(|p| PortConfig {
                kind: ObjectKind::InputPort,
                local_id: p.local_id().to_string(),
                signal: p.signal().map(|s| s.global_id().to_string()),
            })
            .collect(),
    }
}

fn expect_kind(found: ObjectKind, expected: &[ObjectKind]) -> DaqResult<()> {
    if expected.contains(&found) {
        Ok(())
    } else {
        Err(DaqError::TypeMismatch {
            expected: expected[0],
            found,
        })
    }
}

type PendingConnections = Vec<(Arc<InputPort>, String)>;

fn apply_device(device: &Device, config: &DeviceConfig, pending: &mut PendingConnections) -> DaqResult<()> {
    expect_kind(config.kind, &[ObjectKind::Device])?;
    device.set_location(&config.location);
    device.properties().apply_values(&config.properties)?;
    device.sync_component().properties().apply_values(&config.sync_component)?;

    for child in &config.devices {
        let existing = device
            .devices()
            .into_iter()
            .find(|d| d.info().connection_string == child.connection_string);
        let target = match existing {
            Some(d) => d,
            None => device.add_device(&child.connection_string)?,
        };
        apply_device(&target, child, pending)?;
    }

    for channel in &config.channels {
        match device.channels().into_iter().find(|c| c.local_id() == channel.local_id) {
            Some(c) => apply_block(&c, channel, pending)?,
            None => warn!(device = %device.global_id(), channel = %channel.local_id, "channel missing, skipped"),
        }
    }

    for block in &config.function_blocks {
        let existing = device
            .function_blocks()
            .into_iter()
            .find(|b| b.local_id() == block.local_id);
        let target = match existing {
            Some(b) => b,
            None => device.add_function_block_with_id(&block.type_id, &block.local_id)?,
        };
        apply_block(&target, block, pending)?;
    }
    Ok(())
}

fn apply_block(block: &FunctionBlock, config: &BlockConfig, pending: &mut PendingConnections) -> DaqResult<()> {
    expect_kind(config.kind, &[ObjectKind::FunctionBlock, ObjectKind::Channel])?;
    block.properties().apply_values(&config.properties)?;

    for sig_cfg in &config.signals {
        expect_kind(sig_cfg.kind, &[ObjectKind::Signal])?;
        if let Some(signal) = block.signals().into_iter().find(|s| s.local_id() == sig_cfg.local_id) {
            signal.set_public(sig_cfg.public);
            signal.set_active(sig_cfg.active);
        }
    }

    for port_cfg in &config.input_ports {
        expect_kind(port_cfg.kind, &[ObjectKind::InputPort])?;
        let Some(port) = block.input_ports().into_iter().find(|p| p.local_id() == port_cfg.local_id) else {
            continue;
        };
        match &port_cfg.signal {
            Some(id) => pending.push((port, id.clone())),
            None => {
                let _ = port.disconnect();
            }
        }
    }
    Ok(())
}

impl Device {
    /// Serialize this subtree.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidJson`] if a property value cannot be serialized.
    pub fn save_configuration(&self) -> DaqResult<String> {
        serde_json::to_string_pretty(&snapshot_device(self)).map_err(|e| DaqError::InvalidJson(e.to_string()))
    }

    /// Apply a document produced by [`Device::save_configuration`].
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidJson`] for malformed documents; creation and
    /// validation errors of the objects being restored otherwise.
    pub fn load_configuration(&self, json: &str) -> DaqResult<()> {
        let config: DeviceConfig = serde_json::from_str(json).map_err(|e| DaqError::InvalidJson(e.to_string()))?;
        let mut pending = Vec::new();
        apply_device(self, &config, &mut pending)?;

        for (port, signal_id) in pending {
            match self.find_signal(&signal_id) {
                Some(signal) => port.connect(signal),
                None => warn!(port = %port.global_id(), signal = %signal_id, "saved connection target not found"),
            }
        }
        info!(device = %self.global_id(), "configuration loaded");
        debug!(bytes = json.len(), "configuration document size");
        Ok(())
    }
}
