use std::sync::Arc;

use daqbridge_sdk::{FunctionBlock, InputPort};
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

use super::{Description, Handled, HelpEntry, KindHandler, Listing, entry, pick, signal_entry};
use crate::object::DaqObject;

pub struct FunctionBlockHandler;

fn port_entry(port: &InputPort) -> String {
    let signal = port
        .signal()
        .map(|s| s.global_id().to_string())
        .unwrap_or_else(|| "<disconnected>".to_string());
    format!("Name: {}, Signal: {signal}", port.name())
}

fn non_empty(item: &str, value: &str) -> DaqResult<Description> {
    if value.is_empty() {
        return Err(DaqError::not_available(item));
    }
    Ok(Description::labeled(item, value))
}

fn describe_block(block: &FunctionBlock, item: &str) -> Option<DaqResult<Description>> {
    let fb_type = block.function_block_type();
    let described = match item {
        "name" => non_empty(item, &fb_type.name),
        "id" => non_empty(item, &fb_type.id),
        "description" => non_empty(item, &fb_type.description),
        "global-id" => Ok(Description::labeled(item, block.global_id())),
        _ => return None,
    };
    Some(described)
}

fn listing(block: &FunctionBlock, class: &str) -> Option<Vec<String>> {
    let entries = match class {
        "signals" | "signal" => block
            .signals()
            .iter()
            .filter(|s| s.descriptor().is_some())
            .map(|s| signal_entry(s))
            .collect(),
        "input-ports" | "input-port" => block.input_ports().iter().map(|p| port_entry(p)).collect(),
        _ => return None,
    };
    Some(entries)
}

const HELP: &[HelpEntry] = &[
    entry("list signals|input-ports", "List output signals or input ports"),
    entry("getCount signals|input-ports", "Number of output signals or input ports"),
    entry("select signal|input-port <i>", "Select an output signal or input port"),
    entry("select status-signal 0", "Select the status signal"),
    entry("print name|id|description", "Print function block type information"),
    entry("print global-id", "Print the global id of the block"),
];

impl KindHandler for FunctionBlockHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::FunctionBlock
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        match obj.as_block() {
            Ok(block) => describe_block(block, item),
            Err(e) => Some(Err(e)),
        }
    }

    fn list(&self, obj: &DaqObject, class: &str) -> Handled<Listing> {
        match obj.as_block() {
            Ok(block) => listing(block, class).map(|items| Ok(Listing::Items(items))),
            Err(e) => Some(Err(e)),
        }
    }

    fn select(&self, obj: &DaqObject, class: &str, index: usize) -> Handled<DaqObject> {
        let block: &Arc<FunctionBlock> = match obj.as_block() {
            Ok(block) => block,
            Err(e) => return Some(Err(e)),
        };
        let selected = match class {
            "signals" | "signal" => {
                let signals: Vec<_> = block.signals().into_iter().filter(|s| s.descriptor().is_some()).collect();
                pick(&signals, index).map(DaqObject::Signal)
            }
            "input-ports" | "input-port" => pick(&block.input_ports(), index).map(DaqObject::InputPort),
            "status-signal" => Ok(DaqObject::Signal(block.status_signal())),
            _ => return None,
        };
        Some(selected)
    }

    fn count(&self, obj: &DaqObject, class: &str) -> Handled<usize> {
        match obj.as_block() {
            Ok(block) => listing(block, class).map(|items| Ok(items.len())),
            Err(e) => Some(Err(e)),
        }
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
