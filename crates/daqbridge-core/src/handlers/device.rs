use std::sync::Arc;

use daqbridge_sdk::Device;
use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use tracing::info;

use super::{
    CommandContext, CommandOutcome, Description, Handled, HelpEntry, KindHandler, Listing, entry, parse_index, pick,
    signal_entry,
};
use crate::object::DaqObject;

pub struct DeviceHandler;

fn device(obj: &DaqObject) -> DaqResult<&Arc<Device>> {
    obj.as_device()
}

fn device_entry(name: &str, serial: &str, connection: &str) -> String {
    format!("Name: {name}, Serial number: {serial}, Connection string: {connection}")
}

fn block_entry(name: &str, id: &str) -> String {
    format!("Name: {name}, Unique ID: {id}")
}

/// Classes that hold something that can be listed, counted and selected.
fn listing(dev: &Device, class: &str) -> Option<Vec<String>> {
    let entries = match class {
        "devices" | "device" => dev
            .devices()
            .iter()
            .map(|d| {
                let i = d.info();
                device_entry(&i.name, &i.serial_number, &i.connection_string)
            })
            .collect(),
        "channels" | "channel" => dev
            .channels()
            .iter()
            .map(|c| block_entry(&c.name(), c.global_id()))
            .collect(),
        "function-blocks" | "function-block" => dev
            .function_blocks()
            .iter()
            .map(|b| block_entry(&b.name(), b.global_id()))
            .collect(),
        "signals" | "signal" => dev.signals().iter().map(|s| signal_entry(s)).collect(),
        "available-devices" => dev
            .available_devices()
            .iter()
            .map(|i| device_entry(&i.name, &i.serial_number, &i.connection_string))
            .collect(),
        "available-function-blocks" => dev
            .available_function_block_types()
            .iter()
            .map(|t| block_entry(&t.name, &t.id))
            .collect(),
        _ => return None,
    };
    Some(entries)
}

fn select_child(dev: &Device, class: &str, index: usize) -> Option<DaqResult<DaqObject>> {
    let selected = match class {
        "devices" | "device" => pick(&dev.devices(), index).map(DaqObject::Device),
        "channels" | "channel" => pick(&dev.channels(), index).map(DaqObject::from_block),
        "function-blocks" | "function-block" => pick(&dev.function_blocks(), index).map(DaqObject::from_block),
        "signals" | "signal" => pick(&dev.signals(), index).map(DaqObject::Signal),
        "available-devices" => {
            pick(&dev.available_devices(), index).map(|i| DaqObject::PropertyObject(i.info_object()))
        }
        "available-function-blocks" => pick(&dev.available_function_block_types(), index)
            .map(|t| DaqObject::PropertyObject(t.info_object())),
        "sync-component" => Ok(DaqObject::SyncComponent(dev.sync_component().clone())),
        "info" => Ok(DaqObject::PropertyObject(dev.info().info_object())),
        _ => return None,
    };
    Some(selected)
}

fn add(dev: &Device, what: &str, value: &str) -> DaqResult<DaqObject> {
    match what {
        "device" => dev.add_device(value).map(DaqObject::Device),
        "function-block" => dev.add_function_block(value).map(DaqObject::from_block),
        other => Err(DaqError::InvalidValue {
            item: "add".to_string(),
            value: other.to_string(),
        }),
    }
}

fn remove(dev: &Device, what: &str, index: usize) -> DaqResult<()> {
    match what {
        "device" => dev.remove_device_at(index).map(|_| ()),
        "function-block" => dev.remove_function_block_at(index).map(|_| ()),
        other => Err(DaqError::InvalidValue {
            item: "remove".to_string(),
            value: other.to_string(),
        }),
    }
}

fn run_command(dev: &Device, verb: &str, args: &[&str]) -> Option<DaqResult<CommandOutcome>> {
    let missing = || DaqError::generic(format!("Missing argument for '{verb}'."));
    let outcome = match (verb, args) {
        ("add", [what, value, ..]) => add(dev, what, value).map(CommandOutcome::Selected),
        ("remove", [what, index, ..]) => {
            parse_index("remove", index).and_then(|i| remove(dev, what, i)).map(|_| CommandOutcome::Done)
        }
        ("save-config", [path, ..]) => dev
            .save_configuration()
            .and_then(|json| std::fs::write(path, json).map_err(DaqError::from))
            .map(|_| {
                info!(path = %path, "configuration saved");
                CommandOutcome::Done
            }),
        ("load-config", [path, ..]) => std::fs::read_to_string(path)
            .map_err(DaqError::from)
            .and_then(|json| dev.load_configuration(&json))
            .map(|_| CommandOutcome::Done),
        ("add" | "remove" | "save-config" | "load-config", _) => Err(missing()),
        _ => return None,
    };
    Some(outcome)
}

const HELP: &[HelpEntry] = &[
    entry("list devices|channels|function-blocks|signals", "List children of the device"),
    entry("list available-devices|available-function-blocks", "List what can be added"),
    entry("select device|channel|function-block|signal <i>", "Select a child"),
    entry("select available-devices|available-function-blocks <i>", "Select discovery information"),
    entry("select sync-component|info 0", "Select the sync component or device information"),
    entry("getCount <class>", "Number of entries of a listable class"),
    entry("print name|location|model|serial-number|platform", "Print device information"),
    entry("print firmware-version|connection-string|manufacturer|all", "Print device information"),
    entry("add device <connection-string>", "Connect a device"),
    entry("add function-block <type-id>", "Create a function block"),
    entry("remove device|function-block <i>", "Remove a child"),
    entry("save-config <file>", "Save the device configuration as JSON"),
    entry("load-config <file>", "Load a device configuration"),
];

impl KindHandler for DeviceHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Device
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        let dev = match device(obj) {
            Ok(dev) => dev,
            Err(e) => return Some(Err(e)),
        };
        let info = dev.info();
        if item == "all" {
            let fields = info.fields();
            let lines = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            return Some(Ok(Description::with_lines(info.name.clone(), lines)));
        }
        let value = info.field(item)?;
        Some(Ok(Description::labeled(item, value)))
    }

    fn list(&self, obj: &DaqObject, class: &str) -> Handled<Listing> {
        let dev = match device(obj) {
            Ok(dev) => dev,
            Err(e) => return Some(Err(e)),
        };
        listing(dev, class).map(|items| Ok(Listing::Items(items)))
    }

    fn select(&self, obj: &DaqObject, class: &str, index: usize) -> Handled<DaqObject> {
        let dev = match device(obj) {
            Ok(dev) => dev,
            Err(e) => return Some(Err(e)),
        };
        select_child(dev, class, index)
    }

    fn count(&self, obj: &DaqObject, class: &str) -> Handled<usize> {
        let dev = match device(obj) {
            Ok(dev) => dev,
            Err(e) => return Some(Err(e)),
        };
        listing(dev, class).map(|items| Ok(items.len()))
    }

    fn command(&self, obj: &DaqObject, verb: &str, args: &[&str], _ctx: &CommandContext) -> Handled<CommandOutcome> {
        let dev = match device(obj) {
            Ok(dev) => dev,
            Err(e) => return Some(Err(e)),
        };
        run_command(dev, verb, args)
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
