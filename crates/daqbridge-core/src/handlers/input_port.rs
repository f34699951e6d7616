use daqbridge_sdk::InputPort;
use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use tracing::debug;

use super::{CommandContext, CommandOutcome, Description, Handled, HelpEntry, KindHandler, entry};
use crate::object::DaqObject;

pub struct InputPortHandler;

/// Connect `port` to the signal with `signal_id` found below `ctx.root`.
pub(crate) fn connect(port: &InputPort, signal_id: &str, ctx: &CommandContext) -> DaqResult<()> {
    let root = ctx
        .root
        .as_ref()
        .ok_or_else(|| DaqError::not_available("no root device to search for signals"))?;
    let signal = root
        .find_signal(signal_id)
        .ok_or_else(|| DaqError::InvalidId(signal_id.to_string()))?;
    debug!(port = %port.global_id(), signal = %signal_id, "connecting input port");
    port.connect(signal);
    Ok(())
}

const HELP: &[HelpEntry] = &[
    entry("print name|signal-id|requires-signal", "Print input port information"),
    entry("select signal 0", "Select the connected signal"),
    entry("connect <global-signal-id>", "Connect a signal found below the root device"),
    entry("disconnect", "Disconnect the current signal"),
];

impl KindHandler for InputPortHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::InputPort
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        let port = match obj.as_input_port() {
            Ok(port) => port,
            Err(e) => return Some(Err(e)),
        };
        let description = match item {
            "name" => Description::labeled("Name", port.name()),
            "signal-id" => match port.signal() {
                Some(signal) => Description::labeled("Signal", signal.global_id()),
                None => Description::with_lines("", vec!["Signal: <disconnected>".to_string()]),
            },
            "requires-signal" => Description::labeled("Requires signal", port.requires_signal().to_string()),
            _ => return None,
        };
        Some(Ok(description))
    }

    fn select(&self, obj: &DaqObject, class: &str, _index: usize) -> Handled<DaqObject> {
        if class != "signal" {
            return None;
        }
        Some(obj.as_input_port().and_then(|port| {
            port.signal()
                .map(DaqObject::Signal)
                .ok_or_else(|| DaqError::not_available("input port is not connected"))
        }))
    }

    fn command(&self, obj: &DaqObject, verb: &str, args: &[&str], ctx: &CommandContext) -> Handled<CommandOutcome> {
        let port = match obj.as_input_port() {
            Ok(port) => port,
            Err(e) => return Some(Err(e)),
        };
        let outcome = match (verb, args) {
            ("connect", [signal_id, ..]) => connect(port, signal_id, ctx),
            ("connect", []) => Err(DaqError::generic("Missing argument for 'connect'.")),
            ("disconnect", _) => port.disconnect(),
            _ => return None,
        };
        Some(outcome.map(|_| CommandOutcome::Done))
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
