use std::sync::Arc;

use daqbridge_sdk::Signal;
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

use super::{Description, Handled, HelpEntry, KindHandler, Listing, entry, parse_bool, pick, signal_entry};
use crate::object::DaqObject;

pub struct SignalHandler;

fn describe_signal(signal: &Signal, item: &str) -> Option<DaqResult<Description>> {
    let described = match item {
        "name" => signal
            .name()
            .map(|name| Description::labeled("Name", name))
            .ok_or_else(|| DaqError::not_available("signal name")),
        "id" => Ok(Description::labeled("Global ID", signal.global_id())),
        "descriptor" => signal
            .descriptor()
            .ok_or_else(|| DaqError::not_available("signal descriptor"))
            .and_then(|d| d.to_json())
            .map(Description::text),
        "public" => Ok(Description::labeled("Public", signal.is_public().to_string())),
        "active" => Ok(Description::labeled("Active", signal.is_active().to_string())),
        "domain-signal" => signal
            .domain_signal()
            .map(|d| Description::labeled("Domain signal", d.global_id()))
            .ok_or_else(|| DaqError::not_available("domain signal")),
        _ => return None,
    };
    Some(described)
}

const HELP: &[HelpEntry] = &[
    entry("print name|id|descriptor|public|active|domain-signal", "Print signal information"),
    entry("set public|active true|false", "Change a signal flag"),
    entry("list related", "List related signals"),
    entry("getCount related", "Number of related signals"),
    entry("select domain-signal|descriptor 0", "Select the domain signal or descriptor"),
    entry("select related <i>", "Select a related signal"),
];

impl KindHandler for SignalHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Signal
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        match obj.as_signal() {
            Ok(signal) => describe_signal(signal, item),
            Err(e) => Some(Err(e)),
        }
    }

    fn set(&self, obj: &DaqObject, item: &str, value: &str) -> Handled<()> {
        let apply: fn(&Signal, bool) = match item {
            "public" => Signal::set_public,
            "active" => Signal::set_active,
            _ => return None,
        };
        Some(obj.as_signal().and_then(|signal| {
            let flag = parse_bool(item, value)?;
            apply(signal, flag);
            Ok(())
        }))
    }

    fn list(&self, obj: &DaqObject, class: &str) -> Handled<Listing> {
        if class != "related" {
            return None;
        }
        Some(
            obj.as_signal()
                .map(|s| Listing::Items(s.related_signals().iter().map(|r| signal_entry(r)).collect())),
        )
    }

    fn select(&self, obj: &DaqObject, class: &str, index: usize) -> Handled<DaqObject> {
        let signal: &Arc<Signal> = match obj.as_signal() {
            Ok(signal) => signal,
            Err(e) => return Some(Err(e)),
        };
        let selected = match class {
            "domain-signal" => signal
                .domain_signal()
                .map(DaqObject::Signal)
                .ok_or_else(|| DaqError::not_available("domain signal")),
            "descriptor" => obj.descriptor().map(DaqObject::DataDescriptor),
            "related" => pick(&signal.related_signals(), index).map(DaqObject::Signal),
            _ => return None,
        };
        Some(selected)
    }

    fn count(&self, obj: &DaqObject, class: &str) -> Handled<usize> {
        if class != "related" {
            return None;
        }
        Some(obj.as_signal().map(|s| s.related_signals().len()))
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
