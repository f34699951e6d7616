//! Kind-specific command handlers.
//!
//! Each [`ObjectKind`] has one handler. A handler answers the calls it
//! recognises and returns `None` for everything else, which hands the whole
//! call to the handler of the parent kind. The `PropertyObject` handler is
//! the end of every chain and always answers, with an error if nothing
//! matched.

mod channel;
mod descriptor;
mod device;
mod function_block;
pub(crate) mod input_port;
mod property_object;
mod signal;
mod sync;

use std::sync::Arc;

use daqbridge_sdk::Device;
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

use crate::object::DaqObject;

/// `None` forwards the call to the parent kind.
pub type Handled<T> = Option<DaqResult<T>>;

/// Result of describing one item: the bare value returned by `get`, and the
/// lines `print` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub value: String,
    pub lines: Vec<String>,
}

impl Description {
    /// A single `Label: value` line.
    pub fn labeled(label: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lines: vec![format!("{label}: {value}")],
            value,
        }
    }

    /// Multi-line text printed as is.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lines: value.lines().map(str::to_string).collect(),
            value,
        }
    }

    pub fn with_lines(value: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            value: value.into(),
            lines,
        }
    }
}

/// Result of a `list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Children printed as `[i] entry`.
    Items(Vec<String>),
    /// A document printed verbatim.
    Text(String),
}

impl Listing {
    pub fn lines(&self) -> Vec<String> {
        match self {
            Listing::Items(items) => items.iter().enumerate().map(|(i, e)| format!("[{i}] {e}")).collect(),
            Listing::Text(text) => text.lines().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpEntry {
    pub usage: &'static str,
    pub text: &'static str,
}

pub(crate) const fn entry(usage: &'static str, text: &'static str) -> HelpEntry {
    HelpEntry { usage, text }
}

/// What a processed command produced.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// Nothing to do (empty command).
    Idle,
    Done,
    Value(String),
    Count(usize),
    Selected(DaqObject),
}

impl CommandOutcome {
    /// Whether anything was executed.
    pub fn executed(&self) -> bool {
        !matches!(self, CommandOutcome::Idle)
    }
}

/// Context for verbs that look beyond the current object.
#[derive(Clone, Default)]
pub struct CommandContext {
    /// Root searched by `connect`.
    pub root: Option<Arc<Device>>,
}

pub trait KindHandler: Sync {
    fn kind(&self) -> ObjectKind;

    fn describe(&self, _obj: &DaqObject, _item: &str) -> Handled<Description> {
        None
    }

    fn list(&self, _obj: &DaqObject, _class: &str) -> Handled<Listing> {
        None
    }

    fn set(&self, _obj: &DaqObject, _item: &str, _value: &str) -> Handled<()> {
        None
    }

    fn select(&self, _obj: &DaqObject, _class: &str, _index: usize) -> Handled<DaqObject> {
        None
    }

    fn count(&self, _obj: &DaqObject, _class: &str) -> Handled<usize> {
        None
    }

    /// Kind-specific verbs beyond the generic seven.
    fn command(&self, _obj: &DaqObject, _verb: &str, _args: &[&str], _ctx: &CommandContext) -> Handled<CommandOutcome> {
        None
    }

    /// This kind's own help; parents add theirs.
    fn help(&self) -> &'static [HelpEntry];
}

static DEVICE: device::DeviceHandler = device::DeviceHandler;
static CHANNEL: channel::ChannelHandler = channel::ChannelHandler;
static FUNCTION_BLOCK: function_block::FunctionBlockHandler = function_block::FunctionBlockHandler;
static SIGNAL: signal::SignalHandler = signal::SignalHandler;
static INPUT_PORT: input_port::InputPortHandler = input_port::InputPortHandler;
static DESCRIPTOR: descriptor::DescriptorHandler = descriptor::DescriptorHandler;
static SYNC: sync::SyncHandler = sync::SyncHandler;
static PROPERTY_OBJECT: property_object::PropertyObjectHandler = property_object::PropertyObjectHandler;

pub fn handler_for(kind: ObjectKind) -> &'static dyn KindHandler {
    match kind {
        ObjectKind::Device => &DEVICE,
        ObjectKind::Channel => &CHANNEL,
        ObjectKind::FunctionBlock => &FUNCTION_BLOCK,
        ObjectKind::Signal => &SIGNAL,
        ObjectKind::InputPort => &INPUT_PORT,
        ObjectKind::DataDescriptor => &DESCRIPTOR,
        ObjectKind::SyncComponent => &SYNC,
        ObjectKind::PropertyObject => &PROPERTY_OBJECT,
    }
}

/// Pick `items[index]` or report the bounds.
pub(crate) fn pick<T: Clone>(items: &[T], index: usize) -> DaqResult<T> {
    items.get(index).cloned().ok_or(DaqError::OutOfBounds {
        index,
        len: items.len(),
    })
}

/// Parse a boolean operand; only `true` and `false` are accepted.
pub(crate) fn parse_bool(item: &str, value: &str) -> DaqResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(DaqError::InvalidValue {
            item: item.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse an index operand.
pub(crate) fn parse_index(item: &str, value: &str) -> DaqResult<usize> {
    value.parse::<usize>().map_err(|_| DaqError::InvalidValue {
        item: item.to_string(),
        value: value.to_string(),
    })
}

/// `Name: x, Unique ID: y` for signal listings.
pub(crate) fn signal_entry(signal: &daqbridge_sdk::Signal) -> String {
    format!(
        "Name: {}, Unique ID: {}",
        signal.name().unwrap_or_else(|| signal.local_id().to_string()),
        signal.global_id()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_handler() {
        for kind in [
            ObjectKind::Device,
            ObjectKind::Channel,
            ObjectKind::FunctionBlock,
            ObjectKind::Signal,
            ObjectKind::InputPort,
            ObjectKind::DataDescriptor,
            ObjectKind::SyncComponent,
            ObjectKind::PropertyObject,
        ] {
            assert_eq!(handler_for(kind).kind(), kind);
            assert!(!handler_for(kind).help().is_empty());
        }
    }

    #[test]
    fn listing_numbers_items() {
        let listing = Listing::Items(vec!["a".into(), "b".into()]);
        assert_eq!(listing.lines(), vec!["[0] a", "[1] b"]);
    }

    #[test]
    fn bool_operands_are_strict() {
        assert!(parse_bool("active", "true").unwrap());
        assert!(!parse_bool("active", "false").unwrap());
        assert!(parse_bool("active", "1").is_err());
        assert!(parse_bool("active", "True").is_err());
    }

    #[test]
    fn pick_reports_bounds() {
        let err = pick(&[1, 2], 2).unwrap_err();
        assert_eq!(err.code(), daqbridge_types::ErrorCode::OutOfBounds);
        assert_eq!(pick(&[1, 2], 1).unwrap(), 2);
    }
}
