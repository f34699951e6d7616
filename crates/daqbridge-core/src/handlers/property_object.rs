use daqbridge_sdk::PropertyObject;
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

use super::{CommandContext, CommandOutcome, Description, Handled, HelpEntry, KindHandler, Listing, entry};
use crate::object::DaqObject;

/// End of every fallback chain.
pub struct PropertyObjectHandler;

fn properties(obj: &DaqObject, item: &str) -> DaqResult<PropertyObject> {
    obj.property_object().ok_or_else(|| DaqError::no_property(item))
}

fn describe_property(obj: &DaqObject, item: &str) -> DaqResult<Description> {
    let props = properties(obj, item)?;
    let prop = props.property(item).ok_or_else(|| DaqError::no_property(item))?;
    let value = props.display_value(item)?;

    let mut lines = vec![
        format!("Name : {}", prop.name),
        format!("Value : {value}"),
        format!("Type : {}", prop.value_type),
    ];
    if !prop.description.is_empty() {
        lines.push(format!("Description : {}", prop.description));
    }
    lines.push(format!("Default value : {}", prop.default_value));
    if let Some(unit) = &prop.unit {
        lines.push(format!("Unit : {unit}"));
    }
    if let Some(min) = prop.min {
        lines.push(format!("Min : {min}"));
    }
    if let Some(max) = prop.max {
        lines.push(format!("Max : {max}"));
    }
    if prop.is_selection() {
        lines.push(format!("Selection values : [{}]", prop.selection_values.join(", ")));
    }
    lines.push(format!("Visible : {}", prop.visible));
    lines.push(format!("Read only : {}", prop.read_only));
    Ok(Description::with_lines(value, lines))
}

const HELP: &[HelpEntry] = &[
    entry("list properties", "List visible properties with their values"),
    entry("print <property>", "Print value and metadata of a property"),
    entry("get <property>", "Return the value of a property"),
    entry("set <property> <value>", "Evaluate <value> and assign it"),
    entry("getCount properties", "Number of visible properties"),
    entry("help", "Show this help"),
];

impl KindHandler for PropertyObjectHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::PropertyObject
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        Some(describe_property(obj, item))
    }

    fn list(&self, obj: &DaqObject, class: &str) -> Handled<Listing> {
        if class != "properties" {
            return Some(Err(DaqError::no_property(class)));
        }
        Some(properties(obj, class).and_then(|props| {
            props
                .visible_properties()
                .iter()
                .map(|p| Ok(format!("{} : {}", p.name, props.display_value(&p.name)?)))
                .collect::<DaqResult<Vec<_>>>()
                .map(Listing::Items)
        }))
    }

    fn set(&self, obj: &DaqObject, item: &str, value: &str) -> Handled<()> {
        Some(properties(obj, item).and_then(|props| props.set_from_text(item, value)))
    }

    fn select(&self, _obj: &DaqObject, _class: &str, _index: usize) -> Handled<DaqObject> {
        Some(Err(DaqError::MethodNotImplemented("select".to_string())))
    }

    fn count(&self, obj: &DaqObject, class: &str) -> Handled<usize> {
        if class != "properties" {
            return Some(Err(DaqError::no_property(class)));
        }
        Some(properties(obj, class).map(|props| props.visible_properties().len()))
    }

    fn command(&self, _obj: &DaqObject, verb: &str, _args: &[&str], _ctx: &CommandContext) -> Handled<CommandOutcome> {
        Some(Err(DaqError::MethodNotImplemented(verb.to_string())))
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
