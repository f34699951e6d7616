use std::sync::Arc;

use daqbridge_sdk::descriptor::Dimension;
use daqbridge_sdk::{DataDescriptor, Property, PropertyObject};
use daqbridge_types::{DaqError, DaqResult, ObjectKind};

use super::{Description, Handled, HelpEntry, KindHandler, Listing, entry, pick};
use crate::object::DaqObject;

pub struct DescriptorHandler;

fn optional(item: &str, value: Option<String>) -> DaqResult<Description> {
    value
        .map(|v| Description::labeled(item, v))
        .ok_or_else(|| DaqError::not_available(item))
}

fn describe_descriptor(d: &DataDescriptor, item: &str) -> Option<DaqResult<Description>> {
    let described = match item {
        "name" => Ok(Description::labeled(item, d.name.clone())),
        "sample-type" => Ok(Description::labeled(item, d.sample_type.to_string())),
        "unit" => optional(item, d.unit.as_ref().map(ToString::to_string)),
        "value-range" => optional(item, d.value_range.map(|r| r.to_string())),
        "rule" => Ok(Description::labeled(item, d.rule.to_string())),
        "origin" => optional(item, Some(d.origin.clone()).filter(|o| !o.is_empty())),
        "tick-resolution" => optional(item, d.tick_resolution.map(|r| r.to_string())),
        "post-scaling" => match &d.post_scaling {
            Some(scaling) => serde_json::to_string(scaling)
                .map(|json| Description::labeled(item, json))
                .map_err(|e| DaqError::InvalidJson(e.to_string())),
            None => Err(DaqError::not_available(item)),
        },
        "metadata" => {
            let lines = d.metadata.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            let value = d.metadata.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ");
            Ok(Description::with_lines(value, lines))
        }
        "json" | "all" => d.to_json().map(Description::text),
        _ => return None,
    };
    Some(described)
}

/// Read-only view of one dimension.
fn dimension_object(dimension: &Dimension) -> PropertyObject {
    let unit = dimension.unit.as_ref().map(ToString::to_string).unwrap_or_default();
    let rule = serde_json::to_string(&dimension.rule).unwrap_or_default();
    PropertyObject::new("Dimension")
        .with_property(Property::string("Name", &dimension.name).read_only())
        .with_property(Property::string("Unit", &unit).read_only())
        .with_property(Property::string("Rule", &rule).read_only())
}

const HELP: &[HelpEntry] = &[
    entry("list properties|all|json", "Print the descriptor as JSON"),
    entry("print name|sample-type|unit|value-range|rule", "Print a descriptor field"),
    entry("print origin|tick-resolution|metadata|json", "Print a descriptor field"),
    entry("print post-scaling", "Print the post-scaling as JSON"),
    entry("getCount struct-fields|dimensions|metadata", "Number of nested entries"),
    entry("select struct-field|dimension <i>", "Select a struct field or dimension"),
];

impl KindHandler for DescriptorHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::DataDescriptor
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        match obj.descriptor() {
            Ok(d) => describe_descriptor(&d, item),
            Err(e) => Some(Err(e)),
        }
    }

    fn list(&self, obj: &DaqObject, class: &str) -> Handled<Listing> {
        match class {
            "properties" | "all" | "json" => Some(obj.descriptor().and_then(|d| d.to_json()).map(Listing::Text)),
            _ => None,
        }
    }

    fn select(&self, obj: &DaqObject, class: &str, index: usize) -> Handled<DaqObject> {
        let d = match obj.descriptor() {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let selected = match class {
            "struct-fields" | "struct-field" => {
                pick(&d.struct_fields, index).map(|f| DaqObject::DataDescriptor(Arc::new(f)))
            }
            "dimensions" | "dimension" => {
                pick(&d.dimensions, index).map(|dim| DaqObject::PropertyObject(dimension_object(&dim)))
            }
            _ => return None,
        };
        Some(selected)
    }

    fn count(&self, obj: &DaqObject, class: &str) -> Handled<usize> {
        let d = match obj.descriptor() {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let count = match class {
            "struct-fields" | "struct-field" => d.struct_fields.len(),
            "dimensions" | "dimension" => d.dimensions.len(),
            "metadata" => d.metadata.len(),
            _ => return None,
        };
        Some(Ok(count))
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqbridge_sdk::descriptor::{DataRule, DimensionRule, SampleType, Scaling, Unit};
    use daqbridge_types::ErrorCode;

    fn spectrum() -> DaqObject {
        let field = DataDescriptor::builder().name("Im").sample_type(SampleType::Float32).build();
        let d = DataDescriptor::builder()
            .name("Spectrum")
            .sample_type(SampleType::Float64)
            .unit(Unit::new("V", "volts", "voltage"))
            .value_range(-5.0, 5.0)
            .rule(DataRule::explicit())
            .tick_resolution(1, 1000)
            .dimension(Dimension {
                name: "Frequency".to_string(),
                unit: Some(Unit::new("Hz", "", "frequency")),
                rule: DimensionRule::linear(10.0, 0.0, 64),
            })
            .struct_field(field)
            .metadata("Source", "test")
            .post_scaling(Scaling::linear(SampleType::Int16, SampleType::Float64, 0.5, 0.0))
            .build();
        DaqObject::DataDescriptor(Arc::new(d))
    }

    #[test]
    fn fields_are_described() {
        let obj = spectrum();
        assert_eq!(DescriptorHandler.describe(&obj, "unit").unwrap().unwrap().value, "V (volts)");
        assert_eq!(DescriptorHandler.describe(&obj, "value-range").unwrap().unwrap().value, "[-5, 5]");
        assert_eq!(DescriptorHandler.describe(&obj, "tick-resolution").unwrap().unwrap().value, "1/1000");
        let err = DescriptorHandler.describe(&obj, "origin").unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAvailable);
        let scaling = DescriptorHandler.describe(&obj, "post-scaling").unwrap().unwrap();
        assert!(scaling.value.contains("\"scale\":0.5"));
        assert!(scaling.value.contains("\"inputSampleType\":6"));
        assert!(DescriptorHandler.describe(&obj, "Gain").is_none());
    }

    #[test]
    fn json_listing_parses_back() {
        let obj = spectrum();
        let Listing::Text(json) = DescriptorHandler.list(&obj, "json").unwrap().unwrap() else {
            panic!("expected text");
        };
        let parsed = DataDescriptor::from_json(&json).unwrap();
        assert_eq!(&parsed, obj.descriptor().unwrap().as_ref());
    }

    #[test]
    fn nested_entries_are_selectable() {
        let obj = spectrum();
        assert_eq!(DescriptorHandler.count(&obj, "struct-fields").unwrap().unwrap(), 1);
        assert_eq!(DescriptorHandler.count(&obj, "metadata").unwrap().unwrap(), 1);
        let field = DescriptorHandler.select(&obj, "struct-field", 0).unwrap().unwrap();
        assert_eq!(DescriptorHandler.describe(&field, "name").unwrap().unwrap().value, "Im");
        let dim = DescriptorHandler.select(&obj, "dimension", 0).unwrap().unwrap();
        assert_eq!(dim.property_object().unwrap().display_value("Unit").unwrap(), "Hz");
        let err = DescriptorHandler.select(&obj, "dimensions", 1).unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfBounds);
    }
}
