//! Property metadata and the shared, lockable [`PropertyObject`] that every
//! component in the object tree exposes.
//!
//! # Example
//!
//! ```rust
//! use daqbridge_sdk::property::{Property, PropertyObject};
//!
//! let obj = PropertyObject::new("Channel")
//!     .with_property(Property::float("Frequency", 10.0).with_min(0.1).with_max(1000.0).with_unit("Hz"));
//!
//! obj.set_from_text("Frequency", "50").unwrap();
//! assert_eq!(obj.value("Frequency").unwrap().as_f64(), Some(50.0));
//! assert!(obj.set_from_text("Frequency", "5000").is_err());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use daqbridge_types::{DaqError, DaqResult};
use parking_lot::RwLock;
use tracing::debug;

use crate::value::{CoreType, Value, eval_value};

/// Static description of one property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value_type: CoreType,
    pub default_value: Value,
    pub description: String,
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Labels of a selection property; the stored value is the index.
    pub selection_values: Vec<String>,
    pub visible: bool,
    pub read_only: bool,
}

impl Property {
    fn new(name: &str, value_type: CoreType, default_value: Value) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            default_value,
            description: String::new(),
            unit: None,
            min: None,
            max: None,
            selection_values: Vec::new(),
            visible: true,
            read_only: false,
        }
    }

    pub fn bool(name: &str, default: bool) -> Self {
        Self::new(name, CoreType::Bool, Value::Bool(default))
    }

    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, CoreType::Int, Value::Int(default))
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self::new(name, CoreType::Float, Value::Float(default))
    }

    pub fn string(name: &str, default: &str) -> Self {
        Self::new(name, CoreType::String, Value::from(default))
    }

    /// A selection property stores the index into `labels`.
    pub fn selection(name: &str, labels: &[&str], default_index: i64) -> Self {
        let mut prop = Self::new(name, CoreType::Int, Value::Int(default_index));
        prop.selection_values = labels.iter().map(|l| l.to_string()).collect();
        prop
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn is_selection(&self) -> bool {
        !self.selection_values.is_empty()
    }

    /// Coerce `value` to this property's type and check its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`DaqError::Generic`] when the value cannot be converted, lies
    /// outside `[min, max]`, or names no selection entry.
    pub fn validate(&self, value: Value) -> DaqResult<Value> {
        let value = match (&value, self.is_selection()) {
            (Value::String(label), true) => {
                let index = self
                    .selection_values
                    .iter()
                    .position(|v| v == label)
                    .ok_or_else(|| DaqError::generic(format!("'{label}' is not a valid selection for '{}'.", self.name)))?;
                Value::Int(index as i64)
            }
            _ => value.coerce(self.value_type)?,
        };

        if self.is_selection() {
            let index = value.as_i64().unwrap_or(-1);
            if index < 0 || index as usize >= self.selection_values.len() {
                return Err(DaqError::generic(format!(
                    "Selection index {index} is out of range for '{}'.",
                    self.name
                )));
            }
        }

        if let Some(v) = value.as_f64().filter(|_| value.core_type() != CoreType::Bool) {
            if let Some(min) = self.min
                && v < min
            {
                return Err(DaqError::generic(format!("{v} is below the minimum {min} of '{}'.", self.name)));
            }
            if let Some(max) = self.max
                && v > max
            {
                return Err(DaqError::generic(format!("{v} is above the maximum {max} of '{}'.", self.name)));
            }
        }
        Ok(value)
    }
}

#[derive(Debug, Default)]
struct Inner {
    class_name: String,
    properties: Vec<Property>,
    values: HashMap<String, Value>,
}

/// A shared bag of typed properties.
///
/// Cloning yields another handle to the same properties.
#[derive(Debug, Clone, Default)]
pub struct PropertyObject {
    inner: Arc<RwLock<Inner>>,
}

impl PropertyObject {
    pub fn new(class_name: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                class_name: class_name.to_string(),
                ..Inner::default()
            })),
        }
    }

    pub fn with_property(self, property: Property) -> Self {
        self.add_property(property);
        self
    }

    /// Add or replace a property definition. Any stored value is dropped.
    pub fn add_property(&self, property: Property) {
        let mut inner = self.inner.write();
        inner.values.remove(&property.name);
        if let Some(existing) = inner.properties.iter_mut().find(|p| p.name == property.name) {
            *existing = property;
        } else {
            inner.properties.push(property);
        }
    }

    pub fn class_name(&self) -> String {
        self.inner.read().class_name.clone()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.inner.read().properties.iter().any(|p| p.name == name)
    }

    pub fn property(&self, name: &str) -> Option<Property> {
        self.inner.read().properties.iter().find(|p| p.name == name).cloned()
    }

    pub fn visible_properties(&self) -> Vec<Property> {
        self.inner.read().properties.iter().filter(|p| p.visible).cloned().collect()
    }

    pub fn all_properties(&self) -> Vec<Property> {
        self.inner.read().properties.clone()
    }

    /// Current value of `name`, falling back to its default.
    ///
    /// # Errors
    ///
    /// [`DaqError::PropertyDoesntExist`] when no such property is defined.
    pub fn value(&self, name: &str) -> DaqResult<Value> {
        let inner = self.inner.read();
        let prop = inner
            .properties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| DaqError::no_property(name))?;
        Ok(inner.values.get(name).cloned().unwrap_or_else(|| prop.default_value.clone()))
    }

    /// Current value rendered for display. Selection properties show their
    /// label.
    pub fn display_value(&self, name: &str) -> DaqResult<String> {
        let value = self.value(name)?;
        let label = self.property(name).and_then(|p| {
            value
                .as_i64()
                .filter(|_| p.is_selection())
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| p.selection_values.get(i).cloned())
        });
        Ok(label.unwrap_or_else(|| value.to_string()))
    }

    pub fn f64_or(&self, name: &str, fallback: f64) -> f64 {
        self.value(name).ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
    }

    pub fn i64_or(&self, name: &str, fallback: i64) -> i64 {
        self.value(name).ok().and_then(|v| v.as_i64()).unwrap_or(fallback)
    }

    /// Set a property as an external caller would.
    ///
    /// # Errors
    ///
    /// [`DaqError::PropertyDoesntExist`] for unknown names, [`DaqError::Generic`]
    /// for read-only properties and values that fail validation.
    pub fn set_value(&self, name: &str, value: Value) -> DaqResult<()> {
        let prop = self.property(name).ok_or_else(|| DaqError::no_property(name))?;
        if prop.read_only {
            return Err(DaqError::generic(format!("Property '{name}' is read-only.")));
        }
        let value = prop.validate(value)?;
        debug!(class = %self.class_name(), property = name, value = %value, "property set");
        self.inner.write().values.insert(name.to_string(), value);
        Ok(())
    }

    /// Evaluate `text` and set the result.
    ///
    /// # Errors
    ///
    /// As [`PropertyObject::set_value`], plus [`DaqError::Generic`] when the
    /// text does not evaluate.
    pub fn set_from_text(&self, name: &str, text: &str) -> DaqResult<()> {
        if !self.has_property(name) {
            return Err(DaqError::no_property(name));
        }
        self.set_value(name, eval_value(text)?)
    }

    /// Owner-side write that bypasses the read-only flag.
    pub fn set_internal(&self, name: &str, value: Value) -> DaqResult<()> {
        let prop = self.property(name).ok_or_else(|| DaqError::no_property(name))?;
        let value = prop.validate(value)?;
        self.inner.write().values.insert(name.to_string(), value);
        Ok(())
    }

    /// Values of every writable property, for configuration snapshots.
    pub fn writable_values(&self) -> BTreeMap<String, Value> {
        let inner = self.inner.read();
        inner
            .properties
            .iter()
            .filter(|p| !p.read_only)
            .map(|p| {
                let v = inner.values.get(&p.name).cloned().unwrap_or_else(|| p.default_value.clone());
                (p.name.clone(), v)
            })
            .collect()
    }

    /// Apply a snapshot produced by [`PropertyObject::writable_values`].
    /// Unknown or read-only names are skipped.
    ///
    /// # Errors
    ///
    /// The first validation failure.
    pub fn apply_values(&self, values: &BTreeMap<String, Value>) -> DaqResult<()> {
        for (name, value) in values {
            match self.property(name) {
                Some(p) if !p.read_only => self.set_value(name, value.clone())?,
                _ => debug!(property = %name, "skipping property from snapshot"),
            }
        }
        Ok(())
    }
}
