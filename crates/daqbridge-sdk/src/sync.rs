//! Device synchronization component.

use crate::property::{Property, PropertyObject};
use crate::value::Value;

pub const SYNC_SOURCES: [&str; 3] = ["Internal", "GPS", "PTP"];

#[derive(Debug, Clone)]
pub struct SyncComponent {
    properties: PropertyObject,
}

impl Default for SyncComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncComponent {
    pub fn new() -> Self {
        let properties = PropertyObject::new("SyncComponent")
            .with_property(
                Property::selection("Source", &SYNC_SOURCES, 0).with_description("Clock the device synchronizes to"),
            )
            .with_property(Property::bool("SyncLocked", true).read_only());
        Self { properties }
    }

    pub fn properties(&self) -> &PropertyObject {
        &self.properties
    }

    pub fn is_locked(&self) -> bool {
        self.properties.value("SyncLocked").ok().and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Owner-side update of the lock state.
    pub fn set_locked(&self, locked: bool) {
        let _ = self.properties.set_internal("SyncLocked", Value::Bool(locked));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_state_is_owner_controlled() {
        let sync = SyncComponent::new();
        assert!(sync.is_locked());
        assert!(sync.properties().set_from_text("SyncLocked", "false").is_err());
        sync.set_locked(false);
        assert!(!sync.is_locked());
    }

    #[test]
    fn source_is_a_selection() {
        let sync = SyncComponent::new();
        sync.properties().set_from_text("Source", "PTP").unwrap();
        assert_eq!(sync.properties().display_value("Source").unwrap(), "PTP");
    }
}
