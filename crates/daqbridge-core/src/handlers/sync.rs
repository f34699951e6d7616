use daqbridge_types::ObjectKind;

use super::{HelpEntry, KindHandler, entry};

/// Sync components are plain property objects.
pub struct SyncHandler;

const HELP: &[HelpEntry] = &[
    entry("print Source|SyncLocked", "Print the clock source or lock state"),
    entry("set Source <label|index>", "Choose Internal, GPS or PTP"),
];

impl KindHandler for SyncHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::SyncComponent
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
