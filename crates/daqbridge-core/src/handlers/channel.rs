use daqbridge_types::ObjectKind;

use super::{Description, Handled, HelpEntry, KindHandler, entry};
use crate::object::DaqObject;

/// Channels add tags on top of the function block handler.
pub struct ChannelHandler;

const HELP: &[HelpEntry] = &[entry("print tags", "Print the channel tags")];

impl KindHandler for ChannelHandler {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Channel
    }

    fn describe(&self, obj: &DaqObject, item: &str) -> Handled<Description> {
        if item != "tags" {
            return None;
        }
        Some(obj.as_block().map(|block| {
            let tags = block.tags();
            Description::with_lines(tags.join(", "), vec![format!("Tags: [{}]", tags.join(", "))])
        }))
    }

    fn help(&self) -> &'static [HelpEntry] {
        HELP
    }
}
