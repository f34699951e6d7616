//! `daqbridge-sdk` – the data-acquisition object model the bridge drives.
//!
//! | Module | Contents |
//! |---|---|
//! | [`value`] | dynamic values and the literal evaluator |
//! | [`property`] | property metadata and [`PropertyObject`](property::PropertyObject) |
//! | [`descriptor`] | data descriptors and their JSON document form |
//! | [`packet`] | packets and per-consumer queues |
//! | [`signal`] | signals and sample sources |
//! | [`reader`] | stream, time and multi readers |
//! | [`input_port`] | function block inputs |
//! | [`function_block`] | function blocks and channels |
//! | [`sync`] | device sync component |
//! | [`device`] | devices, device info, configuration save/load |
//! | [`module`] | the module trait and manager |
//! | [`reference`] | simulated devices and processing blocks |
//! | [`instance`] | the tree root |

pub mod descriptor;
pub mod device;
mod device_config;
pub mod function_block;
pub mod input_port;
pub mod instance;
pub mod module;
pub mod packet;
pub mod property;
pub mod reader;
pub mod reference;
pub mod signal;
pub mod sync;
pub mod value;

pub use descriptor::DataDescriptor;
pub use device::{Device, DeviceInfo};
pub use function_block::{FunctionBlock, FunctionBlockType};
pub use input_port::InputPort;
pub use instance::Instance;
pub use property::{Property, PropertyObject};
pub use reader::{MultiReader, StreamReader, TimeReader, TimedSample};
pub use signal::Signal;
pub use sync::SyncComponent;
pub use value::Value;
