//! `daqbridge-core` – command dispatch over SDK objects
//!
//! Everything between the SDK object tree and the C surface, in plain Rust.
//!
//! # Modules
//!
//! - [`registry`] – [`HandleRegistry`][registry::HandleRegistry]: the
//!   generation-counted arena that turns objects into opaque handles.
//! - [`string_pool`] – [`StringPool`][string_pool::StringPool]: owns every
//!   string handed to a C caller until it is released.
//! - [`console`] – the [`Sink`][console::Sink] trait and the process-wide
//!   console capture.
//! - [`object`] – [`DaqObject`][object::DaqObject]: one SDK object tagged
//!   with the kind it is handled as.
//! - [`handlers`] – one [`KindHandler`][handlers::KindHandler] per kind.
//! - [`dispatch`] – generic operations resolved through the kind fallback
//!   chain, and `process_command`.
//! - [`acquisition`] – per-handle sample buffers and timestamp rendering.
//! - [`bridge`] – [`Bridge`][bridge::Bridge]: the operations of the C
//!   surface over the registry.
//! - [`config`] – `~/.daqbridge/config.toml`.
//! - [`telemetry`] – `tracing` subscriber setup.

pub mod acquisition;
pub mod bridge;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod handlers;
pub mod object;
pub mod registry;
pub mod string_pool;
pub mod telemetry;

pub use bridge::{Bridge, Execution};
pub use config::Config;
pub use console::{Console, Sink};
pub use handlers::{CommandContext, CommandOutcome, Description, Listing};
pub use object::DaqObject;
pub use registry::{Handle, HandleRegistry};
