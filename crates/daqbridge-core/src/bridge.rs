//! [`Bridge`] – every operation of the C surface, in Rust types.
//!
//! The bridge owns the handle registry, the string pool and the bound
//! multi-readers. The FFI crate keeps one bridge behind a global mutex and
//! only converts pointers and error codes; everything else happens here.
//!
//! Each registered object carries its own [`SampleBuffer`], so reads on two
//! handles of the same signal are independent. It also remembers the root
//! device of the instance it was reached from; commands that search the
//! tree, such as `connect`, search that root and no other.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::ffi::c_char;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use daqbridge_sdk::descriptor::DataDescriptor;
use daqbridge_sdk::{Device, Instance, MultiReader, TimedSample};
use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use tracing::{debug, info, warn};

use crate::acquisition::{SampleBuffer, check_count};
use crate::config::Config;
use crate::console::Sink;
use crate::dispatch;
use crate::handlers::{CommandContext, CommandOutcome, input_port};
use crate::object::DaqObject;
use crate::registry::{Handle, HandleRegistry};
use crate::string_pool::StringPool;

struct Entry {
    object: DaqObject,
    samples: SampleBuffer,
    /// Root device of the owning instance.
    root: Weak<Device>,
}

/// Result of [`Bridge::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// `false` for an empty command line.
    pub executed: bool,
    /// Handle of the object the command selected or created, if any.
    pub selected: Option<Handle>,
}

pub struct Bridge {
    objects: HandleRegistry<Entry>,
    strings: StringPool,
    readers: HashMap<i64, MultiReader>,
    next_reader_id: i64,
    config: Config,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Write the diagnostic for `err` to `sink`.
pub fn report(err: &DaqError, sink: &mut dyn Sink) {
    warn!(code = err.code().as_i32(), error = %err, "operation failed");
    sink.line(&err.to_string());
}

impl Bridge {
    pub fn new(config: Config) -> Self {
        Self {
            objects: HandleRegistry::new(),
            strings: StringPool::new(),
            readers: HashMap::new(),
            next_reader_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Handles ──────────────────────────────────────────────────────────

    /// Register `object`, owned by the instance whose root is `root`, and
    /// return its new handle.
    pub fn register(&mut self, object: DaqObject, root: Weak<Device>) -> DaqResult<Handle> {
        let kind = object.kind();
        let handle = self.objects.insert(Entry {
            object,
            samples: SampleBuffer::new(),
            root,
        })?;
        debug!(handle = handle.raw(), %kind, "handle created");
        Ok(handle)
    }

    /// Create a new instance and return a handle to its root device.
    pub fn instance_new(&mut self) -> DaqResult<Handle> {
        let instance = Instance::new(self.config.reference());
        let root = instance.root().clone();
        info!(devices = self.config.reference_devices, "instance created");
        let owner = Arc::downgrade(&root);
        self.register(DaqObject::Device(root), owner)
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.objects.contains(handle)
    }

    /// Release `handle`. The object lives on while other handles or the
    /// object tree still reference it.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidHandle`] for unknown or already freed handles.
    pub fn free(&mut self, handle: Handle) -> DaqResult<()> {
        self.objects.remove(handle).map(|_| ()).ok_or(DaqError::InvalidHandle)?;
        debug!(handle = handle.raw(), "handle freed");
        Ok(())
    }

    pub fn handle_count(&self) -> usize {
        self.objects.len()
    }

    fn entry(&self, handle: Handle) -> DaqResult<&Entry> {
        self.objects.get(handle).ok_or(DaqError::InvalidHandle)
    }

    fn entry_mut(&mut self, handle: Handle) -> DaqResult<&mut Entry> {
        self.objects.get_mut(handle).ok_or(DaqError::InvalidHandle)
    }

    pub fn object(&self, handle: Handle) -> DaqResult<&DaqObject> {
        self.entry(handle).map(|e| &e.object)
    }

    pub fn kind(&self, handle: Handle) -> DaqResult<ObjectKind> {
        self.object(handle).map(DaqObject::kind)
    }

    fn device(&self, handle: Handle) -> DaqResult<Arc<Device>> {
        self.object(handle)?.as_device().cloned()
    }

    // ── Strings ──────────────────────────────────────────────────────────

    pub fn intern(&mut self, text: impl Into<String>) -> *const c_char {
        self.strings.intern(text)
    }

    /// # Errors
    ///
    /// [`DaqError::InvalidHandle`] if `ptr` was not returned by this bridge
    /// or was already released.
    pub fn release_string(&mut self, ptr: *const c_char) -> DaqResult<()> {
        self.strings.release(ptr)
    }

    // ── Generic operations ───────────────────────────────────────────────

    pub fn print(&self, handle: Handle, item: &str, sink: &mut dyn Sink) -> DaqResult<()> {
        dispatch::print(self.object(handle)?, item, sink)
    }

    pub fn list(&self, handle: Handle, class: &str, sink: &mut dyn Sink) -> DaqResult<()> {
        dispatch::list(self.object(handle)?, class, sink)
    }

    pub fn get(&self, handle: Handle, item: &str) -> DaqResult<String> {
        dispatch::get(self.object(handle)?, item)
    }

    pub fn count(&self, handle: Handle, class: &str) -> DaqResult<usize> {
        dispatch::count(self.object(handle)?, class)
    }

    pub fn set(&self, handle: Handle, item: &str, value: &str) -> DaqResult<()> {
        dispatch::set(self.object(handle)?, item, value)
    }

    /// Select a child and register it. Nothing is registered on failure.
    pub fn select(&mut self, handle: Handle, class: &str, index: usize) -> DaqResult<Handle> {
        let entry = self.entry(handle)?;
        let child = dispatch::select(&entry.object, class, index)?;
        let owner = entry.root.clone();
        self.register(child, owner)
    }

    pub fn help(&self, handle: Handle, sink: &mut dyn Sink) -> DaqResult<()> {
        dispatch::help(self.kind(handle)?, sink);
        Ok(())
    }

    /// Root device of the instance `handle` belongs to, if it is still
    /// alive.
    pub fn owning_root(&self, handle: Handle) -> DaqResult<Option<Arc<Device>>> {
        self.entry(handle).map(|e| e.root.upgrade())
    }

    /// Run one command line against `handle`. A selected or created object
    /// is registered and its handle returned.
    pub fn execute(&mut self, handle: Handle, line: &str, sink: &mut dyn Sink) -> DaqResult<Execution> {
        let entry = self.entry(handle)?;
        let object = entry.object.clone();
        let owner = entry.root.clone();
        let ctx = CommandContext { root: owner.upgrade() };
        let tokens = dispatch::tokenize(line);
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let outcome = dispatch::process_command(&object, &tokens, &ctx, sink)?;
        let executed = outcome.executed();
        let selected = match outcome {
            CommandOutcome::Selected(child) => Some(self.register(child, owner)?),
            _ => None,
        };
        Ok(Execution { executed, selected })
    }

    // ── Devices ──────────────────────────────────────────────────────────

    /// Add a `device` (by connection string) or `function-block` (by type
    /// id) to the device behind `handle`.
    pub fn device_add(&mut self, handle: Handle, what: &str, value: &str) -> DaqResult<Handle> {
        let device = self.device(handle)?;
        let owner = self.entry(handle)?.root.clone();
        let child = match what {
            "device" => DaqObject::Device(device.add_device(value)?),
            "function-block" => DaqObject::from_block(device.add_function_block(value)?),
            other => {
                return Err(DaqError::InvalidValue {
                    item: "add".to_string(),
                    value: other.to_string(),
                });
            }
        };
        self.register(child, owner)
    }

    pub fn device_add_device(&mut self, handle: Handle, connection_string: &str) -> DaqResult<Handle> {
        self.device_add(handle, "device", connection_string)
    }

    pub fn device_add_function_block(&mut self, handle: Handle, type_id: &str) -> DaqResult<Handle> {
        self.device_add(handle, "function-block", type_id)
    }

    pub fn device_remove(&self, handle: Handle, what: &str, index: usize) -> DaqResult<()> {
        let device = self.device(handle)?;
        match what {
            "device" => device.remove_device_at(index).map(|_| ()),
            "function-block" => device.remove_function_block_at(index).map(|_| ()),
            other => Err(DaqError::InvalidValue {
                item: "remove".to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn device_remove_device(&self, handle: Handle, index: usize) -> DaqResult<()> {
        self.device_remove(handle, "device", index)
    }

    pub fn device_remove_function_block(&self, handle: Handle, index: usize) -> DaqResult<()> {
        self.device_remove(handle, "function-block", index)
    }

    pub fn available_device_connection_string(&self, handle: Handle, index: usize) -> DaqResult<String> {
        let available = self.device(handle)?.available_devices();
        available
            .get(index)
            .map(|info| info.connection_string.clone())
            .ok_or(DaqError::OutOfBounds {
                index,
                len: available.len(),
            })
    }

    pub fn available_function_block_id(&self, handle: Handle, index: usize) -> DaqResult<String> {
        let types = self.device(handle)?.available_function_block_types();
        types.get(index).map(|t| t.id.clone()).ok_or(DaqError::OutOfBounds {
            index,
            len: types.len(),
        })
    }

    pub fn save_configuration(&self, handle: Handle) -> DaqResult<String> {
        self.device(handle)?.save_configuration()
    }

    pub fn save_configuration_to_file(&self, handle: Handle, path: &Path) -> DaqResult<()> {
        let json = self.save_configuration(handle)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn load_configuration(&self, handle: Handle, json: &str) -> DaqResult<()> {
        self.device(handle)?.load_configuration(json)
    }

    pub fn load_configuration_from_file(&self, handle: Handle, path: &Path) -> DaqResult<()> {
        let device = self.device(handle)?;
        let json = std::fs::read_to_string(path)?;
        device.load_configuration(&json)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(())
    }

    // ── Input ports ──────────────────────────────────────────────────────

    /// Connect the port behind `port` to the signal `signal_id` found below
    /// the device behind `root`.
    pub fn input_port_connect(&self, port: Handle, signal_id: &str, root: Handle) -> DaqResult<()> {
        let port = self.object(port)?.as_input_port()?.clone();
        let ctx = CommandContext {
            root: Some(self.device(root)?),
        };
        input_port::connect(&port, signal_id, &ctx)
    }

    pub fn input_port_disconnect(&self, port: Handle) -> DaqResult<()> {
        self.object(port)?.as_input_port()?.disconnect()
    }

    // ── Signals ──────────────────────────────────────────────────────────

    /// Replace the handle's sample buffer with up to `count` samples.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidValue`] for counts above
    /// [`MAX_READ_COUNT`](crate::acquisition::MAX_READ_COUNT).
    pub fn signal_read(&mut self, handle: Handle, count: usize, timeout: Duration) -> DaqResult<usize> {
        let entry = self.entry_mut(handle)?;
        let count = check_count(count)?;
        let signal = entry.object.as_signal()?.clone();
        Ok(entry.samples.read(&signal, count, timeout))
    }

    fn samples(&self, handle: Handle) -> DaqResult<&SampleBuffer> {
        let entry = self.entry(handle)?;
        entry.object.as_signal()?;
        Ok(&entry.samples)
    }

    pub fn signal_readings(&self, handle: Handle) -> DaqResult<&[f64]> {
        self.samples(handle)?.readings()
    }

    pub fn signal_timestamps(&self, handle: Handle) -> DaqResult<&[i64]> {
        self.samples(handle)?.timestamps()
    }

    pub fn signal_copy_readings(&self, handle: Handle, out: &mut [f64]) -> DaqResult<usize> {
        self.samples(handle)?.copy_readings(out)
    }

    pub fn signal_copy_timestamps(&self, handle: Handle, out: &mut [i64]) -> DaqResult<usize> {
        self.samples(handle)?.copy_timestamps(out)
    }

    pub fn signal_read_count(&self, handle: Handle) -> DaqResult<usize> {
        self.samples(handle)?.read_count()
    }

    pub fn signal_erase_samples(&mut self, handle: Handle) -> DaqResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.object.as_signal()?;
        entry.samples.erase();
        Ok(())
    }

    pub fn signal_send_data_packet(&self, handle: Handle, values: &[f64]) -> DaqResult<()> {
        self.object(handle)?.as_signal()?.send_values(values.to_vec())
    }

    /// Send one full turn of a sine wave of `count` samples scaled to
    /// `range`.
    pub fn signal_send_test_data_packet(&self, handle: Handle, count: usize, range: f64) -> DaqResult<()> {
        let signal = self.object(handle)?.as_signal()?;
        let count = check_count(count)?;
        let values = (0..count)
            .map(|i| (TAU * i as f64 / count as f64).sin() * range)
            .collect();
        signal.send_values(values)
    }

    pub fn signal_load_descriptor_json(&self, handle: Handle, json: &str) -> DaqResult<()> {
        let signal = self.object(handle)?.as_signal()?;
        signal.set_descriptor(DataDescriptor::from_json(json)?);
        Ok(())
    }

    pub fn signal_load_descriptor_json_file(&self, handle: Handle, path: &Path) -> DaqResult<()> {
        let signal = self.object(handle)?.as_signal()?;
        let json = std::fs::read_to_string(path)?;
        signal.set_descriptor(DataDescriptor::from_json(&json)?);
        Ok(())
    }

    /// Descriptor JSON of a signal or descriptor handle.
    pub fn descriptor_save_json(&self, handle: Handle) -> DaqResult<String> {
        self.object(handle)?.descriptor()?.to_json()
    }

    pub fn descriptor_save_json_file(&self, handle: Handle, path: &Path) -> DaqResult<()> {
        let json = self.descriptor_save_json(handle)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Multi readers ────────────────────────────────────────────────────

    /// Bind the signals behind `handles` into one reader and return its id.
    pub fn multi_reader_bind(&mut self, handles: &[Handle]) -> DaqResult<i64> {
        if handles.is_empty() {
            return Err(DaqError::generic("A multi reader needs at least one signal."));
        }
        let signals = handles
            .iter()
            .map(|&h| self.object(h)?.as_signal().cloned())
            .collect::<DaqResult<Vec<_>>>()?;
        let id = self.next_reader_id;
        self.next_reader_id += 1;
        self.readers.insert(id, MultiReader::new(signals));
        debug!(id, signals = handles.len(), "multi reader bound");
        Ok(id)
    }

    /// Read the same number of samples from every bound signal.
    pub fn multi_reader_read(&self, id: i64, count: usize, timeout: Duration) -> DaqResult<Vec<Vec<TimedSample>>> {
        let reader = self.readers.get(&id).ok_or_else(|| DaqError::InvalidId(id.to_string()))?;
        Ok(reader.read(check_count(count)?, timeout))
    }

    pub fn multi_reader_signal_count(&self, id: i64) -> DaqResult<usize> {
        self.readers
            .get(&id)
            .map(MultiReader::signal_count)
            .ok_or_else(|| DaqError::InvalidId(id.to_string()))
    }

    pub fn multi_reader_unbind(&mut self, id: i64) -> DaqResult<()> {
        self.readers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DaqError::InvalidId(id.to_string()))
    }
}

/// One-line description of the library.
pub fn library_info() -> String {
    format!(
        "daqbridge {} - command dispatch and C interface over the daqbridge SDK",
        env!("CARGO_PKG_VERSION")
    )
}

const LIBRARY_HELP: &[&str] = &[
    "daq_instance_new()                          create an instance, returns its root device",
    "daq_object_free(h)                          release a handle",
    "daq_string_free(s)                          release a returned string",
    "daq_object_print|list|get|get_count(h, x)   generic queries",
    "daq_object_set(h, item, value)              assign a value",
    "daq_object_select(h, class, i)              select a child, returns a new handle",
    "daq_object_help(h)                          help for the handle's kind",
    "daq_object_execute(h, line, &out)           run a command line",
    "daq_device_*                                add, remove, discover, configuration",
    "daq_input_port_connect|disconnect           input port wiring",
    "daq_signal_*                                read samples, send packets, descriptors",
    "daq_multi_reader_bind|read|unbind           synchronized reads",
    "daq_stdout_*                                capture console output",
    "daq_timestamp_to_string(ns)                 render a timestamp",
];

pub fn library_help(sink: &mut dyn Sink) {
    sink.line(&library_info());
    for line in LIBRARY_HELP {
        sink.line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqbridge_types::ErrorCode;

    fn with_device() -> (Bridge, Handle, Handle) {
        let mut bridge = Bridge::default();
        let root = bridge.instance_new().unwrap();
        let dev = bridge.device_add_device(root, "daqref://device0").unwrap();
        (bridge, root, dev)
    }

    #[test]
    fn free_twice_is_reported() {
        let mut bridge = Bridge::default();
        let root = bridge.instance_new().unwrap();
        bridge.free(root).unwrap();
        assert!(!bridge.is_valid(root));
        assert_eq!(bridge.free(root).unwrap_err().code(), ErrorCode::InvalidPointer);
        assert_eq!(bridge.get(root, "name").unwrap_err().code(), ErrorCode::InvalidPointer);
    }

    #[test]
    fn out_of_bounds_select_registers_nothing() {
        let (mut bridge, root, _dev) = with_device();
        let before = bridge.handle_count();
        let err = bridge.select(root, "devices", 5).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfBounds);
        assert_eq!(bridge.handle_count(), before);

        let mut out = Vec::<String>::new();
        report(&err, &mut out);
        assert_eq!(out, vec!["Index out of bounds.".to_string()]);
    }

    #[test]
    fn channel_signal_descriptor_walk() {
        let (mut bridge, _root, dev) = with_device();
        let ch = bridge.select(dev, "channel", 0).unwrap();
        assert_eq!(bridge.kind(ch).unwrap(), ObjectKind::Channel);
        let sig = bridge.select(ch, "signal", 0).unwrap();
        let desc = bridge.select(sig, "descriptor", 0).unwrap();
        assert_eq!(bridge.get(desc, "sample-type").unwrap(), "Float64");
        assert_eq!(bridge.get(desc, "name").unwrap(), "AI0");
    }

    #[test]
    fn unknown_property_fails_for_set_and_get() {
        let (bridge, root, _dev) = with_device();
        assert_eq!(bridge.set(root, "Nope", "1").unwrap_err().code(), ErrorCode::PropertyDoesntExist);
        assert_eq!(bridge.get(root, "Nope").unwrap_err().code(), ErrorCode::PropertyDoesntExist);
    }

    #[test]
    fn execute_registers_selections() {
        let (mut bridge, root, _dev) = with_device();
        let mut out = Vec::<String>::new();
        let idle = bridge.execute(root, "", &mut out).unwrap();
        assert!(!idle.executed);

        let run = bridge.execute(root, "add function-block RefFBModuleScaling", &mut out).unwrap();
        let fb = run.selected.unwrap();
        let port = bridge.select(fb, "input-port", 0).unwrap();
        let sig_id = "/Instance/Dev/RefDev0/IO/AI/RefCh0/Sig/AI0";
        bridge.execute(port, &format!("connect {sig_id}"), &mut out).unwrap();
        assert_eq!(bridge.get(port, "signal-id").unwrap(), sig_id);
    }

    #[test]
    fn connect_searches_the_instance_that_owns_the_port() {
        let mut bridge = Bridge::default();
        let root_a = bridge.instance_new().unwrap();
        let fb = bridge.device_add_function_block(root_a, "RefFBModuleStatistics").unwrap();
        let port = bridge.select(fb, "input-port", 0).unwrap();
        let sig_id = "/Instance/Dev/RefDev0/IO/AI/RefCh0/Sig/AI0";

        // Only the second instance has a device carrying that id.
        let root_b = bridge.instance_new().unwrap();
        bridge.device_add_device(root_b, "daqref://device0").unwrap();
        let mut out = Vec::<String>::new();
        let err = bridge.execute(port, &format!("connect {sig_id}"), &mut out).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidId);

        let dev_a = bridge.device_add_device(root_a, "daqref://device0").unwrap();
        let ch_a = bridge.select(dev_a, "channel", 0).unwrap();
        let sig_a = bridge.select(ch_a, "signal", 0).unwrap();
        bridge.execute(port, &format!("connect {sig_id}"), &mut out).unwrap();
        let connected = bridge.object(port).unwrap().as_input_port().unwrap().signal().unwrap();
        assert!(Arc::ptr_eq(&connected, bridge.object(sig_a).unwrap().as_signal().unwrap()));
    }

    #[test]
    fn handles_inherit_the_owning_root() {
        let mut bridge = Bridge::default();
        let root_a = bridge.instance_new().unwrap();
        let root_b = bridge.instance_new().unwrap();
        let dev_a = bridge.device_add_device(root_a, "daqref://device0").unwrap();
        let mut out = Vec::<String>::new();
        let ch_a = bridge.execute(dev_a, "select channel 0", &mut out).unwrap().selected.unwrap();

        let owner = bridge.owning_root(ch_a).unwrap().unwrap();
        let expected = bridge.object(root_a).unwrap().as_device().unwrap().clone();
        let other = bridge.object(root_b).unwrap().as_device().unwrap().clone();
        assert!(Arc::ptr_eq(&owner, &expected));
        assert!(!Arc::ptr_eq(&owner, &other));
    }

    #[test]
    fn oversized_counts_are_rejected_without_reading() {
        let (mut bridge, _root, dev) = with_device();
        let ch = bridge.select(dev, "channel", 0).unwrap();
        let sig = bridge.select(ch, "signal", 0).unwrap();
        let huge = 1usize << 40;
        assert_eq!(
            bridge.signal_read(sig, huge, Duration::ZERO).unwrap_err().code(),
            ErrorCode::Generic
        );
        assert_eq!(bridge.signal_read_count(sig).unwrap_err().code(), ErrorCode::Uninitialized);
        assert_eq!(
            bridge.signal_send_test_data_packet(sig, huge, 1.0).unwrap_err().code(),
            ErrorCode::Generic
        );
        let id = bridge.multi_reader_bind(&[sig]).unwrap();
        assert_eq!(
            bridge.multi_reader_read(id, huge, Duration::ZERO).unwrap_err().code(),
            ErrorCode::Generic
        );
    }

    #[test]
    fn input_port_connect_needs_a_device_root() {
        let (mut bridge, root, dev) = with_device();
        let fb = bridge.device_add_function_block(root, "RefFBModuleStatistics").unwrap();
        let port = bridge.select(fb, "input-port", 0).unwrap();
        let sig_id = "/Instance/Dev/RefDev0/IO/AI/RefCh1/Sig/AI1";
        assert_eq!(
            bridge.input_port_connect(port, sig_id, fb).unwrap_err().code(),
            ErrorCode::TypeMismatch
        );
        bridge.input_port_connect(port, sig_id, dev).unwrap();
        bridge.input_port_disconnect(port).unwrap();
        assert_eq!(bridge.input_port_disconnect(port).unwrap_err().code(), ErrorCode::NotAvailable);
    }

    #[test]
    fn discovery_strings() {
        let (bridge, root, _dev) = with_device();
        assert_eq!(bridge.available_device_connection_string(root, 1).unwrap(), "daqref://device1");
        assert_eq!(
            bridge.available_device_connection_string(root, 2).unwrap_err().code(),
            ErrorCode::OutOfBounds
        );
        assert_eq!(bridge.available_function_block_id(root, 0).unwrap(), "RefFBModuleScaling");
    }

    #[test]
    fn configuration_round_trip_changes_saves() {
        let (bridge, root, dev) = with_device();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        bridge.set(dev, "GlobalSampleRate", "500").unwrap();
        bridge.save_configuration_to_file(root, &path).unwrap();
        bridge.set(dev, "GlobalSampleRate", "2000").unwrap();
        let changed = bridge.save_configuration(root).unwrap();
        assert_ne!(changed, std::fs::read_to_string(&path).unwrap());

        bridge.load_configuration_from_file(root, &path).unwrap();
        assert_eq!(bridge.get(dev, "GlobalSampleRate").unwrap(), "500");
        assert_eq!(bridge.load_configuration(root, "{").unwrap_err().code(), ErrorCode::InvalidJson);
    }

    #[test]
    fn sample_buffer_per_handle() {
        let (mut bridge, root, dev) = with_device();
        let fb = bridge.device_add_function_block(root, "RefFBModuleScaling").unwrap();
        let out = bridge.select(fb, "signal", 0).unwrap();
        assert_eq!(bridge.signal_read_count(out).unwrap_err().code(), ErrorCode::Uninitialized);
        assert_eq!(bridge.signal_read_count(dev).unwrap_err().code(), ErrorCode::TypeMismatch);

        // Output signal without a connected input: nothing arrives.
        assert_eq!(bridge.signal_read(out, 10, Duration::ZERO).unwrap(), 0);
        assert_eq!(bridge.signal_read_count(out).unwrap(), 0);
        bridge.signal_erase_samples(out).unwrap();
        assert!(bridge.signal_readings(out).is_err());
    }

    #[test]
    fn test_packets_reach_readers() {
        let (mut bridge, root, _dev) = with_device();
        let fb = bridge.device_add_function_block(root, "RefFBModuleScaling").unwrap();
        let sig = bridge.select(fb, "signal", 0).unwrap();
        bridge.signal_read(sig, 0, Duration::ZERO).unwrap();
        bridge.signal_send_test_data_packet(sig, 4, 2.0).unwrap();
        assert_eq!(bridge.signal_read(sig, 10, Duration::from_millis(20)).unwrap(), 4);
        let readings = bridge.signal_readings(sig).unwrap();
        assert!(readings[0].abs() < 1e-12);
        assert!((readings[1] - 2.0).abs() < 1e-12);
        let mut two = [0.0; 2];
        assert_eq!(bridge.signal_copy_readings(sig, &mut two).unwrap(), 2);
    }

    #[test]
    fn descriptor_json_load_and_save() {
        let (mut bridge, _root, dev) = with_device();
        let ch = bridge.select(dev, "channel", 0).unwrap();
        let sig = bridge.select(ch, "signal", 0).unwrap();
        let json = bridge.descriptor_save_json(sig).unwrap();
        let renamed = json.replace("\"AI0\"", "\"Renamed\"");
        bridge.signal_load_descriptor_json(sig, &renamed).unwrap();
        assert_eq!(bridge.get(sig, "name").unwrap(), "Renamed");
        assert_eq!(
            bridge.signal_load_descriptor_json(sig, "not json").unwrap_err().code(),
            ErrorCode::InvalidJson
        );
    }

    #[test]
    fn multi_reader_lifecycle() {
        let (mut bridge, root, _dev) = with_device();
        assert!(bridge.multi_reader_bind(&[]).is_err());
        assert_eq!(bridge.multi_reader_bind(&[root]).unwrap_err().code(), ErrorCode::TypeMismatch);

        let fb = bridge.device_add_function_block(root, "RefFBModuleScaling").unwrap();
        let sig = bridge.select(fb, "signal", 0).unwrap();
        let id = bridge.multi_reader_bind(&[sig]).unwrap();
        assert_eq!(bridge.multi_reader_signal_count(id).unwrap(), 1);
        bridge.signal_send_data_packet(sig, &[1.0, 2.0, 3.0]).unwrap();
        let blocks = bridge.multi_reader_read(id, 2, Duration::from_millis(20)).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].iter().map(|s| s.value).collect::<Vec<_>>(), vec![1.0, 2.0]);
        bridge.multi_reader_unbind(id).unwrap();
        assert_eq!(bridge.multi_reader_unbind(id).unwrap_err().code(), ErrorCode::InvalidId);
    }

    #[test]
    fn library_help_lists_functions() {
        let mut out = String::new();
        library_help(&mut out);
        assert!(out.starts_with("daqbridge "));
        assert!(out.contains("daq_object_execute"));
    }
}
