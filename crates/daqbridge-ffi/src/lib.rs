//! # daqbridge C interface
//!
//! C-compatible entry points over the `daqbridge` command dispatcher.
//! Every object (device, channel, function block, signal, input port, data
//! descriptor, sync component, property object) is reached through an
//! opaque handle; every operation returns `0` or a negative error code and
//! writes its diagnostic to the console.
//!
//! # Usage
//!
//! ```c
//! #include "daqbridge.h"
//!
//! DaqHandle root = daq_instance_new();
//! DaqHandle dev = daq_device_add_device(root, "daqref://device0");
//!
//! const char* name = daq_object_get(dev, "name");
//! printf("%s\n", name);
//! daq_string_free(name);
//!
//! DaqHandle ch = daq_object_select(dev, "channel", 0);
//! DaqHandle sig = daq_object_select(ch, "signal", 0);
//! int n = daq_signal_read(sig, 100, 1000);
//! const double* values = daq_signal_readings(sig);
//!
//! daq_object_free(sig);
//! daq_object_free(ch);
//! daq_object_free(dev);
//! daq_object_free(root);
//! ```
//!
//! # Threading
//!
//! All state sits behind one process-wide lock, so calls from several
//! threads are serialised. Pointers returned by `daq_signal_readings` and
//! `daq_signal_timestamps` stay valid until the next read, erase or free on
//! the same handle.

#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use std::slice;
use std::sync::LazyLock;
use std::time::Duration;

use daqbridge_core::bridge::{self, Bridge};
use daqbridge_core::{Console, Handle, Sink, acquisition, config, console, telemetry};
use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use parking_lot::{Mutex, MutexGuard};
use tracing::{error, warn};

/// Opaque object handle. `NULL` is never a valid handle.
pub type DaqHandle = *mut c_void;

static BRIDGE: LazyLock<Mutex<Bridge>> = LazyLock::new(|| {
    telemetry::init_tracing("warn");
    let config = match config::load() {
        Ok(cfg) => cfg.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable config, using defaults");
            config::Config::default()
        }
    };
    Mutex::new(Bridge::new(config))
});

static LIBRARY_INFO: LazyLock<CString> =
    LazyLock::new(|| CString::new(bridge::library_info()).unwrap_or_default());

// =============================================================================
// BOUNDARY HELPERS
// =============================================================================

fn lock() -> MutexGuard<'static, Bridge> {
    BRIDGE.lock()
}

/// Run `body`, turning a panic into `fallback`.
fn guarded<T>(function: &'static str, fallback: T, body: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            error!(function, "panic caught at the C boundary");
            Console.line("Internal error.");
            fallback
        }
    }
}

fn fail(err: &DaqError) -> c_int {
    bridge::report(err, &mut Console);
    err.code().as_i32()
}

fn status(result: DaqResult<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => fail(&e),
    }
}

fn count(result: DaqResult<usize>) -> c_int {
    match result {
        Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
        Err(e) => fail(&e),
    }
}

fn handle_out(result: DaqResult<Handle>) -> DaqHandle {
    match result {
        Ok(h) => h.raw() as DaqHandle,
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

fn string_out(bridge: &mut Bridge, result: DaqResult<String>) -> *const c_char {
    match result {
        Ok(text) => bridge.intern(text),
        Err(e) => {
            fail(&e);
            ptr::null()
        }
    }
}

fn handle(ptr: DaqHandle) -> DaqResult<Handle> {
    Handle::from_raw(ptr as usize).ok_or(DaqError::InvalidHandle)
}

fn timeout(ms: c_int) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// Borrow a NUL-terminated UTF-8 argument.
unsafe fn text<'a>(ptr: *const c_char, what: &'static str) -> DaqResult<&'a str> {
    if ptr.is_null() {
        return Err(DaqError::NullPointer(what));
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| DaqError::InvalidValue {
        item: what.to_string(),
        value: "<non UTF-8>".to_string(),
    })
}

fn kind_name(kind: ObjectKind) -> &'static CStr {
    match kind {
        ObjectKind::Device => c"Device",
        ObjectKind::Channel => c"Channel",
        ObjectKind::FunctionBlock => c"FunctionBlock",
        ObjectKind::Signal => c"Signal",
        ObjectKind::InputPort => c"InputPort",
        ObjectKind::DataDescriptor => c"DataDescriptor",
        ObjectKind::SyncComponent => c"SyncComponent",
        ObjectKind::PropertyObject => c"PropertyObject",
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Static description of the library. Must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn daq_library_info() -> *const c_char {
    LIBRARY_INFO.as_ptr()
}

/// Print an overview of the C surface.
#[unsafe(no_mangle)]
pub extern "C" fn daq_library_help() -> c_int {
    guarded("daq_library_help", -1, || {
        bridge::library_help(&mut Console);
        0
    })
}

/// Create an instance with the reference module loaded and return a handle
/// to its root device, or `NULL` on failure.
#[unsafe(no_mangle)]
pub extern "C" fn daq_instance_new() -> DaqHandle {
    guarded("daq_instance_new", ptr::null_mut(), || handle_out(lock().instance_new()))
}

/// Release a handle. Freeing twice returns -2.
#[unsafe(no_mangle)]
pub extern "C" fn daq_object_free(obj: DaqHandle) -> c_int {
    guarded("daq_object_free", -1, || status(handle(obj).and_then(|h| lock().free(h))))
}

/// Release a string returned by this library.
///
/// # Safety
///
/// `text` must be `NULL` or a pointer returned by a `daq_*` function that
/// has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_string_free(text: *const c_char) -> c_int {
    guarded("daq_string_free", -1, || {
        if text.is_null() {
            return status(Err(DaqError::NullPointer("text")));
        }
        status(lock().release_string(text))
    })
}

/// Kind name of the object behind `obj` (static, must not be freed), or
/// `NULL` for an invalid handle.
#[unsafe(no_mangle)]
pub extern "C" fn daq_object_kind(obj: DaqHandle) -> *const c_char {
    guarded("daq_object_kind", ptr::null(), || {
        match handle(obj).and_then(|h| lock().kind(h)) {
            Ok(kind) => kind_name(kind).as_ptr(),
            Err(e) => {
                fail(&e);
                ptr::null()
            }
        }
    })
}

// =============================================================================
// GENERIC OPERATIONS
// =============================================================================

/// Print `item` of the object.
///
/// # Safety
///
/// `item` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_print(obj: DaqHandle, item: *const c_char) -> c_int {
    guarded("daq_object_print", -1, || {
        status((|| {
            let item = unsafe { text(item, "item") }?;
            lock().print(handle(obj)?, item, &mut Console)
        })())
    })
}

/// Print the members of `class`.
///
/// # Safety
///
/// `class` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_list(obj: DaqHandle, class: *const c_char) -> c_int {
    guarded("daq_object_list", -1, || {
        status((|| {
            let class = unsafe { text(class, "class") }?;
            lock().list(handle(obj)?, class, &mut Console)
        })())
    })
}

/// Value of `item` as a string the caller frees with `daq_string_free`, or
/// `NULL` on failure.
///
/// # Safety
///
/// `item` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_get(obj: DaqHandle, item: *const c_char) -> *const c_char {
    guarded("daq_object_get", ptr::null(), || {
        let mut bridge = lock();
        let value = (|| {
            let item = unsafe { text(item, "item") }?;
            bridge.get(handle(obj)?, item)
        })();
        string_out(&mut bridge, value)
    })
}

/// Number of members of `class`, or a negative error code.
///
/// # Safety
///
/// `class` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_get_count(obj: DaqHandle, class: *const c_char) -> c_int {
    guarded("daq_object_get_count", -1, || {
        count((|| {
            let class = unsafe { text(class, "class") }?;
            lock().count(handle(obj)?, class)
        })())
    })
}

/// Assign `value` to `item`.
///
/// # Safety
///
/// `item` and `value` must be valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_set(obj: DaqHandle, item: *const c_char, value: *const c_char) -> c_int {
    guarded("daq_object_set", -1, || {
        status((|| {
            let item = unsafe { text(item, "item") }?;
            let value = unsafe { text(value, "value") }?;
            lock().set(handle(obj)?, item, value)
        })())
    })
}

/// Select member `index` of `class` and return a new handle, or `NULL`.
///
/// # Safety
///
/// `class` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_select(obj: DaqHandle, class: *const c_char, index: usize) -> DaqHandle {
    guarded("daq_object_select", ptr::null_mut(), || {
        handle_out((|| {
            let class = unsafe { text(class, "class") }?;
            lock().select(handle(obj)?, class, index)
        })())
    })
}

/// Print the commands available for the object's kind.
#[unsafe(no_mangle)]
pub extern "C" fn daq_object_help(obj: DaqHandle) -> c_int {
    guarded("daq_object_help", -1, || {
        if obj.is_null() {
            Console.line("No object given. Create one with daq_instance_new() and pass its handle.");
            return DaqError::InvalidHandle.code().as_i32();
        }
        status(handle(obj).and_then(|h| lock().help(h, &mut Console)))
    })
}

/// Run one command line against the object. Returns 1 if a command ran,
/// 0 for an empty line, or a negative error code. When the command selects
/// or creates an object its new handle is stored in `*selected`, otherwise
/// `*selected` is set to `NULL`.
///
/// # Safety
///
/// `line` must be a valid NUL-terminated string. `selected` must be `NULL`
/// or point to writable storage for one handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_object_execute(obj: DaqHandle, line: *const c_char, selected: *mut DaqHandle) -> c_int {
    guarded("daq_object_execute", -1, || {
        if !selected.is_null() {
            unsafe { *selected = ptr::null_mut() };
        }
        let mut bridge = lock();
        let result = (|| {
            let line = unsafe { text(line, "line") }?;
            bridge.execute(handle(obj)?, line, &mut Console)
        })();
        match result {
            Ok(execution) => {
                if let Some(h) = execution.selected {
                    if selected.is_null() {
                        // Nobody can free it later.
                        let _ = bridge.free(h);
                    } else {
                        unsafe { *selected = h.raw() as DaqHandle };
                    }
                }
                c_int::from(execution.executed)
            }
            Err(e) => fail(&e),
        }
    })
}

// =============================================================================
// DEVICES
// =============================================================================

/// Add a `device` (connection string) or `function-block` (type id) and
/// return its handle, or `NULL`.
///
/// # Safety
///
/// `what` and `value` must be valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_add(dev: DaqHandle, what: *const c_char, value: *const c_char) -> DaqHandle {
    guarded("daq_device_add", ptr::null_mut(), || {
        handle_out((|| {
            let what = unsafe { text(what, "what") }?;
            let value = unsafe { text(value, "value") }?;
            lock().device_add(handle(dev)?, what, value)
        })())
    })
}

/// # Safety
///
/// `connection_string` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_add_device(dev: DaqHandle, connection_string: *const c_char) -> DaqHandle {
    guarded("daq_device_add_device", ptr::null_mut(), || {
        handle_out((|| {
            let conn = unsafe { text(connection_string, "connection_string") }?;
            lock().device_add_device(handle(dev)?, conn)
        })())
    })
}

/// # Safety
///
/// `type_id` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_add_function_block(dev: DaqHandle, type_id: *const c_char) -> DaqHandle {
    guarded("daq_device_add_function_block", ptr::null_mut(), || {
        handle_out((|| {
            let type_id = unsafe { text(type_id, "type_id") }?;
            lock().device_add_function_block(handle(dev)?, type_id)
        })())
    })
}

/// Remove the `index`-th `device` or `function-block`.
///
/// # Safety
///
/// `what` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_remove(dev: DaqHandle, what: *const c_char, index: usize) -> c_int {
    guarded("daq_device_remove", -1, || {
        status((|| {
            let what = unsafe { text(what, "what") }?;
            lock().device_remove(handle(dev)?, what, index)
        })())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_device_remove_device(dev: DaqHandle, index: usize) -> c_int {
    guarded("daq_device_remove_device", -1, || {
        status(handle(dev).and_then(|h| lock().device_remove_device(h, index)))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_device_remove_function_block(dev: DaqHandle, index: usize) -> c_int {
    guarded("daq_device_remove_function_block", -1, || {
        status(handle(dev).and_then(|h| lock().device_remove_function_block(h, index)))
    })
}

/// Connection string of the `index`-th discoverable device. Free with
/// `daq_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn daq_device_available_device_connection_string(dev: DaqHandle, index: usize) -> *const c_char {
    guarded("daq_device_available_device_connection_string", ptr::null(), || {
        let mut bridge = lock();
        let value = handle(dev).and_then(|h| bridge.available_device_connection_string(h, index));
        string_out(&mut bridge, value)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_device_available_function_block_id(dev: DaqHandle, index: usize) -> *const c_char {
    guarded("daq_device_available_function_block_id", ptr::null(), || {
        let mut bridge = lock();
        let value = handle(dev).and_then(|h| bridge.available_function_block_id(h, index));
        string_out(&mut bridge, value)
    })
}

/// Apply a configuration JSON document to the device.
///
/// # Safety
///
/// `json` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_load_configuration(dev: DaqHandle, json: *const c_char) -> c_int {
    guarded("daq_device_load_configuration", -1, || {
        status((|| {
            let json = unsafe { text(json, "json") }?;
            lock().load_configuration(handle(dev)?, json)
        })())
    })
}

/// # Safety
///
/// `path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_load_configuration_from_file(dev: DaqHandle, path: *const c_char) -> c_int {
    guarded("daq_device_load_configuration_from_file", -1, || {
        status((|| {
            let path = unsafe { text(path, "path") }?;
            lock().load_configuration_from_file(handle(dev)?, Path::new(path))
        })())
    })
}

/// Configuration JSON of the device. Free with `daq_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn daq_device_save_configuration(dev: DaqHandle) -> *const c_char {
    guarded("daq_device_save_configuration", ptr::null(), || {
        let mut bridge = lock();
        let value = handle(dev).and_then(|h| bridge.save_configuration(h));
        string_out(&mut bridge, value)
    })
}

/// # Safety
///
/// `path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_device_save_configuration_to_file(dev: DaqHandle, path: *const c_char) -> c_int {
    guarded("daq_device_save_configuration_to_file", -1, || {
        status((|| {
            let path = unsafe { text(path, "path") }?;
            lock().save_configuration_to_file(handle(dev)?, Path::new(path))
        })())
    })
}

// =============================================================================
// INPUT PORTS
// =============================================================================

/// Connect the port to the signal with global id `signal_id`, searched in
/// the tree under `root`.
///
/// # Safety
///
/// `signal_id` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_input_port_connect(port: DaqHandle, signal_id: *const c_char, root: DaqHandle) -> c_int {
    guarded("daq_input_port_connect", -1, || {
        status((|| {
            let signal_id = unsafe { text(signal_id, "signal_id") }?;
            lock().input_port_connect(handle(port)?, signal_id, handle(root)?)
        })())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_input_port_disconnect(port: DaqHandle) -> c_int {
    guarded("daq_input_port_disconnect", -1, || {
        status(handle(port).and_then(|h| lock().input_port_disconnect(h)))
    })
}

// =============================================================================
// SIGNALS
// =============================================================================

/// Read up to `count` samples, waiting at most `timeout_ms` (negative
/// values mean no wait). Replaces the handle's sample buffer and returns
/// how many samples it now holds. Counts above `DAQ_MAX_READ_COUNT` fail
/// with -1 and leave the buffer untouched.
#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_read(sig: DaqHandle, count: usize, timeout_ms: c_int) -> c_int {
    guarded("daq_signal_read", -1, || {
        self::count(handle(sig).and_then(|h| lock().signal_read(h, count, timeout(timeout_ms))))
    })
}

/// Values of the last read, or `NULL` before the first read. Owned by the
/// library; valid until the next read, erase or free on this handle.
#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_readings(sig: DaqHandle) -> *const f64 {
    guarded("daq_signal_readings", ptr::null(), || {
        match handle(sig).and_then(|h| lock().signal_readings(h).map(<[f64]>::as_ptr)) {
            Ok(p) => p,
            Err(e) => {
                fail(&e);
                ptr::null()
            }
        }
    })
}

/// Timestamps (ns since the Unix epoch) of the last read. Same lifetime as
/// [`daq_signal_readings`].
#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_timestamps(sig: DaqHandle) -> *const i64 {
    guarded("daq_signal_timestamps", ptr::null(), || {
        match handle(sig).and_then(|h| lock().signal_timestamps(h).map(<[i64]>::as_ptr)) {
            Ok(p) => p,
            Err(e) => {
                fail(&e);
                ptr::null()
            }
        }
    })
}

/// Copy at most `len` values of the last read into `out`. Returns how many
/// were copied.
///
/// # Safety
///
/// `out` must point to at least `len` writable doubles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_signal_copy_readings(sig: DaqHandle, out: *mut f64, len: usize) -> c_int {
    guarded("daq_signal_copy_readings", -1, || {
        count((|| {
            let h = handle(sig)?;
            if out.is_null() {
                return Err(DaqError::NullPointer("out"));
            }
            let out = unsafe { slice::from_raw_parts_mut(out, len) };
            lock().signal_copy_readings(h, out)
        })())
    })
}

/// # Safety
///
/// `out` must point to at least `len` writable 64-bit integers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_signal_copy_timestamps(sig: DaqHandle, out: *mut i64, len: usize) -> c_int {
    guarded("daq_signal_copy_timestamps", -1, || {
        count((|| {
            let h = handle(sig)?;
            if out.is_null() {
                return Err(DaqError::NullPointer("out"));
            }
            let out = unsafe { slice::from_raw_parts_mut(out, len) };
            lock().signal_copy_timestamps(h, out)
        })())
    })
}

/// Number of samples held by the handle, or -10 before the first read.
#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_read_count(sig: DaqHandle) -> c_int {
    guarded("daq_signal_read_count", -1, || {
        count(handle(sig).and_then(|h| lock().signal_read_count(h)))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_erase_samples(sig: DaqHandle) -> c_int {
    guarded("daq_signal_erase_samples", -1, || {
        status(handle(sig).and_then(|h| lock().signal_erase_samples(h)))
    })
}

/// Send `len` values as one packet on the signal.
///
/// # Safety
///
/// `data` must point to at least `len` readable doubles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_signal_send_data_packet(sig: DaqHandle, data: *const f64, len: usize) -> c_int {
    guarded("daq_signal_send_data_packet", -1, || {
        status((|| {
            let h = handle(sig)?;
            if data.is_null() {
                return Err(DaqError::NullPointer("data"));
            }
            let values = unsafe { slice::from_raw_parts(data, len) };
            lock().signal_send_data_packet(h, values)
        })())
    })
}

/// Send one period of a sine with `count` samples and amplitude `range`.
/// `count` is limited like [`daq_signal_read`].
#[unsafe(no_mangle)]
pub extern "C" fn daq_signal_send_test_data_packet(sig: DaqHandle, count: usize, range: f64) -> c_int {
    guarded("daq_signal_send_test_data_packet", -1, || {
        status(handle(sig).and_then(|h| lock().signal_send_test_data_packet(h, count, range)))
    })
}

/// Replace the signal's descriptor with one parsed from JSON.
///
/// # Safety
///
/// `json` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_signal_load_descriptor_json(sig: DaqHandle, json: *const c_char) -> c_int {
    guarded("daq_signal_load_descriptor_json", -1, || {
        status((|| {
            let json = unsafe { text(json, "json") }?;
            lock().signal_load_descriptor_json(handle(sig)?, json)
        })())
    })
}

/// # Safety
///
/// `path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_signal_load_descriptor_json_file(sig: DaqHandle, path: *const c_char) -> c_int {
    guarded("daq_signal_load_descriptor_json_file", -1, || {
        status((|| {
            let path = unsafe { text(path, "path") }?;
            lock().signal_load_descriptor_json_file(handle(sig)?, Path::new(path))
        })())
    })
}

/// Descriptor JSON. Free with `daq_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn daq_descriptor_save_json(desc: DaqHandle) -> *const c_char {
    guarded("daq_descriptor_save_json", ptr::null(), || {
        let mut bridge = lock();
        let value = handle(desc).and_then(|h| bridge.descriptor_save_json(h));
        string_out(&mut bridge, value)
    })
}

/// # Safety
///
/// `path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_descriptor_save_json_file(desc: DaqHandle, path: *const c_char) -> c_int {
    guarded("daq_descriptor_save_json_file", -1, || {
        status((|| {
            let path = unsafe { text(path, "path") }?;
            lock().descriptor_save_json_file(handle(desc)?, Path::new(path))
        })())
    })
}

// =============================================================================
// MULTI READERS
// =============================================================================

/// Bind `len` signal handles into one reader. Returns a positive reader id
/// or a negative error code.
///
/// # Safety
///
/// `signals` must point to at least `len` handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_multi_reader_bind(signals: *const DaqHandle, len: usize) -> i64 {
    guarded("daq_multi_reader_bind", -1, || {
        let result = (|| {
            if signals.is_null() {
                return Err(DaqError::NullPointer("signals"));
            }
            let handles = unsafe { slice::from_raw_parts(signals, len) }
                .iter()
                .map(|&p| handle(p))
                .collect::<DaqResult<Vec<_>>>()?;
            lock().multi_reader_bind(&handles)
        })();
        match result {
            Ok(id) => id,
            Err(e) => i64::from(fail(&e)),
        }
    })
}

/// Read up to `count` samples from every bound signal. `data[i]` receives
/// the values of the `i`-th signal; `timestamps` may be `NULL`, otherwise
/// `timestamps[i]` receives its timestamps. Returns the number of samples
/// written per signal.
///
/// # Safety
///
/// `data` (and `timestamps` unless `NULL`) must point to one buffer pointer
/// per bound signal, each buffer holding at least `count` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn daq_multi_reader_read(
    id: i64,
    count: usize,
    timeout_ms: c_int,
    data: *const *mut f64,
    timestamps: *const *mut i64,
) -> c_int {
    guarded("daq_multi_reader_read", -1, || {
        let bridge = lock();
        let result = (|| {
            let signals = bridge.multi_reader_signal_count(id)?;
            if data.is_null() {
                return Err(DaqError::NullPointer("data"));
            }
            let values_out = unsafe { slice::from_raw_parts(data, signals) };
            if values_out.iter().any(|p| p.is_null()) {
                return Err(DaqError::NullPointer("data[i]"));
            }
            let times_out = if timestamps.is_null() {
                None
            } else {
                let out = unsafe { slice::from_raw_parts(timestamps, signals) };
                if out.iter().any(|p| p.is_null()) {
                    return Err(DaqError::NullPointer("timestamps[i]"));
                }
                Some(out)
            };

            let columns = bridge.multi_reader_read(id, count, timeout(timeout_ms))?;
            for (i, column) in columns.iter().enumerate().take(signals) {
                let n = column.len().min(count);
                let values = unsafe { slice::from_raw_parts_mut(values_out[i], n) };
                for (dst, sample) in values.iter_mut().zip(column) {
                    *dst = sample.value;
                }
                if let Some(times_out) = times_out {
                    let times = unsafe { slice::from_raw_parts_mut(times_out[i], n) };
                    for (dst, sample) in times.iter_mut().zip(column) {
                        *dst = sample.timestamp_ns;
                    }
                }
            }
            Ok(columns.first().map_or(0, |c| c.len().min(count)))
        })();
        drop(bridge);
        self::count(result)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_multi_reader_unbind(id: i64) -> c_int {
    guarded("daq_multi_reader_unbind", -1, || status(lock().multi_reader_unbind(id)))
}

// =============================================================================
// CONSOLE CAPTURE
// =============================================================================

/// Capture console output into a buffer instead of stdout.
#[unsafe(no_mangle)]
pub extern "C" fn daq_stdout_pipe_to_string() -> c_int {
    guarded("daq_stdout_pipe_to_string", -1, || {
        console::pipe_to_string();
        0
    })
}

/// Send console output to stdout again. The buffer is kept.
#[unsafe(no_mangle)]
pub extern "C" fn daq_stdout_default() -> c_int {
    guarded("daq_stdout_default", -1, || {
        console::restore_default();
        0
    })
}

/// Copy of the capture buffer. Free with `daq_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn daq_stdout_buffer() -> *const c_char {
    guarded("daq_stdout_buffer", ptr::null(), || lock().intern(console::buffer()))
}

#[unsafe(no_mangle)]
pub extern "C" fn daq_stdout_erase_buffer() -> c_int {
    guarded("daq_stdout_erase_buffer", -1, || {
        console::erase_buffer();
        0
    })
}

// =============================================================================
// UTILITIES
// =============================================================================

/// Render nanoseconds since the Unix epoch as
/// `YYYY-MM-DD HH:MM:SS.fffffff` (UTC). Free with `daq_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn daq_timestamp_to_string(ns: i64) -> *const c_char {
    guarded("daq_timestamp_to_string", ptr::null(), || {
        lock().intern(acquisition::format_timestamp(ns))
    })
}
