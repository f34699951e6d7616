//! Drives the exported `daq_*` functions the way a C host would. The
//! bridge behind them is process-global, so every test is serialised.

use std::ffi::{CStr, CString, c_char};
use std::ptr;

use daqbridge::*;
use serial_test::serial;

const SIGNAL_ID: &str = "/Instance/Dev/RefDev0/IO/AI/RefCh0/Sig/AI0";

/// Copy a returned string and release it.
fn take(text: *const c_char) -> String {
    assert!(!text.is_null(), "expected a string");
    let owned = unsafe { CStr::from_ptr(text) }.to_str().unwrap().to_owned();
    assert_eq!(unsafe { daq_string_free(text) }, 0);
    owned
}

fn cstr(text: &str) -> CString {
    CString::new(text).unwrap()
}

fn instance_with_device() -> (DaqHandle, DaqHandle) {
    let root = daq_instance_new();
    assert!(!root.is_null());
    let dev = unsafe { daq_device_add_device(root, c"daqref://device0".as_ptr()) };
    assert!(!dev.is_null());
    (root, dev)
}

fn first_signal(dev: DaqHandle) -> (DaqHandle, DaqHandle) {
    let ch = unsafe { daq_object_select(dev, c"channel".as_ptr(), 0) };
    assert!(!ch.is_null());
    let sig = unsafe { daq_object_select(ch, c"signal".as_ptr(), 0) };
    assert!(!sig.is_null());
    (ch, sig)
}

fn free_all(handles: &[DaqHandle]) {
    for &h in handles.iter().rev() {
        assert_eq!(daq_object_free(h), 0);
    }
}

#[test]
#[serial]
fn device_name_through_a_fresh_instance() {
    let (root, dev) = instance_with_device();
    assert_eq!(take(unsafe { daq_object_get(dev, c"name".as_ptr()) }), "Reference device 0");
    assert_eq!(unsafe { daq_object_get_count(root, c"devices".as_ptr()) }, 1);
    assert_eq!(unsafe { CStr::from_ptr(daq_object_kind(dev)) }.to_str().unwrap(), "Device");
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn freed_handles_are_invalid() {
    let root = daq_instance_new();
    assert_eq!(daq_object_free(root), 0);
    assert_eq!(daq_object_free(root), -2);
    assert!(unsafe { daq_object_get(root, c"name".as_ptr()) }.is_null());
    assert_eq!(daq_object_free(ptr::null_mut()), -2);
    assert_eq!(daq_object_help(ptr::null_mut()), -2);
}

#[test]
#[serial]
fn strings_are_released_once() {
    let text = daq_timestamp_to_string(0);
    assert_eq!(unsafe { CStr::from_ptr(text) }.to_str().unwrap(), "1970-01-01 00:00:00.0000000");
    assert_eq!(unsafe { daq_string_free(text) }, 0);
    assert_eq!(unsafe { daq_string_free(text) }, -2);
    assert_eq!(unsafe { daq_string_free(ptr::null()) }, -2);
}

#[test]
#[serial]
fn channel_signal_descriptor_scenario() {
    let (root, dev) = instance_with_device();
    let (ch, sig) = first_signal(dev);
    assert_eq!(unsafe { CStr::from_ptr(daq_object_kind(ch)) }.to_str().unwrap(), "Channel");
    assert_eq!(take(unsafe { daq_object_get(sig, c"id".as_ptr()) }), SIGNAL_ID);

    let desc = unsafe { daq_object_select(sig, c"descriptor".as_ptr(), 0) };
    assert!(!desc.is_null());
    assert_eq!(take(unsafe { daq_object_get(desc, c"sample-type".as_ptr()) }), "Float64");
    free_all(&[root, dev, ch, sig, desc]);
}

#[test]
#[serial]
fn select_out_of_bounds_creates_no_handle() {
    let (root, dev) = instance_with_device();
    assert!(unsafe { daq_object_select(root, c"devices".as_ptr(), 7) }.is_null());
    assert!(unsafe { daq_object_select(dev, c"nonsense".as_ptr(), 0) }.is_null());
    assert!(unsafe { daq_object_select(dev, ptr::null(), 0) }.is_null());
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn unknown_properties_fail_with_minus_five() {
    let (root, dev) = instance_with_device();
    assert_eq!(unsafe { daq_object_set(dev, c"NoSuchProperty".as_ptr(), c"1".as_ptr()) }, -5);
    assert!(unsafe { daq_object_get(dev, c"NoSuchProperty".as_ptr()) }.is_null());
    assert_eq!(unsafe { daq_object_print(dev, c"NoSuchProperty".as_ptr()) }, -5);
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn repeated_reads_replace_the_buffer() {
    let (root, dev) = instance_with_device();
    let (ch, sig) = first_signal(dev);
    assert_eq!(daq_signal_read_count(sig), -10);
    assert!(daq_signal_readings(sig).is_null());

    assert_eq!(daq_signal_read(sig, 20, 2000), 20);
    let mut first = [0i64; 20];
    assert_eq!(unsafe { daq_signal_copy_timestamps(sig, first.as_mut_ptr(), 20) }, 20);

    assert_eq!(daq_signal_read(sig, 20, 2000), 20);
    assert_eq!(daq_signal_read_count(sig), 20);
    let mut short = [0.0f64; 8];
    assert_eq!(unsafe { daq_signal_copy_readings(sig, short.as_mut_ptr(), 8) }, 8);
    let mut second = [0i64; 20];
    assert_eq!(unsafe { daq_signal_copy_timestamps(sig, second.as_mut_ptr(), 20) }, 20);
    assert!(second[0] > first[19], "reads continue where the last one stopped");

    let values = daq_signal_readings(sig);
    assert!(!values.is_null());
    assert_eq!(unsafe { *values }, short[0]);

    assert_eq!(daq_signal_erase_samples(sig), 0);
    assert_eq!(daq_signal_read_count(sig), -10);
    assert_eq!(unsafe { daq_signal_copy_readings(sig, ptr::null_mut(), 4) }, -2);
    free_all(&[root, dev, ch, sig]);
}

#[test]
#[serial]
fn oversized_counts_return_an_error_code() {
    let (root, dev) = instance_with_device();
    let (ch, sig) = first_signal(dev);
    let huge = 1usize << 40;
    assert_eq!(daq_signal_read(sig, huge, 0), -1);
    assert_eq!(daq_signal_read_count(sig), -10);
    assert_eq!(daq_signal_send_test_data_packet(sig, huge, 1.0), -1);

    let signals = [sig];
    let id = unsafe { daq_multi_reader_bind(signals.as_ptr(), signals.len()) };
    let mut values = [0.0f64; 1];
    let data = [values.as_mut_ptr()];
    assert_eq!(unsafe { daq_multi_reader_read(id, huge, 0, data.as_ptr(), ptr::null()) }, -1);
    assert_eq!(daq_multi_reader_unbind(id), 0);

    assert_eq!(daq_signal_read(sig, 5, 2000), 5);
    free_all(&[root, dev, ch, sig]);
}

#[test]
#[serial]
fn execute_connects_within_the_port_instance() {
    let root_a = daq_instance_new();
    let fb = unsafe { daq_device_add_function_block(root_a, c"RefFBModuleStatistics".as_ptr()) };
    let port = unsafe { daq_object_select(fb, c"input-port".as_ptr(), 0) };
    let (root_b, dev_b) = instance_with_device();

    let line = cstr(&format!("connect {SIGNAL_ID}"));
    let mut selected: DaqHandle = ptr::null_mut();
    assert_eq!(unsafe { daq_object_execute(port, line.as_ptr(), &mut selected) }, -7);

    let dev_a = unsafe { daq_device_add_device(root_a, c"daqref://device0".as_ptr()) };
    assert_eq!(unsafe { daq_object_execute(port, line.as_ptr(), &mut selected) }, 1);
    assert!(selected.is_null());
    assert_eq!(take(unsafe { daq_object_get(port, c"signal-id".as_ptr()) }), SIGNAL_ID);
    free_all(&[root_a, fb, port, root_b, dev_b, dev_a]);
}

#[test]
#[serial]
fn function_block_processes_a_test_packet() {
    let (root, dev) = instance_with_device();
    let fb = unsafe { daq_device_add_function_block(root, c"RefFBModuleScaling".as_ptr()) };
    assert!(!fb.is_null());
    let out = unsafe { daq_object_select(fb, c"signal".as_ptr(), 0) };
    assert_eq!(daq_signal_read(out, 0, 0), 0);

    assert_eq!(daq_signal_send_test_data_packet(out, 4, 3.0), 0);
    assert_eq!(daq_signal_read(out, 10, 100), 4);
    let mut values = [0.0f64; 4];
    assert_eq!(unsafe { daq_signal_copy_readings(out, values.as_mut_ptr(), 4) }, 4);
    assert!((values[1] - 3.0).abs() < 1e-9);

    let packet = [0.5, 1.5];
    assert_eq!(unsafe { daq_signal_send_data_packet(out, packet.as_ptr(), packet.len()) }, 0);
    assert_eq!(daq_signal_read(out, 10, 100), 2);
    assert_eq!(daq_device_remove_function_block(root, 0), 0);
    assert_eq!(daq_device_remove_function_block(root, 0), -6);
    free_all(&[root, dev, fb, out]);
}

#[test]
#[serial]
fn input_port_wiring() {
    let (root, dev) = instance_with_device();
    let fb = unsafe { daq_device_add(root, c"function-block".as_ptr(), c"RefFBModuleStatistics".as_ptr()) };
    assert!(!fb.is_null());
    let port = unsafe { daq_object_select(fb, c"input-port".as_ptr(), 0) };
    assert!(!port.is_null());

    let id = cstr(SIGNAL_ID);
    assert_eq!(unsafe { daq_input_port_connect(port, id.as_ptr(), root) }, 0);
    assert_eq!(take(unsafe { daq_object_get(port, c"signal-id".as_ptr()) }), SIGNAL_ID);
    assert_eq!(unsafe { daq_input_port_connect(port, c"/nope".as_ptr(), root) }, -7);
    assert_eq!(unsafe { daq_input_port_connect(port, id.as_ptr(), fb) }, -4);
    assert_eq!(daq_input_port_disconnect(port), 0);
    free_all(&[root, dev, fb, port]);
}

#[test]
#[serial]
fn execute_returns_selected_handles() {
    let (root, dev) = instance_with_device();
    let mut selected: DaqHandle = ptr::null_mut();
    assert_eq!(unsafe { daq_object_execute(dev, c"  ".as_ptr(), &mut selected) }, 0);
    assert!(selected.is_null());

    assert_eq!(unsafe { daq_object_execute(dev, c"select channel 0".as_ptr(), &mut selected) }, 1);
    assert!(!selected.is_null());
    assert_eq!(unsafe { CStr::from_ptr(daq_object_kind(selected)) }.to_str().unwrap(), "Channel");
    assert_eq!(daq_object_free(selected), 0);

    assert_eq!(unsafe { daq_object_execute(dev, c"frobnicate".as_ptr(), &mut selected) }, -3);
    assert!(selected.is_null());
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn configuration_round_trip_through_files() {
    let (root, dev) = instance_with_device();
    let dir = tempfile::tempdir().unwrap();
    let path = cstr(dir.path().join("instance.json").to_str().unwrap());

    assert_eq!(unsafe { daq_object_set(dev, c"GlobalSampleRate".as_ptr(), c"500".as_ptr()) }, 0);
    assert_eq!(unsafe { daq_device_save_configuration_to_file(root, path.as_ptr()) }, 0);
    assert_eq!(unsafe { daq_object_set(dev, c"GlobalSampleRate".as_ptr(), c"250".as_ptr()) }, 0);
    assert_eq!(unsafe { daq_device_load_configuration_from_file(root, path.as_ptr()) }, 0);
    assert_eq!(take(unsafe { daq_object_get(dev, c"GlobalSampleRate".as_ptr()) }), "500");

    let json = take(daq_device_save_configuration(root));
    assert_eq!(unsafe { daq_device_load_configuration(root, cstr(&json).as_ptr()) }, 0);
    assert_eq!(unsafe { daq_device_load_configuration(root, c"{ broken".as_ptr()) }, -12);
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn descriptor_json_files() {
    let (root, dev) = instance_with_device();
    let (ch, sig) = first_signal(dev);
    let dir = tempfile::tempdir().unwrap();
    let path = cstr(dir.path().join("descriptor.json").to_str().unwrap());

    let json = take(daq_descriptor_save_json(sig));
    assert!(json.contains("dataDescriptor"));
    assert_eq!(unsafe { daq_descriptor_save_json_file(sig, path.as_ptr()) }, 0);
    assert_eq!(unsafe { daq_signal_load_descriptor_json_file(sig, path.as_ptr()) }, 0);
    assert_eq!(take(daq_descriptor_save_json(sig)), json);
    assert_eq!(unsafe { daq_signal_load_descriptor_json(sig, c"[]".as_ptr()) }, -12);
    free_all(&[root, dev, ch, sig]);
}

#[test]
#[serial]
fn discovery_by_index() {
    let (root, dev) = instance_with_device();
    assert_eq!(take(daq_device_available_device_connection_string(root, 0)), "daqref://device0");
    assert!(daq_device_available_device_connection_string(root, 99).is_null());
    assert_eq!(take(daq_device_available_function_block_id(root, 1)), "RefFBModuleStatistics");
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn multi_reader_fills_caller_buffers() {
    let (root, dev) = instance_with_device();
    let fb = unsafe { daq_device_add_function_block(root, c"RefFBModuleScaling".as_ptr()) };
    let out = unsafe { daq_object_select(fb, c"signal".as_ptr(), 0) };

    assert!(unsafe { daq_multi_reader_bind(ptr::null(), 1) } < 0);
    let signals = [out];
    let id = unsafe { daq_multi_reader_bind(signals.as_ptr(), signals.len()) };
    assert!(id > 0);

    let packet = [1.0, 2.0, 3.0];
    assert_eq!(unsafe { daq_signal_send_data_packet(out, packet.as_ptr(), packet.len()) }, 0);
    let mut values = [0.0f64; 3];
    let data = [values.as_mut_ptr()];
    assert_eq!(unsafe { daq_multi_reader_read(id, 3, 100, data.as_ptr(), ptr::null()) }, 3);
    assert_eq!(values, [1.0, 2.0, 3.0]);

    assert_eq!(daq_multi_reader_unbind(id), 0);
    assert_eq!(daq_multi_reader_unbind(id), -7);
    free_all(&[root, dev, fb, out]);
}

#[test]
#[serial]
fn console_capture() {
    let (root, dev) = instance_with_device();
    assert_eq!(daq_stdout_pipe_to_string(), 0);
    assert_eq!(daq_stdout_erase_buffer(), 0);
    assert_eq!(unsafe { daq_object_print(dev, c"name".as_ptr()) }, 0);
    assert_eq!(unsafe { daq_object_select(root, c"devices".as_ptr(), 9) }, ptr::null_mut());
    let captured = take(daq_stdout_buffer());
    assert_eq!(daq_stdout_default(), 0);
    assert_eq!(daq_stdout_erase_buffer(), 0);

    assert!(captured.contains("name: Reference device 0"));
    assert!(captured.contains("Index out of bounds."));
    free_all(&[root, dev]);
}

#[test]
#[serial]
fn library_info_is_static() {
    let info = unsafe { CStr::from_ptr(daq_library_info()) }.to_str().unwrap();
    assert!(info.starts_with("daqbridge "));
    assert_eq!(daq_library_help(), 0);
}
