//! Output sinks and the process-wide console capture.
//!
//! Human-readable output (`print`, `list`, `help`, diagnostics) is written
//! through a [`Sink`]. The [`Console`] sink goes to stdout, or into an
//! in-memory buffer while capture is enabled with [`pipe_to_string`].
//! Capture is process-wide and not reentrant.

use std::io::Write;
use std::sync::LazyLock;

use parking_lot::Mutex;

/// Destination for lines of human-readable output.
pub trait Sink {
    fn line(&mut self, text: &str);
}

impl Sink for String {
    fn line(&mut self, text: &str) {
        self.push_str(text);
        self.push('\n');
    }
}

impl Sink for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

#[derive(Default)]
struct ConsoleState {
    captured: bool,
    buffer: String,
}

static STATE: LazyLock<Mutex<ConsoleState>> = LazyLock::new(|| Mutex::new(ConsoleState::default()));

/// Sink writing to stdout or the capture buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Sink for Console {
    fn line(&mut self, text: &str) {
        let mut state = STATE.lock();
        if state.captured {
            state.buffer.push_str(text);
            state.buffer.push('\n');
        } else {
            drop(state);
            let _ = writeln!(std::io::stdout().lock(), "{text}");
        }
    }
}

/// Start capturing console output into the buffer.
pub fn pipe_to_string() {
    STATE.lock().captured = true;
}

/// Stop capturing; output goes to stdout again. The buffer is kept.
pub fn restore_default() {
    STATE.lock().captured = false;
}

#[cfg(test)]
fn is_captured() -> bool {
    STATE.lock().captured
}

/// Everything captured since the last erase.
pub fn buffer() -> String {
    STATE.lock().buffer.clone()
}

pub fn erase_buffer() {
    STATE.lock().buffer.clear();
}
