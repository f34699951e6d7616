//! REPL – Read-Eval-Print Loop for the daqbridge shell.
//!
//! Any line not starting with `/` is a command for the current object and
//! goes through the dispatcher. Selecting or adding an object makes it the
//! current one.
//!
//! Supported slash-commands:
//!   /help            – shell commands plus help for the current object
//!   /back            – return to the previously selected object
//!   /root            – return to the instance root
//!   /read [n] [ms]   – read samples from the current signal
//!   /info            – library version
//!   /quit | /exit    – leave the shell

use std::time::Duration;

use colored::Colorize;
use daqbridge_core::acquisition::format_timestamp;
use daqbridge_core::bridge::library_info;
use daqbridge_core::{Bridge, Config, Console, Handle, Sink};
use daqbridge_types::{DaqError, DaqResult};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

const DEFAULT_READ_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One shell session: a bridge plus the path of selected objects.
pub struct Session {
    bridge: Bridge,
    root: Handle,
    /// Objects selected below the root, current one last.
    path: Vec<Handle>,
}

impl Session {
    pub fn new(config: Config) -> DaqResult<Self> {
        let mut bridge = Bridge::new(config);
        let root = bridge.instance_new()?;
        Ok(Self {
            bridge,
            root,
            path: Vec::new(),
        })
    }

    pub fn current(&self) -> Handle {
        self.path.last().copied().unwrap_or(self.root)
    }

    pub fn prompt(&self) -> String {
        let kind = self.bridge.kind(self.current()).map(|k| k.name()).unwrap_or("?");
        format!("{}:{}> ", self.bridge.config().prompt, kind)
    }

    /// Add the device at `connection_string` to the root and select it.
    pub fn connect(&mut self, connection_string: &str, sink: &mut dyn Sink) {
        match self.bridge.device_add_device(self.root, connection_string) {
            Ok(dev) => {
                self.path.push(dev);
                sink.line(&format!("Connected to {}", connection_string.bold()));
            }
            Err(e) => report(&e, sink),
        }
    }

    pub fn handle_line(&mut self, line: &str, sink: &mut dyn Sink) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        if let Some(command) = line.strip_prefix('/') {
            return self.slash_command(command, sink);
        }
        match self.bridge.execute(self.current(), line, sink) {
            Ok(execution) => {
                if let Some(selected) = execution.selected {
                    self.path.push(selected);
                    if let Ok(kind) = self.bridge.kind(selected) {
                        sink.line(&format!("{} {}", "→".green(), kind.name().bold()));
                    }
                }
            }
            Err(e) => report(&e, sink),
        }
        Flow::Continue
    }

    fn slash_command(&mut self, command: &str, sink: &mut dyn Sink) -> Flow {
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["help", ..] => self.help(sink),
            ["back", ..] => match self.path.pop() {
                Some(h) => self.release(h),
                None => sink.line("Already at the root."),
            },
            ["root", ..] => {
                while let Some(h) = self.path.pop() {
                    self.release(h);
                }
            }
            ["read", args @ ..] => {
                if let Err(e) = self.read(args, sink) {
                    report(&e, sink);
                }
            }
            ["info", ..] => sink.line(&library_info()),
            ["quit" | "exit", ..] => return Flow::Quit,
            _ => sink.line(&format!(
                "{} '/{}'. Type {} for available commands.",
                "Unknown command:".red(),
                command.yellow(),
                "/help".bold()
            )),
        }
        Flow::Continue
    }

    fn release(&mut self, handle: Handle) {
        if let Err(e) = self.bridge.free(handle) {
            warn!(error = %e, "failed to release handle");
        }
    }

    fn help(&self, sink: &mut dyn Sink) {
        sink.line(&format!("{}", "Shell Commands".bold().underline()));
        sink.line(&format!("  {}           – return to the previous object", "/back".bold().cyan()));
        sink.line(&format!("  {}           – return to the instance root", "/root".bold().cyan()));
        sink.line(&format!("  {}  – read samples from the current signal", "/read [n] [ms]".bold().cyan()));
        sink.line(&format!("  {}           – library version", "/info".bold().cyan()));
        sink.line(&format!("  {}    – exit the shell", "/quit  /exit".bold().cyan()));
        sink.line("");
        if let Err(e) = self.bridge.help(self.current(), sink) {
            report(&e, sink);
        }
    }

    fn read(&mut self, args: &[&str], sink: &mut dyn Sink) -> DaqResult<()> {
        let count = match args.first() {
            Some(text) => parse_number(text, "count")?,
            None => DEFAULT_READ_COUNT,
        };
        let timeout_ms = match args.get(1) {
            Some(text) => parse_number(text, "timeout")? as u64,
            None => self.bridge.config().read_timeout_ms,
        };
        let signal = self.current();
        let read = self.bridge.signal_read(signal, count, Duration::from_millis(timeout_ms))?;
        debug!(count, read, "shell read");
        sink.line(&format!("{read} sample(s)"));
        let readings = self.bridge.signal_readings(signal)?;
        let timestamps = self.bridge.signal_timestamps(signal)?;
        for (value, ts) in readings.iter().zip(timestamps) {
            sink.line(&format!("  {}  {value:>12.6}", format_timestamp(*ts).dimmed()));
        }
        Ok(())
    }
}

fn parse_number(text: &str, item: &str) -> DaqResult<usize> {
    text.parse().map_err(|_| DaqError::InvalidValue {
        item: item.to_string(),
        value: text.to_string(),
    })
}

fn report(err: &DaqError, sink: &mut dyn Sink) {
    debug!(code = err.code().as_i32(), error = %err, "command failed");
    sink.line(&format!("{} {}", "Error:".red().bold(), err.to_string().red()));
}

/// Entry point for the interactive REPL. Returns on `/quit` or end of
/// input.
pub fn run(config: Config) {
    let history = config.history_path();
    let auto_connect = config.auto_connect.clone();

    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}: {}", "Failed to create an instance".red(), e);
            return;
        }
    };
    if let Some(conn) = auto_connect {
        session.connect(&conn, &mut Console);
    }

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    if editor.load_history(&history).is_err() {
        debug!(path = %history.display(), "no history loaded");
    }

    loop {
        match editor.readline(&session.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if session.handle_line(&line, &mut Console) == Flow::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Type /quit to exit.".dimmed());
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
    }

    if let Some(dir) = history.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Err(e) = editor.save_history(&history) {
        warn!(error = %e, path = %history.display(), "failed to save history");
    }
    println!("{}", "Goodbye.".green());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        colored::control::set_override(false);
        Session::new(Config::default()).unwrap()
    }

    #[test]
    fn selections_move_the_current_object() {
        let mut s = session();
        let mut out = Vec::<String>::new();
        assert!(s.prompt().ends_with(":Device> "));

        s.handle_line("add device daqref://device0", &mut out);
        s.handle_line("select channel 0", &mut out);
        assert!(s.prompt().ends_with(":Channel> "));
        s.handle_line("select signal 0", &mut out);
        assert!(s.prompt().ends_with(":Signal> "));

        s.handle_line("/back", &mut out);
        assert!(s.prompt().ends_with(":Channel> "));
        s.handle_line("/root", &mut out);
        assert_eq!(s.current(), s.root);
        s.handle_line("/back", &mut out);
        assert_eq!(out.last().map(String::as_str), Some("Already at the root."));
    }

    #[test]
    fn errors_are_printed_and_keep_the_session() {
        let mut s = session();
        let mut out = Vec::<String>::new();
        assert_eq!(s.handle_line("frobnicate", &mut out), Flow::Continue);
        assert!(out.iter().any(|l| l.starts_with("Error:") && l.contains("frobnicate")));
        s.handle_line("select devices 3", &mut out);
        assert!(out.iter().any(|l| l.contains("Index out of bounds.")));
        assert_eq!(s.current(), s.root);
    }

    #[test]
    fn read_prints_one_line_per_sample() {
        let mut s = session();
        let mut out = Vec::<String>::new();
        s.connect("daqref://device0", &mut out);
        s.handle_line("select channel 0", &mut out);
        s.handle_line("select signal 0", &mut out);
        out.clear();
        s.handle_line("/read 5 2000", &mut out);
        assert_eq!(out[0], "5 sample(s)");
        assert_eq!(out.len(), 6);

        out.clear();
        s.handle_line("/read many", &mut out);
        assert!(out[0].starts_with("Error:"));

        out.clear();
        s.handle_line("/read 1099511627776 0", &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("Error:") && out[0].contains("'count'"));
    }

    #[test]
    fn slash_commands() {
        let mut s = session();
        let mut out = Vec::<String>::new();
        s.handle_line("/info", &mut out);
        assert!(out[0].starts_with("daqbridge "));
        s.handle_line("/help", &mut out);
        assert!(out.iter().any(|l| l.starts_with("Device:")));
        s.handle_line("/nope", &mut out);
        assert!(out.last().unwrap().contains("Unknown command:"));
        assert_eq!(s.handle_line("/quit", &mut out), Flow::Quit);
    }
}
