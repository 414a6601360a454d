//! User-facing output.
//!
//! Command results go to stdout, diagnostics to stderr. Verbose lines are
//! dropped unless `--verbose` is set. Status lines (`DONE`, `Error: ...`) are
//! colored when the target is a terminal.
//!
//! Library-level tracing (request URLs, raw bodies) is separate and goes
//! through `tracing`; this module only carries what the user asked to see.

use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex};

/// Output sink for a command run.
pub struct Console {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    verbose: bool,
    color: bool,
}

impl Console {
    /// Console over the process's stdout and stderr.
    pub fn stdio(verbose: bool) -> Self {
        Console {
            out: Box::new(std::io::stdout()),
            err: Box::new(std::io::stderr()),
            verbose,
            color: std::io::stderr().is_terminal(),
        }
    }

    /// Console over arbitrary writers, uncolored.
    pub fn new(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>, verbose: bool) -> Self {
        Console {
            out,
            err,
            verbose,
            color: false,
        }
    }

    /// Console writing into in-memory buffers; returns the buffers for
    /// stdout and stderr.
    pub fn captured(verbose: bool) -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let console = Console::new(Box::new(out.clone()), Box::new(err.clone()), verbose);
        (console, out, err)
    }

    /// Writes a result line to stdout.
    pub fn log(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }

    /// Writes a JSON value to stdout, pretty-printed.
    pub fn log_json(&mut self, value: &serde_json::Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.log(&text),
            Err(e) => self.error(&format!("failed to serialize output: {e}")),
        }
    }

    /// Writes a diagnostic line to stderr when verbose.
    pub fn verbose(&mut self, line: &str) {
        if self.verbose {
            let _ = writeln!(self.err, "{line}");
        }
    }

    /// Writes a green `DONE` to stdout.
    pub fn done(&mut self) {
        let text = self.paint_green("DONE");
        self.log(&text);
    }

    /// Writes a green `DONE` to stderr when verbose.
    pub fn verbose_done(&mut self) {
        let text = self.paint_green("DONE");
        self.verbose(&text);
    }

    /// Writes a red `Error: <message>` line to stderr.
    pub fn error(&mut self, message: &str) {
        let line = format!("Error: {message}");
        let line = if self.color {
            line.red().to_string()
        } else {
            line
        };
        let _ = writeln!(self.err, "{line}");
    }

    /// Writes a prompt to stdout without a trailing newline and flushes.
    pub fn prompt(&mut self, text: &str) -> std::io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    fn paint_green(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Cloneable in-memory writer used to capture console output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
