//! `tracing` output for the browser console.
//!
//! Formatted events go to `console.error` / `console.warn` / `console.log` / `console.debug` by
//! level so the devtools filters keep working.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsoleSink {
    Error,
    Warn,
    Log,
    Debug,
}

impl ConsoleSink {
    pub(crate) fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Log,
            _ => Self::Debug,
        }
    }

    fn emit(self, line: &str) {
        let line = JsValue::from_str(line);
        match self {
            Self::Error => web_sys::console::error_1(&line),
            Self::Warn => web_sys::console::warn_1(&line),
            Self::Log => web_sys::console::log_1(&line),
            Self::Debug => web_sys::console::debug_1(&line),
        }
    }
}

/// Buffers one formatted event and emits it as a single console call when dropped.
pub(crate) struct ConsoleWriter {
    sink: ConsoleSink,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        self.sink.emit(line.trim_end());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            sink: ConsoleSink::Log,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            sink: ConsoleSink::for_level(meta.level()),
            buf: Vec::new(),
        }
    }
}

/// Installs the console subscriber. Later calls (and calls after another subscriber was set) are
/// no-ops.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "sharpview: invalid log filter {filter:?} ({err}); using \"info\""
        )));
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ConsoleMakeWriter)
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
