//! File-only logging.
//!
//! The studio owns the terminal, so nothing is logged until [`log_to_file`]
//! opens a sink. `log` records (through the `log_*!` macros) and `tracing`
//! events from background work share that sink.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "revu=debug,rig=info,warn";

/// The open log file, if logging was requested
static SINK: Mutex<Option<File>> = Mutex::new(None);

fn write_to_sink(bytes: &[u8]) {
    if let Some(file) = SINK.lock().as_mut() {
        let _ = file.write_all(bytes);
        let _ = file.flush();
    }
}

/// `MakeWriter` for the tracing fmt layer
#[derive(Clone, Copy)]
struct SinkWriter;

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_to_sink(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::MakeWriter<'_> for SinkWriter {
    type Writer = Self;

    fn make_writer(&self) -> Self::Writer {
        *self
    }
}

/// Bridges `log` records into the sink
struct LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let limit = if metadata.target().starts_with("revu") {
            Level::Debug
        } else {
            Level::Info
        };
        metadata.level() <= limit && SINK.lock().is_some()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        write_to_sink(line.as_bytes());
    }

    fn flush(&self) {}
}

static BRIDGE: LogBridge = LogBridge;

/// Install the `log` bridge and the tracing subscriber. Idempotent.
pub fn init() -> Result<(), String> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let layer = fmt::Layer::new()
            .with_ansi(false)
            .with_timer(fmt::time::ChronoLocal::rfc_3339())
            .with_writer(SinkWriter);
        let tracing_result = Registry::default().with(filter).with(layer).try_init();
        let log_result =
            log::set_logger(&BRIDGE).map(|()| log::set_max_level(LevelFilter::Debug));

        match (tracing_result, log_result) {
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(tracing_err), Err(log_err)) => Err(format!(
                "tracing: {tracing_err}, log: {log_err}"
            )),
        }
    })
    .clone()
}

/// Start appending log output to `path`
pub fn log_to_file(path: impl AsRef<Path>) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    *SINK.lock() = Some(file);
    Ok(())
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_to_file_receives_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("revu.log");
        init().expect("init");
        log_to_file(&path).expect("open log");

        crate::log_debug!("prune started for {}", "src/lib.rs");
        log::trace!(target: "hyper", "dropped");

        let content = std::fs::read_to_string(&path).expect("read log");
        assert!(content.contains("prune started for src/lib.rs"));
        assert!(!content.contains("dropped"));
    }
}
