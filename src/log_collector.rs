//! Decoupled logging pipeline for patch runs.
//!
//! ```text
//! log::info!() etc.
//!     |
//! [LogCollector] (non-blocking, stderr echo)
//!     | (crossbeam unbounded channel)
//!     v
//! [DiskPersister thread] -> <log_dir>/<timestamp>_droidpatch.log
//! ```
//!
//! Every line sent before [`LogCollector::wait_for_empty`] is on disk when
//! it returns.

use chrono::Local;
use crossbeam_channel::{bounded, unbounded, Sender};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        LogLine {
            message,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    fn formatted(&self) -> String {
        format!("[{}] {}\n", self.timestamp, self.message)
    }
}

/// Log sink for the `log` facade
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    level: LevelFilter,
    echo: bool,
    log_path: Option<PathBuf>,
}

impl LogCollector {
    /// Create the collector and, when `log_dir` is given, its disk persister.
    pub fn new(log_dir: Option<&Path>, level: LevelFilter, echo: bool) -> Result<Self, String> {
        let log_path = match log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
                let name = format!("{}_droidpatch.log", Local::now().format("%Y%m%d_%H%M%S"));
                Some(dir.join(name))
            }
            None => None,
        };

        let file = match &log_path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?,
            ),
            None => None,
        };

        let (tx, rx) = unbounded::<LogMessage>();
        std::thread::spawn(move || {
            let mut file: Option<File> = file;
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        if let Some(file) = file.as_mut() {
                            let _ = file.write_all(line.formatted().as_bytes());
                        }
                    }
                    LogMessage::Flush(done) => {
                        if let Some(file) = file.as_mut() {
                            let _ = file.flush();
                            let _ = file.sync_data();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            level,
            echo,
            log_path,
        })
    }

    /// Install as the global `log` backend
    pub fn install(&self) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(self.level))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Send a line (non-blocking)
    pub fn log_str(&self, message: impl Into<String>) {
        let line = LogLine::new(message.into());
        if self.echo {
            eprint!("{}", line.formatted());
        }
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line sent so far has reached disk
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = bounded::<()>(1);
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_str(format!("[{}] {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lines_reach_disk_after_flush() {
        let dir = TempDir::new().unwrap();
        let collector = LogCollector::new(Some(dir.path()), LevelFilter::Info, false).unwrap();

        for i in 0..500 {
            collector.log_str(format!("[Patcher] [TEST] line {}", i));
        }
        collector.wait_for_empty().unwrap();

        let path = collector.log_path().unwrap().to_path_buf();
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("_droidpatch.log"));
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 500);
        assert!(content.lines().last().unwrap().ends_with("[Patcher] [TEST] line 499"));
    }

    #[test]
    fn test_level_filter() {
        let collector = LogCollector::new(None, LevelFilter::Warn, false).unwrap();
        let info = Metadata::builder().level(log::Level::Info).build();
        let error = Metadata::builder().level(log::Level::Error).build();
        assert!(!collector.enabled(&info));
        assert!(collector.enabled(&error));
    }

    #[test]
    fn test_without_directory() {
        let collector = LogCollector::new(None, LevelFilter::Info, false).unwrap();
        collector.log_str("no file");
        assert!(collector.log_path().is_none());
        assert!(collector.wait_for_empty().is_ok());
    }
}
