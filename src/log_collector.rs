//! Disk-persisting logging pipeline for provisioning runs.
//!
//! Wires the `log` crate facade to a collector that writes every leveled line
//! to stderr immediately and appends it to a per-run log file through a
//! background thread. The disk path uses an unbounded crossbeam channel so a
//! slow filesystem never blocks a provisioning step.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Internal log line or flush marker.
enum LogMessage {
    Line(LogLine),
    /// Flush marker with a channel sender to signal completion.
    Flush(std::sync::mpsc::Sender<()>),
}

/// A formatted log line with metadata.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }
}

/// Get the default logs path relative to the current working directory: ./logs
pub fn get_default_logs_path() -> Result<PathBuf, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join("logs"))
}

/// Collector handle cloned into the global logger and the main thread.
pub struct LogCollector {
    tx: Sender<LogMessage>,
    /// Path of the per-run log file, reported to the operator at startup.
    log_path: PathBuf,
}

impl LogCollector {
    /// Create a new collector writing to `<log_dir>/run-<timestamp>.log`.
    ///
    /// Spawns the background persister thread. The thread uses blocking
    /// `recv()` so every accepted line reaches disk regardless of what the
    /// main thread is doing.
    pub fn new(log_dir: PathBuf) -> Result<Self, String> {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let log_path = log_dir.join(format!("run-{}.log", timestamp));
        File::create(&log_path).map_err(|e| format!("Failed to create log file: {}", e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        let persist_path = log_path.clone();
        std::thread::spawn(move || {
            let mut handle: Option<File> = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&persist_path)
                .ok();

            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        if handle.is_none() {
                            handle = OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(&persist_path)
                                .ok();
                        }
                        if let Some(file) = handle.as_mut() {
                            let formatted = format!(
                                "[{}] [{}] {}\n",
                                line.timestamp, line.level, line.message
                            );
                            let _ = file.write_all(formatted.as_bytes());
                            let _ = file.flush();
                        }
                    }
                    LogMessage::Flush(done) => {
                        if let Some(file) = handle.as_mut() {
                            let _ = file.flush();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector { tx, log_path })
    }

    /// Path of the per-run log file.
    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Send a log line (non-blocking, cannot fail).
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until all lines accepted so far are durably on disk.
    ///
    /// Call before process exit so the final status line reaches the log file.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))?;
        Ok(())
    }

    /// Register this collector as the global logger for the `log` facade.
    pub fn install(&self, max_level: LevelFilter) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(max_level))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }
}

impl Clone for LogCollector {
    fn clone(&self) -> Self {
        LogCollector {
            tx: self.tx.clone(),
            log_path: self.log_path.clone(),
        }
    }
}

/// Implementation of the `log` crate's Log trait.
/// Every log::info!/warn!/error! call is echoed to stderr and queued for disk.
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = LogLine::new(record.level(), format!("{}", record.args()));
        eprintln!("[{}] [{}] {}", line.timestamp, line.level, line.message);
        self.log_line(line);
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
