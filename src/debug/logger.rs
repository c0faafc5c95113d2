// Logger - Engine log facility
//
// Provides:
// - Configurable log levels
// - In-memory message ring
// - Optional log output to file

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warning,
    /// Info, warnings, and errors
    Info,
    /// Debug information
    Debug,
    /// Verbose trace logging
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::None => "NONE",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        };
        write!(f, "{}", name)
    }
}

/// Logger
///
/// Collects engine messages into a bounded in-memory buffer and,
/// optionally, an output file.
pub struct Logger {
    /// Current log level
    log_level: LogLevel,

    /// In-memory message buffer
    buffer: Vec<String>,

    /// Maximum number of buffered messages (0 = unlimited)
    max_buffer_size: usize,

    /// Output file
    output_file: Option<File>,
}

impl Logger {
    /// Create a new logger at the given level
    pub fn new(level: LogLevel) -> Self {
        Logger {
            log_level: level,
            buffer: Vec::new(),
            max_buffer_size: 10000,
            output_file: None,
        }
    }

    /// Set the log level
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Get the current log level
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Set maximum buffer size
    ///
    /// When the buffer exceeds this size, old entries are removed.
    /// Set to 0 for unlimited size.
    pub fn set_max_buffer_size(&mut self, size: usize) {
        self.max_buffer_size = size;
        if size > 0 && self.buffer.len() > size {
            self.buffer.drain(0..self.buffer.len() - size);
        }
    }

    /// Open a log file for output
    pub fn open_log_file<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.output_file = Some(file);
        Ok(())
    }

    /// Close the log file
    pub fn close_log_file(&mut self) {
        self.output_file = None;
    }

    /// Log a message at an explicit level
    pub fn log(&mut self, level: LogLevel, message: &str) {
        if level == LogLevel::None || level > self.log_level {
            return;
        }

        let entry = format!("[{}] {}", level, message);
        if let Some(file) = &mut self.output_file {
            // A failed sink write must never take the engine down
            let _ = writeln!(file, "{}", entry);
        }

        self.buffer.push(entry);
        if self.max_buffer_size > 0 && self.buffer.len() > self.max_buffer_size {
            let excess = self.buffer.len() - self.max_buffer_size;
            self.buffer.drain(0..excess);
        }
    }

    /// Log an error message
    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log a warning message
    pub fn warning(&mut self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    /// Log an info message
    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message
    pub fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Buffered messages, oldest first
    pub fn entries(&self) -> &[String] {
        &self.buffer
    }

    /// Clear the in-memory buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_below_level_are_dropped() {
        let mut logger = Logger::new(LogLevel::Warning);
        logger.info("filtered");
        logger.error("kept");
        assert_eq!(logger.entries().len(), 1);
        assert!(logger.entries()[0].contains("kept"));
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut logger = Logger::new(LogLevel::Info);
        logger.set_max_buffer_size(4);
        for i in 0..10 {
            logger.info(&format!("message {}", i));
        }
        assert_eq!(logger.entries().len(), 4);
        assert!(logger.entries()[0].contains("message 6"));
    }
}
