use std::fmt;
use std::sync::OnceLock;
use chrono::Local;

static LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        };
        write!(f, "{}", label)
    }
}

pub struct Logger {
    prefix: Option<String>,
    min_level: LogLevel,
}

impl Logger {
    fn new(prefix: Option<String>, min_level: LogLevel) -> Self {
        Self { prefix, min_level }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, file: &str, line: u32, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let file_name = file.rsplit(['/', '\\']).next().unwrap_or(file);
        match self.prefix {
            Some(ref prefix) => println!(
                "[{}][{}][{}][{}:{}] {}",
                timestamp, level, prefix, file_name, line, message
            ),
            None => println!("[{}][{}][{}:{}] {}", timestamp, level, file_name, line, message),
        }
    }
}

/// Installs the process-wide logger. Later calls keep the first configuration.
pub fn init_logger(prefix: Option<String>, min_level: LogLevel) {
    LOGGER.get_or_init(|| Logger::new(prefix, min_level));
}

/// Messages logged before [`init_logger`] are dropped; the engine is used
/// headless in tests and benches.
pub fn log(level: LogLevel, file: &str, line: u32, message: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, file, line, message);
    }
}

pub fn is_enabled(level: LogLevel) -> bool {
    LOGGER.get().is_some_and(|logger| logger.enabled(level))
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::LogLevel::Info, file!(), line!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_enabled($crate::logger::LogLevel::Debug) {
            $crate::logger::log($crate::logger::LogLevel::Debug, file!(), line!(), &format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::LogLevel::Warn, file!(), line!(), &format!($($arg)*))
    };
}
