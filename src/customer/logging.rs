//! Customer logging service
//!
//! The controller reports failures through `LoggingService`; it never looks at
//! the result. `ErrorLogService` forwards messages to the error log.

use chrono::Local;

use crate::logger;

pub trait LoggingService: Send + Sync {
    fn log_message(&self, message: &str);
}

/// Writes `[timestamp] [customers] message` to the error log target
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorLogService;

impl ErrorLogService {
    pub const fn new() -> Self {
        Self
    }
}

impl LoggingService for ErrorLogService {
    fn log_message(&self, message: &str) {
        logger::log_service_message(&format!(
            "[{}] [customers] {message}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        ));
    }
}
