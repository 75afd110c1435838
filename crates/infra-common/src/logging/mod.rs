/*!
Logging

Subscriber setup for binaries and the application log line format. Library
code only uses the `tracing` macros; installing a subscriber is left to the
binary.
*/

pub mod formatter;
pub mod setup;

pub use formatter::{level_letter, AppLogFormatter};
pub use setup::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
