/*!
Infrastructure shared by the RoomKit crates and binaries.

- [`logging`]: subscriber setup and the application log line format
- [`config`]: layered configuration (TOML file plus environment overrides)
- [`errors`]: the common error type
*/

pub mod config;
pub mod errors;
pub mod logging;

pub use config::{load_config, ConfigLoader};
pub use errors::{Error, Result};
pub use logging::{parse_log_level, setup_logging, AppLogFormatter, LoggingConfig};
