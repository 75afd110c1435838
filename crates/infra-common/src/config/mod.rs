/*!
Configuration System

Settings are layered: serde defaults, then an optional TOML file, then
environment variables. With the prefix `ROOMKIT` and separator `__`,
`ROOMKIT_CLIENT_ID` sets `client_id` and `ROOMKIT_LOGGING__LEVEL` sets
`logging.level`.
*/

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::Result;

/// Separates nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Builds a layered configuration and deserializes it
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            file: None,
            file_required: false,
            env_prefix: env_prefix.into(),
        }
    }

    /// Read this TOML file; it must exist
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Read this TOML file if it exists
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = false;
        self
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.file {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(self.file_required),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

/// Load `T` from an optional TOML file and `{env_prefix}_*` variables
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut loader = ConfigLoader::new(env_prefix);
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.load()
}
