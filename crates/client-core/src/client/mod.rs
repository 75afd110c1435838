//! The room session client and its operations

pub mod builder;
pub mod config;
pub mod controls;
pub mod manager;
pub mod stats;
pub mod types;


pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use manager::Client;
pub use types::{ClientStats, RemoteConnection, RemoteTrack};
