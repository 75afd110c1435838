//! Application settings
//!
//! Loaded from an optional TOML file with `ROOMKIT_*` environment overrides,
//! e.g. `ROOMKIT_CLIENT_SECRET` or `ROOMKIT_LOGGING__LEVEL`.

use std::path::Path;

use serde::Deserialize;

use roomkit_client_core::{ClientConfig, SendingOption, SendingPriority, SendingVideoOption, VideoCodecType};
use roomkit_infra_common::{load_config, LoggingConfig};
use roomkit_token_core::{RoomSpec, TokenConfig};

pub const ENV_PREFIX: &str = "ROOMKIT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub client_id: String,
    pub room_id: String,
    /// Shared HS256 secret; also what the loopback room verifies against
    pub client_secret: String,
    pub video_bitrate_kbps: u32,
    pub room_spec: RoomSpec,
    pub token_ttl_seconds: i64,
    pub signaling_url: Option<String>,
    pub stats_interval_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            client_id: "roomkit-cli".to_string(),
            room_id: "sample-room".to_string(),
            client_secret: String::new(),
            video_bitrate_kbps: 1_000,
            room_spec: RoomSpec::default(),
            token_ttl_seconds: 30 * 60,
            signaling_url: None,
            stats_interval_ms: 1_000,
            logging: LoggingConfig::default(),
        }
    }
}

impl AppSettings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Ok(load_config(path, ENV_PREFIX)?)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.client_secret.clone(), self.room_id.clone())
            .with_room_spec(self.room_spec.clone())
            .with_ttl_seconds(self.token_ttl_seconds)
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new().with_stats_interval_ms(self.stats_interval_ms);
        if let Some(url) = &self.signaling_url {
            config = config.with_default_signaling_url(url.clone());
        }
        config
    }

    /// VP8 at high priority, capped at the configured bitrate
    pub fn sending_option(&self) -> SendingOption {
        SendingOption {
            video: Some(
                SendingVideoOption::new(VideoCodecType::Vp8, SendingPriority::High)
                    .with_max_bitrate_kbps(self.video_bitrate_kbps),
            ),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_settings_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
            client_id = "demo"
            room_id = "room-7"
            client_secret = "s3cret"
            video_bitrate_kbps = 2000

            [room_spec]
            classification_label = "default"
            max_connections = 10
            type = "p2p"

            [room_spec.media_control]
            bitrate_reservation_mbps = 5

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let settings = AppSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.client_id, "demo");
        assert_eq!(settings.room_spec.max_connections, 10);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.stats_interval_ms, 1_000);

        let token = settings.token_config();
        assert_eq!(token.room_id, "room-7");
        assert_eq!(token.room_spec.media_control.bitrate_reservation_mbps, 5);
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_sending_option_carries_bitrate() {
        let settings = AppSettings {
            video_bitrate_kbps: 750,
            ..Default::default()
        };
        let sending = settings.sending_option();
        assert!(sending.sends_video());
        assert_eq!(sending.video.unwrap().max_bitrate_kbps, Some(750));
    }
}
