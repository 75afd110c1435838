//! `roomkit` - mint room access tokens and drive a demo room session

mod demo;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use roomkit_client_core::{CameraPosition, MuteType, VideoRequirement};
use roomkit_infra_common::logging::{log_welcome, setup_logging};
use roomkit_token_core::AccessTokenIssuer;

use crate::demo::{run_session, SessionPlan};
use crate::settings::AppSettings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file; ROOMKIT_* environment variables override it
    #[arg(short, long, env = "ROOMKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, verbose)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint an access token and print it with its claims
    Token {
        /// Room to mint the token for (defaults to the configured room)
        #[arg(long)]
        room_id: Option<String>,
    },
    /// Verify an access token against the configured secret
    Verify {
        token: String,
    },
    /// Join a loopback room and exercise the media controls
    Session {
        #[arg(long, value_enum)]
        mute_audio: Option<MuteArg>,

        #[arg(long, value_enum)]
        mute_video: Option<MuteArg>,

        /// Video wanted from each remote participant
        #[arg(long, value_enum, default_value = "required")]
        video_requirement: RequirementArg,

        /// Video send bitrate in kbps
        #[arg(long)]
        bitrate: Option<u32>,

        /// Video send framerate
        #[arg(long)]
        framerate: Option<u32>,

        /// Switch to this camera after joining
        #[arg(long, value_enum)]
        camera: Option<CameraArg>,

        /// Simulated remote participants
        #[arg(long, default_value = "1")]
        remote_peers: usize,

        /// Seconds to stay in the room
        #[arg(long, default_value = "3")]
        duration: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MuteArg {
    Soft,
    Hard,
}

impl From<MuteArg> for MuteType {
    fn from(arg: MuteArg) -> Self {
        match arg {
            MuteArg::Soft => MuteType::SoftMute,
            MuteArg::Hard => MuteType::HardMute,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RequirementArg {
    Required,
    Unrequired,
}

impl From<RequirementArg> for VideoRequirement {
    fn from(arg: RequirementArg) -> Self {
        match arg {
            RequirementArg::Required => VideoRequirement::Required,
            RequirementArg::Unrequired => VideoRequirement::Unrequired,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CameraArg {
    Front,
    Back,
}

impl From<CameraArg> for CameraPosition {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Front => CameraPosition::Front,
            CameraArg::Back => CameraPosition::Back,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = AppSettings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if cli.json {
        settings.logging.json = true;
    }
    let _log_guard = setup_logging(&settings.logging)?;
    log_welcome("roomkit", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Token { room_id } => {
            let mut config = settings.token_config();
            if let Some(room_id) = room_id {
                config.room_id = room_id;
            }
            let token = AccessTokenIssuer::new(config)?.issue()?;
            println!("{}", token.as_str());
            println!("{}", serde_json::to_string_pretty(token.claims())?);
        }
        Command::Verify { token } => {
            let claims = AccessTokenIssuer::new(settings.token_config())?.verify(&token)?;
            info!("Token valid for room {} until {}", claims.room_id, claims.exp);
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Session {
            mute_audio,
            mute_video,
            video_requirement,
            bitrate,
            framerate,
            camera,
            remote_peers,
            duration,
        } => {
            let plan = SessionPlan {
                mute_audio: mute_audio.map(MuteType::from),
                mute_video: mute_video.map(MuteType::from),
                video_requirement: video_requirement.into(),
                bitrate_kbps: bitrate,
                framerate,
                camera: camera.map(CameraPosition::from),
                remote_peers,
                duration: Duration::from_secs(duration),
            };
            let summary = run_session(&settings, plan).await?;
            info!(
                "Session {} after {} messages ({} failed operations)",
                summary.final_state,
                summary.sent_messages.len(),
                summary.failed_operations
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_flags() {
        let cli = Cli::try_parse_from([
            "roomkit",
            "session",
            "--mute-audio",
            "hard",
            "--mute-video",
            "soft",
            "--video-requirement",
            "unrequired",
            "--bitrate",
            "500",
            "--camera",
            "back",
            "--remote-peers",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::Session {
                mute_audio,
                mute_video,
                video_requirement,
                bitrate,
                camera,
                remote_peers,
                duration,
                ..
            } => {
                assert_eq!(mute_audio.map(MuteType::from), Some(MuteType::HardMute));
                assert_eq!(mute_video.map(MuteType::from), Some(MuteType::SoftMute));
                assert_eq!(VideoRequirement::from(video_requirement), VideoRequirement::Unrequired);
                assert_eq!(bitrate, Some(500));
                assert_eq!(camera.map(CameraPosition::from), Some(CameraPosition::Back));
                assert_eq!(remote_peers, 3);
                assert_eq!(duration, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_video_requirement_defaults_to_required() {
        let cli = Cli::try_parse_from(["roomkit", "session"]).unwrap();
        match cli.command {
            Command::Session { video_requirement, mute_video, .. } => {
                assert_eq!(VideoRequirement::from(video_requirement), VideoRequirement::Required);
                assert!(mute_video.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_requires_token() {
        assert!(Cli::try_parse_from(["roomkit", "verify"]).is_err());
    }
}
