//! Spork demo launcher.
//!
//! Loads `config.ini`, optionally decodes a music track, spawns the demo
//! [`Game`] entity and hands control to the frame loop on a raylib window.

// Do not create console on Windows
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use spork::backend::desktop::DesktopPlatform;
use spork::game::Game;
use spork::resources::audiotrack::TrackHandle;
use spork::resources::engineconfig::EngineConfig;
use spork::systems::audio::RodioDecoder;
use spork::systems::frameloop::FrameLoop;

/// Spork 2D
#[derive(Parser)]
#[command(version, about = "Bouncing balls on the spork engine")]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Music to loop in the background (WAV, OGG, MP3 or FLAC).
    #[arg(long, value_name = "PATH")]
    music: Option<PathBuf>,

    /// Start without opening an audio device.
    #[arg(long)]
    mute: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => EngineConfig::with_path(path),
        None => EngineConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        log::warn!("{e}; using defaults");
    }
    if cli.mute {
        config.audio_enabled = false;
    }

    let music = match cli.music {
        Some(path) => match TrackHandle::load(&path, &RodioDecoder) {
            Ok(track) => Some(track),
            Err(e) => {
                log::error!("{e}");
                None
            }
        },
        None => None,
    };

    let mut frame_loop = FrameLoop::new(config);
    frame_loop.spawn(Game::new(music));

    match frame_loop.run(&mut DesktopPlatform) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
