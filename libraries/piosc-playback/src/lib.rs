//! piosc - Playback Control Core
//!
//! Turns remote commands into playback, volume and blanking actions on a
//! single-display media kiosk. All real work is done by external utilities:
//! a mixer (`amixer`), a video player (`cvlc`), an image viewer (`feh`) and
//! the X power tool (`xset`).
//!
//! This crate provides:
//! - A process seam ([`ProcessLauncher`]) with grace-then-kill termination
//!   and background output draining
//! - Volume control through the mixer, re-read before every relative change
//! - An idle black frame with a blanking fallback
//! - A supervisor that keeps exactly one foreground process alive
//! - A command router and a single-owner service task
//!
//! # Example
//!
//! ```rust,no_run
//! use piosc_playback::{
//!     resolve_channel, Command, CommandArg, CommandRouter, PlaybackConfig, PlaybackService,
//!     PlaybackSupervisor, ProcessLauncher, SystemLauncher, VolumeConfig, VolumeController,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> piosc_playback::Result<()> {
//! let launcher: Arc<dyn ProcessLauncher> = Arc::new(SystemLauncher::new());
//! let config = PlaybackConfig::new("/home/pi/Videos");
//!
//! let channel = resolve_channel(launcher.as_ref(), &config.tools.mixer).await;
//! let volume = VolumeController::new(
//!     Arc::clone(&launcher),
//!     config.tools.mixer.clone(),
//!     VolumeConfig::new(5, channel),
//! );
//! let supervisor = PlaybackSupervisor::new(Arc::clone(&launcher), config);
//!
//! let (handle, _task) = PlaybackService::spawn(CommandRouter::new(supervisor, volume));
//! handle
//!     .submit(Command::new("/play", vec![CommandArg::Str("show.mp4".into())]))
//!     .await?;
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod display;
mod error;
pub mod process;
mod router;
mod service;
mod supervisor;
pub mod types;
mod volume;

// Public exports
pub use display::{DisplayBlanker, BLACK_PIXEL_PNG};
pub use error::{PlaybackError, Result};
pub use process::{ForegroundProcess, ProcessLauncher, ProcessOutput, ProcessSpec, SystemLauncher};
pub use router::{route, Action, CommandRouter};
pub use service::{ControlHandle, ControlRequest, PlaybackService};
pub use supervisor::PlaybackSupervisor;
pub use types::{
    Command, CommandArg, DisplayEnv, ForegroundKind, PlaybackConfig, PlaybackMode, PlaybackStatus,
    ToolPaths, VolumeConfig,
};
pub use volume::{
    parse_volume, resolve_channel, select_channel, step_volume, VolumeController,
    FALLBACK_CHANNEL,
};
