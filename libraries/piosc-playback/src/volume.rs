//! System volume control through the mixer utility
//!
//! The mixer is the source of truth. Relative changes always re-read the
//! current level first, so changes made by other tools become the new
//! baseline instead of being overwritten from a stale cache.

use crate::{
    error::{PlaybackError, Result},
    process::{ProcessLauncher, ProcessSpec},
    types::{CommandArg, VolumeConfig, DEFAULT_VOLUME},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Channels in order of preference
const PREFERRED_CHANNELS: [&str; 3] = ["Master", "PCM", "Speaker"];

/// Channel used when probing finds none of the preferred ones
pub const FALLBACK_CHANNEL: &str = "PCM";

/// Pick the preferred channel from `amixer scontrols` output
///
/// Lines look like `Simple mixer control 'Master',0`.
pub fn select_channel(scontrols: &str) -> Option<&'static str> {
    PREFERRED_CHANNELS.into_iter().find(|channel| {
        let quoted = format!("'{}'", channel);
        scontrols.lines().any(|line| line.contains(&quoted))
    })
}

/// First `[NN%]` value in `amixer get` output, clamped to 100
pub fn parse_volume(output: &str) -> Option<u8> {
    output
        .split('[')
        .skip(1)
        .find_map(|segment| {
            let (digits, _) = segment.split_once('%')?;
            digits.trim().parse::<u32>().ok()
        })
        .map(|level| level.min(100) as u8)
}

/// Apply one step up or down, staying within 0-100
pub fn step_volume(current: u8, step: u8, up: bool) -> u8 {
    if up {
        current.saturating_add(step).min(100)
    } else {
        current.saturating_sub(step)
    }
}

/// Probe the mixer for the channel to control
pub async fn resolve_channel(launcher: &dyn ProcessLauncher, mixer: &Path) -> String {
    let spec = ProcessSpec::new(mixer).arg("scontrols");
    match launcher.run(&spec).await {
        Ok(output) => {
            let controls: Vec<&str> = output.stdout.lines().map(str::trim).collect();
            tracing::info!("Available mixer controls: {:?}", controls);

            if let Some(channel) = select_channel(&output.stdout) {
                tracing::info!("Using volume control: {}", channel);
                return channel.to_string();
            }
        }
        Err(e) => tracing::error!("Error getting mixer controls: {}", e),
    }

    tracing::warn!(
        "Could not identify volume control, defaulting to {}",
        FALLBACK_CHANNEL
    );
    FALLBACK_CHANNEL.to_string()
}

/// Reads and writes the system volume
pub struct VolumeController {
    launcher: Arc<dyn ProcessLauncher>,
    mixer: PathBuf,
    config: VolumeConfig,

    /// Last level read from or written to the mixer
    current: u8,
}

impl VolumeController {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, mixer: PathBuf, config: VolumeConfig) -> Self {
        Self {
            launcher,
            mixer,
            config,
            current: DEFAULT_VOLUME,
        }
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Last known volume without querying the mixer
    pub fn current(&self) -> u8 {
        self.current
    }

    /// Query the mixer; falls back to 80 when the level cannot be read
    pub async fn get_volume(&mut self) -> u8 {
        let spec = ProcessSpec::new(&self.mixer).args(["get", self.config.channel()]);

        let level = match self.launcher.run(&spec).await {
            Ok(output) => parse_volume(&output.stdout).unwrap_or_else(|| {
                tracing::warn!("Could not parse volume from output: {}", output.stdout);
                DEFAULT_VOLUME
            }),
            Err(e) => {
                tracing::error!("Error getting system volume: {}", e);
                DEFAULT_VOLUME
            }
        };

        self.current = level;
        level
    }

    /// Set the volume, clamping `target` to 0-100
    pub async fn set_volume(&mut self, target: i64) -> bool {
        let level = target.clamp(0, 100) as u8;
        let spec = ProcessSpec::new(&self.mixer).args([
            "set".to_string(),
            self.config.channel().to_string(),
            format!("{}%", level),
        ]);
        tracing::info!("Running volume command: {:?} {}", self.mixer, spec.argv().join(" "));

        match self.launcher.run(&spec).await {
            Ok(output) if output.success => {
                tracing::info!("Volume set to {}%", level);
                self.current = level;
                true
            }
            Ok(output) => {
                tracing::error!("Error setting volume: {}", output.stderr.trim());
                false
            }
            Err(e) => {
                tracing::error!("Exception while setting volume: {}", e);
                false
            }
        }
    }

    pub async fn volume_up(&mut self) -> bool {
        self.adjust(true).await
    }

    pub async fn volume_down(&mut self) -> bool {
        self.adjust(false).await
    }

    async fn adjust(&mut self, up: bool) -> bool {
        let current = self.get_volume().await;
        let target = step_volume(current, self.config.step(), up);
        tracing::info!(
            "{} volume from {}% to {}%",
            if up { "Increasing" } else { "Decreasing" },
            current,
            target
        );
        self.set_volume(target as i64).await
    }

    /// Set an absolute level from a raw command argument
    ///
    /// Rejects anything that is not an integer in 0-100 without touching the
    /// mixer.
    pub async fn volume_set(&mut self, raw: &CommandArg) -> Result<bool> {
        let level = raw
            .as_integer()
            .ok_or_else(|| PlaybackError::InvalidArgument(format!("Invalid volume value: {}", raw)))?;

        if !(0..=100).contains(&level) {
            return Err(PlaybackError::InvalidArgument(format!(
                "Invalid volume level: {}. Must be between 0-100",
                level
            )));
        }

        tracing::info!("Setting volume to {}%", level);
        Ok(self.set_volume(level).await)
    }
}
