//! Playback supervisor
//!
//! Owns the single foreground process (video player or idle display) and
//! keeps the invariant that at most one is alive: every transition
//! terminates the current one before starting the next.

use crate::{
    display::DisplayBlanker,
    error::{PlaybackError, Result},
    process::{ForegroundProcess, ProcessLauncher, ProcessSpec},
    types::{ForegroundKind, PlaybackConfig, PlaybackMode},
};
use std::path::PathBuf;
use std::sync::Arc;

/// Player flags: fullscreen, looped, on top, no overlays, quick pointer hide
const PLAYER_ARGS: [&str; 10] = [
    "--fullscreen",
    "--no-video-title-show",
    "--loop",
    "--no-osd",
    "--video-on-top",
    "--key-quit",
    "Ctrl+c",
    "--mouse-hide-timeout=1",
    "--vout",
    "x11",
];

struct Foreground {
    kind: ForegroundKind,
    process: Box<dyn ForegroundProcess>,
}

pub struct PlaybackSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    config: PlaybackConfig,
    blanker: DisplayBlanker,
    foreground: Option<Foreground>,

    /// Session-wide pointer hider, started with the first video
    cursor: Option<Box<dyn ForegroundProcess>>,

    mode: PlaybackMode,
}

impl PlaybackSupervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: PlaybackConfig) -> Self {
        let blanker = DisplayBlanker::new(
            Arc::clone(&launcher),
            config.tools.clone(),
            config.display.clone(),
            config.idle_image_path(),
        );

        Self {
            launcher,
            config,
            blanker,
            foreground: None,
            cursor: None,
            mode: PlaybackMode::Idle,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn blanker(&self) -> &DisplayBlanker {
        &self.blanker
    }

    /// Kind and pid of the foreground process, if one is still running
    pub fn foreground(&self) -> Option<(ForegroundKind, Option<u32>)> {
        self.foreground
            .as_ref()
            .filter(|fg| fg.process.is_running())
            .map(|fg| (fg.kind, fg.process.pid()))
    }

    /// Resolve `filename` to a regular file inside the media directory
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "Empty video filename".to_string(),
            ));
        }

        let candidate = self.config.media_dir.join(filename);
        let not_found = || PlaybackError::NotFound(candidate.clone());

        let root = tokio::fs::canonicalize(&self.config.media_dir)
            .await
            .map_err(|_| not_found())?;
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| not_found())?;

        if !resolved.starts_with(&root) {
            return Err(PlaybackError::InvalidArgument(format!(
                "{} is outside the media directory",
                filename
            )));
        }

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(resolved)
    }

    /// Play a video from the media directory, replacing the foreground
    ///
    /// A missing file leaves the current state untouched. A player that
    /// fails to start leaves the idle frame on screen.
    pub async fn play(&mut self, filename: &str) -> Result<()> {
        let path = self.resolve(filename).await?;
        tracing::info!("Playing video: {:?}", path);

        self.ensure_cursor_hidden().await;
        self.terminate_foreground().await;

        let spec = ProcessSpec::new(&self.config.tools.player)
            .args(PLAYER_ARGS)
            .arg(&path)
            .envs(self.config.display.vars())
            .with_label("VLC");

        match self.launcher.spawn(&spec).await {
            Ok(process) => {
                self.foreground = Some(Foreground {
                    kind: ForegroundKind::Player,
                    process,
                });
                self.mode = PlaybackMode::Playing;
                Ok(())
            }
            Err(e) => {
                self.present_idle().await;
                Err(e)
            }
        }
    }

    /// Stop playback and show the idle frame
    ///
    /// With nothing playing this still (re)shows the idle frame, so the
    /// result is always exactly one idle-display process.
    pub async fn stop(&mut self) {
        if self.mode == PlaybackMode::Playing {
            tracing::info!("Stopping video");
        }
        self.show_idle().await;
    }

    /// Replace whatever is on screen with the idle frame
    pub async fn show_idle(&mut self) {
        self.terminate_foreground().await;
        self.present_idle().await;
    }

    /// Terminate every child this supervisor owns, without an idle frame
    pub async fn shutdown(&mut self) {
        self.terminate_foreground().await;
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.terminate(self.config.grace_period).await {
                tracing::warn!("Failed to stop {}: {}", cursor.label(), e);
            }
        }
    }

    async fn present_idle(&mut self) {
        self.foreground = self
            .blanker
            .present_idle()
            .await
            .map(|(kind, process)| Foreground { kind, process });
        self.mode = PlaybackMode::Idle;
    }

    async fn terminate_foreground(&mut self) {
        if let Some(mut fg) = self.foreground.take() {
            if let Err(e) = fg.process.terminate(self.config.grace_period).await {
                tracing::error!("Failed to stop {}: {}", fg.process.label(), e);
            }
        }
        self.mode = PlaybackMode::Idle;
    }

    async fn ensure_cursor_hidden(&mut self) {
        if self.cursor.as_ref().is_some_and(|cursor| cursor.is_running()) {
            return;
        }
        self.cursor = self.blanker.hide_cursor().await;
    }
}
