//! Idle display: black frame, blanking fallback, cursor and screensaver
use crate::{
    error::Result,
    process::{ForegroundProcess, ProcessLauncher, ProcessSpec},
    types::{DisplayEnv, ForegroundKind, ToolPaths},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 1x1 black PNG
pub const BLACK_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x37, 0x6e, 0xf9,
    0x24, 0x00, 0x00, 0x00, 0x10, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x62, 0x60, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0x03, 0x00, 0x00, 0x06, 0x00, 0x05, 0x57, 0xbf,
    0xab, 0xd4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// `xset` invocations that keep the display awake
const SCREENSAVER_OFF: [&[&str]; 3] = [&["-dpms"], &["s", "off"], &["s", "noblank"]];

/// Fallback when no image viewer can be started
const BLANK_ARGS: [&str; 4] = ["s", "blank", "s", "activate"];

/// Shows the idle state when no video is playing
pub struct DisplayBlanker {
    launcher: Arc<dyn ProcessLauncher>,
    tools: ToolPaths,
    env: DisplayEnv,
    image_path: PathBuf,
}

impl DisplayBlanker {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        tools: ToolPaths,
        env: DisplayEnv,
        image_path: PathBuf,
    ) -> Self {
        Self {
            launcher,
            tools,
            env,
            image_path,
        }
    }

    /// Write the black frame once; later calls reuse the cached file
    pub async fn ensure_idle_image(&self) -> Result<&Path> {
        if tokio::fs::try_exists(&self.image_path).await? {
            return Ok(&self.image_path);
        }

        tracing::info!("Creating black image at {:?}", self.image_path);
        if let Some(parent) = self.image_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.image_path, BLACK_PIXEL_PNG).await?;
        Ok(&self.image_path)
    }

    /// Start whatever best represents the idle state
    ///
    /// Tries the fullscreen image viewer first, then the blanking utility.
    /// Returns `None` when neither could be started; the caller must not
    /// have a foreground process alive when calling this.
    pub async fn present_idle(&self) -> Option<(ForegroundKind, Box<dyn ForegroundProcess>)> {
        match self.spawn_viewer().await {
            Ok(process) => {
                tracing::info!("Black screen displayed with PID: {:?}", process.pid());
                return Some((ForegroundKind::IdleViewer, process));
            }
            Err(e) => tracing::warn!("Error creating black screen with viewer: {}", e),
        }

        tracing::info!("Trying simpler blank screen approach");
        let spec = ProcessSpec::new(&self.tools.power)
            .args(BLANK_ARGS)
            .envs(self.env.vars())
            .with_label("blank screen");

        match self.launcher.spawn(&spec).await {
            Ok(process) => Some((ForegroundKind::Blanker, process)),
            Err(e) => {
                tracing::error!("All blank screen methods failed: {}", e);
                None
            }
        }
    }

    async fn spawn_viewer(&self) -> Result<Box<dyn ForegroundProcess>> {
        let image = self.ensure_idle_image().await?;
        let spec = ProcessSpec::new(&self.tools.viewer)
            .args(["--fullscreen", "--hide-pointer"])
            .arg(image)
            .envs(self.env.vars())
            .with_label("idle viewer");

        self.launcher.spawn(&spec).await
    }

    /// Hide the mouse pointer for the whole session
    pub async fn hide_cursor(&self) -> Option<Box<dyn ForegroundProcess>> {
        let spec = ProcessSpec::new(&self.tools.cursor)
            .args(["-display", self.env.display.as_str(), "-idle", "0.1", "-root"])
            .envs(self.env.vars())
            .with_label("cursor hider");

        match self.launcher.spawn(&spec).await {
            Ok(process) => Some(process),
            Err(e) => {
                tracing::warn!("Could not hide cursor: {}", e);
                None
            }
        }
    }

    /// Turn off display power management and screen blanking
    pub async fn disable_screensaver(&self) {
        let mut disabled = true;
        for args in SCREENSAVER_OFF {
            let spec = ProcessSpec::new(&self.tools.power)
                .args(args.iter().copied())
                .envs(self.env.vars());

            match self.launcher.run(&spec).await {
                Ok(output) if output.success => {}
                Ok(output) => {
                    disabled = false;
                    tracing::warn!(
                        "Could not disable screen blanking ({}): {}",
                        spec.argv().join(" "),
                        output.stderr.trim()
                    );
                }
                Err(e) => {
                    disabled = false;
                    tracing::warn!("Could not disable screen blanking: {}", e);
                }
            }
        }

        if disabled {
            tracing::info!("Disabled screen blanking/screensaver");
        }
    }
}
