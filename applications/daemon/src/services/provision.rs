/// Provisioning service - installs the display utilities the kiosk relies on
use piosc_playback::{ProcessLauncher, ProcessSpec, ToolPaths};
use std::sync::Arc;

/// Program used to check whether a tool is on `PATH`
const LOOKUP: &str = "which";

pub struct Provisioner {
    launcher: Arc<dyn ProcessLauncher>,
    tools: ToolPaths,
    packages: Vec<String>,
}

impl Provisioner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, tools: ToolPaths, packages: Vec<String>) -> Self {
        Self {
            launcher,
            tools,
            packages,
        }
    }

    /// Whether the image viewer can be found
    pub async fn viewer_available(&self) -> bool {
        let spec = ProcessSpec::new(LOOKUP).arg(self.tools.viewer.clone());
        match self.launcher.run(&spec).await {
            Ok(output) => output.success,
            Err(e) => {
                tracing::warn!("Could not look up {:?}: {}", self.tools.viewer, e);
                false
            }
        }
    }

    /// Install the configured packages if the viewer is missing
    ///
    /// Returns whether the viewer is available afterwards. Never fails; every
    /// problem is logged.
    pub async fn ensure_viewer(&self) -> bool {
        if self.viewer_available().await {
            tracing::debug!("{:?} is available", self.tools.viewer);
            return true;
        }

        tracing::warn!(
            "{:?} not found. Installing required packages...",
            self.tools.viewer
        );

        if !self.install().await {
            return false;
        }

        tracing::info!("Required packages installed");
        self.viewer_available().await
    }

    async fn install(&self) -> bool {
        let update = self.privileged(["update", "-qq"].map(String::from));
        let install = self.privileged(
            ["install".to_string(), "-y".to_string()]
                .into_iter()
                .chain(self.packages.iter().cloned()),
        );

        for spec in [update, install] {
            let command = spec.argv().join(" ");
            match self.launcher.run(&spec).await {
                Ok(output) if output.success => {}
                Ok(output) => {
                    tracing::error!(
                        "Failed to install required packages: `{}` exited with {:?}: {}",
                        command,
                        output.code,
                        output.stderr.trim()
                    );
                    return false;
                }
                Err(e) => {
                    tracing::error!("Failed to install required packages: {}", e);
                    return false;
                }
            }
        }

        true
    }

    /// `sudo apt-get <args>`
    fn privileged<I>(&self, args: I) -> ProcessSpec
    where
        I: IntoIterator<Item = String>,
    {
        ProcessSpec::new(&self.tools.sudo)
            .arg(self.tools.package_manager.clone())
            .args(args)
    }
}
