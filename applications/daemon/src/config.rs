/// Daemon configuration
use crate::error::{DaemonError, Result};
use piosc_playback::{
    types::{default_cache_dir, default_media_dir, home_dir, DEFAULT_VOLUME_STEP},
    DisplayEnv, PlaybackConfig, ToolPaths,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "piosc.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_media")]
    pub media: MediaSettings,

    #[serde(default = "default_volume")]
    pub volume: VolumeSettings,

    #[serde(default = "default_logging")]
    pub logging: LoggingSettings,

    #[serde(default = "default_display")]
    pub display: DisplaySettings,

    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default = "default_provision")]
    pub provision: ProvisionSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaSettings {
    #[serde(default = "default_media_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_cache_dir")]
    pub cache_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeSettings {
    /// Percentage points per up/down command (clamped to 1-20)
    #[serde(default = "default_step")]
    pub step: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplaySettings {
    #[serde(default = "default_display_name")]
    pub display: String,

    /// Detected from `~/.Xauthority` when unset
    #[serde(default)]
    pub xauthority: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionSettings {
    /// Install missing display utilities when `serve` starts
    #[serde(default = "default_auto_install")]
    pub auto_install: bool,

    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
}

/// Command-line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub video_dir: Option<PathBuf>,
    pub volume_step: Option<i64>,
    pub log_file: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise `piosc.toml` is read from the
    /// working directory if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(DaemonError::Config(format!(
                        "Config file not found: {:?}",
                        path
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (PIOSC_SERVER__PORT=9000)
        settings = settings.add_source(
            config::Environment::with_prefix("PIOSC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Apply command-line values on top of the loaded configuration
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(dir) = &overrides.video_dir {
            self.media.directory = dir.clone();
        }
        if let Some(step) = overrides.volume_step {
            self.volume.step = step;
        }
        if let Some(file) = &overrides.log_file {
            self.logging.file = file.clone();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.media.directory.is_dir() {
            return Err(DaemonError::Config(format!(
                "Video directory does not exist: {}",
                self.media.directory.display()
            )));
        }

        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .server
            .host
            .parse::<IpAddr>()
            .map_err(|e| DaemonError::Config(format!("Invalid host {:?}: {}", self.server.host, e)))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Effective volume step after clamping
    pub fn volume_step(&self) -> i64 {
        self.volume.step.clamp(1, 20)
    }

    pub fn display_env(&self) -> DisplayEnv {
        let xauthority = self.display.xauthority.clone().or_else(|| {
            let detected = home_dir().join(".Xauthority");
            detected.exists().then_some(detected)
        });
        DisplayEnv::new(self.display.display.clone(), xauthority)
    }

    pub fn to_playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            media_dir: self.media.directory.clone(),
            cache_dir: self.media.cache_directory.clone(),
            tools: self.tools.clone(),
            display: self.display_env(),
            ..PlaybackConfig::default()
        }
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_media() -> MediaSettings {
    MediaSettings {
        directory: default_media_dir(),
        cache_directory: default_cache_dir(),
    }
}

fn default_volume() -> VolumeSettings {
    VolumeSettings {
        step: default_step(),
    }
}

fn default_step() -> i64 {
    i64::from(DEFAULT_VOLUME_STEP)
}

fn default_logging() -> LoggingSettings {
    LoggingSettings {
        file: default_log_file(),
    }
}

fn default_log_file() -> PathBuf {
    home_dir().join("logs").join("piosc.log")
}

fn default_display() -> DisplaySettings {
    DisplaySettings {
        display: default_display_name(),
        xauthority: None,
    }
}

fn default_display_name() -> String {
    ":0".to_string()
}

fn default_provision() -> ProvisionSettings {
    ProvisionSettings {
        auto_install: default_auto_install(),
        packages: default_packages(),
    }
}

fn default_auto_install() -> bool {
    true
}

fn default_packages() -> Vec<String> {
    vec!["feh".to_string(), "unclutter".to_string()]
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            media: default_media(),
            volume: default_volume(),
            logging: default_logging(),
            display: default_display(),
            tools: ToolPaths::default(),
            provision: default_provision(),
        }
    }
}
