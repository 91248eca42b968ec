//! Core types for playback control

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Volume reported when the mixer output cannot be parsed
pub const DEFAULT_VOLUME: u8 = 80;

/// Default volume step for `volume_up` / `volume_down`
pub const DEFAULT_VOLUME_STEP: u8 = 5;

/// Playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Black frame on screen, no video
    Idle,

    /// A video player owns the display
    Playing,
}

/// What the current foreground process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForegroundKind {
    /// Video player
    Player,

    /// Image viewer showing the black frame
    IdleViewer,

    /// Screen-blanking fallback
    Blanker,
}

/// Snapshot of the supervisor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub mode: PlaybackMode,

    /// Last known system volume (0-100)
    pub volume: u8,

    /// Kind of the live foreground process, if any
    pub foreground: Option<ForegroundKind>,

    /// Pid of the live foreground process, if known
    pub pid: Option<u32>,
}

/// A single positional argument of an inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArg {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),

    /// Transport value with no primitive mapping (blob, nil, ...)
    Other(String),
}

impl CommandArg {
    /// Interpret the argument as an integer volume level
    ///
    /// Floats are truncated toward zero; strings must contain an integer.
    /// Booleans are rejected rather than read as 0/1. No range check happens
    /// here.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CommandArg::Int(value) => Some(*value),
            CommandArg::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            CommandArg::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CommandArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandArg::Int(value) => write!(f, "{}", value),
            CommandArg::Float(value) => write!(f, "{}", value),
            CommandArg::Str(value) => f.write_str(value),
            CommandArg::Bool(value) => write!(f, "{}", value),
            CommandArg::Other(value) => f.write_str(value),
        }
    }
}

/// Inbound control command
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<CommandArg>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<CommandArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Name with surrounding whitespace and leading slashes removed
    ///
    /// `"/volume_up"` and `"volume_up"` both route to the same action.
    pub fn stripped_name(&self) -> &str {
        self.name.trim().trim_start_matches('/')
    }
}

/// Volume settings, fixed after startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeConfig {
    step: u8,
    channel: String,
}

impl VolumeConfig {
    /// Create volume settings; `step` is clamped to 1-20
    pub fn new(step: i64, channel: impl Into<String>) -> Self {
        Self {
            step: step.clamp(1, 20) as u8,
            channel: channel.into(),
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    /// Mixer channel used for get/set
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Executables invoked by the control core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_mixer")]
    pub mixer: PathBuf,

    #[serde(default = "default_player")]
    pub player: PathBuf,

    #[serde(default = "default_viewer")]
    pub viewer: PathBuf,

    #[serde(default = "default_power")]
    pub power: PathBuf,

    #[serde(default = "default_cursor")]
    pub cursor: PathBuf,

    #[serde(default = "default_package_manager")]
    pub package_manager: PathBuf,

    #[serde(default = "default_sudo")]
    pub sudo: PathBuf,
}

fn default_mixer() -> PathBuf {
    PathBuf::from("amixer")
}

fn default_player() -> PathBuf {
    PathBuf::from("/usr/bin/cvlc")
}

fn default_viewer() -> PathBuf {
    PathBuf::from("feh")
}

fn default_power() -> PathBuf {
    PathBuf::from("xset")
}

fn default_cursor() -> PathBuf {
    PathBuf::from("unclutter")
}

fn default_package_manager() -> PathBuf {
    PathBuf::from("apt-get")
}

fn default_sudo() -> PathBuf {
    PathBuf::from("sudo")
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            mixer: default_mixer(),
            player: default_player(),
            viewer: default_viewer(),
            power: default_power(),
            cursor: default_cursor(),
            package_manager: default_package_manager(),
            sudo: default_sudo(),
        }
    }
}

/// X display environment injected into display-bound children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEnv {
    pub display: String,
    pub xauthority: Option<PathBuf>,
}

impl DisplayEnv {
    pub fn new(display: impl Into<String>, xauthority: Option<PathBuf>) -> Self {
        Self {
            display: display.into(),
            xauthority,
        }
    }

    /// `:0` plus `~/.Xauthority` when that file exists
    pub fn detect() -> Self {
        let xauthority = home_dir().join(".Xauthority");
        Self {
            display: ":0".to_string(),
            xauthority: xauthority.exists().then_some(xauthority),
        }
    }

    pub fn vars(&self) -> Vec<(String, OsString)> {
        let mut vars = vec![("DISPLAY".to_string(), OsString::from(&self.display))];
        if let Some(xauthority) = &self.xauthority {
            vars.push(("XAUTHORITY".to_string(), xauthority.clone().into_os_string()));
        }
        vars
    }
}

impl Default for DisplayEnv {
    fn default() -> Self {
        Self::detect()
    }
}

/// Static configuration of the playback core
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Directory that `play` filenames are resolved against
    pub media_dir: PathBuf,

    /// Directory holding the cached black frame
    pub cache_dir: PathBuf,

    /// Wait between SIGTERM and SIGKILL
    pub grace_period: Duration,

    pub tools: ToolPaths,
    pub display: DisplayEnv,
}

impl PlaybackConfig {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            ..Self::default()
        }
    }

    /// Location of the one-pixel black PNG
    pub fn idle_image_path(&self) -> PathBuf {
        self.cache_dir.join("black.png")
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            cache_dir: default_cache_dir(),
            grace_period: DEFAULT_GRACE_PERIOD,
            tools: ToolPaths::default(),
            display: DisplayEnv::detect(),
        }
    }
}

/// `$HOME`, or the working directory when unset
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_media_dir() -> PathBuf {
    home_dir().join("Videos")
}

pub fn default_cache_dir() -> PathBuf {
    home_dir().join(".cache").join("piosc")
}

/// Display name for a program path in log lines
pub(crate) fn program_name(program: &Path) -> String {
    program.display().to_string()
}
