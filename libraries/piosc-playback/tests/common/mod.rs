//! Shared test fixtures
//!
//! `StubLauncher` stands in for every external tool. It emulates `amixer`
//! faithfully (scontrols/get/set against an in-memory level) and records
//! every spawned child with a liveness flag so tests can count foreground
//! processes.

#![allow(dead_code)]

use async_trait::async_trait;
use piosc_playback::{
    CommandRouter, DisplayEnv, ForegroundProcess, PlaybackConfig, PlaybackError,
    PlaybackSupervisor, ProcessLauncher, ProcessOutput, ProcessSpec, ToolPaths, VolumeConfig,
    VolumeController,
};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const SCONTROLS: &str = "Simple mixer control 'Headphone',0\n\
                             Simple mixer control 'PCM',0\n\
                             Simple mixer control 'Master',0\n";

#[derive(Clone)]
pub struct SpawnRecord {
    pub spec: ProcessSpec,
    pub pid: u32,
    alive: Arc<AtomicBool>,
}

impl SpawnRecord {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

struct StubState {
    volume: u8,
    scontrols: String,
    get_output: Option<String>,
    failing: HashSet<PathBuf>,
    runs: Vec<ProcessSpec>,
    spawned: Vec<SpawnRecord>,
}

#[derive(Clone)]
pub struct StubLauncher {
    state: Arc<Mutex<StubState>>,
    next_pid: Arc<AtomicU32>,
    tools: ToolPaths,
}

impl StubLauncher {
    pub fn new(initial_volume: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                volume: initial_volume,
                scontrols: SCONTROLS.to_string(),
                get_output: None,
                failing: HashSet::new(),
                runs: Vec::new(),
                spawned: Vec::new(),
            })),
            next_pid: Arc::new(AtomicU32::new(1000)),
            tools: ToolPaths::default(),
        }
    }

    /// Make every invocation of `program` fail to start
    pub fn fail(&self, program: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing.insert(program.into());
    }

    pub fn set_scontrols(&self, output: &str) {
        self.state.lock().unwrap().scontrols = output.to_string();
    }

    /// Replace `amixer get` output with arbitrary text
    pub fn set_get_output(&self, output: &str) {
        self.state.lock().unwrap().get_output = Some(output.to_string());
    }

    /// Volume as the "system" sees it
    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    /// Change the volume behind the daemon's back
    pub fn set_volume(&self, level: u8) {
        self.state.lock().unwrap().volume = level;
    }

    pub fn runs(&self) -> Vec<ProcessSpec> {
        self.state.lock().unwrap().runs.clone()
    }

    /// Mixer invocations whose first argument is `verb`
    pub fn mixer_calls(&self, verb: &str) -> usize {
        self.runs()
            .iter()
            .filter(|spec| spec.runs(&self.tools.mixer))
            .filter(|spec| spec.argv().first().map(String::as_str) == Some(verb))
            .count()
    }

    pub fn spawned(&self) -> Vec<SpawnRecord> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn alive(&self) -> Vec<SpawnRecord> {
        self.spawned().into_iter().filter(SpawnRecord::is_alive).collect()
    }

    pub fn alive_of(&self, program: &Path) -> Vec<SpawnRecord> {
        self.alive()
            .into_iter()
            .filter(|record| record.spec.runs(program))
            .collect()
    }

    /// Live player, viewer and blanker processes (everything but the cursor hider)
    pub fn foreground_alive(&self) -> Vec<SpawnRecord> {
        self.alive()
            .into_iter()
            .filter(|record| !record.spec.runs(&self.tools.cursor))
            .collect()
    }

    fn amixer(state: &mut StubState, spec: &ProcessSpec) -> ProcessOutput {
        let argv = spec.argv();
        match argv.first().map(String::as_str) {
            Some("scontrols") => ok(state.scontrols.clone()),
            Some("get") => {
                let channel = argv.get(1).cloned().unwrap_or_default();
                let stdout = state.get_output.clone().unwrap_or_else(|| {
                    format!(
                        "Simple mixer control '{channel}',0\n  \
                         Capabilities: pvolume pswitch\n  \
                         Front Left: Playback 40000 [{v}%] [on]\n  \
                         Front Right: Playback 40000 [{v}%] [on]\n",
                        channel = channel,
                        v = state.volume
                    )
                });
                ok(stdout)
            }
            Some("set") => {
                let level = argv
                    .get(2)
                    .and_then(|value| value.strip_suffix('%'))
                    .and_then(|value| value.parse::<u8>().ok());
                match level {
                    Some(level) if level <= 100 => {
                        state.volume = level;
                        ok(String::new())
                    }
                    _ => ProcessOutput {
                        success: false,
                        code: Some(1),
                        stdout: String::new(),
                        stderr: "amixer: Invalid command!".to_string(),
                    },
                }
            }
            _ => ok(String::new()),
        }
    }
}

fn ok(stdout: String) -> ProcessOutput {
    ProcessOutput {
        success: true,
        code: Some(0),
        stdout,
        stderr: String::new(),
    }
}

fn not_found(spec: &ProcessSpec) -> PlaybackError {
    PlaybackError::Spawn {
        program: spec.program.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
    }
}

#[async_trait]
impl ProcessLauncher for StubLauncher {
    async fn spawn(&self, spec: &ProcessSpec) -> piosc_playback::Result<Box<dyn ForegroundProcess>> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&spec.program) {
            return Err(not_found(spec));
        }

        let record = SpawnRecord {
            spec: spec.clone(),
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            alive: Arc::new(AtomicBool::new(true)),
        };
        state.spawned.push(record.clone());

        Ok(Box::new(StubProcess {
            label: spec.label(),
            pid: record.pid,
            alive: record.alive,
        }))
    }

    async fn run(&self, spec: &ProcessSpec) -> piosc_playback::Result<ProcessOutput> {
        let mut state = self.state.lock().unwrap();
        state.runs.push(spec.clone());
        if state.failing.contains(&spec.program) {
            return Err(not_found(spec));
        }

        if spec.runs(&self.tools.mixer) {
            Ok(Self::amixer(&mut state, spec))
        } else {
            Ok(ok(String::new()))
        }
    }
}

struct StubProcess {
    label: String,
    pid: u32,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl ForegroundProcess for StubProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_running(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn exit_code(&self) -> Option<i32> {
        None
    }

    async fn terminate(&mut self, _grace: Duration) -> piosc_playback::Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Media directory, cache directory and a config pointing at both
pub struct Fixture {
    pub media: TempDir,
    pub cache: TempDir,
    pub launcher: StubLauncher,
    pub config: PlaybackConfig,
}

impl Fixture {
    pub fn new(initial_volume: u8) -> Self {
        let media = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();

        let mut config = PlaybackConfig::new(media.path());
        config.cache_dir = cache.path().join("piosc");
        config.grace_period = Duration::from_millis(10);
        config.display = DisplayEnv::new(":0", None);

        Self {
            media,
            cache,
            launcher: StubLauncher::new(initial_volume),
            config,
        }
    }

    /// Create a fake video file in the media directory
    pub fn add_video(&self, name: &str) -> PathBuf {
        let path = self.media.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path.canonicalize().unwrap()
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.config.tools
    }

    pub fn launcher(&self) -> Arc<dyn ProcessLauncher> {
        Arc::new(self.launcher.clone())
    }

    pub fn supervisor(&self) -> PlaybackSupervisor {
        PlaybackSupervisor::new(self.launcher(), self.config.clone())
    }

    pub fn volume(&self, step: i64) -> VolumeController {
        VolumeController::new(
            self.launcher(),
            self.config.tools.mixer.clone(),
            VolumeConfig::new(step, "Master"),
        )
    }

    pub fn router(&self) -> CommandRouter {
        CommandRouter::new(self.supervisor(), self.volume(5))
    }
}

/// In-memory sink for `tracing` output
///
/// Install with [`LogCapture::install`]; the subscriber is active on the
/// current thread until the guard drops, which covers tasks spawned on a
/// current-thread runtime.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines at `level` (as formatted, e.g. "WARN") containing `needle`
    pub fn matching(&self, level: &str, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.contains(level) && line.contains(needle))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
