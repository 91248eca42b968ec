//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use piosc_playback::{
    ForegroundProcess, PlaybackError, ProcessLauncher, ProcessOutput, ProcessSpec, ToolPaths,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Package-manager stand-in: `which` succeeds once the packages are installed
#[derive(Clone, Default)]
pub struct PackageStub {
    state: Arc<Mutex<PackageState>>,
}

#[derive(Default)]
struct PackageState {
    installed: bool,
    failing_step: Option<&'static str>,
    runs: Vec<ProcessSpec>,
}

impl PackageStub {
    pub fn installed() -> Self {
        let stub = Self::default();
        stub.state.lock().unwrap().installed = true;
        stub
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// Make `apt-get <step>` exit non-zero
    pub fn fail_step(&self, step: &'static str) {
        self.state.lock().unwrap().failing_step = Some(step);
    }

    pub fn is_installed(&self) -> bool {
        self.state.lock().unwrap().installed
    }

    /// Every invocation as `program arg arg ...`
    pub fn command_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .map(|spec| {
                std::iter::once(spec.program.display().to_string())
                    .chain(spec.argv())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    pub fn launcher(&self) -> Arc<dyn ProcessLauncher> {
        Arc::new(self.clone())
    }
}

fn exit(success: bool) -> ProcessOutput {
    ProcessOutput {
        success,
        code: Some(if success { 0 } else { 100 }),
        stdout: String::new(),
        stderr: if success {
            String::new()
        } else {
            "E: Unable to locate package".to_string()
        },
    }
}

#[async_trait]
impl ProcessLauncher for PackageStub {
    async fn spawn(&self, spec: &ProcessSpec) -> piosc_playback::Result<Box<dyn ForegroundProcess>> {
        Err(PlaybackError::Spawn {
            program: spec.program.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Unsupported, "stub cannot spawn"),
        })
    }

    async fn run(&self, spec: &ProcessSpec) -> piosc_playback::Result<ProcessOutput> {
        let mut state = self.state.lock().unwrap();
        state.runs.push(spec.clone());

        if spec.runs(Path::new("which")) {
            return Ok(exit(state.installed));
        }

        let tools = ToolPaths::default();
        if spec.runs(&tools.sudo) {
            let argv = spec.argv();
            let step = argv.get(1).cloned().unwrap_or_default();
            if state.failing_step == Some(step.as_str()) {
                return Ok(exit(false));
            }
            if step == "install" {
                state.installed = true;
            }
            return Ok(exit(true));
        }

        Ok(exit(true))
    }
}
