//! External process seam
//!
//! Every external utility (mixer, player, viewer, power tool) is reached
//! through [`ProcessLauncher`]. The daemon uses [`SystemLauncher`]; tests
//! provide stubs that emulate the tools.

mod system;

pub use system::SystemLauncher;

use crate::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Program, arguments and environment for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
    label: Option<String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            label: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, vars: Vec<(String, OsString)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Short name used in log lines (defaults to the program's file name)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            self.program
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.program.display().to_string())
        })
    }

    /// Arguments as lossy UTF-8 strings
    pub fn argv(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    /// Whether this invocation targets `program`
    pub fn runs(&self, program: &Path) -> bool {
        self.program == program
    }
}

/// Captured result of a run-to-completion invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Starts external programs
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a long-running child whose output is drained in the background
    async fn spawn(&self, spec: &ProcessSpec) -> Result<Box<dyn ForegroundProcess>>;

    /// Run a program to completion and capture its output
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput>;
}

/// Handle to a spawned child
#[async_trait]
pub trait ForegroundProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn label(&self) -> &str;

    fn is_running(&self) -> bool;

    /// Exit code once the process has ended (`None` while running or when
    /// killed by a signal)
    fn exit_code(&self) -> Option<i32>;

    /// Grace-then-kill: SIGTERM, wait up to `grace`, then SIGKILL
    ///
    /// A process that has already exited counts as terminated.
    async fn terminate(&mut self, grace: Duration) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder_collects_arguments() {
        let spec = ProcessSpec::new("/usr/bin/cvlc")
            .arg("--fullscreen")
            .args(["--loop", "--no-osd"])
            .envs(vec![("DISPLAY".to_string(), OsString::from(":0"))]);

        assert_eq!(spec.argv(), vec!["--fullscreen", "--loop", "--no-osd"]);
        assert_eq!(spec.env.len(), 1);
        assert_eq!(spec.label(), "cvlc");
        assert!(spec.runs(Path::new("/usr/bin/cvlc")));
    }

    #[test]
    fn explicit_label_wins() {
        let spec = ProcessSpec::new("feh").with_label("idle viewer");
        assert_eq!(spec.label(), "idle viewer");
    }
}
