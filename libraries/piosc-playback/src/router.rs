//! Command routing
//!
//! Maps an inbound `(name, args)` command onto the supervisor or the volume
//! controller. Nothing here ever fails the caller: unknown commands and bad
//! arguments are logged and dropped.

use crate::{
    error::{PlaybackError, Result},
    supervisor::PlaybackSupervisor,
    types::{Command, CommandArg, PlaybackStatus},
    volume::VolumeController,
};

/// A validated command, ready to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Play(String),
    Stop,
    VolumeUp,
    VolumeDown,
    VolumeSet(CommandArg),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Play(_) => "play",
            Action::Stop => "stop",
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::VolumeSet(_) => "volume_set",
        }
    }
}

/// Validate a command against the dispatch table
///
/// Surplus arguments are ignored.
pub fn route(command: &Command) -> Result<Action> {
    let (action, required) = match command.stripped_name() {
        "play" => {
            let filename = command.args.first().ok_or(PlaybackError::MissingArgument {
                command: "play",
                expected: "filename",
            })?;
            (Action::Play(filename.to_string()), 1)
        }
        "stop" => (Action::Stop, 0),
        "volume_up" => (Action::VolumeUp, 0),
        "volume_down" => (Action::VolumeDown, 0),
        "volume_set" => {
            let level = command.args.first().ok_or(PlaybackError::MissingArgument {
                command: "volume_set",
                expected: "integer 0-100",
            })?;
            (Action::VolumeSet(level.clone()), 1)
        }
        other => return Err(PlaybackError::UnknownCommand(other.to_string())),
    };

    if command.args.len() > required {
        tracing::debug!(
            "Ignoring {} extra argument(s) for {}",
            command.args.len() - required,
            action.name()
        );
    }

    Ok(action)
}

pub struct CommandRouter {
    supervisor: PlaybackSupervisor,
    volume: VolumeController,
}

impl CommandRouter {
    pub fn new(supervisor: PlaybackSupervisor, volume: VolumeController) -> Self {
        Self { supervisor, volume }
    }

    pub fn supervisor(&mut self) -> &mut PlaybackSupervisor {
        &mut self.supervisor
    }

    /// Route and execute, logging instead of returning errors
    pub async fn handle(&mut self, command: Command) {
        tracing::info!(
            "Received command: {} with args: {:?}",
            command.name,
            command.args
        );

        let result = match route(&command) {
            Ok(action) => self.execute(action).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {}
            Err(PlaybackError::UnknownCommand(name)) => {
                tracing::warn!("Unknown command: {} with args: {:?}", name, command.args);
            }
            Err(
                e @ (PlaybackError::MissingArgument { .. } | PlaybackError::InvalidArgument(_)),
            ) => {
                tracing::warn!("Dropping {}: {}", command.name, e);
            }
            Err(e) => tracing::error!("{} failed: {}", command.name, e),
        }
    }

    /// Run a validated action to completion
    pub async fn execute(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Play(filename) => {
                self.supervisor.play(&filename).await?;
                self.volume.get_volume().await;
                Ok(())
            }
            Action::Stop => {
                self.supervisor.stop().await;
                Ok(())
            }
            Action::VolumeUp => {
                self.volume.volume_up().await;
                Ok(())
            }
            Action::VolumeDown => {
                self.volume.volume_down().await;
                Ok(())
            }
            Action::VolumeSet(raw) => self.volume.volume_set(&raw).await.map(|_| ()),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        let foreground = self.supervisor.foreground();
        PlaybackStatus {
            mode: self.supervisor.mode(),
            volume: self.volume.current(),
            foreground: foreground.map(|(kind, _)| kind),
            pid: foreground.and_then(|(_, pid)| pid),
        }
    }

    /// Stop every child; used on daemon shutdown
    pub async fn shutdown(&mut self) {
        self.supervisor.shutdown().await;
    }
}
