//! Single-owner playback task
//!
//! The router and all playback state live inside one task. Listeners talk to
//! it through a cloneable [`ControlHandle`], so commands, status queries and
//! shutdown are serialized on the same channel and can never race on the
//! foreground process.

use crate::{
    error::{PlaybackError, Result},
    router::CommandRouter,
    types::{Command, PlaybackStatus},
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Pending requests before `submit` waits
const QUEUE_CAPACITY: usize = 64;

/// Requests understood by the playback task
#[derive(Debug)]
pub enum ControlRequest {
    Command(Command),
    Status(oneshot::Sender<PlaybackStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable sender side of the playback task
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    /// Handle plus the raw request stream, for driving without a router
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ControlRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a command; handled after everything queued before it
    pub async fn submit(&self, command: Command) -> Result<()> {
        self.tx
            .send(ControlRequest::Command(command))
            .await
            .map_err(|_| PlaybackError::ServiceClosed)
    }

    pub async fn status(&self) -> Result<PlaybackStatus> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControlRequest::Status(reply))
            .await
            .map_err(|_| PlaybackError::ServiceClosed)?;
        response.await.map_err(|_| PlaybackError::ServiceClosed)
    }

    /// Stop every child and end the task; resolves once that is done
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(ControlRequest::Shutdown(reply))
            .await
            .map_err(|_| PlaybackError::ServiceClosed)?;
        done.await.map_err(|_| PlaybackError::ServiceClosed)
    }
}

pub struct PlaybackService;

impl PlaybackService {
    /// Move the router into its own task and show the idle frame
    pub fn spawn(router: CommandRouter) -> (ControlHandle, JoinHandle<()>) {
        let (handle, requests) = ControlHandle::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(Self::run(router, requests));
        (handle, task)
    }

    async fn run(mut router: CommandRouter, mut requests: mpsc::Receiver<ControlRequest>) {
        tracing::info!("Playback service started, showing idle screen");
        router.supervisor().show_idle().await;

        while let Some(request) = requests.recv().await {
            match request {
                ControlRequest::Command(command) => router.handle(command).await,
                ControlRequest::Status(reply) => {
                    let _ = reply.send(router.status());
                }
                ControlRequest::Shutdown(done) => {
                    tracing::info!("Shutting down playback");
                    router.shutdown().await;
                    let _ = done.send(());
                    return;
                }
            }
        }

        tracing::info!("All control handles dropped, shutting down playback");
        router.shutdown().await;
    }
}
