//! OSC over UDP front end
//!
//! Every message on any address becomes a [`Command`] for the playback
//! service. Bundles are flattened in order. Nothing is ever sent back.

use crate::error::{DaemonError, Result};
use piosc_playback::{Command, CommandArg, ControlHandle};
use rosc::{OscMessage, OscPacket, OscType};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Largest UDP payload
const MAX_DATAGRAM: usize = 65_507;

/// Decode one datagram into commands, bundle contents first to last
pub fn decode_packet(datagram: &[u8]) -> Result<Vec<Command>> {
    let (_, packet) =
        rosc::decoder::decode_udp(datagram).map_err(|e| DaemonError::Osc(format!("{:?}", e)))?;

    let mut commands = Vec::new();
    flatten(packet, &mut commands);
    Ok(commands)
}

fn flatten(packet: OscPacket, commands: &mut Vec<Command>) {
    match packet {
        OscPacket::Message(message) => commands.push(to_command(message)),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, commands);
            }
        }
    }
}

pub fn to_command(message: OscMessage) -> Command {
    Command::new(message.addr, message.args.into_iter().map(to_arg).collect())
}

/// Map an OSC argument onto the primitive command argument
pub fn to_arg(arg: OscType) -> CommandArg {
    match arg {
        OscType::Int(value) => CommandArg::Int(i64::from(value)),
        OscType::Long(value) => CommandArg::Int(value),
        OscType::Float(value) => CommandArg::Float(f64::from(value)),
        OscType::Double(value) => CommandArg::Float(value),
        OscType::String(value) => CommandArg::Str(value),
        OscType::Char(value) => CommandArg::Str(value.to_string()),
        OscType::Bool(value) => CommandArg::Bool(value),
        OscType::Nil => CommandArg::Other("nil".to_string()),
        OscType::Inf => CommandArg::Other("inf".to_string()),
        OscType::Blob(bytes) => CommandArg::Other(format!("blob({} bytes)", bytes.len())),
        other => CommandArg::Other(format!("{:?}", other)),
    }
}

pub struct OscListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl OscListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DaemonError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        tracing::info!("OSC server started on {}", local_addr);
        Ok(Self { socket, local_addr })
    }

    /// Bound address (differs from the requested one when port 0 was asked for)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Forward datagrams to the playback service until `shutdown` completes
    ///
    /// Also returns once the service has gone away.
    pub async fn run<F>(self, handle: ControlHandle, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!("OSC listener on {} stopping", self.local_addr);
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            tracing::warn!("Error receiving OSC datagram: {}", e);
                            continue;
                        }
                    };

                    let commands = match decode_packet(&buf[..len]) {
                        Ok(commands) => commands,
                        Err(e) => {
                            tracing::warn!("Dropping {} byte datagram from {}: {}", len, peer, e);
                            continue;
                        }
                    };

                    for command in commands {
                        tracing::info!("Received OSC message at address: {}", command.name);
                        tracing::info!("Arguments: {:?}", command.args);

                        if handle.submit(command).await.is_err() {
                            tracing::warn!("Playback service closed, OSC listener stopping");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
