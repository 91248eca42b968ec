//! piosc Daemon Library
//!
//! OSC front end, configuration, logging and provisioning for the kiosk
//! playback daemon. The playback logic itself lives in `piosc_playback`.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod logging;
pub mod osc;
pub mod services;
pub mod signal;

// Re-export commonly used types for convenience
pub use config::{ConfigOverrides, DaemonConfig};
pub use error::{DaemonError, Result};
pub use osc::{decode_packet, OscListener};
pub use services::Provisioner;
pub use signal::shutdown_signal;
