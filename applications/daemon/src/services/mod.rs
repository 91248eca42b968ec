/// Daemon services
pub mod provision;

pub use provision::Provisioner;
