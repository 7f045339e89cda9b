use thiserror::Error;

pub type Result<T, E = DriverError> = core::result::Result<T, E>;

/// Failures reported by a VCI driver or while converting its messages.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("controller not found: {0}")]
    ControllerNotFound(String),
    #[error("driver initialisation failed: {0}")]
    Init(String),
    #[error("transmit rejected: {0}")]
    Rejected(String),
    #[error("driver is not running")]
    NotRunning,
    #[error("unsupported by VCI driver: {0}")]
    Unsupported(&'static str),
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
}
