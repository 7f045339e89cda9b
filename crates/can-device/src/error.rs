use thiserror::Error;

pub type Result<T, E = DeviceError> = core::result::Result<T, E>;

/// Category attached to errors reported through the device services.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    ReadError,
    WriteError,
    ConnectionError,
    ConfigurationError,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device is not connected")]
    NotConnected,
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("driver rejected frame: {0}")]
    Rejected(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("connection error: {0}")]
    Connection(String),
}

impl DeviceError {
    /// Category used when this error is reported to the host.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::NotConnected
            | DeviceError::InvalidFrame(_)
            | DeviceError::Unsupported(_)
            | DeviceError::Rejected(_) => ErrorKind::WriteError,
            DeviceError::Configuration(_) => ErrorKind::ConfigurationError,
            DeviceError::Connection(_) => ErrorKind::ConnectionError,
        }
    }
}
