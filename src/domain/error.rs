use std::time::Duration;
use thiserror::Error;

/// MavShell unified error type
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Link I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    #[error("no serial connection found")]
    NoSerialPortFound,

    #[error("No heartbeat received within {0:?}")]
    LivenessTimeout(Duration),

    #[error("Link closed by remote end")]
    LinkClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl ShellError {
    /// Whether the error came from the telemetry link rather than the local side.
    ///
    /// A transport error leaves the link unusable, so the session must not try
    /// to send anything else over it.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ShellError::Serial(_)
                | ShellError::Io(_)
                | ShellError::LivenessTimeout(_)
                | ShellError::LinkClosed
                | ShellError::Protocol(_)
        )
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
