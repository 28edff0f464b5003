use std::path::PathBuf;
use thiserror::Error;
/// Failures raised while starting or running a sample source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[cfg(feature = "serial")]
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("transport read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid baud rate: {0:?}")]
    InvalidBaudRate(String),
}
/// Failures raised while loading a layout document. The previous layout stays in effect.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout document is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("layout declares {declared} channels but frames carry only {max}")]
    TooManyChannels { declared: usize, max: usize },
}
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render target has been destroyed")]
    TargetDestroyed,
}
