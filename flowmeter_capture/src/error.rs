use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture timeout")]
    Timeout,
    #[error("capture file not ready: {0}")]
    NotReady(String),
    #[error("capture is not valid text: {0}")]
    Encoding(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
