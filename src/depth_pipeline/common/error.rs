use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Capture or recording already in progress")]
    Busy,

    #[error("Camera session is not open")]
    NotOpen,

    #[error("{0} stream is not available on this device")]
    StreamUnavailable(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid frame dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Frame payload has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Frame queue is full")]
    QueueFull,

    #[error("Stream writer is closed")]
    WriterClosed,

    #[error("Malformed stream file: {0}")]
    MalformedStream(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
