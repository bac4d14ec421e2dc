use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Failed to open video source: {source_path}")]
    Open { source_path: String },

    #[error("Video backend error: {0}")]
    Backend(#[from] opencv::Error),

    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Frame data is not continuous")]
    NonContiguousFrame,

    #[error("Frame buffer size mismatch: {got} bytes for {width}x{height}")]
    BufferSize { got: usize, width: u32, height: u32 },

    #[error("Frame archive error: {message}")]
    Archive { message: String },

    #[error("No frames decoded from {source_path}")]
    NoFrames { source_path: String },
}

pub type Result<T> = std::result::Result<T, GrabError>;
