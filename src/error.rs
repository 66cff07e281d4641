use thiserror::Error;

/// Errors produced by background models and their collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown method name, unsupported file type, parameter out of range
    #[error("configuration error: {0}")]
    Config(String),

    /// Seek or frame read failure on a video source
    #[error("decode error: {0}")]
    Decode(String),

    /// Operation called in the wrong lifecycle state
    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("cannot aggregate an empty sample stack")]
    EmptyStack,

    #[error("frame shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The background recompute worker panicked or failed
    #[error("recompute worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
