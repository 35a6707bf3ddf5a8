/// All errors produced by this crate.
///
/// Shape and index errors mean the network or data is wired incorrectly and
/// are not retried. `UndefinedAccuracy` is the only error the training loop
/// recovers from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("operation requires a non-empty tensor")]
    EmptyTensor,

    /// `update_weights` was called without a pending gradient.
    #[error("no gradient available: call backward before update_weights")]
    NoGradientAvailable,

    /// `backward` was called without a matching `forward`.
    #[error("{layer}: backward called without a matching forward")]
    MissingForward { layer: &'static str },

    #[error("accuracy is undefined for an empty evaluation set")]
    UndefinedAccuracy,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
