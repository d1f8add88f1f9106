//! Error taxonomy of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by model loading, face generation, and compositing.
///
/// Accelerator acquisition failure is deliberately *not* represented here: an unavailable GPU
/// is a capability downgrade handled by falling back to CPU execution, observable only through
/// logging.
#[derive(Debug, Error)]
pub enum Error {
    /// The named model asset does not exist.
    #[error("model asset not found: {}", path.display())]
    AssetNotFound { path: PathBuf },

    /// Reading a model asset failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model bytes were rejected by the inference runtime, or the model's tensor shapes
    /// don't match what the generator requires.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Running the loaded model failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A generation operation was attempted without a loaded model (either before a successful
    /// load, or after the generator was closed).
    #[error("no model is loaded")]
    NotLoaded,

    /// The generator was closed more than once.
    #[error("generator has already been closed")]
    AlreadyClosed,

    /// A compositing write would fall outside the bounds of the target image.
    #[error("write at ({x}, {y}) is out of bounds for {width}x{height} image")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
