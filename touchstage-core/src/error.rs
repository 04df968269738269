//! Error types for the touchstage engine
//!
//! Gesture-level conditions (updates without a gesture, coincident pointers,
//! unreadable image content, missing targets) are never reported here; they
//! are no-ops, clamps or fail-open hits. These errors cover the few operations
//! that can genuinely fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The transform has a (near) zero determinant and cannot be inverted
    #[error("transform is not invertible (determinant {determinant})")]
    SingularTransform { determinant: f64 },

    /// The offscreen surface used for pixel hit testing could not be created
    #[error("failed to allocate offscreen pixmap for hit testing")]
    PixmapAlloc,

    /// Image content has dimensions or data that do not form a raster
    #[error("invalid image content: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
