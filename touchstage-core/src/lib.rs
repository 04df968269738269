// Touchstage Core Library
// Gesture, transform and hit-testing engine for manipulable stage elements

pub mod config;
pub mod error;
pub mod geometry;
pub mod transform;
pub mod element;
pub mod stage;
pub mod gesture;
pub mod registry;
pub mod handle;
pub mod dispatcher;

pub use config::EngineConfig;
pub use error::{Error, Result};
