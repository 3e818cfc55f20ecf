//! Gaze sample transforms
//!
//! This module contains the screen geometry, the pixel to degree conversion,
//! the velocity estimators and the per-recording sample batch.

pub mod experiment;
pub mod frame;
pub mod savgol;
pub mod screen;
pub mod transforms;

// Re-export key types for convenience
pub use experiment::Experiment;
pub use frame::{ChannelKind, ColumnPair, EyeChannels, EyeSelection, GazeFrame};
pub use savgol::{SavgolMode, SavitzkyGolayConfig};
pub use screen::{deg2pix, pix2deg, Origin, Screen};
pub use transforms::{consecutive, norm, pos2vel, split, VelocityMethod};
