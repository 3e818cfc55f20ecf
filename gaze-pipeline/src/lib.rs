//! Gaze Pipeline Library
//!
//! A stateless numeric library that turns eye-tracker screen coordinates into
//! angular position and velocity signals, detects saccades and microsaccades
//! in them and computes descriptive properties of every detected event.
//!
//! # Architecture
//!
//! The library works on in-memory batches only:
//! - [`GazeFrame`] holds the samples of one recording
//! - [`Experiment`] carries the screen geometry and sampling rate
//! - [`microsaccades`] detects events with the Engbert algorithm
//! - [`EventGazeProcessor`] joins events back to their samples and evaluates
//!   properties from the [`PropertyRegistry`]
//!
//! The library does NOT:
//! - Parse eye-tracker file formats
//! - Download or catalog datasets
//! - Run more than one recording at a time
//!
//! Loading recordings and processing many of them is done by the application
//! layer (gaze-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use gaze_pipeline::{
//!     microsaccades, ChannelKind, EventGazeProcessor, Experiment, EyeSelection, GazeFrame,
//!     MicrosaccadeParams, Origin, Screen, VelocityMethod,
//! };
//! use std::collections::BTreeMap;
//!
//! let screen = Screen::new(1280.0, 1024.0, 38.0, 30.0, 68.0, Origin::LowerLeft).unwrap();
//! let experiment = Experiment::new(screen, 1000.0).unwrap();
//!
//! let mut columns = BTreeMap::new();
//! columns.insert("x_pix".to_string(), vec![640.0; 100]);
//! columns.insert("y_pix".to_string(), vec![512.0; 100]);
//!
//! let mut gaze = GazeFrame::new((0..100).collect(), columns)
//!     .unwrap()
//!     .with_experiment(experiment)
//!     .with_identifier("subject_id", 1);
//!
//! gaze.pix2deg().unwrap();
//! gaze.pos2vel(&VelocityMethod::Smooth).unwrap();
//!
//! let positions = gaze.eye_columns(EyeSelection::Auto, ChannelKind::Position).unwrap();
//! let velocities = gaze.eye_columns(EyeSelection::Auto, ChannelKind::Velocity).unwrap();
//! let events = microsaccades(
//!     gaze.select(&positions.to_vec()).unwrap().view(),
//!     gaze.select(&velocities.to_vec()).unwrap().view(),
//!     Some(gaze.time()),
//!     &MicrosaccadeParams::new().with_threshold([0.5, 0.5]),
//! )
//! .unwrap()
//! .with_column("subject_id", 1);
//!
//! let processor = EventGazeProcessor::new(&["amplitude", "peak_velocity"]).unwrap();
//! let properties = processor.process(&events, &gaze, &["subject_id"]).unwrap();
//! for event in properties.iter() {
//!     println!("{} {}..{} {:?}", event.name(), event.onset(), event.offset(), event.get("amplitude"));
//! }
//! ```

// Public modules
pub mod config;
pub mod events;
pub mod gaze;
pub mod types;

// Re-export main types for convenience
pub use config::{MicrosaccadeParams, Threshold, VelocityConfig};
pub use events::{
    compute_threshold, microsaccades, Event, EventFrame, EventGazeProcessor, EventProcessor,
    EventProperty, EventWindow, PropertyInputs, PropertyRegistry, ThresholdMethod,
};
pub use gaze::{
    consecutive, deg2pix, norm, pix2deg, pos2vel, split, ChannelKind, ColumnPair, Experiment,
    EyeChannels, EyeSelection, GazeFrame, Origin, SavgolMode, SavitzkyGolayConfig, Screen,
    VelocityMethod,
};
pub use types::{GazeError, Result, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: the global registry holds the built-in properties
        assert_eq!(PropertyRegistry::global().len(), 5);
        assert!(!VERSION.is_empty());
    }
}
