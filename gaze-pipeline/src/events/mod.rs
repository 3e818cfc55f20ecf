//! Event detection and event properties

pub mod engbert;
pub mod frame;
pub mod processing;
pub mod properties;
pub mod threshold;

// Re-export key types for convenience
pub use engbert::microsaccades;
pub use frame::{Event, EventFrame};
pub use processing::{EventGazeProcessor, EventProcessor};
pub use properties::{EventProperty, EventWindow, PropertyInputs, PropertyRegistry};
pub use threshold::{compute_threshold, ThresholdMethod};
