//! Event properties
//!
//! A property is a pure scalar reduction over the samples of one event. The
//! set of available properties is an immutable [`PropertyRegistry`] that maps
//! names to [`EventProperty`] implementations. Every property declares which
//! sample channels it reads ([`PropertyInputs`]) so that the processors only
//! hand it the channels it asked for.

use crate::types::{GazeError, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Sample channels a property reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyInputs {
    pub position: bool,
    pub velocity: bool,
}

impl PropertyInputs {
    /// Event fields only
    pub const NONE: PropertyInputs = PropertyInputs {
        position: false,
        velocity: false,
    };
    pub const POSITION: PropertyInputs = PropertyInputs {
        position: true,
        velocity: false,
    };
    pub const VELOCITY: PropertyInputs = PropertyInputs {
        position: false,
        velocity: true,
    };

    /// Whether the property needs gaze samples at all
    pub fn needs_samples(&self) -> bool {
        self.position || self.velocity
    }
}

/// Horizontal and vertical samples of one channel kind within an event
#[derive(Debug, Clone, Copy)]
pub struct Channels<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
}

/// An event together with the samples between its onset and offset
#[derive(Debug, Clone, Copy)]
pub struct EventWindow<'a> {
    pub onset: i64,
    pub offset: i64,
    pub position: Option<Channels<'a>>,
    pub velocity: Option<Channels<'a>>,
}

impl<'a> EventWindow<'a> {
    /// A window without samples, for properties over event fields only
    pub fn bare(onset: i64, offset: i64) -> Self {
        Self {
            onset,
            offset,
            position: None,
            velocity: None,
        }
    }

    fn position(&self, property: &str) -> Result<Channels<'a>> {
        self.position.ok_or_else(|| missing_input(property, "position"))
    }

    fn velocity(&self, property: &str) -> Result<Channels<'a>> {
        self.velocity.ok_or_else(|| missing_input(property, "velocity"))
    }
}

fn missing_input(property: &str, kind: &str) -> GazeError {
    GazeError::InvalidConfig(format!("property '{}' requires {} samples", property, kind))
}

/// A named scalar reduction over an event window
pub trait EventProperty: Send + Sync {
    /// Name the property is registered and reported under
    fn name(&self) -> &str;

    /// Sample channels the property reads
    fn inputs(&self) -> PropertyInputs;

    /// Reduce a window into one value
    fn compute(&self, window: &EventWindow<'_>) -> Result<Value>;
}

/// `offset - onset` in time ticks
#[derive(Debug, Clone, Copy)]
pub struct Duration;

impl EventProperty for Duration {
    fn name(&self) -> &str {
        "duration"
    }

    fn inputs(&self) -> PropertyInputs {
        PropertyInputs::NONE
    }

    fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
        Ok(Value::Integer(window.offset - window.onset))
    }
}

/// Maximum absolute velocity
#[derive(Debug, Clone, Copy)]
pub struct PeakVelocity;

impl EventProperty for PeakVelocity {
    fn name(&self) -> &str {
        "peak_velocity"
    }

    fn inputs(&self) -> PropertyInputs {
        PropertyInputs::VELOCITY
    }

    fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
        let v = window.velocity(self.name())?;
        Ok(Value::Float(peak_velocity(v.x, v.y)))
    }
}

/// Sum of the horizontal and vertical position ranges
#[derive(Debug, Clone, Copy)]
pub struct Dispersion;

impl EventProperty for Dispersion {
    fn name(&self) -> &str {
        "dispersion"
    }

    fn inputs(&self) -> PropertyInputs {
        PropertyInputs::POSITION
    }

    fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
        let p = window.position(self.name())?;
        Ok(Value::Float(dispersion(p.x, p.y)))
    }
}

/// Diagonal of the bounding box of all positions
#[derive(Debug, Clone, Copy)]
pub struct Amplitude;

impl EventProperty for Amplitude {
    fn name(&self) -> &str {
        "amplitude"
    }

    fn inputs(&self) -> PropertyInputs {
        PropertyInputs::POSITION
    }

    fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
        let p = window.position(self.name())?;
        Ok(Value::Float(amplitude(p.x, p.y)))
    }
}

/// Distance between the first and the last position
#[derive(Debug, Clone, Copy)]
pub struct Disposition;

impl EventProperty for Disposition {
    fn name(&self) -> &str {
        "disposition"
    }

    fn inputs(&self) -> PropertyInputs {
        PropertyInputs::POSITION
    }

    fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
        let p = window.position(self.name())?;
        Ok(Value::Float(disposition(p.x, p.y)))
    }
}

/// Maximum of `sqrt(vx² + vy²)`, NaN samples skipped
pub fn peak_velocity(vx: &[f64], vy: &[f64]) -> f64 {
    let speeds: Vec<f64> = vx.iter().zip(vy).map(|(x, y)| x.hypot(*y)).collect();
    range(&speeds).map_or(f64::NAN, |(_, max)| max)
}

/// `(max x - min x) + (max y - min y)`
pub fn dispersion(x: &[f64], y: &[f64]) -> f64 {
    span(x) + span(y)
}

/// `sqrt((max x - min x)² + (max y - min y)²)`
pub fn amplitude(x: &[f64], y: &[f64]) -> f64 {
    span(x).hypot(span(y))
}

/// `sqrt((x_first - x_last)² + (y_first - y_last)²)`
pub fn disposition(x: &[f64], y: &[f64]) -> f64 {
    match (x.first(), x.last(), y.first(), y.last()) {
        (Some(x0), Some(x1), Some(y0), Some(y1)) => (x0 - x1).hypot(y0 - y1),
        _ => f64::NAN,
    }
}

/// Minimum and maximum of the non-NaN values
fn range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().filter(|v| !v.is_nan()).fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}

fn span(values: &[f64]) -> f64 {
    range(values).map_or(f64::NAN, |(min, max)| max - min)
}

/// Immutable name → property table
pub struct PropertyRegistry {
    properties: BTreeMap<String, Box<dyn EventProperty>>,
}

impl PropertyRegistry {
    /// Registry without any property
    pub fn empty() -> Self {
        Self {
            properties: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in properties
    pub fn builtin() -> Self {
        Self::empty()
            .with_property(Duration)
            .with_property(PeakVelocity)
            .with_property(Dispersion)
            .with_property(Amplitude)
            .with_property(Disposition)
    }

    /// Process-wide registry of the built-in properties, built on first use
    pub fn global() -> &'static PropertyRegistry {
        static REGISTRY: OnceLock<PropertyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(PropertyRegistry::builtin)
    }

    /// Builder method: add a property, replacing one of the same name
    pub fn with_property(mut self, property: impl EventProperty + 'static) -> Self {
        self.register(Box::new(property));
        self
    }

    /// Add a property, returning the one it replaces
    pub fn register(&mut self, property: Box<dyn EventProperty>) -> Option<Box<dyn EventProperty>> {
        self.properties.insert(property.name().to_string(), property)
    }

    /// Look up a property by name
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidProperty`] listing the registered names.
    pub fn get(&self, name: &str) -> Result<&dyn EventProperty> {
        self.properties
            .get(name)
            .map(|property| property.as_ref())
            .ok_or_else(|| GazeError::InvalidProperty {
                name: name.to_string(),
                valid: self.names(),
            })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("properties", &self.names())
            .finish()
    }
}
