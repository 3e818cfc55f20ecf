//! Event property processors
//!
//! [`EventProcessor`] evaluates properties that only read event fields.
//! [`EventGazeProcessor`] joins events to the gaze samples of their recording
//! and evaluates properties over each event's sample window.

use crate::events::frame::{Event, EventFrame};
use crate::events::properties::{Channels, EventProperty, EventWindow, PropertyRegistry};
use crate::gaze::frame::{ChannelKind, ColumnPair, EyeSelection, GazeFrame};
use crate::types::{GazeError, Result, Value};
use std::collections::HashSet;

fn lookup<'r, S: AsRef<str>>(
    registry: &'r PropertyRegistry,
    names: &[S],
) -> Result<Vec<&'r dyn EventProperty>> {
    names.iter().map(|name| registry.get(name.as_ref())).collect()
}

/// Evaluates event-level properties such as `duration`
#[derive(Debug)]
pub struct EventProcessor<'r> {
    registry: &'r PropertyRegistry,
    properties: Vec<String>,
}

impl EventProcessor<'static> {
    /// Create a processor over the global registry
    pub fn new<S: AsRef<str>>(properties: &[S]) -> Result<Self> {
        Self::with_registry(PropertyRegistry::global(), properties)
    }
}

impl<'r> EventProcessor<'r> {
    /// Create a processor over a specific registry
    ///
    /// # Errors
    /// * [`GazeError::InvalidProperty`] for names missing from the registry
    /// * [`GazeError::InvalidConfig`] for properties that read gaze samples
    pub fn with_registry<S: AsRef<str>>(registry: &'r PropertyRegistry, properties: &[S]) -> Result<Self> {
        for property in lookup(registry, properties)? {
            if property.inputs().needs_samples() {
                return Err(GazeError::InvalidConfig(format!(
                    "property '{}' reads gaze samples and needs an EventGazeProcessor",
                    property.name()
                )));
            }
        }

        Ok(Self {
            registry,
            properties: properties.iter().map(|p| p.as_ref().to_string()).collect(),
        })
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Compute the properties of every event
    ///
    /// Returns one row per input event holding `name`, `onset`, `offset` and
    /// one column per property.
    pub fn process(&self, events: &EventFrame) -> Result<EventFrame> {
        let properties = lookup(self.registry, &self.properties)?;
        let mut result = EventFrame::with_schema(self.properties.iter().cloned());

        for event in events.iter() {
            let window = EventWindow::bare(event.onset(), event.offset());
            let mut row = Event::new(event.name().to_string(), event.onset(), event.offset())?;
            for property in &properties {
                row.set(property.name().to_string(), property.compute(&window)?);
            }
            result.push(row);
        }

        log::debug!("computed {:?} for {} events", self.properties, result.len());
        Ok(result)
    }
}

/// Evaluates properties over the gaze samples of every event
#[derive(Debug)]
pub struct EventGazeProcessor<'r> {
    registry: &'r PropertyRegistry,
    properties: Vec<String>,
    eye: EyeSelection,
    position_columns: Option<ColumnPair>,
    velocity_columns: Option<ColumnPair>,
}

impl EventGazeProcessor<'static> {
    /// Create a processor over the global registry
    pub fn new<S: AsRef<str>>(properties: &[S]) -> Result<Self> {
        Self::with_registry(PropertyRegistry::global(), properties)
    }
}

impl<'r> EventGazeProcessor<'r> {
    /// Create a processor over a specific registry
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidProperty`] for names missing from the registry.
    pub fn with_registry<S: AsRef<str>>(registry: &'r PropertyRegistry, properties: &[S]) -> Result<Self> {
        lookup(registry, properties)?;
        Ok(Self {
            registry,
            properties: properties.iter().map(|p| p.as_ref().to_string()).collect(),
            eye: EyeSelection::Auto,
            position_columns: None,
            velocity_columns: None,
        })
    }

    /// Builder method: select the eye whose channels the properties read
    pub fn with_eye(mut self, eye: EyeSelection) -> Self {
        self.eye = eye;
        self
    }

    /// Builder method: read positions from explicit columns
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidColumns`] unless exactly two names are given.
    pub fn with_position_columns<S: AsRef<str> + std::fmt::Debug>(mut self, columns: &[S]) -> Result<Self> {
        self.position_columns = Some(ColumnPair::from_slice("position_columns", columns)?);
        Ok(self)
    }

    /// Builder method: read velocities from explicit columns
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidColumns`] unless exactly two names are given.
    pub fn with_velocity_columns<S: AsRef<str> + std::fmt::Debug>(mut self, columns: &[S]) -> Result<Self> {
        self.velocity_columns = Some(ColumnPair::from_slice("velocity_columns", columns)?);
        Ok(self)
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Compute the properties of every event over its gaze samples
    ///
    /// Events are joined to the recording on `identifiers`, and each event is
    /// evaluated over the samples with `onset <= time <= offset`. Events are
    /// grouped by identifiers, name, onset and offset, so duplicates yield a
    /// single row. Events without samples in their window yield no row.
    ///
    /// The result holds `name`, `onset`, `offset`, the identifier columns and
    /// one column per property, in order of first appearance.
    ///
    /// # Errors
    /// * [`GazeError::InvalidConfig`] if `identifiers` is empty
    /// * [`GazeError::MissingColumns`] if an identifier or a gaze channel a
    ///   property reads is missing
    pub fn process(&self, events: &EventFrame, gaze: &GazeFrame, identifiers: &[&str]) -> Result<EventFrame> {
        if identifiers.is_empty() {
            return Err(GazeError::InvalidConfig(
                "list of identifiers must not be empty".to_string(),
            ));
        }
        let required = || identifiers.iter().map(|id| id.to_string()).collect::<Vec<_>>();

        let mut recording = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            let value = gaze.identifier(id).ok_or_else(|| GazeError::MissingColumns {
                required: required(),
                available: gaze.identifiers().keys().cloned().collect(),
            })?;
            if !events.has_column(id) {
                return Err(GazeError::MissingColumns {
                    required: required(),
                    available: events.schema().to_vec(),
                });
            }
            recording.push(value);
        }

        let properties = lookup(self.registry, &self.properties)?;
        let position = if properties.iter().any(|p| p.inputs().position) {
            Some(self.channels(gaze, ChannelKind::Position, self.position_columns.as_ref())?)
        } else {
            None
        };
        let velocity = if properties.iter().any(|p| p.inputs().velocity) {
            Some(self.channels(gaze, ChannelKind::Velocity, self.velocity_columns.as_ref())?)
        } else {
            None
        };

        let schema = identifiers
            .iter()
            .map(|id| id.to_string())
            .chain(self.properties.iter().cloned());
        let mut result = EventFrame::with_schema(schema);

        // A null identifier never matches
        if recording.iter().any(|value| value.is_null()) {
            log::warn!("recording has a null identifier, no event matches");
            return Ok(result);
        }

        let time = gaze.time();
        let mut seen: HashSet<(Vec<Value>, String, i64, i64)> = HashSet::new();

        for event in events.iter() {
            let matches = identifiers
                .iter()
                .zip(&recording)
                .all(|(id, value)| event.get(id) == Some(*value));
            if !matches {
                continue;
            }

            let key = (
                recording.iter().map(|value| (*value).clone()).collect::<Vec<_>>(),
                event.name().to_string(),
                event.onset(),
                event.offset(),
            );
            if !seen.insert(key) {
                continue;
            }

            let start = time.partition_point(|t| *t < event.onset());
            let end = time.partition_point(|t| *t <= event.offset());
            if start >= end {
                log::trace!("no samples between {} and {}", event.onset(), event.offset());
                continue;
            }

            let mut row = Event::new(event.name().to_string(), event.onset(), event.offset())?;
            for (id, value) in identifiers.iter().zip(&recording) {
                row.set(id.to_string(), (*value).clone());
            }
            for property in &properties {
                // Each property only sees the channels it declares
                let inputs = property.inputs();
                let window = EventWindow {
                    onset: event.onset(),
                    offset: event.offset(),
                    position: position.filter(|_| inputs.position).map(|c| window_of(c, start, end)),
                    velocity: velocity.filter(|_| inputs.velocity).map(|c| window_of(c, start, end)),
                };
                row.set(property.name().to_string(), property.compute(&window)?);
            }
            result.push(row);
        }

        log::debug!(
            "computed {:?} for {} of {} events",
            self.properties,
            result.len(),
            events.len()
        );
        Ok(result)
    }

    /// Sample channels of a kind, from explicit columns or the selected eye
    fn channels<'g>(
        &self,
        gaze: &'g GazeFrame,
        kind: ChannelKind,
        explicit: Option<&ColumnPair>,
    ) -> Result<Channels<'g>> {
        let pair = match explicit {
            Some(pair) => pair.clone(),
            None => gaze.eye_columns(self.eye, kind)?,
        };
        let column = |name: &str| {
            gaze.column(name).ok_or_else(|| GazeError::MissingColumns {
                required: pair.to_vec(),
                available: gaze.column_names(),
            })
        };
        Ok(Channels {
            x: column(&pair.x)?,
            y: column(&pair.y)?,
        })
    }
}

/// Samples `start..end` of both components
fn window_of(channels: Channels<'_>, start: usize, end: usize) -> Channels<'_> {
    Channels {
        x: &channels.x[start..end],
        y: &channels.y[start..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::properties::{EventProperty, PropertyInputs};
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn gaze() -> GazeFrame {
        let time: Vec<i64> = (0..10).map(|i| 100 + i).collect();
        let mut columns = BTreeMap::new();
        columns.insert("x_pos".to_string(), vec![0.0, 0.0, 1.0, 2.0, 4.0, 4.0, 4.0, 3.0, 3.0, 3.0]);
        columns.insert("y_pos".to_string(), vec![0.0; 10]);
        columns.insert("x_vel".to_string(), vec![0.0, 10.0, 20.0, 50.0, 30.0, 0.0, -5.0, -10.0, 0.0, 0.0]);
        columns.insert("y_vel".to_string(), vec![0.0; 10]);
        GazeFrame::new(time, columns).unwrap().with_identifier("subject_id", 1)
    }

    fn events() -> EventFrame {
        EventFrame::new("saccade", &[101, 106], &[104, 107])
            .unwrap()
            .with_column("subject_id", 1)
    }

    fn floats(frame: &EventFrame, column: &str) -> Vec<f64> {
        frame
            .column(column)
            .unwrap()
            .into_iter()
            .map(|v| v.as_f64().unwrap())
            .collect()
    }

    #[test]
    fn test_event_processor_duration() {
        let events = EventFrame::new("saccade", &[10, 30], &[25, 31]).unwrap();
        let result = EventProcessor::new(&["duration"]).unwrap().process(&events).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.column("duration").unwrap(),
            vec![&Value::Integer(15), &Value::Integer(1)]
        );
        assert_eq!(result.events()[0].onset(), 10);
    }

    #[test]
    fn test_event_processor_rejects_sample_properties() {
        assert!(matches!(EventProcessor::new(&["foo"]), Err(GazeError::InvalidProperty { .. })));
        assert!(matches!(
            EventProcessor::new(&["amplitude"]),
            Err(GazeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_gaze_processor_windows_are_inclusive() {
        let processor = EventGazeProcessor::new(&["amplitude", "peak_velocity", "disposition"]).unwrap();
        let result = processor.process(&events(), &gaze(), &["subject_id"]).unwrap();

        assert_eq!(
            result.schema(),
            &["subject_id", "amplitude", "peak_velocity", "disposition"].map(String::from)
        );
        // samples 101..=104 and 106..=107
        let amplitude = floats(&result, "amplitude");
        assert_relative_eq!(amplitude[0], 4.0);
        assert_relative_eq!(amplitude[1], 1.0);
        let peak = floats(&result, "peak_velocity");
        assert_relative_eq!(peak[0], 50.0);
        assert_relative_eq!(peak[1], 10.0);
        assert_eq!(floats(&result, "disposition"), vec![4.0, 1.0]);
        assert_eq!(result.events()[0].get("subject_id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_gaze_processor_groups_and_filters() {
        let other = EventFrame::new("saccade", &[101], &[104]).unwrap().with_column("subject_id", 2);
        let events = EventFrame::new("saccade", &[101, 101, 200, 102], &[104, 104, 210, 103])
            .unwrap()
            .with_column("subject_id", 1)
            .concat_diagonal(other);

        let processor = EventGazeProcessor::new(&["dispersion"]).unwrap();
        let result = processor.process(&events, &gaze(), &["subject_id"]).unwrap();

        // duplicate collapses, the window after the recording is empty, subject 2 does not match
        let intervals: Vec<(i64, i64)> = result.iter().map(|e| (e.onset(), e.offset())).collect();
        assert_eq!(intervals, vec![(101, 104), (102, 103)]);
    }

    #[test]
    fn test_gaze_processor_argument_errors() {
        let processor = EventGazeProcessor::new(&["amplitude"]).unwrap();
        assert!(matches!(
            processor.process(&events(), &gaze(), &[]),
            Err(GazeError::InvalidConfig(_))
        ));
        assert!(matches!(
            processor.process(&events(), &gaze(), &["session_id"]),
            Err(GazeError::MissingColumns { .. })
        ));

        let unlabelled = EventFrame::new("saccade", &[101], &[104]).unwrap();
        assert!(processor.process(&unlabelled, &gaze(), &["subject_id"]).is_err());

        assert!(matches!(
            EventGazeProcessor::new(&["amplitude"]).unwrap().with_position_columns(&["x_pos"]),
            Err(GazeError::InvalidColumns { argument: "position_columns", .. })
        ));
        assert!(matches!(
            EventGazeProcessor::new(&["foo"]),
            Err(GazeError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_gaze_processor_explicit_columns() {
        let processor = EventGazeProcessor::new(&["amplitude"])
            .unwrap()
            .with_position_columns(&["x_vel", "y_vel"])
            .unwrap();
        let result = processor.process(&events(), &gaze(), &["subject_id"]).unwrap();
        assert_relative_eq!(floats(&result, "amplitude")[0], 40.0);

        let processor = EventGazeProcessor::new(&["amplitude"])
            .unwrap()
            .with_eye(EyeSelection::Left);
        assert!(matches!(
            processor.process(&events(), &gaze(), &["subject_id"]),
            Err(GazeError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_gaze_processor_null_identifier_never_matches() {
        let gaze = gaze().with_identifier("session", Value::Null);
        let events = events().with_column("session", Value::Null);
        let processor = EventGazeProcessor::new(&["amplitude"]).unwrap();
        let result = processor.process(&events, &gaze, &["subject_id", "session"]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.schema().len(), 3);
    }

    #[test]
    fn test_gaze_processor_with_custom_registry() {
        struct Samples;
        impl EventProperty for Samples {
            fn name(&self) -> &str {
                "samples"
            }
            fn inputs(&self) -> PropertyInputs {
                PropertyInputs::VELOCITY
            }
            fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
                Ok(Value::Integer(window.velocity.map_or(0, |v| v.x.len() as i64)))
            }
        }

        let registry = PropertyRegistry::builtin().with_property(Samples);
        let processor = EventGazeProcessor::with_registry(&registry, &["samples"]).unwrap();
        let result = processor.process(&events(), &gaze(), &["subject_id"]).unwrap();
        assert_eq!(
            result.column("samples").unwrap(),
            vec![&Value::Integer(4), &Value::Integer(2)]
        );
    }

    #[test]
    fn test_gaze_processor_passes_only_declared_channels() {
        struct GivenChannels;
        impl EventProperty for GivenChannels {
            fn name(&self) -> &str {
                "given_channels"
            }
            fn inputs(&self) -> PropertyInputs {
                PropertyInputs::POSITION
            }
            fn compute(&self, window: &EventWindow<'_>) -> Result<Value> {
                let given = match (window.position.is_some(), window.velocity.is_some()) {
                    (true, false) => "position",
                    (true, true) => "position+velocity",
                    (false, true) => "velocity",
                    (false, false) => "none",
                };
                Ok(Value::from(given))
            }
        }

        let registry = PropertyRegistry::builtin().with_property(GivenChannels);
        let processor =
            EventGazeProcessor::with_registry(&registry, &["given_channels", "peak_velocity"]).unwrap();
        let result = processor.process(&events(), &gaze(), &["subject_id"]).unwrap();

        assert_eq!(
            result.column("given_channels").unwrap(),
            vec![&Value::from("position"), &Value::from("position")]
        );
        assert_relative_eq!(floats(&result, "peak_velocity")[0], 50.0);
    }
}
