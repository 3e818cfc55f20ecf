//! Event batches
//!
//! An [`EventFrame`] is an ordered list of [`Event`]s sharing one column
//! schema. Besides `name`, `onset` and `offset` every event carries a value
//! for each schema column (identifiers such as `subject_id`, computed
//! properties such as `amplitude`); cells without a value hold
//! [`Value::Null`].

use crate::types::{GazeError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A detected oculomotor event with inclusive onset and offset ticks
///
/// Fields are private so that `onset <= offset` holds for every event,
/// including deserialized ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    name: String,
    onset: i64,
    offset: i64,
    #[serde(flatten)]
    columns: BTreeMap<String, Value>,
}

impl Event {
    /// Create an event without additional columns
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidInterval`] if `onset > offset`.
    pub fn new(name: impl Into<String>, onset: i64, offset: i64) -> Result<Self> {
        if onset > offset {
            return Err(GazeError::InvalidInterval { onset, offset });
        }
        Ok(Self {
            name: name.into(),
            onset,
            offset,
            columns: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn onset(&self) -> i64 {
        self.onset
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Additional column values
    pub fn columns(&self) -> &BTreeMap<String, Value> {
        &self.columns
    }

    /// Value of a column, `None` if the column is unknown
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Set a column value, replacing any earlier one
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }
}

/// Unchecked serialized form of [`Event`]
#[derive(Deserialize)]
struct EventRecord {
    name: String,
    onset: i64,
    offset: i64,
    #[serde(flatten)]
    columns: BTreeMap<String, Value>,
}

impl TryFrom<EventRecord> for Event {
    type Error = GazeError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let mut event = Event::new(record.name, record.onset, record.offset)?;
        event.columns = record.columns;
        Ok(event)
    }
}

/// Ordered events of one recording with a shared column schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    schema: Vec<String>,
    events: Vec<Event>,
}

impl EventFrame {
    /// Create an empty frame
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an empty frame with a fixed column schema
    pub fn with_schema<I, S>(schema: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frame = Self::default();
        for column in schema {
            frame.add_to_schema(column.into());
        }
        frame
    }

    /// Create a frame of equally named events from onset and offset ticks
    ///
    /// # Errors
    /// * [`GazeError::LengthMismatch`] if `onsets` and `offsets` differ in length
    /// * [`GazeError::InvalidInterval`] if any onset is after its offset
    pub fn new(name: &str, onsets: &[i64], offsets: &[i64]) -> Result<Self> {
        if onsets.len() != offsets.len() {
            return Err(GazeError::length_mismatch("onsets", onsets.len(), "offsets", offsets.len()));
        }

        let events = onsets
            .iter()
            .zip(offsets)
            .map(|(&onset, &offset)| Event::new(name, onset, offset))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema: Vec::new(),
            events,
        })
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the frame holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Additional column names, in insertion order
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Whether a column is part of the schema (`name`, `onset`, `offset` always are)
    pub fn has_column(&self, column: &str) -> bool {
        matches!(column, "name" | "onset" | "offset") || self.schema.iter().any(|c| c == column)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Append an event, filling columns it lacks with `Null`
    ///
    /// Columns the event has but the schema lacks are added to the schema.
    pub fn push(&mut self, mut event: Event) {
        for column in event.columns.keys() {
            if !self.schema.contains(column) {
                self.schema.push(column.clone());
                for existing in &mut self.events {
                    existing.columns.insert(column.clone(), Value::Null);
                }
            }
        }
        for column in &self.schema {
            event.columns.entry(column.clone()).or_insert(Value::Null);
        }
        self.events.push(event);
    }

    /// Set a column to the same value for every event
    pub fn with_column(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        for event in &mut self.events {
            event.columns.insert(column.clone(), value.clone());
        }
        self.add_to_schema(column);
        self
    }

    /// Set a column from one value per event
    ///
    /// # Errors
    /// Returns [`GazeError::LengthMismatch`] if `values` has a different
    /// length than the frame.
    pub fn set_column(&mut self, column: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let column = column.into();
        if values.len() != self.events.len() {
            return Err(GazeError::length_mismatch("events", self.events.len(), column, values.len()));
        }
        for (event, value) in self.events.iter_mut().zip(values) {
            event.columns.insert(column.clone(), value);
        }
        self.add_to_schema(column);
        Ok(())
    }

    /// Values of a column, one per event
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        if !self.schema.iter().any(|c| c == column) {
            return None;
        }
        Some(self.events.iter().filter_map(|event| event.columns.get(column)).collect())
    }

    /// Concatenate two frames by column-set union
    ///
    /// The schema of the result is the schema of `self` followed by the
    /// columns only `other` has. Cells missing on either side become `Null`.
    pub fn concat_diagonal(mut self, other: EventFrame) -> EventFrame {
        for column in other.schema {
            self.add_to_schema(column);
        }
        self.events.extend(other.events);
        for event in &mut self.events {
            for column in &self.schema {
                event.columns.entry(column.clone()).or_insert(Value::Null);
            }
        }
        self
    }

    /// Copy columns from another frame, matching events on `name`, `onset` and `offset`
    ///
    /// Events without a match in `other` get `Null` for the copied columns.
    pub fn join_columns(&mut self, other: &EventFrame, columns: &[String]) {
        let rows: HashMap<(&str, i64, i64), &Event> = other
            .events
            .iter()
            .map(|event| ((event.name.as_str(), event.onset, event.offset), event))
            .collect();

        for event in &mut self.events {
            let matched = rows.get(&(event.name.as_str(), event.onset, event.offset));
            for column in columns {
                let value = matched
                    .and_then(|row| row.columns.get(column))
                    .cloned()
                    .unwrap_or(Value::Null);
                event.columns.insert(column.clone(), value);
            }
        }
        for column in columns {
            self.add_to_schema(column.clone());
        }
    }

    fn add_to_schema(&mut self, column: String) {
        if !self.schema.contains(&column) {
            self.schema.push(column);
        }
    }
}

impl IntoIterator for EventFrame {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
