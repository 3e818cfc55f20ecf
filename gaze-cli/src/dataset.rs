//! Dataset of recordings processed in parallel
//!
//! Every recording is loaded from a JSON file of the form
//!
//! ```json
//! {
//!     "identifiers": {"subject_id": 1, "session": "a"},
//!     "time": [0, 1, 2],
//!     "columns": {"x_pix": [640.0, null, 641.5], "y_pix": [512.0, null, 512.5]}
//! }
//! ```
//!
//! where `null` marks a missing sample. A recording without identifiers is
//! identified by its file stem under the `recording` identifier.

use anyhow::{Context, Result};
use gaze_pipeline::{
    microsaccades, ChannelKind, EventFrame, EventGazeProcessor, Experiment, EyeSelection, GazeFrame,
    MicrosaccadeParams, Value, VelocityMethod,
};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized form of one recording
#[derive(Debug, Deserialize)]
struct RecordingFile {
    #[serde(default)]
    identifiers: BTreeMap<String, Value>,
    time: Vec<i64>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// Gaze samples and detected events of one recording
#[derive(Debug, Clone)]
pub struct Recording {
    pub path: PathBuf,
    pub gaze: GazeFrame,
    pub events: EventFrame,
}

impl Recording {
    /// Load a recording from a JSON file
    pub fn load(path: &Path, experiment: Experiment) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording: {:?}", path))?;
        let file: RecordingFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse recording: {:?}", path))?;

        let columns = file
            .columns
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
            .collect();

        let mut gaze = GazeFrame::new(file.time, columns)
            .with_context(|| format!("Invalid recording: {:?}", path))?
            .with_experiment(experiment);

        if file.identifiers.is_empty() {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            gaze = gaze.with_identifier("recording", stem);
        }
        for (name, value) in file.identifiers {
            gaze = gaze.with_identifier(name, value);
        }

        log::debug!("loaded {:?}: {} samples, {:?}", path, gaze.len(), gaze.eye());
        Ok(Self {
            path: path.to_path_buf(),
            gaze,
            events: EventFrame::empty(),
        })
    }

    fn identifier_names(&self) -> Vec<&str> {
        self.gaze.identifiers().keys().map(String::as_str).collect()
    }

    fn detect_events(&self, params: &MicrosaccadeParams, eye: EyeSelection) -> Result<EventFrame> {
        let positions = self.gaze.eye_columns(eye, ChannelKind::Position)?;
        let velocities = self.gaze.eye_columns(eye, ChannelKind::Velocity)?;

        let mut events = microsaccades(
            self.gaze.select(&positions.to_vec())?.view(),
            self.gaze.select(&velocities.to_vec())?.view(),
            Some(self.gaze.time()),
            params,
        )?;
        for (name, value) in self.gaze.identifiers() {
            events = events.with_column(name.clone(), value.clone());
        }
        Ok(events)
    }
}

/// All recordings of one experiment
#[derive(Debug, Clone)]
pub struct Dataset {
    recordings: Vec<Recording>,
}

impl Dataset {
    /// Load recordings in parallel
    pub fn load(paths: &[PathBuf], experiment: Experiment) -> Result<Self> {
        log::info!("Loading {} recordings", paths.len());
        let recordings = paths
            .par_iter()
            .map(|path| Recording::load(path, experiment))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { recordings })
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Convert pixel channels to degrees of visual angle
    ///
    /// Recordings without pixel channels are left untouched.
    pub fn pix2deg(&mut self) -> Result<&mut Self> {
        self.for_each_recording("pix2deg", |recording| {
            if recording.gaze.columns_of(ChannelKind::Pixel).is_empty() {
                log::warn!("{:?} has no pixel columns, skipping pix2deg", recording.path);
                return Ok(());
            }
            Ok(recording.gaze.pix2deg()?)
        })?;
        Ok(self)
    }

    /// Differentiate position channels into velocity channels
    pub fn pos2vel(&mut self, method: &VelocityMethod) -> Result<&mut Self> {
        self.for_each_recording("pos2vel", |recording| Ok(recording.gaze.pos2vel(method)?))?;
        Ok(self)
    }

    /// Detect microsaccades in every recording
    ///
    /// Events are tagged with the identifiers of their recording. With
    /// `clear` unset, they are merged into the events of earlier runs.
    pub fn detect_events(
        &mut self,
        params: &MicrosaccadeParams,
        eye: EyeSelection,
        clear: bool,
    ) -> Result<&mut Self> {
        self.for_each_recording("detect_events", |recording| {
            let events = recording.detect_events(params, eye)?;
            recording.events = if clear {
                events
            } else {
                std::mem::take(&mut recording.events).concat_diagonal(events)
            };
            Ok(())
        })?;

        let total: usize = self.recordings.iter().map(|r| r.events.len()).sum();
        log::info!("Detected {} events in {} recordings", total, self.recordings.len());
        Ok(self)
    }

    /// Add property columns to the events of every recording
    pub fn compute_event_properties(&mut self, properties: &[String], eye: EyeSelection) -> Result<&mut Self> {
        let processor = EventGazeProcessor::new(properties)?.with_eye(eye);

        self.for_each_recording("compute_event_properties", |recording| {
            let identifiers = recording.identifier_names();
            let computed = processor.process(&recording.events, &recording.gaze, &identifiers)?;
            let mut events = std::mem::take(&mut recording.events);
            events.join_columns(&computed, properties);
            recording.events = events;
            Ok(())
        })?;
        Ok(self)
    }

    /// Drop all detected events
    pub fn clear_events(&mut self) -> &mut Self {
        for recording in &mut self.recordings {
            recording.events = EventFrame::empty();
        }
        self
    }

    fn for_each_recording<F>(&mut self, stage: &str, f: F) -> Result<()>
    where
        F: Fn(&mut Recording) -> Result<()> + Sync + Send,
    {
        log::info!("{}: {} recordings", stage, self.recordings.len());
        self.recordings.par_iter_mut().try_for_each(|recording| {
            f(recording).with_context(|| format!("{} failed for {:?}", stage, recording.path))
        })
    }
}
