//! Per-recording gaze sample batch
//!
//! A [`GazeFrame`] holds the time-ordered samples of one recording: a `time`
//! column of integer ticks and named `f64` channels following the convention
//! `{x,y}[_left|_right]_{pix,pos,vel}`. Missing samples are NaN.
//!
//! Which eye(s) the recording contains is resolved once, when the frame is
//! constructed, into an [`EyeChannels`] descriptor. Transform stages append
//! columns (`_pix` → `_pos` → `_vel`) and never change the descriptor.

use crate::gaze::experiment::Experiment;
use crate::gaze::transforms::VelocityMethod;
use crate::types::{GazeError, Result, Value};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a gaze channel, encoded as the column name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Screen coordinates in pixels (`_pix`)
    Pixel,
    /// Degrees of visual angle (`_pos`)
    Position,
    /// Degrees of visual angle per second (`_vel`)
    Velocity,
}

impl ChannelKind {
    fn suffix(&self) -> &'static str {
        match self {
            ChannelKind::Pixel => "pix",
            ChannelKind::Position => "pos",
            ChannelKind::Velocity => "vel",
        }
    }

    const ALL: [ChannelKind; 3] = [ChannelKind::Pixel, ChannelKind::Position, ChannelKind::Velocity];
}

/// Eye channels present in a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeChannels {
    /// Unlabelled single eye (`x_pos`, `y_pos`)
    Monocular,
    /// Left eye only
    Left,
    /// Right eye only
    Right,
    /// Both eyes
    Binocular,
}

impl EyeChannels {
    /// Column name infixes of the eyes, in column order
    fn infixes(&self) -> &'static [&'static str] {
        match self {
            EyeChannels::Monocular => &[""],
            EyeChannels::Left => &["_left"],
            EyeChannels::Right => &["_right"],
            EyeChannels::Binocular => &["_left", "_right"],
        }
    }

    /// Infer the eye channels from a set of column names
    ///
    /// Channel kinds are inspected in pipeline order (pixel, position,
    /// velocity) and the first kind holding any `x`/`y` pair decides, so
    /// channels of a later kind never override the raw input. Returns `None`
    /// if no pair of any kind is present.
    pub fn resolve<'a, I>(columns: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        ChannelKind::ALL
            .iter()
            .find_map(|kind| Self::resolve_kind(columns.clone(), *kind))
    }

    fn resolve_kind<'a, I>(columns: I, kind: ChannelKind) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let has_pair = |infix: &str| {
            let [x, y] = pair_names(infix, kind);
            let mut found = (false, false);
            for column in columns.clone() {
                found.0 |= column == x;
                found.1 |= column == y;
            }
            found.0 && found.1
        };

        match (has_pair("_left"), has_pair("_right"), has_pair("")) {
            (true, true, _) => Some(EyeChannels::Binocular),
            (true, false, _) => Some(EyeChannels::Left),
            (false, true, _) => Some(EyeChannels::Right),
            (false, false, true) => Some(EyeChannels::Monocular),
            (false, false, false) => None,
        }
    }
}

/// Eye used by event detection and property computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeSelection {
    /// Right eye if present, else left eye, else the monocular channels
    #[default]
    Auto,
    Left,
    Right,
    Monocular,
}

fn pair_names(infix: &str, kind: ChannelKind) -> [String; 2] {
    [
        format!("x{}_{}", infix, kind.suffix()),
        format!("y{}_{}", infix, kind.suffix()),
    ]
}

/// All column names recognized as gaze channels of a kind
fn valid_columns(kind: ChannelKind) -> Vec<String> {
    ["", "_left", "_right"]
        .iter()
        .flat_map(|infix| pair_names(infix, kind))
        .collect()
}

/// A pair of column names holding the horizontal and vertical component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub x: String,
    pub y: String,
}

impl ColumnPair {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self { x: x.into(), y: y.into() }
    }

    /// Build a pair from a sequence of names
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidColumns`] naming `argument` and the bad
    /// value unless exactly two names are given.
    pub fn from_slice<S: AsRef<str> + std::fmt::Debug>(argument: &'static str, names: &[S]) -> Result<Self> {
        match names {
            [x, y] => Ok(Self::new(x.as_ref(), y.as_ref())),
            _ => Err(GazeError::InvalidColumns {
                argument,
                value: format!("{:?} (length {})", names, names.len()),
            }),
        }
    }

    /// Both names as owned strings
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.x.clone(), self.y.clone()]
    }
}

/// Time-ordered gaze samples of one recording
#[derive(Debug, Clone)]
pub struct GazeFrame {
    time: Vec<i64>,
    columns: BTreeMap<String, Vec<f64>>,
    identifiers: BTreeMap<String, Value>,
    eye: EyeChannels,
    experiment: Option<Experiment>,
}

impl GazeFrame {
    /// Create a frame from a time column and named sample channels
    ///
    /// # Errors
    /// * [`GazeError::LengthMismatch`] if a channel's length differs from `time`
    /// * [`GazeError::InvalidShape`] if `time` decreases
    /// * [`GazeError::MissingColumns`] if no gaze channel pair is present
    pub fn new(time: Vec<i64>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        for (name, values) in &columns {
            if values.len() != time.len() {
                return Err(GazeError::length_mismatch("time", time.len(), name, values.len()));
            }
        }

        if let Some(index) = time.windows(2).position(|w| w[1] < w[0]) {
            return Err(GazeError::InvalidShape {
                name: "time",
                message: format!("time must be non-decreasing (decreases after index {})", index),
            });
        }

        let eye = EyeChannels::resolve(columns.keys().map(String::as_str)).ok_or_else(|| {
            GazeError::MissingColumns {
                required: ChannelKind::ALL.iter().flat_map(|kind| valid_columns(*kind)).collect(),
                available: columns.keys().cloned().collect(),
            }
        })?;

        log::trace!("gaze frame with {} samples, eye channels {:?}", time.len(), eye);

        Ok(Self {
            time,
            columns,
            identifiers: BTreeMap::new(),
            eye,
            experiment: None,
        })
    }

    /// Builder method: attach the experiment the recording belongs to
    pub fn with_experiment(mut self, experiment: Experiment) -> Self {
        self.experiment = Some(experiment);
        self
    }

    /// Builder method: add a recording-level identifier (e.g. `subject_id`)
    pub fn with_identifier(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.identifiers.insert(name.into(), value.into());
        self
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the frame holds no samples
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[i64] {
        &self.time
    }

    pub fn eye(&self) -> EyeChannels {
        self.eye
    }

    pub fn experiment(&self) -> Option<&Experiment> {
        self.experiment.as_ref()
    }

    pub fn identifiers(&self) -> &BTreeMap<String, Value> {
        &self.identifiers
    }

    pub fn identifier(&self, name: &str) -> Option<&Value> {
        self.identifiers.get(name)
    }

    /// Samples of a channel
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// All column names including `time`
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once("time".to_string())
            .chain(self.columns.keys().cloned())
            .collect()
    }

    /// Add or overwrite a channel
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.time.len() {
            return Err(GazeError::length_mismatch("time", self.time.len(), name, values.len()));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Present channels of a kind, ordered x/y per eye, left before right
    pub fn columns_of(&self, kind: ChannelKind) -> Vec<String> {
        self.eye
            .infixes()
            .iter()
            .flat_map(|infix| pair_names(infix, kind))
            .filter(|name| self.columns.contains_key(name))
            .collect()
    }

    /// Channel pair of a kind for the selected eye
    ///
    /// # Errors
    /// Returns [`GazeError::MissingColumns`] listing required and available
    /// columns if the selected eye lacks the channel pair.
    pub fn eye_columns(&self, selection: EyeSelection, kind: ChannelKind) -> Result<ColumnPair> {
        let infix = match selection {
            EyeSelection::Auto => match self.eye {
                EyeChannels::Binocular | EyeChannels::Right => "_right",
                EyeChannels::Left => "_left",
                EyeChannels::Monocular => "",
            },
            EyeSelection::Left => "_left",
            EyeSelection::Right => "_right",
            EyeSelection::Monocular => "",
        };

        let [x, y] = pair_names(infix, kind);
        if !self.columns.contains_key(&x) || !self.columns.contains_key(&y) {
            return Err(GazeError::MissingColumns {
                required: vec![x, y],
                available: self.column_names(),
            });
        }
        Ok(ColumnPair::new(x, y))
    }

    /// Stack channels into an `(N, names.len())` array
    pub fn select(&self, names: &[String]) -> Result<Array2<f64>> {
        let mut channels = Vec::with_capacity(names.len());
        for name in names {
            let values = self.columns.get(name).ok_or_else(|| GazeError::MissingColumns {
                required: names.to_vec(),
                available: self.column_names(),
            })?;
            channels.push(values);
        }

        Ok(Array2::from_shape_fn((self.len(), names.len()), |(row, col)| channels[col][row]))
    }

    /// Convert all pixel channels to degrees of visual angle
    ///
    /// Adds (or overwrites) a `_pos` column for every `_pix` column.
    pub fn pix2deg(&mut self) -> Result<()> {
        let experiment = self.experiment.ok_or(GazeError::MissingExperiment("pix2deg"))?;

        let pixel_columns = self.columns_of(ChannelKind::Pixel);
        if pixel_columns.is_empty() {
            return Err(GazeError::MissingColumns {
                required: valid_columns(ChannelKind::Pixel),
                available: self.column_names(),
            });
        }

        let pixels = self.select(&pixel_columns)?;
        let degrees = experiment.pix2deg(pixels.view())?;

        for (index, name) in pixel_columns.iter().enumerate() {
            let target = name.replace("_pix", "_pos");
            self.set_column(target, degrees.column(index).to_vec())?;
        }

        log::debug!("pix2deg: converted {:?}", pixel_columns);
        Ok(())
    }

    /// Differentiate all position channels into velocity channels
    ///
    /// Adds (or overwrites) a `_vel` column for every `_pos` column.
    pub fn pos2vel(&mut self, method: &VelocityMethod) -> Result<()> {
        let experiment = self.experiment.ok_or(GazeError::MissingExperiment("pos2vel"))?;

        let position_columns = self.columns_of(ChannelKind::Position);
        if position_columns.is_empty() {
            return Err(GazeError::MissingColumns {
                required: valid_columns(ChannelKind::Position),
                available: self.column_names(),
            });
        }

        let positions = self.select(&position_columns)?;
        let velocities = experiment.pos2vel(positions.view(), method)?;

        for (index, name) in position_columns.iter().enumerate() {
            let target = name.replace("_pos", "_vel");
            self.set_column(target, velocities.column(index).to_vec())?;
        }

        log::debug!("pos2vel: differentiated {:?} with {}", position_columns, method.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::screen::{Origin, Screen};

    fn columns(names: &[&str], n: usize) -> BTreeMap<String, Vec<f64>> {
        names
            .iter()
            .map(|name| (name.to_string(), (0..n).map(|i| i as f64).collect()))
            .collect()
    }

    fn experiment() -> Experiment {
        let screen = Screen::new(1280.0, 1024.0, 38.0, 30.0, 68.0, Origin::Center).unwrap();
        Experiment::new(screen, 1000.0).unwrap()
    }

    #[test]
    fn test_eye_resolution() {
        let resolve = |names: &[&str]| EyeChannels::resolve(names.iter().copied());
        assert_eq!(resolve(&["x_pix", "y_pix"]), Some(EyeChannels::Monocular));
        assert_eq!(resolve(&["x_left_pos", "y_left_pos"]), Some(EyeChannels::Left));
        assert_eq!(resolve(&["x_right_vel", "y_right_vel"]), Some(EyeChannels::Right));
        assert_eq!(
            resolve(&["x_left_pix", "y_left_pix", "x_right_pix", "y_right_pix"]),
            Some(EyeChannels::Binocular)
        );
        assert_eq!(resolve(&["x_left_pix"]), None);
        assert_eq!(resolve(&["pupil"]), None);

        // the earliest channel kind decides
        assert_eq!(
            resolve(&["x_pix", "y_pix", "x_left_pos", "y_left_pos"]),
            Some(EyeChannels::Monocular)
        );
        assert_eq!(
            resolve(&["x_left_pos", "y_left_pos", "x_right_vel", "y_right_vel"]),
            Some(EyeChannels::Left)
        );
    }

    #[test]
    fn test_pix2deg_with_labelled_position_channels() {
        let names = ["x_pix", "y_pix", "x_left_pos", "y_left_pos"];
        let mut frame = GazeFrame::new((0..4).collect(), columns(&names, 4))
            .unwrap()
            .with_experiment(experiment());
        assert_eq!(frame.eye(), EyeChannels::Monocular);

        frame.pix2deg().unwrap();
        assert!(frame.column("x_pos").is_some());
        assert_eq!(frame.columns_of(ChannelKind::Position), vec!["x_pos".to_string(), "y_pos".to_string()]);
    }

    #[test]
    fn test_frame_validation() {
        assert!(GazeFrame::new(vec![0, 1, 2], columns(&["x_pix", "y_pix"], 3)).is_ok());
        assert!(matches!(
            GazeFrame::new(vec![0, 1], columns(&["x_pix", "y_pix"], 3)),
            Err(GazeError::LengthMismatch { .. })
        ));
        assert!(matches!(
            GazeFrame::new(vec![0, 2, 1], columns(&["x_pix", "y_pix"], 3)),
            Err(GazeError::InvalidShape { name: "time", .. })
        ));
        assert!(matches!(
            GazeFrame::new(vec![0, 1, 2], columns(&["pupil"], 3)),
            Err(GazeError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_column_pair_from_slice() {
        assert_eq!(
            ColumnPair::from_slice("position_columns", &["x_pos", "y_pos"]).unwrap(),
            ColumnPair::new("x_pos", "y_pos")
        );
        let err = ColumnPair::from_slice("velocity_columns", &["x_vel"]).unwrap_err();
        assert!(matches!(err, GazeError::InvalidColumns { argument: "velocity_columns", .. }));
        assert!(err.to_string().contains("x_vel"));
        assert!(ColumnPair::from_slice("position_columns", &["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_eye_columns_auto_prefers_right() {
        let names = ["x_left_pos", "y_left_pos", "x_right_pos", "y_right_pos"];
        let frame = GazeFrame::new(vec![0, 1], columns(&names, 2)).unwrap();
        let pair = frame.eye_columns(EyeSelection::Auto, ChannelKind::Position).unwrap();
        assert_eq!(pair, ColumnPair::new("x_right_pos", "y_right_pos"));

        let pair = frame.eye_columns(EyeSelection::Left, ChannelKind::Position).unwrap();
        assert_eq!(pair, ColumnPair::new("x_left_pos", "y_left_pos"));

        let err = frame.eye_columns(EyeSelection::Auto, ChannelKind::Velocity).unwrap_err();
        match err {
            GazeError::MissingColumns { required, available } => {
                assert_eq!(required, vec!["x_right_vel".to_string(), "y_right_vel".to_string()]);
                assert!(available.contains(&"time".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pix2deg_and_pos2vel_append_columns() {
        let mut frame = GazeFrame::new((0..10).collect(), columns(&["x_pix", "y_pix"], 10))
            .unwrap()
            .with_experiment(experiment());

        frame.pix2deg().unwrap();
        assert!(frame.column("x_pos").is_some());
        assert!(frame.column("y_pos").is_some());
        assert_eq!(frame.column("x_pos").unwrap()[0], 0.0);

        frame.pos2vel(&VelocityMethod::Smooth).unwrap();
        assert_eq!(frame.column("x_vel").unwrap().len(), 10);
        assert_eq!(frame.eye(), EyeChannels::Monocular);
    }

    #[test]
    fn test_binocular_pix2deg() {
        let names = ["x_left_pix", "y_left_pix", "x_right_pix", "y_right_pix"];
        let mut frame = GazeFrame::new((0..4).collect(), columns(&names, 4))
            .unwrap()
            .with_experiment(experiment());
        frame.pix2deg().unwrap();
        assert_eq!(frame.columns_of(ChannelKind::Position).len(), 4);
        assert_eq!(frame.column("x_left_pos"), frame.column("x_right_pos"));
    }

    #[test]
    fn test_transforms_need_experiment_and_columns() {
        let mut frame = GazeFrame::new(vec![0, 1, 2], columns(&["x_pix", "y_pix"], 3)).unwrap();
        assert!(matches!(frame.pix2deg(), Err(GazeError::MissingExperiment(_))));

        let mut frame = frame.with_experiment(experiment());
        assert!(matches!(
            frame.pos2vel(&VelocityMethod::Preceding),
            Err(GazeError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_set_column_overwrites() {
        let mut frame = GazeFrame::new(vec![0, 1], columns(&["x_pos", "y_pos"], 2)).unwrap();
        frame.set_column("x_pos", vec![5.0, 6.0]).unwrap();
        assert_eq!(frame.column("x_pos"), Some(&[5.0, 6.0][..]));
        assert!(frame.set_column("x_pos", vec![1.0]).is_err());
    }
}
