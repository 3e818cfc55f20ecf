//! Screen geometry and the pixel ↔ degrees-of-visual-angle transform
//!
//! Pixel coordinates are converted with
//! `atan2(coord - center, distance_px) * 180 / π`, where
//! `distance_px = distance_cm * screen_px / screen_cm` and `center` depends on
//! the pixel origin convention of the eye tracker.

use crate::types::{GazeError, Result};
use ndarray::{Array, ArrayView, Dimension};
use std::fmt;
use std::str::FromStr;

/// Origin convention of pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Origin {
    /// (0, 0) is the lower left screen corner
    #[default]
    LowerLeft,
    /// (0, 0) is the screen center
    Center,
}

impl Origin {
    /// Accepted spellings, used in error messages
    pub const VALID: &'static [&'static str] = &["lower left", "center"];
}

impl FromStr for Origin {
    type Err = GazeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lower left" | "lower-left" => Ok(Origin::LowerLeft),
            "center" => Ok(Origin::Center),
            other => Err(GazeError::unknown_option("origin", other, Self::VALID)),
        }
    }
}

impl TryFrom<String> for Origin {
    type Error = GazeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::LowerLeft => write!(f, "lower left"),
            Origin::Center => write!(f, "center"),
        }
    }
}

/// Physical screen setup of an experiment
///
/// All dimensions are validated to be non-zero on construction, so the
/// transforms below never divide by zero. Fields are only reachable through
/// [`Screen::new`] and the getters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    width_px: f64,
    height_px: f64,
    width_cm: f64,
    height_cm: f64,
    distance_cm: f64,
    origin: Origin,
}

impl Screen {
    /// Create a new screen definition
    ///
    /// # Errors
    /// Returns [`GazeError::ZeroValue`] if any dimension or the viewing
    /// distance is zero.
    pub fn new(
        width_px: f64,
        height_px: f64,
        width_cm: f64,
        height_cm: f64,
        distance_cm: f64,
        origin: Origin,
    ) -> Result<Self> {
        check_no_zeros(&[width_px, height_px], "screen_px")?;
        check_no_zeros(&[width_cm, height_cm], "screen_cm")?;
        check_no_zero(distance_cm, "distance_cm")?;

        Ok(Self {
            width_px,
            height_px,
            width_cm,
            height_cm,
            distance_cm,
            origin,
        })
    }

    /// Screen size in pixels as `[width, height]`
    pub fn size_px(&self) -> [f64; 2] {
        [self.width_px, self.height_px]
    }

    /// Screen size in centimeters as `[width, height]`
    pub fn size_cm(&self) -> [f64; 2] {
        [self.width_cm, self.height_cm]
    }

    /// Eye-to-screen distance in centimeters
    pub fn distance_cm(&self) -> f64 {
        self.distance_cm
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Convert pixel coordinates on this screen to degrees of visual angle
    ///
    /// The trailing dimension of `arr` must be 2 (x, y) or 4 (binocular
    /// x_left, y_left, x_right, y_right).
    pub fn pix2deg<D: Dimension>(&self, arr: ArrayView<'_, f64, D>) -> Result<Array<f64, D>> {
        pix2deg(arr, &self.size_px(), &self.size_cm(), self.distance_cm, self.origin)
    }

    /// Convert degrees of visual angle back to pixel coordinates on this screen
    pub fn deg2pix<D: Dimension>(&self, arr: ArrayView<'_, f64, D>) -> Result<Array<f64, D>> {
        deg2pix(arr, &self.size_px(), &self.size_cm(), self.distance_cm, self.origin)
    }
}

/// Convert pixel screen coordinates to degrees of visual angle
///
/// # Arguments
/// * `arr` - Pixel coordinates: a scalar, a 1-D sequence of scalars, a single
///   2- or 4-vector, or an `(N, 1)`, `(N, 2)` or `(N, 4)` batch
/// * `screen_px` - Screen size in pixels, one component or `[width, height]`
/// * `screen_cm` - Screen size in centimeters, same length as `screen_px`
/// * `distance_cm` - Eye-to-screen distance in centimeters
/// * `origin` - Pixel origin convention
///
/// # Returns
/// * Array of the same shape holding degrees of visual angle
///
/// # Example
/// ```
/// use gaze_pipeline::gaze::screen::{pix2deg, Origin};
/// use ndarray::arr1;
///
/// let deg = pix2deg(arr1(&[0.0, 0.0]).view(), &[100.0, 100.0], &[100.0, 100.0], 100.0, Origin::Center).unwrap();
/// assert_eq!(deg[0], 0.0);
/// ```
pub fn pix2deg<D: Dimension>(
    arr: ArrayView<'_, f64, D>,
    screen_px: &[f64],
    screen_cm: &[f64],
    distance_cm: f64,
    origin: Origin,
) -> Result<Array<f64, D>> {
    let geometry = Geometry::resolve(arr.shape(), screen_px, screen_cm, distance_cm, origin)?;

    let mut out = arr.to_owned();
    let width = geometry.distance_px.len();
    for (i, value) in out.iter_mut().enumerate() {
        let k = i % width;
        let centered = *value - geometry.center[k];
        *value = centered.atan2(geometry.distance_px[k]).to_degrees();
    }
    Ok(out)
}

/// Convert degrees of visual angle to pixel screen coordinates
///
/// Inverse of [`pix2deg`] with identical shape rules.
pub fn deg2pix<D: Dimension>(
    arr: ArrayView<'_, f64, D>,
    screen_px: &[f64],
    screen_cm: &[f64],
    distance_cm: f64,
    origin: Origin,
) -> Result<Array<f64, D>> {
    let geometry = Geometry::resolve(arr.shape(), screen_px, screen_cm, distance_cm, origin)?;

    let mut out = arr.to_owned();
    let width = geometry.distance_px.len();
    for (i, value) in out.iter_mut().enumerate() {
        let k = i % width;
        *value = value.to_radians().tan() * geometry.distance_px[k] + geometry.center[k];
    }
    Ok(out)
}

/// Per-component distance and origin shift, broadcast to the trailing
/// dimension of the coordinate array
struct Geometry {
    distance_px: Vec<f64>,
    center: Vec<f64>,
}

impl Geometry {
    fn resolve(
        shape: &[usize],
        screen_px: &[f64],
        screen_cm: &[f64],
        distance_cm: f64,
        origin: Origin,
    ) -> Result<Self> {
        check_no_zeros(screen_px, "screen_px")?;
        check_no_zeros(screen_cm, "screen_cm")?;
        check_no_zero(distance_cm, "distance_cm")?;

        if screen_px.len() != screen_cm.len() || !(1..=2).contains(&screen_px.len()) {
            return Err(GazeError::InvalidShape {
                name: "screen",
                message: format!(
                    "screen_px ({}) and screen_cm ({}) must both have 1 or 2 components",
                    screen_px.len(),
                    screen_cm.len()
                ),
            });
        }

        let scalar_screen = screen_px.len() == 1;
        let tile = match shape {
            [] if scalar_screen => 1,
            [] => return Err(shape_error(shape, "scalar coordinate needs scalar screen dimensions")),
            [_] if scalar_screen => 1,
            [2] => 1,
            [4] => 2,
            [n] => {
                return Err(shape_error(
                    shape,
                    &format!("vector of length {} needs scalar screen dimensions", n),
                ))
            }
            [_, 1] if scalar_screen => 1,
            [_, 1] => return Err(shape_error(shape, "trailing dimension 1 needs scalar screen dimensions")),
            [_, 2] | [_, 4] if scalar_screen => {
                return Err(shape_error(shape, "trailing dimension 2 or 4 needs 2-component screen dimensions"))
            }
            [_, 2] => 1,
            [_, 4] => 2,
            [_, _] => return Err(shape_error(shape, "last coord dimension must have length 1, 2 or 4")),
            _ => return Err(shape_error(shape, "number of dimensions must be either 0, 1 or 2")),
        };

        // Binocular data carries two stacked (x, y) pairs per row
        let px: Vec<f64> = screen_px.iter().copied().cycle().take(screen_px.len() * tile).collect();
        let cm: Vec<f64> = screen_cm.iter().copied().cycle().take(screen_cm.len() * tile).collect();

        let distance_px = px.iter().zip(&cm).map(|(p, c)| distance_cm * (p / c)).collect();
        let center = match origin {
            Origin::LowerLeft => px.iter().map(|p| (p - 1.0) / 2.0).collect(),
            Origin::Center => vec![0.0; px.len()],
        };

        Ok(Self { distance_px, center })
    }
}

fn shape_error(shape: &[usize], message: &str) -> GazeError {
    GazeError::InvalidShape {
        name: "arr",
        message: format!("{} (arr.shape: {:?})", message, shape),
    }
}

/// Fail if a scalar argument is zero
pub(crate) fn check_no_zero(value: f64, name: &str) -> Result<()> {
    if value == 0.0 {
        return Err(GazeError::ZeroValue { name: name.to_string() });
    }
    Ok(())
}

/// Fail if any component of a vector argument is zero
pub(crate) fn check_no_zeros(values: &[f64], name: &str) -> Result<()> {
    if values.iter().any(|v| *v == 0.0) {
        return Err(GazeError::ZeroValue {
            name: format!("each component in {}", name),
        });
    }
    Ok(())
}
