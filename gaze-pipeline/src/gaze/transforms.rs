//! Sample-level transforms: velocity estimation, windowing and index run
//! grouping
//!
//! Positions are differentiated along the sample axis (axis 0) independently
//! per channel. All methods return an array of the same shape as their input
//! with samples outside the method's support left at zero.

use crate::gaze::savgol::{SavitzkyGolay, SavitzkyGolayConfig};
use crate::types::{GazeError, Result};
use ndarray::{s, Array, Array1, Array3, ArrayView, ArrayView2, ArrayView3, Axis, Dimension};
use std::ops::Range;

/// Numerical differentiation scheme for [`pos2vel`]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VelocityMethod {
    /// 5-point moving difference with narrower windows at the borders
    #[default]
    Smooth,
    /// Central difference of the two neighbouring samples
    Neighbors,
    /// Backward difference to the preceding sample
    Preceding,
    /// First derivative of a local polynomial fit
    SavitzkyGolay(SavitzkyGolayConfig),
}

impl VelocityMethod {
    /// Names accepted by [`VelocityMethod::from_name`]
    pub const VALID: &'static [&'static str] = &["smooth", "neighbors", "preceding", "savitzky_golay"];

    /// Resolve a method by name
    ///
    /// Only `savitzky_golay` takes extra configuration, and requires it. Any
    /// other method given extra configuration is rejected.
    pub fn from_name(name: &str, options: Option<SavitzkyGolayConfig>) -> Result<Self> {
        let method = match name {
            "smooth" => VelocityMethod::Smooth,
            "neighbors" => VelocityMethod::Neighbors,
            "preceding" => VelocityMethod::Preceding,
            "savitzky_golay" => {
                let config = options.ok_or_else(|| {
                    GazeError::InvalidConfig(
                        "method \"savitzky_golay\" requires window_length and polyorder".to_string(),
                    )
                })?;
                return Ok(VelocityMethod::SavitzkyGolay(config));
            }
            other => return Err(GazeError::unknown_option("velocity method", other, Self::VALID)),
        };

        if options.is_some() {
            return Err(GazeError::InvalidConfig(format!(
                "selected method \"{}\" doesn't support any additional configuration",
                name
            )));
        }
        Ok(method)
    }

    /// Name of the method
    pub fn name(&self) -> &'static str {
        match self {
            VelocityMethod::Smooth => "smooth",
            VelocityMethod::Neighbors => "neighbors",
            VelocityMethod::Preceding => "preceding",
            VelocityMethod::SavitzkyGolay(_) => "savitzky_golay",
        }
    }

    /// Minimum number of samples the method needs
    pub fn min_samples(&self) -> usize {
        match self {
            VelocityMethod::Smooth => 6,
            VelocityMethod::Neighbors => 3,
            VelocityMethod::Preceding => 2,
            VelocityMethod::SavitzkyGolay(config) => config.min_samples(),
        }
    }
}

/// Compute velocities from positions
///
/// # Arguments
/// * `arr` - Positions, either 1-D (single channel) or 2-D `(samples, channels)`
/// * `sampling_rate` - Sampling rate in Hz, must be above zero
/// * `method` - Differentiation scheme
///
/// # Returns
/// * Velocities in position units per second, same shape as `arr`
///
/// # Example
/// ```
/// use gaze_pipeline::gaze::transforms::{pos2vel, VelocityMethod};
/// use ndarray::arr1;
///
/// let v = pos2vel(arr1(&[0.0, 1.0, 2.0]).view(), 1000.0, &VelocityMethod::Preceding).unwrap();
/// assert_eq!(v.to_vec(), vec![0.0, 1000.0, 1000.0]);
/// ```
pub fn pos2vel<D: Dimension>(
    arr: ArrayView<'_, f64, D>,
    sampling_rate: f64,
    method: &VelocityMethod,
) -> Result<Array<f64, D>> {
    if !(sampling_rate > 0.0) {
        return Err(GazeError::InvalidSamplingRate(sampling_rate));
    }
    if arr.ndim() != 1 && arr.ndim() != 2 {
        return Err(GazeError::InvalidShape {
            name: "arr",
            message: format!("arr needs to have 1 or 2 dimensions (is: {})", arr.ndim()),
        });
    }

    let n = arr.shape()[0];
    let min = method.min_samples();
    if n < min {
        return Err(GazeError::TooFewSamples {
            method: method.name(),
            min,
            actual: n,
        });
    }

    let filter = match method {
        VelocityMethod::SavitzkyGolay(config) => Some(SavitzkyGolay::new(config)?),
        _ => None,
    };

    let rate = sampling_rate;
    let mut v = Array::<f64, D>::zeros(arr.raw_dim());

    for (x, mut out) in arr.lanes(Axis(0)).into_iter().zip(v.lanes_mut(Axis(0))) {
        match method {
            VelocityMethod::Smooth => {
                // Interior: mean of the two following minus mean of the two
                // preceding samples over a window of 3 sample intervals
                for i in 2..n - 2 {
                    out[i] = (x[i + 2] + x[i + 1] - x[i - 1] - x[i - 2]) * rate / 6.0;
                }

                // Second and second last sample: neighbouring samples only
                out[1] = (x[2] - x[0]) * rate / 2.0;
                out[n - 2] = (x[n - 1] - x[n - 3]) * rate / 2.0;

                // First and last sample: current and adjacent sample
                out[0] = (x[1] - x[0]) * rate / 2.0;
                out[n - 1] = (x[n - 1] - x[n - 2]) * rate / 2.0;
            }
            VelocityMethod::Neighbors => {
                for i in 1..n - 1 {
                    out[i] = (x[i + 1] - x[i - 1]) * rate / 2.0;
                }
            }
            VelocityMethod::Preceding => {
                for i in 1..n {
                    out[i] = (x[i] - x[i - 1]) * rate;
                }
            }
            VelocityMethod::SavitzkyGolay(_) => {
                if let Some(filter) = &filter {
                    filter.derivative(x, out.view_mut());
                    out.mapv_inplace(|value| value * rate);
                }
            }
        }
    }

    log::trace!("pos2vel: {} samples differentiated with method {}", n, method.name());
    Ok(v)
}

/// Euclidean norm of every row of an `(N, channels)` array
pub fn norm(arr: ArrayView2<'_, f64>) -> Array1<f64> {
    arr.map_axis(Axis(1), |row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
}

/// Cut sequences into windows of fixed length
///
/// # Arguments
/// * `arr` - Sequences of shape `(instances, samples, channels)`
/// * `window_size` - Samples per window
/// * `keep_padded` - Keep the trailing partial window of every instance,
///   padded with NaN. Otherwise it is dropped.
///
/// # Returns
/// * Windows of shape `(instances * windows, window_size, channels)`, all
///   windows of the first instance before those of the second
pub fn split(arr: ArrayView3<'_, f64>, window_size: usize, keep_padded: bool) -> Result<Array3<f64>> {
    if window_size == 0 {
        return Err(GazeError::InvalidConfig("window_size must be greater than zero".to_string()));
    }

    let (instances, samples, channels) = arr.dim();
    let full = samples / window_size;
    let rest = samples % window_size;
    let per_instance = if rest > 0 && keep_padded { full + 1 } else { full };

    let mut out = Array3::from_elem((instances * per_instance, window_size, channels), f64::NAN);
    for (i, instance) in arr.outer_iter().enumerate() {
        for w in 0..per_instance {
            let start = w * window_size;
            let end = (start + window_size).min(samples);
            out.slice_mut(s![i * per_instance + w, ..end - start, ..])
                .assign(&instance.slice(s![start..end, ..]));
        }
    }

    Ok(out)
}

/// Group strictly increasing indices into maximal runs of consecutive values
///
/// Runs are returned in order as half-open ranges, e.g. `[2, 3, 7, 8, 9]`
/// becomes `[2..4, 7..10]`.
pub fn consecutive(indices: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();

    for &index in indices {
        match runs.last_mut() {
            Some(run) if run.end == index => run.end = index + 1,
            _ => runs.push(index..index + 1),
        }
    }

    runs
}
