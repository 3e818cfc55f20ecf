//! Engbert & Kliegl microsaccade detection
//!
//! Samples whose velocity lies outside an ellipse with per-axis radii
//! `threshold * threshold_factor` are candidates; maximal runs of adjacent
//! candidates lasting at least `minimum_duration` ticks become events.

use crate::config::{MicrosaccadeParams, Threshold};
use crate::events::frame::EventFrame;
use crate::events::threshold::compute_threshold;
use crate::gaze::transforms::consecutive;
use crate::types::{GazeError, Result};
use ndarray::ArrayView2;
use std::ops::Range;

/// Name given to detected events
pub const EVENT_NAME: &str = "saccade";

/// Detect microsaccades in a velocity signal
///
/// # Arguments
/// * `positions` - Positions of shape `(N, 2)`
/// * `velocities` - Velocities of shape `(N, 2)`
/// * `timesteps` - Time tick of every sample (default: `0..N`)
/// * `params` - Detection parameters
///
/// # Returns
/// * Events named `"saccade"` in time order; no event is not an error
///
/// # Errors
/// * [`GazeError::InvalidShape`] for arrays not of shape `(N, 2)` or of unequal shape
/// * [`GazeError::LengthMismatch`] if `timesteps` and `velocities` differ in length
/// * [`GazeError::ThresholdTooLow`] unless every threshold component exceeds
///   `minimum_threshold`
pub fn microsaccades(
    positions: ArrayView2<'_, f64>,
    velocities: ArrayView2<'_, f64>,
    timesteps: Option<&[i64]>,
    params: &MicrosaccadeParams,
) -> Result<EventFrame> {
    if positions.ncols() != 2 {
        return Err(GazeError::InvalidShape {
            name: "positions",
            message: format!("positions must have shape (N, 2) but have shape {:?}", positions.shape()),
        });
    }
    if positions.shape() != velocities.shape() {
        return Err(GazeError::InvalidShape {
            name: "velocities",
            message: format!(
                "positions {:?} and velocities {:?} must have equal shape",
                positions.shape(),
                velocities.shape()
            ),
        });
    }

    let n = velocities.nrows();
    let default_timesteps: Vec<i64>;
    let timesteps = match timesteps {
        Some(timesteps) => {
            if timesteps.len() != n {
                return Err(GazeError::length_mismatch("velocities", n, "timesteps", timesteps.len()));
            }
            timesteps
        }
        None => {
            default_timesteps = (0..n as i64).collect();
            default_timesteps.as_slice()
        }
    };

    let threshold = match params.threshold {
        Threshold::Explicit(threshold) => threshold,
        Threshold::Method(method) => compute_threshold(velocities, method)?,
    };
    // NaN components fail this check as well
    if !threshold.iter().all(|th| *th > params.minimum_threshold) {
        return Err(GazeError::ThresholdTooLow {
            threshold,
            minimum: params.minimum_threshold,
        });
    }

    let radius = [threshold[0] * params.threshold_factor, threshold[1] * params.threshold_factor];
    let is_missing = |i: usize| velocities[[i, 0]].is_nan() || velocities[[i, 1]].is_nan();

    let candidates: Vec<usize> = (0..n)
        .filter(|&i| {
            if is_missing(i) {
                return params.include_nan;
            }
            let norm_x = velocities[[i, 0]] / radius[0];
            let norm_y = velocities[[i, 1]] / radius[1];
            norm_x * norm_x + norm_y * norm_y > 1.0
        })
        .collect();

    let mut runs = consecutive(&candidates);
    if params.include_nan {
        runs = runs
            .into_iter()
            .filter_map(|run| trim_missing(run, &is_missing))
            .collect();
    }

    let mut onsets = Vec::new();
    let mut offsets = Vec::new();
    for run in runs {
        let onset = timesteps[run.start];
        let offset = timesteps[run.end - 1];
        if offset - onset >= params.minimum_duration {
            onsets.push(onset);
            offsets.push(offset);
        } else {
            log::trace!("dropping candidate run {}..={} (too short)", onset, offset);
        }
    }

    log::debug!(
        "microsaccades: threshold {:?}, {} candidate samples, {} events",
        threshold,
        candidates.len(),
        onsets.len()
    );

    EventFrame::new(EVENT_NAME, &onsets, &offsets)
}

/// Strip missing samples from both ends of a run, `None` if nothing remains
fn trim_missing(run: Range<usize>, is_missing: impl Fn(usize) -> bool) -> Option<Range<usize>> {
    let start = run.clone().find(|&i| !is_missing(i))?;
    let end = run.rev().find(|&i| !is_missing(i))? + 1;
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::threshold::ThresholdMethod;
    use ndarray::Array2;

    fn spike(n: usize, at: &[usize], value: f64) -> Array2<f64> {
        let mut v = Array2::zeros((n, 2));
        for &i in at {
            v[[i, 0]] = value;
            v[[i, 1]] = value;
        }
        v
    }

    fn explicit_params() -> MicrosaccadeParams {
        MicrosaccadeParams::new()
            .with_threshold([1.0, 1.0])
            .with_threshold_factor(1.0)
            .with_minimum_duration(0)
    }

    fn intervals(frame: &EventFrame) -> Vec<(i64, i64)> {
        frame.iter().map(|e| (e.onset(), e.offset())).collect()
    }

    #[test]
    fn test_single_spike_is_one_event() {
        let v = spike(11, &[5], 50.0);
        let events = microsaccades(v.view(), v.view(), None, &explicit_params()).unwrap();
        assert_eq!(intervals(&events), vec![(5, 5)]);
        assert_eq!(events.events()[0].name(), "saccade");
    }

    #[test]
    fn test_below_threshold_yields_no_events() {
        let v = spike(20, &[3, 4, 12], 0.5);
        let events = microsaccades(v.view(), v.view(), None, &explicit_params()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_threshold_below_minimum_always_fails() {
        let v = spike(11, &[5], 50.0);

        let params = explicit_params().with_threshold([0.0, 1.0]);
        assert!(matches!(
            microsaccades(v.view(), v.view(), None, &params),
            Err(GazeError::ThresholdTooLow { .. })
        ));

        let params = explicit_params().with_threshold([1.0, 1.0]).with_minimum_threshold(1.0);
        assert!(microsaccades(v.view(), v.view(), None, &params).is_err());

        // A constant signal has no noise to estimate
        let flat = Array2::zeros((30, 2));
        let params = MicrosaccadeParams::new().with_threshold_method(ThresholdMethod::Engbert2015);
        assert!(matches!(
            microsaccades(flat.view(), flat.view(), None, &params),
            Err(GazeError::ThresholdTooLow { .. })
        ));
    }

    #[test]
    fn test_minimum_duration_is_inclusive() {
        let v = spike(20, &[4, 5, 6, 7, 12, 13], 10.0);
        let params = explicit_params().with_minimum_duration(3);
        let events = microsaccades(v.view(), v.view(), None, &params).unwrap();
        assert_eq!(intervals(&events), vec![(4, 7)]);

        let params = explicit_params().with_minimum_duration(1);
        let events = microsaccades(v.view(), v.view(), None, &params).unwrap();
        assert_eq!(intervals(&events), vec![(4, 7), (12, 13)]);
    }

    #[test]
    fn test_timesteps_map_onset_and_offset() {
        let v = spike(6, &[2, 3], 10.0);
        let time: Vec<i64> = (0..6).map(|i| 1000 + 4 * i).collect();
        let params = explicit_params().with_minimum_duration(4);
        let events = microsaccades(v.view(), v.view(), Some(&time), &params).unwrap();
        assert_eq!(intervals(&events), vec![(1008, 1012)]);

        assert!(matches!(
            microsaccades(v.view(), v.view(), Some(&time[..5]), &params),
            Err(GazeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_velocity_compares_false() {
        let mut v = spike(12, &[4, 6], 10.0);
        v[[5, 0]] = f64::NAN;

        let events = microsaccades(v.view(), v.view(), None, &explicit_params()).unwrap();
        assert_eq!(intervals(&events), vec![(4, 4), (6, 6)]);

        let params = explicit_params().with_include_nan(true);
        let events = microsaccades(v.view(), v.view(), None, &params).unwrap();
        assert_eq!(intervals(&events), vec![(4, 6)]);
    }

    #[test]
    fn test_missing_samples_are_trimmed_from_runs() {
        let mut v = spike(12, &[3, 4], 10.0);
        v[[2, 1]] = f64::NAN;
        v[[5, 0]] = f64::NAN;
        v[[9, 0]] = f64::NAN;

        let params = explicit_params().with_include_nan(true);
        let events = microsaccades(v.view(), v.view(), None, &params).unwrap();
        // The run at 9 holds only a missing sample and is dropped
        assert_eq!(intervals(&events), vec![(3, 4)]);
    }

    #[test]
    fn test_invalid_shapes() {
        let positions = Array2::zeros((10, 2));
        let velocities = Array2::zeros((9, 2));
        let params = explicit_params();
        assert!(matches!(
            microsaccades(positions.view(), velocities.view(), None, &params),
            Err(GazeError::InvalidShape { .. })
        ));

        let wide = Array2::zeros((10, 3));
        assert!(microsaccades(wide.view(), wide.view(), None, &params).is_err());
    }

    #[test]
    fn test_trim_missing() {
        let missing = [true, false, true, false, true];
        assert_eq!(trim_missing(0..5, |i| missing[i]), Some(1..4));
        assert_eq!(trim_missing(0..1, |i| missing[i]), None);
    }
}
