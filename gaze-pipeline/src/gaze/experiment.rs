//! Experiment definition: screen geometry plus sampling rate

use crate::gaze::screen::Screen;
use crate::gaze::transforms::{self, VelocityMethod};
use crate::types::{GazeError, Result};
use ndarray::{Array, ArrayView, Dimension};

/// Immutable experiment properties shared by every recording of a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Experiment {
    pub screen: Screen,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
}

impl Experiment {
    /// Create a new experiment definition
    ///
    /// # Errors
    /// Returns [`GazeError::InvalidSamplingRate`] if `sampling_rate` is not
    /// above zero.
    pub fn new(screen: Screen, sampling_rate: f64) -> Result<Self> {
        if !(sampling_rate > 0.0) {
            return Err(GazeError::InvalidSamplingRate(sampling_rate));
        }
        Ok(Self { screen, sampling_rate })
    }

    /// Differentiate positions with this experiment's sampling rate
    pub fn pos2vel<D: Dimension>(
        &self,
        arr: ArrayView<'_, f64, D>,
        method: &VelocityMethod,
    ) -> Result<Array<f64, D>> {
        transforms::pos2vel(arr, self.sampling_rate, method)
    }

    /// Convert pixel coordinates to degrees of visual angle on this screen
    pub fn pix2deg<D: Dimension>(&self, arr: ArrayView<'_, f64, D>) -> Result<Array<f64, D>> {
        self.screen.pix2deg(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::screen::Origin;
    use ndarray::arr1;

    fn screen() -> Screen {
        Screen::new(1024.0, 768.0, 38.0, 30.0, 60.0, Origin::LowerLeft).unwrap()
    }

    #[test]
    fn test_sampling_rate_must_be_positive() {
        assert!(Experiment::new(screen(), 1000.0).is_ok());
        assert!(matches!(
            Experiment::new(screen(), 0.0),
            Err(GazeError::InvalidSamplingRate(_))
        ));
        assert!(Experiment::new(screen(), -5.0).is_err());
        assert!(Experiment::new(screen(), f64::NAN).is_err());
    }

    #[test]
    fn test_pos2vel_uses_sampling_rate() {
        let experiment = Experiment::new(screen(), 500.0).unwrap();
        let v = experiment
            .pos2vel(arr1(&[0.0, 1.0, 3.0]).view(), &VelocityMethod::Preceding)
            .unwrap();
        assert_eq!(v.to_vec(), vec![0.0, 500.0, 1000.0]);
    }
}
