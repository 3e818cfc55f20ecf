//! Savitzky-Golay first-derivative filter
//!
//! A polynomial of order `polyorder` is least-squares fitted to every window
//! of `window_length` samples and its derivative is evaluated. The fit is
//! linear in the samples, so it reduces to a `window_length × window_length`
//! matrix whose row `r` gives the derivative at window position `r`:
//!
//! ```text
//!   M = D · pinv(V)      V[i][j] = s_i^j      D[i][j] = j · s_i^(j-1)
//! ```
//!
//! with `s_i = i - window_length / 2`. The center row is the usual
//! convolution kernel; the outer rows evaluate the edge polynomial in
//! `interp` mode.

use crate::types::{GazeError, Result};
use nalgebra::DMatrix;
use ndarray::{ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// Signal extension used at the borders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavgolMode {
    /// Evaluate the polynomial fitted to the first / last window
    #[default]
    Interp,
    /// Reflect about the edge sample (`d c b | a b c d | c b a`)
    Mirror,
    /// Repeat the edge sample
    Nearest,
    /// Pad with `cval`
    Constant,
    /// Periodic extension
    Wrap,
}

/// Configuration of the Savitzky-Golay velocity method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavitzkyGolayConfig {
    /// Number of samples per fitted window, odd
    pub window_length: usize,

    /// Order of the fitted polynomial, below `window_length`
    pub polyorder: usize,

    /// Spacing of the samples the derivative is taken over (default: 1.0)
    #[serde(default = "default_delta")]
    pub delta: f64,

    /// Border handling (default: interp)
    #[serde(default)]
    pub mode: SavgolMode,

    /// Fill value for `constant` mode (default: 0.0)
    #[serde(default)]
    pub cval: f64,
}

fn default_delta() -> f64 {
    1.0
}

impl SavitzkyGolayConfig {
    /// Create a configuration with default delta and `interp` mode
    pub fn new(window_length: usize, polyorder: usize) -> Self {
        Self {
            window_length,
            polyorder,
            delta: default_delta(),
            mode: SavgolMode::Interp,
            cval: 0.0,
        }
    }

    /// Builder method: set the sample spacing
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Builder method: set the border mode
    pub fn with_mode(mut self, mode: SavgolMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: set the fill value of `constant` mode
    pub fn with_cval(mut self, cval: f64) -> Self {
        self.cval = cval;
        self
    }

    /// Validate the window parameters
    pub fn validate(&self) -> Result<()> {
        if self.window_length == 0 || self.window_length % 2 == 0 {
            return Err(GazeError::InvalidConfig(format!(
                "window_length must be a positive odd number (is: {})",
                self.window_length
            )));
        }
        if self.polyorder >= self.window_length {
            return Err(GazeError::InvalidConfig(format!(
                "polyorder ({}) must be less than window_length ({})",
                self.polyorder, self.window_length
            )));
        }
        if !(self.delta > 0.0) {
            return Err(GazeError::InvalidConfig(format!(
                "delta must be above zero (is: {})",
                self.delta
            )));
        }
        Ok(())
    }

    /// Minimum number of samples the filter can be applied to
    pub fn min_samples(&self) -> usize {
        match self.mode {
            SavgolMode::Interp => self.window_length,
            _ => 1,
        }
    }
}

/// Precomputed filter for one configuration
pub(crate) struct SavitzkyGolay {
    window: usize,
    half: usize,
    /// Derivative at each window position as a linear map of the window samples
    fit: DMatrix<f64>,
    mode: SavgolMode,
    cval: f64,
    delta: f64,
}

impl SavitzkyGolay {
    pub(crate) fn new(config: &SavitzkyGolayConfig) -> Result<Self> {
        config.validate()?;

        let window = config.window_length;
        let half = window / 2;
        let terms = config.polyorder + 1;
        let offset = |i: usize| i as f64 - half as f64;

        let vandermonde = DMatrix::from_fn(window, terms, |i, j| offset(i).powi(j as i32));
        let derivative = DMatrix::from_fn(window, terms, |i, j| {
            if j == 0 {
                0.0
            } else {
                j as f64 * offset(i).powi(j as i32 - 1)
            }
        });

        let pinv = vandermonde
            .pseudo_inverse(1e-12)
            .map_err(|e| GazeError::Numerical(format!("savitzky_golay fit failed: {}", e)))?;

        log::debug!(
            "savitzky_golay: window_length={}, polyorder={}, mode={:?}",
            window,
            config.polyorder,
            config.mode
        );

        Ok(Self {
            window,
            half,
            fit: derivative * pinv,
            mode: config.mode,
            cval: config.cval,
            delta: config.delta,
        })
    }

    /// Write the first derivative of `x` into `out` (same length)
    pub(crate) fn derivative(&self, x: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let n = x.len();
        let (w, h) = (self.window, self.half);

        match self.mode {
            SavgolMode::Interp => {
                // n >= window_length is checked by the caller
                for i in h..n - h {
                    out[i] = self.apply_row(h, |k| x[i + k - h]);
                }
                for i in 0..h {
                    out[i] = self.apply_row(i, |k| x[k]);
                }
                for i in n - h..n {
                    out[i] = self.apply_row(i + w - n, |k| x[n - w + k]);
                }
            }
            _ => {
                for i in 0..n {
                    out[i] = self.apply_row(h, |k| self.extended(&x, i as isize + k as isize - h as isize));
                }
            }
        }

        out.mapv_inplace(|v| v / self.delta);
    }

    fn apply_row(&self, row: usize, sample: impl Fn(usize) -> f64) -> f64 {
        (0..self.window).map(|k| self.fit[(row, k)] * sample(k)).sum()
    }

    /// Sample at a possibly out-of-range index under the configured extension
    fn extended(&self, x: &ArrayView1<'_, f64>, index: isize) -> f64 {
        let n = x.len() as isize;
        if (0..n).contains(&index) {
            return x[index as usize];
        }
        match self.mode {
            SavgolMode::Constant => self.cval,
            SavgolMode::Nearest => x[index.clamp(0, n - 1) as usize],
            SavgolMode::Wrap => x[index.rem_euclid(n) as usize],
            SavgolMode::Mirror | SavgolMode::Interp => {
                if n == 1 {
                    return x[0];
                }
                let period = 2 * (n - 1);
                let folded = index.rem_euclid(period);
                let mirrored = if folded >= n { period - folded } else { folded };
                x[mirrored as usize]
            }
        }
    }
}
