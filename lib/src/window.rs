//! Window functions for STFT analysis and synthesis
//!
//! Windows are generated periodic (DFT-even): a window of size `n` is the
//! first `n` points of the symmetric window of size `n + 1`. A periodic Hann
//! window overlap-adds to a constant at 50% overlap.

use crate::error::Error;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function types available for the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window (default)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Rectangular window (no windowing)
    Rectangular,
    /// Bartlett (triangular) window
    Bartlett,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for WindowType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowType::all()
            .iter()
            .copied()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::parameter(format!("Unknown window type: {}", s)))
    }
}

impl WindowType {
    /// Get all available window types
    pub fn all() -> &'static [WindowType] {
        &[
            WindowType::Hann,
            WindowType::Hamming,
            WindowType::Rectangular,
            WindowType::Bartlett,
        ]
    }

    /// Get the name of the window type
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Rectangular => "rectangular",
            WindowType::Bartlett => "bartlett",
        }
    }
}

/// Generate a periodic window of the specified type and size
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = i as f64;
            match window_type {
                WindowType::Hann => 0.5 - 0.5 * (2.0 * PI * x / n).cos(),
                WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * x / n).cos(),
                WindowType::Rectangular => 1.0,
                WindowType::Bartlett => 1.0 - (2.0 * x / n - 1.0).abs(),
            }
        })
        .collect()
}

/// Sum of window values (used to scale spectra)
pub fn window_sum(window: &[f64]) -> f64 {
    window.iter().sum()
}
