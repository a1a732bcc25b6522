//! Pipeline configuration
//!
//! A single immutable value carries every parameter the analysis, feature
//! and reconstruction stages need.

use crate::error::Error;
use crate::window::WindowType;
use crate::Result;
use std::f64::consts::PI;

/// Parameters shared by every stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// FFT size (samples per analysis frame), must be even
    pub n_fft: usize,
    /// Samples shared by consecutive frames; hop = n_fft - n_overlap
    pub n_overlap: usize,
    /// Sample rate the tracks are expected to carry
    pub sample_rate: u32,
    /// Frames on each side of the centre frame in a context window
    pub context_size: usize,
    /// Analysis/synthesis window
    pub window_type: WindowType,
    /// Constant added to the bin-to-bin phase difference before re-wrapping
    pub frequency_offset: f64,
    /// Amplitudes at or below this value are treated as silent
    pub silence_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            n_overlap: 1024,
            sample_rate: 44100,
            context_size: 2,
            window_type: WindowType::Hann,
            frequency_offset: PI,
            silence_threshold: 0.0,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with validation, keeping the remaining defaults
    pub fn new(n_fft: usize, n_overlap: usize, sample_rate: u32, context_size: usize) -> Result<Self> {
        let config = Self {
            n_fft,
            n_overlap,
            sample_rate,
            context_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter; called by all stage constructors
    pub fn validate(&self) -> Result<()> {
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(Error::parameter(format!(
                "FFT size must be even and at least 2, got {}",
                self.n_fft
            )));
        }
        if self.n_fft <= self.n_overlap {
            return Err(Error::parameter(format!(
                "FFT size ({}) must exceed overlap ({})",
                self.n_fft, self.n_overlap
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::parameter("Sample rate must be positive"));
        }
        if self.context_size == 0 {
            return Err(Error::parameter("Context size must be positive"));
        }
        if !self.frequency_offset.is_finite() {
            return Err(Error::parameter("Frequency offset must be finite"));
        }
        if self.silence_threshold.is_nan() || self.silence_threshold < 0.0 {
            return Err(Error::parameter(format!(
                "Silence threshold must be non-negative, got {}",
                self.silence_threshold
            )));
        }
        Ok(())
    }

    pub fn with_window_type(mut self, window_type: WindowType) -> Self {
        self.window_type = window_type;
        self
    }

    pub fn with_context_size(mut self, context_size: usize) -> Result<Self> {
        self.context_size = context_size;
        self.validate()?;
        Ok(self)
    }

    pub fn with_frequency_offset(mut self, offset: f64) -> Result<Self> {
        self.frequency_offset = offset;
        self.validate()?;
        Ok(self)
    }

    pub fn with_silence_threshold(mut self, threshold: f64) -> Result<Self> {
        self.silence_threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    /// Step between consecutive frames in samples
    pub fn hop_size(&self) -> usize {
        self.n_fft - self.n_overlap
    }

    /// Number of one-sided frequency bins
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames in one context window
    pub fn context_width(&self) -> usize {
        2 * self.context_size + 1
    }

    /// Overlap as a percentage of the frame
    pub fn overlap_percent(&self) -> f64 {
        self.n_overlap as f64 / self.n_fft as f64 * 100.0
    }
}

/// Named parameter sets
pub mod presets {
    use super::*;

    /// Preset descriptor for listing
    #[derive(Debug, Clone)]
    pub struct PresetInfo {
        pub name: &'static str,
        pub description: &'static str,
        pub config: PipelineConfig,
    }

    /// 2048-point frames with 50% overlap, two frames of context
    pub fn default() -> PipelineConfig {
        PipelineConfig::default()
    }

    /// Shorter frames for transient-heavy material
    pub fn high_time_resolution() -> PipelineConfig {
        PipelineConfig {
            n_fft: 1024,
            n_overlap: 768,
            context_size: 4,
            ..PipelineConfig::default()
        }
    }

    /// Longer frames for tonal material
    pub fn high_freq_resolution() -> PipelineConfig {
        PipelineConfig {
            n_fft: 4096,
            n_overlap: 2048,
            context_size: 1,
            ..PipelineConfig::default()
        }
    }

    pub fn all_presets() -> Vec<PresetInfo> {
        vec![
            PresetInfo {
                name: "default",
                description: "2048/1024, context 2",
                config: default(),
            },
            PresetInfo {
                name: "high_time_resolution",
                description: "1024/768, context 4",
                config: high_time_resolution(),
            },
            PresetInfo {
                name: "high_freq_resolution",
                description: "4096/2048, context 1",
                config: high_freq_resolution(),
            },
        ]
    }

    pub fn get_preset(name: &str) -> Option<PipelineConfig> {
        all_presets()
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.config)
    }
}
