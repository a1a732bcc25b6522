//! Formatting and summary helpers used by client applications

use crate::assembler::{FeatureSet, TrackFeatures};
use crate::config::PipelineConfig;
use ndarray::Array3;

/// Format a frequency value for display
pub fn format_frequency(freq_hz: f64) -> String {
    if freq_hz >= 1000.0 {
        format!("{:.2} kHz", freq_hz / 1000.0)
    } else {
        format!("{:.1} Hz", freq_hz)
    }
}

/// Format a time value for display
pub fn format_time(time_sec: f64) -> String {
    if time_sec >= 60.0 {
        let minutes = (time_sec / 60.0).floor();
        let seconds = time_sec % 60.0;
        format!("{:.0}m {:.1}s", minutes, seconds)
    } else {
        format!("{:.2}s", time_sec)
    }
}

/// Centre frequency of an FFT bin
pub fn bin_to_frequency(bin: usize, sample_rate: u32, fft_size: usize) -> f64 {
    bin as f64 * sample_rate as f64 / fft_size as f64
}

/// Mean, standard deviation and mean absolute value of an array
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArrayStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub mean_abs: f64,
}

impl ArrayStatistics {
    pub fn of(array: &Array3<f64>) -> Self {
        let count = array.len();
        if count == 0 {
            return Self::default();
        }
        let n = count as f64;
        let mean = array.sum() / n;
        let variance = array.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let mean_abs = array.iter().map(|v| v.abs()).sum::<f64>() / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
            mean_abs,
        }
    }
}

/// Statistics of the three feature arrays of one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStatistics {
    pub amplitude: ArrayStatistics,
    pub dt_phase: ArrayStatistics,
    pub df_phase: ArrayStatistics,
}

impl FeatureStatistics {
    pub fn of(features: &TrackFeatures) -> Self {
        Self {
            amplitude: ArrayStatistics::of(&features.amplitude),
            dt_phase: ArrayStatistics::of(&features.dt_phase),
            df_phase: ArrayStatistics::of(&features.df_phase),
        }
    }
}

/// Multi-line description of a configuration
pub fn config_summary(config: &PipelineConfig) -> String {
    format!(
        "Pipeline configuration:\n\
         - FFT size: {} ({} bins, {} resolution)\n\
         - Overlap: {} samples ({:.1}%), hop {} samples\n\
         - Window: {}\n\
         - Sample rate: {} Hz\n\
         - Context: {} frames each side ({} total)\n\
         - Frequency offset: {:.4} rad",
        config.n_fft,
        config.num_bins(),
        format_frequency(bin_to_frequency(1, config.sample_rate, config.n_fft)),
        config.n_overlap,
        config.overlap_percent(),
        config.hop_size(),
        config.window_type,
        config.sample_rate,
        config.context_size,
        config.context_width(),
        config.frequency_offset
    )
}

/// Multi-line description of a prepared feature set
pub fn feature_summary(features: &FeatureSet) -> String {
    let mut summary = format!(
        "Feature set: {} tracks, {} frames, context {}\n",
        features.tracks().len(),
        features.len(),
        features.context_size()
    );
    for (i, track) in features.tracks().iter().enumerate() {
        let stats = FeatureStatistics::of(track);
        summary.push_str(&format!(
            "  track {}: {} frames, mean amplitude {:.3e}, |dt| {:.3} ± {:.3}, |df| {:.3} ± {:.3}\n",
            i,
            track.num_frames(),
            stats.amplitude.mean,
            stats.dt_phase.mean_abs,
            stats.dt_phase.std_dev,
            stats.df_phase.mean_abs,
            stats.df_phase.std_dev
        ));
    }
    summary
}
