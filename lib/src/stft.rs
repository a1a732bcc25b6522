//! Short-Time Fourier Transform (STFT) forward and inverse primitive
//!
//! Frames are centred: the signal is padded with `n_fft / 2` zeros on both
//! sides and then zero-extended so the last frame is complete, giving
//! `ceil(samples / hop) + 1` frames. Spectra are scaled by the inverse of the
//! window sum, and the inverse transform undoes that scaling, so a matched
//! forward/inverse pair reconstructs the input.

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::window::{generate_window, window_sum};
use crate::Result;
use ndarray::Array3;
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Overlapped sums of squared windows below this are left unnormalized
const WINDOW_FLOOR: f64 = 1e-10;

/// Planned forward and inverse transform for one configuration
pub struct Stft {
    config: PipelineConfig,
    window: Vec<f64>,
    window_sum: f64,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
}

impl Stft {
    /// Plan both directions for the given configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let window = generate_window(config.window_type, config.n_fft);
        let window_sum = window_sum(&window);
        if window_sum <= 0.0 {
            return Err(Error::parameter(format!(
                "{} window of size {} has no energy",
                config.window_type, config.n_fft
            )));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(config.n_fft);
        let inverse = planner.plan_fft_inverse(config.n_fft);

        Ok(Self {
            config,
            window,
            window_sum,
            forward,
            inverse,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of frames produced for a channel of `num_samples` samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            0
        } else {
            num_samples.div_ceil(self.config.hop_size()) + 1
        }
    }

    /// Samples produced by the inverse transform for `num_frames` frames
    pub fn output_length(&self, num_frames: usize) -> usize {
        num_frames.saturating_sub(1) * self.config.hop_size()
    }

    /// Forward transform of every channel into `[bins, channels, frames]`
    pub fn forward(&self, channels: &[Vec<f64>]) -> Result<Array3<Complex64>> {
        let first = channels
            .first()
            .ok_or_else(|| Error::transform("No channels to transform"))?;
        let num_samples = first.len();
        if num_samples == 0 {
            return Err(Error::transform("Audio data is empty"));
        }
        if let Some((i, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != num_samples)
        {
            return Err(Error::shape(format!(
                "Channel {} has length {}, expected {}",
                i,
                channel.len(),
                num_samples
            )));
        }

        let n_fft = self.config.n_fft;
        let hop = self.config.hop_size();
        let half = n_fft / 2;
        let num_frames = self.num_frames(num_samples);
        let num_bins = self.config.num_bins();
        let padded_length = n_fft + (num_frames - 1) * hop;
        let scale = 1.0 / self.window_sum;

        let mut output = Array3::<Complex64>::zeros((num_bins, channels.len(), num_frames));
        let mut padded = vec![0.0; padded_length];
        let mut frame_data = vec![0.0; n_fft];
        let mut spectrum = vec![Complex64::new(0.0, 0.0); num_bins];

        for (channel_idx, channel) in channels.iter().enumerate() {
            log::debug!(
                "Forward transform of channel {} ({} samples, {} frames)",
                channel_idx,
                num_samples,
                num_frames
            );

            padded.fill(0.0);
            padded[half..half + num_samples].copy_from_slice(channel);

            for frame_idx in 0..num_frames {
                let start = frame_idx * hop;
                for (i, sample) in frame_data.iter_mut().enumerate() {
                    *sample = padded[start + i] * self.window[i];
                }

                self.forward
                    .process(&mut frame_data, &mut spectrum)
                    .map_err(|e| Error::transform(format!("FFT error: {}", e)))?;

                for (bin_idx, value) in spectrum.iter().enumerate() {
                    output[[bin_idx, channel_idx, frame_idx]] = *value * scale;
                }
            }
        }

        Ok(output)
    }

    /// Inverse transform of a `[bins, channels, frames]` spectrogram
    ///
    /// Returns one buffer per channel of `(frames - 1) * hop` samples.
    pub fn inverse(&self, spectrogram: &Array3<Complex64>) -> Result<Vec<Vec<f64>>> {
        let (num_bins, num_channels, num_frames) = spectrogram.dim();
        if num_bins != self.config.num_bins() {
            return Err(Error::shape(format!(
                "Spectrogram has {} bins, expected {} for FFT size {}",
                num_bins,
                self.config.num_bins(),
                self.config.n_fft
            )));
        }
        if num_channels == 0 {
            return Err(Error::shape("Spectrogram has no channels"));
        }
        if num_frames == 0 {
            return Err(Error::transform("Spectrogram has no frames"));
        }

        let n_fft = self.config.n_fft;
        let hop = self.config.hop_size();
        let half = n_fft / 2;
        let full_length = n_fft + (num_frames - 1) * hop;
        let norm = 1.0 / n_fft as f64;

        let mut window_energy = vec![0.0; full_length];
        for frame_idx in 0..num_frames {
            let start = frame_idx * hop;
            for (i, &w) in self.window.iter().enumerate() {
                window_energy[start + i] += w * w;
            }
        }

        let mut spectrum = vec![Complex64::new(0.0, 0.0); num_bins];
        let mut time_data = vec![0.0; n_fft];
        let mut channels = Vec::with_capacity(num_channels);

        for channel_idx in 0..num_channels {
            log::debug!(
                "Inverse transform of channel {} ({} frames)",
                channel_idx,
                num_frames
            );

            let mut output = vec![0.0; full_length];
            for frame_idx in 0..num_frames {
                for (bin_idx, value) in spectrum.iter_mut().enumerate() {
                    *value = spectrogram[[bin_idx, channel_idx, frame_idx]] * self.window_sum;
                }
                // A real signal has purely real DC and Nyquist bins
                spectrum[0].im = 0.0;
                spectrum[num_bins - 1].im = 0.0;

                self.inverse
                    .process(&mut spectrum, &mut time_data)
                    .map_err(|e| Error::transform(format!("IFFT error: {}", e)))?;

                let start = frame_idx * hop;
                for (i, &sample) in time_data.iter().enumerate() {
                    output[start + i] += sample * norm * self.window[i];
                }
            }

            for (sample, &energy) in output.iter_mut().zip(window_energy.iter()) {
                if energy > WINDOW_FLOOR {
                    *sample /= energy;
                }
            }

            channels.push(output[half..full_length - half].to_vec());
        }

        Ok(channels)
    }
}
