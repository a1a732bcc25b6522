//! Resynthesis of audio from amplitude and phase arrays

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::stft::Stft;
use crate::track::Track;
use crate::Result;
use ndarray::{Array3, Zip};
use num_complex::Complex64;

/// Recombines polar spectra and runs the inverse transform
pub struct AudioReconstructor {
    stft: Stft,
}

impl AudioReconstructor {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            stft: Stft::new(config)?,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        self.stft.config()
    }

    /// Build `amplitude · exp(i·phase)` and invert it
    ///
    /// Both arrays must have exactly the same `[bin, channel, frame]` shape.
    pub fn reconstruct(&self, amplitude: &Array3<f64>, phase: &Array3<f64>) -> Result<Track> {
        if amplitude.shape() != phase.shape() {
            return Err(Error::shape(format!(
                "Amplitude shape {:?} does not match phase shape {:?}",
                amplitude.shape(),
                phase.shape()
            )));
        }

        let mut spectrum = Array3::<Complex64>::zeros(amplitude.raw_dim());
        Zip::from(&mut spectrum)
            .and(amplitude)
            .and(phase)
            .for_each(|z, &a, &p| *z = Complex64::from_polar(a, p));

        let channels = self.stft.inverse(&spectrum)?;
        log::debug!(
            "Reconstructed {} channels of {} samples",
            channels.len(),
            channels.first().map_or(0, Vec::len)
        );
        Track::new(self.config().sample_rate, channels)
    }

    /// Reconstruct and cut or zero-extend every channel to `num_samples`
    pub fn reconstruct_to_length(
        &self,
        amplitude: &Array3<f64>,
        phase: &Array3<f64>,
        num_samples: usize,
    ) -> Result<Track> {
        Ok(self.reconstruct(amplitude, phase)?.resized(num_samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SpectralAnalyzer;
    use std::f64::consts::PI;

    fn mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_sine_round_trip() {
        let config = PipelineConfig::default();
        let analyzer = SpectralAnalyzer::new(config).unwrap();
        let reconstructor = AudioReconstructor::new(config).unwrap();

        let sample_rate = 44100.0;
        let signal: Vec<f64> = (0..44100)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f64 / sample_rate).sin())
            .collect();
        let track = Track::new(44100, vec![signal.clone()]).unwrap();

        let spectrogram = analyzer.analyze(&track).unwrap();
        let reconstructed = reconstructor
            .reconstruct_to_length(&spectrogram.amplitude, &spectrogram.phase, track.len())
            .unwrap();

        assert_eq!(reconstructed.len(), track.len());
        assert_eq!(reconstructed.sample_rate(), 44100);

        // Skip one frame at each edge where the window tapers
        let edge = config.n_fft;
        let mse = mean_squared_error(
            &signal[edge..signal.len() - edge],
            &reconstructed.channels()[0][edge..signal.len() - edge],
        );
        println!("Round trip MSE: {:e}", mse);
        assert!(mse < 1e-8, "Reconstruction error too large: {}", mse);
    }

    #[test]
    fn test_output_length() {
        let config = PipelineConfig::new(512, 256, 16000, 2).unwrap();
        let reconstructor = AudioReconstructor::new(config).unwrap();
        let amplitude = Array3::zeros((257, 2, 10));
        let phase = Array3::zeros((257, 2, 10));

        let track = reconstructor.reconstruct(&amplitude, &phase).unwrap();
        assert_eq!(track.num_channels(), 2);
        assert_eq!(track.len(), 9 * 256);
        assert!(track.channels().iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let reconstructor = AudioReconstructor::new(PipelineConfig::default()).unwrap();
        let amplitude = Array3::zeros((1025, 2, 4));
        let phase = Array3::zeros((1025, 1, 4));
        assert!(matches!(
            reconstructor.reconstruct(&amplitude, &phase),
            Err(Error::InvalidShape(_))
        ));
    }
}
