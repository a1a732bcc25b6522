//! Spectral analysis of tracks into amplitude and phase arrays

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::phase::wrap;
use crate::stft::Stft;
use crate::track::Track;
use crate::Result;
use ndarray::{Array3, Axis, Zip};

/// Amplitude and phase of one track, both `[bin, channel, frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Magnitude of every STFT coefficient, never negative
    pub amplitude: Array3<f64>,
    /// Argument of every STFT coefficient in (-π, π]; zero where the amplitude is zero
    pub phase: Array3<f64>,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.amplitude.len_of(Axis(0))
    }

    pub fn num_channels(&self) -> usize {
        self.amplitude.len_of(Axis(1))
    }

    pub fn num_frames(&self) -> usize {
        self.amplitude.len_of(Axis(2))
    }
}

/// Runs the forward transform and splits the result into polar form
pub struct SpectralAnalyzer {
    stft: Stft,
}

impl SpectralAnalyzer {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            stft: Stft::new(config)?,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        self.stft.config()
    }

    /// Frames the analysis of `track` will produce
    pub fn num_frames(&self, track: &Track) -> usize {
        self.stft.num_frames(track.len())
    }

    /// Analyze every channel of a track
    pub fn analyze(&self, track: &Track) -> Result<Spectrogram> {
        let expected_rate = self.config().sample_rate;
        if track.sample_rate() != expected_rate {
            return Err(Error::parameter(format!(
                "Track sample rate {} Hz does not match configured {} Hz",
                track.sample_rate(),
                expected_rate
            )));
        }

        let spectrum = self.stft.forward(track.channels())?;
        let amplitude = spectrum.mapv(|z| z.norm());
        let mut phase = Array3::zeros(spectrum.raw_dim());
        Zip::from(&mut phase)
            .and(&spectrum)
            .and(&amplitude)
            .for_each(|p, z, &a| {
                *p = if a == 0.0 { 0.0 } else { wrap(z.arg()) };
            });

        log::debug!(
            "Analyzed {} channels into {} bins x {} frames",
            track.num_channels(),
            amplitude.len_of(Axis(0)),
            amplitude.len_of(Axis(2))
        );

        Ok(Spectrogram { amplitude, phase })
    }
}
