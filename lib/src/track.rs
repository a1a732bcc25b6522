//! Audio tracks fed into and produced by the pipeline

use crate::error::Error;
use crate::Result;

/// Multi-channel audio buffer with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    sample_rate: u32,
    channels: Vec<Vec<f64>>,
}

impl Track {
    /// Create a track from per-channel samples
    ///
    /// Requires at least one channel, equal channel lengths and a positive
    /// sample rate.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f64>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::parameter("Sample rate must be positive"));
        }
        let first = channels
            .first()
            .ok_or_else(|| Error::shape("Track needs at least one channel"))?;
        let expected_length = first.len();
        for (i, channel) in channels.iter().enumerate() {
            if channel.len() != expected_length {
                return Err(Error::shape(format!(
                    "Channel {} has length {}, expected {}",
                    i,
                    channel.len(),
                    expected_length
                )));
            }
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Silent track of the given shape
    pub fn silence(sample_rate: u32, num_channels: usize, num_samples: usize) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; num_samples]; num_channels])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Copy of the track cut or zero-extended to `num_samples` per channel
    pub fn resized(&self, num_samples: usize) -> Self {
        let channels = self
            .channels
            .iter()
            .map(|channel| {
                let mut resized = channel.clone();
                resized.resize(num_samples, 0.0);
                resized
            })
            .collect();
        Self {
            sample_rate: self.sample_rate,
            channels,
        }
    }
}
