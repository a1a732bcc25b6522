//! Assembly of per-frame feature windows over a collection of tracks
//!
//! Every track is analyzed and corrected once; the per-frame context windows
//! are produced lazily, track-major and frame-minor, from the stored arrays.

use crate::analyzer::SpectralAnalyzer;
use crate::config::PipelineConfig;
use crate::context::fill_context;
use crate::error::Error;
use crate::phase::PhaseCorrector;
use crate::track::Track;
use crate::Result;
use ndarray::{s, stack, Array2, Array3, Array4, ArrayView3, Axis};
use rayon::prelude::*;

/// Corrected spectral features of one track, all `[bin, channel, frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeatures {
    pub amplitude: Array3<f64>,
    /// Drift-corrected time derivative of the phase
    pub dt_phase: Array3<f64>,
    /// Offset-corrected frequency derivative of the phase
    pub df_phase: Array3<f64>,
}

impl TrackFeatures {
    pub fn num_frames(&self) -> usize {
        self.amplitude.len_of(Axis(2))
    }

    /// Fail unless both phase derivatives share the amplitude's shape
    pub fn check_shapes(&self) -> Result<()> {
        for (name, derivative) in [("dt_phase", &self.dt_phase), ("df_phase", &self.df_phase)] {
            if derivative.shape() != self.amplitude.shape() {
                return Err(Error::shape(format!(
                    "{} shape {:?} does not match amplitude shape {:?}",
                    name,
                    derivative.shape(),
                    self.amplitude.shape()
                )));
            }
        }
        Ok(())
    }

    /// Amplitude and stacked phase context around one frame
    pub fn context_at(&self, frame: usize, context_size: usize) -> Result<FeaturePair> {
        if context_size == 0 {
            return Err(Error::parameter("Context size must be positive"));
        }
        if context_size > (usize::MAX - 1) / 2 {
            return Err(Error::parameter(format!("Context size {} is too large", context_size)));
        }
        self.check_shapes()?;
        Ok(self.pair_at(frame, context_size))
    }

    fn pair_at(&self, frame: usize, context_size: usize) -> FeaturePair {
        let (num_bins, num_channels, _) = self.amplitude.dim();
        let width = 2 * context_size + 1;

        let mut amplitude = Array3::zeros((num_bins, num_channels, width));
        fill_context(amplitude.view_mut(), frame, &self.amplitude);

        // Time-derivative channels first, then frequency-derivative channels
        let mut phase = Array3::zeros((num_bins, 2 * num_channels, width));
        fill_context(
            phase.slice_mut(s![.., ..num_channels, ..]),
            frame,
            &self.dt_phase,
        );
        fill_context(
            phase.slice_mut(s![.., num_channels.., ..]),
            frame,
            &self.df_phase,
        );

        FeaturePair { amplitude, phase }
    }
}

/// Network input for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePair {
    /// `[bin, channel, 2 * context_size + 1]`
    pub amplitude: Array3<f64>,
    /// `[bin, 2 * channel, 2 * context_size + 1]`, time-derivative channels first
    pub phase: Array3<f64>,
}

/// Features of every track, iterable as per-frame context pairs
#[derive(Debug, Clone)]
pub struct FeatureSet {
    tracks: Vec<TrackFeatures>,
    context_size: usize,
}

impl FeatureSet {
    /// Total number of frames over all tracks
    pub fn len(&self) -> usize {
        self.tracks.iter().map(TrackFeatures::num_frames).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    pub fn tracks(&self) -> &[TrackFeatures] {
        &self.tracks
    }

    /// Lazily yield context pairs, track by track, frame by frame
    ///
    /// Each call starts again from the first frame of the first track.
    pub fn iter(&self) -> impl Iterator<Item = FeaturePair> + '_ {
        let context_size = self.context_size;
        self.tracks.iter().flat_map(move |track| {
            (0..track.num_frames()).map(move |frame| track.pair_at(frame, context_size))
        })
    }

    /// The two index-aligned lists of amplitude and phase contexts
    pub fn into_lists(self) -> (Vec<Array3<f64>>, Vec<Array3<f64>>) {
        self.iter().map(|pair| (pair.amplitude, pair.phase)).unzip()
    }

    /// Stack all contexts into `[n, bin, channel, width]` and `[n, bin, 2 * channel, width]`
    pub fn to_tensors(&self) -> Result<(Array4<f64>, Array4<f64>)> {
        if self.is_empty() {
            return Err(Error::shape("Feature set has no frames to stack"));
        }
        let pairs: Vec<FeaturePair> = self.iter().collect();
        let amplitudes: Vec<ArrayView3<f64>> = pairs.iter().map(|p| p.amplitude.view()).collect();
        let phases: Vec<ArrayView3<f64>> = pairs.iter().map(|p| p.phase.view()).collect();
        let amplitude = stack(Axis(0), &amplitudes)
            .map_err(|e| Error::shape(format!("Cannot stack amplitude contexts: {}", e)))?;
        let phase = stack(Axis(0), &phases)
            .map_err(|e| Error::shape(format!("Cannot stack phase contexts: {}", e)))?;
        Ok((amplitude, phase))
    }
}

/// Per-frame amplitude and phase columns of target sources
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    /// `[bin, channel]` per frame, track-major
    pub amplitudes: Vec<Array2<f64>>,
    /// `[bin, channel]` per frame, aligned with `amplitudes`
    pub phases: Vec<Array2<f64>>,
}

impl TargetSet {
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }
}

/// Drives analysis and correction over tracks
pub struct FeatureAssembler {
    analyzer: SpectralAnalyzer,
    corrector: PhaseCorrector,
    context_size: usize,
}

impl FeatureAssembler {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            analyzer: SpectralAnalyzer::new(config)?,
            corrector: PhaseCorrector::new(&config)?,
            context_size: config.context_size,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        self.analyzer.config()
    }

    /// Amplitude and both corrected phase derivatives of one track
    ///
    /// Derivative cells that depend on a silent coefficient are zero, since
    /// the phase of a silent coefficient is undefined.
    pub fn process_track(&self, track: &Track) -> Result<TrackFeatures> {
        let spectrogram = self.analyzer.analyze(track)?;
        let mut dt_phase = self.corrector.time_correct(&spectrogram.phase);
        let mut df_phase = self.corrector.frequency_correct(&spectrogram.phase);
        self.corrector
            .silence_time(&mut dt_phase, &spectrogram.amplitude)?;
        self.corrector
            .silence_frequency(&mut df_phase, &spectrogram.amplitude)?;

        Ok(TrackFeatures {
            amplitude: spectrogram.amplitude,
            dt_phase,
            df_phase,
        })
    }

    /// Process every track, in parallel, keeping input order
    pub fn process_all(&self, tracks: &[Track]) -> Result<FeatureSet> {
        self.process_all_with_context(tracks, self.context_size)
    }

    /// Same as [`process_all`](Self::process_all) with an explicit context size
    pub fn process_all_with_context(
        &self,
        tracks: &[Track],
        context_size: usize,
    ) -> Result<FeatureSet> {
        if context_size == 0 {
            return Err(Error::parameter("Context size must be positive"));
        }

        log::info!(
            "Processing {} tracks (FFT size {}, hop {}, context {})",
            tracks.len(),
            self.config().n_fft,
            self.config().hop_size(),
            context_size
        );

        let features = tracks
            .par_iter()
            .enumerate()
            .map(|(track_idx, track)| -> Result<TrackFeatures> {
                let features = self.process_track(track)?;
                log::info!(
                    "Track {}: {} channels, {:.2}s, {} frames",
                    track_idx,
                    track.num_channels(),
                    track.duration_seconds(),
                    features.num_frames()
                );
                Ok(features)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureSet {
            tracks: features,
            context_size,
        })
    }

    /// Per-frame amplitude and phase of target tracks, aligned with `process_all`
    pub fn process_targets(&self, targets: &[Track]) -> Result<TargetSet> {
        let spectrograms = targets
            .par_iter()
            .map(|track| self.analyzer.analyze(track))
            .collect::<Result<Vec<_>>>()?;

        let mut target_set = TargetSet::default();
        for spectrogram in spectrograms {
            for frame in 0..spectrogram.num_frames() {
                target_set
                    .amplitudes
                    .push(spectrogram.amplitude.slice(s![.., .., frame]).to_owned());
                target_set
                    .phases
                    .push(spectrogram.phase.slice(s![.., .., frame]).to_owned());
            }
        }
        log::info!("Prepared {} target frames", target_set.len());
        Ok(target_set)
    }
}
