//! Phase-context feature library
//!
//! Turns audio tracks into windowed spectral feature tensors (amplitude
//! contexts and drift-corrected phase-derivative contexts) for a downstream
//! estimator, and resynthesizes audio from amplitude and phase arrays.
//!
//! Spectral arrays are indexed `[frequency_bin, channel, time_frame]`.

pub mod analyzer;
pub mod assembler;
pub mod audio_io;
pub mod config;
pub mod context;
pub mod error;
pub mod phase;
pub mod reconstruct;
pub mod stft;
pub mod track;
pub mod utils;
#[cfg(feature = "image")]
pub mod visualization;
pub mod window;

pub use analyzer::{SpectralAnalyzer, Spectrogram};
pub use assembler::{FeatureAssembler, FeaturePair, FeatureSet, TargetSet, TrackFeatures};
pub use config::PipelineConfig;
pub use context::extract_context;
pub use error::Error;
pub use num_complex::Complex64;
pub use phase::{frequency_diff, time_diff, wrap, PhaseCorrector};
pub use realfft; // Re-export realfft for callers that plan their own transforms
pub use reconstruct::AudioReconstructor;
pub use track::Track;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
///
/// Sets up logging when the `env_logger` feature is enabled. Safe to call
/// more than once.
pub fn init() {
    #[cfg(feature = "env_logger")]
    {
        let _ = env_logger::try_init();
    }
}

/// Result type for feature pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
