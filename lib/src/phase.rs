//! Circular phase derivatives and their drift correction
//!
//! Phase is only meaningful modulo 2π, so every difference is wrapped back
//! into (-π, π] before any further arithmetic. The corrected derivatives
//! subtract the advance explained by the STFT sampling grid itself, leaving
//! the unexpected phase motion.

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::Result;
use ndarray::{s, Array1, Array3, ArrayBase, ArrayD, ArrayView3, Axis, Data, Ix3, Zip};
use std::f64::consts::{PI, TAU};

/// Map any real value into (-π, π]
///
/// Agrees with `((x - π) mod 2π) - π` except at the boundary, which is
/// sent to `+π`.
pub fn wrap(x: f64) -> f64 {
    let wrapped = PI - (PI - x).rem_euclid(TAU);
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// View a dynamically shaped array as `[bin, channel, frame]`
pub fn spectral_view(array: &ArrayD<f64>) -> Result<ArrayView3<'_, f64>> {
    array.view().into_dimensionality::<Ix3>().map_err(|_| {
        Error::shape(format!(
            "Expected a 3-D [bin, channel, frame] array, got shape {:?}",
            array.shape()
        ))
    })
}

/// Wrapped first difference along the time axis
///
/// Frame 0 is zero; frame `i` holds `phase[.., .., i] - phase[.., .., i - 1]`.
pub fn time_diff<S>(phase: &ArrayBase<S, Ix3>) -> Array3<f64>
where
    S: Data<Elem = f64>,
{
    let mut diff = Array3::zeros(phase.raw_dim());
    if phase.len_of(Axis(2)) > 1 {
        Zip::from(diff.slice_mut(s![.., .., 1..]))
            .and(phase.slice(s![.., .., 1..]))
            .and(phase.slice(s![.., .., ..-1]))
            .for_each(|d, &current, &previous| *d = wrap(current - previous));
    }
    diff
}

/// Wrapped first difference along the frequency-bin axis
///
/// Bin 0 is zero; bin `k` holds `phase[k, .., ..] - phase[k - 1, .., ..]`.
pub fn frequency_diff<S>(phase: &ArrayBase<S, Ix3>) -> Array3<f64>
where
    S: Data<Elem = f64>,
{
    let mut diff = Array3::zeros(phase.raw_dim());
    if phase.len_of(Axis(0)) > 1 {
        Zip::from(diff.slice_mut(s![1.., .., ..]))
            .and(phase.slice(s![1.., .., ..]))
            .and(phase.slice(s![..-1, .., ..]))
            .for_each(|d, &current, &lower| *d = wrap(current - lower));
    }
    diff
}

/// Drift correction of phase derivatives for one frame/hop geometry
#[derive(Debug, Clone, Copy)]
pub struct PhaseCorrector {
    hop_ratio: f64,
    frequency_offset: f64,
    silence_threshold: f64,
}

impl PhaseCorrector {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            hop_ratio: config.hop_size() as f64 / config.n_fft as f64,
            frequency_offset: config.frequency_offset,
            silence_threshold: config.silence_threshold,
        })
    }

    /// Expected per-hop phase advance of every bin: `2π·k·hop / n_fft`
    pub fn expected_time_advance(&self, num_bins: usize) -> Array1<f64> {
        Array1::from_shape_fn(num_bins, |k| TAU * k as f64 * self.hop_ratio)
    }

    /// Time derivative minus each bin's expected advance, re-wrapped
    pub fn time_correct<S>(&self, phase: &ArrayBase<S, Ix3>) -> Array3<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut dt_phase = time_diff(phase);
        let advance = self.expected_time_advance(dt_phase.len_of(Axis(0)));
        let advance = advance.view().insert_axis(Axis(1)).insert_axis(Axis(2));
        dt_phase -= &advance;
        dt_phase.mapv_inplace(wrap);
        dt_phase
    }

    /// Frequency derivative plus the configured offset, re-wrapped
    pub fn frequency_correct<S>(&self, phase: &ArrayBase<S, Ix3>) -> Array3<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut df_phase = frequency_diff(phase);
        let offset = self.frequency_offset;
        df_phase.mapv_inplace(|x| wrap(x + offset));
        df_phase
    }

    /// Zero time-derivative cells computed from a silent frame or its predecessor
    pub fn silence_time(&self, dt_phase: &mut Array3<f64>, amplitude: &Array3<f64>) -> Result<()> {
        check_same_shape(dt_phase, amplitude)?;
        let silent = amplitude.mapv(|a| a <= self.silence_threshold);
        Zip::indexed(dt_phase).for_each(|(k, c, t), d| {
            if silent[[k, c, t]] || (t > 0 && silent[[k, c, t - 1]]) {
                *d = 0.0;
            }
        });
        Ok(())
    }

    /// Zero frequency-derivative cells computed from a silent bin or the bin below
    pub fn silence_frequency(
        &self,
        df_phase: &mut Array3<f64>,
        amplitude: &Array3<f64>,
    ) -> Result<()> {
        check_same_shape(df_phase, amplitude)?;
        let silent = amplitude.mapv(|a| a <= self.silence_threshold);
        Zip::indexed(df_phase).for_each(|(k, c, t), d| {
            if silent[[k, c, t]] || (k > 0 && silent[[k - 1, c, t]]) {
                *d = 0.0;
            }
        });
        Ok(())
    }
}

fn check_same_shape(derivative: &Array3<f64>, amplitude: &Array3<f64>) -> Result<()> {
    if derivative.shape() != amplitude.shape() {
        return Err(Error::shape(format!(
            "Derivative shape {:?} does not match amplitude shape {:?}",
            derivative.shape(),
            amplitude.shape()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_phase(rng: &mut StdRng, shape: (usize, usize, usize)) -> Array3<f64> {
        Array3::from_shape_fn(shape, |_| rng.random_range(-PI..PI))
    }

    fn circular_distance(a: f64, b: f64) -> f64 {
        wrap(a - b).abs()
    }

    fn corrector(n_fft: usize, n_overlap: usize) -> PhaseCorrector {
        PhaseCorrector::new(&PipelineConfig::new(n_fft, n_overlap, 44100, 2).unwrap()).unwrap()
    }

    #[test]
    fn test_wrap_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let x = rng.random_range(-100.0..100.0);
            let w = wrap(x);
            assert!(w > -PI && w <= PI, "wrap({}) = {} out of range", x, w);
        }

        assert_eq!(wrap(PI), PI);
        assert_eq!(wrap(-PI), PI);
        assert_eq!(wrap(0.0), 0.0);
        assert!((wrap(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_periodic() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let x = rng.random_range(-10.0..10.0);
            let n = rng.random_range(-20i32..20) as f64;
            let shifted = wrap(x + TAU * n);
            assert!(
                circular_distance(shifted, wrap(x)) < 1e-9,
                "wrap not 2π-periodic at x = {}, n = {}",
                x,
                n
            );
        }
    }

    #[test]
    fn test_diffs_preserve_shape_and_zero_boundary() {
        let mut rng = StdRng::seed_from_u64(3);
        let phase = random_phase(&mut rng, (9, 2, 13));
        let corrector = corrector(16, 8);

        let dt = time_diff(&phase);
        let df = frequency_diff(&phase);
        assert_eq!(dt.dim(), phase.dim());
        assert_eq!(df.dim(), phase.dim());
        assert_eq!(corrector.time_correct(&phase).dim(), phase.dim());
        assert_eq!(corrector.frequency_correct(&phase).dim(), phase.dim());

        assert!(dt.slice(s![.., .., 0]).iter().all(|&v| v == 0.0));
        assert!(df.slice(s![0, .., ..]).iter().all(|&v| v == 0.0));
        assert!(dt.iter().chain(df.iter()).all(|&v| v > -PI && v <= PI));
    }

    #[test]
    fn test_time_diff_wraps_across_boundary() {
        // A small step across ±π must not appear as a near-2π jump
        let phase = Array3::from_shape_vec((1, 1, 3), vec![PI - 0.1, -PI + 0.1, -PI + 0.3]).unwrap();
        let dt = time_diff(&phase);
        assert!((dt[[0, 0, 1]] - 0.2).abs() < 1e-12);
        assert!((dt[[0, 0, 2]] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_diff_values() {
        let phase = Array3::from_shape_fn((4, 2, 3), |(k, c, _)| 0.25 * k as f64 + c as f64);
        let df = frequency_diff(&phase);
        for k in 1..4 {
            for c in 0..2 {
                assert!((df[[k, c, 1]] - 0.25).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_expected_advance_is_per_bin() {
        let corrector = corrector(2048, 1024);
        let advance = corrector.expected_time_advance(4);
        let expected = [0.0, PI, TAU, 3.0 * PI];
        for (k, (&a, &e)) in advance.iter().zip(expected.iter()).enumerate() {
            assert!((a - e).abs() < 1e-12, "bin {}: {} != {}", k, a, e);
        }
    }

    #[test]
    fn test_time_correct_removes_grid_advance() {
        // Stationary bin-centred partials advance by exactly the expected amount
        let corrector = corrector(64, 48);
        let (bins, channels, frames) = (33, 2, 10);
        let advance = corrector.expected_time_advance(bins);
        let phase = Array3::from_shape_fn((bins, channels, frames), |(k, _, t)| {
            wrap(advance[k] * t as f64 + 0.3)
        });

        let corrected = corrector.time_correct(&phase);
        for k in 0..bins {
            for c in 0..channels {
                // Frame 0 has no predecessor: only the expected advance remains
                assert!(circular_distance(corrected[[k, c, 0]], -advance[k]) < 1e-9);
                for t in 1..frames {
                    assert!(
                        circular_distance(corrected[[k, c, t]], 0.0) < 1e-9,
                        "bin {}, frame {}: {}",
                        k,
                        t,
                        corrected[[k, c, t]]
                    );
                }
            }
        }
    }

    #[test]
    fn test_frequency_correct_centred_window() {
        // A frame-centred event alternates phase by -π per bin
        let corrector = corrector(64, 32);
        let phase = Array3::from_shape_fn((33, 1, 4), |(k, _, _)| wrap(-PI * k as f64));
        let corrected = corrector.frequency_correct(&phase);

        assert!(corrected.slice(s![0, .., ..]).iter().all(|&v| v == PI));
        for &v in corrected.slice(s![1.., .., ..]).iter() {
            assert!(circular_distance(v, 0.0) < 1e-9, "residual {}", v);
        }
    }

    #[test]
    fn test_frequency_offset_is_configurable() {
        let config = PipelineConfig::default().with_frequency_offset(0.0).unwrap();
        let corrector = PhaseCorrector::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let phase = random_phase(&mut rng, (5, 1, 4));
        let corrected = corrector.frequency_correct(&phase);
        for (&a, &b) in corrected.iter().zip(frequency_diff(&phase).iter()) {
            assert!(circular_distance(a, b) < 1e-12);
        }
    }

    #[test]
    fn test_silence_masks() {
        let corrector = corrector(16, 8);
        let mut rng = StdRng::seed_from_u64(9);
        let phase = random_phase(&mut rng, (4, 1, 5));
        let mut amplitude = Array3::from_elem((4, 1, 5), 1.0);
        amplitude[[2, 0, 3]] = 0.0;

        let mut dt = corrector.time_correct(&phase);
        corrector.silence_time(&mut dt, &amplitude).unwrap();
        assert_eq!(dt[[2, 0, 3]], 0.0);
        assert_eq!(dt[[2, 0, 4]], 0.0);
        assert_ne!(dt[[2, 0, 2]], 0.0);

        let mut df = corrector.frequency_correct(&phase);
        corrector.silence_frequency(&mut df, &amplitude).unwrap();
        assert_eq!(df[[2, 0, 3]], 0.0);
        assert_eq!(df[[3, 0, 3]], 0.0);
        assert_ne!(df[[1, 0, 3]], 0.0);

        let wrong = Array3::zeros((3, 1, 5));
        assert!(matches!(
            corrector.silence_time(&mut dt, &wrong),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn test_spectral_view_rejects_other_ranks() {
        let flat = ArrayD::<f64>::zeros(IxDyn(&[4, 5]));
        assert!(matches!(spectral_view(&flat), Err(Error::InvalidShape(_))));

        let cube = ArrayD::<f64>::zeros(IxDyn(&[4, 2, 5]));
        let view = spectral_view(&cube).unwrap();
        assert_eq!(time_diff(&view).dim(), (4, 2, 5));
    }
}
