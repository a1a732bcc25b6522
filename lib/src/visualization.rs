//! Image rendering of feature maps for inspection
//!
//! One channel of a `[bin, channel, frame]` array becomes an image with time
//! on the horizontal axis and frequency rising upwards.

use crate::assembler::TrackFeatures;
use crate::error::Error;
use crate::Result;
use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, Axis};
use std::f64::consts::PI;
use std::path::Path;
use std::str::FromStr;

/// Which feature array to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureMap {
    /// Amplitude in dB
    Amplitude,
    /// Corrected time derivative of the phase
    TimeDerivative,
    /// Corrected frequency derivative of the phase
    FrequencyDerivative,
}

impl FromStr for FeatureMap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amplitude" => Ok(FeatureMap::Amplitude),
            "dt" => Ok(FeatureMap::TimeDerivative),
            "df" => Ok(FeatureMap::FrequencyDerivative),
            _ => Err(Error::parameter(format!(
                "Unknown feature map '{}' (expected amplitude, dt or df)",
                s
            ))),
        }
    }
}

/// Color map types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMap {
    Viridis,
    Grayscale,
    Jet,
}

/// Convert a value (0.0 to 1.0) to RGB color using the specified colormap
fn value_to_color(value: f64, colormap: ColorMap) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);

    match colormap {
        ColorMap::Viridis => {
            let r = (v * v * v * 0.3 + v * 0.1) * 255.0;
            let g = (v.sqrt() * 0.8 + v * 0.2) * 255.0;
            let b = (v.powf(0.3) * 0.9 + v * 0.1) * 255.0;
            Rgb([r as u8, g as u8, b as u8])
        }
        ColorMap::Grayscale => {
            let gray = (v * 255.0) as u8;
            Rgb([gray, gray, gray])
        }
        ColorMap::Jet => {
            let channel = |centre: f64| (1.5 - (4.0 * v - centre).abs()).clamp(0.0, 1.0);
            Rgb([
                (channel(3.0) * 255.0) as u8,
                (channel(2.0) * 255.0) as u8,
                (channel(1.0) * 255.0) as u8,
            ])
        }
    }
}

/// Options for feature image generation
#[derive(Debug, Clone)]
pub struct FeatureImageOptions {
    pub width: u32,
    pub height: u32,
    pub colormap: ColorMap,
    /// Dynamic range below the peak for amplitude maps
    pub dynamic_range_db: f64,
    /// Channel of the feature array to draw
    pub channel: usize,
}

impl Default for FeatureImageOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            colormap: ColorMap::Viridis,
            dynamic_range_db: 80.0,
            channel: 0,
        }
    }
}

/// Map one feature of a track to values in [0, 1]
fn normalized(
    features: &TrackFeatures,
    map: FeatureMap,
    options: &FeatureImageOptions,
) -> Array3<f64> {
    match map {
        FeatureMap::Amplitude => {
            let db = features
                .amplitude
                .mapv(|a| if a > 0.0 { 20.0 * a.log10() } else { f64::NEG_INFINITY });
            let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let floor = peak - options.dynamic_range_db;
            db.mapv(|d| {
                if peak.is_finite() {
                    ((d - floor) / options.dynamic_range_db).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
        }
        FeatureMap::TimeDerivative => features.dt_phase.mapv(|p| (p + PI) / (2.0 * PI)),
        FeatureMap::FrequencyDerivative => features.df_phase.mapv(|p| (p + PI) / (2.0 * PI)),
    }
}

/// Render one channel of a feature map
pub fn generate_feature_image(
    features: &TrackFeatures,
    map: FeatureMap,
    options: &FeatureImageOptions,
) -> Result<RgbImage> {
    features.check_shapes()?;
    let (num_bins, num_channels, num_frames) = features.amplitude.dim();
    if options.channel >= num_channels {
        return Err(Error::parameter(format!(
            "Channel {} out of range (0..{})",
            options.channel, num_channels
        )));
    }
    if num_bins == 0 || num_frames == 0 || options.width == 0 || options.height == 0 {
        return Err(Error::shape("Nothing to render"));
    }

    let values = normalized(features, map, options);
    let channel = values.index_axis(Axis(1), options.channel);

    let mut img = ImageBuffer::new(options.width, options.height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let frame = (x as usize * num_frames) / options.width as usize;
        let row_from_bottom = (options.height - 1 - y) as usize;
        let bin = (row_from_bottom * num_bins) / options.height as usize;
        *pixel = value_to_color(channel[[bin, frame]], options.colormap);
    }
    Ok(img)
}

/// Render one channel of a feature map and save it as an image file
pub fn save_feature_image<P: AsRef<Path>>(
    features: &TrackFeatures,
    map: FeatureMap,
    options: &FeatureImageOptions,
    path: P,
) -> Result<()> {
    let img = generate_feature_image(features, map, options)?;
    img.save(path.as_ref()).map_err(|e| {
        Error::io(format!("Failed to save {}: {}", path.as_ref().display(), e))
    })?;
    log::info!(
        "Saved {:?} map ({}x{}) to {}",
        map,
        options.width,
        options.height,
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> TrackFeatures {
        let amplitude = Array3::from_shape_fn((8, 2, 6), |(k, _, t)| (k + t) as f64 * 0.1);
        TrackFeatures {
            dt_phase: Array3::from_elem((8, 2, 6), PI),
            df_phase: Array3::from_elem((8, 2, 6), -PI / 2.0),
            amplitude,
        }
    }

    #[test]
    fn test_render_dimensions() {
        let options = FeatureImageOptions {
            width: 40,
            height: 30,
            ..Default::default()
        };
        for map in [
            FeatureMap::Amplitude,
            FeatureMap::TimeDerivative,
            FeatureMap::FrequencyDerivative,
        ] {
            let img = generate_feature_image(&features(), map, &options).unwrap();
            assert_eq!(img.dimensions(), (40, 30));
        }
    }

    #[test]
    fn test_phase_maps_use_full_range() {
        let options = FeatureImageOptions {
            width: 4,
            height: 4,
            colormap: ColorMap::Grayscale,
            ..Default::default()
        };
        let img = generate_feature_image(&features(), FeatureMap::TimeDerivative, &options).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        let img =
            generate_feature_image(&features(), FeatureMap::FrequencyDerivative, &options).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[0], 63);
    }

    #[test]
    fn test_render_errors() {
        let options = FeatureImageOptions {
            channel: 2,
            ..Default::default()
        };
        assert!(generate_feature_image(&features(), FeatureMap::Amplitude, &options).is_err());

        let mut ragged = features();
        ragged.df_phase = Array3::zeros((7, 2, 6));
        assert!(matches!(
            generate_feature_image(&ragged, FeatureMap::FrequencyDerivative, &Default::default()),
            Err(Error::InvalidShape(_))
        ));
        assert!("phase".parse::<FeatureMap>().is_err());
        assert_eq!("dt".parse::<FeatureMap>().unwrap(), FeatureMap::TimeDerivative);
    }
}
