//! Symmetric context windows along the time axis

use crate::error::Error;
use crate::Result;
use ndarray::{s, Array3, ArrayBase, ArrayViewMut3, Axis, Data, Ix3};

/// Extract `2 * context_size + 1` frames centred on `index`
///
/// Frames that fall before the first or after the last frame of `array` are
/// zero-filled. Any `index` is accepted; an index far outside the array
/// yields an all-zero window.
pub fn extract_context<S>(
    index: usize,
    array: &ArrayBase<S, Ix3>,
    context_size: usize,
) -> Result<Array3<f64>>
where
    S: Data<Elem = f64>,
{
    if context_size == 0 {
        return Err(Error::parameter("Context size must be positive"));
    }

    let width = context_size
        .checked_mul(2)
        .and_then(|w| w.checked_add(1))
        .ok_or_else(|| Error::parameter(format!("Context size {} is too large", context_size)))?;

    let (num_bins, num_channels, _) = array.dim();
    let mut context = Array3::zeros((num_bins, num_channels, width));
    fill_context(context.view_mut(), index, array);
    Ok(context)
}

/// Copy the frames of `array` around `index` into a zeroed window
///
/// The window width is the time length of `window`, which must be odd and
/// share the non-time axes of `array`.
pub(crate) fn fill_context<S>(
    mut window: ArrayViewMut3<'_, f64>,
    index: usize,
    array: &ArrayBase<S, Ix3>,
)
where
    S: Data<Elem = f64>,
{
    let num_frames = array.len_of(Axis(2));
    let context_size = window.len_of(Axis(2)) / 2;

    // Window covers source frames [index - context_size, index + context_size]
    if index >= num_frames.saturating_add(context_size) {
        return;
    }
    let src_start = index.saturating_sub(context_size);
    let src_end = index.saturating_add(context_size + 1).min(num_frames);
    if src_start < src_end {
        let dst_start = src_start + context_size - index;
        let dst_end = dst_start + (src_end - src_start);
        window
            .slice_mut(s![.., .., dst_start..dst_end])
            .assign(&array.slice(s![.., .., src_start..src_end]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every cell holds `frame + 1` so zero padding is distinguishable
    fn ramp(bins: usize, channels: usize, frames: usize) -> Array3<f64> {
        Array3::from_shape_fn((bins, channels, frames), |(_, _, t)| t as f64 + 1.0)
    }

    #[test]
    fn test_context_width_everywhere() {
        let array = ramp(3, 2, 7);
        for context_size in 1..5 {
            for index in 0..12 {
                let context = extract_context(index, &array, context_size).unwrap();
                assert_eq!(
                    context.dim(),
                    (3, 2, 2 * context_size + 1),
                    "index {}, context {}",
                    index,
                    context_size
                );
            }
        }
    }

    #[test]
    fn test_interior_slice() {
        let array = ramp(2, 1, 10);
        let context = extract_context(5, &array, 2).unwrap();
        assert_eq!(context, array.slice(s![.., .., 3..8]));
    }

    #[test]
    fn test_leading_edge_padding() {
        let array = ramp(2, 2, 10);
        let context = extract_context(0, &array, 3).unwrap();
        assert!(context.slice(s![.., .., ..3]).iter().all(|&v| v == 0.0));
        assert_eq!(context.slice(s![.., .., 3..]), array.slice(s![.., .., ..4]));

        let context = extract_context(1, &array, 3).unwrap();
        assert!(context.slice(s![.., .., ..2]).iter().all(|&v| v == 0.0));
        assert_eq!(context[[0, 0, 2]], 1.0);
    }

    #[test]
    fn test_trailing_edge_padding() {
        let array = ramp(2, 2, 10);
        let context = extract_context(9, &array, 3).unwrap();
        assert_eq!(context.slice(s![.., .., ..4]), array.slice(s![.., .., 6..]));
        assert!(context.slice(s![.., .., 4..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_window_wider_than_array() {
        let array = ramp(1, 1, 2);
        let context = extract_context(0, &array, 3).unwrap();
        let values: Vec<f64> = context.iter().copied().collect();
        assert_eq!(values, vec![0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0]);

        let beyond = extract_context(20, &array, 3).unwrap();
        assert!(beyond.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extreme_index_is_all_zero() {
        let array = Array3::from_elem((2, 1, 5), 1.0);
        for index in [usize::MAX, usize::MAX - 1, isize::MAX as usize + 1, 7, 8] {
            let context = extract_context(index, &array, 2).unwrap();
            assert_eq!(context.dim(), (2, 1, 5), "index {}", index);
            assert!(context.iter().all(|&v| v == 0.0), "index {}", index);
        }

        // Last in-range slot: index 6 still reaches frame 4
        let context = extract_context(6, &array, 2).unwrap();
        assert_eq!(context[[0, 0, 0]], 1.0);
        assert!(context.slice(s![.., .., 1..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_oversized_context_rejected() {
        let array = ramp(1, 1, 4);
        assert!(matches!(
            extract_context(0, &array, usize::MAX),
            Err(Error::Parameter(_))
        ));
    }

    #[test]
    fn test_zero_context_rejected() {
        let array = ramp(1, 1, 4);
        assert!(matches!(
            extract_context(0, &array, 0),
            Err(Error::Parameter(_))
        ));
    }
}
