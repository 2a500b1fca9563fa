//! Row-parallel execution policy.
//!
//! Every convolution entry point takes a [`Parallelism`] value instead of
//! consulting global state, so two pipelines in one process can run with
//! different policies. With the `rayon` feature disabled the type still
//! exists and everything runs serially.

use sp_core::ImageViewMut;

/// Decides whether an operation fans out across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parallelism {
    /// Master switch; `false` forces the serial path.
    pub enabled: bool,
    /// Images smaller than this many pixels always run serially. Fan-out
    /// overhead dominates on small inputs.
    pub min_pixels: usize,
}

impl Default for Parallelism {
    fn default() -> Self {
        Self {
            enabled: true,
            min_pixels: 128 * 128,
        }
    }
}

impl Parallelism {
    pub fn serial() -> Self {
        Self {
            enabled: false,
            min_pixels: usize::MAX,
        }
    }

    /// Whether an image of `pixels` total pixels should run in parallel.
    pub fn active(&self, pixels: usize) -> bool {
        self.enabled && pixels >= self.min_pixels
    }
}

/// Runs `f(y, row)` for every row of `dst`.
///
/// The parallel path requires a contiguous destination so rows can be handed
/// out as disjoint chunks; strided destinations fall back to the serial loop.
pub fn for_each_row<T, F>(dst: &mut ImageViewMut<'_, T>, par: &Parallelism, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    let (width, height) = dst.dims();
    if width == 0 || height == 0 {
        return;
    }

    #[cfg(feature = "rayon")]
    if par.active(width * height)
        && let Some(slice) = dst.as_contiguous_slice_mut()
    {
        use rayon::prelude::*;
        slice
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
        return;
    }
    #[cfg(not(feature = "rayon"))]
    let _ = par;

    for y in 0..height {
        f(y, dst.row_mut(y));
    }
}

#[cfg(test)]
mod tests {
    use super::{Parallelism, for_each_row};
    use sp_core::ImageViewMut;

    #[test]
    fn activation_thresholds() {
        let par = Parallelism {
            enabled: true,
            min_pixels: 100,
        };
        assert!(!par.active(99));
        assert!(par.active(100));
        assert!(!Parallelism::serial().active(usize::MAX));
    }

    #[test]
    fn visits_every_row_once() {
        let mut data = vec![0u32; 4 * 3];
        let mut dst = ImageViewMut::from_slice_mut(4, 3, 4, &mut data).expect("valid view");
        for_each_row(&mut dst, &Parallelism::default(), |y, row| {
            row.fill(y as u32 + 1);
        });
        assert_eq!(data, vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn strided_destination_still_covered() {
        let mut data = vec![9u32; 5 * 3];
        let mut dst = ImageViewMut::from_slice_mut(4, 3, 5, &mut data).expect("valid view");
        for_each_row(&mut dst, &Parallelism::default(), |y, row| {
            row.fill(y as u32);
        });
        // Padding column untouched.
        assert_eq!(data[4], 9);
        assert_eq!(data[5..9], [1, 1, 1, 1]);
    }
}
