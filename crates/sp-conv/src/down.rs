//! Fused blur-and-subsample passes.
//!
//! `down_horizontal_f32` evaluates the kernel only at columns `i * skip` and
//! writes the result to column `i` of a narrower destination; the vertical
//! twin does the same across rows. Building a pyramid layer this way avoids
//! materializing the full-resolution blur first.
//!
//! Borders always renormalize over the in-range taps, so a normalized blur
//! kernel keeps unity gain in every destination pixel.

use sp_core::{Error, ImageView, ImageViewMut};

use crate::kernel::Kernel1D;
use crate::parallel::{Parallelism, for_each_row};

fn check_skip(skip: usize) -> Result<(), Error> {
    if skip == 0 {
        return Err(Error::UnsupportedConfig("skip must be at least 1"));
    }
    Ok(())
}

/// Horizontal blur sampled every `skip` columns, `f32 -> f32`.
///
/// The destination must have the source height and at most
/// `src.width().div_ceil(skip)` columns; a shorter destination simply stops
/// sampling earlier.
pub fn down_horizontal_f32(
    kernel: &Kernel1D<f32>,
    src: &ImageView<'_, f32>,
    dst: &mut ImageViewMut<'_, f32>,
    skip: usize,
    par: &Parallelism,
) -> Result<(), Error> {
    check_skip(skip)?;
    let (width, height) = src.dims();
    let max_cols = width.div_ceil(skip);
    if dst.height() != height || dst.width() > max_cols {
        return Err(Error::ShapeMismatch {
            expected: (max_cols, height),
            actual: dst.dims(),
        });
    }
    if dst.width() == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let offset = kernel.offset();
    let right = kernel.width() - 1 - offset;

    for_each_row(dst, par, |y, row| {
        let src_row = src.row(y);
        for (i, d) in row.iter_mut().enumerate() {
            let x = i * skip;
            if x >= offset && x + right < width {
                let window = &src_row[x - offset..x - offset + taps.len()];
                let mut total = 0.0;
                for (&k, &s) in taps.iter().zip(window) {
                    total += k * s;
                }
                *d = total;
            } else {
                let mut total = 0.0;
                let mut weight = 0.0;
                for (j, &k) in taps.iter().enumerate() {
                    let sx = x as isize - offset as isize + j as isize;
                    if sx >= 0 && (sx as usize) < width {
                        total += k * src_row[sx as usize];
                        weight += k;
                    }
                }
                *d = if weight != 0.0 { total / weight } else { total };
            }
        }
    });
    Ok(())
}

/// Vertical blur sampled every `skip` rows, `f32 -> f32`.
pub fn down_vertical_f32(
    kernel: &Kernel1D<f32>,
    src: &ImageView<'_, f32>,
    dst: &mut ImageViewMut<'_, f32>,
    skip: usize,
    par: &Parallelism,
) -> Result<(), Error> {
    check_skip(skip)?;
    let (width, height) = src.dims();
    let max_rows = height.div_ceil(skip);
    if dst.width() != width || dst.height() > max_rows {
        return Err(Error::ShapeMismatch {
            expected: (width, max_rows),
            actual: dst.dims(),
        });
    }
    if width == 0 || dst.height() == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let offset = kernel.offset();
    let right = kernel.width() - 1 - offset;

    for_each_row(dst, par, |i, row| {
        let y = i * skip;
        if y >= offset && y + right < height {
            let base = y - offset;
            for (d, &s) in row.iter_mut().zip(src.row(base)) {
                *d = taps[0] * s;
            }
            for (j, &k) in taps.iter().enumerate().skip(1) {
                for (d, &s) in row.iter_mut().zip(src.row(base + j)) {
                    *d += k * s;
                }
            }
        } else {
            row.fill(0.0);
            let mut weight = 0.0;
            for (j, &k) in taps.iter().enumerate() {
                let sy = y as isize - offset as isize + j as isize;
                if sy >= 0 && (sy as usize) < height {
                    weight += k;
                    for (d, &s) in row.iter_mut().zip(src.row(sy as usize)) {
                        *d += k * s;
                    }
                }
            }
            if weight != 0.0 {
                for d in row.iter_mut() {
                    *d /= weight;
                }
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{down_horizontal_f32, down_vertical_f32};
    use crate::conv::{horizontal_f32, vertical_f32};
    use crate::gaussian::gaussian_f32;
    use crate::parallel::Parallelism;
    use sp_core::{ConvolveMode, Error, Image};

    fn ramp(width: usize, height: usize) -> Image<f32> {
        let data = (0..width * height)
            .map(|i| ((i * 13 + 1) % 97) as f32)
            .collect();
        Image::from_vec(width, height, data).expect("sized buffer")
    }

    #[test]
    fn matches_full_convolution_at_sampled_columns() {
        let src = ramp(12, 5);
        let k = gaussian_f32(1.0, 2, true);
        let par = Parallelism::serial();

        let mut full = Image::new_fill(12, 5, 0.0f32);
        horizontal_f32(
            &k,
            &src.as_view(),
            &mut full.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("full");

        let mut down = Image::new_fill(6, 5, 0.0f32);
        down_horizontal_f32(&k, &src.as_view(), &mut down.as_view_mut(), 2, &par)
            .expect("down");

        for y in 0..5 {
            for i in 0..6 {
                let a = down.as_view().get(i, y).copied().expect("in bounds");
                let b = full.as_view().get(i * 2, y).copied().expect("in bounds");
                assert!((a - b).abs() < 1e-5, "({i},{y}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn matches_full_convolution_at_sampled_rows() {
        let src = ramp(7, 10);
        let k = gaussian_f32(1.0, 2, true);
        let par = Parallelism::serial();

        let mut full = Image::new_fill(7, 10, 0.0f32);
        vertical_f32(
            &k,
            &src.as_view(),
            &mut full.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("full");

        let mut down = Image::new_fill(7, 5, 0.0f32);
        down_vertical_f32(&k, &src.as_view(), &mut down.as_view_mut(), 2, &par)
            .expect("down");

        for i in 0..5 {
            for x in 0..7 {
                let a = down.as_view().get(x, i).copied().expect("in bounds");
                let b = full.as_view().get(x, i * 2).copied().expect("in bounds");
                assert!((a - b).abs() < 1e-5, "({x},{i}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn floor_sized_destination_is_accepted() {
        // 11 columns at skip 2 can host up to 6 samples; 5 is also fine.
        let src = ramp(11, 3);
        let k = gaussian_f32(1.0, 1, true);
        let par = Parallelism::serial();

        let mut down = Image::new_fill(5, 3, 0.0f32);
        down_horizontal_f32(&k, &src.as_view(), &mut down.as_view_mut(), 2, &par)
            .expect("down");

        let mut too_wide = Image::new_fill(7, 3, 0.0f32);
        let err = down_horizontal_f32(&k, &src.as_view(), &mut too_wide.as_view_mut(), 2, &par);
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn zero_skip_is_rejected() {
        let src = ramp(4, 4);
        let k = gaussian_f32(1.0, 1, true);
        let mut dst = Image::new_fill(4, 4, 0.0f32);
        let err = down_horizontal_f32(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            0,
            &Parallelism::serial(),
        );
        assert!(matches!(err, Err(Error::UnsupportedConfig(_))));
    }
}
