//! Separable and dense convolution over image views.
//!
//! All routines use the correlation orientation:
//! `out(x) = sum_j k[j] * src(x - offset + j)`, with `offset` taken from the
//! kernel. Border pixels follow the requested [`ConvolveMode`]:
//!
//! - `Skip` leaves them untouched, so the caller sees exactly which pixels
//!   hold valid responses;
//! - `Extend` clamps out-of-range source indices to the nearest edge;
//! - `Normalize` sums only in-range taps and renormalizes by their weight,
//!   which keeps unity gain for blur kernels right up to the edge.
//!
//! Integer paths accumulate in `i32`. The `u8 -> u8` blur variants divide by
//! an explicit divisor with round-half-up, matching the integer Gaussian
//! kernels from [`crate::gaussian`].

use sp_core::{ConvolveMode, Error, ImageView, ImageViewMut, ensure_same_dims, extend_index};

use crate::kernel::{Kernel1D, Kernel2D};
use crate::parallel::{Parallelism, for_each_row};

/// Interior column range `[lo, hi)` for a kernel of `kw` taps at `offset`.
fn interior(width: usize, kw: usize, offset: usize) -> (usize, usize) {
    let lo = offset.min(width);
    let hi = width.saturating_sub(kw - 1 - offset).max(lo);
    (lo, hi)
}

/// Horizontal pass, `f32 -> f32`.
pub fn horizontal_f32(
    kernel: &Kernel1D<f32>,
    src: &ImageView<'_, f32>,
    dst: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(width, kw, offset);

    for_each_row(dst, par, |y, row| {
        let src_row = src.row(y);

        for x in lo..hi {
            let window = &src_row[x - offset..x - offset + kw];
            let mut total = 0.0;
            for (&k, &s) in taps.iter().zip(window) {
                total += k * s;
            }
            row[x] = total;
        }

        if mode == ConvolveMode::Skip {
            return;
        }
        for x in (0..lo).chain(hi..width) {
            row[x] = border_tap_f32(taps, offset, src_row, width, x, mode);
        }
    });
    Ok(())
}

fn border_tap_f32(
    taps: &[f32],
    offset: usize,
    src_row: &[f32],
    width: usize,
    x: usize,
    mode: ConvolveMode,
) -> f32 {
    match mode {
        ConvolveMode::Skip => unreachable!("skip never reaches border evaluation"),
        ConvolveMode::Extend => {
            let mut total = 0.0;
            for (j, &k) in taps.iter().enumerate() {
                let sx = extend_index(x as isize - offset as isize + j as isize, width);
                total += k * src_row[sx];
            }
            total
        }
        ConvolveMode::Normalize => {
            let mut total = 0.0;
            let mut weight = 0.0;
            for (j, &k) in taps.iter().enumerate() {
                let sx = x as isize - offset as isize + j as isize;
                if sx >= 0 && (sx as usize) < width {
                    total += k * src_row[sx as usize];
                    weight += k;
                }
            }
            if weight != 0.0 { total / weight } else { total }
        }
    }
}

/// Vertical pass, `f32 -> f32`.
pub fn vertical_f32(
    kernel: &Kernel1D<f32>,
    src: &ImageView<'_, f32>,
    dst: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(height, kw, offset);

    for_each_row(dst, par, |y, row| {
        if y >= lo && y < hi {
            let base = y - offset;
            let first = src.row(base);
            for (d, &s) in row.iter_mut().zip(first) {
                *d = taps[0] * s;
            }
            for (j, &k) in taps.iter().enumerate().skip(1) {
                for (d, &s) in row.iter_mut().zip(src.row(base + j)) {
                    *d += k * s;
                }
            }
            return;
        }

        match mode {
            ConvolveMode::Skip => {}
            ConvolveMode::Extend => {
                let sy = extend_index(y as isize - offset as isize, height);
                for (d, &s) in row.iter_mut().zip(src.row(sy)) {
                    *d = taps[0] * s;
                }
                for (j, &k) in taps.iter().enumerate().skip(1) {
                    let sy = extend_index(y as isize - offset as isize + j as isize, height);
                    for (d, &s) in row.iter_mut().zip(src.row(sy)) {
                        *d += k * s;
                    }
                }
            }
            ConvolveMode::Normalize => {
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
        }
    });
    Ok(())
}

/// Dense 2D convolution, `f32 -> f32`.
///
/// Used to validate the separable paths; prefer a horizontal plus a vertical
/// pass when the kernel factors.
pub fn convolve2d_f32(
    kernel: &Kernel2D<f32>,
    src: &ImageView<'_, f32>,
    dst: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let kw = kernel.width();
    let offset = kernel.offset();
    let (xlo, xhi) = interior(width, kw, offset);
    let (ylo, yhi) = interior(height, kw, offset);

    for_each_row(dst, par, |y, row| {
        let y_interior = y >= ylo && y < yhi;

        for x in 0..width {
            let x_interior = x >= xlo && x < xhi;
            if x_interior && y_interior {
                let mut total = 0.0;
                for ky in 0..kw {
                    let src_row = src.row(y - offset + ky);
                    let window = &src_row[x - offset..x - offset + kw];
                    for (kx, &s) in window.iter().enumerate() {
                        total += kernel.get(kx, ky) * s;
                    }
                }
                row[x] = total;
                continue;
            }

            match mode {
                ConvolveMode::Skip => {}
                ConvolveMode::Extend => {
                    let mut total = 0.0;
                    for ky in 0..kw {
                        let sy = extend_index(y as isize - offset as isize + ky as isize, height);
                        let src_row = src.row(sy);
                        for kx in 0..kw {
                            let sx =
                                extend_index(x as isize - offset as isize + kx as isize, width);
                            total += kernel.get(kx, ky) * src_row[sx];
                        }
                    }
                    row[x] = total;
                }
                ConvolveMode::Normalize => {
                    let mut total = 0.0;
                    let mut weight = 0.0;
                    for ky in 0..kw {
                        let sy = y as isize - offset as isize + ky as isize;
                        if sy < 0 || sy as usize >= height {
                            continue;
                        }
                        let src_row = src.row(sy as usize);
                        for kx in 0..kw {
                            let sx = x as isize - offset as isize + kx as isize;
                            if sx < 0 || sx as usize >= width {
                                continue;
                            }
                            let k = kernel.get(kx, ky);
                            total += k * src_row[sx as usize];
                            weight += k;
                        }
                    }
                    row[x] = if weight != 0.0 { total / weight } else { total };
                }
            }
        }
    });
    Ok(())
}

/// Horizontal pass, `u8 -> i16` with `i32` accumulation.
///
/// `Normalize` has no meaning without an explicit divisor; use
/// [`horizontal_u8_u8_div`] for normalized integer blurs.
pub fn horizontal_u8_i16(
    kernel: &Kernel1D<i32>,
    src: &ImageView<'_, u8>,
    dst: &mut ImageViewMut<'_, i16>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    if mode == ConvolveMode::Normalize {
        return Err(Error::UnsupportedConfig(
            "normalized borders require a divisor; use the u8 -> u8 variants",
        ));
    }
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(width, kw, offset);

    for_each_row(dst, par, |y, row| {
        let src_row = src.row(y);

        for x in lo..hi {
            let window = &src_row[x - offset..x - offset + kw];
            let mut total = 0i32;
            for (&k, &s) in taps.iter().zip(window) {
                total += k * s as i32;
            }
            row[x] = total as i16;
        }

        if mode == ConvolveMode::Skip {
            return;
        }
        for x in (0..lo).chain(hi..width) {
            let mut total = 0i32;
            for (j, &k) in taps.iter().enumerate() {
                let sx = extend_index(x as isize - offset as isize + j as isize, width);
                total += k * src_row[sx] as i32;
            }
            row[x] = total as i16;
        }
    });
    Ok(())
}

/// Vertical pass, `u8 -> i16` with `i32` accumulation.
pub fn vertical_u8_i16(
    kernel: &Kernel1D<i32>,
    src: &ImageView<'_, u8>,
    dst: &mut ImageViewMut<'_, i16>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    if mode == ConvolveMode::Normalize {
        return Err(Error::UnsupportedConfig(
            "normalized borders require a divisor; use the u8 -> u8 variants",
        ));
    }
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(height, kw, offset);

    for_each_row(dst, par, |y, row| {
        if !(y >= lo && y < hi) && mode == ConvolveMode::Skip {
            return;
        }
        for (x, d) in row.iter_mut().enumerate() {
            let mut total = 0i32;
            for (j, &k) in taps.iter().enumerate() {
                let sy = extend_index(y as isize - offset as isize + j as isize, height);
                total += k * src.row(sy)[x] as i32;
            }
            *d = total as i16;
        }
    });
    Ok(())
}

#[inline]
fn div_round_u8(total: i32, divisor: i32) -> u8 {
    ((total + divisor / 2) / divisor).clamp(0, 255) as u8
}

/// Horizontal blur pass, `u8 -> u8`, dividing by `divisor` with
/// round-half-up.
///
/// Pair with [`crate::gaussian::gaussian_i32`] and `kernel.sum()` as the
/// divisor. `Normalize` recomputes the divisor from the in-range taps at
/// borders, keeping unity gain edge to edge.
pub fn horizontal_u8_u8_div(
    kernel: &Kernel1D<i32>,
    divisor: i32,
    src: &ImageView<'_, u8>,
    dst: &mut ImageViewMut<'_, u8>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    if divisor <= 0 {
        return Err(Error::UnsupportedConfig("divisor must be positive"));
    }
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(width, kw, offset);

    for_each_row(dst, par, |y, row| {
        let src_row = src.row(y);

        for x in lo..hi {
            let window = &src_row[x - offset..x - offset + kw];
            let mut total = 0i32;
            for (&k, &s) in taps.iter().zip(window) {
                total += k * s as i32;
            }
            row[x] = div_round_u8(total, divisor);
        }

        if mode == ConvolveMode::Skip {
            return;
        }
        for x in (0..lo).chain(hi..width) {
            let mut total = 0i32;
            let mut weight = 0i32;
            for (j, &k) in taps.iter().enumerate() {
                let sx = x as isize - offset as isize + j as isize;
                match mode {
                    ConvolveMode::Skip => unreachable!(),
                    ConvolveMode::Extend => {
                        total += k * src_row[extend_index(sx, width)] as i32;
                    }
                    ConvolveMode::Normalize => {
                        if sx >= 0 && (sx as usize) < width {
                            total += k * src_row[sx as usize] as i32;
                            weight += k;
                        }
                    }
                }
            }
            let div = match mode {
                ConvolveMode::Normalize if weight > 0 => weight,
                _ => divisor,
            };
            row[x] = div_round_u8(total, div);
        }
    });
    Ok(())
}

/// Vertical blur pass, `u8 -> u8`; see [`horizontal_u8_u8_div`].
pub fn vertical_u8_u8_div(
    kernel: &Kernel1D<i32>,
    divisor: i32,
    src: &ImageView<'_, u8>,
    dst: &mut ImageViewMut<'_, u8>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    if divisor <= 0 {
        return Err(Error::UnsupportedConfig("divisor must be positive"));
    }
    ensure_same_dims(src.dims(), dst.dims())?;
    let (width, height) = src.dims();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let taps = kernel.data();
    let kw = kernel.width();
    let offset = kernel.offset();
    let (lo, hi) = interior(height, kw, offset);

    for_each_row(dst, par, |y, row| {
        let y_interior = y >= lo && y < hi;
        if !y_interior && mode == ConvolveMode::Skip {
            return;
        }
        for (x, d) in row.iter_mut().enumerate() {
            let mut total = 0i32;
            let mut weight = 0i32;
            for (j, &k) in taps.iter().enumerate() {
                let sy = y as isize - offset as isize + j as isize;
                if y_interior || mode == ConvolveMode::Extend {
                    total += k * src.row(extend_index(sy, height))[x] as i32;
                    weight += k;
                } else if sy >= 0 && (sy as usize) < height {
                    total += k * src.row(sy as usize)[x] as i32;
                    weight += k;
                }
            }
            let div = if y_interior || mode != ConvolveMode::Normalize || weight <= 0 {
                divisor
            } else {
                weight
            };
            *d = div_round_u8(total, div);
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        convolve2d_f32, horizontal_f32, horizontal_u8_i16, horizontal_u8_u8_div, vertical_f32,
        vertical_u8_i16, vertical_u8_u8_div,
    };
    use crate::gaussian::{gaussian_f32, gaussian_i32, gaussian2d_f32};
    use crate::kernel::Kernel1D;
    use crate::parallel::Parallelism;
    use sp_core::{ConvolveMode, Error, Image, ImageView};

    fn ramp_f32(width: usize, height: usize) -> Image<f32> {
        let data = (0..width * height)
            .map(|i| ((i * 7 + 3) % 53) as f32)
            .collect();
        Image::from_vec(width, height, data).expect("sized buffer")
    }

    fn ramp_u8(width: usize, height: usize) -> Image<u8> {
        let data = (0..width * height).map(|i| ((i * 11 + 5) % 251) as u8).collect();
        Image::from_vec(width, height, data).expect("sized buffer")
    }

    #[test]
    fn separable_matches_dense_in_the_interior() {
        let src = ramp_f32(17, 13);
        let k1 = gaussian_f32(1.2, 2, true);
        let k2 = gaussian2d_f32(1.2, 2, true);
        let par = Parallelism::serial();

        let mut tmp = Image::new_fill(17, 13, 0.0f32);
        let mut sep = Image::new_fill(17, 13, 0.0f32);
        let mut dense = Image::new_fill(17, 13, 0.0f32);

        horizontal_f32(
            &k1,
            &src.as_view(),
            &mut tmp.as_view_mut(),
            ConvolveMode::Extend,
            &par,
        )
        .expect("horizontal");
        vertical_f32(
            &k1,
            &tmp.as_view(),
            &mut sep.as_view_mut(),
            ConvolveMode::Extend,
            &par,
        )
        .expect("vertical");
        convolve2d_f32(
            &k2,
            &src.as_view(),
            &mut dense.as_view_mut(),
            ConvolveMode::Extend,
            &par,
        )
        .expect("dense");

        let r = k1.radius();
        for y in r..13 - r {
            for x in r..17 - r {
                let a = sep.as_view().get(x, y).copied().expect("in bounds");
                let b = dense.as_view().get(x, y).copied().expect("in bounds");
                assert!((a - b).abs() < 1e-4, "({x},{y}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn skip_leaves_borders_untouched() {
        let src = ramp_f32(9, 7);
        let k = gaussian_f32(1.0, 2, true);
        let mut dst = Image::new_fill(9, 7, -1.0f32);

        horizontal_f32(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Skip,
            &Parallelism::serial(),
        )
        .expect("convolve");

        let view = dst.as_view();
        for y in 0..7 {
            for x in [0, 1, 7, 8] {
                assert_eq!(view.get(x, y).copied(), Some(-1.0), "border ({x},{y})");
            }
            assert_ne!(view.get(4, y).copied(), Some(-1.0));
        }
    }

    #[test]
    fn normalize_keeps_unity_gain_on_constant_input() {
        let src = Image::new_fill(11, 8, 100.0f32);
        let k = gaussian_f32(1.5, 3, true);
        let par = Parallelism::serial();
        let mut h = Image::new_fill(11, 8, 0.0f32);
        let mut v = Image::new_fill(11, 8, 0.0f32);

        horizontal_f32(
            &k,
            &src.as_view(),
            &mut h.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("horizontal");
        vertical_f32(
            &k,
            &h.as_view(),
            &mut v.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("vertical");

        for &p in v.data() {
            assert!((p - 100.0).abs() < 1e-3, "{p}");
        }
    }

    #[test]
    fn integer_horizontal_matches_manual_sum() {
        let src = ramp_u8(8, 3);
        let k = Kernel1D::new(vec![-1i32, 0, 1]).expect("odd width");
        let mut dst = Image::new_fill(8, 3, 0i16);

        horizontal_u8_i16(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Skip,
            &Parallelism::serial(),
        )
        .expect("convolve");

        let sv = src.as_view();
        for x in 1..7 {
            let want = sv.row(1)[x + 1] as i32 - sv.row(1)[x - 1] as i32;
            assert_eq!(dst.as_view().get(x, 1).copied(), Some(want as i16));
        }
    }

    #[test]
    fn integer_vertical_extend_clamps_rows() {
        let src = ramp_u8(5, 6);
        let k = Kernel1D::new(vec![1i32, 2, 1]).expect("odd width");
        let mut dst = Image::new_fill(5, 6, 0i16);

        vertical_u8_i16(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Extend,
            &Parallelism::serial(),
        )
        .expect("convolve");

        let sv = src.as_view();
        // Top row clamps y = -1 onto y = 0.
        let want = 3 * sv.row(0)[2] as i32 + sv.row(1)[2] as i32;
        assert_eq!(dst.as_view().get(2, 0).copied(), Some(want as i16));
    }

    #[test]
    fn integer_normalize_requires_divisor_form() {
        let src = ramp_u8(5, 5);
        let k = Kernel1D::new(vec![1i32, 2, 1]).expect("odd width");
        let mut dst = Image::new_fill(5, 5, 0i16);

        let err = horizontal_u8_i16(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Normalize,
            &Parallelism::serial(),
        );
        assert!(matches!(err, Err(Error::UnsupportedConfig(_))));
    }

    #[test]
    fn u8_blur_rounds_half_up_and_stays_in_range() {
        let src = Image::from_vec(5, 1, vec![0u8, 0, 2, 0, 0]).expect("sized buffer");
        let k = Kernel1D::new(vec![1i32, 2, 1]).expect("odd width");
        let mut dst = Image::new_fill(5, 1, 0u8);

        horizontal_u8_u8_div(
            &k,
            4,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Extend,
            &Parallelism::serial(),
        )
        .expect("blur");

        // 2/4 rounds up to 1 at the neighbors of the impulse.
        assert_eq!(dst.data(), &[0, 1, 1, 1, 0]);
    }

    #[test]
    fn u8_blur_normalize_is_unity_gain_on_constant_input() {
        let src = Image::new_fill(9, 6, 100u8);
        let k = gaussian_i32(1.0, 2);
        let divisor = k.sum();
        let par = Parallelism::serial();
        let mut h = Image::new_fill(9, 6, 0u8);
        let mut v = Image::new_fill(9, 6, 0u8);

        horizontal_u8_u8_div(
            &k,
            divisor,
            &src.as_view(),
            &mut h.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("horizontal");
        vertical_u8_u8_div(
            &k,
            divisor,
            &h.as_view(),
            &mut v.as_view_mut(),
            ConvolveMode::Normalize,
            &par,
        )
        .expect("vertical");

        assert!(v.data().iter().all(|&p| p == 100));
    }

    #[test]
    fn shape_mismatch_is_reported_before_any_write() {
        let src = ramp_f32(6, 4);
        let k = gaussian_f32(1.0, 1, true);
        let mut dst = Image::new_fill(4, 6, 0.0f32);

        let err = horizontal_f32(
            &k,
            &src.as_view(),
            &mut dst.as_view_mut(),
            ConvolveMode::Extend,
            &Parallelism::serial(),
        );
        assert_eq!(
            err,
            Err(Error::ShapeMismatch {
                expected: (6, 4),
                actual: (4, 6),
            })
        );
        assert!(dst.data().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn parallel_and_serial_agree() {
        let src = ramp_f32(40, 30);
        let k = gaussian_f32(1.0, 2, true);
        let mut serial = Image::new_fill(40, 30, 0.0f32);
        let mut parallel = Image::new_fill(40, 30, 0.0f32);

        horizontal_f32(
            &k,
            &src.as_view(),
            &mut serial.as_view_mut(),
            ConvolveMode::Normalize,
            &Parallelism::serial(),
        )
        .expect("serial");
        horizontal_f32(
            &k,
            &src.as_view(),
            &mut parallel.as_view_mut(),
            ConvolveMode::Normalize,
            &Parallelism {
                enabled: true,
                min_pixels: 0,
            },
        )
        .expect("parallel");

        assert_eq!(serial.data(), parallel.data());
    }

    #[test]
    fn strided_source_view_is_honored() {
        let mut backing = vec![0.0f32; 10 * 4];
        for (i, v) in backing.iter_mut().enumerate() {
            *v = i as f32;
        }
        let src = ImageView::from_slice(6, 4, 10, &backing).expect("valid view");
        let k = Kernel1D::new(vec![0.0f32, 1.0, 0.0]).expect("odd width");
        let mut dst = Image::new_fill(6, 4, -1.0f32);

        horizontal_f32(
            &k,
            &src,
            &mut dst.as_view_mut(),
            ConvolveMode::Extend,
            &Parallelism::serial(),
        )
        .expect("convolve");

        // Identity kernel copies the viewed sub-rectangle.
        for y in 0..4 {
            for x in 0..6 {
                let want = (y * 10 + x) as f32;
                assert_eq!(dst.as_view().get(x, y).copied(), Some(want));
            }
        }
    }
}
