//! First-order derivative operators.
//!
//! Each operator separates into a difference tap along the derivative axis
//! and a smoothing tap across it:
//!
//! - Sobel:   diff `[-1, 0, 1]`, smooth `[1, 2, 1]`
//! - Prewitt: diff `[-1, 0, 1]`, smooth `[1, 1, 1]`
//! - Three:   diff `[-1, 0, 1]`, no smoothing
//!
//! The integer variants keep these taps unscaled, so `u8 -> i16` results are
//! exact. Derivative kernels sum to zero, which makes the renormalizing
//! border policy meaningless here; requesting it fails with
//! [`Error::UnsupportedConfig`].

use sp_conv::parallel::{Parallelism, for_each_row};
use sp_core::{ConvolveMode, Error, ImageView, ImageViewMut, ensure_same_dims, extend_index};

pub(crate) fn reject_normalize(mode: ConvolveMode) -> Result<(), Error> {
    if mode == ConvolveMode::Normalize {
        return Err(Error::UnsupportedConfig(
            "zero-sum stencils cannot renormalize borders",
        ));
    }
    Ok(())
}

macro_rules! separable3 {
    ($name:ident, $src_ty:ty, $dst_ty:ty, $acc_ty:ty) => {
        /// 3x3 separable stencil `kv (x) kh` applied in one pass.
        fn $name(
            kh: [$acc_ty; 3],
            kv: [$acc_ty; 3],
            src: &ImageView<'_, $src_ty>,
            dst: &mut ImageViewMut<'_, $dst_ty>,
            mode: ConvolveMode,
            par: &Parallelism,
        ) -> Result<(), Error> {
            reject_normalize(mode)?;
            ensure_same_dims(src.dims(), dst.dims())?;
            let (width, height) = src.dims();
            if width == 0 || height == 0 {
                return Ok(());
            }

            for_each_row(dst, par, |y, row| {
                let y_interior = y >= 1 && y + 1 < height;
                // A sub-3-wide image has no interior columns at all.
                if mode == ConvolveMode::Skip && (!y_interior || width < 3) {
                    return;
                }

                if y_interior && width >= 3 {
                    let rm = src.row(y - 1);
                    let r0 = src.row(y);
                    let rp = src.row(y + 1);
                    for x in 1..width - 1 {
                        let h0 = kh[0] * rm[x - 1] as $acc_ty
                            + kh[1] * rm[x] as $acc_ty
                            + kh[2] * rm[x + 1] as $acc_ty;
                        let h1 = kh[0] * r0[x - 1] as $acc_ty
                            + kh[1] * r0[x] as $acc_ty
                            + kh[2] * r0[x + 1] as $acc_ty;
                        let h2 = kh[0] * rp[x - 1] as $acc_ty
                            + kh[1] * rp[x] as $acc_ty
                            + kh[2] * rp[x + 1] as $acc_ty;
                        row[x] = (kv[0] * h0 + kv[1] * h1 + kv[2] * h2) as $dst_ty;
                    }
                    if mode == ConvolveMode::Skip {
                        return;
                    }
                }

                // Clamped evaluation for border rows and the two border
                // columns of interior rows.
                let columns: &mut dyn Iterator<Item = usize> = if y_interior && width >= 3 {
                    &mut [0, width - 1].into_iter()
                } else {
                    &mut (0..width)
                };
                for x in columns {
                    let mut total: $acc_ty = 0 as $acc_ty;
                    for dy in 0..3usize {
                        let sy = extend_index(y as isize + dy as isize - 1, height);
                        let srow = src.row(sy);
                        for dx in 0..3usize {
                            let sx = extend_index(x as isize + dx as isize - 1, width);
                            total += kv[dy] * kh[dx] * srow[sx] as $acc_ty;
                        }
                    }
                    row[x] = total as $dst_ty;
                }
            });
            Ok(())
        }
    };
}

separable3!(separable3_u8_i16, u8, i16, i32);
separable3!(separable3_f32, f32, f32, f32);

pub fn sobel_u8_i16(
    src: &ImageView<'_, u8>,
    dx: &mut ImageViewMut<'_, i16>,
    dy: &mut ImageViewMut<'_, i16>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_u8_i16([-1, 0, 1], [1, 2, 1], src, dx, mode, par)?;
    separable3_u8_i16([1, 2, 1], [-1, 0, 1], src, dy, mode, par)
}

pub fn sobel_f32(
    src: &ImageView<'_, f32>,
    dx: &mut ImageViewMut<'_, f32>,
    dy: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_f32([-1.0, 0.0, 1.0], [1.0, 2.0, 1.0], src, dx, mode, par)?;
    separable3_f32([1.0, 2.0, 1.0], [-1.0, 0.0, 1.0], src, dy, mode, par)
}

pub fn prewitt_u8_i16(
    src: &ImageView<'_, u8>,
    dx: &mut ImageViewMut<'_, i16>,
    dy: &mut ImageViewMut<'_, i16>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_u8_i16([-1, 0, 1], [1, 1, 1], src, dx, mode, par)?;
    separable3_u8_i16([1, 1, 1], [-1, 0, 1], src, dy, mode, par)
}

pub fn prewitt_f32(
    src: &ImageView<'_, f32>,
    dx: &mut ImageViewMut<'_, f32>,
    dy: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_f32([-1.0, 0.0, 1.0], [1.0, 1.0, 1.0], src, dx, mode, par)?;
    separable3_f32([1.0, 1.0, 1.0], [-1.0, 0.0, 1.0], src, dy, mode, par)
}

/// Plain central difference, no cross-axis smoothing.
pub fn three_u8_i16(
    src: &ImageView<'_, u8>,
    dx: &mut ImageViewMut<'_, i16>,
    dy: &mut ImageViewMut<'_, i16>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_u8_i16([-1, 0, 1], [0, 1, 0], src, dx, mode, par)?;
    separable3_u8_i16([0, 1, 0], [-1, 0, 1], src, dy, mode, par)
}

pub fn three_f32(
    src: &ImageView<'_, f32>,
    dx: &mut ImageViewMut<'_, f32>,
    dy: &mut ImageViewMut<'_, f32>,
    mode: ConvolveMode,
    par: &Parallelism,
) -> Result<(), Error> {
    separable3_f32([-1.0, 0.0, 1.0], [0.0, 1.0, 0.0], src, dx, mode, par)?;
    separable3_f32([0.0, 1.0, 0.0], [-1.0, 0.0, 1.0], src, dy, mode, par)
}
