//! Second-order derivative stencils computed directly from the image.
//!
//! - `dxx`: `[1, -2, 1]` along a row
//! - `dyy`: `[1, -2, 1]` down a column
//! - `dxy`: corner cross `p(-1,-1) + p(+1,+1) - p(-1,+1) - p(+1,-1)`
//!
//! Taps are unscaled, so the `u8 -> i16` variant is exact and the `f32`
//! variant matches it bit for bit on integer-valued input.

use sp_conv::parallel::{Parallelism, for_each_row};
use sp_core::{ConvolveMode, Error, ImageView, ImageViewMut, ensure_same_dims, extend_index};

use crate::gradient::reject_normalize;

macro_rules! hessian_impl {
    ($name:ident, $src_ty:ty, $dst_ty:ty, $acc_ty:ty) => {
        pub fn $name(
            src: &ImageView<'_, $src_ty>,
            dxx: &mut ImageViewMut<'_, $dst_ty>,
            dyy: &mut ImageViewMut<'_, $dst_ty>,
            dxy: &mut ImageViewMut<'_, $dst_ty>,
            mode: ConvolveMode,
            par: &Parallelism,
        ) -> Result<(), Error> {
            reject_normalize(mode)?;
            ensure_same_dims(src.dims(), dxx.dims())?;
            ensure_same_dims(src.dims(), dyy.dims())?;
            ensure_same_dims(src.dims(), dxy.dims())?;
            let (width, height) = src.dims();
            if width == 0 || height == 0 {
                return Ok(());
            }

            let stencil = |x: usize, y: usize| -> ($acc_ty, $acc_ty, $acc_ty) {
                let sx = |d: isize| extend_index(x as isize + d, width);
                let sy = |d: isize| extend_index(y as isize + d, height);
                let p = |dx: isize, dy: isize| src.row(sy(dy))[sx(dx)] as $acc_ty;

                let c = p(0, 0);
                let vxx = p(-1, 0) - (2 as $acc_ty) * c + p(1, 0);
                let vyy = p(0, -1) - (2 as $acc_ty) * c + p(0, 1);
                let vxy = p(-1, -1) + p(1, 1) - p(-1, 1) - p(1, -1);
                (vxx, vyy, vxy)
            };

            // dxx first so the three outputs never interleave writes.
            for_each_row(dxx, par, |y, row| {
                let y_interior = y >= 1 && y + 1 < height;
                // Sub-3-wide images have no interior columns.
                if mode == ConvolveMode::Skip && (!y_interior || width < 3) {
                    return;
                }
                if y_interior && width >= 3 {
                    let r0 = src.row(y);
                    for x in 1..width - 1 {
                        row[x] = (r0[x - 1] as $acc_ty - (2 as $acc_ty) * r0[x] as $acc_ty
                            + r0[x + 1] as $acc_ty) as $dst_ty;
                    }
                    if mode == ConvolveMode::Skip {
                        return;
                    }
                    row[0] = stencil(0, y).0 as $dst_ty;
                    row[width - 1] = stencil(width - 1, y).0 as $dst_ty;
                } else {
                    for x in 0..width {
                        row[x] = stencil(x, y).0 as $dst_ty;
                    }
                }
            });

            for_each_row(dyy, par, |y, row| {
                let y_interior = y >= 1 && y + 1 < height;
                if !y_interior && mode == ConvolveMode::Skip {
                    return;
                }
                if y_interior {
                    let rm = src.row(y - 1);
                    let r0 = src.row(y);
                    let rp = src.row(y + 1);
                    for x in 0..width {
                        row[x] = (rm[x] as $acc_ty - (2 as $acc_ty) * r0[x] as $acc_ty
                            + rp[x] as $acc_ty) as $dst_ty;
                    }
                } else {
                    for x in 0..width {
                        row[x] = stencil(x, y).1 as $dst_ty;
                    }
                }
            });

            for_each_row(dxy, par, |y, row| {
                let y_interior = y >= 1 && y + 1 < height;
                if mode == ConvolveMode::Skip && (!y_interior || width < 3) {
                    return;
                }
                if y_interior && width >= 3 {
                    let rm = src.row(y - 1);
                    let rp = src.row(y + 1);
                    for x in 1..width - 1 {
                        row[x] = (rm[x - 1] as $acc_ty + rp[x + 1] as $acc_ty
                            - rp[x - 1] as $acc_ty
                            - rm[x + 1] as $acc_ty) as $dst_ty;
                    }
                    if mode == ConvolveMode::Skip {
                        return;
                    }
                    row[0] = stencil(0, y).2 as $dst_ty;
                    row[width - 1] = stencil(width - 1, y).2 as $dst_ty;
                } else {
                    for x in 0..width {
                        row[x] = stencil(x, y).2 as $dst_ty;
                    }
                }
            });

            Ok(())
        }
    };
}

hessian_impl!(hessian_u8_i16, u8, i16, i32);
hessian_impl!(hessian_f32, f32, f32, f32);
