//! 4-connected Laplacian.
//!
//! Dense stencil `p(x-1,y) + p(x+1,y) + p(x,y-1) + p(x,y+1) - 4 p(x,y)` plus
//! a sparse single-pixel probe used when scanning across scales, where a full
//! Laplacian map per level would be wasted work.

use sp_conv::parallel::{Parallelism, for_each_row};
use sp_core::{ConvolveMode, Error, ImageView, ImageViewMut, ensure_same_dims, extend_index};

use crate::gradient::reject_normalize;

macro_rules! laplacian_impl {
    ($name:ident, $src_ty:ty, $dst_ty:ty, $acc_ty:ty) => {
        pub fn $name(
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
                // Sub-3-wide images have no interior columns.
                if mode == ConvolveMode::Skip && (!y_interior || width < 3) {
                    return;
                }

                let clamped = |x: usize, y: usize| -> $acc_ty {
                    let p = |dx: isize, dy: isize| {
                        let sx = extend_index(x as isize + dx, width);
                        let sy = extend_index(y as isize + dy, height);
                        src.row(sy)[sx] as $acc_ty
                    };
                    p(-1, 0) + p(1, 0) + p(0, -1) + p(0, 1) - (4 as $acc_ty) * p(0, 0)
                };

                if y_interior && width >= 3 {
                    let rm = src.row(y - 1);
                    let r0 = src.row(y);
                    let rp = src.row(y + 1);
                    for x in 1..width - 1 {
                        row[x] = (r0[x - 1] as $acc_ty + r0[x + 1] as $acc_ty
                            + rm[x] as $acc_ty
                            + rp[x] as $acc_ty
                            - (4 as $acc_ty) * r0[x] as $acc_ty)
                            as $dst_ty;
                    }
                    if mode == ConvolveMode::Skip {
                        return;
                    }
                    row[0] = clamped(0, y) as $dst_ty;
                    row[width - 1] = clamped(width - 1, y) as $dst_ty;
                } else {
                    for x in 0..width {
                        row[x] = clamped(x, y) as $dst_ty;
                    }
                }
            });
            Ok(())
        }
    };
}

laplacian_impl!(laplacian_u8_i16, u8, i16, i32);
laplacian_impl!(laplacian_f32, f32, f32, f32);

/// Laplacian at a single pixel with edge replication.
///
/// The scale sweep in the detector only needs the Laplacian at candidate
/// positions, one value per level.
pub fn laplacian_at_f32(src: &ImageView<'_, f32>, x: usize, y: usize) -> f32 {
    let (width, height) = src.dims();
    debug_assert!(x < width && y < height);
    let p = |dx: isize, dy: isize| -> f32 {
        let sx = extend_index(x as isize + dx, width);
        let sy = extend_index(y as isize + dy, height);
        src.row(sy)[sx]
    };
    p(-1, 0) + p(1, 0) + p(0, -1) + p(0, 1) - 4.0 * p(0, 0)
}
