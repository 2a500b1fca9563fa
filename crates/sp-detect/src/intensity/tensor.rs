//! Box-windowed structure tensor shared by Harris and KLT.

use sp_conv::{Kernel1D, Parallelism, horizontal_f32, table_f32, vertical_f32};
use sp_core::{ConvolveMode, Error, Image, ImageView, ensure_same_dims};

/// Windowed sums of the gradient outer product:
/// `xx = sum gx^2`, `xy = sum gx*gy`, `yy = sum gy^2` over a
/// `(2r+1) x (2r+1)` box around each pixel.
///
/// The window is applied with the skip border policy over pre-zeroed maps,
/// so pixels within `radius` of an edge carry a zero tensor.
#[derive(Debug)]
pub(super) struct WindowedTensor {
    window: Kernel1D<f32>,
    pub xx: Image<f32>,
    pub xy: Image<f32>,
    pub yy: Image<f32>,
    tmp: Image<f32>,
}

impl WindowedTensor {
    pub fn new(radius: usize) -> Self {
        Self {
            window: table_f32(radius, false),
            xx: Image::new_fill(0, 0, 0.0),
            xy: Image::new_fill(0, 0, 0.0),
            yy: Image::new_fill(0, 0, 0.0),
            tmp: Image::new_fill(0, 0, 0.0),
        }
    }

    pub fn radius(&self) -> usize {
        self.window.radius()
    }

    pub fn compute(
        &mut self,
        dx: &ImageView<'_, f32>,
        dy: &ImageView<'_, f32>,
        par: &Parallelism,
    ) -> Result<(), Error> {
        ensure_same_dims(dx.dims(), dy.dims())?;
        let (width, height) = dx.dims();

        self.xx.reshape_fill(width, height, 0.0);
        self.xy.reshape_fill(width, height, 0.0);
        self.yy.reshape_fill(width, height, 0.0);
        self.tmp.reshape_fill(width, height, 0.0);

        fill_product(dx, dx, &mut self.xx);
        window_in_place(&self.window, &mut self.xx, &mut self.tmp, par)?;
        fill_product(dx, dy, &mut self.xy);
        window_in_place(&self.window, &mut self.xy, &mut self.tmp, par)?;
        fill_product(dy, dy, &mut self.yy);
        window_in_place(&self.window, &mut self.yy, &mut self.tmp, par)?;
        Ok(())
    }
}

fn fill_product(a: &ImageView<'_, f32>, b: &ImageView<'_, f32>, out: &mut Image<f32>) {
    let width = out.width();
    for y in 0..out.height() {
        let ra = a.row(y);
        let rb = b.row(y);
        let dst = &mut out.data_mut()[y * width..(y + 1) * width];
        for ((d, &va), &vb) in dst.iter_mut().zip(ra).zip(rb) {
            *d = va * vb;
        }
    }
}

fn window_in_place(
    window: &Kernel1D<f32>,
    img: &mut Image<f32>,
    tmp: &mut Image<f32>,
    par: &Parallelism,
) -> Result<(), Error> {
    tmp.fill(0.0);
    horizontal_f32(
        window,
        &img.as_view(),
        &mut tmp.as_view_mut(),
        ConvolveMode::Skip,
        par,
    )?;
    img.fill(0.0);
    vertical_f32(
        window,
        &tmp.as_view(),
        &mut img.as_view_mut(),
        ConvolveMode::Skip,
        par,
    )
}

#[cfg(test)]
mod tests {
    use super::WindowedTensor;
    use sp_conv::Parallelism;
    use sp_core::Image;

    #[test]
    fn windowed_sums_match_a_direct_count() {
        let dx = Image::new_fill(9, 9, 2.0f32);
        let dy = Image::new_fill(9, 9, 3.0f32);
        let mut tensor = WindowedTensor::new(1);
        tensor
            .compute(&dx.as_view(), &dy.as_view(), &Parallelism::serial())
            .expect("tensor");

        // 3x3 window of constant products.
        assert_eq!(tensor.xx.as_view().get(4, 4).copied(), Some(9.0 * 4.0));
        assert_eq!(tensor.xy.as_view().get(4, 4).copied(), Some(9.0 * 6.0));
        assert_eq!(tensor.yy.as_view().get(4, 4).copied(), Some(9.0 * 9.0));
        // Skip border stays zero.
        assert_eq!(tensor.xx.as_view().get(0, 4).copied(), Some(0.0));
    }
}
