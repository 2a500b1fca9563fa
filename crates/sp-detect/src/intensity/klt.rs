//! Shi-Tomasi (KLT) corner response.

use sp_conv::Parallelism;
use sp_core::{Error, Image, ImageView};

use super::tensor::WindowedTensor;
use super::{Derivatives, FeatureIntensity};

/// Smallest eigenvalue of the box-windowed structure tensor.
#[derive(Debug)]
pub struct KltIntensity {
    tensor: WindowedTensor,
    par: Parallelism,
    map: Image<f32>,
}

impl KltIntensity {
    pub fn new(radius: usize) -> Self {
        Self {
            tensor: WindowedTensor::new(radius),
            par: Parallelism::default(),
            map: Image::new_fill(0, 0, 0.0),
        }
    }

    pub fn with_parallelism(mut self, par: Parallelism) -> Self {
        self.par = par;
        self
    }

    pub fn radius(&self) -> usize {
        self.tensor.radius()
    }
}

impl FeatureIntensity for KltIntensity {
    fn requires_gradient(&self) -> bool {
        true
    }

    fn requires_hessian(&self) -> bool {
        false
    }

    fn process(
        &mut self,
        image: &ImageView<'_, f32>,
        derivs: &Derivatives<'_>,
    ) -> Result<(), Error> {
        let dx = Derivatives::require(derivs.dx, "klt needs the x gradient")?;
        let dy = Derivatives::require(derivs.dy, "klt needs the y gradient")?;
        self.tensor.compute(&dx, &dy, &self.par)?;

        let (width, height) = image.dims();
        self.map.reshape_fill(width, height, 0.0);
        for y in 0..height {
            let xx = self.tensor.xx.as_view();
            let xy = self.tensor.xy.as_view();
            let yy = self.tensor.yy.as_view();
            let row = &mut self.map.data_mut()[y * width..(y + 1) * width];
            for (x, d) in row.iter_mut().enumerate() {
                // SAFETY: x < width and y < height, and all tensor maps were
                // reshaped to (width, height) by `compute`.
                let (a, b, c) = unsafe {
                    (
                        *xx.get_unchecked(x, y),
                        *xy.get_unchecked(x, y),
                        *yy.get_unchecked(x, y),
                    )
                };
                // Smaller root of the 2x2 symmetric eigenproblem.
                let diff = a - c;
                *d = 0.5 * ((a + c) - (diff * diff + 4.0 * b * b).sqrt());
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.as_view()
    }
}
