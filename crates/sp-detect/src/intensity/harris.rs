//! Harris corner response.

use sp_conv::Parallelism;
use sp_core::{Error, Image, ImageView};

use super::tensor::WindowedTensor;
use super::{Derivatives, FeatureIntensity};

/// `det(M) - kappa * trace(M)^2` over the box-windowed structure tensor M.
#[derive(Debug)]
pub struct HarrisIntensity {
    kappa: f32,
    tensor: WindowedTensor,
    par: Parallelism,
    map: Image<f32>,
}

impl HarrisIntensity {
    pub const DEFAULT_KAPPA: f32 = 0.04;

    pub fn new(radius: usize, kappa: f32) -> Self {
        Self {
            kappa,
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

    pub fn kappa(&self) -> f32 {
        self.kappa
    }
}

impl Default for HarrisIntensity {
    fn default() -> Self {
        Self::new(2, Self::DEFAULT_KAPPA)
    }
}

impl FeatureIntensity for HarrisIntensity {
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
        let dx = Derivatives::require(derivs.dx, "harris needs the x gradient")?;
        let dy = Derivatives::require(derivs.dy, "harris needs the y gradient")?;
        self.tensor.compute(&dx, &dy, &self.par)?;

        let (width, height) = image.dims();
        self.map.reshape_fill(width, height, 0.0);
        let kappa = self.kappa;
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
                let det = a * c - b * b;
                let trace = a + c;
                *d = det - kappa * trace * trace;
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.as_view()
    }
}
