//! Pyramid with arbitrary floating-point scale factors.
//!
//! Each layer blurs the previous one just enough to avoid aliasing and then
//! resamples it bilinearly. The anti-alias blur for a relative scale `r`
//! uses `sigma = 0.5 * sqrt(r^2 - 1)`, the amount that takes a critically
//! sampled image to critical sampling at the coarser rate.

use sp_conv::{
    Kernel1D, Parallelism, gaussian_f32, horizontal_f32, radius_for_sigma, vertical_f32,
};
use sp_core::{ConvolveMode, Error, Image, ImageView, sample_bilinear_f32};

#[derive(Debug)]
pub struct ContinuousPyramid {
    scales: Vec<f32>,
    sigmas: Vec<f32>,
    kernels: Vec<Option<Kernel1D<f32>>>,
    par: Parallelism,
    layers: Vec<Image<f32>>,
    blur_h: Image<f32>,
    blur: Image<f32>,
    input_dims: (usize, usize),
}

impl ContinuousPyramid {
    /// Creates a pyramid for the given cumulative scales.
    ///
    /// Scales must start at 1.0 or above and strictly increase. A first scale
    /// of exactly 1.0 makes layer 0 a plain copy of the input.
    pub fn new(scales: &[f32]) -> Result<Self, Error> {
        if scales.is_empty() || scales[0] < 1.0 || scales.iter().any(|s| !s.is_finite()) {
            return Err(Error::UnsupportedConfig(
                "pyramid needs at least one finite scale, all scales >= 1.0",
            ));
        }
        if scales.windows(2).any(|p| p[1] <= p[0]) {
            return Err(Error::UnsupportedConfig(
                "pyramid scales must strictly increase",
            ));
        }

        // Anti-alias kernel per step, fixed by the scale chain. The
        // cumulative sigma sums the per-step blurs in quadrature, with each
        // step's sigma mapped to input units by the scale it was applied at.
        let mut kernels = Vec::with_capacity(scales.len());
        let mut sigmas = Vec::with_capacity(scales.len());
        let mut prev = 1.0f32;
        let mut var = 0.0f32;
        for &s in scales {
            let rel = s / prev;
            let sigma = 0.5 * (rel * rel - 1.0).sqrt();
            kernels.push(if sigma > 1e-3 {
                Some(gaussian_f32(
                    sigma as f64,
                    radius_for_sigma(sigma as f64),
                    true,
                ))
            } else {
                None
            });
            var += (sigma * prev) * (sigma * prev);
            sigmas.push(var.sqrt());
            prev = s;
        }

        Ok(Self {
            scales: scales.to_vec(),
            sigmas,
            kernels,
            par: Parallelism::default(),
            layers: Vec::new(),
            blur_h: Image::new_fill(0, 0, 0.0),
            blur: Image::new_fill(0, 0, 0.0),
            input_dims: (usize::MAX, usize::MAX),
        })
    }

    pub fn with_parallelism(mut self, par: Parallelism) -> Self {
        self.par = par;
        self
    }

    pub fn num_layers(&self) -> usize {
        self.scales.len()
    }

    pub fn scale(&self, i: usize) -> f32 {
        self.scales[i]
    }

    /// Cumulative equivalent blur of layer `i`, in input-image pixels.
    pub fn sigma(&self, i: usize) -> f32 {
        self.sigmas[i]
    }

    pub fn layer(&self, i: usize) -> ImageView<'_, f32> {
        self.layers[i].as_view()
    }

    fn ensure_layers(&mut self, dims: (usize, usize)) {
        if self.input_dims == dims {
            return;
        }
        self.layers
            .resize_with(self.scales.len(), || Image::new_fill(0, 0, 0.0));
        for (layer, &s) in self.layers.iter_mut().zip(&self.scales) {
            layer.reshape_fill(floor_dim(dims.0, s), floor_dim(dims.1, s), 0.0);
        }
        self.input_dims = dims;
    }

    /// Builds all layers from `input`.
    pub fn process(&mut self, input: &ImageView<'_, f32>) -> Result<(), Error> {
        self.ensure_layers(input.dims());

        for i in 0..self.scales.len() {
            let rel = if i == 0 {
                self.scales[0]
            } else {
                self.scales[i] / self.scales[i - 1]
            };
            let (head, tail) = self.layers.split_at_mut(i);
            let dst = &mut tail[0];
            let prev = if i == 0 {
                *input
            } else {
                head[i - 1].as_view()
            };

            let src = if let Some(kernel) = &self.kernels[i] {
                self.blur_h.reshape_fill(prev.width(), prev.height(), 0.0);
                self.blur.reshape_fill(prev.width(), prev.height(), 0.0);
                horizontal_f32(
                    kernel,
                    &prev,
                    &mut self.blur_h.as_view_mut(),
                    ConvolveMode::Normalize,
                    &self.par,
                )?;
                vertical_f32(
                    kernel,
                    &self.blur_h.as_view(),
                    &mut self.blur.as_view_mut(),
                    ConvolveMode::Normalize,
                    &self.par,
                )?;
                self.blur.as_view()
            } else {
                prev
            };

            if (rel - 1.0).abs() < 1e-6 && src.dims() == dst.dims() {
                for y in 0..dst.height() {
                    let w = dst.width();
                    dst.data_mut()[y * w..(y + 1) * w].copy_from_slice(src.row(y));
                }
                continue;
            }
            for y in 0..dst.height() {
                let sy = y as f32 * rel;
                let w = dst.width();
                let row = &mut dst.data_mut()[y * w..(y + 1) * w];
                for (x, d) in row.iter_mut().enumerate() {
                    *d = sample_bilinear_f32(&src, x as f32 * rel, sy);
                }
            }
        }
        Ok(())
    }
}

/// Floor of `dim / scale`, tolerant of the f32 representation error of the
/// scale so quotients like `110 / 1.1` land on the exact integer.
fn floor_dim(dim: usize, scale: f32) -> usize {
    (dim as f64 / scale as f64 * (1.0 + 1e-6)) as usize
}
