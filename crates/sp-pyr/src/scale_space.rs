//! Gaussian scale space at full resolution.
//!
//! Unlike a pyramid, every level keeps the input dimensions and only the
//! blur grows. A feature detector scanning across levels can therefore
//! compare responses at the same pixel without coordinate mapping, which is
//! what makes scale selection by Laplacian extremum work.

use sp_conv::{Kernel1D, Parallelism, gaussian_f32, horizontal_f32, radius_for_sigma, vertical_f32};
use sp_core::{ConvolveMode, Error, Image, ImageView};

#[derive(Debug)]
pub struct GaussianScaleSpace {
    sigmas: Vec<f32>,
    // Incremental kernels: level i is level i-1 blurred by kernels[i].
    kernels: Vec<Kernel1D<f32>>,
    par: Parallelism,
    levels: Vec<Image<f32>>,
    scratch: Image<f32>,
    input_dims: (usize, usize),
}

impl GaussianScaleSpace {
    /// Creates a scale space with the given absolute blur per level.
    ///
    /// Sigmas must be positive, finite and strictly increasing; at least
    /// three levels are required so an interior level exists for extremum
    /// detection.
    pub fn new(sigmas: &[f32]) -> Result<Self, Error> {
        if sigmas.len() < 3 {
            return Err(Error::UnsupportedConfig(
                "scale space needs at least three levels",
            ));
        }
        if sigmas.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(Error::UnsupportedConfig(
                "scale-space sigmas must be positive and finite",
            ));
        }
        if sigmas.windows(2).any(|p| p[1] <= p[0]) {
            return Err(Error::UnsupportedConfig(
                "scale-space sigmas must strictly increase",
            ));
        }

        // Blurs compose in quadrature: going from sigma_a to sigma_b takes
        // an extra blur of sqrt(sigma_b^2 - sigma_a^2).
        let mut kernels = Vec::with_capacity(sigmas.len());
        let mut prev = 0.0f64;
        for &s in sigmas {
            let s = s as f64;
            let step = (s * s - prev * prev).sqrt();
            kernels.push(gaussian_f32(step, radius_for_sigma(step), true));
            prev = s;
        }

        Ok(Self {
            sigmas: sigmas.to_vec(),
            kernels,
            par: Parallelism::default(),
            levels: Vec::new(),
            scratch: Image::new_fill(0, 0, 0.0),
            input_dims: (usize::MAX, usize::MAX),
        })
    }

    pub fn with_parallelism(mut self, par: Parallelism) -> Self {
        self.par = par;
        self
    }

    pub fn num_levels(&self) -> usize {
        self.sigmas.len()
    }

    pub fn sigma(&self, i: usize) -> f32 {
        self.sigmas[i]
    }

    pub fn sigmas(&self) -> &[f32] {
        &self.sigmas
    }

    /// Level `i`; valid after a successful [`process`](Self::process).
    pub fn level(&self, i: usize) -> ImageView<'_, f32> {
        self.levels[i].as_view()
    }

    fn ensure_levels(&mut self, dims: (usize, usize)) {
        if self.input_dims == dims {
            return;
        }
        self.levels
            .resize_with(self.sigmas.len(), || Image::new_fill(0, 0, 0.0));
        for level in &mut self.levels {
            level.reshape_fill(dims.0, dims.1, 0.0);
        }
        self.scratch.reshape_fill(dims.0, dims.1, 0.0);
        self.input_dims = dims;
    }

    /// Blurs `input` into every level incrementally.
    pub fn process(&mut self, input: &ImageView<'_, f32>) -> Result<(), Error> {
        self.ensure_levels(input.dims());

        for i in 0..self.sigmas.len() {
            let (head, tail) = self.levels.split_at_mut(i);
            let dst = &mut tail[0];
            let src = if i == 0 {
                *input
            } else {
                head[i - 1].as_view()
            };

            horizontal_f32(
                &self.kernels[i],
                &src,
                &mut self.scratch.as_view_mut(),
                ConvolveMode::Normalize,
                &self.par,
            )?;
            vertical_f32(
                &self.kernels[i],
                &self.scratch.as_view(),
                &mut dst.as_view_mut(),
                ConvolveMode::Normalize,
                &self.par,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::GaussianScaleSpace;
    use sp_core::{Error, Image};

    #[test]
    fn levels_share_the_input_dimensions() {
        let mut ss = GaussianScaleSpace::new(&[1.0, 2.0, 4.0]).expect("valid config");
        let input = Image::new_fill(32, 24, 1.0f32);
        ss.process(&input.as_view()).expect("build");

        for i in 0..ss.num_levels() {
            assert_eq!(ss.level(i).dims(), (32, 24));
        }
        assert_eq!(ss.sigma(1), 2.0);
    }

    #[test]
    fn bad_sigma_chains_are_rejected() {
        assert!(matches!(
            GaussianScaleSpace::new(&[1.0, 2.0]),
            Err(Error::UnsupportedConfig(_))
        ));
        assert!(matches!(
            GaussianScaleSpace::new(&[1.0, 2.0, 2.0]),
            Err(Error::UnsupportedConfig(_))
        ));
        assert!(matches!(
            GaussianScaleSpace::new(&[0.0, 1.0, 2.0]),
            Err(Error::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn impulse_peak_decays_with_increasing_blur() {
        let mut data = vec![0.0f32; 41 * 41];
        data[20 * 41 + 20] = 1000.0;
        let input = Image::from_vec(41, 41, data).expect("sized buffer");

        let mut ss = GaussianScaleSpace::new(&[1.0, 1.6, 2.6, 4.2]).expect("valid config");
        ss.process(&input.as_view()).expect("build");

        let mut prev_peak = f32::INFINITY;
        for i in 0..ss.num_levels() {
            let peak = ss
                .level(i)
                .get(20, 20)
                .copied()
                .expect("in bounds");
            assert!(peak < prev_peak, "level {i}: {peak} >= {prev_peak}");
            assert!(peak > 0.0);
            prev_peak = peak;
        }
    }

    #[test]
    fn constant_image_is_preserved_at_every_level() {
        let input = Image::new_fill(20, 20, 55.0f32);
        let mut ss = GaussianScaleSpace::new(&[1.0, 2.0, 4.0]).expect("valid config");
        ss.process(&input.as_view()).expect("build");

        for i in 0..ss.num_levels() {
            for y in 0..20 {
                for &p in ss.level(i).row(y) {
                    assert!((p - 55.0).abs() < 1e-2, "level {i}: {p}");
                }
            }
        }
    }
}
