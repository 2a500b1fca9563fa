//! Gaussian and table (box) kernel factory.
//!
//! Conventions follow the rest of the workspace:
//! - a kernel of radius `r` has width `2r + 1`;
//! - the default sigma for a radius is `(2r + 1) / 5.0` and the default
//!   radius for a sigma is `ceil((5*sigma - 1) / 2)`;
//! - integer Gaussian kernels are scaled so the outermost tap equals 1 and
//!   are convolved with an explicit divisor (their weight sum).

use crate::kernel::{Kernel1D, Kernel2D};

fn gaussian_pdf(sigma: f64, x: f64) -> f64 {
    let d = x / sigma;
    (-0.5 * d * d).exp() / (sigma * (2.0 * core::f64::consts::PI).sqrt())
}

pub fn sigma_for_radius(radius: usize) -> f64 {
    (radius as f64 * 2.0 + 1.0) / 5.0
}

pub fn radius_for_sigma(sigma: f64) -> usize {
    ((5.0 * sigma - 1.0) / 2.0).ceil().max(1.0) as usize
}

/// Floating-point 1D Gaussian, optionally normalized to unit sum.
pub fn gaussian_f32(sigma: f64, radius: usize, normalize: bool) -> Kernel1D<f32> {
    assert!(sigma.is_finite() && sigma > 0.0, "sigma must be > 0 and finite");
    assert!(radius > 0, "radius must be > 0");

    let mut data = Vec::with_capacity(2 * radius + 1);
    for i in -(radius as isize)..=(radius as isize) {
        data.push(gaussian_pdf(sigma, i as f64) as f32);
    }

    if normalize {
        let total: f32 = data.iter().sum();
        for v in &mut data {
            *v /= total;
        }
    }

    Kernel1D::new(data).expect("width 2r+1 is odd")
}

/// Integer 1D Gaussian scaled so the edge tap is 1.
///
/// Convolve with [`divisor`](Kernel1D::<i32>::sum) division to keep unity
/// gain.
pub fn gaussian_i32(sigma: f64, radius: usize) -> Kernel1D<i32> {
    assert!(sigma.is_finite() && sigma > 0.0, "sigma must be > 0 and finite");
    assert!(radius > 0, "radius must be > 0");

    let mult = 1.0 / gaussian_pdf(sigma, radius as f64);
    let mut data = Vec::with_capacity(2 * radius + 1);
    for i in -(radius as isize)..=(radius as isize) {
        data.push((gaussian_pdf(sigma, i as f64) * mult) as i32);
    }

    Kernel1D::new(data).expect("width 2r+1 is odd")
}

/// 2D Gaussian as the outer product of the 1D kernel.
///
/// Intended for validating separable paths; convolving the 1D kernel along
/// each axis is faster.
pub fn gaussian2d_f32(sigma: f64, radius: usize, normalize: bool) -> Kernel2D<f32> {
    Kernel2D::from_separable(&gaussian_f32(sigma, radius, normalize))
}

/// Table kernel: every weight equal, summing to 1 when `normalize` is set.
pub fn table_f32(radius: usize, normalize: bool) -> Kernel1D<f32> {
    let width = 2 * radius + 1;
    let value = if normalize { 1.0 / width as f32 } else { 1.0 };
    Kernel1D::new(vec![value; width]).expect("width 2r+1 is odd")
}

/// Integer table kernel; all weights are 1.
pub fn table_i32(radius: usize) -> Kernel1D<i32> {
    Kernel1D::new(vec![1; 2 * radius + 1]).expect("width 2r+1 is odd")
}
