//! Separable convolution engine.
//!
//! Kernels carry their own origin ([`Kernel1D::offset`]), so asymmetric
//! stencils convolve without padding tricks. Every entry point takes the
//! border policy ([`sp_core::ConvolveMode`]) and a [`Parallelism`] value
//! explicitly; nothing reads global state.
//!
//! The `u8` paths accumulate in `i32` and are exact; the `f32` paths match a
//! dense 2D convolution to within rounding in the interior.

pub mod conv;
pub mod down;
pub mod gaussian;
pub mod kernel;
pub mod parallel;

pub use conv::{
    convolve2d_f32, horizontal_f32, horizontal_u8_i16, horizontal_u8_u8_div, vertical_f32,
    vertical_u8_i16, vertical_u8_u8_div,
};
pub use down::{down_horizontal_f32, down_vertical_f32};
pub use gaussian::{
    gaussian2d_f32, gaussian_f32, gaussian_i32, radius_for_sigma, sigma_for_radius, table_f32,
    table_i32,
};
pub use kernel::{Kernel1D, Kernel2D};
pub use parallel::Parallelism;
