//! First- and second-order image derivatives.
//!
//! All operators write into caller-owned destination views and honor the
//! [`sp_core::ConvolveMode`] border policy. Renormalizing borders makes no
//! sense for zero-sum stencils, so `Normalize` is rejected across the crate.

pub mod gradient;
pub mod hessian;
pub mod laplacian;

pub use gradient::{prewitt_f32, prewitt_u8_i16, sobel_f32, sobel_u8_i16, three_f32, three_u8_i16};
pub use hessian::{hessian_f32, hessian_u8_i16};
pub use laplacian::{laplacian_at_f32, laplacian_f32, laplacian_u8_i16};
