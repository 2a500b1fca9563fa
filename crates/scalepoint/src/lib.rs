//! Umbrella crate for the `scalepoint` workspace.
//!
//! Re-exports the pipeline crates in dependency order: image primitives,
//! convolution, derivatives, pyramids and the detector stack.

pub use sp_conv::*;
pub use sp_core::*;
pub use sp_deriv::*;
pub use sp_detect::*;
pub use sp_pyr::*;
