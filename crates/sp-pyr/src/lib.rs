//! Multi-scale image representations.
//!
//! Three flavors, in decreasing order of speed and increasing order of scale
//! fidelity:
//!
//! - [`DiscretePyramid`]: integer subsampling with a fused blur, the cheap
//!   option for coarse-to-fine search;
//! - [`ContinuousPyramid`]: arbitrary float scale factors via anti-aliased
//!   bilinear resampling;
//! - [`GaussianScaleSpace`]: full-resolution levels of increasing blur, the
//!   representation scale-selecting detectors run on.

pub mod continuous;
pub mod discrete;
pub mod scale_space;

pub use continuous::ContinuousPyramid;
pub use discrete::{DiscretePyramid, Layers};
pub use scale_space::GaussianScaleSpace;
