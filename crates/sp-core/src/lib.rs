//! Foundational primitives for scale-space interest point detection.
//!
//! ## Image Views and Stride
//! Images use element stride (not byte stride). `stride` is the distance, in
//! elements, between adjacent row starts and may be greater than `width`.
//! Views are non-owning; the backing storage is owned separately, so two
//! handles may alias the same buffer as sub-images.
//!
//! ## Border Policy
//! Stencil operators take a [`ConvolveMode`]: `Skip` leaves the border
//! untouched, `Extend` replicates edge pixels, `Normalize` rescales the
//! kernel over the in-bounds taps.
//!
//! ## Element Types
//! The detection pipeline works in `f32`, with integer-exact `u8 -> i16`
//! paths for derivatives. [`DynImage`] is the closed union used to dispatch
//! on element type once at the API boundary.

mod border;
mod dyn_image;
mod error;
mod image;
mod sample;

pub use border::{ConvolveMode, extend_index};
pub use dyn_image::DynImage;
pub use error::Error;
pub use image::{Image, ImageView, ImageViewMut, ensure_same_dims};
pub use sample::sample_bilinear_f32;
