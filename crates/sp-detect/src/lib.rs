//! Interest-point detection: intensity functions, non-max extraction and
//! cross-scale consolidation.
//!
//! The pieces compose bottom-up: a [`FeatureIntensity`] turns an image layer
//! and its derivatives into a score map, a [`NonMaxExtractor`] turns the map
//! into sparse [`Corner`]s, and a [`ScaleSpaceDetector`] runs both across a
//! scale space or pyramid and keeps the candidates that are also extrema
//! along the scale axis, emitting [`ScalePoint`]s.

pub mod extract;
pub mod intensity;
pub mod scale;

pub use extract::{Corner, ExtractorConfig, NonMaxExtractor};
pub use intensity::{
    Derivatives, FeatureIntensity, HarrisIntensity, HessianBlobIntensity, HessianBlobMode,
    KltIntensity, LaplacianIntensity,
};
pub use scale::{ScalePoint, ScaleSpaceDetector};
