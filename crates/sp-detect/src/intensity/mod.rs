//! Per-pixel interest scores computed from derivative images.
//!
//! Each intensity function owns its output map and reshapes it lazily to the
//! current input dimensions, so one instance can serve every layer of a
//! pyramid without reallocating. The flags on [`FeatureIntensity`] tell the
//! orchestrator which derivative images to compute; asking an implementation
//! to run without a derivative it declared required is a configuration error.

mod blob;
mod harris;
mod klt;
mod tensor;

pub use blob::{HessianBlobIntensity, HessianBlobMode, LaplacianIntensity};
pub use harris::HarrisIntensity;
pub use klt::KltIntensity;

use sp_core::{Error, ImageView};

use crate::extract::Corner;

/// Derivative images for one layer; only the ones an intensity function
/// declares required have to be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Derivatives<'a> {
    pub dx: Option<ImageView<'a, f32>>,
    pub dy: Option<ImageView<'a, f32>>,
    pub dxx: Option<ImageView<'a, f32>>,
    pub dyy: Option<ImageView<'a, f32>>,
    pub dxy: Option<ImageView<'a, f32>>,
}

impl<'a> Derivatives<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub(crate) fn require(
        view: Option<ImageView<'a, f32>>,
        name: &'static str,
    ) -> Result<ImageView<'a, f32>, Error> {
        view.ok_or(Error::UnsupportedConfig(name))
    }
}

/// A per-pixel cornerness/blobness score.
pub trait FeatureIntensity {
    /// Whether [`Derivatives::dx`] / [`Derivatives::dy`] are read.
    fn requires_gradient(&self) -> bool;

    /// Whether the second-derivative images are read.
    fn requires_hessian(&self) -> bool;

    /// Sparse candidate pixels produced by the last
    /// [`process`](Self::process) call, if the implementation pre-filters;
    /// `None` means the whole intensity map must be scanned.
    fn candidates(&self) -> Option<&[Corner]> {
        None
    }

    /// Recomputes the intensity map for one image layer.
    fn process(
        &mut self,
        image: &ImageView<'_, f32>,
        derivs: &Derivatives<'_>,
    ) -> Result<(), Error>;

    /// The map produced by the last [`process`](Self::process) call.
    fn intensity(&self) -> ImageView<'_, f32>;
}
