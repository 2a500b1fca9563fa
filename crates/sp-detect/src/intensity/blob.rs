//! Blob responses from second derivatives.

use sp_core::{Error, Image, ImageView, ensure_same_dims};

use super::{Derivatives, FeatureIntensity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HessianBlobMode {
    /// `dxx * dyy - dxy^2`; positive at blob centers of either polarity.
    Determinant,
    /// `dxx + dyy`; signed, dark blobs positive and bright blobs negative.
    Trace,
}

/// Determinant or trace of the per-pixel Hessian.
#[derive(Debug)]
pub struct HessianBlobIntensity {
    mode: HessianBlobMode,
    map: Image<f32>,
}

impl HessianBlobIntensity {
    pub fn new(mode: HessianBlobMode) -> Self {
        Self {
            mode,
            map: Image::new_fill(0, 0, 0.0),
        }
    }

    pub fn mode(&self) -> HessianBlobMode {
        self.mode
    }
}

impl FeatureIntensity for HessianBlobIntensity {
    fn requires_gradient(&self) -> bool {
        false
    }

    fn requires_hessian(&self) -> bool {
        true
    }

    fn process(
        &mut self,
        image: &ImageView<'_, f32>,
        derivs: &Derivatives<'_>,
    ) -> Result<(), Error> {
        let dxx = Derivatives::require(derivs.dxx, "hessian blob needs dxx")?;
        let dyy = Derivatives::require(derivs.dyy, "hessian blob needs dyy")?;
        ensure_same_dims(image.dims(), dxx.dims())?;
        ensure_same_dims(image.dims(), dyy.dims())?;

        let (width, height) = image.dims();
        self.map.reshape_fill(width, height, 0.0);
        match self.mode {
            HessianBlobMode::Determinant => {
                let dxy = Derivatives::require(derivs.dxy, "hessian blob needs dxy")?;
                ensure_same_dims(image.dims(), dxy.dims())?;
                for y in 0..height {
                    let rxx = dxx.row(y);
                    let ryy = dyy.row(y);
                    let rxy = dxy.row(y);
                    let row = &mut self.map.data_mut()[y * width..(y + 1) * width];
                    for (((d, &a), &c), &b) in row.iter_mut().zip(rxx).zip(ryy).zip(rxy) {
                        *d = a * c - b * b;
                    }
                }
            }
            HessianBlobMode::Trace => {
                for y in 0..height {
                    let rxx = dxx.row(y);
                    let ryy = dyy.row(y);
                    let row = &mut self.map.data_mut()[y * width..(y + 1) * width];
                    for ((d, &a), &c) in row.iter_mut().zip(rxx).zip(ryy) {
                        *d = a + c;
                    }
                }
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.as_view()
    }
}

/// Signed Laplacian, `f_xx + f_yy`. The sign carries blob polarity, so
/// consumers interested in either polarity should rank by magnitude.
#[derive(Debug, Default)]
pub struct LaplacianIntensity {
    map: Image<f32>,
}

impl LaplacianIntensity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureIntensity for LaplacianIntensity {
    fn requires_gradient(&self) -> bool {
        false
    }

    fn requires_hessian(&self) -> bool {
        true
    }

    fn process(
        &mut self,
        image: &ImageView<'_, f32>,
        derivs: &Derivatives<'_>,
    ) -> Result<(), Error> {
        let dxx = Derivatives::require(derivs.dxx, "laplacian needs dxx")?;
        let dyy = Derivatives::require(derivs.dyy, "laplacian needs dyy")?;
        ensure_same_dims(image.dims(), dxx.dims())?;
        ensure_same_dims(image.dims(), dyy.dims())?;

        let (width, height) = image.dims();
        self.map.reshape_fill(width, height, 0.0);
        for y in 0..height {
            let rxx = dxx.row(y);
            let ryy = dyy.row(y);
            let row = &mut self.map.data_mut()[y * width..(y + 1) * width];
            for ((d, &a), &c) in row.iter_mut().zip(rxx).zip(ryy) {
                *d = a + c;
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.as_view()
    }
}
