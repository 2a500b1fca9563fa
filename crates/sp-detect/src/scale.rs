//! Cross-scale consolidation of per-layer detections.
//!
//! The detector runs the intensity function and extractor on every level,
//! then keeps only candidates whose scale-normalized Laplacian response is a
//! strict magnitude extremum against the neighboring levels. The first and
//! last levels have only one neighbor and never emit points.
//!
//! All scratch state lives in the detector, so a `detect_*` call needs
//! `&mut self`; give each thread its own instance instead of sharing one.

use sp_conv::Parallelism;
use sp_core::{ConvolveMode, Error, Image, ImageView};
use sp_deriv::{hessian_f32, laplacian_at_f32, three_f32};
use sp_pyr::{GaussianScaleSpace, Layers};

use crate::extract::{Corner, NonMaxExtractor};
use crate::intensity::{Derivatives, FeatureIntensity};

/// An interest point with its characteristic scale, in input-image
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePoint {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub strength: f32,
}

#[derive(Debug)]
pub struct ScaleSpaceDetector<I: FeatureIntensity> {
    intensity: I,
    extractor: NonMaxExtractor,
    par: Parallelism,
    dx: Image<f32>,
    dy: Image<f32>,
    dxx: Image<f32>,
    dyy: Image<f32>,
    dxy: Image<f32>,
    layer_corners: Vec<Vec<Corner>>,
    points: Vec<ScalePoint>,
}

impl<I: FeatureIntensity> ScaleSpaceDetector<I> {
    pub fn new(intensity: I, extractor: NonMaxExtractor) -> Self {
        Self {
            intensity,
            extractor,
            par: Parallelism::default(),
            dx: Image::new_fill(0, 0, 0.0),
            dy: Image::new_fill(0, 0, 0.0),
            dxx: Image::new_fill(0, 0, 0.0),
            dyy: Image::new_fill(0, 0, 0.0),
            dxy: Image::new_fill(0, 0, 0.0),
            layer_corners: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn with_parallelism(mut self, par: Parallelism) -> Self {
        self.par = par;
        self
    }

    pub fn extractor_mut(&mut self) -> &mut NonMaxExtractor {
        &mut self.extractor
    }

    /// Points found by the last `detect_*` call.
    pub fn points(&self) -> &[ScalePoint] {
        &self.points
    }

    /// Detects scale-tagged interest points on a full-resolution scale
    /// space. Coordinates come out in input-image pixels.
    pub fn detect_scale_space(
        &mut self,
        ss: &GaussianScaleSpace,
    ) -> Result<&[ScalePoint], Error> {
        #[cfg(feature = "tracing")]
        let _span =
            tracing::debug_span!("detect_scale_space", levels = ss.num_levels()).entered();

        let n = ss.num_levels();
        self.flush(n);
        for i in 0..n {
            self.extract_layer(&ss.level(i), i)?;
        }

        for i in 1..n - 1 {
            let prev = ss.level(i - 1);
            let cur = ss.level(i);
            let next = ss.level(i + 1);
            let (sp, s, sn) = (ss.sigma(i - 1), ss.sigma(i), ss.sigma(i + 1));

            for c in &self.layer_corners[i] {
                let (x, y) = (c.x as usize, c.y as usize);
                let ma = (sp * sp * laplacian_at_f32(&prev, x, y)).abs();
                let mb = (s * s * laplacian_at_f32(&cur, x, y)).abs();
                let mc = (sn * sn * laplacian_at_f32(&next, x, y)).abs();
                if mb > ma && mb > mc {
                    self.points.push(ScalePoint {
                        x: c.x as f32,
                        y: c.y as f32,
                        scale: interp_scale(ma, mb, mc, sp, s, sn),
                        strength: c.strength,
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(points = self.points.len(), "scale sweep complete");
        Ok(&self.points)
    }

    /// Detects scale-tagged interest points on a discrete pyramid.
    ///
    /// Mapping a layer's Laplacian to input units multiplies it by
    /// `1 / scale^2`, which exactly cancels the `scale^2` normalization, so
    /// the raw layer-pixel Laplacian is already the normalized response.
    /// Output coordinates are mapped back to input pixels.
    pub fn detect_pyramid(&mut self, layers: &Layers<'_>) -> Result<&[ScalePoint], Error> {
        #[cfg(feature = "tracing")]
        let _span =
            tracing::debug_span!("detect_pyramid", layers = layers.num_layers()).entered();

        let n = layers.num_layers();
        self.flush(n);
        for i in 0..n {
            self.extract_layer(&layers.layer(i), i)?;
        }

        for i in 1..n.saturating_sub(1) {
            let prev = layers.layer(i - 1);
            let cur = layers.layer(i);
            let next = layers.layer(i + 1);
            if next.width() == 0 || next.height() == 0 {
                continue;
            }
            let (sp, s, sn) = (
                layers.scale(i - 1) as f32,
                layers.scale(i) as f32,
                layers.scale(i + 1) as f32,
            );

            for c in &self.layer_corners[i] {
                let (x, y) = (c.x as usize, c.y as usize);
                let (px, py) = map_coord(x, y, s / sp, prev.dims());
                let (nx, ny) = map_coord(x, y, s / sn, next.dims());
                let ma = laplacian_at_f32(&prev, px, py).abs();
                let mb = laplacian_at_f32(&cur, x, y).abs();
                let mc = laplacian_at_f32(&next, nx, ny).abs();
                if mb > ma && mb > mc {
                    self.points.push(ScalePoint {
                        x: c.x as f32 * s,
                        y: c.y as f32 * s,
                        scale: interp_scale(ma, mb, mc, sp, s, sn),
                        strength: c.strength,
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(points = self.points.len(), "scale sweep complete");
        Ok(&self.points)
    }

    fn flush(&mut self, layers: usize) {
        self.points.clear();
        self.layer_corners.resize_with(layers, Vec::new);
        for queue in &mut self.layer_corners {
            queue.clear();
        }
    }

    fn extract_layer(&mut self, layer: &ImageView<'_, f32>, i: usize) -> Result<(), Error> {
        let (width, height) = layer.dims();
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut derivs = Derivatives::none();
        if self.intensity.requires_gradient() {
            self.dx.reshape_fill(width, height, 0.0);
            self.dy.reshape_fill(width, height, 0.0);
            three_f32(
                layer,
                &mut self.dx.as_view_mut(),
                &mut self.dy.as_view_mut(),
                ConvolveMode::Extend,
                &self.par,
            )?;
            derivs.dx = Some(self.dx.as_view());
            derivs.dy = Some(self.dy.as_view());
        }
        if self.intensity.requires_hessian() {
            self.dxx.reshape_fill(width, height, 0.0);
            self.dyy.reshape_fill(width, height, 0.0);
            self.dxy.reshape_fill(width, height, 0.0);
            hessian_f32(
                layer,
                &mut self.dxx.as_view_mut(),
                &mut self.dyy.as_view_mut(),
                &mut self.dxy.as_view_mut(),
                ConvolveMode::Extend,
                &self.par,
            )?;
            derivs.dxx = Some(self.dxx.as_view());
            derivs.dyy = Some(self.dyy.as_view());
            derivs.dxy = Some(self.dxy.as_view());
        }

        self.intensity.process(layer, &derivs)?;
        self.extractor.process(
            &self.intensity.intensity(),
            self.intensity.candidates(),
            None,
            &mut self.layer_corners[i],
        )
    }
}

/// Nearest-pixel mapping of layer coordinates by a scale ratio, clamped to
/// the destination layer.
fn map_coord(x: usize, y: usize, ratio: f32, dims: (usize, usize)) -> (usize, usize) {
    let mx = (x as f32 * ratio).round() as usize;
    let my = (y as f32 * ratio).round() as usize;
    (mx.min(dims.0 - 1), my.min(dims.1 - 1))
}

/// Vertex of the parabola through the three responses, mapped onto the
/// scale axis; falls back to the middle scale when the parabola degenerates.
fn interp_scale(ma: f32, mb: f32, mc: f32, sp: f32, s: f32, sn: f32) -> f32 {
    let denom = ma - 2.0 * mb + mc;
    if denom.abs() < 1e-12 {
        return s;
    }
    let delta = (0.5 * (ma - mc) / denom).clamp(-1.0, 1.0);
    if delta >= 0.0 {
        s + delta * (sn - s)
    } else {
        s + delta * (s - sp)
    }
}
