//! Integer-stride pyramid built by fused blur-and-subsample passes.

use sp_conv::{Kernel1D, Parallelism, down_horizontal_f32, down_vertical_f32};
use sp_core::{Error, Image, ImageView};

/// Reusable pyramid whose layer strides are integers relative to the input.
///
/// `scales` are cumulative: a layer at scale `s` holds one sample per `s x s`
/// block of input pixels, blurred by the configured kernel at every
/// subsampling step. Layer dimensions truncate: `(w / s, h / s)`.
///
/// Internal buffers persist across [`process`](Self::process) calls and are
/// reallocated only when the input shape changes.
#[derive(Debug)]
pub struct DiscretePyramid {
    scales: Vec<u32>,
    kernel: Kernel1D<f32>,
    reuse_input: bool,
    par: Parallelism,
    layers: Vec<Image<f32>>,
    scratch: Image<f32>,
    input_dims: (usize, usize),
}

/// Per-call handle over the freshly built layers.
///
/// When the pyramid was configured with [`DiscretePyramid::with_reuse_input`]
/// and the first scale is 1, layer 0 borrows the caller's input instead of
/// holding a copy; the handle's lifetime ties it to that input.
#[derive(Debug, Clone, Copy)]
pub struct Layers<'a> {
    owned: &'a [Image<f32>],
    borrowed0: Option<ImageView<'a, f32>>,
    scales: &'a [u32],
}

impl<'a> Layers<'a> {
    pub fn num_layers(&self) -> usize {
        self.scales.len()
    }

    /// Cumulative integer scale of layer `i`.
    pub fn scale(&self, i: usize) -> u32 {
        self.scales[i]
    }

    pub fn scales(&self) -> &'a [u32] {
        self.scales
    }

    pub fn layer(&self, i: usize) -> ImageView<'a, f32> {
        if i == 0
            && let Some(view) = self.borrowed0
        {
            return view;
        }
        self.owned[i].as_view()
    }
}

impl DiscretePyramid {
    /// Creates a pyramid for the given cumulative scales and blur kernel.
    ///
    /// Scales must start at 1 or above, never decrease, and each must divide
    /// the next so every layer subsamples the previous one on an integer
    /// grid. A scale equal to its predecessor yields a layer that is a blur
    /// of the previous one at the same dimensions. The kernel must sum to 1
    /// within `1e-2`; subsampling a non-normalized blur would scale image
    /// intensity per layer.
    pub fn new(scales: &[u32], kernel: Kernel1D<f32>) -> Result<Self, Error> {
        if scales.is_empty() || scales[0] == 0 {
            return Err(Error::UnsupportedConfig(
                "pyramid needs at least one scale, all scales >= 1",
            ));
        }
        for pair in scales.windows(2) {
            if pair[1] < pair[0] || pair[1] % pair[0] != 0 {
                return Err(Error::UnsupportedConfig(
                    "pyramid scales must never decrease and divide each other",
                ));
            }
        }
        if !kernel.is_normalized(1e-2) {
            return Err(Error::KernelNotNormalized { sum: kernel.sum() });
        }
        Ok(Self {
            scales: scales.to_vec(),
            kernel,
            reuse_input: false,
            par: Parallelism::default(),
            layers: Vec::new(),
            scratch: Image::new_fill(0, 0, 0.0),
            input_dims: (usize::MAX, usize::MAX),
        })
    }

    /// Borrow the input as layer 0 instead of copying it.
    ///
    /// Only takes effect when the first scale is 1; otherwise layer 0 is a
    /// subsampled image and has to be owned.
    pub fn with_reuse_input(mut self, reuse: bool) -> Self {
        self.reuse_input = reuse;
        self
    }

    pub fn with_parallelism(mut self, par: Parallelism) -> Self {
        self.par = par;
        self
    }

    pub fn num_layers(&self) -> usize {
        self.scales.len()
    }

    pub fn scales(&self) -> &[u32] {
        &self.scales
    }

    /// Dimensions of layer `i` for an input of `dims`.
    pub fn layer_dims(&self, dims: (usize, usize), i: usize) -> (usize, usize) {
        let s = self.scales[i] as usize;
        (dims.0 / s, dims.1 / s)
    }

    fn borrows_layer0(&self) -> bool {
        self.reuse_input && self.scales[0] == 1
    }

    fn ensure_layers(&mut self, dims: (usize, usize)) {
        if self.input_dims == dims {
            return;
        }
        self.layers
            .resize_with(self.scales.len(), || Image::new_fill(0, 0, 0.0));
        for i in 0..self.scales.len() {
            let (lw, lh) = self.layer_dims(dims, i);
            if i == 0 && self.borrows_layer0() {
                self.layers[0].reshape_fill(0, 0, 0.0);
            } else {
                self.layers[i].reshape_fill(lw, lh, 0.0);
            }
        }
        self.input_dims = dims;
    }

    /// Builds all layers from `input` and returns a handle over them.
    pub fn process<'a>(
        &'a mut self,
        input: &ImageView<'a, f32>,
    ) -> Result<Layers<'a>, Error> {
        self.ensure_layers(input.dims());
        let borrowed = self.borrows_layer0();

        if !borrowed {
            let skip = self.scales[0] as usize;
            if skip == 1 {
                copy_into(input, &mut self.layers[0]);
            } else {
                down_into(
                    &self.kernel,
                    &self.par,
                    input,
                    &mut self.scratch,
                    &mut self.layers[0],
                    skip,
                )?;
            }
        }

        for i in 1..self.scales.len() {
            let skip = (self.scales[i] / self.scales[i - 1]) as usize;
            let (head, tail) = self.layers.split_at_mut(i);
            let prev = if i == 1 && borrowed {
                *input
            } else {
                head[i - 1].as_view()
            };
            down_into(
                &self.kernel,
                &self.par,
                &prev,
                &mut self.scratch,
                &mut tail[0],
                skip,
            )?;
        }

        Ok(Layers {
            owned: &self.layers,
            borrowed0: borrowed.then_some(*input),
            scales: &self.scales,
        })
    }
}

fn copy_into(src: &ImageView<'_, f32>, dst: &mut Image<f32>) {
    debug_assert_eq!(src.dims(), dst.dims());
    let width = dst.width();
    for y in 0..dst.height() {
        let row = src.row(y);
        dst.data_mut()[y * width..(y + 1) * width].copy_from_slice(row);
    }
}

fn down_into(
    kernel: &Kernel1D<f32>,
    par: &Parallelism,
    src: &ImageView<'_, f32>,
    scratch: &mut Image<f32>,
    dst: &mut Image<f32>,
    skip: usize,
) -> Result<(), Error> {
    scratch.reshape_fill(dst.width(), src.height(), 0.0);
    down_horizontal_f32(kernel, src, &mut scratch.as_view_mut(), skip, par)?;
    down_vertical_f32(kernel, &scratch.as_view(), &mut dst.as_view_mut(), skip, par)
}
