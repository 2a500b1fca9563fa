use sp_core::Error;

/// Immutable 1D convolution kernel.
///
/// The width is odd and positive; `offset` is the index of the kernel origin
/// (the tap applied to the output pixel itself) and defaults to `width / 2`.
/// Element types are `f32` for floating-point convolution and `i32` for
/// integer-exact convolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel1D<T> {
    data: Vec<T>,
    offset: usize,
}

impl<T: Copy> Kernel1D<T> {
    pub fn new(data: Vec<T>) -> Result<Self, Error> {
        let offset = data.len() / 2;
        Self::with_offset(data, offset)
    }

    pub fn with_offset(data: Vec<T>, offset: usize) -> Result<Self, Error> {
        if data.is_empty() || data.len() % 2 == 0 {
            return Err(Error::KernelWidthNotOdd { width: data.len() });
        }
        if offset >= data.len() {
            return Err(Error::OutOfBounds);
        }
        Ok(Self { data, offset })
    }

    pub fn width(&self) -> usize {
        self.data.len()
    }

    pub fn radius(&self) -> usize {
        self.data.len() / 2
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }
}

impl Kernel1D<f32> {
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// True when the weights sum to 1 within `tol`.
    ///
    /// Pyramid blur kernels are required to pass this with `tol = 1e-2` so
    /// repeated blur-and-subsample preserves image brightness.
    pub fn is_normalized(&self, tol: f32) -> bool {
        (self.sum() - 1.0).abs() <= tol
    }
}

impl Kernel1D<i32> {
    pub fn sum(&self) -> i32 {
        self.data.iter().sum()
    }
}

/// Immutable square 2D convolution kernel, row-major, odd width.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel2D<T> {
    data: Vec<T>,
    width: usize,
    offset: usize,
}

impl<T: Copy> Kernel2D<T> {
    pub fn new(width: usize, data: Vec<T>) -> Result<Self, Error> {
        if width == 0 || width % 2 == 0 {
            return Err(Error::KernelWidthNotOdd { width });
        }
        let expected = width * width;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            offset: width / 2,
        })
    }

    /// Outer product of a 1D kernel with itself.
    pub fn from_separable(kernel: &Kernel1D<T>) -> Self
    where
        T: core::ops::Mul<Output = T>,
    {
        let w = kernel.width();
        let mut data = Vec::with_capacity(w * w);
        for &a in kernel.data() {
            for &b in kernel.data() {
                data.push(a * b);
            }
        }
        Self {
            data,
            width: w,
            offset: w / 2,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn radius(&self) -> usize {
        self.width / 2
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn get(&self, kx: usize, ky: usize) -> T {
        self.data[ky * self.width + kx]
    }
}
