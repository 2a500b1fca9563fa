use crate::Error;
use crate::image::Image;

/// Closed tagged union over the supported pixel element types.
///
/// Element-type dispatch happens exactly once at the API boundary: a caller
/// wraps whatever buffer it has, and a pipeline entry point matches on the
/// variant and converts to its working type. Paths that have no
/// implementation for a variant fail with [`Error::UnsupportedType`] instead
/// of silently mis-casting.
#[derive(Debug, Clone, PartialEq)]
pub enum DynImage {
    U8(Image<u8>),
    U16(Image<u16>),
    S16(Image<i16>),
    S32(Image<i32>),
    F32(Image<f32>),
    F64(Image<f64>),
}

impl DynImage {
    pub fn width(&self) -> usize {
        match self {
            Self::U8(img) => img.width(),
            Self::U16(img) => img.width(),
            Self::S16(img) => img.width(),
            Self::S32(img) => img.width(),
            Self::F32(img) => img.width(),
            Self::F64(img) => img.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::U8(img) => img.height(),
            Self::U16(img) => img.height(),
            Self::S16(img) => img.height(),
            Self::S32(img) => img.height(),
            Self::F32(img) => img.height(),
            Self::F64(img) => img.height(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::S16(_) => "i16",
            Self::S32(_) => "i32",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
        }
    }

    /// Converts to the f32 working type of the detection pipeline.
    ///
    /// `F64` is storage-only; a 64-bit image must be narrowed by the caller,
    /// which knows whether the loss is acceptable.
    pub fn to_f32(&self) -> Result<Image<f32>, Error> {
        match self {
            Self::U8(img) => Ok(widen(img, |v| v as f32)),
            Self::U16(img) => Ok(widen(img, |v| v as f32)),
            Self::S16(img) => Ok(widen(img, |v| v as f32)),
            Self::S32(img) => Ok(widen(img, |v| v as f32)),
            Self::F32(img) => Ok(img.clone()),
            Self::F64(_) => Err(Error::UnsupportedType {
                operation: "conversion to f32",
                actual: self.kind(),
            }),
        }
    }
}

fn widen<T: Copy>(src: &Image<T>, f: impl Fn(T) -> f32) -> Image<f32> {
    let data = src.data().iter().map(|&v| f(v)).collect();
    Image::from_vec(src.width(), src.height(), data).expect("same length as source")
}
