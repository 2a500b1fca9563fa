use core::fmt;

/// Eagerly detected programmer errors shared across the workspace.
///
/// Every variant is raised before any pixel is touched; no operation in the
/// core crates has partial-failure state to roll back.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    SizeMismatch { expected: usize, actual: usize },
    ShapeMismatch { expected: (usize, usize), actual: (usize, usize) },
    OutOfBounds,
    InvalidStride,
    KernelWidthNotOdd { width: usize },
    KernelNotNormalized { sum: f32 },
    UnsupportedType { operation: &'static str, actual: &'static str },
    UnsupportedConfig(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected}, got {actual}")
            }
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::OutOfBounds => write!(f, "out of bounds"),
            Self::InvalidStride => write!(f, "invalid stride"),
            Self::KernelWidthNotOdd { width } => {
                write!(f, "kernel width must be odd and positive, got {width}")
            }
            Self::KernelNotNormalized { sum } => {
                write!(f, "kernel weights must sum to 1, got {sum}")
            }
            Self::UnsupportedType { operation, actual } => {
                write!(f, "{operation} does not support {actual} images")
            }
            Self::UnsupportedConfig(what) => write!(f, "unsupported configuration: {what}"),
        }
    }
}

impl std::error::Error for Error {}
