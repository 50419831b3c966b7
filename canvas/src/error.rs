//! The failure kinds shared by every stage of the pipeline.
use image_view_texel::{AllocError, BadStrideError};

use crate::layout::PixelFormat;

/// A failure of any buffer, conversion, or palette operation.
///
/// Each operation signals exactly one of these kinds, synchronously, to its immediate caller.
/// Nothing in the pipeline retries. The `Display` text is meant for diagnostics, callers should
/// branch on the variant.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    /// A pixel format or a layout is not valid, or does not fit the provided bytes.
    #[error("invalid format: {reason}")]
    InvalidFormat { reason: &'static str },
    /// A coordinate outside of the image was accessed.
    #[error("pixel ({x}, {y}) out of range of a {width}x{height} image")]
    OutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// No conversion is registered for the pair of formats.
    #[error("no conversion from {from:?} to {to:?}")]
    UnsupportedConversion { from: PixelFormat, to: PixelFormat },
    /// The dimensions of a target do not match those of the source.
    #[error(
        "expected a {}x{} target, found {}x{}",
        .expected[0], .expected[1], .found[0], .found[1]
    )]
    DimensionMismatch { expected: [u32; 2], found: [u32; 2] },
    /// A palette can not be built from the requested domain or size.
    #[error("invalid color map domain [{min}, {max}] with {size} entries")]
    InvalidDomain { min: f64, max: f64, size: usize },
    /// Memory for a buffer could not be allocated, or the request exceeds the configured limit.
    ///
    /// The requested byte count is `None` if it is not even representable.
    #[error("out of memory allocating {requested:?} bytes")]
    OutOfMemory { requested: Option<u64> },
}

impl ImageError {
    pub(crate) const fn invalid(reason: &'static str) -> Self {
        ImageError::InvalidFormat { reason }
    }

    pub(crate) fn out_of_memory(requested: Option<usize>) -> Self {
        ImageError::OutOfMemory {
            requested: requested.map(|bytes| bytes as u64),
        }
    }
}

impl From<BadStrideError> for ImageError {
    fn from(err: BadStrideError) -> Self {
        if err.is_out_of_memory() {
            ImageError::out_of_memory(None)
        } else {
            ImageError::invalid("row stride shorter than a row of pixels")
        }
    }
}

impl From<AllocError> for ImageError {
    fn from(err: AllocError) -> Self {
        ImageError::out_of_memory(Some(err.requested))
    }
}
