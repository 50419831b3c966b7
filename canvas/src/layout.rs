//! Defines pixel formats and the byte layout of our images.
use std::ops::Range;

use image_view_texel::{ByteOrder, StrideLayout, StrideSpec};

use crate::error::ImageError;

/// The meaning and order of the channels in a pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ChannelSemantics {
    /// A single scalar, such as luminance or a sensor reading.
    Mono,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
    Argb,
    Abgr,
}

/// Groups of semantics that share one conversion routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SemanticsFamily {
    Mono,
    /// Any order of red, green, blue with optional alpha.
    Rgb,
}

/// How a single channel value is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SampleDepth {
    U8,
    U16,
    U32,
    /// An IEEE float, with `[0, 1]` as the nominal range.
    F32,
}

/// The complete description of the bytes of one pixel.
///
/// A format is immutable once attached to a buffer. Formats with single-byte samples have no
/// meaningful byte order, they always report [`ByteOrder::NATIVE`] so that comparing two formats
/// does not depend on how the producer described them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelFormat {
    semantics: ChannelSemantics,
    depth: SampleDepth,
    byte_order: ByteOrder,
}

/// The layout of a full frame: dimensions, row stride and pixel format.
///
/// An inner invariant is that `bytes_per_row` holds at least a row of pixels and that the layout
/// fits in memory, i.e. `bytes_per_row * height` is representable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameLayout {
    /// The number of pixels along our width.
    width: u32,
    /// The number of pixels along our height.
    height: u32,
    /// The validated byte matrix.
    strides: StrideLayout,
    format: PixelFormat,
}

impl ChannelSemantics {
    pub const fn channel_count(self) -> u8 {
        match self {
            ChannelSemantics::Mono => 1,
            ChannelSemantics::Rgb | ChannelSemantics::Bgr => 3,
            ChannelSemantics::Rgba
            | ChannelSemantics::Bgra
            | ChannelSemantics::Argb
            | ChannelSemantics::Abgr => 4,
        }
    }

    pub const fn family(self) -> SemanticsFamily {
        match self {
            ChannelSemantics::Mono => SemanticsFamily::Mono,
            _ => SemanticsFamily::Rgb,
        }
    }

    pub const fn has_alpha(self) -> bool {
        self.positions()[3].is_some()
    }

    /// The index of red, green, blue and alpha within a pixel.
    ///
    /// Mono has no color channels at all.
    pub(crate) const fn positions(self) -> [Option<u8>; 4] {
        match self {
            ChannelSemantics::Mono => [None; 4],
            ChannelSemantics::Rgb => [Some(0), Some(1), Some(2), None],
            ChannelSemantics::Bgr => [Some(2), Some(1), Some(0), None],
            ChannelSemantics::Rgba => [Some(0), Some(1), Some(2), Some(3)],
            ChannelSemantics::Bgra => [Some(2), Some(1), Some(0), Some(3)],
            ChannelSemantics::Argb => [Some(1), Some(2), Some(3), Some(0)],
            ChannelSemantics::Abgr => [Some(3), Some(2), Some(1), Some(0)],
        }
    }
}

impl SampleDepth {
    /// Interpret a producer's description of a channel.
    pub const fn from_bits(bits: u8, is_float: bool) -> Option<Self> {
        Some(match (bits, is_float) {
            (8, false) => SampleDepth::U8,
            (16, false) => SampleDepth::U16,
            (32, false) => SampleDepth::U32,
            (32, true) => SampleDepth::F32,
            _ => return None,
        })
    }

    pub const fn bits(self) -> u8 {
        match self {
            SampleDepth::U8 => 8,
            SampleDepth::U16 => 16,
            SampleDepth::U32 | SampleDepth::F32 => 32,
        }
    }

    pub const fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    pub const fn is_float(self) -> bool {
        matches!(self, SampleDepth::F32)
    }

    /// The largest integer value, `2^bits - 1`, or `None` for floats.
    pub const fn max_value(self) -> Option<u32> {
        match self {
            SampleDepth::U8 => Some(u8::MAX as u32),
            SampleDepth::U16 => Some(u16::MAX as u32),
            SampleDepth::U32 => Some(u32::MAX),
            SampleDepth::F32 => None,
        }
    }
}

impl PixelFormat {
    /// Single channel of 8-bit values.
    pub const MONO8: Self = Self::native(ChannelSemantics::Mono, SampleDepth::U8);
    /// Single channel of 16-bit values in native byte order.
    pub const MONO16: Self = Self::native(ChannelSemantics::Mono, SampleDepth::U16);
    /// Single channel of floats in native byte order.
    pub const MONO_F32: Self = Self::native(ChannelSemantics::Mono, SampleDepth::F32);
    pub const RGB8: Self = Self::native(ChannelSemantics::Rgb, SampleDepth::U8);
    pub const RGBA8: Self = Self::native(ChannelSemantics::Rgba, SampleDepth::U8);

    /// The closed set of formats that normalized buffers may have.
    pub const NORMALIZED: [Self; 5] = [
        Self::MONO8,
        Self::MONO16,
        Self::MONO_F32,
        Self::RGB8,
        Self::RGBA8,
    ];

    pub const fn new(semantics: ChannelSemantics, depth: SampleDepth, byte_order: ByteOrder) -> Self {
        // Single-byte samples have no byte order.
        let byte_order = match depth {
            SampleDepth::U8 => ByteOrder::NATIVE,
            _ => byte_order,
        };

        PixelFormat {
            semantics,
            depth,
            byte_order,
        }
    }

    pub const fn native(semantics: ChannelSemantics, depth: SampleDepth) -> Self {
        Self::new(semantics, depth, ByteOrder::NATIVE)
    }

    /// Validate a format description as handed over by a producer.
    ///
    /// Fails if the channel count does not match the semantics or if the bit depth is not one of
    /// the supported ones.
    pub fn from_descriptor(
        channel_count: u8,
        bits_per_channel: u8,
        is_float: bool,
        byte_order: ByteOrder,
        semantics: ChannelSemantics,
    ) -> Result<Self, ImageError> {
        if channel_count != semantics.channel_count() {
            return Err(ImageError::invalid(
                "channel count does not match the channel semantics",
            ));
        }

        let depth = SampleDepth::from_bits(bits_per_channel, is_float)
            .ok_or(ImageError::invalid("unsupported bits per channel"))?;

        Ok(Self::new(semantics, depth, byte_order))
    }

    pub const fn semantics(&self) -> ChannelSemantics {
        self.semantics
    }

    pub const fn depth(&self) -> SampleDepth {
        self.depth
    }

    pub const fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub const fn channel_count(&self) -> u8 {
        self.semantics.channel_count()
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.channel_count() as usize * self.depth.bytes()
    }

    /// Whether this is one of the formats of [`Self::NORMALIZED`].
    pub fn is_normalized(&self) -> bool {
        Self::NORMALIZED.contains(self)
    }
}

impl FrameLayout {
    /// Create a layout given the stride of rows in bytes.
    ///
    /// Fails with `InvalidFormat` if a row of pixels does not fit into `bytes_per_row` or if the
    /// total size is not representable.
    pub fn new(
        format: PixelFormat,
        width: u32,
        height: u32,
        bytes_per_row: usize,
    ) -> Result<Self, ImageError> {
        let spec = StrideSpec {
            width: to_usize(width)?,
            height: to_usize(height)?,
            element_size: format.bytes_per_pixel(),
            row_stride: bytes_per_row,
        };

        let strides = StrideLayout::new(spec).map_err(|err| {
            if err.is_out_of_memory() {
                ImageError::invalid("layout exceeds addressable memory")
            } else {
                ImageError::invalid("row stride shorter than a row of pixels")
            }
        })?;

        Ok(FrameLayout {
            width,
            height,
            strides,
            format,
        })
    }

    /// Create a layout with rows packed without padding.
    ///
    /// This is for allocating new buffers, hence a layout too large to represent is reported as
    /// `OutOfMemory`.
    pub fn packed(format: PixelFormat, width: u32, height: u32) -> Result<Self, ImageError> {
        let spec = StrideSpec::packed(
            to_usize(width)?,
            to_usize(height)?,
            format.bytes_per_pixel(),
        )
        .ok_or(ImageError::out_of_memory(None))?;

        Ok(FrameLayout {
            width,
            height,
            strides: StrideLayout::new(spec)?,
            format,
        })
    }

    /// Returns the width of the underlying image in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the underlying image in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// The number of bytes from the start of one row to the next.
    pub fn bytes_per_row(&self) -> usize {
        self.strides.spec().row_stride
    }

    /// The number of pixel bytes in a row, excluding padding.
    pub fn row_len(&self) -> usize {
        self.strides.row_len()
    }

    /// Returns the memory usage in bytes, `bytes_per_row * height`.
    pub fn byte_len(&self) -> usize {
        self.strides.byte_len()
    }

    pub fn is_packed(&self) -> bool {
        self.strides.is_packed()
    }

    /// The byte range of the pixels at a coordinate.
    pub fn pixel_range(&self, x: u32, y: u32) -> Result<Range<usize>, ImageError> {
        // Every u32 fits into the usize of a valid layout, it was checked on construction.
        self.strides
            .element(x as usize, y as usize)
            .ok_or(ImageError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            })
    }

    /// The byte range of the pixels in one row.
    pub(crate) fn row(&self, y: usize) -> Range<usize> {
        self.strides.row(y)
    }

    /// Replace the format by one with the same number of bytes per pixel.
    pub(crate) fn with_format(&self, format: PixelFormat) -> Self {
        debug_assert_eq!(format.bytes_per_pixel(), self.format.bytes_per_pixel());
        FrameLayout {
            format,
            ..self.clone()
        }
    }

    pub(crate) fn dimensions(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

fn to_usize(dim: u32) -> Result<usize, ImageError> {
    usize::try_from(dim).map_err(|_| ImageError::invalid("dimension exceeds addressable memory"))
}
