//! Frames exactly as a producer hands them over.

use image_view_texel::{endian, ByteOrder};

use crate::convert::{FrameRef, PixelSource};
use crate::error::ImageError;
use crate::layout::{FrameLayout, PixelFormat, SampleDepth};

/// Untyped bytes of one frame, plus the description of their layout.
///
/// This performs no interpretation of the bytes at all. The type is owned exclusively: producers
/// move it into a conversion, and it is released afterwards. Retaining a copy is an explicit deep
/// `clone`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBuffer {
    data: Vec<u8>,
    layout: FrameLayout,
}

impl RawBuffer {
    /// Take ownership of a producer's bytes.
    ///
    /// Fails with `InvalidFormat` if the stride can not hold a row of pixels, or if the bytes do
    /// not cover `bytes_per_row * height`.
    ///
    /// # Usage
    ///
    /// ```
    /// use image_view::{ChannelSemantics, PixelFormat, RawBuffer};
    /// use image_view::ByteOrder;
    ///
    /// // A 12-bit sensor, delivering big endian 16-bit samples with rows padded to 8 bytes.
    /// let format = PixelFormat::from_descriptor(1, 16, false, ByteOrder::Big, ChannelSemantics::Mono)?;
    /// let raw = RawBuffer::new(vec![0; 16], 3, 2, 8, format)?;
    ///
    /// assert_eq!(raw.byte_order(), ByteOrder::Big);
    /// assert_eq!(raw.pixel_at(2, 1)?, &[0, 0]);
    /// # Ok::<_, image_view::ImageError>(())
    /// ```
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: PixelFormat,
    ) -> Result<Self, ImageError> {
        let layout = FrameLayout::new(format, width, height, bytes_per_row)?;
        Self::with_layout(data, layout)
    }

    /// Take ownership of bytes described by an existing layout.
    pub fn with_layout(data: Vec<u8>, layout: FrameLayout) -> Result<Self, ImageError> {
        if data.len() < layout.byte_len() {
            return Err(ImageError::invalid(
                "buffer shorter than bytes per row times height",
            ));
        }

        Ok(RawBuffer { data, layout })
    }

    /// Copy a producer's bytes, leaving the producer free to reuse its region.
    pub fn copy_from_slice(
        data: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: PixelFormat,
    ) -> Result<Self, ImageError> {
        let layout = FrameLayout::new(format, width, height, bytes_per_row)?;
        // Validate before we allocate.
        if data.len() < layout.byte_len() {
            return Err(ImageError::invalid(
                "buffer shorter than bytes per row times height",
            ));
        }

        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len())
            .map_err(|_| ImageError::out_of_memory(Some(data.len())))?;
        copy.extend_from_slice(data);
        Ok(RawBuffer { data: copy, layout })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.layout.format().byte_order()
    }

    /// The bytes of one pixel, bounds-checked.
    pub fn pixel_at(&self, x: u32, y: u32) -> Result<&[u8], ImageError> {
        let range = self.layout.pixel_range(x, y)?;
        Ok(&self.data[range])
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// All bytes, including row padding and any trailing bytes past the last row.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give up the frame, returning the bytes to the producer.
    pub fn release(self) -> Vec<u8> {
        self.data
    }

    /// Reorder multi-byte samples into the native byte order, in place.
    ///
    /// Padding is not touched. Single-byte formats are returned as they are.
    pub fn to_native_order(mut self) -> Self {
        let format = *self.layout.format();
        if format.byte_order().is_native() {
            return self;
        }

        let swap: fn(&mut [u8]) = match format.depth() {
            SampleDepth::U8 => return self,
            SampleDepth::U16 => endian::swap_u16_lanes,
            SampleDepth::U32 | SampleDepth::F32 => endian::swap_u32_lanes,
        };

        for y in 0..self.layout.height() as usize {
            let row = self.layout.row(y);
            swap(&mut self.data[row]);
        }

        let native = PixelFormat::native(format.semantics(), format.depth());
        self.layout = self.layout.with_format(native);
        self
    }
}

impl PixelSource for RawBuffer {
    fn frame(&self) -> FrameRef<'_> {
        FrameRef::new(&self.layout, &self.data)
    }
}
