//! The normalized, pipeline-internal image buffer.
use image_view_texel::Buffer;

use crate::convert::{FrameRef, PixelSource};
use crate::error::ImageError;
use crate::layout::{FrameLayout, PixelFormat};

/// A byte buffer holding pixels in one of the normalized formats.
///
/// The format is always one of [`PixelFormat::NORMALIZED`], in native byte order. Contents are
/// only ever written by a [`Converter`](crate::Converter) or copied out of a display buffer, so the
/// bytes of a producer are never aliased by an `ImageBuffer`.
///
/// The allocation is aligned for any sample type, see [`ImageBuffer::as_texels`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    inner: Buffer,
    layout: FrameLayout,
}

impl ImageBuffer {
    /// Allocate a zeroed image.
    ///
    /// # Usage
    ///
    /// ```
    /// use image_view::{FrameLayout, ImageBuffer, PixelFormat};
    ///
    /// // Rows of 10 RGB pixels, padded to 32 bytes each.
    /// let layout = FrameLayout::new(PixelFormat::RGB8, 10, 4, 32)?;
    /// let image = ImageBuffer::new(layout)?;
    ///
    /// assert_eq!(image.as_bytes().len(), 128);
    /// assert_eq!(image.row(3).len(), 30);
    /// # Ok::<_, image_view::ImageError>(())
    /// ```
    pub fn new(layout: FrameLayout) -> Result<Self, ImageError> {
        if !layout.format().is_normalized() {
            return Err(ImageError::invalid("image buffers require a normalized format"));
        }

        let inner = Buffer::try_new(layout.byte_len())?;
        Ok(ImageBuffer { inner, layout })
    }

    /// Allocate a zeroed image with rows packed without padding.
    pub fn packed(format: PixelFormat, width: u32, height: u32) -> Result<Self, ImageError> {
        Self::new(FrameLayout::packed(format, width, height)?)
    }

    /// Get a reference to the layout of this image.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    pub fn format(&self) -> &PixelFormat {
        self.layout.format()
    }

    /// Return this image's bytes, including row padding, as a native endian byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// The pixel bytes of one row, without padding.
    ///
    /// # Panics
    ///
    /// When the row is not within the height of the image.
    pub fn row(&self, y: u32) -> &[u8] {
        &self.inner.as_bytes()[self.layout.row(y as usize)]
    }

    /// Iterate over the pixel bytes of all rows, without padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.layout.height() as usize).map(move |y| &self.inner.as_bytes()[self.layout.row(y)])
    }

    /// The bytes of one pixel, bounds-checked.
    pub fn pixel(&self, x: u32, y: u32) -> Result<&[u8], ImageError> {
        let range = self.layout.pixel_range(x, y)?;
        Ok(&self.inner.as_bytes()[range])
    }

    /// Return the bytes making up this image as a slice of samples.
    ///
    /// This includes padding bytes, reinterpreted like any other. Returns `None` if the sample
    /// type does not have the size of this image's samples.
    pub fn as_texels<T: bytemuck::Pod>(&self) -> Option<&[T]> {
        if std::mem::size_of::<T>() != self.format().depth().bytes() {
            return None;
        }

        Some(self.inner.as_texels())
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.inner.as_bytes_mut()
    }

    pub(crate) fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let range = self.layout.row(y);
        &mut self.inner.as_bytes_mut()[range]
    }

    /// Overwrite the layout, allocate if necessary, _do not_ clear the image.
    ///
    /// On failure the image is left unchanged.
    pub(crate) fn set_layout_conservative(&mut self, layout: FrameLayout) -> Result<(), ImageError> {
        if !layout.format().is_normalized() {
            return Err(ImageError::invalid("image buffers require a normalized format"));
        }

        self.inner.try_resize(layout.byte_len())?;
        self.layout = layout;
        Ok(())
    }
}

impl PixelSource for ImageBuffer {
    fn frame(&self) -> FrameRef<'_> {
        FrameRef::new(&self.layout, self.inner.as_bytes())
    }
}
