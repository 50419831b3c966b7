//! The double buffered handoff between a producer and a renderer.
//!
//! A [`DisplayBuffer`] holds two frames in a fixed, renderer ready format. The producer writes
//! the frame that is not visible and then swaps, the renderer copies out whichever frame is
//! visible. Neither side ever blocks the other.
//!
//! Both frames live in atomic lanes, each guarded by a sequence counter. The writer makes the
//! counter odd for the duration of a write, a reader checks that the counter was even and unchanged
//! around its copy and otherwise retries. This way a reader that races a swap, and then a write
//! into the frame it was reading, detects the overwrite instead of returning a torn frame.
//!
//! If the producer swaps again before the renderer had a look, the older frame is dropped. This
//! is the intended backpressure for displays, the latest frame wins.
use std::sync::atomic::{fence, AtomicBool, AtomicU64, AtomicUsize, Ordering};

use image_view_texel::AtomicBuffer;

use crate::error::ImageError;
use crate::image::ImageBuffer;
use crate::layout::{FrameLayout, PixelFormat};

/// Caps on the memory a display buffer may hold.
///
/// A request above the limit fails exactly like a failed allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferLimits {
    /// The maximum bytes of both frames together, `None` means unlimited.
    pub max_bytes: Option<u64>,
}

/// Two frames, one visible and one being written.
///
/// Both frames always have the same dimensions and format. For use across threads, [`split`]
/// the buffer into its single writer and any number of readers.
///
/// [`split`]: DisplayBuffer::split
///
/// # Usage
///
/// ```
/// use image_view::{DisplayBuffer, ImageBuffer, PixelFormat};
///
/// let mut display = DisplayBuffer::new(PixelFormat::RGBA8, 2, 2)?;
/// let frame = ImageBuffer::packed(PixelFormat::RGBA8, 2, 2)?;
///
/// display.write_next(&frame)?;
/// assert!(display.swap());
///
/// let visible = display.visible()?;
/// assert_eq!(visible.generation(), 1);
/// assert_eq!(visible.image().as_bytes(), frame.as_bytes());
/// # Ok::<_, image_view::ImageError>(())
/// ```
#[derive(Debug)]
pub struct DisplayBuffer {
    layout: FrameLayout,
    limits: BufferLimits,
    slots: [Slot; 2],
    /// The index of the visible slot.
    visible: AtomicUsize,
    /// Whether the back slot holds a frame that was not yet swapped in.
    pending: AtomicBool,
    /// The generation of the last frame written.
    written: AtomicU64,
    /// The newest generation any reader copied out.
    seen: AtomicU64,
    swaps: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug)]
struct Slot {
    /// Odd while a write is in progress.
    seq: AtomicU64,
    /// The generation of the frame in this slot, zero for no frame at all.
    generation: AtomicU64,
    data: AtomicBuffer,
}

/// The producer side of a split display buffer.
///
/// There is only ever one, it is not `Clone`.
#[derive(Debug)]
pub struct FrameWriter<'display> {
    display: &'display DisplayBuffer,
}

/// A consumer side of a split display buffer.
#[derive(Clone, Copy, Debug)]
pub struct FrameReader<'display> {
    display: &'display DisplayBuffer,
}

/// A consistent copy of the visible frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleFrame {
    image: ImageBuffer,
    generation: u64,
}

/// Counters describing the traffic through a display buffer.
///
/// These are advisory. A read racing a swap may or may not be accounted to the frame it read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayStats {
    /// Frames written with `write_next`.
    pub written: u64,
    /// Swaps that made a new frame visible.
    pub swaps: u64,
    /// Frames that were replaced before any reader copied them out.
    pub dropped: u64,
}

impl BufferLimits {
    /// No limits.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    /// Check the memory for two frames of a layout.
    fn check_frames(&self, layout: &FrameLayout) -> Result<usize, ImageError> {
        let total = layout
            .byte_len()
            .checked_mul(2)
            .ok_or(ImageError::out_of_memory(None))?;

        match self.max_bytes {
            Some(max) if total as u64 > max => Err(ImageError::out_of_memory(Some(total))),
            _ => Ok(total),
        }
    }
}

impl DisplayBuffer {
    /// Create a display buffer of black frames.
    ///
    /// The format must be one a renderer takes directly, 8-bit RGB or RGBA.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Result<Self, ImageError> {
        Self::with_limits(format, width, height, BufferLimits::none())
    }

    pub fn with_limits(
        format: PixelFormat,
        width: u32,
        height: u32,
        limits: BufferLimits,
    ) -> Result<Self, ImageError> {
        if format != PixelFormat::RGB8 && format != PixelFormat::RGBA8 {
            return Err(ImageError::invalid(
                "display buffers hold 8-bit RGB or RGBA frames",
            ));
        }

        let layout = FrameLayout::packed(format, width, height)?;
        let slots = Self::allocate(&layout, &limits)?;

        Ok(DisplayBuffer {
            layout,
            limits,
            slots,
            visible: AtomicUsize::new(0),
            pending: AtomicBool::new(false),
            written: AtomicU64::new(0),
            seen: AtomicU64::new(0),
            swaps: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// The layout of both frames, always packed.
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

    pub fn limits(&self) -> &BufferLimits {
        &self.limits
    }

    /// Reallocate both frames for new dimensions, discarding their contents.
    ///
    /// Fails with `OutOfMemory` if the frames exceed the limits or can not be allocated. The
    /// buffer then keeps its previous dimensions and frames, unchanged.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ImageError> {
        let layout = FrameLayout::packed(*self.format(), width, height)?;
        let slots = match Self::allocate(&layout, &self.limits) {
            Ok(slots) => slots,
            Err(err) => {
                log::warn!(
                    "rejected display resize to {}x{}, keeping {}x{}: {}",
                    width,
                    height,
                    self.width(),
                    self.height(),
                    err
                );
                return Err(err);
            }
        };

        log::debug!(
            "resized display from {}x{} to {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );

        self.layout = layout;
        self.slots = slots;
        *self.visible.get_mut() = 0;
        *self.pending.get_mut() = false;
        Ok(())
    }

    /// Divide into the producer and consumer sides.
    ///
    /// The writer and readers may be moved to different threads, for instance with
    /// `std::thread::scope`.
    pub fn split(&mut self) -> (FrameWriter<'_>, FrameReader<'_>) {
        let display = &*self;
        (FrameWriter { display }, FrameReader { display })
    }

    /// Copy an image into the frame that is not visible.
    ///
    /// Fails with `InvalidFormat` or `DimensionMismatch` if the image is not in the format or not
    /// of the dimensions of this buffer. A previously written frame that was not swapped in yet is
    /// dropped.
    pub fn write_next(&mut self, image: &ImageBuffer) -> Result<(), ImageError> {
        self.write_back(image)
    }

    /// Make the last written frame visible.
    ///
    /// Returns `false`, and changes nothing, if no frame was written since the last swap.
    pub fn swap(&mut self) -> bool {
        self.swap_slots()
    }

    /// Copy out the visible frame.
    pub fn visible(&self) -> Result<VisibleFrame, ImageError> {
        let mut image = ImageBuffer::new(self.layout.clone())?;
        let generation = self.read_front(&mut image);
        Ok(VisibleFrame { image, generation })
    }

    /// Copy the visible frame into an existing image, reusing its allocation.
    ///
    /// The image takes the packed layout of this buffer. Returns the generation of the frame.
    pub fn visible_into(&self, image: &mut ImageBuffer) -> Result<u64, ImageError> {
        image.set_layout_conservative(self.layout.clone())?;
        Ok(self.read_front(image))
    }

    /// The generation of the visible frame, zero if no frame was swapped in yet.
    pub fn generation(&self) -> u64 {
        loop {
            let slot = &self.slots[self.visible.load(Ordering::Acquire)];
            let seq = slot.seq.load(Ordering::Acquire);
            if seq % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let generation = slot.generation.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            if slot.seq.load(Ordering::Relaxed) == seq {
                return generation;
            }
        }
    }

    pub fn stats(&self) -> DisplayStats {
        DisplayStats {
            written: self.written.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn allocate(layout: &FrameLayout, limits: &BufferLimits) -> Result<[Slot; 2], ImageError> {
        limits.check_frames(layout)?;
        let len = layout.byte_len();
        Ok([Slot::try_new(len)?, Slot::try_new(len)?])
    }

    /// Only the single writer calls this.
    fn write_back(&self, image: &ImageBuffer) -> Result<(), ImageError> {
        if image.format() != self.format() {
            return Err(ImageError::invalid(
                "frame format differs from the display format",
            ));
        }

        if image.layout().dimensions() != self.layout.dimensions() {
            return Err(ImageError::DimensionMismatch {
                expected: self.layout.dimensions(),
                found: image.layout().dimensions(),
            });
        }

        let back = 1 - self.visible.load(Ordering::Relaxed);
        let slot = &self.slots[back];
        let generation = self.written.fetch_add(1, Ordering::Relaxed) + 1;

        if self.pending.load(Ordering::Relaxed) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        let seq = slot.seq.load(Ordering::Relaxed);
        slot.seq.store(seq + 1, Ordering::Relaxed);
        fence(Ordering::Release);

        let row_len = self.layout.row_len();
        for (y, row) in image.rows().enumerate() {
            slot.data.store(y * row_len, row);
        }
        slot.generation.store(generation, Ordering::Relaxed);

        slot.seq.store(seq + 2, Ordering::Release);
        self.pending.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Only the single writer calls this.
    fn swap_slots(&self) -> bool {
        if !self.pending.swap(false, Ordering::Relaxed) {
            return false;
        }

        let front = self.visible.load(Ordering::Relaxed);
        let replaced = self.slots[front].generation.load(Ordering::Relaxed);
        if replaced > self.seen.load(Ordering::Relaxed) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        self.visible.store(1 - front, Ordering::Release);
        fence(Ordering::SeqCst);
        let swaps = self.swaps.fetch_add(1, Ordering::Relaxed) + 1;

        log::trace!(
            "swapped display frames, {} swaps, {} dropped",
            swaps,
            self.dropped.load(Ordering::Relaxed)
        );

        true
    }

    /// Copy the visible slot, retrying until the copy is consistent.
    fn read_front(&self, image: &mut ImageBuffer) -> u64 {
        let len = self.layout.byte_len();
        let out = &mut image.as_bytes_mut()[..len];

        loop {
            let slot = &self.slots[self.visible.load(Ordering::Acquire)];
            let seq = slot.seq.load(Ordering::Acquire);
            if seq % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            slot.data.load(0, out);
            let generation = slot.generation.load(Ordering::Relaxed);
            fence(Ordering::Acquire);

            if slot.seq.load(Ordering::Relaxed) == seq {
                self.seen.fetch_max(generation, Ordering::Relaxed);
                return generation;
            }
        }
    }
}

impl Slot {
    fn try_new(len: usize) -> Result<Self, ImageError> {
        Ok(Slot {
            seq: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            data: AtomicBuffer::try_new(len)?,
        })
    }
}

impl FrameWriter<'_> {
    /// See [`DisplayBuffer::write_next`].
    pub fn write_next(&mut self, image: &ImageBuffer) -> Result<(), ImageError> {
        self.display.write_back(image)
    }

    /// See [`DisplayBuffer::swap`].
    pub fn swap(&mut self) -> bool {
        self.display.swap_slots()
    }

    pub fn layout(&self) -> &FrameLayout {
        self.display.layout()
    }
}

impl FrameReader<'_> {
    /// See [`DisplayBuffer::visible`].
    pub fn visible(&self) -> Result<VisibleFrame, ImageError> {
        self.display.visible()
    }

    /// See [`DisplayBuffer::visible_into`].
    pub fn visible_into(&self, image: &mut ImageBuffer) -> Result<u64, ImageError> {
        self.display.visible_into(image)
    }

    pub fn generation(&self) -> u64 {
        self.display.generation()
    }

    pub fn stats(&self) -> DisplayStats {
        self.display.stats()
    }

    pub fn layout(&self) -> &FrameLayout {
        self.display.layout()
    }
}

impl VisibleFrame {
    pub fn image(&self) -> &ImageBuffer {
        &self.image
    }

    /// Counts the frames written to the display, zero for the initial black frame.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn into_image(self) -> ImageBuffer {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(format: PixelFormat, width: u32, height: u32, value: u8) -> ImageBuffer {
        let mut image = ImageBuffer::packed(format, width, height).unwrap();
        image.as_bytes_mut().fill(value);
        image
    }

    #[test]
    fn swap_requires_a_written_frame() -> Result<(), ImageError> {
        let mut display = DisplayBuffer::new(PixelFormat::RGB8, 3, 2)?;
        assert!(!display.swap());
        assert_eq!(display.generation(), 0);
        assert!(display.visible()?.image().as_bytes().iter().all(|&b| b == 0));

        display.write_next(&filled(PixelFormat::RGB8, 3, 2, 7))?;
        // Not visible before the swap.
        assert_eq!(display.visible()?.generation(), 0);
        assert!(display.swap());
        assert!(!display.swap());

        let frame = display.visible()?;
        assert_eq!(frame.generation(), 1);
        assert!(frame.image().as_bytes().iter().all(|&b| b == 7));
        Ok(())
    }

    #[test]
    fn unread_frames_are_dropped() -> Result<(), ImageError> {
        let mut display = DisplayBuffer::new(PixelFormat::RGBA8, 1, 1)?;

        display.write_next(&filled(PixelFormat::RGBA8, 1, 1, 1))?;
        // Overwritten before it was ever swapped in.
        display.write_next(&filled(PixelFormat::RGBA8, 1, 1, 2))?;
        display.swap();
        // Swapped out before any read.
        display.write_next(&filled(PixelFormat::RGBA8, 1, 1, 3))?;
        display.swap();

        let frame = display.visible()?;
        assert_eq!(frame.image().as_bytes(), &[3; 4]);
        assert_eq!(frame.generation(), 3);

        display.write_next(&filled(PixelFormat::RGBA8, 1, 1, 4))?;
        display.swap();

        assert_eq!(
            display.stats(),
            DisplayStats {
                written: 4,
                swaps: 3,
                dropped: 2,
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_mismatched_frames() -> Result<(), ImageError> {
        let mut display = DisplayBuffer::new(PixelFormat::RGB8, 4, 4)?;

        let err = display.write_next(&filled(PixelFormat::RGB8, 4, 3, 0));
        assert!(matches!(
            err,
            Err(ImageError::DimensionMismatch {
                expected: [4, 4],
                found: [4, 3]
            })
        ));

        let err = display.write_next(&filled(PixelFormat::RGBA8, 4, 4, 0));
        assert!(matches!(err, Err(ImageError::InvalidFormat { .. })));
        assert_eq!(display.stats().written, 0);

        let err = DisplayBuffer::new(PixelFormat::MONO8, 4, 4);
        assert!(matches!(err, Err(ImageError::InvalidFormat { .. })));
        Ok(())
    }

    #[test]
    fn padded_frames_are_packed() -> Result<(), ImageError> {
        let mut display = DisplayBuffer::new(PixelFormat::RGB8, 2, 2)?;
        let layout = FrameLayout::new(PixelFormat::RGB8, 2, 2, 8)?;
        let mut image = ImageBuffer::new(layout)?;
        image.as_bytes_mut().copy_from_slice(&[
            1, 2, 3, 4, 5, 6, 0xee, 0xee, //
            7, 8, 9, 10, 11, 12, 0xee, 0xee,
        ]);

        display.write_next(&image)?;
        display.swap();

        let mut out = ImageBuffer::packed(PixelFormat::RGB8, 1, 1)?;
        assert_eq!(display.visible_into(&mut out)?, 1);
        assert_eq!(out.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        Ok(())
    }

    #[test]
    fn resize_rolls_back_over_limit() -> Result<(), ImageError> {
        let limits = BufferLimits::none().with_max_bytes(2 * 4 * 16 * 16);
        let mut display = DisplayBuffer::with_limits(PixelFormat::RGBA8, 8, 8, limits)?;
        display.write_next(&filled(PixelFormat::RGBA8, 8, 8, 9))?;
        display.swap();

        let err = display.resize(32, 32);
        assert_eq!(
            err,
            Err(ImageError::OutOfMemory {
                requested: Some(2 * 4 * 32 * 32)
            })
        );

        assert_eq!(display.layout().dimensions(), [8, 8]);
        let frame = display.visible()?;
        assert_eq!(frame.generation(), 1);
        assert!(frame.image().as_bytes().iter().all(|&b| b == 9));

        display.resize(16, 16)?;
        assert_eq!(display.layout().dimensions(), [16, 16]);
        assert_eq!(display.generation(), 0);
        Ok(())
    }
}
