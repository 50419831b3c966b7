//! A pipeline from raw camera and sensor frames to renderer ready pixels.
//!
//! Frames arrive from a producer as a [`RawBuffer`], bytes in whatever depth, channel order and
//! byte order the device delivers. A [`Converter`] turns them into an [`ImageBuffer`] in one of a
//! few normalized formats, coloring single channel data through a [`ColorMap`] on the way. The
//! result is finally copied into a [`DisplayBuffer`], the double buffered handoff to a renderer
//! running on another thread.
//!
//! # Usage
//!
//! Displaying the frames of a mono 16-bit camera with a pseudocolor palette:
//! 1. Describe the producer's format and wrap its bytes
//! 2. Convert into RGBA, through a palette covering the sensor's range
//! 3. Write the result into the display and swap it in
//!
//! ```
//! use image_view::{ByteOrder, ChannelSemantics, PixelFormat, RawBuffer};
//! use image_view::{ColorMap, ConvertHint, Converter, DisplayBuffer, PaletteKind};
//!
//! let format = PixelFormat::from_descriptor(1, 16, false, ByteOrder::Big, ChannelSemantics::Mono)?;
//! let mut display = DisplayBuffer::new(PixelFormat::RGBA8, 64, 48)?;
//!
//! let palette = ColorMap::build(PaletteKind::Viridis, 256, 0.0, 4095.0)?;
//! let converter = Converter::new().with_color_map(palette);
//! let plan = converter.plan(&format, ConvertHint::rgba8())?;
//!
//! // … omitted: a capture callback handing over its bytes
//! let bytes = vec![0; 64 * 48 * 2];
//! let raw = RawBuffer::new(bytes, 64, 48, 128, format)?;
//!
//! let image = plan.run(&raw)?;
//! display.write_next(&image)?;
//! display.swap();
//!
//! // Now read the visible frame, e.g. to upload it as a texture.
//! let frame = display.visible()?;
//! assert_eq!(frame.image().as_bytes().len(), 64 * 48 * 4);
//! # Ok::<(), image_view::ImageError>(())
//! ```
#![forbid(unsafe_code)]

/// Palettes and lookup tables.
mod color_map;
/// Conversion operation.
mod convert;
/// The renderer handoff.
mod display;
mod error;
/// The normalized buffer type.
mod image;
/// Formats and the validated layout of frames.
mod layout;
mod math;
/// The producer's frames.
mod raw;


pub use image_view_texel::ByteOrder;

pub use self::color_map::{ColorMap, Interpolation, PaletteConfig, PaletteKind, SharedColorMap};
pub use self::convert::{
    ConvertHint, ConvertOptions, ConvertPlan, Converter, DomainPolicy, FrameRef, PixelSource,
};
pub use self::display::{
    BufferLimits, DisplayBuffer, DisplayStats, FrameReader, FrameWriter, VisibleFrame,
};
pub use self::error::ImageError;
pub use self::image::ImageBuffer;
pub use self::layout::{ChannelSemantics, FrameLayout, PixelFormat, SampleDepth, SemanticsFamily};
pub use self::raw::RawBuffer;
