//! Conversion from producer frames into normalized images.
//!
//! Conversions are registered per pair of source and destination format. Looking up a pair
//! produces a [`ConvertPlan`] which fixes all per-format decisions up front, as a table of
//! function pointers. Running the plan then only loops over rows and pixels.
mod mono;
mod rgb;
mod sample;

use std::sync::Arc;

use crate::color_map::{ColorMap, SharedColorMap};
use crate::error::ImageError;
use crate::image::ImageBuffer;
use crate::layout::{ChannelSemantics, FrameLayout, PixelFormat, SemanticsFamily};

use self::sample::SampleOps;

/// A borrowed frame, the bytes together with their layout.
#[derive(Clone, Copy, Debug)]
pub struct FrameRef<'data> {
    layout: &'data FrameLayout,
    bytes: &'data [u8],
}

/// Anything that can be read as a frame by a conversion.
pub trait PixelSource {
    fn frame(&self) -> FrameRef<'_>;
}

/// Requests a destination format from a conversion.
///
/// Only the normalized formats, see [`PixelFormat::NORMALIZED`], can be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvertHint {
    pub format: PixelFormat,
}

/// What to do with a finite sample outside of the color map's domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainPolicy {
    /// Use the color of the nearest domain bound.
    #[default]
    Clamp,
    /// Use the invalid color.
    Invalid,
}

/// Per-sample behavior of the mono to color conversions.
///
/// A corrupt sample never fails a frame. Non-finite samples are always painted in the invalid
/// color, samples outside the domain depend on the policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvertOptions {
    /// Defaults to magenta.
    pub invalid_color: [u8; 3],
    pub out_of_domain: DomainPolicy,
}

/// Converts frames into normalized images.
///
/// A converter has no mutable state. It can be shared and used by several threads at once, the
/// only thing that changes is the color map and that is replaced atomically as a whole.
///
/// # Usage
///
/// ```
/// use image_view::{ChannelSemantics, ColorMap, ConvertHint, Converter, PaletteKind, PixelFormat, RawBuffer};
/// use image_view::ByteOrder;
///
/// let format = PixelFormat::from_descriptor(1, 16, false, ByteOrder::Little, ChannelSemantics::Mono)?;
/// let raw = RawBuffer::new(vec![0, 0, 0xff, 0x0f], 2, 1, 4, format)?;
///
/// let palette = ColorMap::build(PaletteKind::Hot, 256, 0.0, 4095.0)?;
/// let converter = Converter::new().with_color_map(palette);
///
/// let image = converter.convert(&raw, ConvertHint::rgb8())?;
/// assert_eq!(image.row(0), &[0, 0, 0, 255, 255, 255]);
/// # Ok::<_, image_view::ImageError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Converter {
    options: ConvertOptions,
    color_map: Option<Arc<SharedColorMap>>,
}

/// A conversion between two formats, resolved once and run on any number of frames.
#[derive(Clone, Debug)]
pub struct ConvertPlan {
    from: PixelFormat,
    to: PixelFormat,
    name: &'static str,
    ops: RowOps,
    options: ConvertOptions,
    color_map: Option<Arc<SharedColorMap>>,
}

/// The state shared by all rows of one frame.
pub(crate) struct FrameContext<'run> {
    /// The color map, loaded once for the whole frame.
    pub(crate) color_map: Option<&'run ColorMap>,
    pub(crate) options: &'run ConvertOptions,
}

/// The function pointers and parameters of a conversion.
///
/// There are no formats involved here, the constructor of a plan chooses readers and kernels that
/// match the source and destination.
#[derive(Clone, Copy)]
pub(crate) struct RowOps {
    /// Read the channels of the source.
    pub(crate) sample: SampleOps,
    /// Bytes of one source pixel.
    pub(crate) in_step: usize,
    /// Bytes of one destination pixel.
    pub(crate) out_step: usize,
    /// The index of the source channel to use for red, green, blue and alpha.
    ///
    /// `None` for an alpha the source does not have, it is filled opaque.
    pub(crate) positions: [Option<u8>; 4],
    /// Convert the pixels of one row, the slices do not contain padding.
    pub(crate) row: fn(&RowOps, &FrameContext, &[u8], &mut [u8]),
}

/// Which sources a registered variant accepts.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Accepts {
    Exact(PixelFormat),
    Family(SemanticsFamily),
}

struct Variant {
    name: &'static str,
    accepts: Accepts,
    target: PixelFormat,
    row: fn(&RowOps, &FrameContext, &[u8], &mut [u8]),
}

/// All conversions, exact pairs first.
const VARIANTS: &[Variant] = &[
    Variant {
        name: "copy mono8",
        accepts: Accepts::Exact(PixelFormat::MONO8),
        target: PixelFormat::MONO8,
        row: copy_row,
    },
    Variant {
        name: "copy mono16",
        accepts: Accepts::Exact(PixelFormat::MONO16),
        target: PixelFormat::MONO16,
        row: copy_row,
    },
    Variant {
        name: "copy mono-f32",
        accepts: Accepts::Exact(PixelFormat::MONO_F32),
        target: PixelFormat::MONO_F32,
        row: copy_row,
    },
    Variant {
        name: "copy rgb8",
        accepts: Accepts::Exact(PixelFormat::RGB8),
        target: PixelFormat::RGB8,
        row: copy_row,
    },
    Variant {
        name: "copy rgba8",
        accepts: Accepts::Exact(PixelFormat::RGBA8),
        target: PixelFormat::RGBA8,
        row: copy_row,
    },
    Variant {
        name: "mono to mono8",
        accepts: Accepts::Family(SemanticsFamily::Mono),
        target: PixelFormat::MONO8,
        row: mono::to_mono8,
    },
    Variant {
        name: "mono to mono16",
        accepts: Accepts::Family(SemanticsFamily::Mono),
        target: PixelFormat::MONO16,
        row: mono::to_mono16,
    },
    Variant {
        name: "mono to mono-f32",
        accepts: Accepts::Family(SemanticsFamily::Mono),
        target: PixelFormat::MONO_F32,
        row: mono::to_mono_f32,
    },
    Variant {
        name: "mono to rgb8",
        accepts: Accepts::Family(SemanticsFamily::Mono),
        target: PixelFormat::RGB8,
        row: mono::to_color,
    },
    Variant {
        name: "mono to rgba8",
        accepts: Accepts::Family(SemanticsFamily::Mono),
        target: PixelFormat::RGBA8,
        row: mono::to_color,
    },
    Variant {
        name: "rgb to rgb8",
        accepts: Accepts::Family(SemanticsFamily::Rgb),
        target: PixelFormat::RGB8,
        row: rgb::to_color8,
    },
    Variant {
        name: "rgb to rgba8",
        accepts: Accepts::Family(SemanticsFamily::Rgb),
        target: PixelFormat::RGBA8,
        row: rgb::to_color8,
    },
];

impl<'data> FrameRef<'data> {
    /// The caller guarantees that the bytes cover the layout.
    pub(crate) fn new(layout: &'data FrameLayout, bytes: &'data [u8]) -> Self {
        debug_assert!(bytes.len() >= layout.byte_len());
        FrameRef { layout, bytes }
    }

    pub fn layout(&self) -> &'data FrameLayout {
        self.layout
    }

    /// All bytes of the frame, including padding.
    pub fn as_bytes(&self) -> &'data [u8] {
        self.bytes
    }

    /// The pixel bytes of one row, without padding.
    pub fn row(&self, y: u32) -> &'data [u8] {
        &self.bytes[self.layout.row(y as usize)]
    }
}

impl PixelSource for FrameRef<'_> {
    fn frame(&self) -> FrameRef<'_> {
        *self
    }
}

impl<T: PixelSource + ?Sized> PixelSource for &'_ T {
    fn frame(&self) -> FrameRef<'_> {
        (**self).frame()
    }
}

impl ConvertHint {
    pub const fn new(format: PixelFormat) -> Self {
        ConvertHint { format }
    }

    pub const fn mono8() -> Self {
        Self::new(PixelFormat::MONO8)
    }

    pub const fn mono16() -> Self {
        Self::new(PixelFormat::MONO16)
    }

    pub const fn mono_f32() -> Self {
        Self::new(PixelFormat::MONO_F32)
    }

    pub const fn rgb8() -> Self {
        Self::new(PixelFormat::RGB8)
    }

    pub const fn rgba8() -> Self {
        Self::new(PixelFormat::RGBA8)
    }
}

impl From<PixelFormat> for ConvertHint {
    fn from(format: PixelFormat) -> Self {
        ConvertHint::new(format)
    }
}

impl ConvertOptions {
    pub const MAGENTA: [u8; 3] = [0xff, 0x00, 0xff];
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            invalid_color: Self::MAGENTA,
            out_of_domain: DomainPolicy::Clamp,
        }
    }
}

impl Converter {
    /// A converter with default options and grayscale passthrough for mono sources.
    pub fn new() -> Self {
        Converter::default()
    }

    pub fn with_options(self, options: ConvertOptions) -> Self {
        Converter { options, ..self }
    }

    /// Attach a color map for mono sources, owned by this converter alone.
    pub fn with_color_map(self, map: ColorMap) -> Self {
        self.with_shared_color_map(Arc::new(SharedColorMap::new(map)))
    }

    /// Attach a color map that can be swapped from the outside while conversions run.
    pub fn with_shared_color_map(self, map: Arc<SharedColorMap>) -> Self {
        Converter {
            color_map: Some(map),
            ..self
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn color_map(&self) -> Option<&Arc<SharedColorMap>> {
        self.color_map.as_ref()
    }

    /// Resolve the conversion from a source format to the requested format.
    ///
    /// An exact registration for the pair wins over one accepting the whole family of the
    /// source's channel semantics. Fails with `UnsupportedConversion` if neither exists.
    pub fn plan(
        &self,
        source: &PixelFormat,
        hint: ConvertHint,
    ) -> Result<ConvertPlan, ImageError> {
        let plan = self.resolve(source, hint)?;
        log::debug!(
            "planned conversion {:?} -> {:?} via {}",
            source,
            plan.to,
            plan.name
        );
        Ok(plan)
    }

    fn resolve(&self, source: &PixelFormat, hint: ConvertHint) -> Result<ConvertPlan, ImageError> {
        let target = hint.format;
        let unsupported = ImageError::UnsupportedConversion {
            from: *source,
            to: target,
        };

        let exact = Accepts::Exact(*source);
        let family = Accepts::Family(source.semantics().family());
        let variant = [exact, family]
            .into_iter()
            .find_map(|accepts| {
                VARIANTS
                    .iter()
                    .find(|variant| variant.target == target && variant.accepts == accepts)
            })
            .ok_or(unsupported)?;

        let ops = RowOps::new(source, &target, variant.row);
        Ok(ConvertPlan {
            from: *source,
            to: target,
            name: variant.name,
            ops,
            options: self.options,
            color_map: self.color_map.clone(),
        })
    }

    /// Convert a source into a newly allocated image.
    ///
    /// This resolves the conversion for every call. For a stream of frames in one format, hold
    /// on to the [`ConvertPlan`] instead.
    pub fn convert(
        &self,
        source: impl PixelSource,
        hint: ConvertHint,
    ) -> Result<ImageBuffer, ImageError> {
        let frame = source.frame();
        self.resolve(frame.layout().format(), hint)?.run(frame)
    }

    /// Convert a source into an existing image, in the image's format.
    ///
    /// Fails with `DimensionMismatch` if the image does not have the width and height of the
    /// source. The image's own row stride is respected, its padding is left untouched.
    pub fn convert_into(
        &self,
        source: impl PixelSource,
        target: &mut ImageBuffer,
    ) -> Result<(), ImageError> {
        let frame = source.frame();
        let hint = ConvertHint::new(*target.format());
        self.resolve(frame.layout().format(), hint)?
            .run_into(frame, target)
    }
}

impl ConvertPlan {
    pub fn source_format(&self) -> &PixelFormat {
        &self.from
    }

    pub fn target_format(&self) -> &PixelFormat {
        &self.to
    }

    /// A short name of the conversion that was chosen, for diagnostics.
    pub fn variant(&self) -> &'static str {
        self.name
    }

    /// Run the conversion into a newly allocated, packed image.
    pub fn run(&self, source: impl PixelSource) -> Result<ImageBuffer, ImageError> {
        let frame = source.frame();
        let layout = frame.layout();
        let mut target = ImageBuffer::packed(self.to, layout.width(), layout.height())?;
        self.run_frame(frame, &mut target)?;
        Ok(target)
    }

    /// Run the conversion into an existing image.
    ///
    /// The image must have the target format of this plan and the dimensions of the source.
    pub fn run_into(
        &self,
        source: impl PixelSource,
        target: &mut ImageBuffer,
    ) -> Result<(), ImageError> {
        let frame = source.frame();
        let layout = frame.layout();

        if *target.format() != self.to {
            return Err(ImageError::invalid(
                "target image does not have the planned format",
            ));
        }

        if layout.dimensions() != target.layout().dimensions() {
            return Err(ImageError::DimensionMismatch {
                expected: layout.dimensions(),
                found: target.layout().dimensions(),
            });
        }

        self.run_frame(frame, target)
    }

    fn run_frame(&self, frame: FrameRef<'_>, target: &mut ImageBuffer) -> Result<(), ImageError> {
        if *frame.layout().format() != self.from {
            return Err(ImageError::invalid(
                "source does not have the planned format",
            ));
        }

        let color_map = self.color_map.as_ref().map(|shared| shared.load());
        let context = FrameContext {
            color_map: color_map.as_deref(),
            options: &self.options,
        };

        for y in 0..frame.layout().height() {
            let row = frame.row(y);
            (self.ops.row)(&self.ops, &context, row, target.row_mut(y as usize));
        }

        log::trace!(
            "converted {}x{} frame via {}",
            frame.layout().width(),
            frame.layout().height(),
            self.name
        );

        Ok(())
    }
}

impl RowOps {
    fn new(
        source: &PixelFormat,
        target: &PixelFormat,
        row: fn(&RowOps, &FrameContext, &[u8], &mut [u8]),
    ) -> Self {
        let semantics = source.semantics();
        let positions = match semantics {
            // Every color channel reads the one sample.
            ChannelSemantics::Mono => [Some(0), Some(0), Some(0), None],
            _ => semantics.positions(),
        };

        RowOps {
            sample: SampleOps::new(source.depth(), source.byte_order()),
            in_step: source.bytes_per_pixel(),
            out_step: target.bytes_per_pixel(),
            positions,
            row,
        }
    }
}

impl std::fmt::Debug for RowOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowOps")
            .field("in_step", &self.in_step)
            .field("out_step", &self.out_step)
            .field("positions", &self.positions)
            .finish_non_exhaustive()
    }
}

/// Source and destination have the exact same format.
fn copy_row(_: &RowOps, _: &FrameContext, src: &[u8], dst: &mut [u8]) {
    dst.copy_from_slice(src);
}
