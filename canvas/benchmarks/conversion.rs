use brunch::Bench;

use image_view::{
    ByteOrder, ChannelSemantics, ColorMap, ConvertHint, Converter, ImageBuffer, ImageError,
    PaletteKind, PixelFormat, RawBuffer, SampleDepth,
};

#[derive(Debug)]
struct Convert {
    semantics: ChannelSemantics,
    depth: SampleDepth,
    byte_order: ByteOrder,
    hint: ConvertHint,
    palette: Option<PaletteKind>,
    sz: u32,
}

impl Convert {
    fn name(&self) -> String {
        format!(
            "convert({:?}/{:?}/{:?}, {:?}, {:?}, {})",
            self.semantics,
            self.depth,
            self.byte_order,
            self.hint.format.semantics(),
            self.palette,
            self.sz
        )
    }

    fn prepare(&self) -> Result<impl FnMut(), ImageError> {
        let format = PixelFormat::new(self.semantics, self.depth, self.byte_order);
        // Pad each row, as a camera driver would.
        let stride = format.bytes_per_pixel() * self.sz as usize + 64;
        let bytes = (0..stride * self.sz as usize).map(|i| i as u8).collect();
        let raw = RawBuffer::new(bytes, self.sz, self.sz, stride, format)?;

        let mut converter = Converter::new();
        if let Some(kind) = self.palette {
            let max = self.depth.max_value().map_or(1.0, f64::from);
            converter = converter.with_color_map(ColorMap::build(kind, 256, 0.0, max)?);
        }

        let plan = converter.plan(&format, self.hint)?;
        let mut into = ImageBuffer::packed(self.hint.format, self.sz, self.sz)?;

        Ok(move || {
            if let Err(err) = plan.run_into(&raw, &mut into) {
                panic!("Conversion failed: {:?}", err);
            }
        })
    }
}

fn main() {
    let tests = [
        /* identity and channel shuffles */
        Convert {
            semantics: ChannelSemantics::Rgb,
            depth: SampleDepth::U8,
            byte_order: ByteOrder::NATIVE,
            hint: ConvertHint::rgb8(),
            palette: None,
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Bgra,
            depth: SampleDepth::U8,
            byte_order: ByteOrder::NATIVE,
            hint: ConvertHint::rgba8(),
            palette: None,
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Bgr,
            depth: SampleDepth::U8,
            byte_order: ByteOrder::NATIVE,
            hint: ConvertHint::rgba8(),
            palette: None,
            sz: 512,
        },
        /* depth rescale */
        Convert {
            semantics: ChannelSemantics::Rgb,
            depth: SampleDepth::U16,
            byte_order: ByteOrder::Big,
            hint: ConvertHint::rgb8(),
            palette: None,
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Rgba,
            depth: SampleDepth::F32,
            byte_order: ByteOrder::Little,
            hint: ConvertHint::rgba8(),
            palette: None,
            sz: 512,
        },
        /* mono normalization */
        Convert {
            semantics: ChannelSemantics::Mono,
            depth: SampleDepth::U16,
            byte_order: ByteOrder::Big,
            hint: ConvertHint::mono16(),
            palette: None,
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Mono,
            depth: SampleDepth::U32,
            byte_order: ByteOrder::Little,
            hint: ConvertHint::mono_f32(),
            palette: None,
            sz: 512,
        },
        /* pseudocolor */
        Convert {
            semantics: ChannelSemantics::Mono,
            depth: SampleDepth::U8,
            byte_order: ByteOrder::NATIVE,
            hint: ConvertHint::rgba8(),
            palette: None,
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Mono,
            depth: SampleDepth::U16,
            byte_order: ByteOrder::Little,
            hint: ConvertHint::rgba8(),
            palette: Some(PaletteKind::Viridis),
            sz: 512,
        },
        Convert {
            semantics: ChannelSemantics::Mono,
            depth: SampleDepth::F32,
            byte_order: ByteOrder::Little,
            hint: ConvertHint::rgb8(),
            palette: Some(PaletteKind::Jet),
            sz: 512,
        },
    ];

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|convert| {
        let bench = match convert.prepare() {
            Ok(bench) => bench,
            Err(err) => panic!("Failed to setup benchmark {:?}: {:?}", convert, err),
        };

        Bench::new(format!("image_view::conversion::main::{}", convert.name())).run(bench)
    }));
    benches.finish();
}
