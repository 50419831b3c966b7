use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use image_view::{
    BufferLimits, ConvertHint, Converter, DisplayBuffer, ImageBuffer, ImageError, PixelFormat,
    RawBuffer,
};

const WIDTH: u32 = 32;
const HEIGHT: u32 = 16;

/// Stops the consumer however the producer exits, so the scope can join it.
struct StopOnDrop<'flag>(&'flag AtomicBool);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn marker_frame(converter: &Converter, marker: u8) -> Result<ImageBuffer, ImageError> {
    // Mono frames, as a sensor would deliver them, padded by a few bytes per row.
    let stride = WIDTH as usize + 3;
    let raw = RawBuffer::new(
        vec![marker; stride * HEIGHT as usize],
        WIDTH,
        HEIGHT,
        stride,
        PixelFormat::MONO8,
    )?;

    converter.convert(&raw, ConvertHint::rgb8())
}

#[test]
fn readers_never_see_torn_frames() -> Result<(), ImageError> {
    const FRAMES: u64 = 10_000;

    let mut display = DisplayBuffer::new(PixelFormat::RGB8, WIDTH, HEIGHT)?;
    let (mut writer, reader) = display.split();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let consumer = scope.spawn(|| {
            let mut image = ImageBuffer::packed(PixelFormat::RGB8, 1, 1)?;
            let mut last = 0;
            let mut reads = 0u64;

            while !done.load(Ordering::Acquire) {
                let generation = reader.visible_into(&mut image)?;
                assert!(generation >= last, "went back from {} to {}", last, generation);
                last = generation;

                // Every byte of a frame carries the same marker.
                let marker = generation as u8;
                assert!(
                    image.as_bytes().iter().all(|&b| b == marker),
                    "torn frame at generation {}",
                    generation
                );
                reads += 1;
            }

            Ok::<_, ImageError>(reads)
        });

        let stop = StopOnDrop(&done);
        let converter = Converter::new();
        for generation in 1..=FRAMES {
            let image = marker_frame(&converter, generation as u8)?;
            writer.write_next(&image)?;
            assert!(writer.swap());
        }
        drop(stop);

        let reads = consumer.join().expect("consumer panicked")?;
        assert!(reads > 0);
        Ok::<_, ImageError>(())
    })?;

    let stats = display.stats();
    assert_eq!(stats.written, FRAMES);
    assert_eq!(stats.swaps, FRAMES);
    assert!(stats.dropped < FRAMES);
    assert_eq!(display.visible()?.generation(), FRAMES);

    Ok(())
}

#[test]
fn several_readers() -> Result<(), ImageError> {
    let mut display = DisplayBuffer::new(PixelFormat::RGB8, WIDTH, HEIGHT)?;
    let (mut writer, reader) = display.split();

    thread::scope(|scope| {
        let converter = Converter::new();
        writer.write_next(&marker_frame(&converter, 7)?)?;
        writer.swap();

        let readers: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || reader.visible()))
            .collect();

        for handle in readers {
            let frame = handle.join().expect("reader panicked")?;
            assert_eq!(frame.generation(), 1);
            assert!(frame.image().as_bytes().iter().all(|&b| b == 7));
        }

        Ok::<_, ImageError>(())
    })
}

#[test]
fn failed_resize_keeps_the_visible_frame() -> Result<(), ImageError> {
    let frame_bytes = u64::from(WIDTH * HEIGHT * 3);
    let limits = BufferLimits::none().with_max_bytes(2 * frame_bytes);
    let mut display = DisplayBuffer::with_limits(PixelFormat::RGB8, WIDTH, HEIGHT, limits)?;

    let converter = Converter::new();
    display.write_next(&marker_frame(&converter, 42)?)?;
    display.swap();

    let err = display.resize(WIDTH * 2, HEIGHT);
    assert!(matches!(err, Err(ImageError::OutOfMemory { .. })));

    assert_eq!((display.width(), display.height()), (WIDTH, HEIGHT));
    let frame = display.visible()?;
    assert_eq!(frame.generation(), 1);
    assert!(frame.image().as_bytes().iter().all(|&b| b == 42));

    // Still usable for writes of the old size.
    display.write_next(&marker_frame(&converter, 43)?)?;
    assert!(display.swap());
    assert_eq!(display.generation(), 2);

    // Smaller always fits.
    display.resize(WIDTH / 2, HEIGHT)?;
    assert_eq!(display.width(), WIDTH / 2);
    assert!(display.visible()?.image().as_bytes().iter().all(|&b| b == 0));

    Ok(())
}
