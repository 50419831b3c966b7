//! Log levels of the conversion paths, checked with a recording logger.
//!
//! A process has only one logger so everything here is a single test.
use std::sync::Mutex;

use image_view::{ConvertHint, Converter, ImageBuffer, PixelFormat, RawBuffer};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Recorder {
    events: Mutex<Vec<(Level, String)>>,
}

static RECORDER: Recorder = Recorder {
    events: Mutex::new(Vec::new()),
};

impl Log for Recorder {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target().starts_with("image_view") {
            let mut events = self.events.lock().unwrap();
            events.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

impl Recorder {
    fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

fn debug_events(events: &[(Level, String)]) -> usize {
    events.iter().filter(|(level, _)| *level <= Level::Debug).count()
}

#[test]
fn only_planning_logs_at_debug() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let raw = RawBuffer::new(vec![1, 2, 3, 4], 2, 2, 2, PixelFormat::MONO8).unwrap();
    let converter = Converter::new();

    let plan = converter.plan(raw.layout().format(), ConvertHint::rgb8()).unwrap();
    let events = RECORDER.take();
    assert_eq!(debug_events(&events), 1);
    assert!(events[0].1.contains("planned conversion"));

    for _ in 0..3 {
        plan.run(&raw).unwrap();
    }

    let events = RECORDER.take();
    assert_eq!(debug_events(&events), 0);
    assert_eq!(events.len(), 3);

    let mut target = ImageBuffer::packed(PixelFormat::RGBA8, 2, 2).unwrap();
    for _ in 0..3 {
        converter.convert(&raw, ConvertHint::mono16()).unwrap();
        converter.convert_into(&raw, &mut target).unwrap();
    }

    let events = RECORDER.take();
    assert_eq!(debug_events(&events), 0);
    assert!(events.iter().all(|(level, _)| *level == Level::Trace));
}
