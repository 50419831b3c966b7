use image_view_texel::AtomicBuffer;
use std::thread;

#[test]
fn storing_atomics_parallel() {
    const LEN: usize = 127;
    let buffer = AtomicBuffer::try_new(LEN).unwrap();

    const SPLIT_MAX: usize = LEN;
    // Proxy for whether we run with optimization. Makes execution time bearable.
    #[cfg(debug_assertions)]
    const REPEAT: usize = 1 << 4;
    #[cfg(not(debug_assertions))]
    const REPEAT: usize = 1 << 10;

    for split in 0..SPLIT_MAX {
        // We want the modifying loops to overlap as much as possible for the strongest test, so
        // ensure they do not run early.
        let barrier = &std::sync::Barrier::new(2);
        let buffer = &buffer;

        // Concurrently and repeatedly write non-overlapping parts of the buffer, which share a
        // lane at the split point whenever it is not a multiple of four.
        thread::scope(|join| {
            join.spawn(move || {
                let _ = barrier.wait();
                let head = [split as u8; LEN];
                for _ in 0..REPEAT {
                    buffer.store(0, &head[..split]);
                }
            });

            join.spawn(move || {
                let _ = barrier.wait();
                let tail = [!(split as u8); LEN];
                for _ in 0..REPEAT {
                    buffer.store(split, &tail[split..]);
                }
            });
        });

        // No write of either side may be lost, even within a shared lane.
        let mut out = [0u8; LEN];
        buffer.load(0, &mut out);
        assert!(out[..split].iter().all(|&b| b == split as u8), "split {}", split);
        assert!(out[split..].iter().all(|&b| b == !(split as u8)), "split {}", split);
    }
}
