//! Kernels for color sources, reordering channels and rescaling depth.
use super::{FrameContext, RowOps};

/// Write 8-bit red, green, blue and, if the destination has room for it, alpha.
///
/// An alpha channel missing in the source is filled with full opacity.
pub(super) fn to_color8(ops: &RowOps, _: &FrameContext, src: &[u8], dst: &mut [u8]) {
    let bytes = ops.sample.bytes;
    for (pixel, out) in src.chunks_exact(ops.in_step).zip(dst.chunks_exact_mut(ops.out_step)) {
        for (channel, position) in out.iter_mut().zip(ops.positions) {
            *channel = match position {
                Some(idx) => (ops.sample.to_u8)(&pixel[usize::from(idx) * bytes..]),
                None => u8::MAX,
            };
        }
    }
}
