//! Kernels for single channel sources.
use super::{DomainPolicy, FrameContext, RowOps};

pub(super) fn to_mono8(ops: &RowOps, _: &FrameContext, src: &[u8], dst: &mut [u8]) {
    for (pixel, out) in src.chunks_exact(ops.in_step).zip(dst.iter_mut()) {
        *out = (ops.sample.to_u8)(pixel);
    }
}

pub(super) fn to_mono16(ops: &RowOps, _: &FrameContext, src: &[u8], dst: &mut [u8]) {
    for (pixel, out) in src.chunks_exact(ops.in_step).zip(dst.chunks_exact_mut(2)) {
        out.copy_from_slice(&(ops.sample.to_u16)(pixel).to_ne_bytes());
    }
}

pub(super) fn to_mono_f32(ops: &RowOps, _: &FrameContext, src: &[u8], dst: &mut [u8]) {
    for (pixel, out) in src.chunks_exact(ops.in_step).zip(dst.chunks_exact_mut(4)) {
        out.copy_from_slice(&(ops.sample.to_f32)(pixel).to_ne_bytes());
    }
}

/// Pseudocolor through the color map, or gray when there is none.
pub(super) fn to_color(ops: &RowOps, ctx: &FrameContext, src: &[u8], dst: &mut [u8]) {
    let invalid = ctx.options.invalid_color;
    let strict = ctx.options.out_of_domain == DomainPolicy::Invalid;
    let pixels = src.chunks_exact(ops.in_step).zip(dst.chunks_exact_mut(ops.out_step));

    match ctx.color_map {
        Some(map) => {
            for (pixel, out) in pixels {
                let value = (ops.sample.scalar)(pixel);
                let color = if strict && !map.contains(value) {
                    None
                } else {
                    map.lookup(value)
                };

                write_color(out, color.unwrap_or(invalid));
            }
        }
        None => {
            let [min, max] = ops.sample.nominal;
            for (pixel, out) in pixels {
                let value = (ops.sample.scalar)(pixel);
                let color = if !value.is_finite() || (strict && !(min..=max).contains(&value)) {
                    invalid
                } else {
                    [(ops.sample.to_u8)(pixel); 3]
                };

                write_color(out, color);
            }
        }
    }
}

fn write_color(out: &mut [u8], [r, g, b]: [u8; 3]) {
    out[..3].copy_from_slice(&[r, g, b]);
    if let Some(alpha) = out.get_mut(3) {
        *alpha = u8::MAX;
    }
}
