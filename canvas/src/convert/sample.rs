//! Reading single channel values in every supported depth and byte order.
//!
//! The depth and order of a source are known when a conversion is planned. At that point we pick
//! monomorphized readers and store them as plain function pointers, so the loops over pixels do
//! not need to inspect the format again.
use image_view_texel::{endian, ByteOrder};

use crate::layout::SampleDepth;
use crate::math;

/// Channel readers for one sample depth and byte order.
///
/// Each function reads the sample at the start of the byte slice it is given.
#[derive(Clone, Copy)]
pub(crate) struct SampleOps {
    /// The number of bytes of one sample.
    pub(crate) bytes: usize,
    /// Rescale to 8 bits, floats are clamped to their nominal `[0, 1]`.
    pub(crate) to_u8: fn(&[u8]) -> u8,
    /// Rescale to 16 bits, floats are clamped to their nominal `[0, 1]`.
    pub(crate) to_u16: fn(&[u8]) -> u16,
    /// Integers are scaled into `[0, 1]`, floats are passed through unchanged.
    pub(crate) to_f32: fn(&[u8]) -> f32,
    /// The value in its own units, without any scaling.
    pub(crate) scalar: fn(&[u8]) -> f64,
    /// The range of values that is meaningful without a color map.
    pub(crate) nominal: [f64; 2],
}

trait Endian {
    const ORDER: ByteOrder;
}

struct Little;
struct Big;

impl Endian for Little {
    const ORDER: ByteOrder = ByteOrder::Little;
}

impl Endian for Big {
    const ORDER: ByteOrder = ByteOrder::Big;
}

trait Sample: Copy {
    const NOMINAL: [f64; 2];
    fn read<E: Endian>(bytes: &[u8]) -> Self;
    fn to_u8(self) -> u8;
    fn to_u16(self) -> u16;
    fn to_f32(self) -> f32;
    fn to_scalar(self) -> f64;
}

/// Linear rescale between integer ranges, `round(value * to / from)`.
///
/// With `from` being of the form `2^n - 1` no exact midpoint can occur, so the integer division
/// with half the divisor added is the exact rounding.
#[inline]
fn rescale(value: u32, from: u32, to: u32) -> u32 {
    let (value, from, to) = (u64::from(value), u64::from(from), u64::from(to));
    ((value * to + from / 2) / from) as u32
}

#[inline]
fn quantize(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }

    math::round(value.clamp(0.0, 1.0) * max)
}

impl Sample for u8 {
    const NOMINAL: [f64; 2] = [0.0, u8::MAX as f64];

    fn read<E: Endian>(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn to_u8(self) -> u8 {
        self
    }

    fn to_u16(self) -> u16 {
        u16::from(self) * 257
    }

    fn to_f32(self) -> f32 {
        f32::from(self) / f32::from(u8::MAX)
    }

    fn to_scalar(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for u16 {
    const NOMINAL: [f64; 2] = [0.0, u16::MAX as f64];

    fn read<E: Endian>(bytes: &[u8]) -> Self {
        endian::read_u16([bytes[0], bytes[1]], E::ORDER)
    }

    fn to_u8(self) -> u8 {
        rescale(self.into(), u16::MAX.into(), u8::MAX.into()) as u8
    }

    fn to_u16(self) -> u16 {
        self
    }

    fn to_f32(self) -> f32 {
        f32::from(self) / f32::from(u16::MAX)
    }

    fn to_scalar(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for u32 {
    const NOMINAL: [f64; 2] = [0.0, u32::MAX as f64];

    fn read<E: Endian>(bytes: &[u8]) -> Self {
        endian::read_u32([bytes[0], bytes[1], bytes[2], bytes[3]], E::ORDER)
    }

    fn to_u8(self) -> u8 {
        rescale(self, u32::MAX, u8::MAX.into()) as u8
    }

    fn to_u16(self) -> u16 {
        rescale(self, u32::MAX, u16::MAX.into()) as u16
    }

    fn to_f32(self) -> f32 {
        (f64::from(self) / f64::from(u32::MAX)) as f32
    }

    fn to_scalar(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for f32 {
    const NOMINAL: [f64; 2] = [0.0, 1.0];

    fn read<E: Endian>(bytes: &[u8]) -> Self {
        endian::read_f32([bytes[0], bytes[1], bytes[2], bytes[3]], E::ORDER)
    }

    fn to_u8(self) -> u8 {
        quantize(self, f32::from(u8::MAX)) as u8
    }

    fn to_u16(self) -> u16 {
        quantize(self, f32::from(u16::MAX)) as u16
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn to_scalar(self) -> f64 {
        f64::from(self)
    }
}

fn to_u8<T: Sample, E: Endian>(bytes: &[u8]) -> u8 {
    T::read::<E>(bytes).to_u8()
}

fn to_u16<T: Sample, E: Endian>(bytes: &[u8]) -> u16 {
    T::read::<E>(bytes).to_u16()
}

fn to_f32<T: Sample, E: Endian>(bytes: &[u8]) -> f32 {
    T::read::<E>(bytes).to_f32()
}

fn scalar<T: Sample, E: Endian>(bytes: &[u8]) -> f64 {
    T::read::<E>(bytes).to_scalar()
}

impl SampleOps {
    pub(crate) fn new(depth: SampleDepth, order: ByteOrder) -> Self {
        match (depth, order) {
            // The order of a single byte does not matter.
            (SampleDepth::U8, _) => Self::with::<u8, Little>(),
            (SampleDepth::U16, ByteOrder::Little) => Self::with::<u16, Little>(),
            (SampleDepth::U16, ByteOrder::Big) => Self::with::<u16, Big>(),
            (SampleDepth::U32, ByteOrder::Little) => Self::with::<u32, Little>(),
            (SampleDepth::U32, ByteOrder::Big) => Self::with::<u32, Big>(),
            (SampleDepth::F32, ByteOrder::Little) => Self::with::<f32, Little>(),
            (SampleDepth::F32, ByteOrder::Big) => Self::with::<f32, Big>(),
        }
    }

    fn with<T: Sample, E: Endian>() -> Self {
        SampleOps {
            bytes: std::mem::size_of::<T>(),
            to_u8: to_u8::<T, E>,
            to_u16: to_u16::<T, E>,
            to_f32: to_f32::<T, E>,
            scalar: scalar::<T, E>,
            nominal: T::NOMINAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_rescale_rounds() {
        let u16_le = SampleOps::new(SampleDepth::U16, ByteOrder::Little);
        // 0x0080 * 255 / 65535 = 0.498..
        assert_eq!((u16_le.to_u8)(&[0x80, 0x00]), 0);
        // 0x0081 * 255 / 65535 = 0.502..
        assert_eq!((u16_le.to_u8)(&[0x81, 0x00]), 1);
        assert_eq!((u16_le.to_u8)(&[0xff, 0xff]), 255);

        let u16_be = SampleOps::new(SampleDepth::U16, ByteOrder::Big);
        assert_eq!((u16_be.to_u8)(&[0xff, 0x00]), 254);
        assert_eq!((u16_be.scalar)(&[0x01, 0x00]), 256.0);

        let u8 = SampleOps::new(SampleDepth::U8, ByteOrder::Big);
        assert_eq!((u8.to_u16)(&[0x12]), 0x1212);

        let u32_le = SampleOps::new(SampleDepth::U32, ByteOrder::Little);
        assert_eq!((u32_le.to_u8)(&[0xff; 4]), 255);
        assert_eq!((u32_le.to_u16)(&0x8000_0000u32.to_le_bytes()), 0x8000);
    }

    #[test]
    fn float_clamps_when_quantized() {
        let f32_be = SampleOps::new(SampleDepth::F32, ByteOrder::Big);
        assert_eq!((f32_be.to_u8)(&0.5f32.to_be_bytes()), 128);
        assert_eq!((f32_be.to_u8)(&2.0f32.to_be_bytes()), 255);
        assert_eq!((f32_be.to_u8)(&(-1.0f32).to_be_bytes()), 0);
        assert_eq!((f32_be.to_u16)(&f32::NAN.to_be_bytes()), 0);
        // Floats stay floats.
        assert_eq!((f32_be.to_f32)(&7.25f32.to_be_bytes()), 7.25);
        assert!((f32_be.scalar)(&f32::NAN.to_be_bytes()).is_nan());
    }
}
