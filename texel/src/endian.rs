// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `image-view` developers
//! Byte order of multi-byte samples.
//!
//! Cameras and scientific sensors deliver samples in whatever order their wire protocol or file
//! format dictates. Nothing in here interprets pixels, it only moves bytes within lanes.

/// The order of bytes within a multi-byte sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first, also called network order.
    Big,
}

impl ByteOrder {
    /// The byte order of the target we are compiled for.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = ByteOrder::Little;
    /// The byte order of the target we are compiled for.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = ByteOrder::Big;

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }

    /// The opposite order.
    pub fn swapped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// Reverse the bytes of each 2-byte lane.
///
/// A trailing partial lane is left untouched.
pub fn swap_u16_lanes(bytes: &mut [u8]) {
    for lane in bytes.chunks_exact_mut(2) {
        lane.swap(0, 1);
    }
}

/// Reverse the bytes of each 4-byte lane.
///
/// A trailing partial lane is left untouched.
pub fn swap_u32_lanes(bytes: &mut [u8]) {
    for lane in bytes.chunks_exact_mut(4) {
        lane.reverse();
    }
}

#[inline]
pub fn read_u16(bytes: [u8; 2], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::Little => u16::from_le_bytes(bytes),
        ByteOrder::Big => u16::from_be_bytes(bytes),
    }
}

#[inline]
pub fn read_u32(bytes: [u8; 4], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::Little => u32::from_le_bytes(bytes),
        ByteOrder::Big => u32::from_be_bytes(bytes),
    }
}

#[inline]
pub fn read_f32(bytes: [u8; 4], order: ByteOrder) -> f32 {
    f32::from_bits(read_u32(bytes, order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_swap_in_place() {
        let mut bytes = [0x12, 0x34, 0x56, 0x78, 0x9a];
        swap_u16_lanes(&mut bytes);
        assert_eq!(bytes, [0x34, 0x12, 0x78, 0x56, 0x9a]);

        let mut bytes = [0x12, 0x34, 0x56, 0x78, 0x9a];
        swap_u32_lanes(&mut bytes);
        assert_eq!(bytes, [0x78, 0x56, 0x34, 0x12, 0x9a]);
    }

    #[test]
    fn read_both_orders() {
        assert_eq!(read_u16([0x01, 0x02], ByteOrder::Little), 0x0201);
        assert_eq!(read_u16([0x01, 0x02], ByteOrder::Big), 0x0102);
        assert_eq!(read_u32([0, 0, 0x80, 0x3f], ByteOrder::Little), 0x3f80_0000);
        assert_eq!(read_f32([0x3f, 0x80, 0, 0], ByteOrder::Big), 1.0);
        assert_eq!(ByteOrder::NATIVE.swapped().swapped(), ByteOrder::NATIVE);
    }
}
