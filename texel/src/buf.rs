// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `image-view` developers
use core::mem;
use core::ops::Range;
use core::sync::atomic::{AtomicU32, Ordering};

use alloc::vec::Vec;

/// The unit of allocation of a [`Buffer`].
///
/// Any sample type we hand out views for has an alignment requirement of at most this type's
/// alignment, so a slice of it can be reinterpreted as a slice of samples.
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, align(16))]
pub struct MaxAligned(pub [u8; 16]);

/// Allocates and manages raw bytes.
///
/// Provides a utility to allocate a slice of bytes aligned to the maximally required alignment.
/// Since the elements are much larger than single bytes the inner storage will **not** have exact
/// sizes, instead the logical length is tracked next to it. The bytes past the logical length are
/// never exposed.
#[derive(Clone, Default)]
pub struct Buffer {
    /// The backing memory.
    inner: Vec<MaxAligned>,
    /// The number of bytes requested.
    len: usize,
}

/// Allocates and manages atomically shared bytes.
///
/// Each group of four bytes lives in one `AtomicU32` lane. Reads and writes through a shared
/// reference are sound from any number of threads. However, note we promise soundness but _not_
/// absence of tears across lanes, or within a lane that is partially written. External
/// synchronization (such as a sequence counter) has to be used to enforce that additional
/// guarantee. All accesses here are `Relaxed`, the synchronization is entirely up to the caller.
#[derive(Default)]
pub struct AtomicBuffer {
    lanes: Vec<AtomicU32>,
    len: usize,
}

/// An allocation could not be satisfied.
///
/// Either the allocator refused, or the requested length is not representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// The number of bytes that were requested.
    pub requested: usize,
}

impl Buffer {
    const ELEMENT: MaxAligned = MaxAligned([0; 16]);

    /// Allocate a new, zeroed buffer with a number of bytes.
    ///
    /// Panics if the allocation fails, see [`Buffer::try_new`] for a fallible version.
    pub fn new(length: usize) -> Self {
        let inner = alloc::vec![Self::ELEMENT; Self::alloc_len(length)];
        Buffer { inner, len: length }
    }

    /// Allocate a new, zeroed buffer, reporting failure to allocate.
    pub fn try_new(length: usize) -> Result<Self, AllocError> {
        let mut buffer = Buffer::default();
        buffer.try_resize(length)?;
        Ok(buffer)
    }

    /// The logical length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Retrieve the byte capacity of the allocated storage.
    pub fn capacity(&self) -> usize {
        self.inner.capacity() * mem::size_of::<MaxAligned>()
    }

    /// Change the logical length.
    ///
    /// Newly exposed bytes are zero. On failure the buffer is left as it was.
    pub fn try_resize(&mut self, length: usize) -> Result<(), AllocError> {
        let new_len = Self::alloc_len(length);
        let error = AllocError { requested: length };

        if new_len > self.inner.len() {
            self.inner
                .try_reserve_exact(new_len - self.inner.len())
                .map_err(|_| error)?;
        }

        // Clear the tail that was hidden behind the old length.
        if length > self.len {
            let end = self.len.min(self.inner.len() * mem::size_of::<MaxAligned>());
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.inner);
            bytes[end..].fill(0);
        }

        self.inner.resize(new_len, Self::ELEMENT);
        self.len = length;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.inner);
        &bytes[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.inner);
        &mut bytes[..self.len]
    }

    /// View the bytes as a slice of samples.
    ///
    /// A trailing remainder of bytes smaller than one sample is not part of the view.
    pub fn as_texels<T: bytemuck::Pod>(&self) -> &[T] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.inner);
        bytemuck::cast_slice(&bytes[..Self::texel_len::<T>(self.len)])
    }

    /// View the bytes as a mutable slice of samples.
    pub fn as_texels_mut<T: bytemuck::Pod>(&mut self) -> &mut [T] {
        let len = Self::texel_len::<T>(self.len);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.inner);
        bytemuck::cast_slice_mut(&mut bytes[..len])
    }

    fn texel_len<T>(len: usize) -> usize {
        let size = mem::size_of::<T>();
        debug_assert!(mem::align_of::<T>() <= mem::align_of::<MaxAligned>());
        len - len % size
    }

    /// Calculates the number of elements to have a byte buffer of requested length.
    fn alloc_len(length: usize) -> usize {
        const CHUNK_SIZE: usize = mem::size_of::<MaxAligned>();
        // We allocated enough chunks for at least the length. This can never overflow.
        length / CHUNK_SIZE + usize::from(length % CHUNK_SIZE != 0)
    }
}

impl core::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len).finish()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Buffer {}

impl AtomicBuffer {
    const LANE: usize = mem::size_of::<AtomicU32>();

    /// Allocate a new, zeroed buffer of shared bytes.
    pub fn try_new(length: usize) -> Result<Self, AllocError> {
        let count = length / Self::LANE + usize::from(length % Self::LANE != 0);
        let mut lanes = Vec::new();
        lanes
            .try_reserve_exact(count)
            .map_err(|_| AllocError { requested: length })?;
        lanes.resize_with(count, || AtomicU32::new(0));
        Ok(AtomicBuffer { lanes, len: length })
    }

    /// The logical length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write bytes starting at some byte offset.
    ///
    /// Lanes that are only partially covered are updated with atomic read-modify-write operations
    /// so that concurrent writers of the other bytes in that lane are not lost.
    ///
    /// # Panics
    ///
    /// When the written range is not within the logical length.
    pub fn store(&self, offset: usize, bytes: &[u8]) {
        let range = self.checked_range(offset, bytes.len());
        let mut bytes = bytes;
        let mut at = range.start;

        while !bytes.is_empty() {
            let lane = &self.lanes[at / Self::LANE];
            let within = at % Self::LANE;
            let count = (Self::LANE - within).min(bytes.len());
            let (head, rest) = bytes.split_at(count);

            if count == Self::LANE {
                let value = u32::from_ne_bytes([head[0], head[1], head[2], head[3]]);
                lane.store(value, Ordering::Relaxed);
            } else {
                let mut value = [0u8; 4];
                let mut mask = [0u8; 4];
                value[within..][..count].copy_from_slice(head);
                mask[within..][..count].fill(0xff);
                let value = u32::from_ne_bytes(value);
                let mask = u32::from_ne_bytes(mask);
                lane.fetch_and(!mask, Ordering::Relaxed);
                lane.fetch_or(value, Ordering::Relaxed);
            }

            bytes = rest;
            at += count;
        }
    }

    /// Read bytes starting at some byte offset, filling all of `out`.
    ///
    /// # Panics
    ///
    /// When the read range is not within the logical length.
    pub fn load(&self, offset: usize, out: &mut [u8]) {
        let range = self.checked_range(offset, out.len());
        let mut out = out;
        let mut at = range.start;

        while !out.is_empty() {
            let lane = self.lanes[at / Self::LANE].load(Ordering::Relaxed);
            let within = at % Self::LANE;
            let count = (Self::LANE - within).min(out.len());
            let (head, rest) = out.split_at_mut(count);
            head.copy_from_slice(&lane.to_ne_bytes()[within..][..count]);
            out = rest;
            at += count;
        }
    }

    fn checked_range(&self, offset: usize, len: usize) -> Range<usize> {
        let end = offset.checked_add(len).filter(|&end| end <= self.len);
        match end {
            Some(end) => offset..end,
            None => panic!(
                "Range {}+{} out of bounds of an atomic buffer with {} bytes",
                offset, len, self.len
            ),
        }
    }
}

impl core::fmt::Debug for AtomicBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AtomicBuffer")
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_clears_tail() {
        let mut buffer = Buffer::new(20);
        buffer.as_bytes_mut().fill(0xaa);
        buffer.try_resize(3).unwrap();
        buffer.try_resize(40).unwrap();
        assert_eq!(&buffer.as_bytes()[..3], &[0xaa; 3]);
        assert!(buffer.as_bytes()[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn typed_views() {
        let mut buffer = Buffer::new(10);
        buffer.as_texels_mut::<u16>()[1] = 0x0102;
        assert_eq!(buffer.as_texels::<u16>().len(), 5);
        assert_eq!(buffer.as_texels::<f32>().len(), 2);
        assert_eq!(&buffer.as_bytes()[2..4], &0x0102u16.to_ne_bytes());
    }

    #[test]
    fn impossible_allocation() {
        assert!(Buffer::try_new(usize::MAX).is_err());
        assert!(AtomicBuffer::try_new(usize::MAX).is_err());
    }

    #[test]
    fn atomic_unaligned_store() {
        let buffer = AtomicBuffer::try_new(11).unwrap();
        buffer.store(0, &[1; 11]);
        buffer.store(3, &[7, 8, 9, 10, 11]);

        let mut out = [0; 11];
        buffer.load(0, &mut out);
        assert_eq!(out, [1, 1, 1, 7, 8, 9, 10, 11, 1, 1, 1]);

        let mut middle = [0; 3];
        buffer.load(5, &mut middle);
        assert_eq!(middle, [9, 10, 11]);
    }

    #[test]
    #[should_panic]
    fn atomic_out_of_bounds() {
        let buffer = AtomicBuffer::try_new(4).unwrap();
        buffer.store(2, &[0; 3]);
    }
}
