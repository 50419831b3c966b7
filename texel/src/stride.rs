// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `image-view` developers
//! Byte-based, strided row layouts.
//!
//! Every row starts `row_stride` bytes after the previous one, with all pixels of the row packed at
//! its beginning. The bytes between the end of the pixels and the start of the next row are
//! padding. They belong to the buffer but are never pixel data: operations handing out row ranges
//! exclude them.
use core::ops::Range;

/// A simple layout describing some pixels as a byte matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrideSpec {
    /// The number of pixels in width direction.
    pub width: usize,
    /// The number of pixels in height direction.
    pub height: usize,
    /// The number of bytes of a single pixel.
    pub element_size: usize,
    /// The number of bytes to go one pixel along the height, including padding.
    pub row_stride: usize,
}

/// A validated layout of a rectangular matrix of pixels, treated as bytes.
///
/// The invariants are that the whole layout fits into memory and that each row has room for all
/// of its pixels, additionally ensuring that all indices within are proper indices into a byte
/// slice of [`StrideLayout::byte_len`] bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrideLayout {
    spec: StrideSpec,
    /// The bytes of pixels in one row, as proof of calculation basically.
    row_len: usize,
    /// The total number of bytes.
    total: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadStrideError {
    kind: BadStrideKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BadStrideKind {
    RowTooShort,
    OutOfMemory,
}

impl StrideSpec {
    /// A spec with rows packed without any padding.
    pub fn packed(width: usize, height: usize, element_size: usize) -> Option<Self> {
        Some(StrideSpec {
            width,
            height,
            element_size,
            row_stride: width.checked_mul(element_size)?,
        })
    }
}

impl StrideLayout {
    /// Try to create a new layout from a specification.
    ///
    /// This fails if a row of pixels does not fit into the stride, or if the layout does not
    /// describe a memory size expressible on the current architecture.
    pub fn new(spec: StrideSpec) -> Result<Self, BadStrideError> {
        let row_len = spec
            .width
            .checked_mul(spec.element_size)
            .ok_or(BadStrideKind::OutOfMemory)?;

        if row_len > spec.row_stride {
            return Err(BadStrideKind::RowTooShort.into());
        }

        let total = spec
            .row_stride
            .checked_mul(spec.height)
            .filter(|&total| total <= isize::MAX as usize)
            .ok_or(BadStrideKind::OutOfMemory)?;

        Ok(StrideLayout {
            spec,
            row_len,
            total,
        })
    }

    /// Get the specification of this matrix.
    pub fn spec(&self) -> StrideSpec {
        self.spec
    }

    /// The number of bytes that are required to store all rows, including padding.
    pub fn byte_len(&self) -> usize {
        self.total
    }

    /// The number of pixel bytes in each row, excluding padding.
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Are there any padding bytes between rows?
    pub fn is_packed(&self) -> bool {
        self.row_len == self.spec.row_stride
    }

    /// The byte range of pixels in one row.
    ///
    /// # Panics
    ///
    /// When the row is not within the height of the layout.
    pub fn row(&self, y: usize) -> Range<usize> {
        assert!(y < self.spec.height, "Row {} of {}", y, self.spec.height);
        let start = y * self.spec.row_stride;
        start..start + self.row_len
    }

    /// The byte range of one pixel, if it is within the matrix.
    pub fn element(&self, x: usize, y: usize) -> Option<Range<usize>> {
        if x >= self.spec.width || y >= self.spec.height {
            return None;
        }

        let start = y * self.spec.row_stride + x * self.spec.element_size;
        Some(start..start + self.spec.element_size)
    }
}

impl BadStrideError {
    /// Whether the layout was rejected for not being representable in memory.
    pub fn is_out_of_memory(&self) -> bool {
        self.kind == BadStrideKind::OutOfMemory
    }
}

impl From<BadStrideKind> for BadStrideError {
    fn from(kind: BadStrideKind) -> Self {
        BadStrideError { kind }
    }
}

impl core::fmt::Display for BadStrideError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            BadStrideKind::RowTooShort => f.write_str("row stride shorter than a row of pixels"),
            BadStrideKind::OutOfMemory => f.write_str("layout exceeds addressable memory"),
        }
    }
}
