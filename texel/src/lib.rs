// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `image-view` developers
//! # Texel
//!
//! Byte storage and byte-level descriptors for image data.
//!
//! This library is strictly `no_std` and holds the primitives that the image pipeline builds upon
//! without interpreting any pixel:
//!
//! - [`ByteOrder`] and lane swapping, to read sensor and camera bytes in either endianness.
//! - [`Buffer`], an owned allocation aligned for every sample type, with typed views.
//! - [`AtomicBuffer`], bytes that may be written by one thread while others read them.
//! - [`StrideLayout`], a validated row-major matrix with optional padding at the end of each row.
//!
//! ## Usage
//!
//! ```
//! use image_view_texel::{Buffer, StrideLayout, StrideSpec};
//!
//! // Three bytes per pixel, rows padded to 16 bytes.
//! let layout = StrideLayout::new(StrideSpec {
//!     width: 4,
//!     height: 2,
//!     element_size: 3,
//!     row_stride: 16,
//! })?;
//!
//! let mut buffer = Buffer::new(layout.byte_len());
//! for y in 0..2 {
//!     // Only touches pixel bytes, never the padding.
//!     buffer.as_bytes_mut()[layout.row(y)].fill(0xff);
//! }
//!
//! assert_eq!(buffer.as_bytes()[12..16], [0; 4]);
//! # Ok::<_, image_view_texel::BadStrideError>(())
//! ```
// Be std for doctests, avoids a weird warning about missing allocator.
#![cfg_attr(not(doctest), no_std)]
#![forbid(unsafe_code)]
extern crate alloc;

mod buf;
pub mod endian;
mod stride;

pub use self::buf::{AllocError, AtomicBuffer, Buffer, MaxAligned};
pub use self::endian::ByteOrder;
pub use self::stride::{BadStrideError, StrideLayout, StrideSpec};
