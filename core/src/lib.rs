//! Core primitives of the DICOM binary data layer.
//!
//! This crate provides the low-level byte containers on which a DICOM
//! codec layer is built:
//!
//! - [`BinaryBuffer`], a byte container which transparently keeps its
//!   contents either in a plain array or in a lazily materialized,
//!   seekable in-memory stream, with chop/append/copy/swap operations
//!   that behave identically in both modes;
//! - the [`text`] module, with support for encoding and decoding text
//!   according to the DICOM Specific Character Set element.
//!
//! Buffers are plain mutable values with no internal synchronization.
//! Sharing a buffer across threads requires external locking by the
//! caller.
//!
//! # Example
//!
//! ```
//! use dicombin_core::BinaryBuffer;
//!
//! let mut buffer = BinaryBuffer::from_vec(vec![0x10, 0x27, 0x00, 0x80]);
//! buffer.swap2();
//! assert_eq!(buffer.to_bytes(), vec![0x27, 0x10, 0x80, 0x00]);
//! ```

pub mod buffer;
pub mod text;

mod mem;

pub use buffer::{BinaryBuffer, CapacityMode, SwapSizeError};
pub use text::{SpecificCharacterSet, TextCodec};

pub use byteordered::Endianness;
