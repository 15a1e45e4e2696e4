//! Extraction of overlays embedded in unused pixel data bits.
//!
//! Older objects store overlay planes in the high bits of each pixel
//! cell instead of a standalone Overlay Data element. The routines
//! here move such a plane out of the pixel data: the overlay bit of
//! every pixel of every frame is collected into a packed bit plane,
//! the bit is cleared from the pixel data, and the overlay group is
//! rewritten to describe standalone data.

use dicombin_core::{BinaryBuffer, Endianness};
use snafu::{ensure, Backtrace, Snafu};
use tracing::debug;

use crate::dataset::{AttributeProvider, BinaryVr};
use crate::plane::OverlayPlane;
use crate::tags;

/// An error extracting an embedded overlay plane from pixel data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ExtractError {
    #[snafu(display("cannot extract overlays from {}-sample pixel data", samples))]
    MultiSamplePixels { samples: u16, backtrace: Backtrace },
    #[snafu(display(
        "pixel data has no unused bits ({} stored of {} allocated)",
        bits_stored,
        bits_allocated
    ))]
    NoUnusedBits {
        bits_stored: u16,
        bits_allocated: u16,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "overlay bit position {} lies inside the stored pixel range (high bit {}, {} stored)",
        bit_position,
        high_bit,
        bits_stored
    ))]
    BitPositionInPixelRange {
        bit_position: u16,
        high_bit: u16,
        bits_stored: u16,
        backtrace: Backtrace,
    },
    #[snafu(display("unsupported bits allocated {}", bits_allocated))]
    UnsupportedBitsAllocated {
        bits_allocated: u16,
        backtrace: Backtrace,
    },
}

/// A borrowed view over uncompressed, frame-contiguous pixel data and
/// the Image Pixel Module facts the extraction needs.
#[derive(Debug)]
pub struct PixelDataView<'a> {
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    pub samples_per_pixel: u16,
    pub rows: u32,
    pub columns: u32,
    pub number_of_frames: u32,
    pub endianness: Endianness,
    pub data: &'a mut [u8],
}

impl<'a> PixelDataView<'a> {
    fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize * self.number_of_frames as usize
    }
}

/// Move an embedded overlay plane out of the pixel data.
///
/// Returns `Ok(false)` without touching anything when the plane
/// already carries standalone overlay data. On success, the packed
/// overlay bits (one plane per image frame, zero padded to an even
/// byte length) replace the Overlay Data element, the overlay bit is
/// cleared from every pixel, and the plane's Bits Allocated, Bit
/// Position, Rows and Columns attributes are rewritten accordingly.
///
/// Word-aligned (OW) overlay data on big endian pixel data gets a
/// 2-byte swap so that the packed words read correctly.
pub fn extract_embedded_overlay<D>(
    plane: &OverlayPlane,
    dataset: &mut D,
    pixels: &mut PixelDataView<'_>,
) -> Result<bool, ExtractError>
where
    D: AttributeProvider + ?Sized,
{
    if plane.has_overlay_data {
        return Ok(false);
    }
    ensure!(
        pixels.samples_per_pixel <= 1,
        MultiSamplePixelsSnafu {
            samples: pixels.samples_per_pixel,
        }
    );
    ensure!(
        pixels.bits_allocated == 8 || pixels.bits_allocated == 16,
        UnsupportedBitsAllocatedSnafu {
            bits_allocated: pixels.bits_allocated,
        }
    );
    ensure!(
        pixels.bits_stored < pixels.bits_allocated,
        NoUnusedBitsSnafu {
            bits_stored: pixels.bits_stored,
            bits_allocated: pixels.bits_allocated,
        }
    );
    let low_bit = (pixels.high_bit + 1).saturating_sub(pixels.bits_stored);
    ensure!(
        plane.bit_position < low_bit || plane.bit_position > pixels.high_bit,
        BitPositionInPixelRangeSnafu {
            bit_position: plane.bit_position,
            high_bit: pixels.high_bit,
            bits_stored: pixels.bits_stored,
        }
    );

    let pixel_count = pixels.pixel_count();
    let mut packed = vec![0u8; (pixel_count + 7) / 8];
    if packed.len() % 2 != 0 {
        packed.push(0);
    }

    let endianness = pixels.endianness;
    match pixels.bits_allocated {
        8 => {
            let mask = 1u8 << plane.bit_position;
            for (i, byte) in pixels.data.iter_mut().enumerate().take(pixel_count) {
                if *byte & mask != 0 {
                    packed[i / 8] |= 1 << (i % 8);
                    *byte &= !mask;
                }
            }
        }
        _ => {
            let mask = 1u16 << plane.bit_position;
            for (i, word) in pixels
                .data
                .chunks_exact_mut(2)
                .enumerate()
                .take(pixel_count)
            {
                let value = match endianness {
                    Endianness::Little => u16::from_le_bytes([word[0], word[1]]),
                    Endianness::Big => u16::from_be_bytes([word[0], word[1]]),
                };
                if value & mask != 0 {
                    packed[i / 8] |= 1 << (i % 8);
                    let cleared = value & !mask;
                    word.copy_from_slice(&match endianness {
                        Endianness::Little => cleared.to_le_bytes(),
                        Endianness::Big => cleared.to_be_bytes(),
                    });
                }
            }
        }
    }

    let vr = if plane.word_aligned {
        BinaryVr::Ow
    } else {
        BinaryVr::Ob
    };
    if vr == BinaryVr::Ow && endianness == Endianness::Big {
        let mut buffer = BinaryBuffer::from_vec(packed);
        buffer.swap2();
        packed = buffer.to_bytes();
    }

    let offset = tags::tag_offset(plane.index);
    dataset.set_binary_value(tags::OVERLAY_DATA + offset, packed, vr);
    dataset.set_int_value(tags::OVERLAY_BITS_ALLOCATED + offset, 1);
    dataset.set_int_value(tags::OVERLAY_BIT_POSITION + offset, 0);
    if !dataset.has(tags::OVERLAY_ROWS + offset) {
        dataset.set_int_value(tags::OVERLAY_ROWS + offset, plane.rows as i32);
    }
    if !dataset.has(tags::OVERLAY_COLUMNS + offset) {
        dataset.set_int_value(tags::OVERLAY_COLUMNS + offset, plane.columns as i32);
    }

    debug!(
        index = plane.index,
        bit_position = plane.bit_position,
        bits = pixel_count,
        "extracted embedded overlay plane"
    );
    Ok(true)
}

/// Extract every embedded overlay plane in the dataset.
///
/// Returns the indexes of the planes which were extracted.
pub fn extract_all_embedded_overlays<D>(
    dataset: &mut D,
    pixels: &mut PixelDataView<'_>,
) -> Result<Vec<u8>, ExtractError>
where
    D: AttributeProvider + ?Sized,
{
    let planes = crate::module::read_overlay_planes(dataset);
    let mut extracted = Vec::new();
    for plane in &planes {
        if extract_embedded_overlay(plane, dataset, pixels)? {
            extracted.push(plane.index);
        }
    }
    Ok(extracted)
}
