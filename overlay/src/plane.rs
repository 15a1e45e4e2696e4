//! Overlay plane descriptor and frame addressing.

use snafu::{ensure, Backtrace, OptionExt, Snafu};

use crate::dataset::{AttributeProvider, BinaryVr};
use crate::tags;

/// An error reading an overlay plane descriptor from a dataset.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadPlaneError {
    #[snafu(display("overlay plane index {} out of range 0..16", index))]
    IndexOutOfRange { index: u8, backtrace: Backtrace },
    #[snafu(display(
        "missing required attribute ({:04X},{:04X})",
        tag >> 16,
        tag & 0xFFFF
    ))]
    MissingAttribute { tag: u32, backtrace: Backtrace },
    #[snafu(display("invalid overlay type `{}`", value))]
    InvalidOverlayType { value: String, backtrace: Backtrace },
}

/// The kind of content an overlay plane carries.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OverlayType {
    /// Graphic annotations.
    Graphics,
    /// A region of interest.
    Roi,
}

impl OverlayType {
    fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "G" => Some(OverlayType::Graphics),
            "R" => Some(OverlayType::Roi),
            _ => None,
        }
    }

    /// The code string of this overlay type, as stored in the
    /// Overlay Type element.
    pub fn code(self) -> &'static str {
        match self {
            OverlayType::Graphics => "G",
            OverlayType::Roi => "R",
        }
    }
}

/// A read-out of one overlay plane's descriptive attributes.
///
/// The descriptor is a plain value detached from the dataset it was
/// read from; the frame addressing queries on it are pure functions
/// and safe to use from multiple threads.
#[derive(Debug, Clone)]
pub struct OverlayPlane {
    /// Plane index, 0 to 15.
    pub index: u8,
    /// Rows in the overlay plane.
    pub rows: u32,
    /// Columns in the overlay plane.
    pub columns: u32,
    /// The kind of content the plane carries.
    pub overlay_type: OverlayType,
    /// Location of the top left overlay pixel relative to the image,
    /// as 1-based (row, column). `(1, 1)` means perfect alignment.
    pub origin: (i32, i32),
    /// Overlay Bits Allocated. 1 for standalone overlay data;
    /// the pixel cell size for overlays embedded in pixel data.
    pub bits_allocated: u16,
    /// The bit position of the overlay within each pixel cell.
    /// 0 for standalone overlay data.
    pub bit_position: u16,
    /// Whether the plane carries a standalone Overlay Data element.
    /// When false, the overlay bits are embedded in the pixel data.
    pub has_overlay_data: bool,
    /// Whether the overlay data element is word aligned (OW rather
    /// than OB). Defaults to true when no overlay data is present.
    pub word_aligned: bool,
    /// Number of Frames in Overlay, when present.
    pub frames: Option<u32>,
    /// The 1-based image frame which the first overlay frame applies
    /// to, when present.
    pub image_frame_origin: Option<u32>,
}

impl OverlayPlane {
    /// Read the overlay plane with the given index from a dataset.
    ///
    /// Overlay rows and columns fall back to the image Rows and
    /// Columns when the overlay group does not carry its own, which
    /// is common for overlays embedded in pixel data.
    pub fn from_dataset<D>(dataset: &D, index: u8) -> Result<Self, ReadPlaneError>
    where
        D: AttributeProvider + ?Sized,
    {
        ensure!(
            usize::from(index) < tags::OVERLAY_GROUP_COUNT,
            IndexOutOfRangeSnafu { index }
        );
        let offset = tags::tag_offset(index);

        let rows = dataset
            .int_value(tags::OVERLAY_ROWS + offset)
            .or_else(|| dataset.int_value(tags::ROWS))
            .context(MissingAttributeSnafu {
                tag: tags::OVERLAY_ROWS + offset,
            })? as u32;
        let columns = dataset
            .int_value(tags::OVERLAY_COLUMNS + offset)
            .or_else(|| dataset.int_value(tags::COLUMNS))
            .context(MissingAttributeSnafu {
                tag: tags::OVERLAY_COLUMNS + offset,
            })? as u32;

        let type_code = dataset
            .string_value(tags::OVERLAY_TYPE + offset)
            .context(MissingAttributeSnafu {
                tag: tags::OVERLAY_TYPE + offset,
            })?;
        let overlay_type = OverlayType::from_code(&type_code)
            .context(InvalidOverlayTypeSnafu { value: type_code })?;

        let origin = match dataset.int_values(tags::OVERLAY_ORIGIN + offset) {
            Some(values) => (
                values.first().copied().unwrap_or(1),
                values.get(1).copied().unwrap_or(1),
            ),
            None => (1, 1),
        };

        let bits_allocated = dataset
            .int_value(tags::OVERLAY_BITS_ALLOCATED + offset)
            .context(MissingAttributeSnafu {
                tag: tags::OVERLAY_BITS_ALLOCATED + offset,
            })? as u16;
        let bit_position = dataset
            .int_value(tags::OVERLAY_BIT_POSITION + offset)
            .context(MissingAttributeSnafu {
                tag: tags::OVERLAY_BIT_POSITION + offset,
            })? as u16;

        let has_overlay_data = dataset.binary_value(tags::OVERLAY_DATA + offset).is_some();
        let word_aligned = dataset
            .binary_vr(tags::OVERLAY_DATA + offset)
            .map_or(true, |vr| vr == BinaryVr::Ow);

        Ok(OverlayPlane {
            index,
            rows,
            columns,
            overlay_type,
            origin,
            bits_allocated,
            bit_position,
            has_overlay_data,
            word_aligned,
            frames: dataset
                .int_value(tags::NUMBER_OF_FRAMES_IN_OVERLAY + offset)
                .map(|v| v as u32),
            image_frame_origin: dataset
                .int_value(tags::IMAGE_FRAME_ORIGIN + offset)
                .map(|v| v as u32),
        })
    }

    /// The group number of the overlay plane.
    pub fn group(&self) -> u16 {
        tags::group_number(self.index)
    }

    /// Whether the overlay bits are embedded in the pixel data instead
    /// of a standalone Overlay Data element.
    pub fn is_embedded(&self) -> bool {
        !self.has_overlay_data
    }

    /// Whether the plane carries more than one standalone overlay frame.
    pub fn is_multi_frame(&self) -> bool {
        self.has_overlay_data && self.frames.map_or(false, |n| n > 1)
    }

    /// The number of bits in one overlay frame.
    pub fn overlay_frame_length(&self) -> u32 {
        self.rows * self.columns
    }

    /// The 1-based overlay frame which applies to the given 1-based
    /// image frame, or `None` when the overlay has nothing to show on
    /// that frame.
    ///
    /// Embedded overlays map each image frame to itself. A standalone
    /// single-frame overlay applies to every image frame at or after
    /// its image frame origin. A standalone multi-frame overlay covers
    /// the contiguous range of image frames starting at its origin,
    /// one overlay frame per image frame.
    pub fn relevant_overlay_frame(
        &self,
        image_frame: u32,
        total_image_frames: u32,
    ) -> Option<u32> {
        if image_frame < 1 || image_frame > total_image_frames {
            return None;
        }
        if self.is_embedded() {
            return Some(image_frame);
        }
        let origin = self.image_frame_origin.unwrap_or(1);
        match self.frames {
            Some(n) if n > 1 => {
                if image_frame >= origin && image_frame < origin + n {
                    Some(image_frame - origin + 1)
                } else {
                    None
                }
            }
            _ => {
                if image_frame >= origin {
                    Some(1)
                } else {
                    None
                }
            }
        }
    }

    /// The bit offset of the given 1-based overlay frame within the
    /// Overlay Data element.
    ///
    /// Fails for embedded overlays, which have no Overlay Data element
    /// to index into, and for frames outside the overlay's own range.
    pub fn overlay_data_bit_offset(&self, overlay_frame: u32) -> Option<u32> {
        if self.is_embedded() {
            return None;
        }
        if overlay_frame < 1 || overlay_frame > self.frames.unwrap_or(1) {
            return None;
        }
        Some((overlay_frame - 1) * self.overlay_frame_length())
    }

    /// Whether the overlay's frame range fits within the image,
    /// with frame count and origin both defaulting to 1.
    pub fn is_valid_multi_frame_overlay(&self, total_image_frames: u32) -> bool {
        // rearranged to avoid underflow for zero-valued attributes
        self.frames.unwrap_or(1) + self.image_frame_origin.unwrap_or(1)
            <= total_image_frames + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemDataSet;
    use crate::tags;

    fn standalone_plane() -> OverlayPlane {
        OverlayPlane {
            index: 0,
            rows: 97,
            columns: 101,
            overlay_type: OverlayType::Graphics,
            origin: (1, 1),
            bits_allocated: 1,
            bit_position: 0,
            has_overlay_data: true,
            word_aligned: true,
            frames: None,
            image_frame_origin: None,
        }
    }

    #[test]
    fn reads_descriptor_from_dataset() {
        let mut dataset = MemDataSet::new();
        let offset = tags::tag_offset(2);
        dataset.set_int_value(tags::OVERLAY_ROWS + offset, 97);
        dataset.set_int_value(tags::OVERLAY_COLUMNS + offset, 101);
        dataset.set_string_value(tags::OVERLAY_TYPE + offset, "R");
        dataset.set_int_values(tags::OVERLAY_ORIGIN + offset, &[3, -2]);
        dataset.set_int_value(tags::OVERLAY_BITS_ALLOCATED + offset, 1);
        dataset.set_int_value(tags::OVERLAY_BIT_POSITION + offset, 0);
        dataset.set_binary_value(
            tags::OVERLAY_DATA + offset,
            vec![0; 2],
            crate::dataset::BinaryVr::Ob,
        );

        let plane = OverlayPlane::from_dataset(&dataset, 2).unwrap();
        assert_eq!(plane.index, 2);
        assert_eq!(plane.group(), 0x6004);
        assert_eq!(plane.rows, 97);
        assert_eq!(plane.columns, 101);
        assert_eq!(plane.overlay_type, OverlayType::Roi);
        assert_eq!(plane.origin, (3, -2));
        assert!(plane.has_overlay_data);
        assert!(!plane.word_aligned);
        assert_eq!(plane.frames, None);
    }

    #[test]
    fn reads_numeric_attributes_stored_as_strings() {
        let mut dataset = MemDataSet::new();
        dataset.set_string_value(tags::OVERLAY_ROWS, "97");
        dataset.set_string_value(tags::OVERLAY_COLUMNS, "101");
        dataset.set_string_value(tags::OVERLAY_TYPE, "G");
        dataset.set_string_value(tags::OVERLAY_ORIGIN, r"3\-2");
        dataset.set_string_value(tags::OVERLAY_BITS_ALLOCATED, "16");
        dataset.set_string_value(tags::OVERLAY_BIT_POSITION, "12");
        // multi-valued strings read out their first component
        dataset.set_string_value(tags::NUMBER_OF_FRAMES_IN_OVERLAY, r"5\0");

        let plane = OverlayPlane::from_dataset(&dataset, 0).unwrap();
        assert_eq!((plane.rows, plane.columns), (97, 101));
        assert_eq!(plane.origin, (3, -2));
        assert_eq!(plane.bit_position, 12);
        assert_eq!(plane.frames, Some(5));
    }

    #[test]
    fn rows_fall_back_to_image_rows() {
        let mut dataset = MemDataSet::new();
        dataset.set_int_value(tags::ROWS, 97);
        dataset.set_int_value(tags::COLUMNS, 101);
        dataset.set_string_value(tags::OVERLAY_TYPE, "G");
        dataset.set_int_value(tags::OVERLAY_BITS_ALLOCATED, 16);
        dataset.set_int_value(tags::OVERLAY_BIT_POSITION, 12);

        let plane = OverlayPlane::from_dataset(&dataset, 0).unwrap();
        assert_eq!((plane.rows, plane.columns), (97, 101));
        assert!(plane.is_embedded());
        assert!(plane.word_aligned);
    }

    #[test]
    fn missing_type_is_an_error() {
        let mut dataset = MemDataSet::new();
        dataset.set_int_value(tags::OVERLAY_ROWS, 97);
        dataset.set_int_value(tags::OVERLAY_COLUMNS, 101);
        let err = OverlayPlane::from_dataset(&dataset, 0).unwrap_err();
        assert!(matches!(err, ReadPlaneError::MissingAttribute { .. }));
    }

    #[test]
    fn invalid_type_is_an_error() {
        let mut dataset = MemDataSet::new();
        dataset.set_int_value(tags::OVERLAY_ROWS, 97);
        dataset.set_int_value(tags::OVERLAY_COLUMNS, 101);
        dataset.set_string_value(tags::OVERLAY_TYPE, "X");
        let err = OverlayPlane::from_dataset(&dataset, 0).unwrap_err();
        assert!(matches!(err, ReadPlaneError::InvalidOverlayType { .. }));
    }

    #[test]
    fn index_out_of_range_is_an_error() {
        let dataset = MemDataSet::new();
        let err = OverlayPlane::from_dataset(&dataset, 16).unwrap_err();
        assert!(matches!(err, ReadPlaneError::IndexOutOfRange { .. }));
    }

    #[test]
    fn embedded_overlay_maps_frames_to_themselves() {
        let mut plane = standalone_plane();
        plane.has_overlay_data = false;
        plane.bits_allocated = 16;
        plane.bit_position = 12;

        assert_eq!(plane.relevant_overlay_frame(0, 5), None);
        assert_eq!(plane.relevant_overlay_frame(1, 5), Some(1));
        assert_eq!(plane.relevant_overlay_frame(5, 5), Some(5));
        assert_eq!(plane.relevant_overlay_frame(6, 5), None);
        assert!(!plane.is_multi_frame());
        assert_eq!(plane.overlay_data_bit_offset(1), None);
    }

    #[test]
    fn single_frame_overlay_applies_to_all_frames() {
        let plane = standalone_plane();
        for frame in 1..=4 {
            assert_eq!(plane.relevant_overlay_frame(frame, 4), Some(1));
        }
        assert_eq!(plane.relevant_overlay_frame(5, 4), None);
        assert!(!plane.is_multi_frame());
    }

    #[test]
    fn single_frame_overlay_with_origin_skips_earlier_frames() {
        let mut plane = standalone_plane();
        plane.frames = Some(1);
        plane.image_frame_origin = Some(3);

        assert_eq!(plane.relevant_overlay_frame(1, 4), None);
        assert_eq!(plane.relevant_overlay_frame(2, 4), None);
        assert_eq!(plane.relevant_overlay_frame(3, 4), Some(1));
        assert_eq!(plane.relevant_overlay_frame(4, 4), Some(1));
    }

    #[test]
    fn multi_frame_overlay_covers_its_range() {
        let mut plane = standalone_plane();
        plane.frames = Some(5);
        plane.image_frame_origin = Some(2);

        assert!(plane.is_multi_frame());
        assert!(plane.is_valid_multi_frame_overlay(7));
        assert!(!plane.is_valid_multi_frame_overlay(5));

        assert_eq!(plane.relevant_overlay_frame(1, 7), None);
        assert_eq!(plane.relevant_overlay_frame(2, 7), Some(1));
        assert_eq!(plane.relevant_overlay_frame(4, 7), Some(3));
        assert_eq!(plane.relevant_overlay_frame(6, 7), Some(5));
        assert_eq!(plane.relevant_overlay_frame(7, 7), None);
    }

    #[test]
    fn multi_frame_overlay_without_origin_starts_at_one() {
        let mut plane = standalone_plane();
        plane.frames = Some(3);

        assert_eq!(plane.relevant_overlay_frame(1, 5), Some(1));
        assert_eq!(plane.relevant_overlay_frame(3, 5), Some(3));
        assert_eq!(plane.relevant_overlay_frame(4, 5), None);
    }

    #[test]
    fn bit_offsets_use_the_overlay_frame_numbering() {
        let mut plane = standalone_plane();
        plane.frames = Some(5);
        plane.image_frame_origin = Some(2);

        assert_eq!(plane.overlay_frame_length(), 97 * 101);
        assert_eq!(plane.overlay_data_bit_offset(0), None);
        assert_eq!(plane.overlay_data_bit_offset(1), Some(0));
        assert_eq!(plane.overlay_data_bit_offset(3), Some(2 * 97 * 101));
        assert_eq!(plane.overlay_data_bit_offset(5), Some(4 * 97 * 101));
        assert_eq!(plane.overlay_data_bit_offset(6), None);
    }

    #[test]
    fn single_frame_bit_offset_defaults_to_one_frame() {
        let plane = standalone_plane();
        assert_eq!(plane.overlay_data_bit_offset(1), Some(0));
        assert_eq!(plane.overlay_data_bit_offset(2), None);
    }
}
