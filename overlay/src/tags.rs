//! Tag arithmetic for the repeating overlay groups.
//!
//! Overlay attributes live in the 16 even groups `0x6000` through
//! `0x601E`; each group describes one overlay plane. Constants here
//! name the elements of the first group, and [`tag_offset`] shifts
//! them to the group of a given plane index.

/// Number of repeating overlay groups.
pub const OVERLAY_GROUP_COUNT: usize = 16;

/// Overlay Rows (6000,0010).
pub const OVERLAY_ROWS: u32 = 0x6000_0010;
/// Overlay Columns (6000,0011).
pub const OVERLAY_COLUMNS: u32 = 0x6000_0011;
/// Number of Frames in Overlay (6000,0015).
pub const NUMBER_OF_FRAMES_IN_OVERLAY: u32 = 0x6000_0015;
/// Overlay Description (6000,0022).
pub const OVERLAY_DESCRIPTION: u32 = 0x6000_0022;
/// Overlay Type (6000,0040).
pub const OVERLAY_TYPE: u32 = 0x6000_0040;
/// Overlay Subtype (6000,0045).
pub const OVERLAY_SUBTYPE: u32 = 0x6000_0045;
/// Overlay Origin (6000,0050).
pub const OVERLAY_ORIGIN: u32 = 0x6000_0050;
/// Image Frame Origin (6000,0051).
pub const IMAGE_FRAME_ORIGIN: u32 = 0x6000_0051;
/// Overlay Bits Allocated (6000,0100).
pub const OVERLAY_BITS_ALLOCATED: u32 = 0x6000_0100;
/// Overlay Bit Position (6000,0102).
pub const OVERLAY_BIT_POSITION: u32 = 0x6000_0102;
/// ROI Area (6000,1301).
pub const ROI_AREA: u32 = 0x6000_1301;
/// ROI Mean (6000,1302).
pub const ROI_MEAN: u32 = 0x6000_1302;
/// ROI Standard Deviation (6000,1303).
pub const ROI_STANDARD_DEVIATION: u32 = 0x6000_1303;
/// Overlay Label (6000,1500).
pub const OVERLAY_LABEL: u32 = 0x6000_1500;
/// Overlay Data (6000,3000).
pub const OVERLAY_DATA: u32 = 0x6000_3000;

/// Samples per Pixel (0028,0002).
pub const SAMPLES_PER_PIXEL: u32 = 0x0028_0002;
/// Number of Frames (0028,0008).
pub const NUMBER_OF_FRAMES: u32 = 0x0028_0008;
/// Rows (0028,0010).
pub const ROWS: u32 = 0x0028_0010;
/// Columns (0028,0011).
pub const COLUMNS: u32 = 0x0028_0011;
/// Bits Allocated (0028,0100).
pub const BITS_ALLOCATED: u32 = 0x0028_0100;
/// Bits Stored (0028,0101).
pub const BITS_STORED: u32 = 0x0028_0101;
/// High Bit (0028,0102).
pub const HIGH_BIT: u32 = 0x0028_0102;
/// Pixel Data (7FE0,0010).
pub const PIXEL_DATA: u32 = 0x7FE0_0010;

/// All overlay group element tags, as offsets from group `0x6000`.
pub(crate) const OVERLAY_GROUP_TAGS: [u32; 15] = [
    OVERLAY_ROWS,
    OVERLAY_COLUMNS,
    NUMBER_OF_FRAMES_IN_OVERLAY,
    OVERLAY_DESCRIPTION,
    OVERLAY_TYPE,
    OVERLAY_SUBTYPE,
    OVERLAY_ORIGIN,
    IMAGE_FRAME_ORIGIN,
    OVERLAY_BITS_ALLOCATED,
    OVERLAY_BIT_POSITION,
    ROI_AREA,
    ROI_MEAN,
    ROI_STANDARD_DEVIATION,
    OVERLAY_LABEL,
    OVERLAY_DATA,
];

/// The tag offset of the overlay group with the given plane index,
/// to be added to the base element tags above.
pub fn tag_offset(index: u8) -> u32 {
    u32::from(index) * 2 * 0x1_0000
}

/// The group number of the overlay plane with the given index.
pub fn group_number(index: u8) -> u16 {
    0x6000 + 2 * u16::from(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_land_in_even_groups() {
        assert_eq!(tag_offset(0), 0);
        assert_eq!(OVERLAY_ROWS + tag_offset(1), 0x6002_0010);
        assert_eq!(OVERLAY_DATA + tag_offset(15), 0x601E_3000);
        assert_eq!(group_number(0), 0x6000);
        assert_eq!(group_number(15), 0x601E);
    }
}
