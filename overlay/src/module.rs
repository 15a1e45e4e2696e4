//! Module-level queries over the 16 repeating overlay groups.

use tracing::warn;

use crate::dataset::AttributeProvider;
use crate::plane::OverlayPlane;
use crate::tags;

/// Whether the dataset carries an overlay plane with the given index.
///
/// The Overlay Bit Position element is the presence probe: it is
/// required for both standalone and embedded planes.
pub fn has_overlay_plane<D>(dataset: &D, index: u8) -> bool
where
    D: AttributeProvider + ?Sized,
{
    usize::from(index) < tags::OVERLAY_GROUP_COUNT
        && dataset.has(tags::OVERLAY_BIT_POSITION + tags::tag_offset(index))
}

/// Read all overlay planes present in the dataset.
///
/// Groups which are present but fail to parse are skipped with a
/// warning rather than failing the whole read-out.
pub fn read_overlay_planes<D>(dataset: &D) -> Vec<OverlayPlane>
where
    D: AttributeProvider + ?Sized,
{
    let mut planes = Vec::new();
    for index in 0..tags::OVERLAY_GROUP_COUNT as u8 {
        if !has_overlay_plane(dataset, index) {
            continue;
        }
        match OverlayPlane::from_dataset(dataset, index) {
            Ok(plane) => planes.push(plane),
            Err(e) => {
                warn!(
                    index,
                    group = tags::group_number(index),
                    "skipping unreadable overlay plane: {}",
                    e
                );
            }
        }
    }
    planes
}

/// Remove all attributes of the overlay plane with the given index.
pub fn delete_overlay_plane<D>(dataset: &mut D, index: u8)
where
    D: AttributeProvider + ?Sized,
{
    if usize::from(index) >= tags::OVERLAY_GROUP_COUNT {
        return;
    }
    let offset = tags::tag_offset(index);
    for tag in tags::OVERLAY_GROUP_TAGS.iter() {
        dataset.remove(tag + offset);
    }
}
