//! DICOM overlay plane addressing and extraction.
//!
//! This crate reads the 16 repeating overlay groups of a dataset into
//! plain [`OverlayPlane`] descriptors and answers the addressing
//! questions a renderer asks about them: which overlay frame applies
//! to a given image frame, and where that frame's bits start within
//! the Overlay Data element. It also carries tooling to move overlays
//! embedded in unused pixel data bits into standalone Overlay Data
//! elements (see [`extract`]).
//!
//! Dataset access goes through the [`AttributeProvider`] trait, so
//! any object model with tag-indexed element access can back these
//! routines; an in-memory [`MemDataSet`] is provided.
//!
//! # Example
//!
//! ```
//! use dicombin_overlay::{OverlayPlane, OverlayType};
//!
//! let plane = OverlayPlane {
//!     index: 0,
//!     rows: 64,
//!     columns: 64,
//!     overlay_type: OverlayType::Graphics,
//!     origin: (1, 1),
//!     bits_allocated: 1,
//!     bit_position: 0,
//!     has_overlay_data: true,
//!     word_aligned: true,
//!     frames: Some(3),
//!     image_frame_origin: Some(2),
//! };
//!
//! // image frames 2 through 4 carry overlay frames 1 through 3
//! assert_eq!(plane.relevant_overlay_frame(1, 5), None);
//! assert_eq!(plane.relevant_overlay_frame(3, 5), Some(2));
//! assert_eq!(plane.overlay_data_bit_offset(2), Some(64 * 64));
//! ```

pub mod dataset;
pub mod extract;
pub mod module;
pub mod plane;
pub mod tags;

pub use dataset::{AttributeProvider, BinaryVr, MemDataSet};
pub use extract::{
    extract_all_embedded_overlays, extract_embedded_overlay, ExtractError, PixelDataView,
};
pub use module::{delete_overlay_plane, has_overlay_plane, read_overlay_planes};
pub use plane::{OverlayPlane, OverlayType, ReadPlaneError};
