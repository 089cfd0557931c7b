//! # pixbridge-core
//!
//! Marshals the pixel storage of typed multi-dimensional images to and from
//! flat host byte buffers.
//!
//! - [`PixelId`] - Pixel type tags and the registry that maps them to element types
//! - [`layout`] - Buffer size validation and host axis order
//! - [`BufferDescriptor`] - Caller-owned memory handed to an import
//! - [`ImageHandle`] - Image with shape, pixel type, geometry and storage
//! - [`export_buffer`], [`export_view`], [`export_shared_view`] - Copy, borrow or share pixel bytes out
//! - [`import_buffer_in_place`], [`import_buffer_as_new_image`],
//!   [`import_buffer_as_image_view`] - Copy or alias pixel bytes in
//! - [`adjust_reference_count`], [`take_retained_view`] - Keep image storage alive for a host view
//!
//! ## Round trip
//!
//! ```rust
//! use pixbridge_core::prelude::*;
//!
//! let bytes: Vec<u8> = (0..30).collect();
//! let spec = ImportSpec::new(&[5, 3], PixelId::UInt16);
//!
//! let img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes), &spec).unwrap();
//! let out = export_buffer(&img).unwrap();
//! assert_eq!(out.bytes, bytes);
//!
//! // 28 bytes cannot describe a 5x3 uint16 image.
//! let err = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes[..28]), &spec).unwrap_err();
//! assert!(err.is_size_mismatch());
//! ```
//!
//! ## Supported images
//!
//! Marshaling accepts 2D and 3D images of the ten real element types, scalar
//! or vector. Complex pixel types exist in the image model but are rejected
//! by every marshaling operation.
//!
//! ## Logging
//!
//! Operations emit `tracing` events (`trace` on entry, `debug` on
//! allocation, aliasing and reference changes). No subscriber is installed
//! here.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod export;
pub mod image;
pub mod import;
pub mod layout;
pub mod pixel;
pub mod refcount;
pub mod storage;

// Re-exports for convenience
pub use buffer::{BufferDescriptor, ByteView, ByteViewMut, ExportedBuffer, SharedView, StridedLayout};
pub use error::*;
pub use export::{ExportMode, Exported, export, export_buffer, export_shared_view, export_view, export_view_mut};
pub use image::{Geometry, ImageHandle};
pub use import::{
    ImportMode, ImportSpec, import_buffer, import_buffer_as_image_view, import_buffer_as_new_image,
    import_buffer_in_place,
};
pub use layout::BufferLayout;
pub use pixel::{Element, ElementKind, PIXEL_TYPES, PixelId, PixelTypeInfo};
pub use refcount::{adjust_reference_count, reference_count, take_retained_view};
pub use storage::{Ownership, STORAGE_ALIGN};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use pixbridge_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::{BufferDescriptor, ByteView, ByteViewMut, ExportedBuffer, SharedView};
    pub use crate::error::{Error, Result};
    pub use crate::export::{
        ExportMode, Exported, export, export_buffer, export_shared_view, export_view, export_view_mut,
    };
    pub use crate::image::{Geometry, ImageHandle};
    pub use crate::import::{
        ImportMode, ImportSpec, import_buffer, import_buffer_as_image_view, import_buffer_as_new_image,
        import_buffer_in_place,
    };
    pub use crate::pixel::{Element, ElementKind, PixelId};
    pub use crate::refcount::{adjust_reference_count, reference_count, take_retained_view};
    pub use crate::storage::Ownership;
}
