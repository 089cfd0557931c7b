//! Exporting image pixel storage to host buffers.
//!
//! Two modes:
//! - **Copy** ([`export_buffer`]): a freshly allocated buffer, independent
//!   of the image.
//! - **View** ([`export_view`], [`export_view_mut`]): a borrow of the
//!   image's own storage. No bytes move; the view cannot outlive the image.
//!   [`export_shared_view`] instead takes a reference to the storage, and
//!   the view keeps it alive after the image is dropped.
//!
//! ```rust
//! use pixbridge_core::{ImageHandle, PixelId, export_buffer, export_view};
//!
//! let img = ImageHandle::new(&[3, 4], PixelId::VectorUInt8, 2).unwrap();
//! let copy = export_buffer(&img).unwrap();
//! assert_eq!(copy.host_shape, vec![4, 3, 2]);
//!
//! let view = export_view(&img).unwrap();
//! assert_eq!(view.as_ptr(), img.as_ptr());
//! ```

use crate::buffer::{ByteView, ByteViewMut, ExportedBuffer, SharedView};
use crate::image::ImageHandle;
use crate::layout::BufferLayout;
use crate::pixel::ElementKind;
use crate::{Error, Result};
use tracing::{debug, trace};

/// How an export hands out the pixel bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportMode {
    /// Copy into a new buffer.
    #[default]
    Copy,
    /// Borrow the image's storage.
    View,
}

/// Result of [`export`].
#[derive(Debug)]
pub enum Exported<'a> {
    /// Independent copy.
    Copy(ExportedBuffer),
    /// Borrow of the image storage.
    View(ByteView<'a>),
}

impl Exported<'_> {
    /// The exported bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Copy(buffer) => &buffer.bytes,
            Self::View(view) => view.as_bytes(),
        }
    }

    /// Element type of the bytes.
    pub fn element(&self) -> ElementKind {
        match self {
            Self::Copy(buffer) => buffer.element,
            Self::View(view) => view.element(),
        }
    }

    /// Returns `true` if the bytes alias the image.
    #[inline]
    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }
}

/// Validates an image for export and returns its layout.
fn export_layout(image: &ImageHandle) -> Result<BufferLayout> {
    let layout = BufferLayout::resolve(image.shape(), image.pixel_id(), image.components())?;
    layout.check_len(image.byte_len())?;
    Ok(layout)
}

/// Exports an image in the given mode.
pub fn export(image: &ImageHandle, mode: ExportMode) -> Result<Exported<'_>> {
    match mode {
        ExportMode::Copy => export_buffer(image).map(Exported::Copy),
        ExportMode::View => export_view(image).map(Exported::View),
    }
}

/// Copies an image's pixel storage into a new buffer.
///
/// # Errors
///
/// - [`Error::UnsupportedPixelType`] for complex and unknown images
/// - [`Error::UnsupportedDimension`] unless the image has 2 or 3 axes
/// - [`Error::AllocationFailed`] if the buffer cannot be allocated
pub fn export_buffer(image: &ImageHandle) -> Result<ExportedBuffer> {
    trace!(pixel_id = %image.pixel_id(), dimension = image.dimension(), "export::copy");
    let layout = export_layout(image)?;

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(layout.byte_len)
        .map_err(|e| Error::allocation_failed(layout.byte_len, e.to_string()))?;
    bytes.extend_from_slice(image.bytes());
    debug!(bytes = layout.byte_len, "Exported pixel copy");

    Ok(ExportedBuffer {
        bytes,
        pixel_id: layout.pixel_id,
        element: layout.element,
        host_shape: layout.host_shape(),
    })
}

/// Borrows an image's pixel storage without copying.
///
/// Fails like [`export_buffer`], except that nothing is allocated.
pub fn export_view(image: &ImageHandle) -> Result<ByteView<'_>> {
    trace!(pixel_id = %image.pixel_id(), dimension = image.dimension(), "export::view");
    let layout = export_layout(image)?;
    Ok(ByteView::new(image.bytes(), layout.element))
}

/// Borrows an image's pixel storage for writing.
///
/// Writes through the view are writes to the image.
///
/// # Errors
///
/// Fails like [`export_view`], and with [`Error::ReadOnlyStorage`] if the
/// image aliases read-only memory.
pub fn export_view_mut(image: &mut ImageHandle) -> Result<ByteViewMut<'_>> {
    trace!(pixel_id = %image.pixel_id(), dimension = image.dimension(), "export::view_mut");
    let layout = export_layout(image)?;
    Ok(ByteViewMut::new(image.bytes_mut()?, layout.element))
}

/// Shares an image's pixel storage with a view that owns a reference.
///
/// The reference count grows by one until the view is dropped. While the
/// view exists the image cannot be written; see [`SharedView`].
///
/// Fails like [`export_view`].
pub fn export_shared_view(image: &ImageHandle) -> Result<SharedView> {
    trace!(pixel_id = %image.pixel_id(), dimension = image.dimension(), "export::shared_view");
    let layout = export_layout(image)?;
    let view = SharedView::new(image.share_storage(), &layout);
    debug!(references = image.reference_count(), "Shared pixel storage");
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelId;

    fn ramp(shape: &[usize], pixel_id: PixelId, components: usize) -> ImageHandle {
        let mut img = ImageHandle::new(shape, pixel_id, components).unwrap();
        for (i, b) in img.bytes_mut().unwrap().iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        img
    }

    #[test]
    fn test_copy_is_independent() {
        let mut img = ramp(&[5, 3], PixelId::UInt16, 1);
        let copy = export_buffer(&img).unwrap();
        assert_eq!(copy.len(), 30);
        assert_eq!(copy.bytes, img.bytes());
        assert_eq!(copy.host_shape, vec![3, 5]);
        assert_eq!(copy.element, ElementKind::U16);

        img.bytes_mut().unwrap()[0] = 200;
        assert_eq!(copy.bytes[0], 0);
    }

    #[test]
    fn test_view_aliases() {
        let img = ramp(&[4, 2, 2], PixelId::Float32, 1);
        let view = export_view(&img).unwrap();
        assert_eq!(view.as_ptr(), img.as_ptr());
        assert_eq!(view.len(), img.byte_len());
        assert_eq!(view.element(), ElementKind::F32);
    }

    #[test]
    fn test_view_mut_writes_image() {
        let mut img = ImageHandle::new(&[2, 2], PixelId::UInt8, 1).unwrap();
        {
            let mut view = export_view_mut(&mut img).unwrap();
            view[3] = 9;
        }
        assert_eq!(img.bytes()[3], 9);
    }

    #[test]
    fn test_shared_view_survives_image() {
        let img = ramp(&[3, 2], PixelId::Int16, 1);
        let expected = img.bytes().to_vec();
        let mut view = export_shared_view(&img).unwrap();
        assert_eq!(img.reference_count(), 2);
        assert_eq!(view.as_ptr(), img.as_ptr());
        assert_eq!(view.element(), ElementKind::I16);
        assert_eq!(view.host_shape(), &[2, 3]);
        drop(img);

        assert_eq!(view.as_bytes(), &expected[..]);
        view.bytes_mut().unwrap()[0] = 42;
        assert_eq!(view[0], 42);
    }

    #[test]
    fn test_mode_dispatch() {
        let img = ramp(&[3, 3], PixelId::Int8, 1);
        let copied = export(&img, ExportMode::Copy).unwrap();
        let viewed = export(&img, ExportMode::View).unwrap();
        assert!(!copied.is_view());
        assert!(viewed.is_view());
        assert_eq!(copied.as_bytes(), viewed.as_bytes());
        assert_eq!(copied.element(), ElementKind::I8);
    }

    #[test]
    fn test_rejects_complex() {
        let img = ImageHandle::new(&[2, 2], PixelId::ComplexFloat32, 1).unwrap();
        assert!(export_buffer(&img).unwrap_err().is_unsupported_pixel_type());
        assert!(export_view(&img).unwrap_err().is_unsupported_pixel_type());
        assert!(export_shared_view(&img).unwrap_err().is_unsupported_pixel_type());
    }

    #[test]
    fn test_rejects_dimension() {
        let img = ImageHandle::new(&[2, 2, 2, 2], PixelId::UInt8, 1).unwrap();
        assert!(matches!(
            export_buffer(&img),
            Err(Error::UnsupportedDimension { dimension: 4 })
        ));
        let img = ImageHandle::new(&[8], PixelId::UInt8, 1).unwrap();
        assert!(matches!(
            export(&img, ExportMode::View),
            Err(Error::UnsupportedDimension { dimension: 1 })
        ));
    }
}
