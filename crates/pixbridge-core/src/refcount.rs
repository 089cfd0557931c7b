//! Reference count adjustment for image storage.
//!
//! A host that keeps a zero-copy view of an image may need that storage to
//! stay alive after the image handle goes away. Increasing the count
//! retains one reference on the handle; [`take_retained_view`] turns it into
//! a [`SharedView`] that owns the reference and outlives the handle.
//! Decreasing the count gives back one retained reference that was not
//! claimed. The handle's own reference is never given back through this
//! path, so the count has a floor of 1.
//!
//! ```rust
//! use pixbridge_core::{ImageHandle, Ownership, PixelId, adjust_reference_count, reference_count};
//!
//! let mut img = ImageHandle::new(&[4, 4], PixelId::UInt8, 1).unwrap();
//! assert_eq!(adjust_reference_count(&mut img, true).unwrap(), 2);
//! assert_eq!(img.ownership(), Ownership::Shared { references: 2 });
//!
//! assert_eq!(adjust_reference_count(&mut img, false).unwrap(), 1);
//! assert_eq!(adjust_reference_count(&mut img, false).unwrap(), 1);
//! assert_eq!(reference_count(&img), 1);
//! ```
//!
//! Keeping pixels past the handle:
//!
//! ```rust
//! use pixbridge_core::{ImageHandle, PixelId, adjust_reference_count, take_retained_view};
//!
//! let mut img = ImageHandle::new(&[4, 4], PixelId::UInt8, 1).unwrap();
//! img.bytes_mut().unwrap()[0] = 3;
//! adjust_reference_count(&mut img, true).unwrap();
//! let mut view = take_retained_view(&mut img).unwrap().unwrap();
//! drop(img);
//!
//! assert_eq!(view[0], 3);
//! view.bytes_mut().unwrap()[0] = 4;
//! ```
//!
//! Retained references left unclaimed when the handle is dropped are
//! released with it.

use crate::Result;
use crate::buffer::SharedView;
use crate::image::ImageHandle;
use crate::layout::{BufferLayout, validate_dimension};
use tracing::{debug, trace};

/// Retains (`increase = true`) or releases one reference to an image's
/// storage. Returns the new count.
///
/// Releasing gives back a reference retained earlier and not yet claimed by
/// [`take_retained_view`]. When none is left it is a no-op; references held
/// by shared views are released by dropping the views.
///
/// # Errors
///
/// - [`Error::UnsupportedPixelType`](crate::Error::UnsupportedPixelType) for complex and unknown images
/// - [`Error::UnsupportedDimension`](crate::Error::UnsupportedDimension) unless the image has 2 or 3 axes
pub fn adjust_reference_count(image: &mut ImageHandle, increase: bool) -> Result<usize> {
    trace!(pixel_id = %image.pixel_id(), increase, "refcount::adjust");
    image.pixel_id().resolve()?;
    validate_dimension(image.dimension())?;

    if increase {
        let references = image.retain();
        debug!(references, "Retained image storage");
        Ok(references)
    } else {
        let released = image.release();
        let references = image.reference_count();
        debug!(references, released, "Released image storage");
        Ok(references)
    }
}

/// Claims one retained reference as a [`SharedView`].
///
/// The count is unchanged: the reference moves from the handle to the view
/// and is released when the view is dropped. Returns `None` if nothing is
/// retained.
///
/// # Errors
///
/// Fails like [`adjust_reference_count`], and like
/// [`export_view`](crate::export_view) for images whose byte count does not
/// match their layout.
pub fn take_retained_view(image: &mut ImageHandle) -> Result<Option<SharedView>> {
    trace!(pixel_id = %image.pixel_id(), "refcount::take_view");
    let layout = BufferLayout::resolve(image.shape(), image.pixel_id(), image.components())?;
    layout.check_len(image.byte_len())?;
    Ok(image.take_retained().map(|storage| SharedView::new(storage, &layout)))
}

/// Current reference count of an image's storage, including the handle's.
pub fn reference_count(image: &ImageHandle) -> usize {
    image.reference_count()
}
