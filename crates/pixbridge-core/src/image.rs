//! Image handles.
//!
//! An [`ImageHandle`] is a multi-dimensional typed image: a shape, a pixel
//! type, a component count, physical geometry and one block of pixel
//! storage. Pixels are stored with the first axis varying fastest and the
//! components of a pixel adjacent:
//!
//! ```text
//! shape [3, 2], 2 components
//! Memory: [c0 c1 | c0 c1 | c0 c1]  <- y = 0, x = 0..3
//!         [c0 c1 | c0 c1 | c0 c1]  <- y = 1
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pixbridge_core::{ImageHandle, Ownership, PixelId};
//!
//! let mut img = ImageHandle::new(&[5, 3], PixelId::UInt16, 1).unwrap();
//! assert_eq!(img.byte_len(), 30);
//! assert_eq!(img.ownership(), Ownership::Owned);
//!
//! img.pixels_mut::<u16>().unwrap()[0] = 7;
//! assert_eq!(img.pixels::<u16>().unwrap()[0], 7);
//! ```
//!
//! Handles are not `Clone`. Besides the handle, only
//! [`SharedView`](crate::SharedView)s can reach the pixel bytes, and
//! `&mut ImageHandle` hands out writable bytes only while none exist. Use
//! [`ImageHandle::deep_copy`] for an independent image.

use crate::layout::{self, BufferLayout};
use crate::pixel::{Element, PixelId};
use crate::storage::{Ownership, PixelStorage};
use crate::{Error, Result};
use bytemuck::PodCastError;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Physical placement of an image.
///
/// Carried through marshaling unchanged; never validated against pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Physical coordinate of the first pixel, one value per axis.
    pub origin: Vec<f64>,
    /// Physical distance between pixels, one value per axis.
    pub spacing: Vec<f64>,
    /// Axis directions as a row-major `D x D` matrix.
    pub direction: Vec<f64>,
}

impl Geometry {
    /// Zero origin, unit spacing, identity direction.
    pub fn identity(dimension: usize) -> Self {
        let mut direction = vec![0.0; dimension * dimension];
        for i in 0..dimension {
            direction[i * dimension + i] = 1.0;
        }
        Self {
            origin: vec![0.0; dimension],
            spacing: vec![1.0; dimension],
            direction,
        }
    }

    /// Number of axes this geometry describes.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.origin.len()
    }

    fn check(&self, dimension: usize) -> Result<()> {
        if self.origin.len() != dimension
            || self.spacing.len() != dimension
            || self.direction.len() != dimension * dimension
        {
            return Err(Error::invalid_shape(format!(
                "geometry does not describe {dimension} axes"
            )));
        }
        Ok(())
    }
}

/// A typed image with its pixel storage.
pub struct ImageHandle {
    shape: Vec<usize>,
    pixel_id: PixelId,
    components: usize,
    geometry: Geometry,
    storage: Arc<PixelStorage>,
    /// References taken by the reference adjuster and not yet claimed as
    /// shared views. They die with the handle.
    retained: usize,
}

impl ImageHandle {
    /// Creates a zero-filled image.
    ///
    /// Any non-empty shape is accepted here, and complex pixel types are
    /// allowed; marshaling operations apply their own, narrower checks.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidShape`] for an empty shape
    /// - [`Error::UnsupportedPixelType`] for [`PixelId::Unknown`]
    /// - [`Error::InvalidComponents`] for a non-vector type with `components > 1`
    /// - [`Error::SizeOverflow`] / [`Error::AllocationFailed`] for oversized images
    pub fn new(shape: &[usize], pixel_id: PixelId, components: usize) -> Result<Self> {
        trace!(pixel_id = %pixel_id, dimension = shape.len(), components, "image::new");
        if shape.is_empty() {
            return Err(Error::invalid_shape("image shape has no axes"));
        }
        let width = pixel_id
            .storage_bytes()
            .ok_or_else(|| Error::unsupported_pixel_type(pixel_id, "unknown pixel type"))?;
        let is_vector = pixel_id.resolve().map(|info| info.is_vector).unwrap_or(false);
        let components = components.max(1);
        if !is_vector && components > 1 {
            return Err(Error::invalid_components(pixel_id, components));
        }
        let bytes = layout::expected_bytes(shape, components, width)?;
        let storage = PixelStorage::allocate(bytes)?;
        Ok(Self::from_storage(shape.to_vec(), pixel_id, components, storage))
    }

    pub(crate) fn from_layout(layout: BufferLayout, storage: PixelStorage) -> Self {
        Self::from_storage(layout.shape, layout.pixel_id, layout.components, storage)
    }

    fn from_storage(shape: Vec<usize>, pixel_id: PixelId, components: usize, storage: PixelStorage) -> Self {
        Self {
            geometry: Geometry::identity(shape.len()),
            shape,
            pixel_id,
            components,
            storage: Arc::new(storage),
            retained: 0,
        }
    }

    /// Number of axes.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.shape.len()
    }

    /// Extent of each axis, fastest first.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Pixel type tag.
    #[inline]
    pub fn pixel_id(&self) -> PixelId {
        self.pixel_id
    }

    /// Elements per pixel.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Physical geometry.
    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Replaces the geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] if `geometry` describes a different
    /// number of axes than the image has.
    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        geometry.check(self.dimension())?;
        self.geometry = geometry;
        Ok(())
    }

    /// Size of the pixel storage in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.storage.len()
    }

    /// Who owns the pixel memory.
    pub fn ownership(&self) -> Ownership {
        let references = self.reference_count();
        if references > 1 {
            Ownership::Shared { references }
        } else if self.storage.is_external() {
            Ownership::Borrowed
        } else {
            Ownership::Owned
        }
    }

    /// Whether the pixel memory may be written.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.storage.is_writable()
    }

    /// Whether the pixel memory aliases external memory.
    #[inline]
    pub fn is_view(&self) -> bool {
        self.storage.is_external()
    }

    /// Base address of the pixel memory.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    /// Raw pixel bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    /// Raw pixel bytes, writable.
    ///
    /// # Errors
    ///
    /// - [`Error::SharedStorage`] while a [`SharedView`](crate::SharedView) of the image exists
    /// - [`Error::ReadOnlyStorage`] if the image aliases read-only memory
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let references = self.reference_count();
        Arc::get_mut(&mut self.storage)
            .ok_or(Error::SharedStorage { references })?
            .bytes_mut()
    }

    /// Pixel storage as a slice of `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedPixelType`] for complex and unknown images
    /// - [`Error::ElementMismatch`] if the image does not store `T`
    /// - [`Error::Misaligned`] if aliased memory is not aligned for `T`
    pub fn pixels<T: Element>(&self) -> Result<&[T]> {
        self.check_element::<T>()?;
        bytemuck::try_cast_slice(self.bytes()).map_err(cast_error::<T>)
    }

    /// Pixel storage as a mutable slice of `T`.
    ///
    /// Fails like [`pixels`](Self::pixels) and [`bytes_mut`](Self::bytes_mut).
    pub fn pixels_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_element::<T>()?;
        bytemuck::try_cast_slice_mut(self.bytes_mut()?).map_err(cast_error::<T>)
    }

    fn check_element<T: Element>(&self) -> Result<()> {
        let info = self.pixel_id.resolve()?;
        if info.element != T::KIND {
            return Err(Error::ElementMismatch {
                expected: info.element,
                requested: T::KIND,
            });
        }
        Ok(())
    }

    /// Copies this image into freshly allocated, owned storage.
    ///
    /// Shape, pixel type, components and geometry are preserved. The copy
    /// holds no references retained on the original.
    pub fn deep_copy(&self) -> Result<Self> {
        let storage = PixelStorage::copy_from(self.bytes())?;
        Ok(Self {
            shape: self.shape.clone(),
            pixel_id: self.pixel_id,
            components: self.components,
            geometry: self.geometry.clone(),
            storage: Arc::new(storage),
            retained: 0,
        })
    }

    /// The handle's own reference, unclaimed retained references and live
    /// shared views.
    pub(crate) fn reference_count(&self) -> usize {
        Arc::strong_count(&self.storage) + self.retained
    }

    /// Takes one more reference. Returns the new count.
    pub(crate) fn retain(&mut self) -> usize {
        self.retained += 1;
        self.reference_count()
    }

    /// Gives back one unclaimed retained reference, if any. The handle's
    /// own reference is never given back. Returns whether one was released.
    pub(crate) fn release(&mut self) -> bool {
        let released = self.retained > 0;
        self.retained = self.retained.saturating_sub(1);
        released
    }

    /// Turns one retained reference into an owned pointer to the storage.
    pub(crate) fn take_retained(&mut self) -> Option<Arc<PixelStorage>> {
        self.retained = self.retained.checked_sub(1)?;
        Some(Arc::clone(&self.storage))
    }

    /// A new owned pointer to the storage.
    pub(crate) fn share_storage(&self) -> Arc<PixelStorage> {
        Arc::clone(&self.storage)
    }
}

fn cast_error<T>(err: PodCastError) -> Error {
    match err {
        PodCastError::TargetAlignmentGreaterAndInputNotAligned | PodCastError::AlignmentMismatch => {
            Error::Misaligned {
                align: std::mem::align_of::<T>(),
            }
        }
        other => Error::invalid_shape(other.to_string()),
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("shape", &self.shape)
            .field("pixel_id", &self.pixel_id)
            .field("components", &self.components)
            .field("ownership", &self.ownership())
            .field("byte_len", &self.byte_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_zeroed() {
        let img = ImageHandle::new(&[4, 5, 3], PixelId::Float32, 1).unwrap();
        assert_eq!(img.dimension(), 3);
        assert_eq!(img.byte_len(), 4 * 5 * 3 * 4);
        assert_eq!(img.pixel_count(), 60);
        assert!(img.pixels::<f32>().unwrap().iter().all(|&v| v == 0.0));
        assert!(!img.is_view());
    }

    #[test]
    fn test_new_vector() {
        let img = ImageHandle::new(&[3, 4], PixelId::VectorUInt8, 2).unwrap();
        assert_eq!(img.components(), 2);
        assert_eq!(img.byte_len(), 24);
    }

    #[test]
    fn test_new_rejects() {
        assert!(matches!(
            ImageHandle::new(&[], PixelId::UInt8, 1),
            Err(Error::InvalidShape { .. })
        ));
        assert!(ImageHandle::new(&[2, 2], PixelId::Unknown, 1).unwrap_err().is_unsupported_pixel_type());
        assert!(matches!(
            ImageHandle::new(&[2, 2], PixelId::Int16, 3),
            Err(Error::InvalidComponents { components: 3, .. })
        ));
    }

    #[test]
    fn test_complex_images_exist() {
        let img = ImageHandle::new(&[2, 2], PixelId::ComplexFloat64, 1).unwrap();
        assert_eq!(img.byte_len(), 4 * 16);
        assert!(img.pixels::<f64>().unwrap_err().is_unsupported_pixel_type());
    }

    #[test]
    fn test_any_dimension_allowed() {
        let img = ImageHandle::new(&[2, 2, 2, 2], PixelId::UInt8, 1).unwrap();
        assert_eq!(img.byte_len(), 16);
        assert_eq!(img.geometry().direction.len(), 16);
    }

    #[test]
    fn test_element_mismatch() {
        let img = ImageHandle::new(&[2, 2], PixelId::UInt16, 1).unwrap();
        let err = img.pixels::<i16>().unwrap_err();
        assert!(matches!(err, Error::ElementMismatch { .. }));
    }

    #[test]
    fn test_geometry_default() {
        let img = ImageHandle::new(&[2, 3], PixelId::UInt8, 1).unwrap();
        let g = img.geometry();
        assert_eq!(g.dimension(), 2);
        assert_eq!(g.origin, vec![0.0, 0.0]);
        assert_eq!(g.spacing, vec![1.0, 1.0]);
        assert_eq!(g.direction, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_set_geometry() {
        let mut img = ImageHandle::new(&[2, 3], PixelId::UInt8, 1).unwrap();
        let mut g = Geometry::identity(2);
        g.spacing = vec![0.5, 0.25];
        img.set_geometry(g).unwrap();
        assert_relative_eq!(img.geometry().spacing[1], 0.25);
        assert!(img.set_geometry(Geometry::identity(3)).is_err());
    }

    #[test]
    fn test_deep_copy() {
        let mut img = ImageHandle::new(&[3, 3], PixelId::Float64, 1).unwrap();
        img.pixels_mut::<f64>().unwrap()[4] = 2.5;
        let copy = img.deep_copy().unwrap();
        img.pixels_mut::<f64>().unwrap()[4] = 0.0;
        assert_relative_eq!(copy.pixels::<f64>().unwrap()[4], 2.5);
        assert_eq!(copy.ownership(), Ownership::Owned);
        assert_ne!(copy.as_ptr(), img.as_ptr());
    }
}
