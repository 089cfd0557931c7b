//! Host buffer descriptors and exported buffers.
//!
//! A [`BufferDescriptor`] describes caller-owned contiguous memory handed to
//! an import. [`ExportedBuffer`], [`ByteView`] and [`ByteViewMut`] are what
//! exports hand back. A [`SharedView`] holds its own reference to the
//! storage and may outlive the image.

use crate::layout::BufferLayout;
use crate::pixel::{ElementKind, PixelId};
use crate::storage::PixelStorage;
use crate::{Error, Result};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

/// Strided layout reported by a host buffer.
///
/// Strides are in bytes and may be negative, as host array protocols allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StridedLayout {
    /// Extent of each axis, slowest first.
    pub shape: Vec<usize>,
    /// Byte step between consecutive indices of each axis.
    pub strides: Vec<isize>,
    /// Bytes per item.
    pub itemsize: usize,
}

impl StridedLayout {
    /// Returns `true` if the layout is C-contiguous.
    ///
    /// Axes of extent 1 may carry any stride. A layout holding no items is
    /// contiguous.
    pub fn is_c_contiguous(&self) -> bool {
        if self.shape.iter().any(|&extent| extent == 0) {
            return true;
        }
        let mut expected = self.itemsize as isize;
        for (&extent, &stride) in self.shape.iter().zip(&self.strides).rev() {
            if extent > 1 && stride != expected {
                return false;
            }
            expected = expected.saturating_mul(extent as isize);
        }
        true
    }

    /// Bytes spanned by the items of this layout.
    pub fn byte_len(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(self.itemsize, |acc, &extent| acc.checked_mul(extent))
    }
}

/// Caller-owned memory handed to an import.
///
/// A descriptor is a pointer, a length in bytes, a writability flag and an
/// optional strided layout. Descriptors built from slices borrow them for
/// `'a`; descriptors built from raw parts carry the caller's promise that
/// the memory is valid for `'a`.
///
/// # Example
///
/// ```rust
/// use pixbridge_core::BufferDescriptor;
///
/// let bytes = vec![0u8; 30];
/// let desc = BufferDescriptor::from_slice(&bytes);
/// assert_eq!(desc.len(), 30);
/// assert!(!desc.is_writable());
/// assert!(desc.is_c_contiguous());
/// ```
#[derive(Debug)]
pub struct BufferDescriptor<'a> {
    ptr: NonNull<u8>,
    len: usize,
    writable: bool,
    layout: Option<StridedLayout>,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> BufferDescriptor<'a> {
    /// Describes a read-only slice.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            ptr: non_null(bytes.as_ptr() as *mut u8),
            len: bytes.len(),
            writable: false,
            layout: None,
            _marker: PhantomData,
        }
    }

    /// Describes a writable slice.
    pub fn from_mut_slice(bytes: &'a mut [u8]) -> Self {
        Self {
            ptr: non_null(bytes.as_mut_ptr()),
            len: bytes.len(),
            writable: true,
            layout: None,
            _marker: PhantomData,
        }
    }

    /// Describes raw memory.
    ///
    /// A null `ptr` is accepted only when `len` is zero.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes for `'a`, and for writes
    /// as well when `writable` is set. Nothing else may write to the memory
    /// while the descriptor, or an image aliasing it, reads from it.
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize, writable: bool) -> Result<Self> {
        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None if len == 0 => NonNull::dangling(),
            None => return Err(Error::invalid_shape("null buffer pointer with non-zero length")),
        };
        Ok(Self {
            ptr,
            len,
            writable,
            layout: None,
            _marker: PhantomData,
        })
    }

    /// Attaches the strided layout the host reported for this memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] if `shape` and `strides` differ in
    /// length, `itemsize` is zero, or the layout's items do not add up to
    /// the buffer length.
    pub fn with_strides(mut self, shape: &[usize], strides: &[isize], itemsize: usize) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(Error::invalid_shape(format!(
                "{} axes but {} strides",
                shape.len(),
                strides.len()
            )));
        }
        if itemsize == 0 {
            return Err(Error::invalid_shape("item size is zero"));
        }
        let layout = StridedLayout {
            shape: shape.to_vec(),
            strides: strides.to_vec(),
            itemsize,
        };
        if layout.byte_len() != Some(self.len) {
            return Err(Error::invalid_shape(format!(
                "strided layout holds {:?} bytes but the buffer has {}",
                layout.byte_len(),
                self.len
            )));
        }
        self.layout = Some(layout);
        Ok(self)
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the memory may be written through an alias.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Strided layout, if the host reported one.
    #[inline]
    pub fn layout(&self) -> Option<&StridedLayout> {
        self.layout.as_ref()
    }

    /// Returns `true` if the memory is C-contiguous.
    ///
    /// Buffers without a strided layout are contiguous by construction.
    #[inline]
    pub fn is_c_contiguous(&self) -> bool {
        self.layout.as_ref().is_none_or(StridedLayout::is_c_contiguous)
    }

    /// Fails with [`Error::NonContiguousBuffer`] unless the buffer is
    /// C-contiguous.
    pub fn ensure_contiguous(&self) -> Result<()> {
        if self.is_c_contiguous() {
            Ok(())
        } else {
            Err(Error::NonContiguousBuffer)
        }
    }

    /// Base pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The described bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the constructors guarantee `ptr` is valid for `len` bytes for 'a.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

fn non_null(ptr: *mut u8) -> NonNull<u8> {
    // Slice pointers are never null, even for empty slices.
    NonNull::new(ptr).unwrap_or(NonNull::dangling())
}

/// Pixel bytes copied out of an image.
///
/// Owns its memory; independent of the image it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBuffer {
    /// Copied pixel bytes.
    pub bytes: Vec<u8>,
    /// Pixel type of the source image.
    pub pixel_id: PixelId,
    /// Element type of the bytes.
    pub element: ElementKind,
    /// Row-major host array shape of the bytes.
    pub host_shape: Vec<usize>,
}

impl ExportedBuffer {
    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if no bytes were exported.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the buffer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read-only view of an image's pixel storage.
///
/// Borrows the image: the image cannot be mutated or dropped while the view
/// is alive.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
    element: ElementKind,
}

impl<'a> ByteView<'a> {
    pub(crate) fn new(bytes: &'a [u8], element: ElementKind) -> Self {
        Self { bytes, element }
    }

    /// The aliased bytes.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Element type of the bytes.
    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base pointer of the aliased storage.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }
}

impl std::ops::Deref for ByteView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

/// Writable view of an image's pixel storage.
///
/// Writes through the view are writes to the image.
#[derive(Debug)]
pub struct ByteViewMut<'a> {
    bytes: &'a mut [u8],
    element: ElementKind,
}

impl<'a> ByteViewMut<'a> {
    pub(crate) fn new(bytes: &'a mut [u8], element: ElementKind) -> Self {
        Self { bytes, element }
    }

    /// Element type of the bytes.
    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    /// Consumes the view, returning the aliased bytes.
    pub fn into_bytes(self) -> &'a mut [u8] {
        self.bytes
    }
}

impl std::ops::Deref for ByteViewMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl std::ops::DerefMut for ByteViewMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Zero-copy view that keeps an image's pixel storage alive.
///
/// Unlike [`ByteView`], a shared view owns a reference to the storage, so
/// it survives the image handle it came from. The storage is freed when the
/// handle and every shared view are gone.
///
/// Reads are always allowed. Writing needs the view to be the last holder
/// of the storage; while the image or another view exists,
/// [`bytes_mut`](Self::bytes_mut) fails with [`Error::SharedStorage`].
#[derive(Debug)]
pub struct SharedView {
    storage: Arc<PixelStorage>,
    pixel_id: PixelId,
    element: ElementKind,
    host_shape: Vec<usize>,
}

impl SharedView {
    pub(crate) fn new(storage: Arc<PixelStorage>, layout: &BufferLayout) -> Self {
        Self {
            storage,
            pixel_id: layout.pixel_id,
            element: layout.element,
            host_shape: layout.host_shape(),
        }
    }

    /// Pixel type of the source image.
    #[inline]
    pub fn pixel_id(&self) -> PixelId {
        self.pixel_id
    }

    /// Element type of the bytes.
    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    /// Row-major host array shape of the bytes.
    #[inline]
    pub fn host_shape(&self) -> &[usize] {
        &self.host_shape
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base pointer of the aliased storage.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    /// The aliased bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    /// Number of holders of the storage, this view included.
    #[inline]
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    /// The aliased bytes, writable.
    ///
    /// # Errors
    ///
    /// - [`Error::SharedStorage`] while the image or another view still holds the storage
    /// - [`Error::ReadOnlyStorage`] if the image aliased read-only memory
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let references = Arc::strong_count(&self.storage);
        Arc::get_mut(&mut self.storage)
            .ok_or(Error::SharedStorage { references })?
            .bytes_mut()
    }
}

impl std::ops::Deref for SharedView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_descriptor() {
        let mut bytes = vec![1u8, 2, 3, 4];
        let desc = BufferDescriptor::from_mut_slice(&mut bytes);
        assert!(desc.is_writable());
        assert_eq!(desc.as_bytes(), &[1, 2, 3, 4]);
        assert!(desc.ensure_contiguous().is_ok());
    }

    #[test]
    fn test_empty_slice_descriptor() {
        let desc = BufferDescriptor::from_slice(&[]);
        assert!(desc.is_empty());
        assert!(desc.as_bytes().is_empty());
    }

    #[test]
    fn test_raw_null_pointer() {
        let desc = unsafe { BufferDescriptor::from_raw_parts(std::ptr::null_mut(), 0, false) };
        assert!(desc.is_ok());
        let desc = unsafe { BufferDescriptor::from_raw_parts(std::ptr::null_mut(), 4, false) };
        assert!(desc.is_err());
    }

    #[test]
    fn test_c_contiguous_strides() {
        let bytes = vec![0u8; 4 * 3 * 2];
        // (4, 3) array of u16, row-major
        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[4, 3], &[6, 2], 2)
            .unwrap();
        assert!(desc.is_c_contiguous());
        assert!(desc.ensure_contiguous().is_ok());
    }

    #[test]
    fn test_fortran_order_rejected() {
        let bytes = vec![0u8; 4 * 3 * 2];
        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[4, 3], &[2, 8], 2)
            .unwrap();
        assert!(!desc.is_c_contiguous());
        assert!(matches!(desc.ensure_contiguous(), Err(Error::NonContiguousBuffer)));
    }

    #[test]
    fn test_sliced_view_rejected() {
        // Every other row of a (4, 3) u8 array.
        let bytes = vec![0u8; 6];
        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[2, 3], &[6, 1], 1)
            .unwrap();
        assert!(desc.ensure_contiguous().is_err());
    }

    #[test]
    fn test_layout_length_must_match() {
        let bytes = vec![0u8; 10];
        assert!(matches!(
            BufferDescriptor::from_slice(&bytes).with_strides(&[4, 3], &[3, 1], 1),
            Err(Error::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_unit_axis_stride_ignored() {
        let bytes = vec![0u8; 6];
        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[1, 3, 2], &[999, 2, 1], 1)
            .unwrap();
        assert!(desc.ensure_contiguous().is_ok());
    }

    #[test]
    fn test_stride_rank_mismatch() {
        let bytes = vec![0u8; 6];
        assert!(BufferDescriptor::from_slice(&bytes)
            .with_strides(&[3, 2], &[2], 1)
            .is_err());
    }

    #[test]
    fn test_byte_view_mut_writes_through() {
        let mut bytes = vec![0u8; 4];
        {
            let mut view = ByteViewMut::new(&mut bytes, ElementKind::U8);
            view[0] = 7;
        }
        assert_eq!(bytes[0], 7);
    }

    #[test]
    fn test_shared_view_writes_once_unshared() {
        let layout = BufferLayout::resolve(&[2, 3], PixelId::UInt16, 1).unwrap();
        let storage = Arc::new(PixelStorage::allocate(layout.byte_len).unwrap());
        let mut first = SharedView::new(Arc::clone(&storage), &layout);
        let second = SharedView::new(storage, &layout);
        assert_eq!(first.host_shape(), &[3, 2]);
        assert_eq!(first.element(), ElementKind::U16);
        assert_eq!(first.holders(), 2);
        assert!(matches!(first.bytes_mut(), Err(Error::SharedStorage { references: 2 })));

        drop(second);
        first.bytes_mut().unwrap()[0] = 4;
        assert_eq!(first[0], 4);
        assert_eq!(first.len(), 12);
    }
}
