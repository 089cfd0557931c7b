//! Pixel storage backends for [`ImageHandle`](crate::ImageHandle).
//!
//! Storage is either a heap block allocated here or external memory
//! wrapped without copying. Heap blocks are zero-filled and aligned to
//! [`STORAGE_ALIGN`] so every element type can be viewed in place.

use crate::{Error, Result};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::fmt;
use std::ptr::NonNull;
use tracing::debug;

/// Alignment of heap-allocated pixel storage, in bytes.
pub const STORAGE_ALIGN: usize = 16;

/// Who owns an image's pixel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Heap storage allocated by this crate, freed with the image.
    Owned,
    /// Aliases external memory that is never freed here.
    Borrowed,
    /// Extra references were taken with
    /// [`adjust_reference_count`](crate::adjust_reference_count) or are
    /// held by [`SharedView`](crate::SharedView)s. The storage lives until
    /// the last of them is gone.
    Shared {
        /// Current reference count, including the handle's own.
        references: usize,
    },
}

impl Ownership {
    /// Returns `true` if the pixel memory belongs to someone else.
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Self::Borrowed)
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => f.write_str("owned"),
            Self::Borrowed => f.write_str("borrowed"),
            Self::Shared { references } => write!(f, "shared ({references} references)"),
        }
    }
}

enum Memory {
    Heap {
        ptr: NonNull<u8>,
        len: usize,
    },
    External {
        ptr: NonNull<u8>,
        len: usize,
        writable: bool,
    },
}

/// Pixel memory of one image.
///
/// Shared between an image handle and its [`SharedView`](crate::SharedView)s
/// through an `Arc`. Writes need `&mut PixelStorage`, which only the sole
/// owner of that `Arc` can obtain.
pub(crate) struct PixelStorage {
    memory: Memory,
}

// Safety: PixelStorage is Send/Sync because:
// - Heap memory is owned exclusively and only written through `&mut PixelStorage`
// - External memory requires the caller of the unsafe wrap to ensure thread safety
unsafe impl Send for PixelStorage {}
unsafe impl Sync for PixelStorage {}

impl PixelStorage {
    /// Allocates `len` zeroed bytes.
    pub(crate) fn allocate(len: usize) -> Result<Self> {
        let layout = Layout::from_size_align(len.max(1), STORAGE_ALIGN)
            .map_err(|e| Error::allocation_failed(len, e.to_string()))?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| Error::allocation_failed(len, "allocator returned null"))?;
        debug!(bytes = len, "storage::allocate");
        Ok(Self::from_memory(Memory::Heap { ptr, len }))
    }

    /// Allocates storage holding a copy of `bytes`.
    pub(crate) fn copy_from(bytes: &[u8]) -> Result<Self> {
        let mut storage = Self::allocate(bytes.len())?;
        if let Some(dst) = storage.heap_bytes_mut() {
            dst.copy_from_slice(bytes);
        }
        Ok(storage)
    }

    /// Wraps external memory without copying.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes, and for writes when
    /// `writable` is set, for as long as this storage exists. The memory must
    /// not be accessed by anyone else meanwhile, except for reads of
    /// read-only memory.
    pub(crate) unsafe fn wrap(ptr: NonNull<u8>, len: usize, writable: bool) -> Self {
        debug!(bytes = len, writable, "storage::wrap");
        Self::from_memory(Memory::External { ptr, len, writable })
    }

    fn from_memory(memory: Memory) -> Self {
        Self { memory }
    }

    /// Length in bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self.memory {
            Memory::Heap { len, .. } | Memory::External { len, .. } => len,
        }
    }

    #[inline]
    fn ptr(&self) -> NonNull<u8> {
        match self.memory {
            Memory::Heap { ptr, .. } | Memory::External { ptr, .. } => ptr,
        }
    }

    /// Whether the storage wraps external memory.
    #[inline]
    pub(crate) fn is_external(&self) -> bool {
        matches!(self.memory, Memory::External { .. })
    }

    /// Whether the storage may be written.
    #[inline]
    pub(crate) fn is_writable(&self) -> bool {
        match self.memory {
            Memory::Heap { .. } => true,
            Memory::External { writable, .. } => writable,
        }
    }

    /// Base pointer of the pixel memory.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr().as_ptr()
    }

    /// The pixel bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        // SAFETY: heap memory is owned; external memory is valid per the wrap contract.
        unsafe { std::slice::from_raw_parts(self.ptr().as_ptr(), self.len()) }
    }

    fn heap_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self.memory {
            // SAFETY: `&mut self` gives exclusive access to owned memory.
            Memory::Heap { ptr, len } => Some(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) }),
            Memory::External { .. } => None,
        }
    }

    /// The pixel bytes, writable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnlyStorage`] for read-only external memory.
    pub(crate) fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        if !self.is_writable() {
            return Err(Error::ReadOnlyStorage);
        }
        // SAFETY: `&mut self` is exclusive; validity as in `as_bytes`.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr().as_ptr(), self.len()) })
    }
}

impl Drop for PixelStorage {
    fn drop(&mut self) {
        if let Memory::Heap { ptr, len } = self.memory {
            // Same layout as in `allocate`, which already validated it.
            if let Ok(layout) = Layout::from_size_align(len.max(1), STORAGE_ALIGN) {
                // SAFETY: ptr was returned by alloc_zeroed with this layout.
                unsafe { dealloc(ptr.as_ptr(), layout) };
            }
        }
    }
}

impl fmt::Debug for PixelStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_external() { "external" } else { "heap" };
        f.debug_struct("PixelStorage")
            .field("kind", &kind)
            .field("len", &self.len())
            .field("writable", &self.is_writable())
            .finish()
    }
}
