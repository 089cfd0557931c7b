//! Importing host buffers into images.
//!
//! Three paths:
//! - [`import_buffer_in_place`] copies into an existing image's storage.
//! - [`import_buffer_as_new_image`] copies into a newly allocated image.
//! - [`import_buffer_as_image_view`] builds an image whose storage *is*
//!   the buffer. It is `unsafe`: the caller keeps the memory alive. It
//!   consumes the descriptor, which is then no longer a path to the memory.
//!
//! Every path validates pixel type, dimension, components, contiguity and
//! length, in that order, before a byte is copied or aliased. A rejected
//! import leaves both the image and the buffer untouched.

use crate::Result;
use crate::buffer::BufferDescriptor;
use crate::image::ImageHandle;
use crate::layout::{self, BufferLayout};
use crate::pixel::PixelId;
use crate::storage::PixelStorage;
use tracing::{debug, trace};

/// Shape, pixel type and component count of an image to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Image shape, fastest axis first.
    pub shape: Vec<usize>,
    /// Pixel type tag.
    pub pixel_id: PixelId,
    /// Elements per pixel. Zero is treated as one.
    pub components: usize,
}

impl ImportSpec {
    /// Spec for a single-component image.
    pub fn new(shape: &[usize], pixel_id: PixelId) -> Self {
        Self {
            shape: shape.to_vec(),
            pixel_id,
            components: 1,
        }
    }

    /// Sets the component count.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    /// Spec for a row-major host array of `pixel_id` elements.
    ///
    /// Host axes run slowest first. With `is_vector` the last host axis is
    /// the component axis and the pixel type is promoted to its vector
    /// form.
    ///
    /// ```rust
    /// use pixbridge_core::{ImportSpec, PixelId};
    ///
    /// let spec = ImportSpec::from_host_shape(&[4, 3, 2], PixelId::UInt8, true).unwrap();
    /// assert_eq!(spec.shape, vec![3, 4]);
    /// assert_eq!(spec.components, 2);
    /// assert_eq!(spec.pixel_id, PixelId::VectorUInt8);
    /// ```
    pub fn from_host_shape(host_shape: &[usize], pixel_id: PixelId, is_vector: bool) -> Result<Self> {
        let info = pixel_id.resolve()?;
        let (shape, components) = layout::image_shape_from_host(host_shape, is_vector)?;
        let pixel_id = if is_vector {
            PixelId::vector_of(info.element)
        } else {
            pixel_id
        };
        Ok(Self {
            shape,
            pixel_id,
            components,
        })
    }

    /// Validates this spec against a buffer.
    fn validate(&self, buffer: &BufferDescriptor<'_>) -> Result<BufferLayout> {
        let layout = BufferLayout::resolve(&self.shape, self.pixel_id, self.components)?;
        buffer.ensure_contiguous()?;
        layout.check_len(buffer.len())?;
        Ok(layout)
    }
}

/// How a new image relates to the buffer it is imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportMode {
    /// Deep-copy the buffer into owned storage.
    #[default]
    Copy,
    /// Use the buffer as the image's storage.
    Alias,
}

/// Copies a buffer into an existing image's storage.
///
/// The image keeps its shape, pixel type and geometry.
///
/// # Errors
///
/// - [`Error::UnsupportedPixelType`](crate::Error::UnsupportedPixelType) for complex and unknown images
/// - [`Error::UnsupportedDimension`](crate::Error::UnsupportedDimension) unless the image has 2 or 3 axes
/// - [`Error::NonContiguousBuffer`](crate::Error::NonContiguousBuffer) for strided buffers
/// - [`Error::SizeMismatch`](crate::Error::SizeMismatch) if the lengths differ
/// - [`Error::SharedStorage`](crate::Error::SharedStorage) while a shared view of the image exists
/// - [`Error::ReadOnlyStorage`](crate::Error::ReadOnlyStorage) if the image aliases read-only memory
pub fn import_buffer_in_place(buffer: &BufferDescriptor<'_>, image: &mut ImageHandle) -> Result<()> {
    trace!(
        pixel_id = %image.pixel_id(),
        dimension = image.dimension(),
        bytes = buffer.len(),
        "import::in_place"
    );
    let layout = BufferLayout::resolve(image.shape(), image.pixel_id(), image.components())?;
    buffer.ensure_contiguous()?;
    layout.check_len(buffer.len())?;
    layout.check_len(image.byte_len())?;

    image.bytes_mut()?.copy_from_slice(buffer.as_bytes());
    debug!(bytes = layout.byte_len, "Copied buffer into image");
    Ok(())
}

/// Creates an image holding a copy of a buffer.
///
/// The image owns its storage and has default geometry.
///
/// # Errors
///
/// Fails like [`import_buffer_in_place`], with
/// [`Error::InvalidComponents`](crate::Error::InvalidComponents) for a
/// scalar type with several components and
/// [`Error::AllocationFailed`](crate::Error::AllocationFailed) if storage
/// cannot be allocated.
pub fn import_buffer_as_new_image(buffer: &BufferDescriptor<'_>, spec: &ImportSpec) -> Result<ImageHandle> {
    trace!(pixel_id = %spec.pixel_id, dimension = spec.shape.len(), bytes = buffer.len(), "import::copy");
    let layout = spec.validate(buffer)?;
    let storage = PixelStorage::copy_from(buffer.as_bytes())?;
    Ok(ImageHandle::from_layout(layout, storage))
}

/// Creates an image whose storage is the buffer's memory.
///
/// Nothing is copied. The image is
/// [`Ownership::Borrowed`](crate::Ownership::Borrowed) and never frees the
/// memory. Writes through the image reach the buffer; read-only buffers
/// produce read-only images.
///
/// Fails like [`import_buffer_as_new_image`], minus allocation failure.
///
/// The descriptor is consumed, so it cannot be read while the image writes
/// the same memory:
///
/// ```rust,compile_fail
/// use pixbridge_core::{BufferDescriptor, ImportSpec, PixelId, import_buffer_as_image_view};
///
/// let mut bytes = vec![0u8; 4];
/// let desc = BufferDescriptor::from_mut_slice(&mut bytes);
/// let spec = ImportSpec::new(&[2, 2], PixelId::UInt8);
/// let mut img = unsafe { import_buffer_as_image_view(desc, &spec) }.unwrap();
/// let shared = desc.as_bytes();
/// img.bytes_mut().unwrap()[0] = 9;
/// assert_eq!(shared[0], 9);
/// ```
///
/// # Safety
///
/// The memory described by `buffer` must stay valid for as long as the
/// returned image, or any [`SharedView`](crate::SharedView) of it, exists.
/// Meanwhile the memory must not be accessed except through the image and
/// its views, and in particular no other descriptor of it may be passed to
/// an import. Memory of a read-only buffer may still be read elsewhere.
pub unsafe fn import_buffer_as_image_view(buffer: BufferDescriptor<'_>, spec: &ImportSpec) -> Result<ImageHandle> {
    trace!(pixel_id = %spec.pixel_id, dimension = spec.shape.len(), bytes = buffer.len(), "import::alias");
    let layout = spec.validate(&buffer)?;
    // SAFETY: forwarded to the caller.
    let storage = unsafe { PixelStorage::wrap(buffer.as_non_null(), buffer.len(), buffer.is_writable()) };
    Ok(ImageHandle::from_layout(layout, storage))
}

/// Creates an image from a buffer, copying or aliasing per `mode`.
///
/// # Safety
///
/// With [`ImportMode::Alias`], as for [`import_buffer_as_image_view`].
/// [`ImportMode::Copy`] has no requirements.
pub unsafe fn import_buffer(buffer: BufferDescriptor<'_>, spec: &ImportSpec, mode: ImportMode) -> Result<ImageHandle> {
    match mode {
        ImportMode::Copy => import_buffer_as_new_image(&buffer, spec),
        // SAFETY: forwarded to the caller.
        ImportMode::Alias => unsafe { import_buffer_as_image_view(buffer, spec) },
    }
}
