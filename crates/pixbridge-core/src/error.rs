//! Error types for pixbridge-core operations.
//!
//! Every marshaling operation validates its inputs before touching memory,
//! so each variant here describes a request that was rejected with the
//! image and the caller's buffer left exactly as they were.
//!
//! # Overview
//!
//! The [`Error`] enum covers the failure modes of:
//! - Pixel type resolution (unknown and complex tags)
//! - Buffer length and layout validation
//! - Dimension and component checks
//! - Storage allocation for copy-mode export and import
//! - Typed access to pixel storage
//!
//! # Usage
//!
//! ```rust
//! use pixbridge_core::{Error, Result};
//!
//! fn check(expected: usize, actual: usize) -> Result<()> {
//!     if expected != actual {
//!         return Err(Error::size_mismatch(expected, actual));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(30, 28).is_err());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use crate::pixel::{ElementKind, PixelId};
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while marshaling pixel buffers.
///
/// # Categories
///
/// - **Type errors**: [`UnsupportedPixelType`](Error::UnsupportedPixelType),
///   [`ElementMismatch`](Error::ElementMismatch)
/// - **Layout errors**: [`SizeMismatch`](Error::SizeMismatch),
///   [`SizeOverflow`](Error::SizeOverflow), [`NonContiguousBuffer`](Error::NonContiguousBuffer),
///   [`InvalidShape`](Error::InvalidShape), [`Misaligned`](Error::Misaligned)
/// - **Dimension errors**: [`UnsupportedDimension`](Error::UnsupportedDimension),
///   [`InvalidComponents`](Error::InvalidComponents)
/// - **Storage errors**: [`AllocationFailed`](Error::AllocationFailed),
///   [`ReadOnlyStorage`](Error::ReadOnlyStorage)
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel type is the unknown sentinel or a complex type.
    ///
    /// Complex pixel types exist in the image model but are never
    /// marshaled. This is permanent, not a missing feature.
    #[error("unsupported pixel type {pixel_id}: {reason}")]
    UnsupportedPixelType {
        /// Rejected pixel type tag
        pixel_id: PixelId,
        /// Why the tag was rejected
        reason: &'static str,
    },

    /// Buffer length disagrees with the image layout.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pixbridge_core::Error;
    ///
    /// let err = Error::size_mismatch(30, 28);
    /// assert!(err.to_string().contains("30"));
    /// assert!(err.to_string().contains("28"));
    /// ```
    #[error("size mismatch of image and buffer: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Bytes required by the image layout
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Image dimension is not 2 or 3.
    #[error("unsupported image dimension {dimension} (expected 2 or 3)")]
    UnsupportedDimension {
        /// Offending dimension count
        dimension: usize,
    },

    /// The supplied buffer is not laid out in C (row-major) order without gaps.
    #[error("a C contiguous buffer is required")]
    NonContiguousBuffer,

    /// Memory allocation failed.
    ///
    /// # Fields
    ///
    /// - `requested` - Number of bytes requested
    /// - `reason` - Description of why allocation failed
    #[error("failed to allocate {requested} bytes: {reason}")]
    AllocationFailed {
        /// Bytes requested
        requested: usize,
        /// Failure reason
        reason: String,
    },

    /// Component count is not valid for the pixel type.
    ///
    /// Scalar pixel types always carry exactly one component.
    #[error("pixel type {pixel_id} cannot have {components} components per pixel")]
    InvalidComponents {
        /// Pixel type
        pixel_id: PixelId,
        /// Requested component count
        components: usize,
    },

    /// Byte count of the layout does not fit in `usize`.
    #[error("buffer size overflows the address space")]
    SizeOverflow,

    /// Attempted to write into storage that aliases read-only memory.
    #[error("pixel storage aliases read-only memory")]
    ReadOnlyStorage,

    /// Attempted to write into storage that a [`SharedView`](crate::SharedView)
    /// or another holder can still read.
    #[error("pixel storage is shared by {references} references")]
    SharedStorage {
        /// Current reference count
        references: usize,
    },

    /// Typed access requested an element type the image does not store.
    #[error("element type mismatch: image stores {expected}, requested {requested}")]
    ElementMismatch {
        /// Element kind stored by the image
        expected: ElementKind,
        /// Element kind requested by the caller
        requested: ElementKind,
    },

    /// Pixel storage is not aligned for the requested element type.
    #[error("pixel storage is not aligned to {align} bytes")]
    Misaligned {
        /// Required alignment in bytes
        align: usize,
    },

    /// Shape or strided layout is malformed.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// What is wrong with the shape
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::UnsupportedPixelType`] error.
    #[inline]
    pub fn unsupported_pixel_type(pixel_id: PixelId, reason: &'static str) -> Self {
        Self::UnsupportedPixelType { pixel_id, reason }
    }

    /// Creates an [`Error::SizeMismatch`] error.
    #[inline]
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// Creates an [`Error::UnsupportedDimension`] error.
    #[inline]
    pub fn unsupported_dimension(dimension: usize) -> Self {
        Self::UnsupportedDimension { dimension }
    }

    /// Creates an [`Error::AllocationFailed`] error.
    #[inline]
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidComponents`] error.
    #[inline]
    pub fn invalid_components(pixel_id: PixelId, components: usize) -> Self {
        Self::InvalidComponents {
            pixel_id,
            components,
        }
    }

    /// Creates an [`Error::InvalidShape`] error.
    #[inline]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the request was rejected by input validation.
    ///
    /// Validation errors are raised before any memory is copied or aliased.
    #[inline]
    pub fn is_validation_error(&self) -> bool {
        !matches!(self, Self::AllocationFailed { .. })
    }

    /// Returns `true` if this is an allocation error.
    #[inline]
    pub fn is_allocation_error(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Returns `true` if this is a [`SizeMismatch`](Error::SizeMismatch).
    #[inline]
    pub fn is_size_mismatch(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. })
    }

    /// Returns `true` if this is an [`UnsupportedPixelType`](Error::UnsupportedPixelType).
    #[inline]
    pub fn is_unsupported_pixel_type(&self) -> bool {
        matches!(self, Self::UnsupportedPixelType { .. })
    }
}
