//! Buffer size validation.
//!
//! Computes how many bytes an image's pixel storage occupies and checks
//! caller buffers against it. Every copy and every alias in this crate is
//! preceded by one of these checks.
//!
//! # Vector images
//!
//! A vector image is addressed exactly like a scalar image with one extra
//! trailing axis whose extent is the component count:
//!
//! ```rust
//! use pixbridge_core::layout::expected_bytes;
//!
//! let vector = expected_bytes(&[5, 3], 4, 2).unwrap();
//! let scalar = expected_bytes(&[5, 3, 4], 1, 2).unwrap();
//! assert_eq!(vector, scalar);
//! assert_eq!(vector, 5 * 3 * 4 * 2);
//! ```
//!
//! # Host axis order
//!
//! Image shapes list the fastest-varying axis first (`[x, y, z]`). A
//! row-major host array lists the slowest axis first, with the component
//! axis last: see [`host_shape`].

use crate::pixel::{ElementKind, PixelId, PixelTypeInfo};
use crate::{Error, Result};
use std::ops::RangeInclusive;

/// Dimensions accepted by every marshaling operation.
pub const SUPPORTED_DIMENSIONS: RangeInclusive<usize> = 2..=3;

/// Fails with [`Error::UnsupportedDimension`] unless `dimension` is 2 or 3.
#[inline]
pub fn validate_dimension(dimension: usize) -> Result<()> {
    if SUPPORTED_DIMENSIONS.contains(&dimension) {
        Ok(())
    } else {
        Err(Error::unsupported_dimension(dimension))
    }
}

/// Normalizes a component count for a resolved pixel type.
///
/// Zero is treated as one. Scalar pixel types only accept one component.
pub fn normalize_components(info: &PixelTypeInfo, components: usize) -> Result<usize> {
    let components = components.max(1);
    if !info.is_vector && components > 1 {
        return Err(Error::invalid_components(info.id, components));
    }
    Ok(components)
}

/// Shape with the component axis appended when `components > 1`.
pub fn effective_shape(shape: &[usize], components: usize) -> Vec<usize> {
    let mut effective = shape.to_vec();
    if components > 1 {
        effective.push(components);
    }
    effective
}

/// Bytes needed to hold `shape` with `components` elements of
/// `element_width` bytes per pixel.
///
/// # Errors
///
/// Returns [`Error::SizeOverflow`] if the product does not fit in `usize`.
/// A zero extent anywhere makes the layout empty, whatever the other axes.
pub fn expected_bytes(shape: &[usize], components: usize, element_width: usize) -> Result<usize> {
    let effective = effective_shape(shape, components);
    if effective.contains(&0) {
        return Ok(0);
    }
    effective
        .iter()
        .try_fold(element_width, |acc, &extent| acc.checked_mul(extent))
        .ok_or(Error::SizeOverflow)
}

/// Fails with [`Error::SizeMismatch`] when `actual != expected`.
#[inline]
pub fn validate_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::size_mismatch(expected, actual))
    }
}

/// Row-major host array shape for an image shape.
///
/// Axes are reversed so the slowest axis comes first; the component axis,
/// when present, stays last.
///
/// ```rust
/// use pixbridge_core::layout::host_shape;
///
/// assert_eq!(host_shape(&[9, 10], 1), vec![10, 9]);
/// assert_eq!(host_shape(&[3, 4, 5], 3), vec![5, 4, 3, 3]);
/// ```
pub fn host_shape(shape: &[usize], components: usize) -> Vec<usize> {
    let mut host: Vec<usize> = shape.iter().rev().copied().collect();
    if components > 1 {
        host.push(components);
    }
    host
}

/// Inverse of [`host_shape`]: returns `(image_shape, components)`.
///
/// With `is_vector` the last host axis is taken as the component axis.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] if `host` has no axes left for the image.
pub fn image_shape_from_host(host: &[usize], is_vector: bool) -> Result<(Vec<usize>, usize)> {
    let (axes, components) = if is_vector {
        match host.split_last() {
            Some((&components, axes)) => (axes, components),
            None => return Err(Error::invalid_shape("vector host shape has no axes")),
        }
    } else {
        (host, 1)
    };
    if axes.is_empty() {
        return Err(Error::invalid_shape("host shape has no image axes"));
    }
    Ok((axes.iter().rev().copied().collect(), components))
}

/// Validated layout of a (shape, pixel type, components) triple.
///
/// Construction runs every check a marshaling operation needs before it
/// touches memory, in a fixed order: pixel type, dimension, components,
/// byte count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    /// Image shape, fastest axis first.
    pub shape: Vec<usize>,
    /// Pixel type tag.
    pub pixel_id: PixelId,
    /// Components per pixel (at least 1).
    pub components: usize,
    /// Element stored per component.
    pub element: ElementKind,
    /// Total bytes of pixel storage.
    pub byte_len: usize,
}

impl BufferLayout {
    /// Resolves and validates a layout.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedPixelType`] for unknown and complex tags
    /// - [`Error::UnsupportedDimension`] unless `shape` has 2 or 3 axes
    /// - [`Error::InvalidComponents`] for a scalar type with `components > 1`
    /// - [`Error::SizeOverflow`] if the byte count overflows
    pub fn resolve(shape: &[usize], pixel_id: PixelId, components: usize) -> Result<Self> {
        let info = pixel_id.resolve()?;
        validate_dimension(shape.len())?;
        let components = normalize_components(&info, components)?;
        let byte_len = expected_bytes(shape, components, info.element.byte_width())?;
        Ok(Self {
            shape: shape.to_vec(),
            pixel_id,
            components,
            element: info.element,
            byte_len,
        })
    }

    /// Number of image axes.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.shape.len()
    }

    /// Shape with the component axis appended for vector images.
    pub fn effective_shape(&self) -> Vec<usize> {
        effective_shape(&self.shape, self.components)
    }

    /// Row-major host array shape.
    pub fn host_shape(&self) -> Vec<usize> {
        host_shape(&self.shape, self.components)
    }

    /// Number of elements (pixels times components).
    #[inline]
    pub fn element_count(&self) -> usize {
        self.byte_len / self.element.byte_width()
    }

    /// Checks a buffer length against this layout.
    #[inline]
    pub fn check_len(&self, actual: usize) -> Result<()> {
        validate_len(self.byte_len, actual)
    }
}
