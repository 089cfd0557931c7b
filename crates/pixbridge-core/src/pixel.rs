//! Pixel type registry.
//!
//! This module maps pixel type tags to the element layout the marshaling
//! layer needs: how many bytes one element occupies and whether the pixel
//! is vector-valued.
//!
//! # Types
//!
//! - [`PixelId`] - Pixel type tag, numbered like the imaging library's tags
//! - [`ElementKind`] - The ten storable element types (u8 .. f64)
//! - [`PixelTypeInfo`] - Registry entry: element kind plus scalar/vector kind
//! - [`Element`] - Rust types that can be viewed as pixel elements
//!
//! # Usage
//!
//! ```rust
//! use pixbridge_core::{ElementKind, PixelId};
//!
//! let info = PixelId::VectorUInt16.resolve().unwrap();
//! assert_eq!(info.element, ElementKind::U16);
//! assert_eq!(info.element.byte_width(), 2);
//! assert!(info.is_vector);
//!
//! // Complex types exist in the image model but are never marshaled
//! assert!(PixelId::ComplexFloat64.resolve().is_err());
//! ```
//!
//! # Registry
//!
//! Resolution is a single lookup in [`PIXEL_TYPES`], a static table with one
//! entry per supported tag. Unknown and complex tags have no entry.

use crate::{Error, Result};

/// Storable element type of a pixel component.
///
/// Every supported pixel type stores components of exactly one of these
/// kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 8-bit unsigned integer.
    U8,
    /// 8-bit signed integer.
    I8,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit signed integer.
    I16,
    /// 32-bit unsigned integer.
    U32,
    /// 32-bit signed integer.
    I32,
    /// 64-bit unsigned integer.
    U64,
    /// 64-bit signed integer.
    I64,
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

impl ElementKind {
    /// All element kinds, narrowest first.
    pub const ALL: [ElementKind; 10] = [
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::U64,
        Self::I64,
        Self::F32,
        Self::F64,
    ];

    /// Number of bytes per element.
    #[inline]
    pub const fn byte_width(&self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Whether this is a floating-point element.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether this element can hold negative values.
    #[inline]
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    /// Short name, matching the host array dtype names.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// Array-interface type string (byte order, kind, width).
    ///
    /// Single-byte elements carry no byte order (`|`); wider elements use
    /// the byte order of the running target.
    ///
    /// ```rust
    /// use pixbridge_core::ElementKind;
    /// assert_eq!(ElementKind::U8.typestr(), "|u1");
    /// # #[cfg(target_endian = "little")]
    /// assert_eq!(ElementKind::F64.typestr(), "<f8");
    /// ```
    pub const fn typestr(&self) -> &'static str {
        #[cfg(target_endian = "little")]
        {
            match self {
                Self::U8 => "|u1",
                Self::I8 => "|i1",
                Self::U16 => "<u2",
                Self::I16 => "<i2",
                Self::U32 => "<u4",
                Self::I32 => "<i4",
                Self::U64 => "<u8",
                Self::I64 => "<i8",
                Self::F32 => "<f4",
                Self::F64 => "<f8",
            }
        }
        #[cfg(target_endian = "big")]
        {
            match self {
                Self::U8 => "|u1",
                Self::I8 => "|i1",
                Self::U16 => ">u2",
                Self::I16 => ">i2",
                Self::U32 => ">u4",
                Self::I32 => ">i4",
                Self::U64 => ">u8",
                Self::I64 => ">i8",
                Self::F32 => ">f4",
                Self::F64 => ">f8",
            }
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rust types that can stand for one pixel element.
///
/// Implemented for the ten primitive types behind [`ElementKind`]. The
/// `bytemuck::Pod` bound makes reinterpreting pixel bytes as `&[Self]`
/// a checked, safe cast.
pub trait Element: bytemuck::Pod + Default + PartialEq + std::fmt::Debug {
    /// Element kind this type represents.
    const KIND: ElementKind;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const KIND: ElementKind = ElementKind::$kind;
            }
        )*
    };
}

impl_element!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

/// Pixel type tag.
///
/// Raw values follow the imaging library's numbering so tags can cross the
/// host boundary as plain integers. Any raw value without a variant decodes
/// to [`PixelId::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum PixelId {
    /// Unknown pixel type (sentinel).
    #[default]
    Unknown = -1,
    /// Scalar u8.
    UInt8 = 1,
    /// Scalar i8.
    Int8 = 2,
    /// Scalar u16.
    UInt16 = 3,
    /// Scalar i16.
    Int16 = 4,
    /// Scalar u32.
    UInt32 = 5,
    /// Scalar i32.
    Int32 = 6,
    /// Scalar u64.
    UInt64 = 7,
    /// Scalar i64.
    Int64 = 8,
    /// Scalar f32.
    Float32 = 9,
    /// Scalar f64.
    Float64 = 10,
    /// Complex of two f32 (not marshaled).
    ComplexFloat32 = 11,
    /// Complex of two f64 (not marshaled).
    ComplexFloat64 = 12,
    /// Vector of u8.
    VectorUInt8 = 13,
    /// Vector of i8.
    VectorInt8 = 14,
    /// Vector of u16.
    VectorUInt16 = 15,
    /// Vector of i16.
    VectorInt16 = 16,
    /// Vector of u32.
    VectorUInt32 = 17,
    /// Vector of i32.
    VectorInt32 = 18,
    /// Vector of u64.
    VectorUInt64 = 19,
    /// Vector of i64.
    VectorInt64 = 20,
    /// Vector of f32.
    VectorFloat32 = 21,
    /// Vector of f64.
    VectorFloat64 = 22,
}

/// Registry entry for a supported pixel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelTypeInfo {
    /// Tag this entry describes.
    pub id: PixelId,
    /// Element stored per component.
    pub element: ElementKind,
    /// Whether pixels hold more than one component.
    pub is_vector: bool,
}

impl PixelTypeInfo {
    const fn scalar(id: PixelId, element: ElementKind) -> Self {
        Self {
            id,
            element,
            is_vector: false,
        }
    }

    const fn vector(id: PixelId, element: ElementKind) -> Self {
        Self {
            id,
            element,
            is_vector: true,
        }
    }
}

/// Every pixel type the marshaling layer accepts.
///
/// Indexed by `raw - 1` for scalars and `raw - 3` for vectors, which is what
/// [`PixelId::resolve`] relies on. Complex and unknown tags are absent.
pub static PIXEL_TYPES: [PixelTypeInfo; 20] = [
    PixelTypeInfo::scalar(PixelId::UInt8, ElementKind::U8),
    PixelTypeInfo::scalar(PixelId::Int8, ElementKind::I8),
    PixelTypeInfo::scalar(PixelId::UInt16, ElementKind::U16),
    PixelTypeInfo::scalar(PixelId::Int16, ElementKind::I16),
    PixelTypeInfo::scalar(PixelId::UInt32, ElementKind::U32),
    PixelTypeInfo::scalar(PixelId::Int32, ElementKind::I32),
    PixelTypeInfo::scalar(PixelId::UInt64, ElementKind::U64),
    PixelTypeInfo::scalar(PixelId::Int64, ElementKind::I64),
    PixelTypeInfo::scalar(PixelId::Float32, ElementKind::F32),
    PixelTypeInfo::scalar(PixelId::Float64, ElementKind::F64),
    PixelTypeInfo::vector(PixelId::VectorUInt8, ElementKind::U8),
    PixelTypeInfo::vector(PixelId::VectorInt8, ElementKind::I8),
    PixelTypeInfo::vector(PixelId::VectorUInt16, ElementKind::U16),
    PixelTypeInfo::vector(PixelId::VectorInt16, ElementKind::I16),
    PixelTypeInfo::vector(PixelId::VectorUInt32, ElementKind::U32),
    PixelTypeInfo::vector(PixelId::VectorInt32, ElementKind::I32),
    PixelTypeInfo::vector(PixelId::VectorUInt64, ElementKind::U64),
    PixelTypeInfo::vector(PixelId::VectorInt64, ElementKind::I64),
    PixelTypeInfo::vector(PixelId::VectorFloat32, ElementKind::F32),
    PixelTypeInfo::vector(PixelId::VectorFloat64, ElementKind::F64),
];

impl PixelId {
    /// Every tag, including the unsupported ones.
    pub const ALL: [PixelId; 23] = [
        Self::Unknown,
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::ComplexFloat32,
        Self::ComplexFloat64,
        Self::VectorUInt8,
        Self::VectorInt8,
        Self::VectorUInt16,
        Self::VectorInt16,
        Self::VectorUInt32,
        Self::VectorInt32,
        Self::VectorUInt64,
        Self::VectorInt64,
        Self::VectorFloat32,
        Self::VectorFloat64,
    ];

    /// Decodes a raw tag value. Unrecognized values map to `Unknown`.
    pub fn from_raw(raw: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.raw() == raw)
            .unwrap_or(Self::Unknown)
    }

    /// Raw tag value.
    #[inline]
    pub const fn raw(&self) -> i32 {
        *self as i32
    }

    /// Scalar tag storing `element`.
    pub const fn scalar_of(element: ElementKind) -> Self {
        match element {
            ElementKind::U8 => Self::UInt8,
            ElementKind::I8 => Self::Int8,
            ElementKind::U16 => Self::UInt16,
            ElementKind::I16 => Self::Int16,
            ElementKind::U32 => Self::UInt32,
            ElementKind::I32 => Self::Int32,
            ElementKind::U64 => Self::UInt64,
            ElementKind::I64 => Self::Int64,
            ElementKind::F32 => Self::Float32,
            ElementKind::F64 => Self::Float64,
        }
    }

    /// Vector tag storing `element`.
    pub const fn vector_of(element: ElementKind) -> Self {
        match element {
            ElementKind::U8 => Self::VectorUInt8,
            ElementKind::I8 => Self::VectorInt8,
            ElementKind::U16 => Self::VectorUInt16,
            ElementKind::I16 => Self::VectorInt16,
            ElementKind::U32 => Self::VectorUInt32,
            ElementKind::I32 => Self::VectorInt32,
            ElementKind::U64 => Self::VectorUInt64,
            ElementKind::I64 => Self::VectorInt64,
            ElementKind::F32 => Self::VectorFloat32,
            ElementKind::F64 => Self::VectorFloat64,
        }
    }

    /// Parses a tag name such as `"uint16"` or `"VectorFloat32"`.
    ///
    /// Matching ignores ASCII case. Element names (`"float32"`) are also
    /// accepted with a `vector` prefix (`"vectorfloat32"`).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "unknown" => return Some(Self::Unknown),
            "complexfloat32" => return Some(Self::ComplexFloat32),
            "complexfloat64" => return Some(Self::ComplexFloat64),
            _ => {}
        }
        let (is_vector, element_name) = match lower.strip_prefix("vector") {
            Some(rest) => (true, rest),
            None => (false, lower.as_str()),
        };
        let element = ElementKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == element_name)?;
        Some(if is_vector {
            Self::vector_of(element)
        } else {
            Self::scalar_of(element)
        })
    }

    /// Whether this is one of the complex tags.
    #[inline]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::ComplexFloat32 | Self::ComplexFloat64)
    }

    /// Resolves this tag through the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPixelType`] for [`PixelId::Unknown`] and
    /// for both complex tags.
    pub fn resolve(&self) -> Result<PixelTypeInfo> {
        let raw = self.raw();
        let index = match raw {
            1..=10 => raw - 1,
            13..=22 => raw - 3,
            11 | 12 => {
                return Err(Error::unsupported_pixel_type(
                    *self,
                    "images of complex pixel types are not supported",
                ))
            }
            _ => return Err(Error::unsupported_pixel_type(*self, "unknown pixel type")),
        };
        Ok(PIXEL_TYPES[index as usize])
    }

    /// Bytes per component as the image model stores it.
    ///
    /// Unlike [`resolve`](Self::resolve) this covers complex types (a pair of
    /// floats). Returns `None` only for `Unknown`.
    pub fn storage_bytes(&self) -> Option<usize> {
        match self {
            Self::Unknown => None,
            Self::ComplexFloat32 => Some(8),
            Self::ComplexFloat64 => Some(16),
            _ => self.resolve().ok().map(|info| info.element.byte_width()),
        }
    }
}

impl std::fmt::Display for PixelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
