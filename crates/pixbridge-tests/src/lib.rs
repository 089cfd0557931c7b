//! Integration tests for pixbridge crates.
//!
//! End-to-end checks of import, export and reference counting working
//! together, for every marshalable pixel type.

pub mod hash;

#[cfg(test)]
mod tests {
    use crate::hash::{buffer_hash, image_hash};
    use pixbridge_core::PIXEL_TYPES;
    use pixbridge_core::layout::expected_bytes;
    use pixbridge_core::prelude::*;
    use tempfile::tempdir;

    const SHAPES: [&[usize]; 2] = [&[9, 10], &[4, 5, 3]];

    /// Deterministic, non-constant bytes.
    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    fn components_for(pixel_id: PixelId) -> usize {
        match pixel_id.resolve() {
            Ok(info) if info.is_vector => 3,
            _ => 1,
        }
    }

    fn spec_for(shape: &[usize], pixel_id: PixelId) -> ImportSpec {
        ImportSpec::new(shape, pixel_id).with_components(components_for(pixel_id))
    }

    fn buffer_len(shape: &[usize], pixel_id: PixelId) -> usize {
        let info = pixel_id.resolve().unwrap();
        expected_bytes(shape, components_for(pixel_id), info.element.byte_width()).unwrap()
    }

    /// Copy import then copy export returns the same bytes, for every
    /// pixel type in 2D and 3D.
    #[test]
    fn test_copy_roundtrip_all_types() {
        for info in PIXEL_TYPES.iter() {
            for shape in SHAPES {
                let bytes = pattern(buffer_len(shape, info.id), info.id.raw() as u8);
                let spec = spec_for(shape, info.id);

                let img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes), &spec).unwrap();
                assert_eq!(img.shape(), shape);
                assert_eq!(img.pixel_id(), info.id);
                assert_eq!(img.components(), spec.components);

                let out = export_buffer(&img).unwrap();
                assert_eq!(buffer_hash(&out.bytes), buffer_hash(&bytes), "{} {:?}", info.id, shape);
                assert_eq!(out.element, info.element);
            }
        }
    }

    /// Alias import shares memory with the buffer, for every pixel type.
    #[test]
    fn test_alias_roundtrip_all_types() {
        for info in PIXEL_TYPES.iter() {
            for shape in SHAPES {
                let bytes = pattern(buffer_len(shape, info.id), 7);
                let desc = BufferDescriptor::from_slice(&bytes);
                let img = unsafe { import_buffer_as_image_view(desc, &spec_for(shape, info.id)) }.unwrap();
                assert_eq!(img.as_ptr(), bytes.as_ptr());
                assert_eq!(img.ownership(), Ownership::Borrowed);

                let view = export_view(&img).unwrap();
                assert_eq!(view.as_ptr(), bytes.as_ptr());
                assert_eq!(image_hash(&img), buffer_hash(&bytes));
            }
        }
    }

    /// Export of an image's bytes imported in place into a fresh image of
    /// the same layout reproduces the original.
    #[test]
    fn test_in_place_roundtrip_all_types() {
        for info in PIXEL_TYPES.iter() {
            for shape in SHAPES {
                let k = components_for(info.id);
                let mut src = ImageHandle::new(shape, info.id, k).unwrap();
                let fill = pattern(src.byte_len(), 3);
                src.bytes_mut().unwrap().copy_from_slice(&fill);

                let exported = export_buffer(&src).unwrap();
                let mut dst = ImageHandle::new(shape, info.id, k).unwrap();
                import_buffer_in_place(&BufferDescriptor::from_slice(&exported.bytes), &mut dst).unwrap();
                assert_eq!(image_hash(&dst), image_hash(&src));
            }
        }
    }

    /// A 5x3 uint16 image needs 30 bytes; 28 are rejected everywhere and
    /// nothing changes.
    #[test]
    fn test_size_mismatch_5x3_uint16() {
        let spec = ImportSpec::new(&[5, 3], PixelId::UInt16);
        let good = pattern(30, 1);
        let short = pattern(28, 1);

        let img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&good), &spec).unwrap();
        assert_eq!(export_buffer(&img).unwrap().len(), 30);

        let err = import_buffer_as_new_image(&BufferDescriptor::from_slice(&short), &spec).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 30, actual: 28 }));

        let err = unsafe { import_buffer_as_image_view(BufferDescriptor::from_slice(&short), &spec) }.unwrap_err();
        assert!(err.is_size_mismatch());

        let mut target = ImageHandle::new(&[5, 3], PixelId::UInt16, 1).unwrap();
        target.bytes_mut().unwrap().copy_from_slice(&good);
        let before = image_hash(&target);
        let err = import_buffer_in_place(&BufferDescriptor::from_slice(&short), &mut target).unwrap_err();
        assert!(err.is_size_mismatch());
        assert_eq!(image_hash(&target), before);
        assert_eq!(short, pattern(28, 1));
    }

    /// Known digest of the ramp 0..30 survives import and export.
    #[test]
    fn test_golden_digest() {
        let bytes: Vec<u8> = (0..30).collect();
        let spec = ImportSpec::new(&[5, 3], PixelId::UInt16);
        let img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes), &spec).unwrap();
        assert_eq!(
            image_hash(&img),
            "f2192584b67da35dfc26f743e5f53bb0376046f899dc6dabd5e7b541ae86c32f"
        );

        let zeros = ImageHandle::new(&[5, 3], PixelId::Int16, 1).unwrap();
        assert_eq!(
            image_hash(&zeros),
            "0679246d6c4216de0daa08e5523fb2674db2b6599c3b72ff946b488a15290b62"
        );
    }

    /// Complex and unknown tags are rejected by every operation.
    #[test]
    fn test_unsupported_types_rejected_everywhere() {
        for pixel_id in [PixelId::ComplexFloat32, PixelId::ComplexFloat64, PixelId::Unknown] {
            let bytes = vec![0u8; 2 * 2 * 16];
            let desc = BufferDescriptor::from_slice(&bytes);
            let spec = ImportSpec::new(&[2, 2], pixel_id);

            assert!(pixel_id.resolve().unwrap_err().is_unsupported_pixel_type());
            assert!(import_buffer_as_new_image(&desc, &spec).unwrap_err().is_unsupported_pixel_type());
            assert!(unsafe { import_buffer_as_image_view(BufferDescriptor::from_slice(&bytes), &spec) }
                .unwrap_err()
                .is_unsupported_pixel_type());

            if pixel_id.is_complex() {
                let mut img = ImageHandle::new(&[2, 2], pixel_id, 1).unwrap();
                assert!(export_buffer(&img).unwrap_err().is_unsupported_pixel_type());
                assert!(export_view(&img).unwrap_err().is_unsupported_pixel_type());
                assert!(import_buffer_in_place(&desc, &mut img).unwrap_err().is_unsupported_pixel_type());
                assert!(adjust_reference_count(&mut img, true).unwrap_err().is_unsupported_pixel_type());
                assert!(img.bytes().iter().all(|&b| b == 0));
            }
        }
    }

    /// Dimensions other than 2 and 3 are rejected.
    #[test]
    fn test_dimension_rejected() {
        for shape in [&[16][..], &[2, 2, 2, 2][..]] {
            let bytes = vec![0u8; 16];
            let desc = BufferDescriptor::from_slice(&bytes);
            let err = import_buffer_as_new_image(&desc, &ImportSpec::new(shape, PixelId::UInt8)).unwrap_err();
            assert!(matches!(err, Error::UnsupportedDimension { dimension } if dimension == shape.len()));

            let img = ImageHandle::new(shape, PixelId::UInt8, 1).unwrap();
            assert!(matches!(export_buffer(&img), Err(Error::UnsupportedDimension { .. })));
        }
    }

    /// A vector image marshals exactly like a scalar image with the
    /// components as a trailing axis.
    #[test]
    fn test_vector_is_trailing_axis() {
        let bytes = pattern(3 * 4 * 2 * 4, 11);
        let desc = BufferDescriptor::from_slice(&bytes);

        let vector = ImportSpec::new(&[3, 4], PixelId::VectorFloat32).with_components(2);
        let scalar = ImportSpec::new(&[3, 4, 2], PixelId::Float32);
        let a = import_buffer_as_new_image(&desc, &vector).unwrap();
        let b = import_buffer_as_new_image(&desc, &scalar).unwrap();
        assert_eq!(a.byte_len(), b.byte_len());
        assert_eq!(image_hash(&a), image_hash(&b));

        let out = export_buffer(&a).unwrap();
        assert_eq!(out.host_shape, vec![4, 3, 2]);
        assert_eq!(export_buffer(&b).unwrap().host_shape, vec![2, 4, 3]);

        for k in 2..5 {
            assert_eq!(
                expected_bytes(&[3, 4], k, 4).unwrap(),
                expected_bytes(&[3, 4, k], 1, 4).unwrap()
            );
        }
    }

    /// Host-array shapes map back to image shapes.
    #[test]
    fn test_host_shape_import() {
        let bytes = pattern(4 * 3 * 2, 0);
        let spec = ImportSpec::from_host_shape(&[4, 3, 2], PixelId::UInt8, true).unwrap();
        let img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes), &spec).unwrap();
        assert_eq!(img.shape(), &[3, 4]);
        assert_eq!(img.components(), 2);
        assert_eq!(img.pixel_id(), PixelId::VectorUInt8);
        assert_eq!(export_buffer(&img).unwrap().host_shape, vec![4, 3, 2]);
    }

    /// Writes through a view are writes to the image, and writes through an
    /// aliasing image reach the buffer.
    #[test]
    fn test_views_alias() {
        let mut img = ImageHandle::new(&[4, 4], PixelId::UInt32, 1).unwrap();
        {
            let mut view = export_view_mut(&mut img).unwrap();
            view[..4].copy_from_slice(&42u32.to_ne_bytes());
        }
        assert_eq!(img.pixels::<u32>().unwrap()[0], 42);

        let mut bytes = vec![0u8; 4 * 4 * 4];
        {
            let desc = BufferDescriptor::from_mut_slice(&mut bytes);
            let mut alias = unsafe { import_buffer_as_image_view(desc, &ImportSpec::new(&[4, 4], PixelId::UInt32)) }.unwrap();
            import_buffer_in_place(&BufferDescriptor::from_slice(img.bytes()), &mut alias).unwrap();
        }
        assert_eq!(buffer_hash(&bytes), image_hash(&img));
    }

    /// Non-contiguous buffers are rejected before anything is copied.
    #[test]
    fn test_non_contiguous_rejected() {
        let bytes = pattern(12, 0);
        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[4, 3], &[1, 4], 1)
            .unwrap();
        let err = import_buffer_as_new_image(&desc, &ImportSpec::new(&[3, 4], PixelId::UInt8)).unwrap_err();
        assert!(matches!(err, Error::NonContiguousBuffer));

        let desc = BufferDescriptor::from_slice(&bytes)
            .with_strides(&[4, 3], &[3, 1], 1)
            .unwrap();
        assert!(import_buffer_as_new_image(&desc, &ImportSpec::new(&[3, 4], PixelId::UInt8)).is_ok());
    }

    /// Reference count never drops below 1.
    #[test]
    fn test_reference_count_floor() {
        let bytes = pattern(6 * 4, 0);
        let desc = BufferDescriptor::from_slice(&bytes);
        let mut img = unsafe { import_buffer_as_image_view(desc, &ImportSpec::new(&[3, 2], PixelId::Float32)) }.unwrap();

        assert_eq!(adjust_reference_count(&mut img, false).unwrap(), 1);
        assert_eq!(adjust_reference_count(&mut img, true).unwrap(), 2);
        assert_eq!(img.ownership(), Ownership::Shared { references: 2 });
        assert_eq!(adjust_reference_count(&mut img, false).unwrap(), 1);
        assert_eq!(adjust_reference_count(&mut img, false).unwrap(), 1);
        assert_eq!(reference_count(&img), 1);
        assert_eq!(img.ownership(), Ownership::Borrowed);
    }

    /// A retained view keeps the pixels after the image is gone, for every
    /// pixel type, and frees them once dropped.
    #[test]
    fn test_retained_view_outlives_image_all_types() {
        for info in PIXEL_TYPES.iter() {
            for shape in SHAPES {
                let bytes = pattern(buffer_len(shape, info.id), 9);
                let mut img = import_buffer_as_new_image(&BufferDescriptor::from_slice(&bytes), &spec_for(shape, info.id)).unwrap();
                assert_eq!(adjust_reference_count(&mut img, true).unwrap(), 2);
                let mut view = take_retained_view(&mut img).unwrap().unwrap();
                let shared = export_shared_view(&img).unwrap();
                assert_eq!(reference_count(&img), 3);
                drop(img);
                drop(shared);

                assert_eq!(view.element(), info.element);
                assert_eq!(buffer_hash(view.as_bytes()), buffer_hash(&bytes), "{} {:?}", info.id, shape);
                view.bytes_mut().unwrap()[0] ^= 0xFF;
                assert_eq!(view[0], bytes[0] ^ 0xFF);
            }
        }
    }

    /// Raw file on disk survives import, export and write-back.
    #[test]
    fn test_raw_file_roundtrip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("frame.raw");
        let output = dir.path().join("frame_out.raw");

        let shape = [16, 8, 2];
        let bytes = pattern(buffer_len(&shape, PixelId::VectorInt16), 5);
        std::fs::write(&input, &bytes).unwrap();

        let loaded = std::fs::read(&input).unwrap();
        let spec = spec_for(&shape, PixelId::VectorInt16);
        for mode in [ImportMode::Copy, ImportMode::Alias] {
            let desc = BufferDescriptor::from_slice(&loaded);
            let img = unsafe { import_buffer(desc, &spec, mode) }.unwrap();
            let exported = export(&img, ExportMode::Copy).unwrap();
            std::fs::write(&output, exported.as_bytes()).unwrap();
            drop(exported);
            drop(img);

            let written = std::fs::read(&output).unwrap();
            assert_eq!(buffer_hash(&written), buffer_hash(&bytes), "{:?}", mode);
        }
    }
}
