//! Raw buffer round trip.
//!
//! Imports a raw file as an image, exports the image by copy and writes the
//! result, failing if a single byte changed on the way.

use crate::RoundtripArgs;
use anyhow::{Context, Result, bail};
use pixbridge_core::{
    BufferDescriptor, ExportedBuffer, ImportMode, ImportSpec, export_buffer, import_buffer,
};
use tracing::{debug, info, trace};

pub fn run(args: RoundtripArgs, verbose: bool) -> Result<()> {
    trace!(input = %args.input.display(), output = %args.output.display(), alias = args.alias, "roundtrip::run");
    let layout = super::resolve_layout(&args.layout)?;
    let bytes = super::load_raw(&args.input)?;
    super::ensure_len(&layout, bytes.len(), &args.input)?;

    let mode = if args.alias { ImportMode::Alias } else { ImportMode::Copy };
    let spec = ImportSpec::new(&layout.shape, layout.pixel_id).with_components(layout.components);
    info!(mode = ?mode, bytes = bytes.len(), pixel_type = %layout.pixel_id, "Importing buffer");

    let exported = roundtrip(&bytes, &spec, mode)?;
    debug!(host_shape = ?exported.host_shape, "Exported buffer");

    if exported.bytes != bytes {
        bail!("Round trip changed the buffer: {}", args.input.display());
    }
    super::save_raw(&args.output, &exported.bytes)?;

    println!(
        "{} -> {} ({}, {} {})",
        args.input.display(),
        args.output.display(),
        super::format_size(exported.len() as u64),
        args.layout.shape,
        layout.pixel_id
    );
    if verbose {
        println!("  Import:     {:?}", mode);
        println!("  Host shape: {}", super::format_dims(&exported.host_shape));
        println!("  Element:    {} ({})", exported.element, exported.element.typestr());
    }
    Ok(())
}

/// Imports `bytes` and exports the resulting image by copy.
fn roundtrip(bytes: &[u8], spec: &ImportSpec, mode: ImportMode) -> Result<ExportedBuffer> {
    let desc = BufferDescriptor::from_slice(bytes);
    // SAFETY: `bytes` outlives the image, which is dropped before returning,
    // and nothing writes to `bytes` meanwhile.
    let image = unsafe { import_buffer(desc, spec, mode) }.context("Import failed")?;
    let exported = export_buffer(&image).context("Export failed")?;
    drop(image);
    Ok(exported)
}
