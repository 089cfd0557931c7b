//! Buffer size computation.

use crate::SizeArgs;
use anyhow::Result;
use tracing::{info, trace};

/// Prints the buffer an image layout requires.
pub fn run(args: SizeArgs, verbose: bool) -> Result<()> {
    trace!(shape = %args.layout.shape, pixel_type = %args.layout.pixel_type, "size::run");
    let layout = super::resolve_layout(&args.layout)?;
    info!(bytes = layout.byte_len, element = %layout.element, "Resolved layout");

    println!("Pixel type:      {}", layout.pixel_id);
    println!("Element:         {} ({} bytes)", layout.element, layout.element.byte_width());
    println!("Components:      {}", layout.components);
    println!("Image shape:     {}", super::format_dims(&layout.shape));
    println!("Effective shape: {}", super::format_dims(&layout.effective_shape()));
    println!("Host shape:      {}", super::format_dims(&layout.host_shape()));
    println!("Bytes:           {}", layout.byte_len);

    if verbose {
        println!("Elements:        {}", layout.element_count());
        println!("Typestr:         {}", layout.element.typestr());
        println!("Size:            {}", super::format_size(layout.byte_len as u64));
    }
    Ok(())
}
