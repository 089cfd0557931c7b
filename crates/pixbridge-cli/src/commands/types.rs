//! Pixel type registry listing.

use anyhow::Result;
use pixbridge_core::{Error, PixelId};
use tracing::trace;

/// Prints every pixel type tag and how it marshals.
pub fn run(verbose: bool) -> Result<()> {
    trace!("types::run");

    println!("{:<16} {:>4}  {:<8} {:>5}  {:<6} {}", "TYPE", "RAW", "ELEMENT", "BYTES", "VECTOR", "TYPESTR");
    for id in PixelId::ALL {
        match id.resolve() {
            Ok(info) => println!(
                "{:<16} {:>4}  {:<8} {:>5}  {:<6} {}",
                id.to_string(),
                id.raw(),
                info.element.name(),
                info.element.byte_width(),
                if info.is_vector { "yes" } else { "no" },
                info.element.typestr(),
            ),
            Err(Error::UnsupportedPixelType { reason, .. }) => {
                println!("{:<16} {:>4}  unsupported: {}", id.to_string(), id.raw(), reason);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if verbose {
        let supported = PixelId::ALL.iter().filter(|id| id.resolve().is_ok()).count();
        println!();
        println!("{} of {} pixel types can be marshaled", supported, PixelId::ALL.len());
    }
    Ok(())
}
