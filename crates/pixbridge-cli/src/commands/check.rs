//! Raw buffer validation.
//!
//! Checks that each file's length matches the image layout exactly.

use crate::CheckArgs;
use anyhow::{Context, Result, bail};
use tracing::{debug, info, trace};

/// Validates every input file. Fails if any file does not match.
pub fn run(args: CheckArgs, verbose: bool) -> Result<()> {
    trace!(files = args.input.len(), shape = %args.layout.shape, "check::run");
    let layout = super::resolve_layout(&args.layout)?;

    let mut failed = 0usize;
    for path in &args.input {
        let len = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat: {}", path.display()))?
            .len();
        let len = usize::try_from(len).with_context(|| format!("{}: file too large", path.display()))?;
        debug!(path = %path.display(), bytes = len, "Checking buffer");

        match super::ensure_len(&layout, len, path) {
            Ok(()) => {
                if verbose {
                    println!("OK    {} ({})", path.display(), super::format_size(len as u64));
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL  {:#}", e);
            }
        }
    }

    info!(checked = args.input.len(), failed, "Check complete");
    if failed > 0 {
        bail!("{} of {} buffers do not match {} {}", failed, args.input.len(), args.layout.shape, layout.pixel_id);
    }
    if !verbose {
        println!("{} buffer(s) match {} {}", args.input.len(), args.layout.shape, layout.pixel_id);
    }
    Ok(())
}
