//! CLI command implementations

pub mod check;
pub mod roundtrip;
pub mod size;
pub mod types;

use crate::LayoutArgs;
use anyhow::{Context, Result, bail};
use pixbridge_core::{BufferLayout, PixelId};
use std::fmt;
use std::path::Path;

/// Image shape parsed from the command line, fastest axis first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape(pub Vec<usize>);

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_dims(&self.0))
    }
}

/// Parses `5x3`, `64x64x8` or `5,3`.
pub fn parse_shape(s: &str) -> std::result::Result<Shape, String> {
    let sep = if s.contains(',') { ',' } else { 'x' };
    let dims = s
        .split(sep)
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid extent '{}': {}", part.trim(), e))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if dims.is_empty() {
        return Err("shape has no axes".into());
    }
    Ok(Shape(dims))
}

/// Parses a pixel type name (case-insensitive).
pub fn parse_pixel_type(s: &str) -> std::result::Result<PixelId, String> {
    PixelId::from_name(s).ok_or_else(|| format!("unknown pixel type '{}' (see `pixbridge types`)", s))
}

/// Resolves command-line layout arguments.
pub fn resolve_layout(args: &LayoutArgs) -> Result<BufferLayout> {
    BufferLayout::resolve(&args.shape.0, args.pixel_type, args.components)
        .with_context(|| format!("Invalid layout {} {}", args.shape, args.pixel_type))
}

/// Load raw buffer from path
pub fn load_raw(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save raw buffer to path
pub fn save_raw(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to save: {}", path.display()))
}

/// Formats dimensions as `5x3`.
pub fn format_dims(dims: &[usize]) -> String {
    dims.iter().map(usize::to_string).collect::<Vec<_>>().join("x")
}

/// Format buffer size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Fails unless `actual` matches the layout's byte count.
pub fn ensure_len(layout: &BufferLayout, actual: usize, path: &Path) -> Result<()> {
    if let Err(e) = layout.check_len(actual) {
        bail!("{}: {}", path.display(), e);
    }
    Ok(())
}
