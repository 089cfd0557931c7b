//! Content hashes for pixel buffers.
//!
//! Round-trip tests compare SHA256 digests of pixel bytes, so a failure
//! reports two short strings instead of two large buffers.

use pixbridge_core::ImageHandle;
use sha2::{Digest, Sha256};

/// SHA256 of a byte buffer, lowercase hex.
pub fn buffer_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA256 of an image's pixel bytes.
pub fn image_hash(image: &ImageHandle) -> String {
    buffer_hash(image.bytes())
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut s = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            s.push(HEX_CHARS[(b >> 4) as usize] as char);
            s.push(HEX_CHARS[(b & 0xf) as usize] as char);
        }
        s
    }
}
