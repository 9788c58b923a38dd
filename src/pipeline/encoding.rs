//! Encoding detection for persisted text.
//!
//! Extracted text arrives as Rust `String`s (always UTF-8 in memory), but the
//! selectable-text files are written in whatever encoding best represents the
//! content, as detected by `chardetng`. Detection only wins when the chosen
//! encoding can represent every character; otherwise, and for empty input,
//! the result is UTF-8.

use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

/// Label used whenever detection is inconclusive.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Detect an encoding suitable for persisting `text`. Never fails.
pub fn detect(text: &str) -> &'static Encoding {
    if text.is_empty() {
        return UTF_8;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(text.as_bytes(), true);
    let guess = detector.guess(None, true);

    if guess == UTF_8 || !can_represent(guess, text) {
        return UTF_8;
    }
    debug!("Detected encoding {} for {} bytes", guess.name(), text.len());
    guess
}

/// Lower-case WHATWG label of the encoding detected for `text`.
pub fn detect_label(text: &str) -> String {
    label(detect(text))
}

/// Lower-case WHATWG label of `encoding`, e.g. `utf-8`, `windows-1252`.
pub fn label(encoding: &'static Encoding) -> String {
    encoding.name().to_ascii_lowercase()
}

/// Encode `text` for writing. Encodings that cannot encode (UTF-16 and
/// `replacement`) and unmappable characters fall back to UTF-8.
pub fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    if !can_represent(encoding, text) {
        return text.as_bytes().to_vec();
    }
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

fn can_represent(encoding: &'static Encoding, text: &str) -> bool {
    let (_, used, had_errors) = encoding.encode(text);
    used == encoding && !had_errors
}
