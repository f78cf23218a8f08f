//! Unicode utilities
//!
//! Narrow strings are UTF-8, wide strings are UTF-16 code units.

/// Wide (UTF-16) string storage
pub type WideString = Vec<u16>;

/// Replacement for unpaired surrogates when narrowing
const REPLACEMENT: char = '\u{FFFD}';

/// Transcode a UTF-8 string into UTF-16 code units
#[inline]
pub fn narrow_to_wide(s: &str) -> WideString {
    s.encode_utf16().collect()
}

/// Transcode UTF-16 code units into UTF-8
///
/// Unpaired surrogates are replaced with U+FFFD.
pub fn wide_to_narrow(w: &[u16]) -> String {
    let mut out = String::with_capacity(w.len());
    for c in char::decode_utf16(w.iter().copied()) {
        out.push(c.unwrap_or(REPLACEMENT));
    }
    out
}
