//! Field cleaning for raw API payloads
//!
//! The search API hands back text exactly as it was scraped: embedded
//! newlines, runs of spaces, emoji, and `[deleted]`/`[removed]` placeholders
//! where the content was taken down.

/// Placeholders the API substitutes for taken-down content
pub const REMOVAL_MARKERS: [&str; 2] = ["[deleted]", "[removed]"];

/// Normalizes free text for tabular output
///
/// Newlines become spaces, non-ASCII characters are dropped, removal markers
/// are stripped, runs of spaces collapse to one, and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    let mut ascii: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| c.is_ascii())
        .collect();

    for marker in REMOVAL_MARKERS {
        ascii = ascii.replace(marker, "");
    }

    collapse_spaces(&ascii)
}

/// Collapses runs of spaces and trims surrounding whitespace
pub fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;

    for c in text.trim().chars() {
        if c == ' ' {
            if !previous_space {
                out.push(c);
            }
            previous_space = true;
        } else {
            out.push(c);
            previous_space = false;
        }
    }

    out
}

/// Returns the value unless it is exactly a removal marker
pub fn without_marker(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !REMOVAL_MARKERS.contains(v))
        .map(str::to_string)
}

/// Strips the `t1_`/`t2_`/`t3_`/`t5_` kind prefix from a fullname
///
/// Values without a kind prefix are returned unchanged.
pub fn strip_kind_prefix(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() > 3 && bytes[0] == b't' && bytes[1].is_ascii_digit() && bytes[2] == b'_' {
        &value[3..]
    } else {
        value
    }
}
