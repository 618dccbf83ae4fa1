//! Repair of back-to-back JSON objects into a single JSON array.
//!
//! The graph engine writes event objects with no separator between them
//! (`{"event":...}{"event":...}`). Two strategies turn that text into an
//! array document: a pattern rewrite that matches the known boundary shape,
//! and a brace-depth scanner that finds object boundaries structurally.

use std::sync::LazyLock;

use regex::Regex;
use trellis_core::error::DecodeError;

/// A closing brace directly followed by an object whose first key is `event`.
static EVENT_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\}\s*\{\s*"event""#).expect("event boundary pattern is a valid regex")
});

/// Returns true if the chunk already looks like a JSON array.
pub fn is_array_shaped(chunk: &str) -> bool {
    chunk.trim_start().starts_with('[')
}

/// Insert a comma at every event object boundary and wrap the text in brackets.
///
/// A chunk that is already array-shaped is returned unchanged. The result is
/// not guaranteed to be valid JSON; anything beyond the known concatenation
/// pattern is left for the parser to reject.
pub fn pattern_repair(chunk: &str) -> String {
    if is_array_shaped(chunk) {
        return chunk.to_string();
    }
    let joined = EVENT_BOUNDARY.replace_all(chunk, r#"},{"event""#);
    format!("[{joined}]")
}

/// Split text into its top-level JSON object slices.
///
/// Braces inside string literals are ignored. Whitespace, commas and array
/// brackets between objects are tolerated; any other text outside an object
/// is rejected, as is an object left open at the end of the input.
pub fn split_objects(text: &str) -> Result<Vec<&str>, DecodeError> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'{' => {
                if depth == 0 {
                    start = offset;
                }
                depth += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Err(DecodeError::UnexpectedText { offset });
                }
                depth -= 1;
                if depth == 0 {
                    objects.push(&text[start..=offset]);
                }
            }
            b'"' if depth > 0 => in_string = true,
            b',' | b'[' | b']' if depth == 0 => {}
            b if depth == 0 && !b.is_ascii_whitespace() => {
                return Err(DecodeError::UnexpectedText { offset });
            }
            _ => {}
        }
    }

    if depth > 0 || in_string {
        return Err(DecodeError::UnbalancedObject { offset: start });
    }
    Ok(objects)
}

/// Rebuild the chunk as a JSON array from its brace-delimited objects.
pub fn brace_depth_repair(chunk: &str) -> Result<String, DecodeError> {
    let objects = split_objects(chunk)?;
    Ok(format!("[{}]", objects.join(",")))
}
