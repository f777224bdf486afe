//! Decoding of SQL string literals into their text value.

/// Decodes the raw text of a string literal into its value.
///
/// Recognizes dollar-quoted, `E'...'`, `N'...'`, `U&'...'` and plain
/// single-quoted literals. `NULL` and blank input decode to an empty string;
/// anything unrecognized is returned trimmed.
pub fn decode_string_literal(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NULL") {
        return String::new();
    }

    if trimmed.starts_with('$') {
        if let Some(value) = decode_dollar_quoted(trimmed) {
            return value.to_owned();
        }
    }
    if has_prefix_ignore_case(trimmed, "E'") || has_prefix_ignore_case(trimmed, "N'") {
        if let Some(value) = unquote_single(&trimmed[1..]) {
            return decode_backslash_escapes(&value);
        }
    }
    if has_prefix_ignore_case(trimmed, "U&'") {
        if let Some(value) = unquote_single(&trimmed[2..]) {
            return value;
        }
    }
    if let Some(value) = unquote_single(trimmed) {
        return value;
    }
    trimmed.to_owned()
}

/// Returns the body of a `$tag$body$tag$` literal.
///
/// The opening delimiter runs up to the second `$`; the literal must end
/// with the same delimiter.
pub fn decode_dollar_quoted(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix('$')?;
    let tag_end = rest.find('$')?;
    let delimiter = &raw[..tag_end + 2];
    if raw.len() < delimiter.len() * 2 || !raw.ends_with(delimiter) {
        return None;
    }
    Some(&raw[delimiter.len()..raw.len() - delimiter.len()])
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Strips one pair of single quotes and collapses `''` into `'`.
fn unquote_single(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

fn decode_backslash_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.peek() {
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        out.push(decoded);
    }
    out
}
