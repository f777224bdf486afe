//! Qualified names and identifier folding.
//!
//! Names are handled as text: `"My Schema".users` is split on dots outside
//! double quotes. Folding is a separate step that follows PostgreSQL's rules
//! for quoted and unquoted identifiers.

/// Splits `name` on `.` characters that are not inside double quotes.
///
/// Parts are trimmed but otherwise returned as written. Blank input yields no
/// parts.
pub fn split_quoted_dot(name: &str) -> Vec<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut part_start = 0;
    let mut chars = name.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' if in_quote && matches!(chars.peek(), Some((_, '"'))) => {
                chars.next();
            }
            '"' => in_quote = !in_quote,
            '.' if !in_quote => {
                parts.push(name[part_start..i].trim());
                part_start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(name[part_start..].trim());
    parts
}

/// Splits a possibly qualified object name into `(schema, name)`.
///
/// Everything before the last part is the schema. Parts keep their quotes;
/// missing parts are empty strings.
pub fn split_qualified_name(name: &str) -> (String, String) {
    let parts = split_quoted_dot(name);
    match parts.as_slice() {
        [] => (String::new(), String::new()),
        [object] => (String::new(), object.to_string()),
        [qualifiers @ .., object] => (qualifiers.join("."), object.to_string()),
    }
}

/// Splits a possibly qualified column reference into `(schema, table, column)`.
///
/// With more than three parts, the leading ones are joined back into the
/// schema.
pub fn split_qualified_column_name(name: &str) -> (String, String, String) {
    let parts = split_quoted_dot(name);
    match parts.as_slice() {
        [] => (String::new(), String::new(), String::new()),
        [column] => (String::new(), String::new(), column.to_string()),
        [table, column] => (String::new(), table.to_string(), column.to_string()),
        [qualifiers @ .., table, column] => {
            (qualifiers.join("."), table.to_string(), column.to_string())
        }
    }
}

/// Folds an identifier.
///
/// A name wrapped in one pair of double quotes keeps its case, with `""`
/// collapsed to `"`. Anything else is lowercased and loses stray quotes.
pub fn normalize_identifier(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        return name[1..name.len() - 1].replace("\"\"", "\"");
    }
    trim_ident_quotes(name).to_lowercase()
}

/// Removes leading and trailing double quotes without folding case.
pub fn trim_ident_quotes(name: &str) -> &str {
    name.trim().trim_matches('"')
}
