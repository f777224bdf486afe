//! `CREATE TABLE` element scanning.
//!
//! Splits the parenthesized body of a `CREATE TABLE` into column and
//! constraint definitions, keeping the `--` comments written right before
//! each definition.

use hashbrown::{HashMap, HashSet};

use super::ScanMode;
use crate::identifier::{normalize_identifier, trim_ident_quotes};

/// Keywords that open a table-level constraint rather than a column.
const TABLE_CONSTRAINT_KEYWORDS: [&str; 7] = [
    "CONSTRAINT",
    "PRIMARY",
    "UNIQUE",
    "FOREIGN",
    "CHECK",
    "EXCLUDE",
    "LIKE",
];

/// One comma-separated definition inside a `CREATE TABLE` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableElement {
    /// The definition with comments removed and surrounding whitespace trimmed.
    pub text: String,
    /// Line comments seen before any content of this definition.
    pub preceding_comments: Vec<String>,
}

/// Returns the text between the first top-level `(` and its matching `)`.
pub fn extract_create_table_body(sql: &str) -> Option<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut mode = ScanMode::Normal;
    let mut depth = 0usize;
    let mut open = None;
    let mut i = 0;
    while i < chars.len() {
        let step = mode.step(&chars, i);
        if mode == ScanMode::Normal && step.next == ScanMode::Normal {
            match chars[i] {
                '(' => {
                    if open.is_none() {
                        open = Some(i);
                    }
                    depth += 1;
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        let start = open.map_or(0, |o| o + 1);
                        return Some(chars[start..i].iter().collect());
                    }
                }
                _ => {}
            }
        }
        i += step.len;
        mode = step.next;
    }
    None
}

/// Splits a table body on top-level commas.
///
/// Commas inside parentheses, quotes or comments do not split. Block comments
/// are dropped from the element text. A line comment is attached to the next
/// element when nothing but whitespace has been seen for it yet.
pub fn split_table_elements(body: &str) -> Vec<TableElement> {
    let chars: Vec<char> = body.chars().collect();
    let mut splitter = ElementSplitter::default();
    let mut mode = ScanMode::Normal;
    let mut i = 0;
    while i < chars.len() {
        let step = mode.step(&chars, i);
        match (&mode, &step.next) {
            (ScanMode::Normal, ScanMode::LineComment) => splitter.comment_start = i + step.len,
            (ScanMode::LineComment, ScanMode::Normal) => {
                splitter.finish_comment(&chars[splitter.comment_start..i])
            }
            (ScanMode::Normal, ScanMode::Normal) => splitter.code(chars[i]),
            (current, next) if current.is_quoted() || next.is_quoted() => {
                splitter.quoted(&chars[i..i + step.len])
            }
            _ => {}
        }
        i += step.len;
        mode = step.next;
    }
    if mode == ScanMode::LineComment {
        splitter.finish_comment(&chars[splitter.comment_start..]);
    }
    splitter.finish()
}

#[derive(Debug, Default)]
struct ElementSplitter {
    elements: Vec<TableElement>,
    current: String,
    pending_comments: Vec<String>,
    depth: usize,
    has_content: bool,
    comment_start: usize,
}

impl ElementSplitter {
    fn code(&mut self, c: char) {
        match c {
            ',' if self.depth == 0 => {
                self.flush();
                return;
            }
            '(' => self.depth += 1,
            ')' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.current.push(c);
        if !c.is_whitespace() {
            self.has_content = true;
        }
    }

    fn quoted(&mut self, text: &[char]) {
        self.current.extend(text);
        self.has_content = true;
    }

    fn finish_comment(&mut self, text: &[char]) {
        if self.has_content {
            return;
        }
        let comment: String = text.iter().collect();
        let comment = comment.trim();
        if !comment.is_empty() {
            self.pending_comments.push(comment.to_owned());
        }
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.elements.push(TableElement {
                text: text.to_owned(),
                preceding_comments: std::mem::take(&mut self.pending_comments),
            });
        } else {
            self.pending_comments.clear();
        }
        self.current.clear();
        self.has_content = false;
    }

    fn finish(mut self) -> Vec<TableElement> {
        self.flush();
        self.elements
    }
}

/// Whether `token` opens a table-level constraint (`CONSTRAINT`, `PRIMARY`,
/// `UNIQUE`, ...).
pub fn is_table_constraint_keyword(token: &str) -> bool {
    TABLE_CONSTRAINT_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(token))
}

/// Returns the folded column name an element defines, or `None` for table
/// constraints and unreadable definitions.
pub fn element_column_name(element: &str) -> Option<String> {
    let token = read_leading_identifier(element.trim_start())?;
    if is_table_constraint_keyword(trim_ident_quotes(token)) {
        return None;
    }
    let name = normalize_identifier(token);
    (!name.is_empty()).then_some(name)
}

/// Reads the first identifier of `text`: a double-quoted name (with `""`
/// escapes, quotes kept) or a run of characters up to whitespace, a comma or
/// a parenthesis.
fn read_leading_identifier(text: &str) -> Option<&str> {
    if text.starts_with('"') {
        let mut chars = text.char_indices().skip(1).peekable();
        while let Some((i, c)) = chars.next() {
            if c != '"' {
                continue;
            }
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                continue;
            }
            return Some(&text[..=i]);
        }
        return None;
    }
    let end = text
        .find(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')'))
        .unwrap_or(text.len());
    (end > 0).then(|| &text[..end])
}

/// Maps each column of a `CREATE TABLE` statement to the line comments
/// written before its definition.
///
/// Columns without comments are left out.
pub fn comments_by_column(create_table_sql: &str) -> HashMap<String, Vec<String>> {
    let mut comments = HashMap::new();
    let Some(body) = extract_create_table_body(create_table_sql) else {
        return comments;
    };
    for element in split_table_elements(&body) {
        if element.preceding_comments.is_empty() {
            continue;
        }
        if let Some(column) = element_column_name(&element.text) {
            comments
                .entry(column)
                .or_insert_with(Vec::new)
                .extend(element.preceding_comments);
        }
    }
    comments
}

/// Collects the folded names of the columns listed in table-level
/// `PRIMARY KEY (...)` constraints.
pub fn primary_key_columns(elements: &[TableElement]) -> HashSet<String> {
    let mut columns = HashSet::new();
    for element in elements {
        let Some(list) = primary_key_list(&element.text) else {
            continue;
        };
        for column in split_table_elements(list) {
            if let Some(name) = read_leading_identifier(&column.text) {
                columns.insert(normalize_identifier(name));
            }
        }
    }
    columns
}

/// Returns the text inside the parentheses of a `[CONSTRAINT name] PRIMARY
/// KEY (...)` element.
fn primary_key_list(element: &str) -> Option<&str> {
    let mut rest = element.trim_start();
    let first = read_leading_identifier(rest)?;
    if first.eq_ignore_ascii_case("CONSTRAINT") {
        rest = rest[first.len()..].trim_start();
        let name = read_leading_identifier(rest)?;
        rest = rest[name.len()..].trim_start();
    }
    for keyword in ["PRIMARY", "KEY"] {
        let word = read_leading_identifier(rest)?;
        if !word.eq_ignore_ascii_case(keyword) {
            return None;
        }
        rest = rest[word.len()..].trim_start();
    }
    let inner = rest.strip_prefix('(')?;
    let close = inner.rfind(')')?;
    Some(&inner[..close])
}
