//! Quote-aware lexical scanners over raw SQL text.
//!
//! These run on flat text spans taken from the token stream, so they carry a
//! small copy of the lexical rules (quotes, comments, dollar quoting) instead
//! of going back to the grammar. Every scanner is driven by the same
//! [`ScanMode`] state machine.

mod elements;
mod literal;
mod params;

pub use crate::identifier::{
    normalize_identifier, split_qualified_column_name, split_qualified_name, split_quoted_dot,
    trim_ident_quotes,
};
pub use elements::{
    comments_by_column, element_column_name, extract_create_table_body,
    is_table_constraint_keyword, primary_key_columns, split_table_elements, TableElement,
};
pub use literal::{decode_dollar_quoted, decode_string_literal};
pub use params::extract_parameters;

/// The lexical region a scanner is currently in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanMode {
    Normal,
    /// `-- ...` up to the end of the line.
    LineComment,
    /// `/* ... */`, not nested.
    BlockComment,
    /// `'...'` with `''` as an escaped quote.
    SingleQuoted,
    /// `"..."` with `""` as an escaped quote.
    DoubleQuoted,
    /// `$tag$ ... $tag$`; the tag may be empty.
    DollarQuoted(String),
}

/// The outcome of a single scanner step: the mode to continue in and how many
/// characters the step consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub next: ScanMode,
    pub len: usize,
}

impl Transition {
    fn to(next: ScanMode, len: usize) -> Self {
        Self { next, len }
    }
}

impl ScanMode {
    /// Consumes input starting at `chars[i]`.
    ///
    /// Leaving a line comment consumes nothing: the terminating newline
    /// belongs to the surrounding code.
    pub(crate) fn step(&self, chars: &[char], i: usize) -> Transition {
        match self {
            ScanMode::Normal => Self::step_normal(chars, i),
            ScanMode::LineComment => match chars[i] {
                '\n' | '\r' => Transition::to(ScanMode::Normal, 0),
                _ => Transition::to(ScanMode::LineComment, 1),
            },
            ScanMode::BlockComment => {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    Transition::to(ScanMode::Normal, 2)
                } else {
                    Transition::to(ScanMode::BlockComment, 1)
                }
            }
            ScanMode::SingleQuoted => Self::step_quoted(chars, i, '\'', ScanMode::SingleQuoted),
            ScanMode::DoubleQuoted => Self::step_quoted(chars, i, '"', ScanMode::DoubleQuoted),
            ScanMode::DollarQuoted(tag) => {
                if chars[i] == '$' && has_dollar_terminator(chars, i, tag) {
                    Transition::to(ScanMode::Normal, tag.chars().count() + 2)
                } else {
                    Transition::to(self.clone(), 1)
                }
            }
        }
    }

    fn step_normal(chars: &[char], i: usize) -> Transition {
        let next = chars.get(i + 1).copied();
        match (chars[i], next) {
            ('-', Some('-')) => Transition::to(ScanMode::LineComment, 2),
            ('/', Some('*')) => Transition::to(ScanMode::BlockComment, 2),
            ('\'', _) => Transition::to(ScanMode::SingleQuoted, 1),
            ('"', _) => Transition::to(ScanMode::DoubleQuoted, 1),
            ('$', _) => match parse_dollar_tag(chars, i) {
                Some(tag) => {
                    let len = tag.chars().count() + 2;
                    Transition::to(ScanMode::DollarQuoted(tag), len)
                }
                None => Transition::to(ScanMode::Normal, 1),
            },
            _ => Transition::to(ScanMode::Normal, 1),
        }
    }

    fn step_quoted(chars: &[char], i: usize, quote: char, mode: ScanMode) -> Transition {
        if chars[i] != quote {
            return Transition::to(mode, 1);
        }
        if chars.get(i + 1) == Some(&quote) {
            Transition::to(mode, 2)
        } else {
            Transition::to(ScanMode::Normal, 1)
        }
    }

    /// Whether text in this mode is copied verbatim and never interpreted.
    pub(crate) fn is_quoted(&self) -> bool {
        matches!(
            self,
            ScanMode::SingleQuoted | ScanMode::DoubleQuoted | ScanMode::DollarQuoted(_)
        )
    }
}

/// Reads the tag of a dollar-quote opener starting at `chars[start] == '$'`.
///
/// The tag follows identifier rules without a leading digit, so positional
/// parameters like `$1` are never mistaken for an opener.
pub(crate) fn parse_dollar_tag(chars: &[char], start: usize) -> Option<String> {
    if chars.get(start) != Some(&'$') {
        return None;
    }
    let mut tag = String::new();
    for (offset, &c) in chars[start + 1..].iter().enumerate() {
        if c == '$' {
            return Some(tag);
        }
        let valid = c == '_' || c.is_alphabetic() || (offset > 0 && c.is_ascii_digit());
        if !valid {
            return None;
        }
        tag.push(c);
    }
    None
}

/// Whether `$tag$` starts at `chars[i]`.
pub(crate) fn has_dollar_terminator(chars: &[char], i: usize, tag: &str) -> bool {
    let mut expected = std::iter::once('$').chain(tag.chars()).chain(std::iter::once('$'));
    let mut pos = i;
    expected.all(|c| {
        let matched = chars.get(pos) == Some(&c);
        pos += 1;
        matched
    })
}
