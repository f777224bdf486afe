//! Recovery for utility statements the grammar rejects but PostgreSQL accepts.
//!
//! Some reserved words (`WARNING`, `NOTICE`, ...) cannot be reached from the
//! grammar's `SET` value productions, so `SET client_min_messages = warning`
//! reports a syntax error on the value. Such statements are accepted as
//! unstructured results, but only when the statement has exactly the known
//! shape and the error sits exactly on the value.

use crate::error::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UtilityCommand {
    Set,
    Show,
    Reset,
}

const UTILITY_COMMANDS: [(&str, UtilityCommand); 3] = [
    ("SET", UtilityCommand::Set),
    ("SHOW", UtilityCommand::Show),
    ("RESET", UtilityCommand::Reset),
];

/// A known gap: values of `command` the grammar cannot parse.
struct RecoveryRule {
    command: UtilityCommand,
    values: &'static [&'static str],
}

const RECOVERY_RULES: &[RecoveryRule] = &[RecoveryRule {
    command: UtilityCommand::Set,
    values: &["WARNING", "NOTICE", "DEBUG", "INFO", "EXCEPTION", "ERROR"],
}];

const SET_SCOPES: [&str; 2] = ["SESSION", "LOCAL"];

/// The value token of a utility statement and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueToken<'a> {
    text: &'a str,
    offset: usize,
}

/// Whether `sql` is a utility statement whose syntax errors stem only from
/// a known grammar gap.
pub fn should_recover(sql: &str, errors: &[SyntaxError]) -> bool {
    let Some(command) = detect_utility_command_prefix(sql) else {
        return false;
    };
    if !is_single_statement_utility_candidate(sql) {
        return false;
    }
    let Some(rule) = RECOVERY_RULES.iter().find(|rule| rule.command == command) else {
        return false;
    };

    let trimmed = sql.trim();
    let value = match command {
        UtilityCommand::Set => parse_set_shape(trimmed),
        UtilityCommand::Show | UtilityCommand::Reset => None,
    };
    let Some(value) = value else {
        return false;
    };
    if !rule
        .values
        .iter()
        .any(|known| known.eq_ignore_ascii_case(value.text))
    {
        return false;
    }

    let (line, column) = line_and_column_at_byte_offset(trimmed, value.offset);
    let recovered = has_syntax_error_at_token(errors, line, column, value.text.len());
    if recovered {
        tracing::debug!(line, column, value = value.text, "recovering utility statement");
    }
    recovered
}

/// Matches the leading command word without allocating.
///
/// The word must be followed by a non-letter, so `SETTINGS` is not `SET`.
fn detect_utility_command_prefix(sql: &str) -> Option<UtilityCommand> {
    let bytes = sql.trim_start().as_bytes();
    let word_len = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    let word = &bytes[..word_len];
    UTILITY_COMMANDS
        .iter()
        .find(|(name, _)| word.eq_ignore_ascii_case(name.as_bytes()))
        .map(|&(_, command)| command)
}

/// One statement at most: a single trailing `;` is allowed.
fn is_single_statement_utility_candidate(sql: &str) -> bool {
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim();
    !body.is_empty() && !body.contains(';')
}

/// Parses `SET [SESSION|LOCAL] name (=|TO) value [;]` and returns the value.
fn parse_set_shape(sql: &str) -> Option<ValueToken<'_>> {
    let mut words = WordCursor::new(sql);
    if !words.next_word()?.eq_ignore_ascii_case("SET") {
        return None;
    }

    let checkpoint = words.pos;
    match words.next_word() {
        Some(word) if SET_SCOPES.iter().any(|s| s.eq_ignore_ascii_case(word)) => {}
        _ => words.pos = checkpoint,
    }

    words.next_word()?;

    words.skip_whitespace();
    if !words.eat('=') {
        let assign = words.next_word()?;
        if !assign.eq_ignore_ascii_case("TO") {
            return None;
        }
    }

    words.skip_whitespace();
    let offset = words.pos;
    let text = words.next_word()?;

    words.skip_whitespace();
    words.eat(';');
    words.skip_whitespace();
    words.at_end().then_some(ValueToken { text, offset })
}

/// A hand-written tokenizer over words made of ASCII letters, digits, `_`
/// and `.`.
struct WordCursor<'a> {
    sql: &'a str,
    pos: usize,
}

impl<'a> WordCursor<'a> {
    fn new(sql: &'a str) -> Self {
        Self { sql, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.sql.as_bytes()[self.pos..];
        self.pos += rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
    }

    fn next_word(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = &self.sql.as_bytes()[start..];
        let len = rest
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
            .count();
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&self.sql[start..self.pos])
    }

    fn eat(&mut self, c: char) -> bool {
        if self.sql[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.sql.len()
    }
}

/// Converts a byte offset of `sql` into a 1-based line and a 0-based
/// column counted in characters.
pub(crate) fn line_and_column_at_byte_offset(sql: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 0;
    for (i, c) in sql.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Whether an error sits on `line` within `[column, column + token_len]`.
fn has_syntax_error_at_token(
    errors: &[SyntaxError],
    line: usize,
    column: usize,
    token_len: usize,
) -> bool {
    let max_column = column + token_len.max(1);
    errors
        .iter()
        .any(|e| e.line == line && (column..=max_column).contains(&e.column))
}
