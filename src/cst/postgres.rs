//! The default grammar, built on [`sqlparser`]'s PostgreSQL dialect.

use sqlparser::dialect::{Dialect, PostgreSqlDialect};
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, TokenizerError, Word};

use super::{
    Channel, CstToken, ErrorListener, Grammar, ParseTree, StatementBlock, StatementNode,
    TokenStream,
};

/// Keywords after which a `?` starts an operand rather than applying the
/// jsonb key-exists operator.
const OPERAND_KEYWORDS: &[Keyword] = &[
    Keyword::ALL,
    Keyword::AND,
    Keyword::ANY,
    Keyword::BETWEEN,
    Keyword::BY,
    Keyword::CASE,
    Keyword::DEFAULT,
    Keyword::ELSE,
    Keyword::FETCH,
    Keyword::HAVING,
    Keyword::ILIKE,
    Keyword::IN,
    Keyword::IS,
    Keyword::LIKE,
    Keyword::LIMIT,
    Keyword::NOT,
    Keyword::OFFSET,
    Keyword::ON,
    Keyword::OR,
    Keyword::RETURNING,
    Keyword::SELECT,
    Keyword::SET,
    Keyword::SOME,
    Keyword::THEN,
    Keyword::VALUES,
    Keyword::WHEN,
    Keyword::WHERE,
];

/// Parses PostgreSQL with [`sqlparser`].
///
/// The input is tokenized once and split at top-level `;` tokens. Each
/// statement is then parsed on its own, so a malformed statement still
/// yields a node and never hides the statements around it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresGrammar;

impl Grammar for PostgresGrammar {
    fn parse(&self, sql: &str, listener: &mut dyn ErrorListener) -> ParseTree {
        let dialect = PostgreSqlDialect {};
        let mut raw = match Tokenizer::new(&dialect, sql).tokenize_with_location() {
            Ok(raw) => raw,
            Err(e) => return parse_before_lexer_error(&dialect, sql, e, listener),
        };
        rewrite_placeholders(&mut raw);

        let tokens = TokenStream::new(sql.to_owned(), locate_tokens(sql, &raw));
        let statements = split_statements(&tokens)
            .iter()
            .map(|span| parse_statement(&dialect, &raw, &tokens, span, listener))
            .collect();

        ParseTree {
            tokens,
            root: Some(StatementBlock { statements }),
        }
    }
}

/// Keeps the statements in front of a tokenizer error. Everything from the
/// statement holding the error to the end of the input becomes one failed
/// statement, and the error is reported against it.
fn parse_before_lexer_error(
    dialect: &dyn Dialect,
    sql: &str,
    error: TokenizerError,
    listener: &mut dyn ErrorListener,
) -> ParseTree {
    let (line, column) = line_and_column(error.location);
    let offset = OffsetCursor::new(sql).offset_of(error.location);
    let prefix = &sql[..offset];
    let mut raw = match Tokenizer::new(dialect, prefix).tokenize_with_location() {
        Ok(raw) => raw,
        Err(_) => {
            listener.syntax_error(line, column, &error.message, None);
            return ParseTree {
                tokens: TokenStream::new(sql.to_owned(), Vec::new()),
                root: None,
            };
        }
    };
    rewrite_placeholders(&mut raw);

    let mut located = locate_tokens(prefix, &raw);
    let rest = sql[offset..].trim_end();
    if !rest.is_empty() {
        located.push(CstToken {
            token: Token::Word(Word {
                value: rest.to_owned(),
                quote_style: None,
                keyword: Keyword::NoKeyword,
            }),
            index: located.len(),
            line,
            column,
            start: offset,
            end: offset + rest.len(),
            channel: Channel::Default,
        });
    }
    let tokens = TokenStream::new(sql.to_owned(), located);

    let mut spans = split_statements(&tokens);
    let failed = spans.last().filter(|span| span.terminator.is_none()).copied();
    if failed.is_some() {
        spans.pop();
    }
    let mut statements: Vec<StatementNode> = spans
        .iter()
        .map(|span| parse_statement(dialect, &raw, &tokens, span, listener))
        .collect();

    tracing::trace!(line, column, error = %error.message, "input stops tokenizing");
    listener.syntax_error(
        line,
        column,
        &error.message,
        failed.and_then(|span| tokens.get(span.last)),
    );
    if let Some(span) = failed {
        statements.push(StatementNode {
            start: Some(span.first),
            stop: Some(span.last),
            statement: None,
        });
    }

    ParseTree {
        tokens,
        root: Some(StatementBlock { statements }),
    }
}

/// Reads `?` as a bind placeholder unless it sits between two operands,
/// where PostgreSQL reads it as the jsonb key-exists operator.
fn rewrite_placeholders(raw: &mut [TokenWithSpan]) {
    let is_code = |t: &&TokenWithSpan| !matches!(t.token, Token::Whitespace(_));
    for i in 0..raw.len() {
        if raw[i].token != Token::Question {
            continue;
        }
        let after_operand = raw[..i]
            .iter()
            .rev()
            .find(is_code)
            .map_or(false, |t| ends_operand(&t.token));
        let before_operand = raw[i + 1..]
            .iter()
            .find(is_code)
            .map_or(false, |t| starts_operand(&t.token));
        if !(after_operand && before_operand) {
            raw[i].token = Token::Placeholder("?".to_owned());
        }
    }
}

fn ends_operand(token: &Token) -> bool {
    match token {
        Token::Word(w) => w.quote_style.is_some() || !OPERAND_KEYWORDS.contains(&w.keyword),
        Token::Number(..)
        | Token::SingleQuotedString(_)
        | Token::EscapedStringLiteral(_)
        | Token::DollarQuotedString(_)
        | Token::Placeholder(_)
        | Token::RParen
        | Token::RBracket => true,
        _ => false,
    }
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Word(_)
            | Token::Number(..)
            | Token::SingleQuotedString(_)
            | Token::EscapedStringLiteral(_)
            | Token::DollarQuotedString(_)
            | Token::Placeholder(_)
            | Token::LParen
            | Token::LBracket
    )
}

/// Token range of one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatementSpan {
    first: usize,
    last: usize,
    terminator: Option<usize>,
}

fn split_statements(tokens: &TokenStream) -> Vec<StatementSpan> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    for token in tokens.default_tokens(0, tokens.len()) {
        if token.token == Token::SemiColon {
            if let Some((first, last)) = current.take() {
                spans.push(StatementSpan {
                    first,
                    last,
                    terminator: Some(token.index),
                });
            }
            continue;
        }
        current = Some(match current {
            Some((first, _)) => (first, token.index),
            None => (token.index, token.index),
        });
    }
    if let Some((first, last)) = current {
        spans.push(StatementSpan {
            first,
            last,
            terminator: None,
        });
    }
    spans
}

fn parse_statement(
    dialect: &dyn Dialect,
    raw: &[TokenWithSpan],
    tokens: &TokenStream,
    span: &StatementSpan,
    listener: &mut dyn ErrorListener,
) -> StatementNode {
    let end = span.terminator.unwrap_or(span.last);
    let mut parser =
        Parser::new(dialect).with_tokens_with_locations(raw[span.first..=end].to_vec());
    let result = parser.parse_statement().and_then(|statement| {
        let next = parser.peek_token();
        match next.token {
            Token::EOF | Token::SemiColon => Ok(statement),
            token => Err(ParserError::ParserError(format!(
                "Expected: end of statement, found: {} at Line: {}, Column: {}",
                token, next.span.start.line, next.span.start.column
            ))),
        }
    });

    let statement = match result {
        Ok(statement) => {
            tracing::trace!(first = span.first, last = span.last, "parsed statement");
            Some(statement)
        }
        Err(e) => {
            tracing::trace!(
                first = span.first,
                last = span.last,
                error = %e,
                "statement failed to parse"
            );
            report_error(&e, raw, tokens, span, listener);
            None
        }
    };

    StatementNode {
        start: Some(span.first),
        stop: Some(span.last),
        statement,
    }
}

/// Forwards a parser error to the listener with a 0-based column and the
/// offending token.
///
/// Errors on the terminator, or at the end of the input, are anchored to the
/// last token of the statement they end.
fn report_error(
    error: &ParserError,
    raw: &[TokenWithSpan],
    tokens: &TokenStream,
    span: &StatementSpan,
    listener: &mut dyn ErrorListener,
) {
    let full_message = match error {
        ParserError::TokenizerError(m) | ParserError::ParserError(m) => m.as_str(),
        ParserError::RecursionLimitExceeded => "recursion limit exceeded",
    };
    let (message, location) = split_location(full_message);
    let end = span.terminator.unwrap_or(span.last);

    match location {
        Some((line, column)) => {
            let offending = tokens
                .default_tokens(span.first, end)
                .find(|t| t.line == line && t.column == column)
                .map(|t| match span.terminator {
                    Some(terminator) if t.index == terminator => span.last,
                    _ => t.index,
                });
            listener.syntax_error(line, column, message, offending.and_then(|i| tokens.get(i)));
        }
        None => {
            let (line, column) = match span.terminator.and_then(|t| tokens.get(t)) {
                Some(terminator) => (terminator.line, terminator.column),
                None => line_and_column(raw[span.last].span.end),
            };
            listener.syntax_error(line, column, message, tokens.get(span.last));
        }
    }
}

/// Splits the ` at Line: L, Column: C` suffix off a parser message. The
/// returned column is 0-based.
fn split_location(message: &str) -> (&str, Option<(usize, usize)>) {
    const MARKER: &str = " at Line: ";
    let Some(at) = message.rfind(MARKER) else {
        return (message, None);
    };
    let location = message[at + MARKER.len()..]
        .split_once(", Column: ")
        .and_then(|(line, column)| {
            let line = line.trim().parse::<usize>().ok()?;
            let column = column.trim().parse::<usize>().ok()?;
            Some((line, column.saturating_sub(1)))
        });
    match location {
        Some(location) => (&message[..at], Some(location)),
        None => (message, None),
    }
}

/// 1-based line and 0-based column of a tokenizer location.
fn line_and_column(location: Location) -> (usize, usize) {
    if location.line == 0 {
        return (1, 0);
    }
    (
        location.line as usize,
        location.column.saturating_sub(1) as usize,
    )
}

fn locate_tokens(sql: &str, raw: &[TokenWithSpan]) -> Vec<CstToken> {
    let mut cursor = OffsetCursor::new(sql);
    raw.iter()
        .enumerate()
        .map(|(index, t)| {
            let start = cursor.offset_of(t.span.start);
            let end = cursor.offset_of(t.span.end).max(start);
            let (line, column) = line_and_column(t.span.start);
            let channel = match t.token {
                Token::Whitespace(_) => Channel::Hidden,
                _ => Channel::Default,
            };
            CstToken {
                token: t.token.clone(),
                index,
                line,
                column,
                start,
                end,
                channel,
            }
        })
        .collect()
}

/// Converts tokenizer locations to byte offsets in one forward pass.
///
/// Locations must be requested in non-decreasing order.
struct OffsetCursor<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    len: usize,
    line: u64,
    column: u64,
}

impl<'a> OffsetCursor<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.char_indices().peekable(),
            len: sql.len(),
            line: 1,
            column: 1,
        }
    }

    fn offset_of(&mut self, location: Location) -> usize {
        while (self.line, self.column) < (location.line, location.column) {
            match self.chars.next() {
                Some((_, '\n')) => {
                    self.line += 1;
                    self.column = 1;
                }
                Some(_) => self.column += 1,
                None => return self.len,
            }
        }
        self.chars.peek().map_or(self.len, |&(i, _)| i)
    }
}
