//! SQL parsing entry points.
//!
//! Three modes share one acquisition step: single (first statement only),
//! strict (exactly one statement) and batch (every statement, with syntax
//! errors reported per statement instead of failing the whole input).

use crate::batch::{ParseBatchResult, ParseWarning, ParseWarningCode, StatementParseResult};
use crate::correlate::correlate_errors;
use crate::cst::{Grammar, PostgresGrammar, StatementNode, TokenStream};
use crate::error::{Error, ParseErrors, Result, SyntaxError};
use crate::ir::{build_query, ParsedQuery};
use crate::options::ParseOptions;
use crate::recovery::{line_and_column_at_byte_offset, should_recover};
use crate::state::{prepare_parse_state, ParseMode, ParseState};

/// A grammar together with the options of every parse it runs.
#[derive(Debug, Clone, Default)]
pub struct SqlParser<G = PostgresGrammar> {
    grammar: G,
    options: ParseOptions,
}

impl<G: Grammar> SqlParser<G> {
    pub fn new(grammar: G) -> Self {
        Self {
            grammar,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses the first statement of `sql`.
    ///
    /// Any syntax error anywhere in the input fails the parse, unless the
    /// whole input is a utility statement hitting a known grammar gap.
    pub fn parse(&self, sql: &str) -> Result<ParsedQuery> {
        let state = match prepare_parse_state(&self.grammar, sql, ParseMode::Strict) {
            Ok(state) => state,
            Err(Error::Parse(errors)) => return recover_input(errors),
            Err(error) => return Err(error),
        };
        self.first_statement(&state)
    }

    /// Parses `sql`, which must hold exactly one statement.
    pub fn parse_strict(&self, sql: &str) -> Result<ParsedQuery> {
        let state = match prepare_parse_state(&self.grammar, sql, ParseMode::Strict) {
            Ok(state) => state,
            Err(Error::Parse(errors)) => return recover_input(errors),
            Err(error) => return Err(error),
        };
        if state.statements.len() > 1 {
            return Err(Error::MultipleStatements {
                count: state.statements.len(),
            });
        }
        self.first_statement(&state)
    }

    /// Parses every statement of `sql`.
    ///
    /// Syntax errors become warnings of the statement they belong to. The
    /// batch only fails when no statement could be delimited at all.
    pub fn parse_all(&self, sql: &str) -> Result<ParseBatchResult> {
        let state = match prepare_parse_state(&self.grammar, sql, ParseMode::Tolerant) {
            Ok(state) => state,
            Err(Error::Parse(errors)) => {
                let query = recover_input(errors)?;
                return Ok(ParseBatchResult::new(vec![StatementParseResult {
                    index: 1,
                    raw_sql: query.raw_sql.clone(),
                    query: Some(query),
                    warnings: Vec::new(),
                }]));
            }
            Err(error) => return Err(error),
        };

        let grouped = correlate_errors(&state.statements, &state.tokens, &state.syntax_errors);
        let statements = state
            .statements
            .iter()
            .zip(grouped)
            .enumerate()
            .map(|(i, (node, errors))| self.batch_entry(i + 1, node, &state.tokens, &errors))
            .collect();
        Ok(ParseBatchResult::new(statements))
    }

    fn first_statement(&self, state: &ParseState) -> Result<ParsedQuery> {
        let node = state.statements.first().ok_or(Error::NoStatements)?;
        build_query(node, &state.tokens, state.sql.trim(), &self.options)
    }

    fn batch_entry(
        &self,
        index: usize,
        node: &StatementNode,
        tokens: &TokenStream,
        errors: &[&SyntaxError],
    ) -> StatementParseResult {
        let raw_sql = node.text(tokens);
        let mut entry = StatementParseResult {
            index,
            raw_sql: raw_sql.to_owned(),
            query: None,
            warnings: errors
                .iter()
                .map(|e| ParseWarning {
                    code: ParseWarningCode::SyntaxError,
                    message: e.to_string(),
                })
                .collect(),
        };

        if let Some(first) = node.first_token(tokens).filter(|_| !errors.is_empty()) {
            let relative: Vec<SyntaxError> = errors
                .iter()
                .map(|e| relative_to(e, first.line, first.column))
                .collect();
            if should_recover(raw_sql, &relative) {
                entry.query = Some(ParsedQuery::unknown(raw_sql));
                entry.warnings.clear();
                return entry;
            }
        }

        entry.query = match build_query(node, tokens, raw_sql, &self.options) {
            Ok(query) => Some(query),
            Err(error) => {
                tracing::debug!(index, %error, "statement extraction failed");
                None
            }
        };
        entry
    }
}

/// Accepts a whole input rejected by the grammar when it is a recoverable
/// utility statement; otherwise hands the errors back.
fn recover_input(errors: ParseErrors) -> Result<ParsedQuery> {
    let leading = errors.sql.len() - errors.sql.trim_start().len();
    let (line, column) = line_and_column_at_byte_offset(&errors.sql, leading);
    let relative: Vec<SyntaxError> = errors
        .errors
        .iter()
        .map(|e| relative_to(e, line, column))
        .collect();

    let trimmed = errors.sql.trim();
    if should_recover(trimmed, &relative) {
        return Ok(ParsedQuery::unknown(trimmed));
    }
    Err(Error::Parse(errors))
}

/// Moves `error` into the coordinates of text starting at `line`:`column`.
fn relative_to(error: &SyntaxError, line: usize, column: usize) -> SyntaxError {
    let column = if error.line == line {
        error.column.saturating_sub(column)
    } else {
        error.column
    };
    SyntaxError {
        line: (error.line + 1).saturating_sub(line),
        column,
        message: error.message.clone(),
        token_index: error.token_index,
    }
}

fn postgres() -> SqlParser {
    SqlParser::new(PostgresGrammar)
}

/// Parses the first statement of `sql` with the default grammar.
pub fn parse_sql(sql: &str) -> Result<ParsedQuery> {
    postgres().parse(sql)
}

pub fn parse_sql_with_options(sql: &str, options: ParseOptions) -> Result<ParsedQuery> {
    postgres().with_options(options).parse(sql)
}

/// Parses `sql`, failing unless it holds exactly one statement.
pub fn parse_sql_strict(sql: &str) -> Result<ParsedQuery> {
    postgres().parse_strict(sql)
}

pub fn parse_sql_strict_with_options(sql: &str, options: ParseOptions) -> Result<ParsedQuery> {
    postgres().with_options(options).parse_strict(sql)
}

/// Parses every statement of `sql`, isolating failures per statement.
pub fn parse_sql_all(sql: &str) -> Result<ParseBatchResult> {
    postgres().parse_all(sql)
}

pub fn parse_sql_all_with_options(sql: &str, options: ParseOptions) -> Result<ParseBatchResult> {
    postgres().with_options(options).parse_all(sql)
}
