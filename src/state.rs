//! Acquisition of statements and syntax errors from one grammar run.

use crate::cst::{CstToken, ErrorListener, Grammar, StatementNode, TokenStream};
use crate::error::{Error, ParseErrors, Result, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Any syntax error fails the acquisition.
    Strict,
    /// Syntax errors are kept for correlation as long as statements were
    /// recovered.
    Tolerant,
}

/// Collects every error the grammar reports.
#[derive(Debug, Default)]
pub(crate) struct ErrorCollector {
    pub(crate) errors: Vec<SyntaxError>,
}

impl ErrorListener for ErrorCollector {
    fn syntax_error(
        &mut self,
        line: usize,
        column: usize,
        message: &str,
        offending: Option<&CstToken>,
    ) {
        self.errors.push(SyntaxError {
            line,
            column,
            message: message.to_owned(),
            token_index: offending.map(|t| t.index),
        });
    }
}

/// The result of one successful acquisition.
#[derive(Debug, Clone)]
pub(crate) struct ParseState {
    pub(crate) sql: String,
    pub(crate) tokens: TokenStream,
    pub(crate) statements: Vec<StatementNode>,
    /// Empty in strict mode.
    pub(crate) syntax_errors: Vec<SyntaxError>,
}

/// Strips a leading byte-order mark.
pub(crate) fn preprocess_sql_input(sql: &str) -> String {
    sql.strip_prefix('\u{feff}').unwrap_or(sql).to_owned()
}

/// Runs `grammar` once over `sql`.
pub(crate) fn prepare_parse_state<G: Grammar + ?Sized>(
    grammar: &G,
    sql: &str,
    mode: ParseMode,
) -> Result<ParseState> {
    let sql = preprocess_sql_input(sql);
    let mut collector = ErrorCollector::default();
    let tree = grammar.parse(&sql, &mut collector);
    let errors = collector.errors;

    let statement_count = tree.root.as_ref().map_or(0, |b| b.statements.len());
    tracing::debug!(
        ?mode,
        statements = statement_count,
        errors = errors.len(),
        "acquired parse state"
    );

    if mode == ParseMode::Strict && !errors.is_empty() {
        return Err(Error::Parse(ParseErrors { sql, errors }));
    }

    let statements = match tree.root {
        Some(block) if !block.statements.is_empty() => block.statements,
        _ if errors.is_empty() => return Err(Error::NoStatements),
        _ => return Err(Error::Parse(ParseErrors { sql, errors })),
    };

    let syntax_errors = match mode {
        ParseMode::Strict => Vec::new(),
        ParseMode::Tolerant => errors,
    };
    Ok(ParseState {
        sql,
        tokens: tree.tokens,
        statements,
        syntax_errors,
    })
}
