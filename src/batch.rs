//! Per-statement results of a batch parse.

use std::fmt::Display;

use crate::ir::ParsedQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParseWarningCode {
    SyntaxError,
}

impl Display for ParseWarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarningCode::SyntaxError => write!(f, "SYNTAX_ERROR"),
        }
    }
}

/// A problem found in one statement that did not stop the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParseWarning {
    pub code: ParseWarningCode,
    pub message: String,
}

impl Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StatementParseResult {
    /// 1-based position in the batch.
    pub index: usize,
    pub raw_sql: String,
    pub query: Option<ParsedQuery>,
    pub warnings: Vec<ParseWarning>,
}

impl StatementParseResult {
    /// Whether the statement produced an IR without warnings.
    pub fn is_clean(&self) -> bool {
        self.query.is_some() && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParseBatchResult {
    pub statements: Vec<StatementParseResult>,
    pub total_statements: usize,
    pub parsed_statements: usize,
    pub has_failures: bool,
}

impl ParseBatchResult {
    pub(crate) fn new(statements: Vec<StatementParseResult>) -> Self {
        let total_statements = statements.len();
        let parsed_statements = statements.iter().filter(|s| s.query.is_some()).count();
        let has_failures = parsed_statements != total_statements
            || statements.iter().any(|s| !s.warnings.is_empty());
        Self {
            statements,
            total_statements,
            parsed_statements,
            has_failures,
        }
    }
}

#[cfg(feature = "terminal-output")]
mod table {
    use tabled::{Table, Tabled};

    use super::ParseBatchResult;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "#")]
        index: usize,
        command: String,
        status: &'static str,
        warnings: String,
    }

    impl ParseBatchResult {
        /// Renders one row per statement.
        pub fn to_table(&self) -> String {
            let rows = self.statements.iter().map(|s| Row {
                index: s.index,
                command: s
                    .query
                    .as_ref()
                    .map(|q| q.command.to_string())
                    .unwrap_or_else(|| "-".to_owned()),
                status: match (&s.query, s.warnings.is_empty()) {
                    (Some(_), true) => "ok",
                    (Some(_), false) => "warning",
                    (None, _) => "failed",
                },
                warnings: s
                    .warnings
                    .iter()
                    .map(|w| w.message.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            });
            Table::new(rows).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ParseBatchResult, ParseWarning, ParseWarningCode, StatementParseResult};
    use crate::ir::ParsedQuery;

    fn statement(index: usize, parsed: bool, warnings: &[&str]) -> StatementParseResult {
        StatementParseResult {
            index,
            raw_sql: format!("stmt {}", index),
            query: parsed.then(|| ParsedQuery::unknown(format!("stmt {}", index))),
            warnings: warnings
                .iter()
                .map(|m| ParseWarning {
                    code: ParseWarningCode::SyntaxError,
                    message: (*m).to_owned(),
                })
                .collect(),
        }
    }

    #[test]
    fn counts() {
        let batch = ParseBatchResult::new(vec![statement(1, true, &[]), statement(2, false, &[])]);
        assert_eq!(batch.total_statements, 2);
        assert_eq!(batch.parsed_statements, 1);
        assert!(batch.has_failures);

        let clean = ParseBatchResult::new(vec![statement(1, true, &[])]);
        assert!(!clean.has_failures);
        assert!(clean.statements[0].is_clean());
    }

    #[test]
    fn warnings_count_as_failures() {
        let batch = ParseBatchResult::new(vec![statement(1, true, &["line 1:0 oops"])]);
        assert_eq!(batch.parsed_statements, 1);
        assert!(batch.has_failures);
        assert_eq!(
            batch.statements[0].warnings[0].to_string(),
            "SYNTAX_ERROR: line 1:0 oops"
        );
    }

    #[cfg(feature = "terminal-output")]
    #[test]
    fn renders_a_table() {
        let batch = ParseBatchResult::new(vec![
            statement(1, true, &[]),
            statement(2, false, &["line 2:7 boom"]),
        ]);
        let table = batch.to_table();
        assert!(table.contains("UNKNOWN"));
        assert!(table.contains("failed"));
        assert!(table.contains("line 2:7 boom"));
    }
}
