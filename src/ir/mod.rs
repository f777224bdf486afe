//! The intermediate representation handed to tooling.

use std::fmt::Display;

use sqlparser::ast::{SetExpr, Statement};
use sqlparser::keywords::Keyword;

use crate::cst::{StatementNode, TokenStream};
use crate::error::{Error, Result};
use crate::options::ParseOptions;
use crate::scan::extract_parameters;

mod ddl;
mod dml;

pub use ddl::{DdlAction, DdlActionType, DdlColumn};

/// The kind of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QueryCommand {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Ddl,
    /// Parsed, but without a structured representation.
    Unknown,
}

impl Display for QueryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryCommand::Select => "SELECT",
            QueryCommand::Insert => "INSERT",
            QueryCommand::Update => "UPDATE",
            QueryCommand::Delete => "DELETE",
            QueryCommand::Merge => "MERGE",
            QueryCommand::Ddl => "DDL",
            QueryCommand::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A base table referenced by a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TableRef {
    pub schema: String,
    pub name: String,
    pub alias: String,
    /// The name as written.
    pub raw: String,
}

/// A bind parameter such as `$1` or `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Parameter {
    pub raw: String,
    /// `N` for `$N`, the ordinal for `?`.
    pub position: usize,
}

/// One statement in intermediate form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParsedQuery {
    pub command: QueryCommand,
    pub raw_sql: String,
    pub tables: Vec<TableRef>,
    pub ddl_actions: Vec<DdlAction>,
    pub parameters: Vec<Parameter>,
}

impl ParsedQuery {
    /// A result without structure, used for statements accepted by utility
    /// recovery.
    pub fn unknown(raw_sql: impl Into<String>) -> Self {
        Self::new(QueryCommand::Unknown, raw_sql)
    }

    fn new(command: QueryCommand, raw_sql: impl Into<String>) -> Self {
        Self {
            command,
            raw_sql: raw_sql.into(),
            tables: Vec::new(),
            ddl_actions: Vec::new(),
            parameters: Vec::new(),
        }
    }
}

/// Builds the IR of one statement.
///
/// Statements that did not parse get a degenerate IR whose command comes
/// from their leading keyword.
pub(crate) fn build_query(
    node: &StatementNode,
    tokens: &TokenStream,
    raw_sql: &str,
    options: &ParseOptions,
) -> Result<ParsedQuery> {
    if node.token_bounds().is_none() {
        return Err(Error::NilContext("statement"));
    }

    let mut query = ParsedQuery::new(infer_command(node, tokens), raw_sql);
    query.parameters = extract_parameters(raw_sql);

    let Some(statement) = &node.statement else {
        return Ok(query);
    };
    let statement_sql = node.text(tokens);
    match statement {
        Statement::Query(q) => {
            query.command = match q.body.as_ref() {
                SetExpr::Insert(_) => QueryCommand::Insert,
                SetExpr::Update(_) => QueryCommand::Update,
                _ => QueryCommand::Select,
            };
            dml::query_tables(q, &mut query.tables);
        }
        Statement::Insert(insert) => {
            query.command = QueryCommand::Insert;
            if let Some(target) = dml::insert_target(node, tokens) {
                query.tables.push(target);
            }
            if let Some(source) = &insert.source {
                dml::query_tables(source, &mut query.tables);
            }
        }
        Statement::Update { table, .. } => {
            query.command = QueryCommand::Update;
            dml::table_with_joins(table, &mut query.tables);
        }
        Statement::Delete(delete) => {
            query.command = QueryCommand::Delete;
            dml::delete_tables(delete, &mut query.tables);
        }
        Statement::Merge { table, source, .. } => {
            query.command = QueryCommand::Merge;
            dml::table_factor(table, &mut query.tables);
            dml::table_factor(source, &mut query.tables);
        }
        _ => {
            let extracted = ddl::extract(statement, node, tokens, statement_sql, options)?;
            if let Some((actions, tables)) = extracted {
                query.command = QueryCommand::Ddl;
                query.ddl_actions = actions;
                query.tables = tables;
            }
        }
    }
    Ok(query)
}

/// Guesses the command of a statement from its leading keyword.
fn infer_command(node: &StatementNode, tokens: &TokenStream) -> QueryCommand {
    match node.first_keyword(tokens) {
        Some(Keyword::SELECT | Keyword::WITH | Keyword::VALUES | Keyword::TABLE) => {
            QueryCommand::Select
        }
        Some(Keyword::INSERT) => QueryCommand::Insert,
        Some(Keyword::UPDATE) => QueryCommand::Update,
        Some(Keyword::DELETE) => QueryCommand::Delete,
        Some(Keyword::MERGE) => QueryCommand::Merge,
        Some(
            Keyword::CREATE
            | Keyword::DROP
            | Keyword::ALTER
            | Keyword::TRUNCATE
            | Keyword::COMMENT,
        ) => QueryCommand::Ddl,
        _ => QueryCommand::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{build_query, Parameter, ParsedQuery, QueryCommand, TableRef};
    use crate::cst::{Grammar, PostgresGrammar, StatementNode};
    use crate::error::Error;
    use crate::options::ParseOptions;
    use crate::state::ErrorCollector;

    fn build(sql: &str) -> ParsedQuery {
        let mut errors = ErrorCollector::default();
        let tree = PostgresGrammar.parse(sql, &mut errors);
        let block = tree.root.unwrap();
        let node = &block.statements[0];
        build_query(node, &tree.tokens, node.text(&tree.tokens), &ParseOptions::default())
            .unwrap()
    }

    fn table(schema: &str, name: &str, alias: &str, raw: &str) -> TableRef {
        TableRef {
            schema: schema.to_owned(),
            name: name.to_owned(),
            alias: alias.to_owned(),
            raw: raw.to_owned(),
        }
    }

    #[test]
    fn select_tables() {
        let query = build(
            "SELECT * FROM public.users u JOIN orders o ON o.user_id = u.id \
             WHERE u.id IN (SELECT user_id FROM (SELECT * FROM bans) b)",
        );
        assert_eq!(query.command, QueryCommand::Select);
        assert_eq!(
            query.tables,
            vec![
                table("public", "users", "u", "public.users"),
                table("", "orders", "o", "orders"),
            ]
        );
    }

    #[test]
    fn derived_and_set_operation_tables() {
        let query = build(
            "SELECT * FROM (SELECT * FROM \"Events\") e UNION SELECT * FROM archive.events",
        );
        assert_eq!(
            query.tables,
            vec![
                table("", "Events", "", "\"Events\""),
                table("archive", "events", "", "archive.events"),
            ]
        );
    }

    #[test]
    fn cte_names_are_not_tables() {
        let query = build("WITH recent AS (SELECT * FROM events) SELECT * FROM recent");
        assert_eq!(query.tables, vec![table("", "events", "", "events")]);
    }

    #[test]
    fn dml_commands() {
        let insert = build("INSERT INTO app.logs (msg) SELECT msg FROM staging");
        assert_eq!(insert.command, QueryCommand::Insert);
        assert_eq!(
            insert.tables,
            vec![
                table("app", "logs", "", "app.logs"),
                table("", "staging", "", "staging"),
            ]
        );

        let update = build("UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(update.command, QueryCommand::Update);
        assert_eq!(update.tables, vec![table("", "users", "", "users")]);
        assert_eq!(
            update.parameters,
            vec![
                Parameter {
                    raw: "$1".to_owned(),
                    position: 1
                },
                Parameter {
                    raw: "$2".to_owned(),
                    position: 2
                },
            ]
        );

        let delete = build("DELETE FROM sessions WHERE expired");
        assert_eq!(delete.command, QueryCommand::Delete);
        assert_eq!(delete.tables, vec![table("", "sessions", "", "sessions")]);

        let merge = build(
            "MERGE INTO stock s USING deliveries d ON s.item = d.item \
             WHEN MATCHED THEN UPDATE SET qty = s.qty + d.qty",
        );
        assert_eq!(merge.command, QueryCommand::Merge);
        assert_eq!(
            merge.tables,
            vec![
                table("", "stock", "s", "stock"),
                table("", "deliveries", "d", "deliveries"),
            ]
        );
    }

    #[test]
    fn failed_statements_infer_their_command() {
        assert_eq!(build("SELECT FROM WHERE").command, QueryCommand::Select);
        assert_eq!(build("INSERT INTO").command, QueryCommand::Insert);
        assert_eq!(build("CREATE TABLE (").command, QueryCommand::Ddl);
        assert_eq!(build("FROB the widget").command, QueryCommand::Unknown);
    }

    #[test]
    fn utility_statements_are_unknown() {
        let query = build("SET search_path TO app");
        assert_eq!(query.command, QueryCommand::Unknown);
        assert!(query.tables.is_empty());
    }

    #[test]
    fn missing_bounds_are_a_nil_context() {
        let mut errors = ErrorCollector::default();
        let tree = PostgresGrammar.parse("SELECT 1", &mut errors);
        let node = StatementNode {
            start: None,
            stop: None,
            statement: None,
        };
        let result = build_query(&node, &tree.tokens, "", &ParseOptions::default());
        assert!(matches!(result, Err(Error::NilContext("statement"))));
    }

    #[test]
    fn command_names() {
        assert_eq!(QueryCommand::Ddl.to_string(), "DDL");
        assert_eq!(QueryCommand::Unknown.to_string(), "UNKNOWN");
        assert_eq!(ParsedQuery::unknown("SET x = y").command, QueryCommand::Unknown);
    }
}
