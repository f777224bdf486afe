//! Table references of queries and data-modifying statements.

use sqlparser::ast::{Delete, FromTable, Query, SetExpr, TableFactor, TableWithJoins};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use super::TableRef;
use crate::cst::{StatementNode, TokenStream};
use crate::identifier::{normalize_identifier, split_qualified_name, trim_ident_quotes};

/// Builds a reference from a name and alias as written. Outer quotes are
/// dropped from every part; case is kept.
pub(super) fn table_ref(raw: &str, alias: Option<String>) -> TableRef {
    let (schema, name) = split_name(raw);
    TableRef {
        schema,
        name,
        alias: alias
            .map(|a| trim_ident_quotes(&a).to_owned())
            .unwrap_or_default(),
        raw: raw.to_owned(),
    }
}

/// `(schema, name)` of a qualified name without outer quotes.
pub(super) fn split_name(raw: &str) -> (String, String) {
    let (schema, name) = split_qualified_name(raw);
    (
        trim_ident_quotes(&schema).to_owned(),
        trim_ident_quotes(&name).to_owned(),
    )
}

/// Collects base tables from the `FROM` clauses of `query`, descending into
/// CTEs, derived tables and set operations. References to CTEs are skipped.
pub(super) fn query_tables(query: &Query, out: &mut Vec<TableRef>) {
    let mut ctes = Vec::new();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            ctes.push(normalize_identifier(&cte.alias.name.to_string()));
            query_tables(&cte.query, out);
        }
    }

    let mut body = Vec::new();
    set_expr_tables(&query.body, &mut body);
    body.retain(|t| !(t.schema.is_empty() && ctes.contains(&normalize_identifier(&t.raw))));
    out.extend(body);
}

fn set_expr_tables(body: &SetExpr, out: &mut Vec<TableRef>) {
    match body {
        SetExpr::Select(select) => {
            for from in &select.from {
                table_with_joins(from, out);
            }
        }
        SetExpr::Query(query) => query_tables(query, out),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_tables(left, out);
            set_expr_tables(right, out);
        }
        _ => {}
    }
}

pub(super) fn table_with_joins(from: &TableWithJoins, out: &mut Vec<TableRef>) {
    table_factor(&from.relation, out);
    for join in &from.joins {
        table_factor(&join.relation, out);
    }
}

pub(super) fn table_factor(factor: &TableFactor, out: &mut Vec<TableRef>) {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            out.push(table_ref(
                &name.to_string(),
                alias.as_ref().map(|a| a.name.to_string()),
            ));
        }
        TableFactor::Derived { subquery, .. } => query_tables(subquery, out),
        TableFactor::NestedJoin {
            table_with_joins: nested,
            ..
        } => table_with_joins(nested, out),
        _ => {}
    }
}

pub(super) fn delete_tables(delete: &Delete, out: &mut Vec<TableRef>) {
    let from = match &delete.from {
        FromTable::WithFromKeyword(from) | FromTable::WithoutKeyword(from) => from,
    };
    for table in from {
        table_with_joins(table, out);
    }
}

/// Reads the target of `INSERT INTO name [AS alias]` from the tokens.
pub(super) fn insert_target(node: &StatementNode, tokens: &TokenStream) -> Option<TableRef> {
    let mut after_into = node.keywords_after(tokens, Some(Keyword::INTO)).peekable();
    let mut raw = String::new();
    while let Some(t) = after_into.peek() {
        match &t.token {
            Token::Word(_) | Token::Period => raw.push_str(&t.token.to_string()),
            _ => break,
        }
        after_into.next();
        if raw.ends_with('.') {
            continue;
        }
        if !matches!(after_into.peek().map(|t| &t.token), Some(Token::Period)) {
            break;
        }
    }
    if raw.is_empty() {
        return None;
    }

    let alias = match after_into.next() {
        Some(t) if t.is_keyword(Keyword::AS) => match after_into.next().map(|t| &t.token) {
            Some(Token::Word(w)) => Some(w.to_string()),
            _ => None,
        },
        _ => None,
    };
    Some(table_ref(&raw, alias))
}
