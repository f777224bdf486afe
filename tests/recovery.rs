use pretty_assertions::assert_eq;
use sql_ir::cst::{ErrorListener, Grammar, ParseTree, PostgresGrammar};
use sql_ir::{Error, QueryCommand, SqlParser};

/// The stock grammar plus a reserved word it cannot take as a `SET` value,
/// the way PostgreSQL's own grammar treats `warning`.
struct ReservedWordGap;

impl Grammar for ReservedWordGap {
    fn parse(&self, sql: &str, listener: &mut dyn ErrorListener) -> ParseTree {
        let mut tree = PostgresGrammar.parse(sql, listener);
        let tokens = &tree.tokens;
        let Some(block) = tree.root.as_mut() else {
            return tree;
        };
        for node in &mut block.statements {
            let Some((start, stop)) = node.token_bounds() else {
                continue;
            };
            if !node.text(tokens).to_uppercase().starts_with("SET") {
                continue;
            }
            let reserved = tokens
                .default_tokens(start, stop)
                .find(|t| t.token.to_string().eq_ignore_ascii_case("warning"));
            if let Some(token) = reserved {
                listener.syntax_error(
                    token.line,
                    token.column,
                    "syntax error at or near \"warning\"",
                    Some(token),
                );
                node.statement = None;
            }
        }
        tree
    }
}

fn parser() -> SqlParser<ReservedWordGap> {
    SqlParser::new(ReservedWordGap)
}

#[test]
fn test_single_statement_recovers() {
    let query = parser().parse("SET client_min_messages = warning").unwrap();
    assert_eq!(query.command, QueryCommand::Unknown);
    assert_eq!(query.raw_sql, "SET client_min_messages = warning");

    let query = parser().parse("\n\n   SET LOCAL client_min_messages TO warning;  ").unwrap();
    assert_eq!(query.raw_sql, "SET LOCAL client_min_messages TO warning;");

    let query = parser().parse_strict("SET client_min_messages = warning;").unwrap();
    assert_eq!(query.command, QueryCommand::Unknown);
}

#[test]
fn test_trailing_token_is_not_recovered() {
    match parser().parse("SET client_min_messages = warning extra") {
        Err(Error::Parse(errors)) => assert_eq!(errors.errors.len(), 2),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_other_statements_keep_their_errors() {
    assert!(matches!(
        parser().parse("SELECT 1; SET client_min_messages = warning"),
        Err(Error::Parse(_))
    ));
}

#[test]
fn test_batch_recovers_per_statement() {
    let batch = parser()
        .parse_all("SELECT 1;\n  SET client_min_messages = warning;\nSELECT FROM")
        .unwrap();
    assert_eq!(batch.total_statements, 3);

    let set = &batch.statements[1];
    assert!(set.warnings.is_empty());
    assert_eq!(set.raw_sql, "SET client_min_messages = warning");
    assert_eq!(set.query.as_ref().unwrap().command, QueryCommand::Unknown);

    let warnings: Vec<usize> = batch.statements.iter().map(|s| s.warnings.len()).collect();
    assert_eq!(warnings, vec![0, 0, 1]);
    assert!(batch.has_failures);
}

#[test]
fn test_clean_batch_with_recovered_statement() {
    let batch = parser()
        .parse_all("SET client_min_messages = warning;\nSELECT 1;")
        .unwrap();
    assert!(!batch.has_failures);
    assert_eq!(batch.parsed_statements, 2);
}
