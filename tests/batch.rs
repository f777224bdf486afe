use pretty_assertions::assert_eq;
use sql_ir::{parse_sql, parse_sql_all, parse_sql_strict, Error, ParseWarningCode, QueryCommand};

#[test]
fn test_malformed_statement_is_isolated() {
    let batch = parse_sql_all("SELECT 1;\nSELECT FROM;\nSELECT 2;").unwrap();

    assert_eq!(batch.total_statements, 3);
    assert_eq!(batch.parsed_statements, 3);
    assert!(batch.has_failures);

    let first = &batch.statements[0];
    let middle = &batch.statements[1];
    let last = &batch.statements[2];
    assert_eq!(first.index, 1);
    assert!(first.warnings.is_empty());
    assert!(last.warnings.is_empty());
    assert_eq!(middle.warnings.len(), 1);
    assert_eq!(middle.warnings[0].code, ParseWarningCode::SyntaxError);
    assert!(middle.warnings[0].message.starts_with("line 2:"));

    let commands: Vec<QueryCommand> = batch
        .statements
        .iter()
        .map(|s| s.query.as_ref().unwrap().command)
        .collect();
    assert_eq!(
        commands,
        vec![QueryCommand::Select, QueryCommand::Select, QueryCommand::Select]
    );
}

#[test]
fn test_statements_sharing_a_line() {
    let batch = parse_sql_all("SELECT 1; SELECT 2 3; SELECT 4").unwrap();
    let warnings: Vec<usize> = batch.statements.iter().map(|s| s.warnings.len()).collect();
    assert_eq!(warnings, vec![0, 1, 0]);
    assert_eq!(batch.statements[1].raw_sql, "SELECT 2 3");
}

#[test]
fn test_clean_batch() {
    let batch = parse_sql_all(
        "INSERT INTO logs (msg) VALUES ($1);\n\
         -- cleanup\n\
         DELETE FROM logs WHERE created < $2;",
    )
    .unwrap();
    assert!(!batch.has_failures);
    assert_eq!(batch.parsed_statements, 2);

    let delete = batch.statements[1].query.as_ref().unwrap();
    assert_eq!(delete.command, QueryCommand::Delete);
    assert_eq!(delete.raw_sql, "DELETE FROM logs WHERE created < $2");
    assert_eq!(delete.parameters[0].position, 2);
}

#[test]
fn test_blank_batch_has_no_statements() {
    assert!(matches!(parse_sql_all(" \n -- only a comment\n"), Err(Error::NoStatements)));
}

#[test]
fn test_unterminated_literal_is_isolated() {
    let batch = parse_sql_all("SELECT 1;\nSELECT 2;\nSELECT 'oops").unwrap();
    assert_eq!(batch.total_statements, 3);
    assert!(batch.has_failures);

    let warnings: Vec<usize> = batch.statements.iter().map(|s| s.warnings.len()).collect();
    assert_eq!(warnings, vec![0, 0, 1]);
    let last = &batch.statements[2];
    assert_eq!(last.raw_sql, "SELECT 'oops");
    assert!(last.warnings[0].message.starts_with("line 3:7"));
    assert_eq!(last.query.as_ref().unwrap().command, QueryCommand::Select);
}

#[test]
fn test_question_mark_placeholders() {
    let query = parse_sql("SELECT id, name FROM users WHERE status = ?;").unwrap();
    assert_eq!(query.command, QueryCommand::Select);
    assert_eq!(query.tables[0].name, "users");
    let raws: Vec<(&str, usize)> = query
        .parameters
        .iter()
        .map(|p| (p.raw.as_str(), p.position))
        .collect();
    assert_eq!(raws, vec![("?", 1)]);

    let batch = parse_sql_all(
        "SELECT * FROM users WHERE status = ? LIMIT ?;\n\
         UPDATE users SET status = ? WHERE id IN (?, ?);",
    )
    .unwrap();
    assert!(!batch.has_failures);
    let counts: Vec<usize> = batch
        .statements
        .iter()
        .map(|s| s.query.as_ref().unwrap().parameters.len())
        .collect();
    assert_eq!(counts, vec![2, 3]);
}

#[test]
fn test_single_mode_fails_on_any_error() {
    let error = parse_sql("SELECT 1; SELECT FROM").unwrap_err();
    assert!(error.to_string().starts_with("parse error: line 1:"));
}

#[test]
fn test_strict_mode() {
    assert_eq!(
        parse_sql_strict("SELECT 1; SELECT 2")
            .unwrap_err()
            .to_string(),
        "multiple statements found: expected exactly 1 statement, got 2"
    );
    let query = parse_sql_strict("UPDATE users SET active = false WHERE id = ?").unwrap();
    assert_eq!(query.command, QueryCommand::Update);
    assert_eq!(query.parameters[0].raw, "?");
    assert!(matches!(parse_sql_strict(";;"), Err(Error::NoStatements)));
}

#[test]
fn test_reserved_word_values_parse() {
    let query = parse_sql("SET client_min_messages = warning").unwrap();
    assert_eq!(query.command, QueryCommand::Unknown);

    assert!(matches!(
        parse_sql("SET client_min_messages = warning extra"),
        Err(Error::Parse(_))
    ));
}

#[cfg(feature = "serde")]
#[test]
fn test_serialize_batch() {
    let batch = parse_sql_all("SELECT * FROM users").unwrap();
    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["total_statements"], 1);
    assert_eq!(json["statements"][0]["query"]["tables"][0]["name"], "users");
}
