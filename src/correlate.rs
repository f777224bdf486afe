//! Attribution of syntax errors to the statements they belong to.

use crate::cst::{StatementNode, TokenStream};
use crate::error::SyntaxError;

/// Returns the index of the statement `error` belongs to.
///
/// Token bounds are tried first, then line bounds. An error located before
/// the first statement goes to the first statement. Anything else is
/// unattributed.
pub fn statement_index_for_syntax_error(
    statements: &[StatementNode],
    tokens: &TokenStream,
    error: &SyntaxError,
) -> Option<usize> {
    if let Some(token_index) = error.token_index {
        let by_token = statements.iter().position(|statement| {
            statement
                .token_bounds()
                .map_or(false, |(start, stop)| (start..=stop).contains(&token_index))
        });
        if by_token.is_some() {
            return by_token;
        }
    }

    let by_line = statements.iter().position(|statement| {
        statement
            .line_bounds(tokens)
            .map_or(false, |(start, stop)| (start..=stop).contains(&error.line))
    });
    if by_line.is_some() {
        return by_line;
    }

    let first_line = statements.first()?.line_bounds(tokens)?.0;
    (error.line < first_line).then_some(0)
}

/// Groups `errors` by statement, keeping their order within each statement.
///
/// Errors that cannot be attributed are dropped and logged.
pub fn correlate_errors<'a>(
    statements: &[StatementNode],
    tokens: &TokenStream,
    errors: &'a [SyntaxError],
) -> Vec<Vec<&'a SyntaxError>> {
    let mut by_statement = vec![Vec::new(); statements.len()];
    for error in errors {
        match statement_index_for_syntax_error(statements, tokens, error) {
            Some(index) => by_statement[index].push(error),
            None => tracing::warn!(
                line = error.line,
                column = error.column,
                message = %error.message,
                "dropping syntax error outside of any statement"
            ),
        }
    }
    by_statement
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{correlate_errors, statement_index_for_syntax_error};
    use crate::cst::{Grammar, ParseTree, PostgresGrammar, StatementNode};
    use crate::error::SyntaxError;
    use crate::state::ErrorCollector;

    fn parse(sql: &str) -> (ParseTree, Vec<StatementNode>) {
        let mut errors = ErrorCollector::default();
        let mut tree = PostgresGrammar.parse(sql, &mut errors);
        let statements = tree.root.take().map(|b| b.statements).unwrap_or_default();
        (tree, statements)
    }

    fn err(line: usize, token_index: Option<usize>) -> SyntaxError {
        SyntaxError {
            line,
            column: 0,
            message: "boom".to_owned(),
            token_index,
        }
    }

    #[test]
    fn token_index_wins_over_line() {
        // Tokens: SELECT(0) ' '(1) 1(2) ;(3) ' '(4) SELECT(5) ' '(6) 2(7)
        let (tree, statements) = parse("SELECT 1; SELECT 2");
        let index_of = |e| statement_index_for_syntax_error(&statements, &tree.tokens, &e);
        assert_eq!(index_of(err(1, Some(7))), Some(1));
        assert_eq!(index_of(err(1, Some(0))), Some(0));
    }

    #[test]
    fn falls_back_to_lines() {
        let (tree, statements) = parse("SELECT 1;\nSELECT\n  2;\nSELECT 3");
        let index_of = |e| statement_index_for_syntax_error(&statements, &tree.tokens, &e);
        assert_eq!(index_of(err(3, None)), Some(1));
        assert_eq!(index_of(err(4, None)), Some(2));
        // The terminator token is in no statement's token range.
        assert_eq!(index_of(err(1, Some(3))), Some(0));
    }

    #[test]
    fn errors_before_first_statement() {
        let (tree, statements) = parse("\n\nSELECT 1");
        let index = statement_index_for_syntax_error(&statements, &tree.tokens, &err(1, None));
        assert_eq!(index, Some(0));
    }

    #[test]
    fn unattributed_errors_are_dropped() {
        let (tree, statements) = parse("SELECT 1;\nSELECT 2;\n\n");
        let errors = [err(2, None), err(9, None), err(1, Some(0))];
        let grouped = correlate_errors(&statements, &tree.tokens, &errors);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0], vec![&errors[2]]);
        assert_eq!(grouped[1], vec![&errors[0]]);
    }

    #[test]
    fn missing_bounds_are_skipped() {
        let (tree, mut statements) = parse("SELECT 1;\nSELECT 2");
        statements[0].stop = None;
        let index = statement_index_for_syntax_error(&statements, &tree.tokens, &err(2, Some(0)));
        assert_eq!(index, Some(1));
    }
}
