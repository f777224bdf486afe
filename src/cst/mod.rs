//! Concrete syntax tree handed over by a [`Grammar`].
//!
//! A grammar produces the full token stream of the input (whitespace and
//! comments included) and one [`StatementNode`] per statement it could
//! delimit, even for statements it failed to parse.

use sqlparser::ast::Statement;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

mod postgres;

pub use postgres::PostgresGrammar;

/// Token channel. Whitespace and comments are `Hidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    Hidden,
}

/// A lexical token together with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct CstToken {
    pub token: Token,
    /// Position in the token stream.
    pub index: usize,
    /// 1-based line of the first character.
    pub line: usize,
    /// 0-based column of the first character, counted in characters.
    pub column: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub channel: Channel,
}

impl CstToken {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.token, Token::Word(w) if w.keyword == keyword && w.quote_style.is_none())
    }
}

/// Every token of one input, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    source: String,
    tokens: Vec<CstToken>,
}

impl TokenStream {
    pub fn new(source: String, tokens: Vec<CstToken>) -> Self {
        Self { source, tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CstToken> {
        self.tokens.get(index)
    }

    /// Source text from the start of token `start` to the end of token
    /// `stop`, both inclusive. Empty when either index is out of range.
    pub fn text(&self, start: usize, stop: usize) -> &str {
        match (self.tokens.get(start), self.tokens.get(stop)) {
            (Some(first), Some(last)) if first.start <= last.end => self
                .source
                .get(first.start..last.end)
                .unwrap_or_default(),
            _ => "",
        }
    }

    /// Default-channel tokens between `start` and `stop`, both inclusive.
    pub fn default_tokens(&self, start: usize, stop: usize) -> impl Iterator<Item = &CstToken> {
        let end = (stop + 1).min(self.tokens.len());
        let start = start.min(end);
        self.tokens[start..end]
            .iter()
            .filter(|t| t.channel == Channel::Default)
    }

    /// Hidden-channel tokens lying strictly between `start` and `stop`.
    pub fn hidden_tokens_between(
        &self,
        start: usize,
        stop: usize,
    ) -> impl Iterator<Item = &CstToken> {
        let end = stop.min(self.tokens.len());
        let start = (start + 1).min(end);
        self.tokens[start..end]
            .iter()
            .filter(|t| t.channel == Channel::Hidden)
    }
}

/// One statement as delimited by the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    /// Index of the first default-channel token.
    pub start: Option<usize>,
    /// Index of the last default-channel token, terminator excluded.
    pub stop: Option<usize>,
    /// The parsed statement; `None` when the statement did not parse.
    pub statement: Option<Statement>,
}

impl StatementNode {
    /// Both token bounds, when present and ordered.
    pub fn token_bounds(&self) -> Option<(usize, usize)> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) if start <= stop => Some((start, stop)),
            _ => None,
        }
    }

    /// First and last line of the statement, the last clamped to the first.
    pub fn line_bounds(&self, tokens: &TokenStream) -> Option<(usize, usize)> {
        let start = tokens.get(self.start?)?.line;
        let stop = tokens.get(self.stop?)?.line;
        Some((start, stop.max(start)))
    }

    pub fn text<'a>(&self, tokens: &'a TokenStream) -> &'a str {
        match self.token_bounds() {
            Some((start, stop)) => tokens.text(start, stop),
            None => "",
        }
    }

    pub fn first_token<'a>(&self, tokens: &'a TokenStream) -> Option<&'a CstToken> {
        tokens.get(self.start?)
    }

    /// The leading keyword, e.g. `SELECT` or `CREATE`.
    pub fn first_keyword(&self, tokens: &TokenStream) -> Option<Keyword> {
        match &self.first_token(tokens)?.token {
            Token::Word(w) if w.quote_style.is_none() => Some(w.keyword),
            _ => None,
        }
    }

    /// Whether any default-channel token of the statement is `keyword`.
    pub fn has_keyword(&self, tokens: &TokenStream, keyword: Keyword) -> bool {
        self.keywords_after(tokens, None)
            .any(|t| t.is_keyword(keyword))
    }

    /// Default-channel tokens following the first occurrence of `after`, or
    /// all of them when `after` is `None`.
    pub fn keywords_after<'a>(
        &self,
        tokens: &'a TokenStream,
        after: Option<Keyword>,
    ) -> impl Iterator<Item = &'a CstToken> {
        let mut all = match self.token_bounds() {
            Some((start, stop)) => tokens.default_tokens(start, stop).collect::<Vec<_>>(),
            None => Vec::new(),
        };
        if let Some(keyword) = after {
            let position = all.iter().position(|t| t.is_keyword(keyword));
            all = match position {
                Some(i) => all.split_off(i + 1),
                None => Vec::new(),
            };
        }
        all.into_iter()
    }
}

/// The statement list of one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBlock {
    pub statements: Vec<StatementNode>,
}

/// Everything a grammar produces for one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseTree {
    pub tokens: TokenStream,
    /// `None` when the grammar could not produce a statement list at all.
    pub root: Option<StatementBlock>,
}

/// Receives syntax errors while a grammar runs.
pub trait ErrorListener {
    /// `line` is 1-based, `column` 0-based in characters.
    fn syntax_error(
        &mut self,
        line: usize,
        column: usize,
        message: &str,
        offending: Option<&CstToken>,
    );
}

/// A SQL grammar producing a [`ParseTree`].
pub trait Grammar {
    fn parse(&self, sql: &str, listener: &mut dyn ErrorListener) -> ParseTree;
}

impl<G: Grammar + ?Sized> Grammar for &G {
    fn parse(&self, sql: &str, listener: &mut dyn ErrorListener) -> ParseTree {
        (**self).parse(sql, listener)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sqlparser::keywords::Keyword;

    use super::{Grammar, ParseTree, PostgresGrammar, StatementNode};
    use crate::state::ErrorCollector;

    fn parse(sql: &str) -> ParseTree {
        let mut errors = ErrorCollector::default();
        PostgresGrammar.parse(sql, &mut errors)
    }

    #[test]
    fn token_text_and_bounds() {
        let tree = parse("SELECT 1;\n  SELECT 2");
        let block = tree.root.unwrap();
        assert_eq!(block.statements.len(), 2);

        let second = &block.statements[1];
        assert_eq!(second.text(&tree.tokens), "SELECT 2");
        assert_eq!(second.line_bounds(&tree.tokens), Some((2, 2)));
        assert_eq!(second.first_keyword(&tree.tokens), Some(Keyword::SELECT));
        assert!(second.has_keyword(&tree.tokens, Keyword::SELECT));
        assert!(!second.has_keyword(&tree.tokens, Keyword::FROM));
    }

    #[test]
    fn missing_bounds() {
        let node = StatementNode {
            start: Some(3),
            stop: None,
            statement: None,
        };
        let tree = parse("SELECT 1");
        assert_eq!(node.token_bounds(), None);
        assert_eq!(node.text(&tree.tokens), "");
        assert_eq!(node.line_bounds(&tree.tokens), None);
    }

    #[test]
    fn keywords_after() {
        let tree = parse("TRUNCATE a RESTART IDENTITY CASCADE");
        let block = tree.root.unwrap();
        let node = &block.statements[0];
        let after: Vec<String> = node
            .keywords_after(&tree.tokens, Some(Keyword::RESTART))
            .map(|t| t.token.to_string())
            .collect();
        assert_eq!(after, vec!["IDENTITY".to_owned(), "CASCADE".to_owned()]);
        assert_eq!(node.keywords_after(&tree.tokens, Some(Keyword::ONLY)).count(), 0);
    }

    #[test]
    fn hidden_tokens() {
        let tree = parse("SELECT /* c */ 1");
        let hidden: Vec<String> = tree
            .tokens
            .hidden_tokens_between(0, 4)
            .map(|t| t.token.to_string())
            .collect();
        assert_eq!(hidden, vec![" ".to_owned(), "/* c */".to_owned(), " ".to_owned()]);
    }
}
