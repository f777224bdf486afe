/// Optional metadata extraction performed while building the IR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Attach the line comments (`-- ...`) written right before a
    /// `CREATE TABLE` column definition to that column.
    pub include_create_table_field_comments: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_table_field_comments(mut self, include: bool) -> Self {
        self.include_create_table_field_comments = include;
        self
    }
}
