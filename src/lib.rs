//! Fault-tolerant SQL front end.
//!
//! Turns PostgreSQL text into a small intermediate representation
//! ([`ParsedQuery`]) for tooling. Inputs can be parsed one statement at a
//! time or as a batch where every statement succeeds or fails on its own.
//!
//! ```
//! let batch = sql_ir::parse_sql_all("SELECT 1;\nSELECT FROM;\nSELECT 2;").unwrap();
//! assert_eq!(batch.total_statements, 3);
//! assert!(batch.has_failures);
//! ```

mod batch;
mod correlate;
pub mod cst;
mod error;
mod identifier;
mod ir;
mod options;
mod parser;
mod recovery;
pub mod scan;
mod state;

pub use batch::{ParseBatchResult, ParseWarning, ParseWarningCode, StatementParseResult};
pub use correlate::{correlate_errors, statement_index_for_syntax_error};
pub use cst::{Grammar, PostgresGrammar};
pub use error::{Error, ParseErrors, Result, SyntaxError};
pub use ir::{DdlAction, DdlActionType, DdlColumn, Parameter, ParsedQuery, QueryCommand, TableRef};
pub use options::ParseOptions;
pub use parser::{
    parse_sql, parse_sql_all, parse_sql_all_with_options, parse_sql_strict,
    parse_sql_strict_with_options, parse_sql_with_options, SqlParser,
};
pub use recovery::should_recover;
