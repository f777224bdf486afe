//! Schema-changing statements.

use std::fmt::Display;

use hashbrown::HashMap;
use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, CreateIndex, CreateTable, ObjectName,
    ObjectType, Statement,
};
use sqlparser::keywords::Keyword;

use super::dml::{split_name, table_ref};
use super::TableRef;
use crate::cst::{StatementNode, TokenStream};
use crate::error::{Error, Result};
use crate::identifier::{normalize_identifier, split_qualified_column_name, trim_ident_quotes};
use crate::options::ParseOptions;
use crate::scan::{
    comments_by_column, decode_string_literal, extract_create_table_body, primary_key_columns,
    split_table_elements,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DdlActionType {
    CreateTable,
    DropTable,
    DropIndex,
    AlterTable,
    DropColumn,
    CreateIndex,
    Truncate,
    Comment,
}

impl Display for DdlActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DdlActionType::CreateTable => "CREATE_TABLE",
            DdlActionType::DropTable => "DROP_TABLE",
            DdlActionType::DropIndex => "DROP_INDEX",
            DdlActionType::AlterTable => "ALTER_TABLE",
            DdlActionType::DropColumn => "DROP_COLUMN",
            DdlActionType::CreateIndex => "CREATE_INDEX",
            DdlActionType::Truncate => "TRUNCATE",
            DdlActionType::Comment => "COMMENT",
        };
        write!(f, "{}", name)
    }
}

/// A column declared by `CREATE TABLE` or `ALTER TABLE ... ADD COLUMN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DdlColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// The default expression, empty when there is none.
    pub default: String,
    /// Line comments written right before the definition.
    pub comments: Vec<String>,
}

/// One schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DdlAction {
    pub action_type: DdlActionType,
    pub object_name: String,
    pub schema: String,
    pub columns: Vec<String>,
    pub column_details: Vec<DdlColumn>,
    /// Modifiers such as `IF_EXISTS` or `CASCADE`.
    pub flags: Vec<&'static str>,
    /// Index access method, e.g. `gin`.
    pub index_type: String,
    /// Object kind of a `COMMENT ON` target, e.g. `COLUMN`.
    pub object_type: String,
    /// `COMMENT ON` target as written.
    pub target: String,
    pub comment: String,
}

impl DdlAction {
    fn new(action_type: DdlActionType, schema: String, object_name: String) -> Self {
        Self {
            action_type,
            object_name,
            schema,
            columns: Vec::new(),
            column_details: Vec::new(),
            flags: Vec::new(),
            index_type: String::new(),
            object_type: String::new(),
            target: String::new(),
            comment: String::new(),
        }
    }

    fn with_flags(mut self, flags: &[&'static str]) -> Self {
        self.flags.extend_from_slice(flags);
        self
    }
}

type Extracted = (Vec<DdlAction>, Vec<TableRef>);

/// Extracts the DDL actions of `statement`, or `None` when it is not a
/// supported schema change.
pub(super) fn extract(
    statement: &Statement,
    node: &StatementNode,
    tokens: &TokenStream,
    statement_sql: &str,
    options: &ParseOptions,
) -> Result<Option<Extracted>> {
    let extracted = match statement {
        Statement::CreateTable(create) => create_table(create, statement_sql, options),
        Statement::Drop {
            object_type,
            if_exists,
            names,
            cascade,
            restrict,
            ..
        } => {
            let action_type = match object_type {
                ObjectType::Table => DdlActionType::DropTable,
                ObjectType::Index => DdlActionType::DropIndex,
                _ => return Ok(None),
            };
            let mut flags = Vec::new();
            if *if_exists {
                flags.push("IF_EXISTS");
            }
            if *cascade {
                flags.push("CASCADE");
            } else if *restrict {
                flags.push("RESTRICT");
            }
            if node.has_keyword(tokens, Keyword::CONCURRENTLY) {
                flags.push("CONCURRENTLY");
            }
            drop_objects(action_type, names, &flags)
        }
        Statement::AlterTable {
            name, operations, ..
        } => alter_table(name, operations, node, tokens),
        Statement::CreateIndex(create) => create_index(create),
        Statement::Truncate { table_names, .. } => {
            let mut flags = Vec::new();
            if node.has_keyword(tokens, Keyword::RESTART) {
                flags.push("RESTART_IDENTITY");
            } else if node.has_keyword(tokens, Keyword::CONTINUE) {
                flags.push("CONTINUE_IDENTITY");
            }
            flags.extend(drop_behavior(node, tokens));
            let names: Vec<&ObjectName> = table_names.iter().map(|t| &t.name).collect();
            truncate(&names, &flags)
        }
        Statement::Comment {
            object_type,
            object_name,
            ..
        } => {
            let literal = node
                .keywords_after(tokens, Some(Keyword::IS))
                .next()
                .map(|t| tokens.text(t.index, t.index))
                .ok_or(Error::NilContext("comment statement"))?;
            comment(&object_type.to_string(), object_name, literal)
        }
        _ => return Ok(None),
    };
    Ok(Some(extracted))
}

fn drop_behavior(node: &StatementNode, tokens: &TokenStream) -> Option<&'static str> {
    if node.has_keyword(tokens, Keyword::CASCADE) {
        Some("CASCADE")
    } else if node.has_keyword(tokens, Keyword::RESTRICT) {
        Some("RESTRICT")
    } else {
        None
    }
}

fn create_table(create: &CreateTable, statement_sql: &str, options: &ParseOptions) -> Extracted {
    let raw = create.name.to_string();
    let (schema, name) = split_name(&raw);
    let mut action = DdlAction::new(DdlActionType::CreateTable, schema, name);
    if create.if_not_exists {
        action.flags.push("IF_NOT_EXISTS");
    }

    let elements = extract_create_table_body(statement_sql)
        .map(|body| split_table_elements(&body))
        .unwrap_or_default();
    let primary_keys = primary_key_columns(&elements);
    let mut comments = if options.include_create_table_field_comments {
        comments_by_column(statement_sql)
    } else {
        HashMap::new()
    };

    for column in &create.columns {
        let key = normalize_identifier(&column.name.to_string());
        let mut detail = column_detail(column);
        if primary_keys.contains(&key) {
            detail.nullable = false;
        }
        detail.comments = comments.remove(&key).unwrap_or_default();
        action.columns.push(detail.name.clone());
        action.column_details.push(detail);
    }

    (vec![action], vec![table_ref(&raw, None)])
}

fn column_detail(column: &ColumnDef) -> DdlColumn {
    let mut detail = DdlColumn {
        name: trim_ident_quotes(&column.name.to_string()).to_owned(),
        data_type: column.data_type.to_string(),
        nullable: true,
        ..Default::default()
    };
    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull | ColumnOption::Unique { is_primary: true, .. } => {
                detail.nullable = false
            }
            ColumnOption::Default(expr) => detail.default = expr.to_string(),
            _ => {}
        }
    }
    detail
}

fn drop_objects(
    action_type: DdlActionType,
    names: &[ObjectName],
    flags: &[&'static str],
) -> Extracted {
    let mut actions = Vec::new();
    let mut tables = Vec::new();
    for name in names {
        let raw = name.to_string();
        let (schema, object) = split_name(&raw);
        actions.push(DdlAction::new(action_type, schema, object).with_flags(flags));
        if action_type == DdlActionType::DropTable {
            tables.push(table_ref(&raw, None));
        }
    }
    (actions, tables)
}

fn alter_table(
    name: &ObjectName,
    operations: &[AlterTableOperation],
    node: &StatementNode,
    tokens: &TokenStream,
) -> Extracted {
    let raw = name.to_string();
    let (schema, table) = split_name(&raw);
    let behavior: Vec<&'static str> = drop_behavior(node, tokens).into_iter().collect();
    let action =
        |action_type| DdlAction::new(action_type, schema.clone(), table.clone());

    let mut actions = Vec::new();
    for operation in operations {
        match operation {
            AlterTableOperation::AddColumn {
                column_def,
                if_not_exists,
                ..
            } => {
                let detail = column_detail(column_def);
                let mut add = action(DdlActionType::AlterTable).with_flags(&["ADD_COLUMN"]);
                if *if_not_exists {
                    add.flags.push("IF_NOT_EXISTS");
                }
                add.columns.push(detail.name.clone());
                add.column_details.push(detail);
                actions.push(add);
            }
            AlterTableOperation::DropColumn {
                column_name,
                if_exists,
                ..
            } => {
                let mut drop = action(DdlActionType::DropColumn).with_flags(&behavior);
                if *if_exists {
                    drop.flags.push("IF_EXISTS");
                }
                drop.columns
                    .push(trim_ident_quotes(&column_name.to_string()).to_owned());
                actions.push(drop);
            }
            AlterTableOperation::AlterColumn { column_name, .. } => {
                let mut alter = action(DdlActionType::AlterTable).with_flags(&["ALTER_COLUMN"]);
                alter
                    .columns
                    .push(trim_ident_quotes(&column_name.to_string()).to_owned());
                actions.push(alter);
            }
            AlterTableOperation::AddConstraint { .. }
            | AlterTableOperation::DropConstraint { .. } => {}
            _ => actions.push(action(DdlActionType::AlterTable)),
        }
    }
    (actions, vec![table_ref(&raw, None)])
}

fn create_index(create: &CreateIndex) -> Extracted {
    let table_raw = create.table_name.to_string();
    let (table_schema, _) = split_name(&table_raw);
    let (mut schema, name) = create
        .name
        .as_ref()
        .map(|n| split_name(&n.to_string()))
        .unwrap_or_default();
    if schema.is_empty() {
        schema = table_schema;
    }

    let mut action = DdlAction::new(DdlActionType::CreateIndex, schema, name);
    action.columns = create.columns.iter().map(|c| c.to_string()).collect();
    if create.concurrently {
        action.flags.push("CONCURRENTLY");
    }
    if create.unique {
        action.flags.push("UNIQUE");
    }
    if create.if_not_exists {
        action.flags.push("IF_NOT_EXISTS");
    }
    action.index_type = create
        .using
        .as_ref()
        .map(|using| using.to_string().to_lowercase())
        .unwrap_or_default();

    (vec![action], vec![table_ref(&table_raw, None)])
}

fn truncate(names: &[&ObjectName], flags: &[&'static str]) -> Extracted {
    let mut actions = Vec::new();
    let mut tables = Vec::new();
    for name in names {
        let raw = name.to_string();
        let (schema, object) = split_name(&raw);
        actions.push(DdlAction::new(DdlActionType::Truncate, schema, object).with_flags(flags));
        tables.push(table_ref(&raw, None));
    }
    (actions, tables)
}

fn comment(object_type: &str, object_name: &ObjectName, literal: &str) -> Extracted {
    let target = object_name.to_string();
    let mut action = DdlAction::new(DdlActionType::Comment, String::new(), String::new());
    action.object_type = object_type.to_uppercase();
    action.comment = decode_string_literal(literal);
    let mut tables = Vec::new();

    if action.object_type == "COLUMN" {
        let (schema, table, column) = split_qualified_column_name(&target);
        action.schema = trim_ident_quotes(&schema).to_owned();
        action.object_name = trim_ident_quotes(&table).to_owned();
        if !column.is_empty() {
            action.columns.push(trim_ident_quotes(&column).to_owned());
        }
        if !table.is_empty() {
            let table_raw = if schema.is_empty() {
                table
            } else {
                format!("{}.{}", schema, table)
            };
            tables.push(table_ref(&table_raw, None));
        }
    } else {
        let (schema, object) = split_name(&target);
        action.schema = schema;
        action.object_name = object;
        if action.object_type == "TABLE" {
            tables.push(table_ref(&target, None));
        }
    }
    action.target = target;
    (vec![action], tables)
}
