use std::collections::HashMap;

use serde::Deserialize;
use tabdb_core::{Column, ColumnType, Table};

/// Sort direction for `SORT_TABLE` (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Typed face of the single `execute(command_name, params)` entry point
/// §6 asks for. One variant per §4.5 command plus this expansion's
/// `ADD_ROW`/`UPDATE_ROW`/`LIST_TABLES`/`DESCRIBE_TABLE`; field names match
/// §4.5's parameter names exactly so a deserialized params bag maps onto
/// this enum without renaming.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SaveTable {
        table_name: String,
    },
    DropColumns {
        table_name: String,
        columns: Vec<String>,
    },
    RenameColumn {
        table_name: String,
        old: String,
        new: String,
    },
    RenameTable {
        table_name: String,
        new_name: String,
    },
    DeleteRows {
        table_name: String,
        expression: String,
    },
    CollapseTable {
        table_name: String,
        column_name: Option<String>,
        new_name: String,
    },
    ReplaceText {
        table_name: String,
        column_name: String,
        regex: String,
        replacement: String,
    },
    AddColumn {
        table_name: String,
        column_name: String,
        expression: String,
        column_type: ColumnType,
    },
    SetValue {
        table_name: String,
        column_name: String,
        expression: String,
    },
    JoinTable {
        table_name: String,
        table_name1: String,
        join_column: String,
        new_name: String,
    },
    CopyTable {
        table_name: String,
        new_name: String,
    },
    SortTable {
        table_name: String,
        column_name: String,
        order: SortOrder,
    },
    DeleteTable {
        table_name: String,
    },
    GroupTable {
        table_name: String,
        group_column: String,
        columns: Vec<String>,
        new_name: String,
    },
    ReorderColumns {
        table_name: String,
        columns: Vec<String>,
    },
    ConvertColumn {
        table_name: String,
        column_name: String,
    },
    SpliceTables {
        new_name: String,
        selected_tables: Vec<String>,
    },
    ListTables,
    DescribeTable {
        table_name: String,
    },
    AddRow {
        table_name: String,
        fields: HashMap<String, String>,
    },
    UpdateRow {
        table_name: String,
        row_index: usize,
        fields: HashMap<String, String>,
    },
}

/// `DESCRIBE_TABLE`'s payload: schema without row data, per §4.5.
#[derive(Debug, Clone)]
pub struct TableDescription {
    pub columns: Vec<Column>,
    pub row_count: usize,
}

/// `Ok{ table?, new_name? }` per §4.5: the table a command produced or
/// mutated (when applicable), and the name it is now registered under
/// (when a command creates or renames one). `names`/`description` carry
/// the two ambient read-only commands' payloads, which don't fit the
/// table/new_name shape the mutating commands share.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub table: Option<Table>,
    pub new_name: Option<String>,
    pub names: Option<Vec<String>>,
    pub description: Option<TableDescription>,
}

impl CommandOutcome {
    pub fn table(table: Table) -> Self {
        Self { table: Some(table), ..Self::default() }
    }

    pub fn table_named(table: Table, new_name: impl Into<String>) -> Self {
        Self { table: Some(table), new_name: Some(new_name.into()), ..Self::default() }
    }

    pub fn names(names: Vec<String>) -> Self {
        Self { names: Some(names), ..Self::default() }
    }

    pub fn description(description: TableDescription) -> Self {
        Self { description: Some(description), ..Self::default() }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
