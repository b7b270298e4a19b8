use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tabdb_core::ColumnType;
use tabdb_engine::SortOrder;

/// Output format shared by every subcommand that returns a payload: a
/// human-readable table render, or a `serde_json`-encoded one for scripted
/// callers (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Format::Text => "text",
            Format::Json => "json",
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "tabdb")]
#[command(about = "In-memory tabular data engine driven by a typed schema and a rule-based command algebra.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Directory tables and rule files are read from / written to.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Output format for commands that return a payload.
    #[arg(long, short, global = true, default_value_t, value_enum)]
    pub format: Format,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// One subcommand per §4.5 command, plus `load` to populate the registry
/// from the configured data directory.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load every CSV file in the data directory into the registry.
    Load,
    /// List every table currently in the registry.
    List,
    /// Describe a table's schema and row count.
    Describe { table_name: String },
    /// Write a table back to `<data_dir>/<table>.CSV`.
    Save { table_name: String },
    /// Run the row-ingress pipeline (INIT -> fields -> FIXUP -> CHECK).
    AddRow { table_name: String, #[arg(value_parser = parse_field)] fields: Vec<(String, String)> },
    /// Run the row-update pipeline (fields -> FIXUP -> CHECK).
    UpdateRow {
        table_name: String,
        row_index: usize,
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Append a derived column of an explicit declared type.
    AddColumn { table_name: String, column_name: String, expression: String, #[arg(value_enum)] column_type: ColumnTypeArg },
    /// Overwrite an existing column with a derived expression.
    SetValue { table_name: String, column_name: String, expression: String },
    /// Keep rows where `expression` evaluates to zero.
    DeleteRows { table_name: String, expression: String },
    /// Remove the named columns from schema and every row.
    DropColumns { table_name: String, columns: Vec<String> },
    /// Rename a column in place.
    RenameColumn { table_name: String, old: String, new: String },
    /// Rename a table in the registry.
    RenameTable { table_name: String, new_name: String },
    /// Deep-copy a table under a new name.
    CopyTable { table_name: String, new_name: String },
    /// Remove a table from the registry (on-disk file untouched).
    DeleteTable { table_name: String },
    /// Stable-sort a table's rows by one column.
    SortTable { table_name: String, column_name: String, #[arg(value_enum)] order: SortOrderArg },
    /// Group rows by an optional TEXT column, summing every numeric column.
    CollapseTable { table_name: String, new_name: String, #[arg(long)] column_name: Option<String> },
    /// Group rows by a TEXT column, summing the named columns.
    GroupTable { table_name: String, group_column: String, new_name: String, columns: Vec<String> },
    /// Move the named columns to the front of the schema.
    ReorderColumns { table_name: String, columns: Vec<String> },
    /// Convert a TEXT column to REAL in place.
    ConvertColumn { table_name: String, column_name: String },
    /// Global regex replace over a TEXT column.
    ReplaceText { table_name: String, column_name: String, regex: String, replacement: String },
    /// Inner join on equality of a shared column.
    JoinTable { table_name: String, table_name1: String, join_column: String, new_name: String },
    /// Concatenate rows of tables sharing an identical schema.
    SpliceTables { new_name: String, selected_tables: Vec<String> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColumnTypeArg {
    Text,
    Int,
    Real,
}

impl From<ColumnTypeArg> for ColumnType {
    fn from(value: ColumnTypeArg) -> Self {
        match value {
            ColumnTypeArg::Text => ColumnType::Text,
            ColumnTypeArg::Int => ColumnType::Int,
            ColumnTypeArg::Real => ColumnType::Real,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

impl From<SortOrderArg> for SortOrder {
    fn from(value: SortOrderArg) -> Self {
        match value {
            SortOrderArg::Asc => SortOrder::Asc,
            SortOrderArg::Desc => SortOrder::Desc,
        }
    }
}

/// Parses an `add-row`/`update-row` field argument in `column=value` form.
fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `column=value`, got '{s}'"))
}

pub(crate) fn fields_map(fields: Vec<(String, String)>) -> HashMap<String, String> {
    fields.into_iter().collect()
}
