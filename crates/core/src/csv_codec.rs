use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::row::Row;
use crate::schema::{Column, Schema};
use crate::table::Table;
use crate::value::{ColumnType, Value};

/// Derive a table name from a filename by stripping a case-insensitive
/// `.csv` suffix (§4.1).
pub fn table_name_from_filename(path: &Path) -> String {
    let stem = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if stem.len() >= 4 && stem[stem.len() - 4..].eq_ignore_ascii_case(".csv") {
        stem[..stem.len() - 4].to_string()
    } else {
        stem.to_string()
    }
}

/// Parse the schema header line: comma-separated `name` or `name:TYPE`.
fn parse_schema_header(fields: &[String]) -> EngineResult<Schema> {
    let columns: Vec<Column> = fields
        .iter()
        .map(|field| {
            let field = field.trim();
            match field.split_once(':') {
                Some((name, ty)) => Column::new(name.trim(), ty.trim().parse().unwrap()),
                None => Column::new(field, ColumnType::Text),
            }
        })
        .collect();
    Schema::from_columns(columns)
}

fn parse_row(fields: &[String], schema: &Schema) -> Row {
    let cols = schema.columns();
    let mut cells = Vec::with_capacity(cols.len());
    for (i, col) in cols.iter().enumerate() {
        let raw = fields.get(i).map(|s| s.as_str()).unwrap_or("");
        let value = match col.ty {
            ColumnType::Text => Value::Text(raw.to_string()),
            ColumnType::Int => Value::Int(raw.trim().parse::<i64>().unwrap_or(0)),
            ColumnType::Real => Value::Real(crate::value::parse_real_lenient(raw).unwrap_or(0.0)),
        };
        cells.push(value);
    }
    Row::new(cells)
}

/// Parse a whole CSV document (schema header + rows) into a table. The
/// first non-empty line is the header; blank lines before it are skipped.
pub fn parse_table(name: impl Into<String>, content: &str) -> EngineResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let mut header_fields: Option<Vec<String>> = None;
    let mut pending_rows: Vec<Vec<String>> = Vec::new();

    for record in &mut records {
        let record = record.map_err(|e| EngineError::bad_parameter(format!("malformed CSV: {e}")))?;
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if header_fields.is_none() {
            header_fields = Some(fields.iter().map(|f| f.trim().to_string()).collect());
        } else {
            pending_rows.push(fields);
        }
    }

    let header_fields = header_fields.unwrap_or_default();
    let schema = parse_schema_header(&header_fields)?;
    let mut table = Table::new(name, schema.clone());
    for fields in pending_rows {
        table.push_row(parse_row(&fields, &schema));
    }
    Ok(table)
}

fn needs_quoting(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\r') || field.contains('\n')
}

fn quote_field(field: &str) -> String {
    if needs_quoting(field) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Serialize a table to the §4.1 text format: a `name:TYPE,...` header
/// followed by one row per line.
pub fn serialize_table(table: &Table) -> String {
    let mut out = String::new();
    let header = table
        .schema
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.ty))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&header);
    out.push('\n');

    for row in &table.rows {
        let fields: Vec<String> = row
            .cells()
            .iter()
            .map(|v| match v {
                Value::Real(r) => quote_field(&crate::value::format_real(*r)),
                other => quote_field(&other.display_string()),
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub fn load_table_file(path: &Path) -> EngineResult<Table> {
    let content = fs::read_to_string(path)?;
    let name = table_name_from_filename(path);
    let mut table = parse_table(name, &content)?;
    table.source_file = Some(path.to_string_lossy().to_string());
    Ok(table)
}

pub fn save_table_file(table: &Table, path: &Path) -> EngineResult<()> {
    let content = serialize_table(table);
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Enumerate `*.csv`/`*.CSV` files in `dir` and load each into a table.
pub fn load_directory(dir: &Path) -> EngineResult<Vec<Table>> {
    let mut tables = Vec::new();
    if !dir.is_dir() {
        return Ok(tables);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if ext.eq_ignore_ascii_case("csv") {
                    tables.push(load_table_file(&path)?);
                }
            }
        }
    }
    Ok(tables)
}
