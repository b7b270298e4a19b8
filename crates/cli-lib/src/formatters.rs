use tabdb_core::{Column, Table, Value};
use tabdb_engine::{CommandOutcome, TableDescription};

use crate::commands::Format;

fn cell_text(v: &Value) -> String {
    match v {
        Value::Real(r) => tabdb_core::value::format_real(*r),
        other => other.display_string(),
    }
}

fn render_table_text(table: &Table) -> String {
    let header = table.schema.columns().iter().map(|c| format!("{}:{}", c.name, c.ty)).collect::<Vec<_>>().join(",");
    let mut out = header;
    out.push('\n');
    for row in &table.rows {
        out.push_str(&row.cells().iter().map(cell_text).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

fn render_description_text(desc: &TableDescription) -> String {
    let cols: Vec<String> = desc.columns.iter().map(|Column { name, ty }| format!("{name}:{ty}")).collect();
    format!("columns: {}\nrows: {}\n", cols.join(","), desc.row_count)
}

/// Renders a [`CommandOutcome`] per `--format`, the way the reference
/// workspace's own CLI picks between an output-stream formatter and a JSON
/// formatter (§6.1).
pub fn render(outcome: &CommandOutcome, format: Format) -> String {
    match format {
        Format::Text => render_text(outcome),
        Format::Json => render_json(outcome),
    }
}

fn render_text(outcome: &CommandOutcome) -> String {
    if let Some(names) = &outcome.names {
        return names.join("\n");
    }
    if let Some(desc) = &outcome.description {
        return render_description_text(desc);
    }
    if let Some(table) = &outcome.table {
        let mut out = String::new();
        if let Some(new_name) = &outcome.new_name {
            out.push_str(&format!("# {new_name}\n"));
        }
        out.push_str(&render_table_text(table));
        return out;
    }
    String::new()
}

fn render_json(outcome: &CommandOutcome) -> String {
    let payload = serde_json::json!({
        "table": outcome.table.as_ref().map(table_json),
        "new_name": outcome.new_name,
        "names": outcome.names,
        "description": outcome.description.as_ref().map(|d| serde_json::json!({
            "columns": d.columns.iter().map(|c| serde_json::json!({"name": c.name, "type": c.ty.to_string()})).collect::<Vec<_>>(),
            "row_count": d.row_count,
        })),
    });
    serde_json::to_string_pretty(&payload).unwrap_or_default()
}

fn table_json(table: &Table) -> serde_json::Value {
    let columns: Vec<serde_json::Value> =
        table.schema.columns().iter().map(|c| serde_json::json!({"name": c.name, "type": c.ty.to_string()})).collect();
    let rows: Vec<Vec<serde_json::Value>> = table
        .rows
        .iter()
        .map(|row| {
            row.cells()
                .iter()
                .map(|v| match v {
                    Value::Text(s) => serde_json::Value::String(s.clone()),
                    Value::Int(i) => serde_json::json!(i),
                    Value::Real(r) => serde_json::json!(tabdb_core::value::format_real(*r).parse::<f64>().unwrap_or(*r)),
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "name": table.name, "columns": columns, "rows": rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabdb_core::{ColumnType, Row, Schema};

    #[test]
    fn text_format_renders_schema_header_and_rows() {
        let schema = Schema::from_columns(vec![Column::new("Amount", ColumnType::Real)]).unwrap();
        let mut table = Table::new("sales", schema);
        table.push_row(Row::new(vec![Value::Real(110.55)]));
        let outcome = CommandOutcome::table(table);
        let rendered = render(&outcome, Format::Text);
        assert!(rendered.contains("Amount:REAL"));
        assert!(rendered.contains("110.6"));
    }

    #[test]
    fn json_format_is_valid_json() {
        let schema = Schema::from_columns(vec![Column::new("Amount", ColumnType::Real)]).unwrap();
        let table = Table::new("sales", schema);
        let outcome = CommandOutcome::table(table);
        let rendered = render(&outcome, Format::Json);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["table"]["name"], "sales");
    }

    #[test]
    fn names_render_one_per_line() {
        let outcome = CommandOutcome::names(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(render(&outcome, Format::Text), "a\nb");
    }
}
