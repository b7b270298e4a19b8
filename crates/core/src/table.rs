use crate::error::{EngineError, EngineResult};
use crate::row::Row;
use crate::schema::{Column, Schema};
use crate::value::{ColumnType, Value};

/// `{ name, schema, rows, source_file? }`. A table is the sole owner of its
/// rows and schema — every command that produces a table (rather than
/// mutating one in place) builds a fresh, deep-copied `Table`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
    pub source_file: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, rows: Vec::new(), source_file: None }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> EngineResult<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| EngineError::not_found(format!("column '{name}' in table '{}'", self.name)))
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn append_column(&mut self, column: Column, values: Vec<Value>) -> EngineResult<()> {
        if values.len() != self.rows.len() {
            return Err(EngineError::bad_parameter("column values length mismatch"));
        }
        self.schema.push(column)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[String]) -> EngineResult<()> {
        let indices = self.schema.drop_columns(names)?;
        for row in &mut self.rows {
            row.remove_indices(&indices);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> EngineResult<()> {
        self.schema.rename(old, new)
    }

    pub fn reorder_columns(&mut self, front: &[String]) -> EngineResult<()> {
        let old_names: Vec<String> = self.schema.names().map(|s| s.to_string()).collect();
        self.schema.reorder(front)?;
        let new_names: Vec<String> = self.schema.names().map(|s| s.to_string()).collect();
        let position_of_old: Vec<usize> = new_names
            .iter()
            .map(|n| old_names.iter().position(|o| o == n).unwrap())
            .collect();
        self.rows = self.rows.iter().map(|r| r.reorder(&position_of_old)).collect();
        Ok(())
    }

    pub fn convert_column_to_real(&mut self, name: &str) -> EngineResult<()> {
        let idx = self.column_index(name)?;
        if self.schema.columns()[idx].ty != ColumnType::Text {
            return Err(EngineError::type_mismatch(format!("column '{name}' is not TEXT")));
        }
        for row in &mut self.rows {
            if let Some(Value::Text(s)) = row.get(idx).cloned().as_ref() {
                if let Some(v) = crate::value::parse_real_lenient(s) {
                    row.set(idx, Value::Real(v));
                }
            }
        }
        self.schema.set_type(name, ColumnType::Real)
    }

    /// Deep copy under a new name; used by `COPY_TABLE` and as the basis for
    /// every table-creating command.
    pub fn deep_copy(&self, new_name: impl Into<String>) -> Table {
        Table {
            name: new_name.into(),
            schema: self.schema.clone(),
            rows: self.rows.clone(),
            source_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_amount_table() -> Table {
        let schema = Schema::from_columns(vec![Column::new("Amount", ColumnType::Text)]).unwrap();
        let mut table = Table::new("t", schema);
        table.push_row(Row::new(vec![Value::Text("$1,234.50".into())]));
        table.push_row(Row::new(vec![Value::Text("not a number".into())]));
        table
    }

    #[test]
    fn convert_column_to_real_strips_currency_formatting() {
        let mut table = text_amount_table();
        table.convert_column_to_real("Amount").unwrap();
        assert_eq!(table.schema.require_column("Amount").unwrap().ty, ColumnType::Real);
        assert_eq!(table.rows[0].get(0), Some(&Value::Real(1234.50)));
    }

    #[test]
    fn convert_column_to_real_leaves_unparsable_cell_unchanged() {
        let mut table = text_amount_table();
        table.convert_column_to_real("Amount").unwrap();
        assert_eq!(table.rows[1].get(0), Some(&Value::Text("not a number".into())));
    }

    #[test]
    fn convert_column_to_real_rejects_non_text_column() {
        let schema = Schema::from_columns(vec![Column::new("Amount", ColumnType::Int)]).unwrap();
        let mut table = Table::new("t", schema);
        table.push_row(Row::new(vec![Value::Int(5)]));
        assert!(matches!(table.convert_column_to_real("Amount"), Err(EngineError::TypeMismatch(_))));
    }

    #[test]
    fn deep_copy_produces_independent_rows() {
        let mut original = text_amount_table();
        let copy = original.deep_copy("copy");
        original.rows[0].set(0, Value::Text("changed".into()));
        assert_eq!(copy.rows[0].get(0), Some(&Value::Text("$1,234.50".into())));
        assert_eq!(copy.name, "copy");
        assert!(copy.source_file.is_none());
    }

    #[test]
    fn drop_columns_then_add_column_preserves_row_count() {
        let mut table = text_amount_table();
        let row_count = table.row_count();
        table.drop_columns(&["Amount".to_string()]).unwrap();
        table
            .append_column(Column::new("New", ColumnType::Int), vec![Value::Int(0); row_count])
            .unwrap();
        assert_eq!(table.row_count(), row_count);
    }
}
