use tabdb_helpers::IndexMap;

use crate::error::{EngineError, EngineResult};
use crate::value::ColumnType;

/// `letter/underscore followed by letters/digits/underscores`, the
/// identifier lexical class column names and expression identifiers share.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Ordered column list plus a name -> index lookup, kept in sync by every
/// mutating method (never build one by hand outside of `from_columns`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    index: IndexMap<String, usize>,
}

impl Schema {
    pub fn from_columns(columns: Vec<Column>) -> EngineResult<Self> {
        let mut index = IndexMap::default();
        for (i, col) in columns.iter().enumerate() {
            if !is_identifier(&col.name) {
                return Err(EngineError::bad_parameter(format!(
                    "column name '{}' is not a valid identifier",
                    col.name
                )));
            }
            if index.insert(col.name.clone(), i).is_some() {
                return Err(EngineError::bad_parameter(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    pub fn require_column(&self, name: &str) -> EngineResult<&Column> {
        self.column(name)
            .ok_or_else(|| EngineError::not_found(format!("column '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn push(&mut self, column: Column) -> EngineResult<()> {
        if !is_identifier(&column.name) {
            return Err(EngineError::bad_parameter(format!(
                "column name '{}' is not a valid identifier",
                column.name
            )));
        }
        if self.index.contains_key(&column.name) {
            return Err(EngineError::exists(format!("column '{}'", column.name)));
        }
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> EngineResult<()> {
        let idx = self.index_of(old).ok_or_else(|| EngineError::not_found(format!("column '{old}'")))?;
        if self.index.contains_key(new) {
            return Err(EngineError::exists(format!("column '{new}'")));
        }
        if !is_identifier(new) {
            return Err(EngineError::bad_parameter(format!(
                "column name '{new}' is not a valid identifier"
            )));
        }
        self.columns[idx].name = new.to_string();
        self.index.shift_remove(old);
        self.index.insert(new.to_string(), idx);
        Ok(())
    }

    pub fn set_type(&mut self, name: &str, ty: ColumnType) -> EngineResult<()> {
        let idx = self.index_of(name).ok_or_else(|| EngineError::not_found(format!("column '{name}'")))?;
        self.columns[idx].ty = ty;
        Ok(())
    }

    /// Remove the named columns, preserving the relative order of the rest.
    pub fn drop_columns(&mut self, names: &[String]) -> EngineResult<Vec<usize>> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            indices.push(self.index_of(name).ok_or_else(|| EngineError::not_found(format!("column '{name}'")))?);
        }
        let keep: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, c)| c.clone())
            .collect();
        *self = Schema::from_columns(keep)?;
        Ok(indices)
    }

    /// Move `front` to the head, in the order given, keeping the rest in
    /// their original relative order.
    pub fn reorder(&mut self, front: &[String]) -> EngineResult<()> {
        for name in front {
            self.require_column(name)?;
        }
        let mut reordered: Vec<Column> = Vec::with_capacity(self.columns.len());
        for name in front {
            reordered.push(self.column(name).unwrap().clone());
        }
        for col in &self.columns {
            if !front.contains(&col.name) {
                reordered.push(col.clone());
            }
        }
        *self = Schema::from_columns(reordered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(cols: &[(&str, ColumnType)]) -> Schema {
        Schema::from_columns(
            cols.iter().map(|(n, t)| Column::new(*n, *t)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_identifier_names() {
        let err = Schema::from_columns(vec![Column::new("1bad", ColumnType::Text)]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Schema::from_columns(vec![
            Column::new("a", ColumnType::Text),
            Column::new("a", ColumnType::Int),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn drop_columns_preserves_remaining_order() {
        let mut s = schema(&[
            ("a", ColumnType::Text),
            ("b", ColumnType::Int),
            ("c", ColumnType::Real),
        ]);
        s.drop_columns(&["b".to_string()]).unwrap();
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn reorder_moves_named_columns_to_front() {
        let mut s = schema(&[
            ("a", ColumnType::Text),
            ("b", ColumnType::Int),
            ("c", ColumnType::Real),
        ]);
        s.reorder(&["c".to_string()]).unwrap();
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }
}
