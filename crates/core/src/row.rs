use crate::schema::Schema;
use crate::value::Value;

/// An ordered tuple of cells matching a [`Schema`]. Positional, not keyed —
/// callers resolve a column by asking the schema for its index.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    pub fn default_for(schema: &Schema) -> Self {
        Self {
            cells: schema.columns().iter().map(|c| c.ty.zero_value()).collect(),
        }
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    pub fn get_by_name(&self, schema: &Schema, name: &str) -> Option<&Value> {
        schema.index_of(name).and_then(|i| self.cells.get(i))
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.cells[index] = value;
    }

    pub fn push(&mut self, value: Value) {
        self.cells.push(value);
    }

    pub fn remove_indices(&mut self, indices: &[usize]) {
        let mut i = 0;
        self.cells.retain(|_| {
            let keep = !indices.contains(&i);
            i += 1;
            keep
        });
    }

    /// Reorder cells to match a schema reorder, given the new column order
    /// as indices into the old schema.
    pub fn reorder(&self, old_to_new_positions: &[usize]) -> Row {
        let mut cells: Vec<Value> = Vec::with_capacity(self.cells.len());
        for &old_idx in old_to_new_positions {
            cells.push(self.cells[old_idx].clone());
        }
        Row::new(cells)
    }
}
