use tabdb_core::{Clock, Row, Table};

/// Lets `TOTAL(table, col)` resolve a table by name without the expression
/// crate depending on the registry crate — the engine crate implements this
/// over its real registry, tests implement it over a bare `HashMap`.
pub trait TableSource {
    fn lookup(&self, name: &str) -> Option<&Table>;
}

/// The row context an expression is evaluated against: `{ current_row,
/// current_table, registry }` per §4.2. Cheap to rebind `row_index` across
/// the rows of a batch command — the parsed `Expr` is reused unchanged.
pub struct EvalContext<'a> {
    pub table: &'a Table,
    pub row_index: usize,
    pub registry: &'a dyn TableSource,
    pub clock: &'a dyn Clock,
}

impl<'a> EvalContext<'a> {
    pub fn new(table: &'a Table, row_index: usize, registry: &'a dyn TableSource, clock: &'a dyn Clock) -> Self {
        Self { table, row_index, registry, clock }
    }

    pub fn current_row(&self) -> &Row {
        &self.table.rows[self.row_index]
    }
}
