use std::path::Path;

use regex::Regex;
use tabdb_core::{Clock, Column, ColumnType, EngineError, EngineResult, Row, Table, Value};
use tabdb_expr::{eval, parse, EvalContext};

use crate::command::{CommandOutcome, SortOrder, TableDescription};
use crate::registry::Registry;

/// Evaluates `expr` once per row of `table_name`'s current rows, against a
/// snapshot taken before any mutation so every row sees the same
/// pre-command state (§4.5: "observe the source tables' current state as
/// of command entry"). Returns one value per row in row order.
fn eval_per_row(registry: &Registry, table_name: &str, expr_source: &str, clock: &dyn Clock) -> EngineResult<Vec<Value>> {
    let expr = parse(expr_source)?;
    let snapshot = registry.get(table_name)?.clone();
    let mut results = Vec::with_capacity(snapshot.row_count());
    for i in 0..snapshot.row_count() {
        let ctx = EvalContext::new(&snapshot, i, registry, clock);
        results.push(eval(&expr, &ctx)?);
    }
    Ok(results)
}

pub fn save_table(registry: &Registry, table_name: &str, data_dir: &Path) -> EngineResult<CommandOutcome> {
    registry.save_table(table_name, data_dir)?;
    Ok(CommandOutcome::table(registry.get(table_name)?.clone()))
}

pub fn drop_columns(registry: &mut Registry, table_name: &str, columns: &[String]) -> EngineResult<CommandOutcome> {
    let table = registry.get_mut(table_name)?;
    table.drop_columns(columns)?;
    Ok(CommandOutcome::table(table.clone()))
}

pub fn rename_column(registry: &mut Registry, table_name: &str, old: &str, new: &str) -> EngineResult<CommandOutcome> {
    let table = registry.get_mut(table_name)?;
    table.rename_column(old, new)?;
    Ok(CommandOutcome::table(table.clone()))
}

pub fn rename_table(registry: &mut Registry, table_name: &str, new_name: &str) -> EngineResult<CommandOutcome> {
    registry.rename(table_name, new_name)?;
    Ok(CommandOutcome::table_named(registry.get(new_name)?.clone(), new_name))
}

pub fn delete_rows(registry: &mut Registry, table_name: &str, expression: &str, clock: &dyn Clock) -> EngineResult<CommandOutcome> {
    let expr = parse(expression)?;
    let snapshot = registry.get(table_name)?.clone();
    let mut keep = Vec::with_capacity(snapshot.row_count());
    for i in 0..snapshot.row_count() {
        let ctx = EvalContext::new(&snapshot, i, registry, clock);
        let retain = match eval(&expr, &ctx) {
            Ok(v) => match v.as_f64() {
                Some(n) => n == 0.0,
                None => true, // non-numeric result: safe default, keep the row
            },
            Err(_) => true, // evaluator error: safe default, keep the row
        };
        keep.push(retain);
    }
    let table = registry.get_mut(table_name)?;
    let mut kept_rows = Vec::with_capacity(table.rows.len());
    for (row, retain) in table.rows.drain(..).zip(keep) {
        if retain {
            kept_rows.push(row);
        }
    }
    table.rows = kept_rows;
    Ok(CommandOutcome::table(table.clone()))
}

/// Shared aggregation core for `COLLAPSE_TABLE` (optional group column,
/// falls back to a single aggregate row) and `GROUP_TABLE` (mandatory
/// group column, explicit summed-column list).
fn sum_group_by(table: &Table, group_column: Option<&str>, sum_columns: &[String], new_name: &str) -> EngineResult<Table> {
    let mut new_schema_cols = Vec::new();
    if let Some(g) = group_column {
        let col = table.schema.require_column(g)?;
        if col.ty != ColumnType::Text {
            return Err(EngineError::type_mismatch(format!("group column '{g}' must be TEXT")));
        }
        new_schema_cols.push(Column::new(g, ColumnType::Text));
    }
    let sum_indices: Vec<(usize, &str)> = if sum_columns.is_empty() {
        table
            .schema
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.ty != ColumnType::Text)
            .map(|(i, c)| (i, c.name.as_str()))
            .collect()
    } else {
        sum_columns
            .iter()
            .map(|name| {
                let idx = table.column_index(name)?;
                let col = &table.schema.columns()[idx];
                if col.ty == ColumnType::Text {
                    return Err(EngineError::type_mismatch(format!("column '{name}' is not numeric")));
                }
                Ok((idx, name.as_str()))
            })
            .collect::<EngineResult<Vec<_>>>()?
    };
    for (_, name) in &sum_indices {
        new_schema_cols.push(Column::new(*name, ColumnType::Real));
    }
    let schema = tabdb_core::Schema::from_columns(new_schema_cols)?;
    let mut out = Table::new(new_name, schema);

    let group_idx = group_column.map(|g| table.column_index(g)).transpose()?;
    let mut order: Vec<String> = Vec::new();
    let mut sums: tabdb_helpers::IndexMap<String, Vec<f64>> = tabdb_helpers::IndexMap::default();
    for row in &table.rows {
        let key = match group_idx {
            Some(i) => row.get(i).unwrap().display_string(),
            None => String::new(),
        };
        if !sums.contains_key(&key) {
            sums.insert(key.clone(), vec![0.0; sum_indices.len()]);
            order.push(key.clone());
        }
        let acc = sums.get_mut(&key).unwrap();
        for (slot, (idx, _)) in sum_indices.iter().enumerate() {
            acc[slot] += row.get(*idx).and_then(Value::as_f64).unwrap_or(0.0);
        }
    }
    for key in &order {
        let acc = &sums[key];
        let mut cells = Vec::with_capacity(out.schema.len());
        if group_column.is_some() {
            cells.push(Value::Text(key.clone()));
        }
        cells.extend(acc.iter().map(|v| Value::Real(*v)));
        out.push_row(Row::new(cells));
    }
    Ok(out)
}

pub fn collapse_table(registry: &mut Registry, table_name: &str, column_name: Option<&str>, new_name: &str) -> EngineResult<CommandOutcome> {
    let table = registry.get(table_name)?;
    let grouped = sum_group_by(table, column_name, &[], new_name)?;
    registry.insert(grouped.clone())?;
    Ok(CommandOutcome::table_named(grouped, new_name))
}

pub fn group_table(registry: &mut Registry, table_name: &str, group_column: &str, columns: &[String], new_name: &str) -> EngineResult<CommandOutcome> {
    let table = registry.get(table_name)?;
    let grouped = sum_group_by(table, Some(group_column), columns, new_name)?;
    registry.insert(grouped.clone())?;
    Ok(CommandOutcome::table_named(grouped, new_name))
}

pub fn replace_text(registry: &mut Registry, table_name: &str, column_name: &str, pattern: &str, replacement: &str) -> EngineResult<CommandOutcome> {
    let re = Regex::new(pattern).map_err(|e| EngineError::bad_parameter(format!("invalid regex: {e}")))?;
    let table = registry.get_mut(table_name)?;
    let idx = table.column_index(column_name)?;
    if table.schema.columns()[idx].ty != ColumnType::Text {
        return Err(EngineError::type_mismatch(format!("column '{column_name}' is not TEXT")));
    }
    for row in &mut table.rows {
        if let Some(Value::Text(s)) = row.get(idx) {
            let replaced = re.replace_all(s, replacement).into_owned();
            row.set(idx, Value::Text(replaced));
        }
    }
    Ok(CommandOutcome::table(table.clone()))
}

pub fn add_column(
    registry: &mut Registry,
    table_name: &str,
    column_name: &str,
    expression: &str,
    column_type: ColumnType,
    clock: &dyn Clock,
) -> EngineResult<CommandOutcome> {
    let values = eval_per_row(registry, table_name, expression, clock)?;
    let table = registry.get_mut(table_name)?;
    table.append_column(Column::new(column_name, column_type), values)?;
    Ok(CommandOutcome::table(table.clone()))
}

pub fn set_value(registry: &mut Registry, table_name: &str, column_name: &str, expression: &str, clock: &dyn Clock) -> EngineResult<CommandOutcome> {
    let values = eval_per_row(registry, table_name, expression, clock)?;
    let table = registry.get_mut(table_name)?;
    let idx = table.column_index(column_name)?;
    for (row, value) in table.rows.iter_mut().zip(values) {
        row.set(idx, value);
    }
    Ok(CommandOutcome::table(table.clone()))
}

pub fn join_table(registry: &mut Registry, left_name: &str, right_name: &str, join_column: &str, new_name: &str) -> EngineResult<CommandOutcome> {
    let left = registry.get(left_name)?;
    let right = registry.get(right_name)?;
    let left_join_idx = left.column_index(join_column)?;
    let right_join_idx = right.column_index(join_column)?;

    let mut schema_cols: Vec<Column> = left.schema.columns().to_vec();
    let right_extra: Vec<(usize, &str)> = right
        .schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != right_join_idx && !left.schema.contains(&c.name))
        .map(|(i, c)| (i, c.name.as_str()))
        .collect();
    for (_, name) in &right_extra {
        schema_cols.push(right.schema.require_column(name)?.clone());
    }
    let schema = tabdb_core::Schema::from_columns(schema_cols)?;
    let mut out = Table::new(new_name, schema);

    for left_row in &left.rows {
        let key = left_row.get(left_join_idx).unwrap();
        let matched = right.rows.iter().find(|r| r.get(right_join_idx) == Some(key));
        let mut cells: Vec<Value> = left_row.cells().to_vec();
        match matched {
            Some(right_row) => {
                for (idx, _) in &right_extra {
                    cells.push(right_row.get(*idx).unwrap().clone());
                }
            }
            None => {
                for (idx, _) in &right_extra {
                    cells.push(right.schema.columns()[*idx].ty.zero_value());
                }
            }
        }
        out.push_row(Row::new(cells));
    }

    registry.insert(out.clone())?;
    Ok(CommandOutcome::table_named(out, new_name))
}

pub fn copy_table(registry: &mut Registry, table_name: &str, new_name: &str) -> EngineResult<CommandOutcome> {
    let copy = registry.get(table_name)?.deep_copy(new_name);
    registry.insert(copy.clone())?;
    Ok(CommandOutcome::table_named(copy, new_name))
}

pub fn sort_table(registry: &mut Registry, table_name: &str, column_name: &str, order: SortOrder) -> EngineResult<CommandOutcome> {
    let table = registry.get_mut(table_name)?;
    let idx = table.column_index(column_name)?;
    table.rows.sort_by(|a, b| {
        let cmp = match (a.get(idx).unwrap(), b.get(idx).unwrap()) {
            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            (x, y) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(std::cmp::Ordering::Equal),
        };
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
    Ok(CommandOutcome::table(table.clone()))
}

pub fn delete_table(registry: &mut Registry, table_name: &str) -> EngineResult<CommandOutcome> {
    registry.remove(table_name)?;
    Ok(CommandOutcome::empty())
}

pub fn reorder_columns(registry: &mut Registry, table_name: &str, columns: &[String]) -> EngineResult<CommandOutcome> {
    let table = registry.get_mut(table_name)?;
    table.reorder_columns(columns)?;
    Ok(CommandOutcome::table(table.clone()))
}

pub fn convert_column(registry: &mut Registry, table_name: &str, column_name: &str) -> EngineResult<CommandOutcome> {
    let table = registry.get_mut(table_name)?;
    table.convert_column_to_real(column_name)?;
    Ok(CommandOutcome::table(table.clone()))
}

pub fn splice_tables(registry: &mut Registry, new_name: &str, selected_tables: &[String]) -> EngineResult<CommandOutcome> {
    if selected_tables.is_empty() {
        return Err(EngineError::bad_parameter("SPLICE_TABLES requires at least one table"));
    }
    let schema = registry.get(&selected_tables[0])?.schema.clone();
    let mut out = Table::new(new_name, schema.clone());
    for name in selected_tables {
        let t = registry.get(name)?;
        if t.schema != schema {
            return Err(EngineError::type_mismatch(format!("table '{name}' does not share the splice schema")));
        }
        out.rows.extend(t.rows.iter().cloned());
    }
    registry.insert(out.clone())?;
    Ok(CommandOutcome::table_named(out, new_name))
}

pub fn list_tables(registry: &Registry) -> EngineResult<CommandOutcome> {
    Ok(CommandOutcome::names(registry.list()))
}

pub fn describe_table(registry: &Registry, table_name: &str) -> EngineResult<CommandOutcome> {
    let table = registry.get(table_name)?;
    Ok(CommandOutcome::description(TableDescription {
        columns: table.schema.columns().to_vec(),
        row_count: table.row_count(),
    }))
}
