use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tabdb_core::{Clock, EngineError, EngineResult, Row, Schema, Table, Value};
use tabdb_expr::{Expr, TableSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    Init,
    Fixup,
    Check,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub op: RuleOp,
    pub column: String,
    pub source: String,
    pub expr: Expr,
}

/// Parses a `.RUL`/`.rul` file: one `OPERATION column_name expression` line
/// per non-blank, non-`#`-comment line, in file order (§4.3).
pub fn parse_rule_file(content: &str) -> EngineResult<Vec<Rule>> {
    let mut rules = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.splitn(3, char::is_whitespace);
        let op = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        let expression = parts.next().unwrap_or_default();
        if rest.is_empty() || expression.is_empty() {
            return Err(EngineError::bad_parameter(format!(
                "malformed rule at line {}: '{line}'",
                lineno + 1
            )));
        }
        let op = match op.to_ascii_uppercase().as_str() {
            "INIT" => RuleOp::Init,
            "FIXUP" => RuleOp::Fixup,
            "CHECK" => RuleOp::Check,
            other => return Err(EngineError::bad_parameter(format!("unknown rule operation '{other}'"))),
        };
        let expr = tabdb_expr::parse(expression)?;
        rules.push(Rule { op, column: rest.to_string(), source: expression.to_string(), expr });
    }
    Ok(rules)
}

fn rule_file_path(data_dir: &Path, table_basename: &str) -> Option<PathBuf> {
    for ext in ["RUL", "rul"] {
        let candidate = data_dir.join(format!("{table_basename}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Parses rule files lazily per table, caching on `(path, mtime)` so an
/// unchanged file is not reparsed on every row ingress (§4.3, §9).
#[derive(Debug, Default)]
pub struct RuleCache {
    entries: HashMap<PathBuf, (SystemTime, Vec<Rule>)>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules for `table_basename` under `data_dir`, or an empty
    /// list if no rule file exists.
    pub fn rules_for(&mut self, data_dir: &Path, table_basename: &str) -> EngineResult<&[Rule]> {
        let Some(path) = rule_file_path(data_dir, table_basename) else {
            return Ok(&[]);
        };
        let mtime = fs::metadata(&path)?.modified()?;
        let needs_reload = match self.entries.get(&path) {
            Some((cached_mtime, _)) => *cached_mtime != mtime,
            None => true,
        };
        if needs_reload {
            let content = fs::read_to_string(&path)?;
            let rules = parse_rule_file(&content)?;
            self.entries.insert(path.clone(), (mtime, rules));
        }
        Ok(&self.entries.get(&path).unwrap().1)
    }
}

/// Outcome of `ADD_ROW`/`UPDATE_ROW`'s ingress pipeline.
pub enum IngressOutcome {
    Committed(Row),
    Rejected(EngineError),
}

fn eval_against(rules_table: &Table, row: &Row, row_index: usize, expr: &Expr, registry: &dyn TableSource, clock: &dyn Clock) -> EngineResult<Value> {
    // Evaluate against a one-off view: a table with the candidate row
    // substituted in place, so field refs and SUM/NUM_ROWS/CURR_ROW see
    // the row under construction rather than whatever was last committed.
    let mut scratch = rules_table.clone();
    if row_index < scratch.rows.len() {
        scratch.rows[row_index] = row.clone();
    } else {
        scratch.rows.push(row.clone());
    }
    let ctx = tabdb_expr::EvalContext::new(&scratch, row_index, registry, clock);
    tabdb_expr::eval(expr, &ctx)
}

/// Runs the row-ingress state machine for `ADD_ROW` (§4.3, §4.5.x):
/// `Fresh -> Initialized -> TypedAndFilled -> FixedUp -> Checked ->
/// Committed | Rejected`.
#[allow(clippy::too_many_arguments)]
pub fn ingress_add(
    table: &Table,
    fields: &HashMap<String, String>,
    rules: &[Rule],
    registry: &dyn TableSource,
    clock: &dyn Clock,
) -> IngressOutcome {
    let row_index = table.rows.len();
    let mut row = Row::default_for(&table.schema);

    // INIT only on the add path.
    for rule in rules.iter().filter(|r| r.op == RuleOp::Init) {
        let Some(idx) = table.schema.index_of(&rule.column) else { continue };
        match eval_against(table, &row, row_index, &rule.expr, registry, clock) {
            Ok(v) => row.set(idx, v.coerce(table.schema.columns()[idx].ty)),
            Err(e) => return IngressOutcome::Rejected(e),
        }
    }

    // User-supplied fields, converting to column type; non-parsable
    // INT/REAL is a validation error for that column.
    if let Err(e) = apply_user_fields(&table.schema, &mut row, fields) {
        return IngressOutcome::Rejected(e);
    }

    run_fixup_and_check(table, &mut row, row_index, rules, registry, clock)
}

/// Runs the row-*update* ingress pipeline: same as `ingress_add` without
/// `INIT`, starting from the row's current committed values.
#[allow(clippy::too_many_arguments)]
pub fn ingress_update(
    table: &Table,
    row_index: usize,
    fields: &HashMap<String, String>,
    rules: &[Rule],
    registry: &dyn TableSource,
    clock: &dyn Clock,
) -> IngressOutcome {
    let Some(existing) = table.rows.get(row_index) else {
        return IngressOutcome::Rejected(EngineError::not_found(format!("row {row_index}")));
    };
    let mut row = existing.clone();

    if let Err(e) = apply_user_fields(&table.schema, &mut row, fields) {
        return IngressOutcome::Rejected(e);
    }

    run_fixup_and_check(table, &mut row, row_index, rules, registry, clock)
}

fn apply_user_fields(schema: &Schema, row: &mut Row, fields: &HashMap<String, String>) -> EngineResult<()> {
    let mut bad_columns = Vec::new();
    for (name, text) in fields {
        let Some(idx) = schema.index_of(name) else {
            return Err(EngineError::not_found(format!("column '{name}'")));
        };
        match Value::parse_strict(text, schema.columns()[idx].ty) {
            Ok(v) => row.set(idx, v),
            Err(()) => bad_columns.push(name.clone()),
        }
    }
    if bad_columns.is_empty() {
        Ok(())
    } else {
        Err(EngineError::validation_failure(bad_columns, "could not parse value for declared column type"))
    }
}

fn run_fixup_and_check(
    table: &Table,
    row: &mut Row,
    row_index: usize,
    rules: &[Rule],
    registry: &dyn TableSource,
    clock: &dyn Clock,
) -> IngressOutcome {
    for rule in rules.iter().filter(|r| r.op == RuleOp::Fixup) {
        let Some(idx) = table.schema.index_of(&rule.column) else { continue };
        match eval_against(table, row, row_index, &rule.expr, registry, clock) {
            Ok(v) => row.set(idx, v.coerce(table.schema.columns()[idx].ty)),
            Err(e) => return IngressOutcome::Rejected(e),
        }
    }

    let mut failed_columns = Vec::new();
    for rule in rules.iter().filter(|r| r.op == RuleOp::Check) {
        match eval_against(table, row, row_index, &rule.expr, registry, clock) {
            Ok(v) if v.is_truthy() => {}
            Ok(_) => failed_columns.push(rule.column.clone()),
            Err(_) => failed_columns.push(rule.column.clone()),
        }
    }

    if failed_columns.is_empty() {
        IngressOutcome::Committed(row.clone())
    } else {
        IngressOutcome::Rejected(EngineError::validation_failure(failed_columns, "CHECK rule failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabdb_core::{Column, ColumnType, FixedClock, Table};

    struct NoTables;
    impl TableSource for NoTables {
        fn lookup(&self, _name: &str) -> Option<&Table> {
            None
        }
    }

    fn clock() -> FixedClock {
        FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap())
    }

    fn sales_table() -> Table {
        Table::new(
            "sales",
            Schema::from_columns(vec![Column::new("Date", ColumnType::Text), Column::new("Amount", ColumnType::Real)]).unwrap(),
        )
    }

    #[test]
    fn parses_rule_file_skipping_comments_and_blanks() {
        let rules = parse_rule_file("INIT Date TODAY()\n\n# a comment\nCHECK Amount Amount > 0\n").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].op, RuleOp::Init);
        assert_eq!(rules[1].op, RuleOp::Check);
    }

    #[test]
    fn check_failure_rejects_and_reports_column() {
        let table = sales_table();
        let rules = parse_rule_file("INIT Date TODAY()\nCHECK Amount Amount > 0\n").unwrap();
        let mut fields = HashMap::new();
        fields.insert("Amount".to_string(), "-5".to_string());
        let outcome = ingress_add(&table, &fields, &rules, &NoTables, &clock());
        match outcome {
            IngressOutcome::Rejected(EngineError::ValidationFailure { columns, .. }) => {
                assert_eq!(columns, vec!["Amount".to_string()]);
            }
            _ => panic!("expected validation failure"),
        }
    }

    #[test]
    fn init_sets_default_then_user_fields_overlay() {
        let table = sales_table();
        let rules = parse_rule_file("INIT Date TODAY()\n").unwrap();
        let fields = HashMap::new();
        let outcome = ingress_add(&table, &fields, &rules, &NoTables, &clock());
        match outcome {
            IngressOutcome::Committed(row) => {
                assert_eq!(row.get(0), Some(&Value::Text("2026/07/27".to_string())));
            }
            IngressOutcome::Rejected(e) => panic!("unexpected rejection: {e}"),
        }
    }

    #[test]
    fn update_path_skips_init() {
        let mut table = sales_table();
        table.push_row(Row::new(vec![Value::Text("old".into()), Value::Real(1.0)]));
        let rules = parse_rule_file("INIT Date TODAY()\nCHECK Amount Amount > 0\n").unwrap();
        let mut fields = HashMap::new();
        fields.insert("Amount".to_string(), "5.0".to_string());
        let outcome = ingress_update(&table, 0, &fields, &rules, &NoTables, &clock());
        match outcome {
            IngressOutcome::Committed(row) => {
                assert_eq!(row.get(0), Some(&Value::Text("old".to_string())));
                assert_eq!(row.get(1), Some(&Value::Real(5.0)));
            }
            IngressOutcome::Rejected(e) => panic!("unexpected rejection: {e}"),
        }
    }

    #[test]
    fn non_parsable_int_field_is_validation_failure() {
        let table = Table::new("t", Schema::from_columns(vec![Column::new("N", ColumnType::Int)]).unwrap());
        let mut fields = HashMap::new();
        fields.insert("N".to_string(), "not-a-number".to_string());
        let outcome = ingress_add(&table, &fields, &[], &NoTables, &clock());
        assert!(matches!(outcome, IngressOutcome::Rejected(EngineError::ValidationFailure { .. })));
    }
}
