use tabdb_core::{EngineError, EngineResult, Value};

use crate::ast::{BinOp, Expr};
use crate::context::EvalContext;
use crate::functions;

/// Walks the AST against `ctx`. Pure given a fixed clock (§4.2.5): no
/// hidden mutable state, no caching beyond what `ctx` itself carries.
pub fn eval(expr: &Expr, ctx: &EvalContext) -> EngineResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::FieldRef(name) => ctx
            .current_row()
            .get_by_name(&ctx.table.schema, name)
            .cloned()
            .ok_or_else(|| EngineError::expression(format!("unknown identifier '{name}'"))),
        Expr::IndexedFieldRef { name, index } => eval_indexed(name, index, ctx),
        Expr::Not(inner) => {
            let v = eval(inner, ctx)?;
            Ok(Value::Int(!v.is_truthy() as i64))
        }
        Expr::Neg(inner) => {
            let v = eval(inner, ctx)?;
            match v {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Real(r) => Ok(Value::Real(-r)),
                Value::Text(_) => Err(EngineError::type_mismatch("unary '-' on TEXT value")),
            }
        }
        Expr::And(lhs, rhs) => {
            let l = eval(lhs, ctx)?;
            if !l.is_truthy() {
                return Ok(Value::Int(0));
            }
            let r = eval(rhs, ctx)?;
            Ok(Value::Int(r.is_truthy() as i64))
        }
        Expr::Or(lhs, rhs) => {
            let l = eval(lhs, ctx)?;
            if l.is_truthy() {
                return Ok(Value::Int(1));
            }
            let r = eval(rhs, ctx)?;
            Ok(Value::Int(r.is_truthy() as i64))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            eval_binary(*op, l, r)
        }
        Expr::Conditional { cond, then_branch, else_branch } => {
            if eval(cond, ctx)?.is_truthy() {
                eval(then_branch, ctx)
            } else {
                eval(else_branch, ctx)
            }
        }
        Expr::Call { name, args } => functions::call(name, args, ctx),
    }
}

fn eval_indexed(name: &str, index: &Expr, ctx: &EvalContext) -> EngineResult<Value> {
    let offset = eval(index, ctx)?
        .as_f64()
        .ok_or_else(|| EngineError::type_mismatch("index expression must be numeric"))?;
    let target = ctx.row_index as i64 + offset.round() as i64;
    if target < 0 || target >= ctx.table.row_count() as i64 {
        return Ok(Value::Text(String::new()));
    }
    let col_idx = ctx
        .table
        .schema
        .index_of(name)
        .ok_or_else(|| EngineError::expression(format!("unknown identifier '{name}'")))?;
    Ok(ctx.table.rows[target as usize].get(col_idx).cloned().unwrap_or(Value::Text(String::new())))
}

fn eval_binary(op: BinOp, lhs: Value, rhs: Value) -> EngineResult<Value> {
    match op {
        BinOp::Add => match (&lhs, &rhs) {
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            _ if lhs.is_numeric() && rhs.is_numeric() => numeric_arith(lhs, rhs, |a, b| a + b, |a, b| a.checked_add(b)),
            _ => Err(EngineError::type_mismatch("'+' requires two TEXT or two numeric operands")),
        },
        BinOp::Sub => {
            require_numeric_pair(&lhs, &rhs, "-")?;
            numeric_arith(lhs, rhs, |a, b| a - b, |a, b| a.checked_sub(b))
        }
        BinOp::Mul => {
            require_numeric_pair(&lhs, &rhs, "*")?;
            numeric_arith(lhs, rhs, |a, b| a * b, |a, b| a.checked_mul(b))
        }
        BinOp::Div => {
            require_numeric_pair(&lhs, &rhs, "/")?;
            eval_div(lhs, rhs)
        }
        BinOp::Pow => {
            require_numeric_pair(&lhs, &rhs, "^")?;
            Ok(Value::Real(lhs.as_f64().unwrap().powf(rhs.as_f64().unwrap())))
        }
        BinOp::Eq => Ok(Value::Int(compare(&lhs, &rhs)?.is_eq() as i64)),
        BinOp::Ne => Ok(Value::Int(!compare(&lhs, &rhs)?.is_eq() as i64)),
        BinOp::Lt => Ok(Value::Int(compare(&lhs, &rhs)?.is_lt() as i64)),
        BinOp::Gt => Ok(Value::Int(compare(&lhs, &rhs)?.is_gt() as i64)),
    }
}

fn require_numeric_pair(lhs: &Value, rhs: &Value, op: &str) -> EngineResult<()> {
    if lhs.is_numeric() && rhs.is_numeric() {
        Ok(())
    } else {
        Err(EngineError::type_mismatch(format!("'{op}' requires two numeric operands")))
    }
}

/// INT `+ - *` stay INT when both operands are INT and the result does not
/// overflow; otherwise (mixed INT/REAL, or overflow) the result promotes
/// to REAL, per §4.2.3.
fn numeric_arith(
    lhs: Value,
    rhs: Value,
    real_op: impl Fn(f64, f64) -> f64,
    int_op: impl Fn(i64, i64) -> Option<i64>,
) -> EngineResult<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match int_op(a, b) {
            Some(v) => Ok(Value::Int(v)),
            None => Ok(Value::Real(real_op(a as f64, b as f64))),
        },
        (a, b) => Ok(Value::Real(real_op(a.as_f64().unwrap(), b.as_f64().unwrap()))),
    }
}

/// Dividing integers yields REAL when the division is non-exact (§4.2.3).
fn eval_div(lhs: Value, rhs: Value) -> EngineResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        if *b != 0 && a % b == 0 {
            return Ok(Value::Int(a / b));
        }
    }
    let a = lhs.as_f64().unwrap();
    let b = rhs.as_f64().unwrap();
    Ok(Value::Real(a / b))
}

fn compare(lhs: &Value, rhs: &Value) -> EngineResult<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => a
            .as_f64()
            .unwrap()
            .partial_cmp(&b.as_f64().unwrap())
            .ok_or_else(|| EngineError::type_mismatch("NaN is not comparable")),
        _ => Err(EngineError::type_mismatch("cannot compare TEXT with a numeric value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TableSource;
    use crate::parser::parse;
    use std::collections::HashMap;
    use tabdb_core::{Column, ColumnType, FixedClock, Row, Schema, Table};

    struct NoTables;
    impl TableSource for NoTables {
        fn lookup(&self, _name: &str) -> Option<&Table> {
            None
        }
    }

    struct Registry(HashMap<String, Table>);
    impl TableSource for Registry {
        fn lookup(&self, name: &str) -> Option<&Table> {
            self.0.get(name)
        }
    }

    fn sample_table() -> Table {
        let schema = Schema::from_columns(vec![
            Column::new("Date", ColumnType::Text),
            Column::new("Amount", ColumnType::Real),
        ])
        .unwrap();
        let mut table = Table::new("sales", schema);
        table.push_row(Row::new(vec![Value::Text("2024-01-01".into()), Value::Real(100.5)]));
        table.push_row(Row::new(vec![Value::Text("2024-01-02".into()), Value::Real(200.0)]));
        table
    }

    fn eval_str(src: &str, table: &Table, row: usize) -> EngineResult<Value> {
        let registry = NoTables;
        let clock = FixedClock(
            chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        );
        let ctx = EvalContext::new(table, row, &registry, &clock);
        eval(&parse(src)?, &ctx)
    }

    #[test]
    fn arithmetic_promotes_to_real_on_mixed_types() {
        let table = sample_table();
        match eval_str("Amount * 1.1", &table, 0).unwrap() {
            Value::Real(v) => assert!((v - 110.55).abs() < 1e-9, "got {v}"),
            other => panic!("expected REAL, got {other:?}"),
        }
    }

    #[test]
    fn ternary_picks_branch() {
        let table = sample_table();
        assert_eq!(eval_str("0 ? 1 : 2", &table, 0).unwrap(), Value::Int(2));
        assert_eq!(eval_str("1 ? 1 : 2", &table, 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn text_comparison_is_lexicographic() {
        let table = sample_table();
        assert_eq!(eval_str("'a' < 'b'", &table, 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn mixed_text_numeric_comparison_is_type_mismatch() {
        let table = sample_table();
        assert!(matches!(eval_str("'a' < 2", &table, 0), Err(EngineError::TypeMismatch(_))));
    }

    #[test]
    fn blank_function_on_literal_and_column() {
        let table = sample_table();
        assert_eq!(eval_str("BLANK('')", &table, 0).unwrap(), Value::Int(1));
        assert_eq!(eval_str("BLANK(Amount)", &table, 1).unwrap(), Value::Int(0));
    }

    #[test]
    fn length_counts_unicode_chars_not_bytes() {
        let table = sample_table();
        assert_eq!(eval_str("LENGTH('\u{3b1}\u{3b2}\u{3b3}')", &table, 0).unwrap(), Value::Int(3));
    }

    #[test]
    fn int_division_is_int_when_exact_else_real() {
        let table = sample_table();
        assert_eq!(eval_str("4 / 2", &table, 0).unwrap(), Value::Int(2));
        assert_eq!(eval_str("5 / 2", &table, 0).unwrap(), Value::Real(2.5));
    }

    #[test]
    fn total_sums_numeric_column_of_named_table() {
        let mut tables = HashMap::new();
        tables.insert("sales".to_string(), sample_table());
        let registry = Registry(tables);
        let table = sample_table();
        let clock = FixedClock(
            chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        );
        let ctx = EvalContext::new(&table, 0, &registry, &clock);
        let result = eval(&parse("TOTAL(sales, Amount)").unwrap(), &ctx).unwrap();
        assert_eq!(result, Value::Real(300.5));
    }

    #[test]
    fn sum_over_self_matches_total() {
        let mut tables = HashMap::new();
        tables.insert("sales".to_string(), sample_table());
        let registry = Registry(tables);
        let table = sample_table();
        let clock = FixedClock(
            chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        );
        let ctx = EvalContext::new(&table, 0, &registry, &clock);
        let sum = eval(&parse("SUM(Amount, 0, NUM_ROWS() - 1)").unwrap(), &ctx).unwrap();
        let total = eval(&parse("TOTAL(sales, Amount)").unwrap(), &ctx).unwrap();
        assert_eq!(sum, total);
    }

    #[test]
    fn indexed_field_ref_out_of_range_is_empty_text() {
        let table = sample_table();
        assert_eq!(eval_str("Date[-5]", &table, 0).unwrap(), Value::Text(String::new()));
    }

    #[test]
    fn indexed_field_ref_in_range() {
        let table = sample_table();
        assert_eq!(eval_str("Date[1]", &table, 0).unwrap(), Value::Text("2024-01-02".into()));
    }

    #[test]
    fn unknown_identifier_errors() {
        let table = sample_table();
        assert!(eval_str("nonexistent", &table, 0).is_err());
    }
}
