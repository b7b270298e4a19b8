use regex::Regex;
use tabdb_core::{clock, ColumnType, EngineError, EngineResult, Value};

use crate::ast::Expr;
use crate::context::EvalContext;
use crate::eval::eval;

/// A function argument that is meant to be read as a bare column/table
/// name rather than evaluated against the current row — `TOTAL`, `SUM`,
/// and `REPLACE`'s first argument are "passed as written" per §4.2.4.
fn as_literal_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::FieldRef(name) => Some(name.as_str()),
        Expr::Literal(Value::Text(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn require_arity(name: &str, args: &[Expr], expected: usize) -> EngineResult<()> {
    if args.len() != expected {
        Err(EngineError::expression(format!(
            "{name} expects {expected} argument(s), got {}",
            args.len()
        )))
    } else {
        Ok(())
    }
}

fn round_to_index(v: f64) -> i64 {
    v.round() as i64
}

pub fn call(name: &str, args: &[Expr], ctx: &EvalContext) -> EngineResult<Value> {
    match name.to_ascii_uppercase().as_str() {
        "BLANK" => {
            require_arity(name, args, 1)?;
            let is_blank = match &args[0] {
                Expr::FieldRef(col) if !ctx.table.schema.contains(col) => {
                    // Not a column: the bare identifier is taken as a TEXT
                    // literal, so it is always non-blank unless empty.
                    col.is_empty()
                }
                other => eval(other, ctx)?.is_blank(),
            };
            Ok(Value::Int(is_blank as i64))
        }
        "TODAY" => {
            require_arity(name, args, 0)?;
            Ok(Value::Text(clock::format_today(&ctx.clock.now())))
        }
        "DAY" => {
            require_arity(name, args, 0)?;
            Ok(Value::Text(clock::format_day(&ctx.clock.now())))
        }
        "MONTH" => {
            require_arity(name, args, 0)?;
            Ok(Value::Text(clock::format_month(&ctx.clock.now())))
        }
        "YEAR" => {
            require_arity(name, args, 0)?;
            Ok(Value::Text(clock::format_year(&ctx.clock.now())))
        }
        "NOW" => {
            require_arity(name, args, 0)?;
            Ok(Value::Text(clock::format_now(&ctx.clock.now())))
        }
        "LENGTH" => {
            require_arity(name, args, 1)?;
            let v = eval(&args[0], ctx)?;
            Ok(Value::Int(v.display_string().chars().count() as i64))
        }
        "APPEND" => {
            require_arity(name, args, 2)?;
            let a = eval(&args[0], ctx)?;
            let b = eval(&args[1], ctx)?;
            Ok(Value::Text(format!("{}{}", a.display_string(), b.display_string())))
        }
        "UPPER" => {
            require_arity(name, args, 1)?;
            let v = eval(&args[0], ctx)?;
            Ok(Value::Text(v.display_string().to_uppercase()))
        }
        "TOTAL" => {
            require_arity(name, args, 2)?;
            let table_name = as_literal_name(&args[0])
                .ok_or_else(|| EngineError::expression("TOTAL's first argument must be a table name"))?;
            let col_name = as_literal_name(&args[1])
                .ok_or_else(|| EngineError::expression("TOTAL's second argument must be a column name"))?;
            let total = match ctx.registry.lookup(table_name) {
                Some(table) => sum_column(table, col_name).unwrap_or(0.0),
                None => 0.0,
            };
            Ok(Value::Real(total))
        }
        "REGEXP" => {
            require_arity(name, args, 2)?;
            let pattern = eval(&args[0], ctx)?.display_string();
            let haystack = eval(&args[1], ctx)?.display_string();
            let result = Regex::new(&pattern)
                .ok()
                .and_then(|re| re.find(&haystack))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Ok(Value::Text(result))
        }
        "REPLACE" => {
            require_arity(name, args, 3)?;
            let col_name = as_literal_name(&args[0])
                .ok_or_else(|| EngineError::expression("REPLACE's first argument must be a column name"))?;
            let current = ctx
                .current_row()
                .get_by_name(&ctx.table.schema, col_name)
                .ok_or_else(|| EngineError::not_found(format!("column '{col_name}'")))?
                .display_string();
            let pattern = eval(&args[1], ctx)?.display_string();
            let template = eval(&args[2], ctx)?.display_string();
            let re = Regex::new(&pattern)
                .map_err(|e| EngineError::expression(format!("invalid regex '{pattern}': {e}")))?;
            Ok(Value::Text(re.replace_all(&current, template.as_str()).into_owned()))
        }
        "CURR_ROW" => {
            require_arity(name, args, 0)?;
            Ok(Value::Int(ctx.row_index as i64))
        }
        "NUM_ROWS" => {
            require_arity(name, args, 0)?;
            Ok(Value::Int(ctx.table.row_count() as i64))
        }
        "SUM" => {
            require_arity(name, args, 3)?;
            let col_name = as_literal_name(&args[0])
                .ok_or_else(|| EngineError::expression("SUM's first argument must be a column name"))?;
            let start = round_to_index(eval(&args[1], ctx)?.as_f64().ok_or_else(|| {
                EngineError::type_mismatch("SUM start bound must be numeric")
            })?);
            let finish = round_to_index(eval(&args[2], ctx)?.as_f64().ok_or_else(|| {
                EngineError::type_mismatch("SUM finish bound must be numeric")
            })?);
            Ok(Value::Real(sum_column_range(ctx.table, col_name, start, finish)?))
        }
        other => Err(EngineError::expression(format!("unknown function '{other}'"))),
    }
}

fn sum_column(table: &tabdb_core::Table, col_name: &str) -> Option<f64> {
    let idx = table.schema.index_of(col_name)?;
    let col = &table.schema.columns()[idx];
    if col.ty == ColumnType::Text {
        return None;
    }
    Some(table.rows.iter().filter_map(|r| r.get(idx).and_then(|v| v.as_f64())).sum())
}

fn sum_column_range(table: &tabdb_core::Table, col_name: &str, start: i64, finish: i64) -> EngineResult<f64> {
    let idx = table
        .schema
        .index_of(col_name)
        .ok_or_else(|| EngineError::not_found(format!("column '{col_name}'")))?;
    let col = &table.schema.columns()[idx];
    if col.ty == ColumnType::Text {
        return Err(EngineError::type_mismatch(format!("SUM over non-numeric column '{col_name}'")));
    }
    if start > finish {
        return Ok(0.0);
    }
    let len = table.row_count() as i64;
    if start < 0 || finish >= len {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for i in start..=finish {
        if let Some(v) = table.rows[i as usize].get(idx).and_then(|v| v.as_f64()) {
            total += v;
        }
    }
    Ok(total)
}
