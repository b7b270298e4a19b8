use std::collections::HashMap;
use std::path::Path;

use tabdb_core::{Clock, EngineResult};

use crate::command::CommandOutcome;
use crate::registry::Registry;
use crate::rules::{ingress_add, ingress_update, IngressOutcome, RuleCache};

pub fn add_row(
    registry: &mut Registry,
    rule_cache: &mut RuleCache,
    data_dir: &Path,
    table_name: &str,
    fields: &HashMap<String, String>,
    clock: &dyn Clock,
) -> EngineResult<CommandOutcome> {
    let rules = rule_cache.rules_for(data_dir, table_name)?.to_vec();
    let table = registry.get(table_name)?;
    match ingress_add(table, fields, &rules, registry, clock) {
        IngressOutcome::Committed(row) => {
            let table = registry.get_mut(table_name)?;
            table.push_row(row);
            Ok(CommandOutcome::table(table.clone()))
        }
        IngressOutcome::Rejected(e) => Err(e),
    }
}

pub fn update_row(
    registry: &mut Registry,
    rule_cache: &mut RuleCache,
    data_dir: &Path,
    table_name: &str,
    row_index: usize,
    fields: &HashMap<String, String>,
    clock: &dyn Clock,
) -> EngineResult<CommandOutcome> {
    let rules = rule_cache.rules_for(data_dir, table_name)?.to_vec();
    let table = registry.get(table_name)?;
    match ingress_update(table, row_index, fields, &rules, registry, clock) {
        IngressOutcome::Committed(row) => {
            let table = registry.get_mut(table_name)?;
            table.rows[row_index] = row;
            Ok(CommandOutcome::table(table.clone()))
        }
        IngressOutcome::Rejected(e) => Err(e),
    }
}
