//! The process-wide owner of the table registry plus the single
//! `execute()` entry point (§6, §5): an `Engine` holds the registry and the
//! rule cache behind one mutex, exactly as the reference workspace's own
//! `Linter` owns all lint-run state for the duration of a run. Every
//! command is an atomic, run-to-completion unit over that shared state.

pub mod command;
pub mod commands;
pub mod config;
pub mod registry;
pub mod rules;
pub mod tags;

use std::sync::Mutex;

use log::info;
use tabdb_core::{Clock, EngineResult, SystemClock};

pub use command::{Command, CommandOutcome, SortOrder, TableDescription};
pub use config::EngineConfig;
pub use registry::Registry;
pub use rules::RuleCache;

struct EngineState {
    registry: Registry,
    rule_cache: RuleCache,
}

/// Holds the registry behind a single [`Mutex`] (§5's "logical write lock"):
/// each [`Engine::execute`] call takes the lock for the duration of one
/// command and releases it before returning, so commands never interleave.
pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
    clock: Box<dyn Clock + Send + Sync>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock + Send + Sync>) -> Self {
        Self {
            config,
            state: Mutex::new(EngineState { registry: Registry::new(), rule_cache: RuleCache::new() }),
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads every `*.csv`/`*.CSV` file in the configured data directory,
    /// per §4.1/§4.4's "directory load" rule.
    pub fn load(&self) -> EngineResult<()> {
        info!("loading tables from {}", self.config.data_dir.display());
        let mut state = self.state.lock().unwrap();
        state.registry.load_directory(&self.config.data_dir)
    }

    /// Read-only list of `commands.tag` entries (§6); never written by the
    /// engine.
    pub fn tags(&self) -> Vec<String> {
        tags::read_tags(&self.config.data_dir)
    }

    /// The single dispatch entry point §6 asks for: every command body is
    /// reached only through here, so logging and name normalization happen
    /// in exactly one place.
    pub fn execute(&self, command: Command) -> EngineResult<CommandOutcome> {
        let mut state = self.state.lock().unwrap();
        let EngineState { registry, rule_cache } = &mut *state;
        let clock = self.clock.as_ref();
        let data_dir = self.config.data_dir.as_path();

        match command {
            Command::SaveTable { table_name } => {
                let name = Registry::normalize_name(&table_name);
                info!("SAVE_TABLE {name}");
                commands::save_table(registry, &name, data_dir)
            }
            Command::DropColumns { table_name, columns } => {
                commands::drop_columns(registry, &Registry::normalize_name(&table_name), &columns)
            }
            Command::RenameColumn { table_name, old, new } => {
                commands::rename_column(registry, &Registry::normalize_name(&table_name), &old, &new)
            }
            Command::RenameTable { table_name, new_name } => commands::rename_table(
                registry,
                &Registry::normalize_name(&table_name),
                &Registry::normalize_name(&new_name),
            ),
            Command::DeleteRows { table_name, expression } => {
                commands::delete_rows(registry, &Registry::normalize_name(&table_name), &expression, clock)
            }
            Command::CollapseTable { table_name, column_name, new_name } => commands::collapse_table(
                registry,
                &Registry::normalize_name(&table_name),
                column_name.as_deref(),
                &Registry::normalize_name(&new_name),
            ),
            Command::ReplaceText { table_name, column_name, regex, replacement } => commands::replace_text(
                registry,
                &Registry::normalize_name(&table_name),
                &column_name,
                &regex,
                &replacement,
            ),
            Command::AddColumn { table_name, column_name, expression, column_type } => commands::add_column(
                registry,
                &Registry::normalize_name(&table_name),
                &column_name,
                &expression,
                column_type,
                clock,
            ),
            Command::SetValue { table_name, column_name, expression } => commands::set_value(
                registry,
                &Registry::normalize_name(&table_name),
                &column_name,
                &expression,
                clock,
            ),
            Command::JoinTable { table_name, table_name1, join_column, new_name } => commands::join_table(
                registry,
                &Registry::normalize_name(&table_name),
                &Registry::normalize_name(&table_name1),
                &join_column,
                &Registry::normalize_name(&new_name),
            ),
            Command::CopyTable { table_name, new_name } => commands::copy_table(
                registry,
                &Registry::normalize_name(&table_name),
                &Registry::normalize_name(&new_name),
            ),
            Command::SortTable { table_name, column_name, order } => {
                commands::sort_table(registry, &Registry::normalize_name(&table_name), &column_name, order)
            }
            Command::DeleteTable { table_name } => {
                commands::delete_table(registry, &Registry::normalize_name(&table_name))
            }
            Command::GroupTable { table_name, group_column, columns, new_name } => commands::group_table(
                registry,
                &Registry::normalize_name(&table_name),
                &group_column,
                &columns,
                &Registry::normalize_name(&new_name),
            ),
            Command::ReorderColumns { table_name, columns } => {
                commands::reorder_columns(registry, &Registry::normalize_name(&table_name), &columns)
            }
            Command::ConvertColumn { table_name, column_name } => {
                commands::convert_column(registry, &Registry::normalize_name(&table_name), &column_name)
            }
            Command::SpliceTables { new_name, selected_tables } => {
                let selected: Vec<String> = selected_tables.iter().map(|n| Registry::normalize_name(n)).collect();
                commands::splice_tables(registry, &Registry::normalize_name(&new_name), &selected)
            }
            Command::ListTables => commands::list_tables(registry),
            Command::DescribeTable { table_name } => {
                commands::describe_table(registry, &Registry::normalize_name(&table_name))
            }
            Command::AddRow { table_name, fields } => {
                let name = Registry::normalize_name(&table_name);
                commands::add_row(registry, rule_cache, data_dir, &name, &fields, clock)
            }
            Command::UpdateRow { table_name, row_index, fields } => {
                let name = Registry::normalize_name(&table_name);
                commands::update_row(registry, rule_cache, data_dir, &name, row_index, &fields, clock)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tabdb_core::{ColumnType, FixedClock};

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap());
        let engine = Engine::with_clock(EngineConfig::new(dir.path()), Box::new(clock));
        (dir, engine)
    }

    #[test]
    fn end_to_end_collapse_scenario() {
        let (_dir, engine) = engine();
        std::fs::write(
            engine.config().data_dir.join("sales.CSV"),
            "Date:TEXT,Amount:REAL\n2024-01-01,100.5\n2024-01-02,200.0\n",
        )
        .unwrap();
        engine.load().unwrap();

        let outcome = engine
            .execute(Command::CollapseTable {
                table_name: "sales".to_string(),
                column_name: None,
                new_name: "totals".to_string(),
            })
            .unwrap();
        let table = outcome.table.unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0].get(0), Some(&tabdb_core::Value::Real(300.5)));
    }

    #[test]
    fn add_row_runs_ingress_pipeline_via_execute() {
        let (_dir, engine) = engine();
        std::fs::write(engine.config().data_dir.join("sales.CSV"), "Date:TEXT,Amount:REAL\n").unwrap();
        std::fs::write(engine.config().data_dir.join("sales.RUL"), "CHECK Amount Amount > 0\n").unwrap();
        engine.load().unwrap();

        let mut fields = HashMap::new();
        fields.insert("Amount".to_string(), "-5".to_string());
        let err = engine.execute(Command::AddRow { table_name: "sales".to_string(), fields }).unwrap_err();
        assert!(matches!(err, tabdb_core::EngineError::ValidationFailure { .. }));
    }

    #[test]
    fn table_names_with_csv_suffix_are_normalized() {
        let (_dir, engine) = engine();
        std::fs::write(engine.config().data_dir.join("sales.CSV"), "Date:TEXT\n").unwrap();
        engine.load().unwrap();
        let outcome = engine.execute(Command::DescribeTable { table_name: "sales.csv".to_string() }).unwrap();
        assert_eq!(outcome.description.unwrap().row_count, 0);
    }

    #[test]
    fn add_column_type_is_explicit_not_inferred() {
        let (_dir, engine) = engine();
        std::fs::write(engine.config().data_dir.join("sales.CSV"), "Amount:REAL\n1.0\n").unwrap();
        engine.load().unwrap();
        let outcome = engine
            .execute(Command::AddColumn {
                table_name: "sales".to_string(),
                column_name: "Total".to_string(),
                expression: "Amount * 1.1".to_string(),
                column_type: ColumnType::Real,
            })
            .unwrap();
        let table = outcome.table.unwrap();
        assert_eq!(table.schema.require_column("Total").unwrap().ty, ColumnType::Real);
    }
}
