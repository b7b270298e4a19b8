//! Argument parsing, logging initialization, and dispatch for the tabdb
//! CLI (§6.1), grounded on the reference workspace's own thin-`main`/
//! fat-`lib` split: `main.rs` just hands `args_os()` here.

pub mod commands;
mod formatters;
mod logger;

use clap::Parser as _;
use log::info;
use tabdb_engine::{Command, Engine, EngineConfig, SortOrder};

use commands::{fields_map, Cli, Commands};

/// Parses `args`, initializes logging, builds an [`Engine`] over the
/// resolved data directory, dispatches the one subcommand to
/// [`Engine::execute`], and prints the rendered result to stdout. Returns
/// the process exit code (0 on success, 1 on error) the way `main.rs`
/// expects.
pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let _ = logger::init(cli.verbose);

    let config = EngineConfig::resolve(cli.data_dir.clone());
    info!("data directory: {}", config.data_dir.display());
    let engine = Engine::new(config);

    if matches!(cli.command, Commands::Load) {
        return match engine.load() {
            Ok(()) => {
                info!("loaded tables from {}", engine.config().data_dir.display());
                0
            }
            Err(e) => {
                eprintln!("{e}");
                1
            }
        };
    }

    // Every other subcommand operates on an already-populated registry;
    // load implicitly so a standalone `tabdb describe sales` works without
    // a separate `load` invocation first.
    if let Err(e) = engine.load() {
        eprintln!("{e}");
        return 1;
    }

    let command = match to_command(cli.command) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    match engine.execute(command) {
        Ok(outcome) => {
            let rendered = formatters::render(&outcome, cli.format);
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn to_command(commands: Commands) -> Result<Command, String> {
    Ok(match commands {
        Commands::Load => unreachable!("handled before dispatch"),
        Commands::List => Command::ListTables,
        Commands::Describe { table_name } => Command::DescribeTable { table_name },
        Commands::Save { table_name } => Command::SaveTable { table_name },
        Commands::AddRow { table_name, fields } => Command::AddRow { table_name, fields: fields_map(fields) },
        Commands::UpdateRow { table_name, row_index, fields } => {
            Command::UpdateRow { table_name, row_index, fields: fields_map(fields) }
        }
        Commands::AddColumn { table_name, column_name, expression, column_type } => {
            Command::AddColumn { table_name, column_name, expression, column_type: column_type.into() }
        }
        Commands::SetValue { table_name, column_name, expression } => {
            Command::SetValue { table_name, column_name, expression }
        }
        Commands::DeleteRows { table_name, expression } => Command::DeleteRows { table_name, expression },
        Commands::DropColumns { table_name, columns } => Command::DropColumns { table_name, columns },
        Commands::RenameColumn { table_name, old, new } => Command::RenameColumn { table_name, old, new },
        Commands::RenameTable { table_name, new_name } => Command::RenameTable { table_name, new_name },
        Commands::CopyTable { table_name, new_name } => Command::CopyTable { table_name, new_name },
        Commands::DeleteTable { table_name } => Command::DeleteTable { table_name },
        Commands::SortTable { table_name, column_name, order } => {
            Command::SortTable { table_name, column_name, order: SortOrder::from(order) }
        }
        Commands::CollapseTable { table_name, new_name, column_name } => {
            Command::CollapseTable { table_name, column_name, new_name }
        }
        Commands::GroupTable { table_name, group_column, new_name, columns } => {
            Command::GroupTable { table_name, group_column, columns, new_name }
        }
        Commands::ReorderColumns { table_name, columns } => Command::ReorderColumns { table_name, columns },
        Commands::ConvertColumn { table_name, column_name } => Command::ConvertColumn { table_name, column_name },
        Commands::ReplaceText { table_name, column_name, regex, replacement } => {
            Command::ReplaceText { table_name, column_name, regex, replacement }
        }
        Commands::JoinTable { table_name, table_name1, join_column, new_name } => {
            Command::JoinTable { table_name, table_name1, join_column, new_name }
        }
        Commands::SpliceTables { new_name, selected_tables } => Command::SpliceTables { new_name, selected_tables },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_then_describe_round_trips_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sales.CSV"), "Date:TEXT,Amount:REAL\n2024-01-01,100.5\n").unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let code = run_with_args(["tabdb", "--data-dir", data_dir, "load"]);
        assert_eq!(code, 0);

        let code = run_with_args(["tabdb", "--data-dir", data_dir, "describe", "sales"]);
        assert_eq!(code, 0);
    }

    #[test]
    fn unknown_table_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let code = run_with_args(["tabdb", "--data-dir", data_dir, "describe", "nope"]);
        assert_eq!(code, 1);
    }
}
