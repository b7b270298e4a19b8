use std::path::Path;

use tabdb_core::{csv_codec, EngineError, EngineResult, Table};
use tabdb_expr::TableSource;
use tabdb_helpers::IndexMap;

/// Process-wide mapping from table name to table (§4.4). Insertion order is
/// preserved and observable via [`Registry::list`].
#[derive(Debug, Default)]
pub struct Registry {
    tables: IndexMap<String, Table>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> EngineResult<&Table> {
        self.tables.get(name).ok_or_else(|| EngineError::not_found(format!("table '{name}'")))
    }

    pub fn get_mut(&mut self, name: &str) -> EngineResult<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| EngineError::not_found(format!("table '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn insert(&mut self, table: Table) -> EngineResult<()> {
        if self.tables.contains_key(&table.name) {
            return Err(EngineError::exists(format!("table '{}'", table.name)));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> EngineResult<Table> {
        self.tables.shift_remove(name).ok_or_else(|| EngineError::not_found(format!("table '{name}'")))
    }

    /// Moves a table to a new name in place (preserves registry position),
    /// updating `source_file` to `<new>.CSV` per §4.4.
    pub fn rename(&mut self, old: &str, new: &str) -> EngineResult<()> {
        if !self.tables.contains_key(old) {
            return Err(EngineError::not_found(format!("table '{old}'")));
        }
        if self.tables.contains_key(new) {
            return Err(EngineError::exists(format!("table '{new}'")));
        }
        let idx = self.tables.get_index_of(old).unwrap();
        let (_, mut table) = self.tables.shift_remove_index(idx).unwrap();
        table.name = new.to_string();
        table.source_file = Some(format!("{new}.CSV"));
        self.tables.shift_insert(idx, new.to_string(), table);
        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Strip a case-insensitive `.csv` suffix callers must not have passed
    /// (§6): `"sales.csv"` and `"sales"` both resolve to `"sales"`.
    pub fn normalize_name(name: &str) -> String {
        if name.len() >= 4 && name[name.len() - 4..].eq_ignore_ascii_case(".csv") {
            name[..name.len() - 4].to_string()
        } else {
            name.to_string()
        }
    }

    /// Load every `*.csv`/`*.CSV` file in `dir`, replacing any table
    /// currently registered under that file's name, while preserving
    /// tables that are in-memory-only (no `source_file`, or a
    /// `source_file` that no longer resolves on disk) — §4.4.
    pub fn load_directory(&mut self, dir: &Path) -> EngineResult<()> {
        let freshly_loaded = csv_codec::load_directory(dir)?;
        let mut new_tables: IndexMap<String, Table> = IndexMap::default();
        for table in freshly_loaded {
            new_tables.insert(table.name.clone(), table);
        }
        for (name, table) in std::mem::take(&mut self.tables) {
            if new_tables.contains_key(&name) {
                continue;
            }
            let preserve = match &table.source_file {
                None => true,
                Some(path) => !Path::new(path).is_file(),
            };
            if preserve {
                new_tables.insert(name, table);
            }
        }
        self.tables = new_tables;
        Ok(())
    }

    pub fn save_table(&self, name: &str, dir: &Path) -> EngineResult<()> {
        let table = self.get(name)?;
        let path = dir.join(format!("{name}.CSV"));
        csv_codec::save_table_file(table, &path)
    }
}

impl TableSource for Registry {
    fn lookup(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabdb_core::Schema;

    fn empty_table(name: &str) -> Table {
        Table::new(name, Schema::from_columns(vec![]).unwrap())
    }

    #[test]
    fn insert_rejects_duplicate_name() {
        let mut r = Registry::new();
        r.insert(empty_table("a")).unwrap();
        assert!(r.insert(empty_table("a")).is_err());
    }

    #[test]
    fn rename_then_rename_back_is_identity() {
        let mut r = Registry::new();
        r.insert(empty_table("a")).unwrap();
        r.rename("a", "b").unwrap();
        r.rename("b", "a").unwrap();
        assert_eq!(r.list(), vec!["a".to_string()]);
        assert_eq!(r.get("a").unwrap().source_file.as_deref(), Some("a.CSV"));
    }

    #[test]
    fn copy_then_delete_leaves_registry_unchanged() {
        let mut r = Registry::new();
        r.insert(empty_table("a")).unwrap();
        let before = r.list();
        let copy = r.get("a").unwrap().deep_copy("a_copy");
        r.insert(copy).unwrap();
        r.remove("a_copy").unwrap();
        assert_eq!(r.list(), before);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut r = Registry::new();
        r.insert(empty_table("z")).unwrap();
        r.insert(empty_table("a")).unwrap();
        assert_eq!(r.list(), vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn normalize_name_strips_csv_suffix_case_insensitively() {
        assert_eq!(Registry::normalize_name("sales.CSV"), "sales");
        assert_eq!(Registry::normalize_name("sales"), "sales");
    }
}
