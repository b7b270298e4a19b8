use std::fs;
use std::path::Path;

/// Reads `<data_dir>/commands.tag`: one tag per line, blank lines skipped.
/// Read-only, exposed to callers exclusively for the row-tagging UI
/// affordance (§6) — the engine never writes this file.
pub fn read_tags(data_dir: &Path) -> Vec<String> {
    let path = data_dir.join("commands.tag");
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_one_tag_per_line_skipping_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("commands.tag")).unwrap();
        writeln!(f, "urgent\n\nreview\n").unwrap();
        assert_eq!(read_tags(dir.path()), vec!["urgent".to_string(), "review".to_string()]);
    }

    #[test]
    fn missing_tags_file_is_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_tags(dir.path()).is_empty());
    }
}
