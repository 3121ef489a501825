use std::path::{Path, PathBuf};

use sqlmigrate_common::{Error, Result};
use sqlmigrate_config::MigrateConfig;
use tracing::debug;

use crate::migrations::MigrationUnit;

/// Anything that can list migration scripts.
///
/// The order of the returned units does not matter; the runner sorts them.
pub trait MigrationSource {
    fn units(&self) -> Result<Vec<MigrationUnit>>;

    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
}

/// Reads every regular file directly inside a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: Option<String>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: None,
        }
    }

    /// The configured migrations directory and extension filter.
    pub fn from_config(config: &MigrateConfig) -> Self {
        let source = Self::new(&config.migrations_dir);
        match &config.extension {
            Some(ext) => source.with_extension(ext.clone()),
            None => source,
        }
    }

    /// Only pick up files ending in `.{extension}`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn matches_extension(&self, path: &Path) -> bool {
        match &self.extension {
            None => true,
            Some(want) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == want.trim_start_matches('.')),
        }
    }

    fn read_error(&self, path: &Path, reason: impl ToString) -> Error {
        Error::SourceRead {
            location: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl MigrationSource for DirectorySource {
    fn units(&self) -> Result<Vec<MigrationUnit>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| self.read_error(&self.dir, e))?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.read_error(&self.dir, e))?;
            let path = entry.path();

            if !path.is_file() {
                debug!("skipping non-file entry {}", path.display());
                continue;
            }
            if !self.matches_extension(&path) {
                debug!("skipping {} (extension filter)", path.display());
                continue;
            }

            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| self.read_error(&path, "file name is not valid UTF-8"))?;
            let body = std::fs::read_to_string(&path).map_err(|e| self.read_error(&path, e))?;
            units.push(MigrationUnit { name, body });
        }

        Ok(units)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Migrations compiled into the binary, usually via `include_str!`.
///
/// ```
/// use sqlmigrate_db::EmbeddedSource;
///
/// static MIGRATIONS: &[(&str, &str)] = &[
///     ("0001_init.sql", "CREATE TABLE t (id INTEGER PRIMARY KEY);"),
/// ];
/// let source = EmbeddedSource::new("app", MIGRATIONS);
/// # let _ = source;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedSource {
    label: &'static str,
    files: &'static [(&'static str, &'static str)],
}

impl EmbeddedSource {
    pub const fn new(label: &'static str, files: &'static [(&'static str, &'static str)]) -> Self {
        Self { label, files }
    }
}

impl MigrationSource for EmbeddedSource {
    fn units(&self) -> Result<Vec<MigrationUnit>> {
        Ok(self
            .files
            .iter()
            .map(|(name, body)| MigrationUnit::new(*name, *body))
            .collect())
    }

    fn describe(&self) -> String {
        format!("embedded:{}", self.label)
    }
}

/// Owned migrations, for tests and programmatic use.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    units: Vec<MigrationUnit>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.units.push(MigrationUnit::new(name, body));
        self
    }

    pub fn push(&mut self, unit: MigrationUnit) {
        self.units.push(unit);
    }
}

impl FromIterator<MigrationUnit> for MemorySource {
    fn from_iter<I: IntoIterator<Item = MigrationUnit>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl MigrationSource for MemorySource {
    fn units(&self) -> Result<Vec<MigrationUnit>> {
        Ok(self.units.clone())
    }

    fn describe(&self) -> String {
        let count = self.units.len();
        format!("memory ({count} migration{})", if count == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &dyn MigrationSource) -> Vec<String> {
        let mut names: Vec<_> = source.units().unwrap().into_iter().map(|u| u.name).collect();
        names.sort();
        names
    }

    #[test]
    fn directory_source_reads_files_and_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0002_seed.sql"), "INSERT INTO t VALUES (1);").unwrap();
        std::fs::write(dir.path().join("0001_init.sql"), "CREATE TABLE t (id INTEGER);").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(names(&source), ["0001_init.sql", "0002_seed.sql"]);

        let init = source
            .units()
            .unwrap()
            .into_iter()
            .find(|u| u.name == "0001_init.sql")
            .unwrap();
        assert_eq!(init.body, "CREATE TABLE t (id INTEGER);");
    }

    #[test]
    fn directory_source_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001_init.sql"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "# notes").unwrap();

        let source = DirectorySource::new(dir.path()).with_extension("sql");
        assert_eq!(names(&source), ["0001_init.sql"]);

        let dotted = DirectorySource::new(dir.path()).with_extension(".sql");
        assert_eq!(names(&dotted), ["0001_init.sql"]);
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("missing"));
        assert!(matches!(source.units(), Err(Error::SourceRead { .. })));
    }

    #[test]
    fn non_utf8_body_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001_bin.sql"), b"\xff\xfe\x00").unwrap();

        let err = DirectorySource::new(dir.path()).units().unwrap_err();
        match err {
            Error::SourceRead { location, .. } => assert!(location.ends_with("0001_bin.sql")),
            other => panic!("expected SourceRead, got {other}"),
        }
    }

    #[test]
    fn embedded_source_lists_static_files() {
        static FILES: &[(&str, &str)] = &[("b.sql", "SELECT 1;"), ("a.sql", "SELECT 2;")];
        let source = EmbeddedSource::new("fixtures", FILES);
        assert_eq!(names(&source), ["a.sql", "b.sql"]);
        assert_eq!(source.describe(), "embedded:fixtures");
    }

    #[test]
    fn memory_source_builders() {
        let source = MemorySource::new().with("x.sql", "").with("w.sql", "");
        assert_eq!(names(&source), ["w.sql", "x.sql"]);

        let collected: MemorySource = vec![MigrationUnit::new("z.sql", "")].into_iter().collect();
        assert_eq!(collected.describe(), "memory (1 migration)");
        assert_eq!(MemorySource::new().describe(), "memory (0 migrations)");
    }
}
