//! Migration policy.
//!
//! Policies are plain options structs. They can be built in code or loaded
//! from the `[migrations]` table of a TOML file:
//!
//! ```toml
//! [migrations]
//! allow_drop_column = true
//! history_table_name = "${APP}_schema_history"
//! command_timeout_ms = 30000
//! ```
//!
//! `${VAR}` references are expanded from the environment before parsing.

use std::path::{Path, PathBuf};

use driftless_model::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::MigrateResult;

/// Default name of the history table.
pub const DEFAULT_HISTORY_TABLE: &str = "_driftless_history";

/// Options controlling a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationPolicy {
    /// Propagate failures instead of logging them.
    pub throw_on_error: bool,
    /// Log full error detail, including the source chain.
    pub detailed_errors: bool,
    /// Record applied scripts in the history table.
    pub track_history: bool,
    /// Drop live columns that are no longer declared.
    pub allow_drop_column: bool,
    /// Drop live tables that are no longer declared.
    pub allow_drop_table: bool,
    /// Print scripts instead of applying them.
    pub script_only: bool,
    /// Check connectivity before introspection.
    pub validate_connection: bool,
    /// Copy file-backed databases before destructive runs.
    pub backup_database: bool,
    /// Name of the history table.
    pub history_table_name: String,
    /// Explicit dialect, overriding provider detection.
    pub dialect: Option<Dialect>,
    /// Per-statement deadline in milliseconds.
    pub command_timeout_ms: Option<u64>,
    /// MySQL storage engine for created tables.
    pub mysql_engine: String,
    /// MySQL default character set for created tables.
    pub mysql_charset: String,
    /// Backup destination; defaults to the database file's directory.
    pub backup_dir: Option<PathBuf>,
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self {
            throw_on_error: true,
            detailed_errors: false,
            track_history: true,
            allow_drop_column: false,
            allow_drop_table: false,
            script_only: false,
            validate_connection: true,
            backup_database: false,
            history_table_name: DEFAULT_HISTORY_TABLE.to_string(),
            dialect: None,
            command_timeout_ms: None,
            mysql_engine: "InnoDB".to_string(),
            mysql_charset: "utf8mb4".to_string(),
            backup_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    migrations: MigrationPolicy,
}

impl MigrationPolicy {
    /// Create a policy with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the `[migrations]` table from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse the `[migrations]` table from a TOML string.
    pub fn from_toml_str(content: &str) -> MigrateResult<Self> {
        let expanded = expand_env_vars(content);
        let file: PolicyFile = toml::from_str(&expanded)?;
        Ok(file.migrations)
    }

    /// Set whether failures propagate.
    pub fn throw_on_error(mut self, value: bool) -> Self {
        self.throw_on_error = value;
        self
    }

    /// Set whether logs carry full error detail.
    pub fn detailed_errors(mut self, value: bool) -> Self {
        self.detailed_errors = value;
        self
    }

    /// Set whether history is recorded.
    pub fn track_history(mut self, value: bool) -> Self {
        self.track_history = value;
        self
    }

    /// Allow dropping undeclared columns.
    pub fn allow_drop_column(mut self, value: bool) -> Self {
        self.allow_drop_column = value;
        self
    }

    /// Allow dropping undeclared tables.
    pub fn allow_drop_table(mut self, value: bool) -> Self {
        self.allow_drop_table = value;
        self
    }

    /// Enable dry-run mode.
    pub fn script_only(mut self, value: bool) -> Self {
        self.script_only = value;
        self
    }

    /// Set whether connectivity is checked first.
    pub fn validate_connection(mut self, value: bool) -> Self {
        self.validate_connection = value;
        self
    }

    /// Set whether file-backed databases are backed up before drops.
    pub fn backup_database(mut self, value: bool) -> Self {
        self.backup_database = value;
        self
    }

    /// Set the history table name.
    pub fn history_table_name(mut self, name: impl Into<String>) -> Self {
        self.history_table_name = name.into();
        self
    }

    /// Force a dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Set the per-statement deadline.
    pub fn command_timeout_ms(mut self, ms: u64) -> Self {
        self.command_timeout_ms = Some(ms);
        self
    }

    /// Set the MySQL table footer.
    pub fn mysql_table_options(
        mut self,
        engine: impl Into<String>,
        charset: impl Into<String>,
    ) -> Self {
        self.mysql_engine = engine.into();
        self.mysql_charset = charset.into();
        self
    }

    /// Set the backup destination directory.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// History table name, falling back to the default when blank.
    pub fn history_table(&self) -> &str {
        let name = self.history_table_name.trim();
        if name.is_empty() {
            DEFAULT_HISTORY_TABLE
        } else {
            name
        }
    }
}

/// Expand `${VAR}` references from the environment. Unset variables are
/// left as written.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = MigrationPolicy::default();
        assert!(policy.throw_on_error);
        assert!(policy.track_history);
        assert!(policy.validate_connection);
        assert!(!policy.allow_drop_column);
        assert!(!policy.allow_drop_table);
        assert!(!policy.script_only);
        assert_eq!(policy.history_table(), DEFAULT_HISTORY_TABLE);
    }

    #[test]
    fn test_builder() {
        let policy = MigrationPolicy::new()
            .allow_drop_column(true)
            .script_only(true)
            .dialect(Dialect::PostgreSql)
            .history_table_name("  ");

        assert!(policy.allow_drop_column);
        assert!(policy.script_only);
        assert_eq!(policy.dialect, Some(Dialect::PostgreSql));
        assert_eq!(policy.history_table(), DEFAULT_HISTORY_TABLE);
    }

    #[test]
    fn test_from_toml() {
        let policy = MigrationPolicy::from_toml_str(
            r#"
            [migrations]
            allow_drop_table = true
            throw_on_error = false
            dialect = "mssql"
            command_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert!(policy.allow_drop_table);
        assert!(!policy.throw_on_error);
        assert!(policy.track_history);
        assert_eq!(policy.dialect, Some(Dialect::SqlServer));
        assert_eq!(policy.command_timeout_ms, Some(5000));
    }

    #[test]
    fn test_missing_table_is_default() {
        let policy = MigrationPolicy::from_toml_str("[database]\nurl = \"x\"\n").unwrap();
        assert_eq!(policy, MigrationPolicy::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = MigrationPolicy::from_toml_str("[migrations]\nscript_only = \"maybe\"").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_env_expansion() {
        // SAFETY: test-only, variable name is unique to this test
        unsafe {
            std::env::set_var("DRIFTLESS_TEST_HISTORY", "app_history");
        }
        let expanded = expand_env_vars("name = \"${DRIFTLESS_TEST_HISTORY}\" other = \"${DRIFTLESS_UNSET_VAR}\"");
        assert_eq!(
            expanded,
            "name = \"app_history\" other = \"${DRIFTLESS_UNSET_VAR}\""
        );
        unsafe {
            std::env::remove_var("DRIFTLESS_TEST_HISTORY");
        }
    }
}
