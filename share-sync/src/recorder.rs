//! SQL-backed [`LinkRecorder`]: writes each share link into a table keyed by
//! file name with one parameterised `UPDATE`.
//!
//! The backend is chosen from the connection URL (`sqlite:` by default,
//! `postgres:` with the `postgres` feature) through sqlx's `Any` driver.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;
use tracing::{debug, info};

use share_sync_core::contract::{LinkRecorder, RecordOutcome};
use share_sync_core::SyncError;

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://links.db` or `postgres://user:pw@host/db`.
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Table")]
    pub table: String,
    #[serde(rename = "LinkColumn", default = "default_link_column")]
    pub link_column: String,
    #[serde(rename = "FileNameColumn", default = "default_filename_column")]
    pub filename_column: String,
}

fn default_link_column() -> String {
    "DOWNLOAD_LINK".to_string()
}

fn default_filename_column() -> String {
    "FILENAME".to_string()
}

// The URL may embed a password.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("table", &self.table)
            .field("link_column", &self.link_column)
            .field("filename_column", &self.filename_column)
            .finish()
    }
}

impl DatabaseConfig {
    /// Table and column names are spliced into SQL, so only plain identifiers
    /// (optionally `schema.table`) are accepted.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("Url must not be empty".to_string());
        }
        let table_ok = {
            let mut parts = self.table.split('.');
            let first = parts.next().is_some_and(is_identifier);
            let second = parts.next().map_or(true, is_identifier);
            first && second && parts.next().is_none()
        };
        if !table_ok {
            return Err(format!("`{}` is not a valid table name", self.table));
        }
        for column in [&self.link_column, &self.filename_column] {
            if !is_identifier(column) {
                return Err(format!("`{column}` is not a valid column name"));
            }
        }
        Ok(())
    }

    fn uses_numbered_placeholders(&self) -> bool {
        self.url.starts_with("postgres:") || self.url.starts_with("postgresql:")
    }

    /// `UPDATE <table> SET <link> = ? WHERE <filename> = ?`
    pub fn update_statement(&self) -> String {
        let (link, name) = if self.uses_numbered_placeholders() {
            ("$1", "$2")
        } else {
            ("?", "?")
        };
        format!(
            "UPDATE {} SET {} = {link} WHERE {} = {name}",
            self.table, self.link_column, self.filename_column
        )
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct SqlRecorder {
    pool: AnyPool,
    statement: String,
}

impl SqlRecorder {
    /// Creates a lazily connecting pool; nothing touches the database until
    /// the first link is recorded.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, SyncError> {
        config.validate().map_err(SyncError::InvalidConfiguration)?;
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.url)
            .map_err(|e| SyncError::Record(format!("invalid database url: {e}")))?;
        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: AnyPool, config: &DatabaseConfig) -> Self {
        let statement = config.update_statement();
        info!(table = %config.table, "Share links will be recorded in the database");
        SqlRecorder { pool, statement }
    }
}

#[async_trait]
impl LinkRecorder for SqlRecorder {
    async fn record_link(&self, file_name: &str, link: &str) -> Result<RecordOutcome, SyncError> {
        let result = sqlx::query(&self.statement)
            .bind(link)
            .bind(file_name)
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Record(e.to_string()))?;
        let rows_affected = result.rows_affected();
        debug!(file = file_name, rows_affected, "Share link recorded");
        Ok(RecordOutcome::Stored { rows_affected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, table: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            table: table.to_string(),
            link_column: default_link_column(),
            filename_column: default_filename_column(),
        }
    }

    #[test]
    fn update_statement_uses_backend_placeholders() {
        assert_eq!(
            config("sqlite::memory:", "JOB_BND").update_statement(),
            "UPDATE JOB_BND SET DOWNLOAD_LINK = ? WHERE FILENAME = ?"
        );
        assert_eq!(
            config("postgres://u@h/db", "jobs.JOB_BND").update_statement(),
            "UPDATE jobs.JOB_BND SET DOWNLOAD_LINK = $1 WHERE FILENAME = $2"
        );
    }

    #[test]
    fn rejects_identifiers_that_are_not_plain() {
        assert!(config("sqlite::memory:", "JOB_BND").validate().is_ok());
        assert!(config("sqlite::memory:", "NEPS.JOB_BND").validate().is_ok());
        assert!(config("sqlite::memory:", "a.b.c").validate().is_err());
        assert!(config("sqlite::memory:", "jobs; DROP TABLE x").validate().is_err());
        assert!(config("sqlite::memory:", "1jobs").validate().is_err());
        assert!(config("", "jobs").validate().is_err());

        let mut bad_column = config("sqlite::memory:", "jobs");
        bad_column.link_column = "link = 'x'".to_string();
        assert!(bad_column.validate().is_err());
    }

    #[test]
    fn debug_redacts_url() {
        let rendered = format!("{:?}", config("postgres://u:pw@h/db", "jobs"));
        assert!(!rendered.contains("pw"));
    }
}
