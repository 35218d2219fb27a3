//! Database dumps via `pg_dump`.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::config::DatabaseConnection;
use crate::errors::UnitFailure;
use crate::restore::db_restore::{connection_args, find_tool};

/// Dumps one database into one dump file inside a snapshot.
pub trait DatabaseDumper: Send + Sync {
    fn dump_database(
        &self,
        alias: &str,
        source: &DatabaseConnection,
        dump_path: &Path,
    ) -> Result<(), UnitFailure>;
}

/// `pg_dump`-backed dumper using the custom archive format, which is what
/// `pg_restore` consumes on the way back.
#[derive(Debug, Default)]
pub struct PgDump;

impl DatabaseDumper for PgDump {
    fn dump_database(
        &self,
        alias: &str,
        source: &DatabaseConnection,
        dump_path: &Path,
    ) -> Result<(), UnitFailure> {
        let pg_dump = find_tool("pg_dump").map_err(|reason| UnitFailure::database(alias, reason))?;

        info!(
            alias,
            database = %source.name,
            dump = %dump_path.display(),
            "dumping database"
        );
        let output = Command::new(pg_dump)
            .env("PGPASSWORD", &source.password)
            .args(["--format", "custom"])
            .args(connection_args(source))
            .arg("-f")
            .arg(dump_path)
            .arg(&source.name)
            .output()
            .map_err(|e| UnitFailure::database(alias, format!("failed to run pg_dump: {e}")))?;

        if !output.status.success() {
            return Err(UnitFailure::database(
                alias,
                format!(
                    "pg_dump exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}
