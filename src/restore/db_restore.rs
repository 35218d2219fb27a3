//! Database restore via the Postgres client tools.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};
use which::which;

use crate::config::DatabaseConnection;
use crate::errors::UnitFailure;

/// Restores one database dump into one target connection.
///
/// Implementations run each unit to completion or report failure; a partially
/// applied restore is still a failure. Nothing is rolled back.
pub trait DatabaseRestorer: Send + Sync {
    fn restore_database(
        &self,
        alias: &str,
        dump_path: &Path,
        target: &DatabaseConnection,
    ) -> Result<(), UnitFailure>;
}

/// `pg_restore`-backed restorer. Creates the target database when it does not
/// exist yet, so a dump can be restored into a database name that differs from
/// the one it was taken from.
#[derive(Debug, Default)]
pub struct PgRestore;

pub(crate) fn find_tool(name: &str) -> Result<PathBuf, String> {
    which(name).map_err(|_| {
        format!(
            "{name} executable not found in PATH. Please ensure PostgreSQL \
             client tools are installed and in your PATH."
        )
    })
}

pub(crate) fn connection_args(target: &DatabaseConnection) -> Vec<String> {
    vec![
        "-h".to_string(),
        target.host.clone(),
        "-p".to_string(),
        target.port.to_string(),
        "-U".to_string(),
        target.user.clone(),
    ]
}

impl PgRestore {
    fn ensure_database(&self, target: &DatabaseConnection) -> Result<(), String> {
        let createdb = find_tool("createdb")?;
        let output = Command::new(createdb)
            .env("PGPASSWORD", &target.password)
            .args(connection_args(target))
            .arg(&target.name)
            .output()
            .map_err(|e| format!("failed to run createdb: {e}"))?;

        if output.status.success() {
            info!(database = %target.name, "created target database");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("already exists") {
            debug!(database = %target.name, "target database already exists");
            return Ok(());
        }
        Err(format!(
            "createdb for '{}' failed: {}",
            target.name,
            stderr.trim()
        ))
    }
}

impl DatabaseRestorer for PgRestore {
    fn restore_database(
        &self,
        alias: &str,
        dump_path: &Path,
        target: &DatabaseConnection,
    ) -> Result<(), UnitFailure> {
        if !dump_path.is_file() {
            return Err(UnitFailure::database(
                alias,
                format!("dump file missing: {}", dump_path.display()),
            ));
        }
        self.ensure_database(target)
            .map_err(|reason| UnitFailure::database(alias, reason))?;

        let pg_restore =
            find_tool("pg_restore").map_err(|reason| UnitFailure::database(alias, reason))?;

        info!(
            alias,
            database = %target.name,
            dump = %dump_path.display(),
            "restoring database dump"
        );
        let output = Command::new(pg_restore)
            .env("PGPASSWORD", &target.password)
            .args(["--clean", "--if-exists", "--no-owner"])
            .args(connection_args(target))
            .args(["-d", &target.name])
            .arg(dump_path)
            .output()
            .map_err(|e| {
                UnitFailure::database(alias, format!("failed to run pg_restore: {e}"))
            })?;

        if !output.status.success() {
            return Err(UnitFailure::database(
                alias,
                format!(
                    "pg_restore exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_args_cover_host_port_user() {
        let conn = DatabaseConnection {
            host: "db.internal".to_string(),
            port: 5433,
            user: "myapp".to_string(),
            password: "s3cret".to_string(),
            name: "myapp".to_string(),
        };
        assert_eq!(
            connection_args(&conn),
            vec!["-h", "db.internal", "-p", "5433", "-U", "myapp"]
        );
    }

    #[test]
    fn missing_dump_file_fails_with_unit_identity() {
        let conn = DatabaseConnection {
            host: "localhost".to_string(),
            port: 5432,
            user: "myapp".to_string(),
            password: String::new(),
            name: "myapp".to_string(),
        };
        let err = PgRestore
            .restore_database("default", Path::new("/nowhere/default.dump"), &conn)
            .unwrap_err();
        assert_eq!(err.unit, "database 'default'");
        assert!(err.reason.contains("dump file missing"));
    }
}
