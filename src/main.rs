//! CLI for the backup/restore tool.
//!
//! ```text
//! backuptool backup  <config.yml> [--no-db] [--no-files] [--skip-db ALIAS]... [--skip-files SETTING]...
//! backuptool restore <config.yml> <archive-dir> [--no-db] [--no-files]
//!                    [--skip-db ALIAS]... [--skip-files SETTING]... [--db-name SRC=DST]...
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use backuptool::{Backup, BackupOptions, RestoreOptions};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        bail!("no operation given");
    };

    match command.as_str() {
        "backup" => {
            let (config_path, opts) = parse_backup_args(&args[1..])?;
            println!("🚀 Starting backup...");
            let backup = Backup::prepare_backup(&config_path)
                .context("Failed to prepare backup")?;
            println!("Snapshot: {}", backup.archive().path().display());
            backup.run_backup(&opts).await.context("Backup failed")?;
        }
        "restore" => {
            let (config_path, archive_path, opts) = parse_restore_args(&args[1..])?;
            println!("🔄 Starting restore from {}...", archive_path.display());
            let backup = Backup::prepare_restore(&config_path, &archive_path)
                .context("Failed to prepare restore")?;
            backup.restore(&opts).await.context("Restore failed")?;
        }
        _ => {
            print_usage();
            bail!("unknown operation '{command}'");
        }
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  backuptool backup  <config.yml> [flags]");
    eprintln!("  backuptool restore <config.yml> <archive-dir> [flags]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --no-db                 skip all database units");
    eprintln!("  --no-files              skip all directory units");
    eprintln!("  --skip-db <alias>       exclude one database alias (repeatable)");
    eprintln!("  --skip-files <setting>  exclude one directory setting (repeatable)");
    eprintln!("  --db-name <src>=<dst>   restore a dump into a different alias (restore only)");
}

fn parse_backup_args(args: &[String]) -> Result<(PathBuf, BackupOptions)> {
    let mut opts = BackupOptions::default();
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-db" => opts.db = false,
            "--no-files" => opts.files = false,
            "--skip-db" => opts.skip_db.push(flag_value(&mut iter, "--skip-db")?),
            "--skip-files" => opts.skip_files.push(flag_value(&mut iter, "--skip-files")?),
            flag if flag.starts_with("--") => bail!("unknown flag '{flag}' for backup"),
            _ => positional.push(arg.clone()),
        }
    }

    let [config_path] = positional.as_slice() else {
        bail!("backup takes exactly one positional argument: <config.yml>");
    };
    Ok((PathBuf::from(config_path), opts))
}

fn parse_restore_args(args: &[String]) -> Result<(PathBuf, PathBuf, RestoreOptions)> {
    let mut opts = RestoreOptions::default();
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-db" => opts.db = false,
            "--no-files" => opts.files = false,
            "--skip-db" => opts.skip_db.push(flag_value(&mut iter, "--skip-db")?),
            "--skip-files" => opts.skip_files.push(flag_value(&mut iter, "--skip-files")?),
            "--db-name" => {
                let value = flag_value(&mut iter, "--db-name")?;
                let Some((src, dst)) = value.split_once('=') else {
                    bail!("--db-name expects <src>=<dst>, got '{value}'");
                };
                opts.db_names.insert(src.to_string(), dst.to_string());
            }
            flag if flag.starts_with("--") => bail!("unknown flag '{flag}' for restore"),
            _ => positional.push(arg.clone()),
        }
    }

    let [config_path, archive_path] = positional.as_slice() else {
        bail!("restore takes exactly two positional arguments: <config.yml> <archive-dir>");
    };
    Ok((PathBuf::from(config_path), PathBuf::from(archive_path), opts))
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next()
        .map(|v| v.to_string())
        .with_context(|| format!("{flag} expects a value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_restore_flags() {
        let args = strings(&[
            "config.yml",
            "/backups/2018-06-27-daily",
            "--no-files",
            "--skip-db",
            "secondary",
            "--skip-db",
            "dummy",
            "--db-name",
            "default=dummy",
        ]);
        let (config, archive, opts) = parse_restore_args(&args).unwrap();
        assert_eq!(config, PathBuf::from("config.yml"));
        assert_eq!(archive, PathBuf::from("/backups/2018-06-27-daily"));
        assert!(opts.db);
        assert!(!opts.files);
        assert_eq!(opts.skip_db, vec!["secondary", "dummy"]);
        assert_eq!(opts.db_names.get("default"), Some(&"dummy".to_string()));
    }

    #[test]
    fn rejects_malformed_db_name() {
        let args = strings(&["config.yml", "/backups/x", "--db-name", "default"]);
        assert!(parse_restore_args(&args).is_err());
    }

    #[test]
    fn backup_takes_one_positional() {
        let args = strings(&["config.yml", "extra"]);
        assert!(parse_backup_args(&args).is_err());

        let (config, opts) = parse_backup_args(&strings(&["config.yml", "--no-db"])).unwrap();
        assert_eq!(config, PathBuf::from("config.yml"));
        assert!(!opts.db);
    }
}
