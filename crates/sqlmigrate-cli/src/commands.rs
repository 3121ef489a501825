use anyhow::{Context, Result};
use sqlmigrate_config::MigrateConfig;
use sqlmigrate_db::{DirectorySource, Ledger, Runner, connect, init_with_config};

pub fn up(config: &MigrateConfig) -> Result<()> {
    let (_conn, report) = init_with_config(config).with_context(|| {
        format!(
            "failed to migrate {} from {}",
            config.database_path.display(),
            config.migrations_dir.display()
        )
    })?;

    if report.applied.is_empty() {
        println!("Database is up to date ({} applied).", report.skipped.len());
    } else {
        for name in &report.applied {
            println!("applied  {name}");
        }
        println!(
            "{} migration(s) applied, {} already up to date.",
            report.applied.len(),
            report.skipped.len()
        );
    }
    Ok(())
}

pub fn status(config: &MigrateConfig) -> Result<()> {
    let conn = connect(config)?;
    let ledger = Ledger::new(config.table.clone())?;
    ledger.ensure_schema(&conn)?;

    let records = ledger
        .applied(&conn)
        .context("failed to read migrations table")?;
    if records.is_empty() {
        println!("No migrations applied.");
        return Ok(());
    }
    for record in records {
        println!(
            "{:>4}  {}  {}",
            record.id,
            record.applied_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.name
        );
    }
    Ok(())
}

pub fn pending(config: &MigrateConfig) -> Result<()> {
    let conn = connect(config)?;
    let source = DirectorySource::from_config(config);
    let runner = Runner::new(&source).with_ledger(Ledger::new(config.table.clone())?);

    let pending = runner.pending(&conn).with_context(|| {
        format!("failed to list migrations in {}", config.migrations_dir.display())
    })?;
    if pending.is_empty() {
        println!("No pending migrations.");
    }
    for name in pending {
        println!("pending  {name}");
    }
    Ok(())
}
