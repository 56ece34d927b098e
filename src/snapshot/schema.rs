use rusqlite::Connection;

use crate::error::{AllocationError, Result};

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "001",
    name: "initial",
    sql: include_str!("migrations/001_initial.sql"),
}];

/// Bring a freshly created snapshot file up to the current schema.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let applied = get_applied_migrations(conn)?;
    for migration in MIGRATIONS {
        if !applied.iter().any(|v| v == migration.version) {
            apply_migration(conn, migration)?;
        }
    }

    Ok(())
}

/// Check that a snapshot was written with exactly the migrations this build
/// knows. Snapshots are opened read-only, so nothing is upgraded in place.
pub fn check_compatible(conn: &Connection) -> Result<()> {
    let tracked: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
        [],
        |row| row.get(0),
    )?;
    if tracked == 0 {
        return Err(AllocationError::incompatible(
            "no schema_migrations table; not an allocation snapshot",
        ));
    }

    let applied = get_applied_migrations(conn)?;
    if let Some(unknown) = applied
        .iter()
        .find(|v| !MIGRATIONS.iter().any(|m| m.version == v.as_str()))
    {
        return Err(AllocationError::incompatible(format!(
            "written with unknown schema migration {unknown}"
        )));
    }
    if let Some(missing) = MIGRATIONS
        .iter()
        .find(|m| !applied.iter().any(|v| v == m.version))
    {
        return Err(AllocationError::incompatible(format!(
            "schema migration {} ({}) was never applied",
            missing.version, missing.name
        )));
    }

    Ok(())
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn mark_migration_applied(conn: &Connection, version: &str, name: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (version, name, &now),
    )?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    tracing::debug!(
        "Applying snapshot migration {}: {}",
        migration.version,
        migration.name
    );

    conn.execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", migration.sql))?;
    mark_migration_applied(conn, migration.version, migration.name)?;
    Ok(())
}
