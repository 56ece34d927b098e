//! Whole-store snapshots in a SQLite file.
//!
//! A snapshot holds one table per collection and one per relationship. Derived
//! state (credit tallies, enrolled counts) is never written: loading replays
//! every link through the engine's own rules, so a snapshot that would break
//! an invariant is rejected instead of trusted.

mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use crate::error::{AllocationError, ErrorCategory, Result};
use crate::idgen::IdGenerator;
use crate::ids::{ModuleCode, StaffId, StudentId};
use crate::manager::AllocationManager;
use crate::models::{Module, Staff, Student};

const GENERATOR: &str = concat!("unialloc ", env!("CARGO_PKG_VERSION"));

/// Write every record and link in `manager` to `path`.
///
/// The snapshot is built in a sibling temporary file and renamed over `path`,
/// so an interrupted save never leaves a half-written snapshot behind.
pub fn save(manager: &AllocationManager, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    if tmp.exists() {
        std::fs::remove_file(&tmp)?;
    }

    if let Err(e) = write_snapshot(manager, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)?;

    tracing::info!(
        "Saved snapshot to {} ({} students, {} staff, {} modules)",
        path.display(),
        manager.number_of_students(),
        manager.number_of_staff(),
        manager.number_of_modules()
    );
    Ok(())
}

/// Rebuild a store from the snapshot at `path`.
pub fn load(path: &Path) -> Result<AllocationManager> {
    // Opening read-only never creates the file, but report a missing one as
    // plain I/O rather than a SQLite failure.
    std::fs::metadata(path)?;
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    schema::check_compatible(&conn)?;

    let mut manager = AllocationManager::with_generator(IdGenerator::from_os_rng());

    for (id, forename, surname, stage) in read_students(&conn)? {
        let stage = narrow::<u8>("student stage", stage)?;
        let student = replay(Student::new(forename, surname, stage).and_then(|mut s| {
            s.set_id(StudentId::parse(&id)?)?;
            Ok(s)
        }))?;
        replay(manager.restore_student(student))?;
    }

    let mut stmt = conn.prepare("SELECT id, forename, surname FROM staff ORDER BY id")?;
    let staff_rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (id, forename, surname) in staff_rows {
        let mut staff = Staff::new(forename, surname);
        replay(StaffId::parse(&id).and_then(|id| staff.set_id(id)))?;
        replay(manager.restore_staff(staff))?;
    }

    let mut stmt = conn.prepare(
        "SELECT code, name, credits, stage, capacity, discontinued FROM modules ORDER BY code",
    )?;
    let module_rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (code, name, credits, stage, capacity, discontinued) in module_rows {
        let credits = narrow::<u8>("module credits", credits)?;
        let stage = narrow::<u8>("module stage", stage)?;
        let capacity = narrow::<u32>("module capacity", capacity)?;
        let mut module = replay(Module::new(name, credits, stage, capacity))?;
        replay(ModuleCode::parse(&code).and_then(|code| module.set_code(code)))?;
        if discontinued {
            module.mark_discontinued();
        }
        replay(manager.restore_module(module))?;
    }

    for (staff_id, code) in read_links(&conn, "SELECT staff_id, module_code FROM teaching")? {
        let staff_id = replay(StaffId::parse(&staff_id))?;
        let code = replay(ModuleCode::parse(&code))?;
        replay(manager.restore_teaching(&staff_id, &code))?;
    }

    for (student_id, code) in read_links(&conn, "SELECT student_id, module_code FROM enrolments")? {
        let student_id = replay(StudentId::parse(&student_id))?;
        let code = replay(ModuleCode::parse(&code))?;
        replay(manager.restore_enrolment(&student_id, &code))?;
    }

    let saved_at: Option<String> = conn
        .query_row(
            "SELECT value FROM snapshot_meta WHERE key = 'saved_at'",
            [],
            |row| row.get(0),
        )
        .ok();
    tracing::info!(
        "Loaded snapshot from {} saved at {} ({} students, {} staff, {} modules)",
        path.display(),
        saved_at.as_deref().unwrap_or("unknown time"),
        manager.number_of_students(),
        manager.number_of_staff(),
        manager.number_of_modules()
    );
    Ok(manager)
}

fn write_snapshot(manager: &AllocationManager, path: &Path) -> Result<()> {
    let mut conn = Connection::open(path)?;
    schema::run_migrations(&conn)?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO students (id, forename, surname, stage) VALUES (?, ?, ?, ?)",
        )?;
        let mut enrol =
            tx.prepare("INSERT INTO enrolments (student_id, module_code) VALUES (?, ?)")?;
        for (id, student) in manager.student_records() {
            insert.execute((
                id.as_str(),
                student.forename(),
                student.surname(),
                student.stage().get(),
            ))?;
            for code in student.modules() {
                enrol.execute((id.as_str(), code.as_str()))?;
            }
        }

        let mut insert =
            tx.prepare("INSERT INTO staff (id, forename, surname) VALUES (?, ?, ?)")?;
        let mut teach =
            tx.prepare("INSERT INTO teaching (staff_id, module_code) VALUES (?, ?)")?;
        for (id, staff) in manager.staff_records() {
            insert.execute((id.as_str(), staff.forename(), staff.surname()))?;
            for code in staff.teaching_modules() {
                teach.execute((id.as_str(), code.as_str()))?;
            }
        }

        let mut insert = tx.prepare(
            "INSERT INTO modules (code, name, credits, stage, capacity, discontinued)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (code, module) in manager.module_records() {
            insert.execute((
                code.as_str(),
                module.name(),
                module.credits(),
                module.stage().get(),
                module.capacity(),
                module.is_discontinued(),
            ))?;
        }

        let mut meta = tx.prepare("INSERT INTO snapshot_meta (key, value) VALUES (?, ?)")?;
        meta.execute(("saved_at", chrono::Utc::now().to_rfc3339()))?;
        meta.execute(("generator", GENERATOR))?;
    }
    tx.commit()?;
    Ok(())
}

fn read_students(conn: &Connection) -> Result<Vec<(String, String, String, i64)>> {
    let mut stmt = conn.prepare("SELECT id, forename, surname, stage FROM students ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn read_links(conn: &Connection, sql: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Any rule the stored data breaks makes the whole snapshot incompatible.
fn replay<T>(result: Result<T>) -> Result<T> {
    result.map_err(|e| match e.category() {
        ErrorCategory::Persistence => e,
        _ => AllocationError::incompatible(e.to_string()),
    })
}

fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| AllocationError::incompatible(format!("{field} {value} is out of range")))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
