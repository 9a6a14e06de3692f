//! Reminders → Calendar grant repair in the user TCC database.
//!
//! Some MCP hosts end up with an allowed Reminders entry but no Calendar
//! entry, and the Calendar consent prompt never appears for them. When the
//! OS reports exactly that split, this module copies the Reminders row of
//! the client to `kTCCServiceCalendar`, keeping its code-signing
//! requirement, so the next launch sees both categories granted.
//!
//! Writing the database needs Full Disk Access for the calling process.
//! Every failure is returned to the caller, who logs it and carries on.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use super::{EntityCategory, PermissionGate};

/// TCC service name for Calendar.
pub const CALENDAR_SERVICE: &str = "kTCCServiceCalendar";
/// TCC service name for Reminders.
pub const REMINDERS_SERVICE: &str = "kTCCServiceReminders";
/// `auth_value` of an allowed entry.
const AUTH_ALLOWED: i64 = 2;

/// Error type for TCC database access.
#[derive(Debug, thiserror::Error)]
pub enum TccError {
    /// SQLite failure (including "unable to open" without Full Disk Access).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database has no `access` table.
    #[error("TCC database has no access table")]
    MissingAccessTable,

    /// The database file does not exist.
    #[error("TCC database not found at {0}")]
    NotFound(String),
}

/// What [`repair_calendar_grant`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The OS does not report the Reminders-only split.
    NotNeeded,
    /// An allowed Calendar row already exists for the client.
    AlreadyAllowed,
    /// No allowed, signed Reminders row exists for the client.
    NoSourceGrant,
    /// The Reminders row was copied to Calendar.
    Copied,
}

/// Run the repair only when the gate sees Reminders authorized and
/// Calendar not.
///
/// # Errors
///
/// Returns [`TccError`] if the database cannot be opened or written.
pub fn repair_if_needed(
    gate: &PermissionGate,
    database: &Path,
    client: &str,
) -> Result<RepairOutcome, TccError> {
    let events = gate.check(EntityCategory::Events);
    let reminders = gate.check(EntityCategory::Reminders);
    if events.authorized || !reminders.authorized {
        tracing::debug!(
            events = %events.status,
            reminders = %reminders.status,
            "TCC repair not needed"
        );
        return Ok(RepairOutcome::NotNeeded);
    }
    repair_calendar_grant(database, client)
}

/// Copy the allowed Reminders row of `client` to Calendar.
///
/// The copy is schema-agnostic: every column of the source row is carried
/// over except `service` (rewritten) and `last_modified` (set to now).
///
/// # Errors
///
/// Returns [`TccError`] if the database cannot be opened, read or written.
pub fn repair_calendar_grant(database: &Path, client: &str) -> Result<RepairOutcome, TccError> {
    if !database.is_file() {
        return Err(TccError::NotFound(database.display().to_string()));
    }
    let conn = Connection::open_with_flags(database, OpenFlags::SQLITE_OPEN_READ_WRITE)?;

    let calendar_allowed: Option<i64> = conn
        .query_row(
            "SELECT auth_value FROM access WHERE service = ?1 AND client = ?2 AND auth_value = ?3",
            params![CALENDAR_SERVICE, client, AUTH_ALLOWED],
            |row| row.get(0),
        )
        .optional()?;
    if calendar_allowed.is_some() {
        tracing::info!(client, "calendar grant already present in TCC database");
        return Ok(RepairOutcome::AlreadyAllowed);
    }

    let columns = access_columns(&conn)?;
    let select_list: Vec<String> = columns
        .iter()
        .map(|c| match c.as_str() {
            "service" => "?1".to_owned(),
            "last_modified" => "CAST(strftime('%s','now') AS INTEGER)".to_owned(),
            other => format!("\"{other}\""),
        })
        .collect();
    let column_list: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();

    let sql = format!(
        "INSERT OR REPLACE INTO access ({cols}) SELECT {select} FROM access \
         WHERE service = ?2 AND client = ?3 AND auth_value = ?4 AND csreq IS NOT NULL",
        cols = column_list.join(", "),
        select = select_list.join(", "),
    );
    let copied = conn.execute(
        &sql,
        params![CALENDAR_SERVICE, REMINDERS_SERVICE, client, AUTH_ALLOWED],
    )?;

    if copied == 0 {
        tracing::warn!(client, "no signed Reminders grant to copy");
        return Ok(RepairOutcome::NoSourceGrant);
    }
    tracing::info!(client, rows = copied, "copied Reminders grant to Calendar");
    Ok(RepairOutcome::Copied)
}

fn access_columns(conn: &Connection) -> Result<Vec<String>, TccError> {
    let mut stmt = conn.prepare("PRAGMA table_info(access)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(TccError::MissingAccessTable);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;

    use super::*;
    use crate::permissions::{AuthorizationStatus, StaticAuthorization};

    const CLIENT: &str = "com.anthropic.claudefordesktop";

    fn make_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("TCC.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE access (
                service TEXT NOT NULL,
                client TEXT NOT NULL,
                client_type INTEGER NOT NULL,
                auth_value INTEGER NOT NULL,
                auth_reason INTEGER NOT NULL,
                auth_version INTEGER NOT NULL,
                csreq BLOB,
                policy_id INTEGER,
                indirect_object_identifier TEXT NOT NULL DEFAULT 'UNUSED',
                flags INTEGER,
                last_modified INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (service, client, client_type, indirect_object_identifier)
            );",
        )
        .unwrap();
        path
    }

    fn insert(path: &Path, service: &str, auth_value: i64, csreq: Option<&[u8]>) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "INSERT INTO access (service, client, client_type, auth_value, auth_reason, \
             auth_version, csreq, flags) VALUES (?1, ?2, 0, ?3, 2, 1, ?4, 0)",
            params![service, CLIENT, auth_value, csreq],
        )
        .unwrap();
    }

    fn calendar_row(path: &Path) -> Option<(i64, Option<Vec<u8>>)> {
        let conn = Connection::open(path).unwrap();
        conn.query_row(
            "SELECT auth_value, csreq FROM access WHERE service = ?1 AND client = ?2",
            params![CALENDAR_SERVICE, CLIENT],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .unwrap()
    }

    #[test]
    fn copies_signed_reminders_grant() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, Some(b"csreq-blob"));

        let outcome = repair_calendar_grant(&db, CLIENT).unwrap();
        assert_eq!(outcome, RepairOutcome::Copied);
        let (auth, csreq) = calendar_row(&db).unwrap();
        assert_eq!(auth, 2);
        assert_eq!(csreq.as_deref(), Some(&b"csreq-blob"[..]));
    }

    #[test]
    fn replaces_denied_calendar_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, Some(b"sig"));
        insert(&db, CALENDAR_SERVICE, 0, None);

        assert_eq!(
            repair_calendar_grant(&db, CLIENT).unwrap(),
            RepairOutcome::Copied
        );
        assert_eq!(calendar_row(&db).unwrap().0, 2);
    }

    #[test]
    fn unsigned_reminders_row_is_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, None);

        assert_eq!(
            repair_calendar_grant(&db, CLIENT).unwrap(),
            RepairOutcome::NoSourceGrant
        );
        assert!(calendar_row(&db).is_none());
    }

    #[test]
    fn existing_allowed_calendar_row_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, Some(b"new"));
        insert(&db, CALENDAR_SERVICE, 2, Some(b"old"));

        assert_eq!(
            repair_calendar_grant(&db, CLIENT).unwrap(),
            RepairOutcome::AlreadyAllowed
        );
        assert_eq!(calendar_row(&db).unwrap().1.as_deref(), Some(&b"old"[..]));
    }

    #[test]
    fn missing_database_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = repair_calendar_grant(&dir.path().join("nope.db"), CLIENT).unwrap_err();
        assert!(matches!(err, TccError::NotFound(_)));
    }

    #[test]
    fn repair_if_needed_skips_when_calendar_authorized() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, Some(b"sig"));
        let gate = PermissionGate::new(Arc::new(StaticAuthorization::authorized()));

        assert_eq!(
            repair_if_needed(&gate, &db, CLIENT).unwrap(),
            RepairOutcome::NotNeeded
        );
        assert!(calendar_row(&db).is_none());
    }

    #[test]
    fn repair_if_needed_runs_on_reminders_only_split() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_db(dir.path());
        insert(&db, REMINDERS_SERVICE, 2, Some(b"sig"));
        let gate = PermissionGate::new(Arc::new(StaticAuthorization::new(
            AuthorizationStatus::Denied,
            AuthorizationStatus::Authorized,
        )));

        assert_eq!(
            repair_if_needed(&gate, &db, CLIENT).unwrap(),
            RepairOutcome::Copied
        );
    }
}
