use rusqlite::{params, OptionalExtension};

use super::{Database, DbError};

// ---------------------------------------------------------------------------
// Settings queries
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value_json: String,
    pub updated_at: String,
}

pub fn upsert_setting(
    db: &Database,
    key: &str,
    value_json: &str,
    updated_at: &str,
) -> Result<(), DbError> {
    let conn = db.conn();
    conn.execute(
        "INSERT INTO settings (key, value_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key)
         DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        params![key, value_json, updated_at],
    )?;
    Ok(())
}

pub fn get_setting(db: &Database, key: &str) -> Result<Option<String>, DbError> {
    let conn = db.conn();
    let value = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Returns true when a row was removed.
pub fn delete_setting(db: &Database, key: &str) -> Result<bool, DbError> {
    let conn = db.conn();
    let removed = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}

#[cfg(test)]
pub fn list_settings(db: &Database) -> Result<Vec<SettingRow>, DbError> {
    let conn = db.conn();
    let mut stmt =
        conn.prepare("SELECT key, value_json, updated_at FROM settings ORDER BY key")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SettingRow {
                key: row.get(0)?,
                value_json: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
