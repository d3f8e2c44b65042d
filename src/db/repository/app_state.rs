use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;

/// Read the active conversation selection (None = nothing selected).
pub fn get_active_conversation_id(conn: &Connection) -> Result<Option<Uuid>, DatabaseError> {
    let value: Option<String> = conn.query_row(
        "SELECT active_conversation_id FROM app_state WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(value.and_then(|s| Uuid::parse_str(&s).ok()))
}

/// Persist the active conversation selection.
pub fn set_active_conversation_id(
    conn: &Connection,
    id: Option<Uuid>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE app_state SET active_conversation_id = ?1 WHERE id = 1",
        params![id.map(|u| u.to_string())],
    )?;
    Ok(())
}
