use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Conversation;

use super::{format_datetime, parse_datetime, parse_uuid};

pub fn insert_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            conv.id.to_string(),
            conv.title,
            format_datetime(&conv.created_at),
            format_datetime(&conv.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_conversation(conn: &Connection, id: &Uuid) -> Result<Option<Conversation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?1",
        params![id.to_string()],
        row_to_parts,
    );

    match result {
        Ok(parts) => Ok(Some(conversation_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Page of conversations, newest activity first.
pub fn list_conversations(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<Vec<Conversation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, created_at, updated_at FROM conversations
         ORDER BY updated_at DESC LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt.query_map(params![limit, offset], row_to_parts)?;

    let mut conversations = Vec::new();
    for row in rows {
        conversations.push(conversation_from_parts(row?)?);
    }
    Ok(conversations)
}

/// Every conversation, newest activity first. Used by the insights report.
pub fn list_all_conversations(conn: &Connection) -> Result<Vec<Conversation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, created_at, updated_at FROM conversations ORDER BY updated_at DESC",
    )?;
    let rows = stmt.query_map([], row_to_parts)?;

    let mut conversations = Vec::new();
    for row in rows {
        conversations.push(conversation_from_parts(row?)?);
    }
    Ok(conversations)
}

pub fn count_conversations(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
    Ok(count)
}

/// Update the title. Returns false when the conversation does not exist.
pub fn update_conversation_title(
    conn: &Connection,
    id: &Uuid,
    title: Option<&str>,
    at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
        params![title, format_datetime(at), id.to_string()],
    )?;
    Ok(rows > 0)
}

/// Bump updated_at, marking fresh activity in the conversation.
pub fn touch_conversation(
    conn: &Connection,
    id: &Uuid,
    at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
        params![format_datetime(at), id.to_string()],
    )?;
    Ok(())
}

/// Delete a conversation and all its messages (CASCADE).
pub fn delete_conversation(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM conversations WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(rows > 0)
}

type ConversationParts = (String, Option<String>, String, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn conversation_from_parts(parts: ConversationParts) -> Result<Conversation, DatabaseError> {
    let (id, title, created_at, updated_at) = parts;
    Ok(Conversation {
        id: parse_uuid(&id)?,
        title,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    fn make_conversation(title: Option<&str>) -> Conversation {
        let now = Utc::now().naive_utc();
        Conversation {
            id: Uuid::new_v4(),
            title: title.map(|t| t.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let conv = make_conversation(Some("Rust questions"));
        insert_conversation(&conn, &conv).unwrap();

        let loaded = get_conversation(&conn, &conv.id).unwrap().unwrap();
        assert_eq!(loaded.id, conv.id);
        assert_eq!(loaded.title.as_deref(), Some("Rust questions"));
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_conversation(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_updated_at_desc() {
        let conn = open_memory_database().unwrap();
        let mut old = make_conversation(Some("old"));
        old.updated_at = parse_datetime("2026-01-01 10:00:00").unwrap();
        old.created_at = old.updated_at;
        let mut new = make_conversation(Some("new"));
        new.updated_at = parse_datetime("2026-02-01 10:00:00").unwrap();
        new.created_at = new.updated_at;
        insert_conversation(&conn, &old).unwrap();
        insert_conversation(&conn, &new).unwrap();

        let listed = list_conversations(&conn, 10, 0).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title.as_deref(), Some("new"));
        assert_eq!(listed[1].title.as_deref(), Some("old"));
    }

    #[test]
    fn list_honors_limit_and_offset() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            let mut conv = make_conversation(Some(&format!("c{i}")));
            conv.updated_at = parse_datetime(&format!("2026-01-0{} 10:00:00", i + 1)).unwrap();
            insert_conversation(&conn, &conv).unwrap();
        }

        let page = list_conversations(&conn, 2, 1).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title.as_deref(), Some("c3"));
        assert_eq!(page[1].title.as_deref(), Some("c2"));
        assert_eq!(count_conversations(&conn).unwrap(), 5);
    }

    #[test]
    fn update_title_and_clear() {
        let conn = open_memory_database().unwrap();
        let conv = make_conversation(None);
        insert_conversation(&conn, &conv).unwrap();

        let at = Utc::now().naive_utc();
        assert!(update_conversation_title(&conn, &conv.id, Some("Named"), &at).unwrap());
        let loaded = get_conversation(&conn, &conv.id).unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Named"));

        assert!(update_conversation_title(&conn, &conv.id, None, &at).unwrap());
        let loaded = get_conversation(&conn, &conv.id).unwrap().unwrap();
        assert!(loaded.title.is_none());
    }

    #[test]
    fn update_title_missing_conversation() {
        let conn = open_memory_database().unwrap();
        let at = Utc::now().naive_utc();
        assert!(!update_conversation_title(&conn, &Uuid::new_v4(), Some("x"), &at).unwrap());
    }

    #[test]
    fn delete_returns_whether_row_existed() {
        let conn = open_memory_database().unwrap();
        let conv = make_conversation(Some("bye"));
        insert_conversation(&conn, &conv).unwrap();

        assert!(delete_conversation(&conn, &conv.id).unwrap());
        assert!(!delete_conversation(&conn, &conv.id).unwrap());
    }
}
