//! Query functions over a borrowed connection.
//!
//! Everything here takes `&Connection` so the same function can run on a
//! reader, on the writer, or inside a `Transaction` (which derefs to one).
//! Writes against owned resources carry the owner predicate themselves.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::Database;
use crate::models::{BoardRow, BookmarkOwner, BookmarkRow, UserRow};

const USER_COLUMNS: &str = "id, email, password_hash, created_at, updated_at";
const BOARD_COLUMNS: &str = "id, owner_id, title, description, created_at, updated_at";
const BOOKMARK_COLUMNS: &str = "id, board_id, title, url, created_at, updated_at";

impl Database {
    pub fn list_boards(&self, limit: u32, offset: u64) -> Result<Vec<BoardRow>> {
        self.with_conn(|conn| list_boards(conn, limit, offset))
    }

    pub fn get_board(&self, id: i64) -> Result<Option<BoardRow>> {
        self.with_conn(|conn| board_by_id(conn, id))
    }

    /// `None` when the board itself does not exist, as opposed to an empty board.
    pub fn get_board_bookmarks(&self, board_id: i64) -> Result<Option<Vec<BookmarkRow>>> {
        self.with_conn(|conn| {
            if board_owner(conn, board_id)?.is_none() {
                return Ok(None);
            }
            bookmarks_for_board(conn, board_id).map(Some)
        })
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn_mut(delete_expired_sessions)
    }
}

// -- Users --

/// Insert a user. Returns `None` when the email is already registered.
pub fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
) -> Result<Option<UserRow>> {
    let sql = format!(
        "INSERT INTO users (email, password_hash) VALUES (?1, ?2) RETURNING {USER_COLUMNS}"
    );
    match conn.query_row(&sql, (email, password_hash), user_from_row) {
        Ok(row) => Ok(Some(row)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    Ok(conn.query_row(&sql, [email], user_from_row).optional()?)
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

/// Delete a user. Sessions, boards and bookmarks go with it (ON DELETE CASCADE).
pub fn delete_user(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

// -- Sessions --

/// Insert a session expiring `ttl_secs` from now.
/// Returns `false` if the token hash already exists.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: i64,
    ttl_secs: i64,
) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO sessions (token_hash, user_id, expires_at)
         VALUES (?1, ?2, datetime('now', '+' || ?3 || ' seconds'))",
        params![token_hash, user_id, ttl_secs],
    );
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Resolve an unexpired session to its user.
pub fn session_user(conn: &Connection, token_hash: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT u.id, u.email, u.password_hash, u.created_at, u.updated_at
             FROM sessions s
             JOIN users u ON s.user_id = u.id
             WHERE s.token_hash = ?1 AND s.expires_at > datetime('now')",
            [token_hash],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
    Ok(affected > 0)
}

pub fn delete_expired_sessions(conn: &Connection) -> Result<usize> {
    let affected = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(affected)
}

// -- Boards --

pub fn list_boards(conn: &Connection, limit: u32, offset: u64) -> Result<Vec<BoardRow>> {
    let sql = format!("SELECT {BOARD_COLUMNS} FROM boards ORDER BY id LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit, offset as i64], board_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn board_by_id(conn: &Connection, id: i64) -> Result<Option<BoardRow>> {
    let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], board_from_row).optional()?)
}

pub fn board_owner(conn: &Connection, id: i64) -> Result<Option<i64>> {
    let owner = conn
        .query_row("SELECT owner_id FROM boards WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(owner)
}

pub fn insert_board(
    conn: &Connection,
    owner_id: i64,
    title: &str,
    description: Option<&str>,
) -> Result<BoardRow> {
    let sql = format!(
        "INSERT INTO boards (owner_id, title, description) VALUES (?1, ?2, ?3)
         RETURNING {BOARD_COLUMNS}"
    );
    Ok(conn.query_row(&sql, params![owner_id, title, description], board_from_row)?)
}

/// Update the supplied fields of a board owned by `owner_id`.
/// `description: Some(None)` clears the description.
/// Returns `None` if no such board belongs to that owner.
pub fn update_board(
    conn: &Connection,
    id: i64,
    owner_id: i64,
    title: Option<&str>,
    description: Option<Option<&str>>,
) -> Result<Option<BoardRow>> {
    let sql = format!(
        "UPDATE boards
         SET title = COALESCE(?3, title),
             description = CASE WHEN ?4 THEN ?5 ELSE description END,
             updated_at = datetime('now')
         WHERE id = ?1 AND owner_id = ?2
         RETURNING {BOARD_COLUMNS}"
    );
    let set_description = description.is_some();
    let row = conn
        .query_row(
            &sql,
            params![id, owner_id, title, set_description, description.flatten()],
            board_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn delete_board(conn: &Connection, id: i64, owner_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM boards WHERE id = ?1 AND owner_id = ?2",
        [id, owner_id],
    )?;
    Ok(affected > 0)
}

// -- Bookmarks --

pub fn bookmarks_for_board(conn: &Connection, board_id: i64) -> Result<Vec<BookmarkRow>> {
    let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE board_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([board_id], bookmark_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Resolve bookmark -> board -> owner in one join.
pub fn bookmark_owner(conn: &Connection, bookmark_id: i64) -> Result<Option<BookmarkOwner>> {
    let owner = conn
        .query_row(
            "SELECT k.board_id, b.owner_id
             FROM bookmarks k
             JOIN boards b ON k.board_id = b.id
             WHERE k.id = ?1",
            [bookmark_id],
            |row| {
                Ok(BookmarkOwner {
                    board_id: row.get(0)?,
                    owner_id: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(owner)
}

pub fn insert_bookmark(
    conn: &Connection,
    board_id: i64,
    title: &str,
    url: &str,
) -> Result<BookmarkRow> {
    let sql = format!(
        "INSERT INTO bookmarks (board_id, title, url) VALUES (?1, ?2, ?3)
         RETURNING {BOOKMARK_COLUMNS}"
    );
    Ok(conn.query_row(&sql, params![board_id, title, url], bookmark_from_row)?)
}

/// Update a bookmark whose board is owned by `owner_id`.
pub fn update_bookmark(
    conn: &Connection,
    id: i64,
    owner_id: i64,
    title: Option<&str>,
    url: Option<&str>,
) -> Result<Option<BookmarkRow>> {
    let sql = format!(
        "UPDATE bookmarks
         SET title = COALESCE(?3, title),
             url = COALESCE(?4, url),
             updated_at = datetime('now')
         WHERE id = ?1
           AND board_id IN (SELECT id FROM boards WHERE owner_id = ?2)
         RETURNING {BOOKMARK_COLUMNS}"
    );
    let row = conn
        .query_row(&sql, params![id, owner_id, title, url], bookmark_from_row)
        .optional()?;
    Ok(row)
}

pub fn bookmark_by_id(conn: &Connection, id: i64) -> Result<Option<BookmarkRow>> {
    let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], bookmark_from_row).optional()?)
}

pub fn delete_bookmark(conn: &Connection, id: i64, owner_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM bookmarks
         WHERE id = ?1
           AND board_id IN (SELECT id FROM boards WHERE owner_id = ?2)",
        [id, owner_id],
    )?;
    Ok(affected > 0)
}

// -- Row mapping --

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<BoardRow> {
    Ok(BoardRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<BookmarkRow> {
    Ok(BookmarkRow {
        id: row.get(0)?,
        board_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
