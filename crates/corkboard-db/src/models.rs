//! Database row types. These map directly to SQLite rows and convert into
//! the public models from `corkboard-types`.

use chrono::{DateTime, NaiveDateTime, Utc};
use corkboard_types::models::{Board, Bookmark, User};
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BoardRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BookmarkRow {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Owner chain of a bookmark, resolved through its board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkOwner {
    pub board_id: i64,
    pub owner_id: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<BookmarkRow> for Bookmark {
    fn from(row: BookmarkRow) -> Self {
        Self {
            id: row.id,
            board_id: row.board_id,
            title: row.title,
            url: row.url,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC, falling back to RFC 3339.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
