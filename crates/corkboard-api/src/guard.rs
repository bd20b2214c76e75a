//! Ownership checks for board and bookmark mutations.
//!
//! Handlers call these with the transaction that will carry the mutation,
//! so the check and the write see the same state.

use corkboard_db::{Connection, queries};
use tracing::debug;

use crate::error::ApiError;
use crate::middleware::Caller;

/// What a successful bookmark authorization resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkGrant {
    pub user_id: i64,
    pub board_id: i64,
}

/// Succeeds with the caller's user id when `board_id` exists and is theirs.
pub fn authorize_board_mutation(
    conn: &Connection,
    board_id: i64,
    caller: &Caller,
) -> Result<i64, ApiError> {
    let user_id = caller.user_id()?;

    match queries::board_owner(conn, board_id)? {
        None => Err(ApiError::NotFound),
        Some(owner_id) if owner_id == user_id => Ok(user_id),
        Some(owner_id) => {
            debug!("User {} denied on board {} owned by {}", user_id, board_id, owner_id);
            Err(ApiError::Unauthorized)
        }
    }
}

/// Resolves bookmark -> board -> owner and compares against the caller.
pub fn authorize_bookmark_mutation(
    conn: &Connection,
    bookmark_id: i64,
    caller: &Caller,
) -> Result<BookmarkGrant, ApiError> {
    authorize_bookmark(conn, bookmark_id, None, caller)
}

/// Like [`authorize_bookmark_mutation`], but the bookmark must also sit on
/// `board_id`. A bookmark addressed through the wrong board is `NotFound`,
/// whoever owns either board.
pub fn authorize_bookmark_on_board(
    conn: &Connection,
    board_id: i64,
    bookmark_id: i64,
    caller: &Caller,
) -> Result<BookmarkGrant, ApiError> {
    authorize_bookmark(conn, bookmark_id, Some(board_id), caller)
}

fn authorize_bookmark(
    conn: &Connection,
    bookmark_id: i64,
    expected_board: Option<i64>,
    caller: &Caller,
) -> Result<BookmarkGrant, ApiError> {
    let user_id = caller.user_id()?;

    let chain = queries::bookmark_owner(conn, bookmark_id)?.ok_or(ApiError::NotFound)?;
    if expected_board.is_some_and(|board_id| board_id != chain.board_id) {
        return Err(ApiError::NotFound);
    }
    if chain.owner_id != user_id {
        debug!(
            "User {} denied on bookmark {} (board {} owned by {})",
            user_id, bookmark_id, chain.board_id, chain.owner_id
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(BookmarkGrant {
        user_id,
        board_id: chain.board_id,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use corkboard_db::Database;
    use corkboard_types::models::User;

    use super::*;
    use crate::middleware::Identity;
    use crate::sessions::SessionToken;

    fn caller(user_id: i64) -> Caller {
        Caller::from(Identity {
            user: User {
                id: user_id,
                email: format!("user{user_id}@example.com"),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            token: SessionToken::generate(),
        })
    }

    struct Fixture {
        db: Database,
        alice: i64,
        carol: i64,
        alice_board: i64,
        carol_board: i64,
        alice_bookmark: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let (alice, carol, alice_board, carol_board, alice_bookmark) = db
            .with_conn_mut(|c| {
                let alice = queries::insert_user(c, "alice@example.com", "h")?.unwrap().id;
                let carol = queries::insert_user(c, "carol@example.com", "h")?.unwrap().id;
                let alice_board = queries::insert_board(c, alice, "A", None)?.id;
                let carol_board = queries::insert_board(c, carol, "C", None)?.id;
                let alice_bookmark =
                    queries::insert_bookmark(c, alice_board, "K", "https://k.example.com")?.id;
                Ok((alice, carol, alice_board, carol_board, alice_bookmark))
            })
            .unwrap();

        Fixture {
            db,
            alice,
            carol,
            alice_board,
            carol_board,
            alice_bookmark,
        }
    }

    #[test]
    fn anonymous_fails_before_any_query() {
        // No schema at all: any query would surface as Internal.
        let bare = Connection::open_in_memory().unwrap();
        let anon = Caller::anonymous();

        assert!(matches!(
            authorize_board_mutation(&bare, 1, &anon),
            Err(ApiError::Unauthenticated)
        ));
        assert!(matches!(
            authorize_bookmark_mutation(&bare, 1, &anon),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn board_owner_is_allowed_others_are_not() {
        let f = fixture();
        f.db.with_conn(|c| {
            assert_eq!(
                authorize_board_mutation(c, f.alice_board, &caller(f.alice)).unwrap(),
                f.alice
            );
            assert!(matches!(
                authorize_board_mutation(c, f.alice_board, &caller(f.carol)),
                Err(ApiError::Unauthorized)
            ));
            assert!(matches!(
                authorize_board_mutation(c, 9999, &caller(f.alice)),
                Err(ApiError::NotFound)
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bookmark_ownership_is_transitive() {
        let f = fixture();
        f.db.with_conn(|c| {
            let grant = authorize_bookmark_mutation(c, f.alice_bookmark, &caller(f.alice)).unwrap();
            assert_eq!(grant, BookmarkGrant { user_id: f.alice, board_id: f.alice_board });

            // Carol owns a board, just not this one.
            assert!(matches!(
                authorize_bookmark_mutation(c, f.alice_bookmark, &caller(f.carol)),
                Err(ApiError::Unauthorized)
            ));
            assert!(matches!(
                authorize_bookmark_mutation(c, 9999, &caller(f.alice)),
                Err(ApiError::NotFound)
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bookmark_through_wrong_board_is_not_found() {
        let f = fixture();
        f.db.with_conn(|c| {
            assert!(matches!(
                authorize_bookmark_on_board(c, f.carol_board, f.alice_bookmark, &caller(f.carol)),
                Err(ApiError::NotFound)
            ));
            assert!(matches!(
                authorize_bookmark_on_board(c, f.carol_board, f.alice_bookmark, &caller(f.alice)),
                Err(ApiError::NotFound)
            ));
            assert!(
                authorize_bookmark_on_board(c, f.alice_board, f.alice_bookmark, &caller(f.alice))
                    .is_ok()
            );
            Ok(())
        })
        .unwrap();
    }
}
