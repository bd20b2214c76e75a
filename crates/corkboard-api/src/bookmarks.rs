use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use corkboard_db::queries;
use corkboard_types::api::{CreateBookmarkRequest, UpdateBookmarkRequest};
use corkboard_types::models::Bookmark;

use crate::error::ApiError;
use crate::extract::{Ids, Payload};
use crate::guard::{self, BookmarkGrant};
use crate::middleware::Caller;
use crate::{AppState, blocking, validate};

/// GET /boards/{id}/bookmarks
pub async fn list_bookmarks(
    State(state): State<AppState>,
    Ids(board_id): Ids<i64>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let db = state.db.clone();
    let rows =
        blocking(move || db.get_board_bookmarks(board_id)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(rows.into_iter().map(Bookmark::from).collect()))
}

/// POST /boards/{id}/bookmarks
///
/// Only the board's owner may add to it.
pub async fn create_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<i64>, ApiError>,
    Payload(req): Payload<CreateBookmarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.user_id()?;
    let Ids(board_id) = ids?;

    let row = blocking(move || {
        state.db.transaction(|tx| -> Result<_, ApiError> {
            guard::authorize_board_mutation(tx, board_id, &caller)?;
            let input = validate::new_bookmark(req?)?;
            Ok(queries::insert_bookmark(tx, board_id, &input.title, &input.url)?)
        })
    })
    .await?;

    info!("Bookmark {} created on board {}", row.id, board_id);
    Ok((StatusCode::CREATED, Json(Bookmark::from(row))))
}

/// PATCH /boards/{id}/bookmarks/{bookmark_id}
pub async fn update_board_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<(i64, i64)>, ApiError>,
    Payload(req): Payload<UpdateBookmarkRequest>,
) -> Result<Json<Bookmark>, ApiError> {
    caller.user_id()?;
    let Ids((board_id, bookmark_id)) = ids?;
    patch_bookmark(state, caller, Some(board_id), bookmark_id, req).await
}

/// DELETE /boards/{id}/bookmarks/{bookmark_id}
pub async fn delete_board_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<(i64, i64)>, ApiError>,
) -> Result<StatusCode, ApiError> {
    caller.user_id()?;
    let Ids((board_id, bookmark_id)) = ids?;
    remove_bookmark(state, caller, Some(board_id), bookmark_id).await
}

/// PATCH /bookmarks/{id}
pub async fn update_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<i64>, ApiError>,
    Payload(req): Payload<UpdateBookmarkRequest>,
) -> Result<Json<Bookmark>, ApiError> {
    caller.user_id()?;
    let Ids(bookmark_id) = ids?;
    patch_bookmark(state, caller, None, bookmark_id, req).await
}

/// DELETE /bookmarks/{id}
pub async fn delete_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    caller.user_id()?;
    let Ids(bookmark_id) = ids?;
    remove_bookmark(state, caller, None, bookmark_id).await
}

fn authorize(
    tx: &corkboard_db::Connection,
    board_id: Option<i64>,
    bookmark_id: i64,
    caller: &Caller,
) -> Result<BookmarkGrant, ApiError> {
    match board_id {
        Some(board_id) => guard::authorize_bookmark_on_board(tx, board_id, bookmark_id, caller),
        None => guard::authorize_bookmark_mutation(tx, bookmark_id, caller),
    }
}

async fn patch_bookmark(
    state: AppState,
    caller: Caller,
    board_id: Option<i64>,
    bookmark_id: i64,
    req: Result<UpdateBookmarkRequest, ApiError>,
) -> Result<Json<Bookmark>, ApiError> {
    let row = blocking(move || {
        state.db.transaction(|tx| -> Result<_, ApiError> {
            let grant = authorize(tx, board_id, bookmark_id, &caller)?;
            let patch = validate::bookmark_patch(req?)?;

            let row = if patch.is_empty() {
                queries::bookmark_by_id(tx, bookmark_id)?
            } else {
                queries::update_bookmark(
                    tx,
                    bookmark_id,
                    grant.user_id,
                    patch.title.as_deref(),
                    patch.url.as_deref(),
                )?
            };
            row.ok_or(ApiError::NotFound)
        })
    })
    .await?;

    Ok(Json(Bookmark::from(row)))
}

async fn remove_bookmark(
    state: AppState,
    caller: Caller,
    board_id: Option<i64>,
    bookmark_id: i64,
) -> Result<StatusCode, ApiError> {
    let grant = blocking(move || {
        state.db.transaction(|tx| -> Result<_, ApiError> {
            let grant = authorize(tx, board_id, bookmark_id, &caller)?;
            if !queries::delete_bookmark(tx, bookmark_id, grant.user_id)? {
                return Err(ApiError::NotFound);
            }
            Ok(grant)
        })
    })
    .await?;

    info!(
        "Bookmark {} deleted from board {} by user {}",
        bookmark_id, grant.board_id, grant.user_id
    );
    Ok(StatusCode::NO_CONTENT)
}
