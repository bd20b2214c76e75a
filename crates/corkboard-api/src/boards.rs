use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use corkboard_db::queries;
use corkboard_types::api::{BoardPage, CreateBoardRequest, UpdateBoardRequest};
use corkboard_types::models::Board;

use crate::error::ApiError;
use crate::extract::{Ids, Payload};
use crate::middleware::Caller;
use crate::{AppState, blocking, guard, validate};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_COUNT: u32 = 20;
const MAX_COUNT: u32 = 100;

/// Raw listing parameters. Kept as strings so junk degrades to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub count: u32,
}

impl Pagination {
    pub fn from_query(query: &ListQuery) -> Self {
        Self {
            page: positive_or(query.page.as_deref(), DEFAULT_PAGE),
            count: positive_or(query.count.as_deref(), DEFAULT_COUNT).min(MAX_COUNT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.count)
    }
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// GET /boards?page&count
pub async fn list_boards(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<BoardPage>, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let paging = Pagination::from_query(&query);

    let db = state.db.clone();
    let rows = blocking(move || Ok(db.list_boards(paging.count, paging.offset())?)).await?;

    Ok(Json(BoardPage {
        page: paging.page,
        count: paging.count,
        boards: rows.into_iter().map(Board::from).collect(),
    }))
}

/// GET /boards/{id}
pub async fn get_board(
    State(state): State<AppState>,
    Ids(board_id): Ids<i64>,
) -> Result<Json<Board>, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_board(board_id)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(Board::from(row)))
}

/// POST /boards. The owner is always the caller.
pub async fn create_board(
    State(state): State<AppState>,
    caller: Caller,
    Payload(req): Payload<CreateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = caller.user_id()?;
    let input = validate::new_board(req?)?;

    let db = state.db.clone();
    let row = blocking(move || {
        Ok(db.with_conn_mut(|conn| {
            queries::insert_board(conn, owner_id, &input.title, input.description.as_deref())
        })?)
    })
    .await?;

    info!("Board {} created by user {}", row.id, owner_id);
    Ok((StatusCode::CREATED, Json(Board::from(row))))
}

/// PATCH /boards/{id}
pub async fn update_board(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<i64>, ApiError>,
    Payload(req): Payload<UpdateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    caller.user_id()?;
    let Ids(board_id) = ids?;

    let row = blocking(move || {
        state.db.transaction(|tx| -> Result<_, ApiError> {
            let user_id = guard::authorize_board_mutation(tx, board_id, &caller)?;
            let patch = validate::board_patch(req?)?;

            let row = if patch.is_empty() {
                queries::board_by_id(tx, board_id)?
            } else {
                queries::update_board(
                    tx,
                    board_id,
                    user_id,
                    patch.title.as_deref(),
                    patch.description.as_ref().map(|d| d.as_deref()),
                )?
            };
            row.ok_or(ApiError::NotFound)
        })
    })
    .await?;

    Ok(Json(Board::from(row)))
}

/// DELETE /boards/{id}. Bookmarks on the board go with it.
pub async fn delete_board(
    State(state): State<AppState>,
    caller: Caller,
    ids: Result<Ids<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    caller.user_id()?;
    let Ids(board_id) = ids?;

    let user_id = blocking(move || {
        state.db.transaction(|tx| -> Result<_, ApiError> {
            let user_id = guard::authorize_board_mutation(tx, board_id, &caller)?;
            if !queries::delete_board(tx, board_id, user_id)? {
                return Err(ApiError::NotFound);
            }
            Ok(user_id)
        })
    })
    .await?;

    info!("Board {} deleted by user {}", board_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}
