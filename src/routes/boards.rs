use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{codes, gate, store, ResourceType};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::board::{Board, BoardCreateRequest, BoardUpdateRequest};
use crate::utils::utc_now;

const DEFAULT_SLUG_TICKER: &str = "TASK";

#[utoipa::path(
    get,
    path = "/workspaces/{id}/boards",
    tag = "Boards",
    params(("id" = i64, Path, description = "Workspace id")),
    responses((status = 200, description = "Boards visible to the caller", body = [Board])),
    security(("bearerAuth" = []))
)]
pub async fn list_boards(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workspace_id): Path<i64>,
) -> AppResult<Json<Vec<Board>>> {
    let participant = gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;

    let boards = sqlx::query_as::<_, Board>(
        "SELECT id, workspace_id, name, slug_ticker, date_created FROM boards \
         WHERE workspace_id = ? ORDER BY date_created",
    )
    .bind(workspace_id)
    .fetch_all(&state.pool)
    .await?;

    // Only boards the caller's role can view.
    let mut visible = Vec::with_capacity(boards.len());
    for board in boards {
        if store::has_permission(
            &state.pool,
            participant.role_id,
            ResourceType::Board,
            Some(board.id),
            codes::VIEW_BOARD,
        )
        .await?
        {
            visible.push(board);
        }
    }

    Ok(Json(visible))
}

#[utoipa::path(
    post,
    path = "/boards",
    tag = "Boards",
    request_body = BoardCreateRequest,
    responses(
        (status = 201, description = "Board created", body = Board),
        (status = 409, description = "Board name already used in this workspace")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BoardCreateRequest>,
) -> AppResult<(StatusCode, Json<Board>)> {
    let workspace = super::workspaces::fetch_workspace(&state.pool, payload.workspace_id).await?;

    let participant = gate::require_participant(&state.pool, workspace.id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, participant.role_id, workspace.id, codes::CREATE_BOARDS)
        .await?;

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM boards WHERE workspace_id = ? AND name = ?")
        .bind(workspace.id)
        .bind(&payload.name)
        .fetch_one(&state.pool)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict("board already exists"));
    }

    let ticker = payload
        .slug_ticker
        .unwrap_or_else(|| DEFAULT_SLUG_TICKER.to_string());

    // Board row and the creator's view grant land together or not at all.
    let mut tx = state.pool.begin().await?;

    let board_id: i64 = sqlx::query_scalar(
        "INSERT INTO boards (workspace_id, name, slug_ticker, date_created) \
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(workspace.id)
    .bind(&payload.name)
    .bind(&ticker)
    .bind(utc_now())
    .fetch_one(&mut *tx)
    .await?;

    // The creator's role sees the new board even without a global view grant.
    store::grant(
        &mut *tx,
        participant.role_id,
        ResourceType::Board,
        codes::VIEW_BOARD,
        Some(board_id),
    )
    .await?;

    tx.commit().await?;

    let board = fetch_board(&state.pool, board_id).await?;

    Ok((StatusCode::CREATED, Json(board)))
}

#[utoipa::path(
    get,
    path = "/boards/{id}",
    tag = "Boards",
    params(("id" = i64, Path, description = "Board id")),
    responses((status = 200, description = "Board detail", body = Board)),
    security(("bearerAuth" = []))
)]
pub async fn get_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Board>> {
    let board = fetch_board(&state.pool, id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;

    Ok(Json(board))
}

#[utoipa::path(
    put,
    path = "/boards/{id}",
    tag = "Boards",
    params(("id" = i64, Path, description = "Board id")),
    request_body = BoardUpdateRequest,
    responses((status = 200, description = "Board updated", body = Board)),
    security(("bearerAuth" = []))
)]
pub async fn update_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<BoardUpdateRequest>,
) -> AppResult<Json<Board>> {
    let mut board = fetch_board(&state.pool, id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::UPDATE_BOARD).await?;

    if let Some(name) = payload.name {
        // Same conflict answer as on create, not a raw constraint error.
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM boards WHERE workspace_id = ? AND name = ? AND id != ?",
        )
        .bind(board.workspace_id)
        .bind(&name)
        .bind(board.id)
        .fetch_one(&state.pool)
        .await?;
        if taken > 0 {
            return Err(AppError::conflict("board already exists"));
        }

        board.name = name;
    }
    if let Some(ticker) = payload.slug_ticker {
        board.slug_ticker = ticker;
    }

    sqlx::query("UPDATE boards SET name = ?, slug_ticker = ? WHERE id = ?")
        .bind(&board.name)
        .bind(&board.slug_ticker)
        .bind(board.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(board))
}

#[utoipa::path(
    delete,
    path = "/boards/{id}",
    tag = "Boards",
    params(("id" = i64, Path, description = "Board id")),
    responses((status = 204, description = "Board deleted, scoped grants purged")),
    security(("bearerAuth" = []))
)]
pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let board = fetch_board(&state.pool, id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::DELETE_BOARD).await?;

    let mut tx = state.pool.begin().await?;

    store::purge_for_instance(&mut *tx, ResourceType::Board, board.id).await?;

    sqlx::query("DELETE FROM boards WHERE id = ?")
        .bind(board.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_board(pool: &SqlitePool, id: i64) -> AppResult<Board> {
    sqlx::query_as::<_, Board>(
        "SELECT id, workspace_id, name, slug_ticker, date_created FROM boards WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("board not found"))
}
