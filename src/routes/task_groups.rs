use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{codes, gate};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::board::Board;
use crate::models::task_group::{TaskGroup, TaskGroupCreateRequest, TaskGroupUpdateRequest};

#[utoipa::path(
    get,
    path = "/boards/{id}/groups",
    tag = "Task groups",
    params(("id" = i64, Path, description = "Board id")),
    responses((status = 200, description = "Task groups of the board", body = [TaskGroup])),
    security(("bearerAuth" = []))
)]
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<i64>,
) -> AppResult<Json<Vec<TaskGroup>>> {
    let board = super::boards::fetch_board(&state.pool, board_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;

    let groups = sqlx::query_as::<_, TaskGroup>(
        "SELECT id, board_id, title, color FROM t_groups WHERE board_id = ? ORDER BY id",
    )
    .bind(board.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(groups))
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "Task groups",
    request_body = TaskGroupCreateRequest,
    responses(
        (status = 201, description = "Task group created", body = TaskGroup),
        (status = 409, description = "Title already used on this board")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TaskGroupCreateRequest>,
) -> AppResult<(StatusCode, Json<TaskGroup>)> {
    let board = super::boards::fetch_board(&state.pool, payload.board_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::CREATE_GROUPS).await?;

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM t_groups WHERE board_id = ? AND title = ?")
        .bind(board.id)
        .bind(&payload.title)
        .fetch_one(&state.pool)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict("task group already exists"));
    }

    let group_id: i64 = sqlx::query_scalar(
        "INSERT INTO t_groups (board_id, title, color) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(board.id)
    .bind(&payload.title)
    .bind(&payload.color)
    .fetch_one(&state.pool)
    .await?;

    let group = fetch_group(&state.pool, group_id).await?;

    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "Task groups",
    params(("id" = i64, Path, description = "Task group id")),
    request_body = TaskGroupUpdateRequest,
    responses((status = 200, description = "Task group updated", body = TaskGroup)),
    security(("bearerAuth" = []))
)]
pub async fn update_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TaskGroupUpdateRequest>,
) -> AppResult<Json<TaskGroup>> {
    let mut group = fetch_group(&state.pool, id).await?;
    let board = super::boards::fetch_board(&state.pool, group.board_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::UPDATE_GROUPS).await?;

    if let Some(title) = payload.title {
        // Same conflict answer as on create, not a raw constraint error.
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM t_groups WHERE board_id = ? AND title = ? AND id != ?",
        )
        .bind(group.board_id)
        .bind(&title)
        .bind(group.id)
        .fetch_one(&state.pool)
        .await?;
        if taken > 0 {
            return Err(AppError::conflict("task group already exists"));
        }

        group.title = title;
    }
    if payload.color.is_some() {
        group.color = payload.color;
    }

    sqlx::query("UPDATE t_groups SET title = ?, color = ? WHERE id = ?")
        .bind(&group.title)
        .bind(&group.color)
        .bind(group.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "Task groups",
    params(("id" = i64, Path, description = "Task group id")),
    responses((status = 204, description = "Task group deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let group = fetch_group(&state.pool, id).await?;
    let board = super::boards::fetch_board(&state.pool, group.board_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::DELETE_GROUPS).await?;

    sqlx::query("DELETE FROM t_groups WHERE id = ?")
        .bind(group.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_group(pool: &SqlitePool, id: i64) -> AppResult<TaskGroup> {
    sqlx::query_as::<_, TaskGroup>("SELECT id, board_id, title, color FROM t_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("task group not found"))
}

/// Board enclosing a task group; permission checks for groups, tasks and
/// comments are always evaluated at this board's scope.
pub(crate) async fn fetch_board_of_group(pool: &SqlitePool, group_id: i64) -> AppResult<Board> {
    sqlx::query_as::<_, Board>(
        "SELECT b.id, b.workspace_id, b.name, b.slug_ticker, b.date_created \
         FROM boards b INNER JOIN t_groups g ON g.board_id = b.id WHERE g.id = ?",
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task group not found"))
}
