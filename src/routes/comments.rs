use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{codes, gate};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest, CommentManageRequest, CommentUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/tasks/{id}/comments",
    tag = "Comments",
    params(("id" = i64, Path, description = "Task id")),
    responses((status = 200, description = "Comments on the task", body = [Comment])),
    security(("bearerAuth" = []))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let task = super::tasks::fetch_task(&state.pool, task_id).await?;
    let board = super::tasks::fetch_board_of_task(&state.pool, task.id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT id, task_id, creator_id, text, status, date_created, date_modified \
         FROM comments WHERE task_id = ? ORDER BY date_created",
    )
    .bind(task.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/comments",
    tag = "Comments",
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment created", body = Comment)),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let task = super::tasks::fetch_task(&state.pool, payload.task_id).await?;
    let board = super::tasks::fetch_board_of_task(&state.pool, task.id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::LEAVE_COMMENTS).await?;

    let comment_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (task_id, creator_id, text, status, date_created) \
         VALUES (?, ?, ?, 'open', ?) RETURNING id",
    )
    .bind(task.id)
    .bind(participant.id)
    .bind(&payload.text)
    .bind(utc_now())
    .fetch_one(&state.pool)
    .await?;

    let comment = fetch_comment(&state.pool, comment_id).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    put,
    path = "/comments/{id}",
    tag = "Comments",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses((status = 200, description = "Comment updated", body = Comment)),
    security(("bearerAuth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let mut comment = fetch_comment(&state.pool, id).await?;
    let board = super::tasks::fetch_board_of_task(&state.pool, comment.task_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_own_or_board_action(
        &state.pool,
        &participant,
        comment.creator_id,
        board.id,
        codes::UPDATE_FOREIGN_COMMENTS,
    )
    .await?;

    let now = utc_now();

    sqlx::query("UPDATE comments SET text = ?, date_modified = ? WHERE id = ?")
        .bind(&payload.text)
        .bind(now)
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    comment.text = payload.text;
    comment.date_modified = Some(now);

    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "Comments",
    params(("id" = i64, Path, description = "Comment id")),
    responses((status = 204, description = "Comment deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let comment = fetch_comment(&state.pool, id).await?;
    let board = super::tasks::fetch_board_of_task(&state.pool, comment.task_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_own_or_board_action(
        &state.pool,
        &participant,
        comment.creator_id,
        board.id,
        codes::DELETE_FOREIGN_COMMENTS,
    )
    .await?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/comments/{id}/status",
    tag = "Comments",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = CommentManageRequest,
    responses((status = 200, description = "Comment status changed", body = Comment)),
    security(("bearerAuth" = []))
)]
pub async fn manage_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<CommentManageRequest>,
) -> AppResult<Json<Comment>> {
    let mut comment = fetch_comment(&state.pool, id).await?;
    let board = super::tasks::fetch_board_of_task(&state.pool, comment.task_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_own_or_board_action(
        &state.pool,
        &participant,
        comment.creator_id,
        board.id,
        codes::MANAGE_COMMENTS,
    )
    .await?;

    sqlx::query("UPDATE comments SET status = ? WHERE id = ?")
        .bind(payload.status)
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    comment.status = payload.status;

    Ok(Json(comment))
}

async fn fetch_comment(pool: &SqlitePool, id: i64) -> AppResult<Comment> {
    sqlx::query_as::<_, Comment>(
        "SELECT id, task_id, creator_id, text, status, date_created, date_modified \
         FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("comment not found"))
}
