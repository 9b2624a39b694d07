use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::app::AppState;
use crate::authz::{codes, gate};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::board::Board;
use crate::models::task::{Task, TaskCreateRequest, TaskUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/groups/{id}/tasks",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task group id")),
    responses((status = 200, description = "Tasks in the group", body = [Task])),
    security(("bearerAuth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<i64>,
) -> AppResult<Json<Vec<Task>>> {
    let board = super::task_groups::fetch_board_of_group(&state.pool, group_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, group_id, creator_id, slug, title, description, branch, date_created, date_ending \
         FROM tasks WHERE group_id = ? ORDER BY date_created",
    )
    .bind(group_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses((status = 201, description = "Task created", body = Task)),
    security(("bearerAuth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let board = super::task_groups::fetch_board_of_group(&state.pool, payload.group_id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::CREATE_TASKS).await?;

    // Row insert, counter bump and assigner validation stand or fall together.
    let mut tx = state.pool.begin().await?;

    let slug = next_slug(&mut tx, &board).await?;

    let task_id: i64 = sqlx::query_scalar(
        "INSERT INTO tasks (group_id, creator_id, slug, title, description, branch, date_created, date_ending) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(payload.group_id)
    .bind(participant.id)
    .bind(&slug)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.branch)
    .bind(utc_now())
    .bind(payload.date_ending)
    .fetch_one(&mut *tx)
    .await?;

    set_assigners(&mut tx, task_id, board.workspace_id, &payload.assigner_ids).await?;

    tx.commit().await?;

    let task = fetch_task(&state.pool, task_id).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task updated", body = Task)),
    security(("bearerAuth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let mut task = fetch_task(&state.pool, id).await?;
    let board = fetch_board_of_task(&state.pool, task.id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::UPDATE_TASKS).await?;

    let changed_assigners = match &payload.assigner_ids {
        Some(new_assigners) => {
            let current: HashSet<i64> = sqlx::query_scalar::<_, i64>(
                "SELECT participant_id FROM task_assigners WHERE task_id = ?",
            )
            .bind(task.id)
            .fetch_all(&state.pool)
            .await?
            .into_iter()
            .collect();

            let requested: HashSet<i64> = new_assigners.iter().copied().collect();

            // Changing who is assigned is a separate privilege.
            if current != requested {
                gate::require_board_action(&state.pool, participant.role_id, board.id, codes::REASSIGN_TASKS)
                    .await?;
                Some(new_assigners.as_slice())
            } else {
                None
            }
        }
        None => None,
    };

    if let Some(title) = payload.title {
        task.title = title;
    }
    if payload.description.is_some() {
        task.description = payload.description;
    }
    if payload.branch.is_some() {
        task.branch = payload.branch;
    }
    if payload.date_ending.is_some() {
        task.date_ending = payload.date_ending;
    }

    // The assigner swap must not survive a failed validation of the new set.
    let mut tx = state.pool.begin().await?;

    if let Some(new_assigners) = changed_assigners {
        sqlx::query("DELETE FROM task_assigners WHERE task_id = ?")
            .bind(task.id)
            .execute(&mut *tx)
            .await?;
        set_assigners(&mut tx, task.id, board.workspace_id, new_assigners).await?;
    }

    sqlx::query("UPDATE tasks SET title = ?, description = ?, branch = ?, date_ending = ? WHERE id = ?")
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.branch)
        .bind(task.date_ending)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses((status = 204, description = "Task deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let task = fetch_task(&state.pool, id).await?;
    let board = fetch_board_of_task(&state.pool, task.id).await?;

    let participant = gate::require_participant(&state.pool, board.workspace_id, auth.user_id).await?;
    gate::require_board_view(&state.pool, participant.role_id, board.id).await?;
    gate::require_board_action(&state.pool, participant.role_id, board.id, codes::DELETE_TASKS).await?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Task numbering is workspace-wide: bump the workspace counter and prefix
/// with the board's ticker. Unrelated to authorization. Runs on the caller's
/// transaction so a failed create rolls the counter back too.
async fn next_slug(conn: &mut SqliteConnection, board: &Board) -> AppResult<String> {
    let number: i64 = sqlx::query_scalar(
        "UPDATE workspaces SET task_counter = task_counter + 1 WHERE id = ? RETURNING task_counter",
    )
    .bind(board.workspace_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}-{}", board.slug_ticker, number))
}

async fn set_assigners(
    conn: &mut SqliteConnection,
    task_id: i64,
    workspace_id: i64,
    participant_ids: &[i64],
) -> AppResult<()> {
    for participant_id in participant_ids {
        // Assigners must belong to the same workspace as the task's board.
        let known: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM participants WHERE id = ? AND workspace_id = ?",
        )
        .bind(participant_id)
        .bind(workspace_id)
        .fetch_one(&mut *conn)
        .await?;

        if known == 0 {
            return Err(AppError::bad_request(format!(
                "participant {participant_id} is not in this workspace"
            )));
        }

        sqlx::query("INSERT OR IGNORE INTO task_assigners (task_id, participant_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(participant_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub(crate) async fn fetch_task(pool: &SqlitePool, id: i64) -> AppResult<Task> {
    sqlx::query_as::<_, Task>(
        "SELECT id, group_id, creator_id, slug, title, description, branch, date_created, date_ending \
         FROM tasks WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task not found"))
}

pub(crate) async fn fetch_board_of_task(pool: &SqlitePool, task_id: i64) -> AppResult<Board> {
    sqlx::query_as::<_, Board>(
        "SELECT b.id, b.workspace_id, b.name, b.slug_ticker, b.date_created \
         FROM boards b \
         INNER JOIN t_groups g ON g.board_id = b.id \
         INNER JOIN tasks t ON t.group_id = g.id \
         WHERE t.id = ?",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task not found"))
}
