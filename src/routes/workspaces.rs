use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{self, codes, gate, store, ResourceType};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::workspace::{Workspace, WorkspaceCreateRequest, WorkspaceUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/workspaces",
    tag = "Workspaces",
    responses((status = 200, description = "Workspaces the user participates in", body = [Workspace])),
    security(("bearerAuth" = []))
)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Workspace>>> {
    let workspaces = sqlx::query_as::<_, Workspace>(
        "SELECT w.id, w.title, w.date_created FROM workspaces w \
         INNER JOIN participants p ON p.workspace_id = w.id \
         WHERE p.user_id = ? ORDER BY w.date_created",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(workspaces))
}

#[utoipa::path(
    post,
    path = "/workspaces",
    tag = "Workspaces",
    request_body = WorkspaceCreateRequest,
    responses((status = 201, description = "Workspace created and provisioned", body = Workspace)),
    security(("bearerAuth" = []))
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<WorkspaceCreateRequest>,
) -> AppResult<(StatusCode, Json<Workspace>)> {
    let now = utc_now();

    let workspace_id: i64 = sqlx::query_scalar(
        "INSERT INTO workspaces (title, date_created) VALUES (?, ?) RETURNING id",
    )
    .bind(&payload.title)
    .bind(now)
    .fetch_one(&state.pool)
    .await?;

    // Seed the built-in roles and bind the creator to Super-Admin.
    authz::provision_workspace(&state.pool, workspace_id, auth.user_id).await?;

    let workspace = fetch_workspace(&state.pool, workspace_id).await?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

#[utoipa::path(
    get,
    path = "/workspaces/{id}",
    tag = "Workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    responses((status = 200, description = "Workspace detail", body = Workspace)),
    security(("bearerAuth" = []))
)]
pub async fn get_workspace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Workspace>> {
    let workspace = fetch_workspace(&state.pool, id).await?;
    gate::require_participant(&state.pool, workspace.id, auth.user_id).await?;

    Ok(Json(workspace))
}

#[utoipa::path(
    put,
    path = "/workspaces/{id}",
    tag = "Workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    request_body = WorkspaceUpdateRequest,
    responses((status = 200, description = "Workspace updated", body = Workspace)),
    security(("bearerAuth" = []))
)]
pub async fn update_workspace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<WorkspaceUpdateRequest>,
) -> AppResult<Json<Workspace>> {
    let mut workspace = fetch_workspace(&state.pool, id).await?;

    let participant = gate::require_participant(&state.pool, workspace.id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, participant.role_id, workspace.id, codes::UPDATE_WORKSPACE)
        .await?;

    sqlx::query("UPDATE workspaces SET title = ? WHERE id = ?")
        .bind(&payload.title)
        .bind(workspace.id)
        .execute(&state.pool)
        .await?;

    workspace.title = payload.title;

    Ok(Json(workspace))
}

#[utoipa::path(
    delete,
    path = "/workspaces/{id}",
    tag = "Workspaces",
    params(("id" = i64, Path, description = "Workspace id")),
    responses((status = 204, description = "Workspace deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_workspace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let workspace = fetch_workspace(&state.pool, id).await?;

    let participant = gate::require_participant(&state.pool, workspace.id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, participant.role_id, workspace.id, codes::UPDATE_WORKSPACE)
        .await?;

    let mut tx = state.pool.begin().await?;

    // Grants scoped to this workspace and to its boards must not outlive it.
    let board_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM boards WHERE workspace_id = ?")
        .bind(workspace.id)
        .fetch_all(&mut *tx)
        .await?;

    for board_id in board_ids {
        store::purge_for_instance(&mut *tx, ResourceType::Board, board_id).await?;
    }
    store::purge_for_instance(&mut *tx, ResourceType::Workspace, workspace.id).await?;

    // Participants go first: their role_id references are RESTRICT, which
    // would otherwise abort the cascade from roles.
    sqlx::query("DELETE FROM participants WHERE workspace_id = ?")
        .bind(workspace.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM workspaces WHERE id = ?")
        .bind(workspace.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_workspace(pool: &SqlitePool, id: i64) -> AppResult<Workspace> {
    sqlx::query_as::<_, Workspace>("SELECT id, title, date_created FROM workspaces WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("workspace not found"))
}
