use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{bootstrap, codes, gate, store};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::rbac::{
    GrantRequest, InstancePermission, Participant, ParticipantAddRequest, ParticipantRoleRequest,
    Role, RoleCreateRequest,
};

// =============================================================================
// PARTICIPANTS
// =============================================================================

#[utoipa::path(
    get,
    path = "/workspaces/{id}/participants",
    tag = "Roles",
    params(("id" = i64, Path, description = "Workspace id")),
    responses((status = 200, description = "Workspace participants", body = [Participant])),
    security(("bearerAuth" = []))
)]
pub async fn list_participants(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workspace_id): Path<i64>,
) -> AppResult<Json<Vec<Participant>>> {
    gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;

    let participants = sqlx::query_as::<_, Participant>(
        "SELECT id, workspace_id, user_id, role_id FROM participants WHERE workspace_id = ? ORDER BY id",
    )
    .bind(workspace_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(participants))
}

#[utoipa::path(
    post,
    path = "/workspaces/{id}/participants",
    tag = "Roles",
    params(("id" = i64, Path, description = "Workspace id")),
    request_body = ParticipantAddRequest,
    responses(
        (status = 201, description = "Participant added", body = Participant),
        (status = 409, description = "User already participates in this workspace")
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_participant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workspace_id): Path<i64>,
    Json(payload): Json<ParticipantAddRequest>,
) -> AppResult<(StatusCode, Json<Participant>)> {
    let actor = gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, actor.role_id, workspace_id, codes::INVITE_PARTICIPANTS)
        .await?;

    let role_id = match payload.role_id {
        Some(role_id) => {
            // Roles from other workspaces are not assignable here.
            fetch_role_in_workspace(&state.pool, role_id, workspace_id).await?.id
        }
        None => member_role_id(&state.pool, workspace_id).await?,
    };

    let result = sqlx::query("INSERT INTO participants (workspace_id, user_id, role_id) VALUES (?, ?, ?)")
        .bind(workspace_id)
        .bind(payload.user_id)
        .bind(role_id)
        .execute(&state.pool)
        .await;

    if let Err(sqlx::Error::Database(db_err)) = &result {
        if db_err.is_unique_violation() {
            return Err(AppError::conflict("user already participates in this workspace"));
        }
    }
    result?;

    let participant = sqlx::query_as::<_, Participant>(
        "SELECT id, workspace_id, user_id, role_id FROM participants WHERE workspace_id = ? AND user_id = ?",
    )
    .bind(workspace_id)
    .bind(payload.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(participant)))
}

#[utoipa::path(
    delete,
    path = "/workspaces/{id}/participants/{participant_id}",
    tag = "Roles",
    params(
        ("id" = i64, Path, description = "Workspace id"),
        ("participant_id" = i64, Path, description = "Participant id")
    ),
    responses((status = 204, description = "Participant removed")),
    security(("bearerAuth" = []))
)]
pub async fn kick_participant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((workspace_id, participant_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let actor = gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;

    let target = fetch_participant(&state.pool, participant_id, workspace_id).await?;

    // Leaving the workspace needs no grant; removing someone else does.
    if target.id != actor.id {
        gate::require_workspace_action(&state.pool, actor.role_id, workspace_id, codes::KICK_PARTICIPANTS)
            .await?;
    }

    sqlx::query("DELETE FROM participants WHERE id = ?")
        .bind(target.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/workspaces/{id}/participants/{participant_id}/role",
    tag = "Roles",
    params(
        ("id" = i64, Path, description = "Workspace id"),
        ("participant_id" = i64, Path, description = "Participant id")
    ),
    request_body = ParticipantRoleRequest,
    responses((status = 200, description = "Role reassigned", body = Participant)),
    security(("bearerAuth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((workspace_id, participant_id)): Path<(i64, i64)>,
    Json(payload): Json<ParticipantRoleRequest>,
) -> AppResult<Json<Participant>> {
    let actor = gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, actor.role_id, workspace_id, codes::MANAGE_ROLES).await?;

    let mut target = fetch_participant(&state.pool, participant_id, workspace_id).await?;
    let role = fetch_role_in_workspace(&state.pool, payload.role_id, workspace_id).await?;

    sqlx::query("UPDATE participants SET role_id = ? WHERE id = ?")
        .bind(role.id)
        .bind(target.id)
        .execute(&state.pool)
        .await?;

    target.role_id = role.id;

    Ok(Json(target))
}

// =============================================================================
// ROLES & GRANTS
// =============================================================================

#[utoipa::path(
    get,
    path = "/workspaces/{id}/roles",
    tag = "Roles",
    params(("id" = i64, Path, description = "Workspace id")),
    responses((status = 200, description = "Workspace roles", body = [Role])),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workspace_id): Path<i64>,
) -> AppResult<Json<Vec<Role>>> {
    gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;

    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, workspace_id, name, for_user FROM roles WHERE workspace_id = ? ORDER BY id",
    )
    .bind(workspace_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(roles))
}

#[utoipa::path(
    post,
    path = "/workspaces/{id}/roles",
    tag = "Roles",
    params(("id" = i64, Path, description = "Workspace id")),
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already used in this workspace")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workspace_id): Path<i64>,
    Json(payload): Json<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let actor = gate::require_participant(&state.pool, workspace_id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, actor.role_id, workspace_id, codes::MANAGE_ROLES).await?;

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM roles WHERE workspace_id = ? AND name = ?")
        .bind(workspace_id)
        .bind(&payload.name)
        .fetch_one(&state.pool)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict("role already exists"));
    }

    let role_id: i64 = sqlx::query_scalar(
        "INSERT INTO roles (workspace_id, name, for_user) VALUES (?, ?, 0) RETURNING id",
    )
    .bind(workspace_id)
    .bind(&payload.name)
    .fetch_one(&state.pool)
    .await?;

    let role = fetch_role_in_workspace(&state.pool, role_id, workspace_id).await?;

    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/roles/{role_id}/permissions",
    tag = "Roles",
    params(("role_id" = i64, Path, description = "Role id")),
    responses((status = 200, description = "Grants held by the role", body = [InstancePermission])),
    security(("bearerAuth" = []))
)]
pub async fn list_role_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
) -> AppResult<Json<Vec<InstancePermission>>> {
    let role = fetch_role(&state.pool, role_id).await?;
    gate::require_participant(&state.pool, role.workspace_id, auth.user_id).await?;

    let grants = store::list_for_role(&state.pool, role.id).await?;

    Ok(Json(grants))
}

#[utoipa::path(
    post,
    path = "/roles/{role_id}/permissions",
    tag = "Roles",
    params(("role_id" = i64, Path, description = "Role id")),
    request_body = GrantRequest,
    responses(
        (status = 201, description = "Grant recorded (idempotent)", body = InstancePermission),
        (status = 400, description = "Code outside the catalog for the resource type")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
    Json(payload): Json<GrantRequest>,
) -> AppResult<(StatusCode, Json<InstancePermission>)> {
    let role = fetch_role(&state.pool, role_id).await?;

    let actor = gate::require_participant(&state.pool, role.workspace_id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, actor.role_id, role.workspace_id, codes::MANAGE_ROLES)
        .await?;

    let code = known_code(&payload)?;

    let mut conn = state.pool.acquire().await?;
    let grant = store::grant(&mut conn, role.id, payload.resource_type, code, payload.instance_id)
        .await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

#[utoipa::path(
    post,
    path = "/roles/{role_id}/permissions/revoke",
    tag = "Roles",
    params(("role_id" = i64, Path, description = "Role id")),
    request_body = GrantRequest,
    responses((status = 204, description = "Grant removed; absent grants are a no-op")),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
    Json(payload): Json<GrantRequest>,
) -> AppResult<StatusCode> {
    let role = fetch_role(&state.pool, role_id).await?;

    let actor = gate::require_participant(&state.pool, role.workspace_id, auth.user_id).await?;
    gate::require_workspace_action(&state.pool, actor.role_id, role.workspace_id, codes::MANAGE_ROLES)
        .await?;

    let code = known_code(&payload)?;

    store::revoke(&state.pool, role.id, payload.resource_type, code, payload.instance_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// HELPERS
// =============================================================================

/// The catalog is closed: map the requested code onto the static table or
/// reject it.
fn known_code(payload: &GrantRequest) -> AppResult<&'static str> {
    payload
        .resource_type
        .catalog()
        .iter()
        .find(|code| **code == payload.permission_code)
        .copied()
        .ok_or_else(|| {
            AppError::bad_request(format!(
                "unknown permission code '{}' for resource type '{}'",
                payload.permission_code,
                payload.resource_type.as_str()
            ))
        })
}

async fn member_role_id(pool: &SqlitePool, workspace_id: i64) -> AppResult<i64> {
    sqlx::query_scalar("SELECT id FROM roles WHERE workspace_id = ? AND name = ? AND for_user = 0")
        .bind(workspace_id)
        .bind(bootstrap::MEMBER)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::internal("workspace has no member role"))
}

async fn fetch_role(pool: &SqlitePool, role_id: i64) -> AppResult<Role> {
    sqlx::query_as::<_, Role>("SELECT id, workspace_id, name, for_user FROM roles WHERE id = ?")
        .bind(role_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("role not found"))
}

async fn fetch_role_in_workspace(pool: &SqlitePool, role_id: i64, workspace_id: i64) -> AppResult<Role> {
    sqlx::query_as::<_, Role>(
        "SELECT id, workspace_id, name, for_user FROM roles WHERE id = ? AND workspace_id = ?",
    )
    .bind(role_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("role not found"))
}

async fn fetch_participant(pool: &SqlitePool, participant_id: i64, workspace_id: i64) -> AppResult<Participant> {
    sqlx::query_as::<_, Participant>(
        "SELECT id, workspace_id, user_id, role_id FROM participants WHERE id = ? AND workspace_id = ?",
    )
    .bind(participant_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("participant not found"))
}
