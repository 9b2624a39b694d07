//! The permission gate run by every mutation and query handler.
//!
//! Gate order for anything at or below board level, short-circuiting on the
//! first failure:
//!   1. resolve the acting user's participant in the owning workspace,
//!   2. `view_board` on the target board,
//!   3. the action-specific code.
//! Comment update/delete/manage add a creator bypass: the author of a
//! resource acts on it freely, without any grant row backing that.

use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::rbac::Participant;

use super::{codes, store, ResourceType};

/// At most one participant per (workspace, user), enforced at write time by
/// the store's unique constraint. Seeing two rows here means the invariant
/// was broken upstream and the request must fail loudly.
pub async fn resolve_participant(
    pool: &SqlitePool,
    workspace_id: i64,
    user_id: i64,
) -> AppResult<Option<Participant>> {
    let mut rows = sqlx::query_as::<_, Participant>(
        "SELECT id, workspace_id, user_id, role_id FROM participants \
         WHERE workspace_id = ? AND user_id = ? LIMIT 2",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    if rows.len() > 1 {
        return Err(AppError::AmbiguousParticipant { workspace_id, user_id });
    }

    Ok(rows.pop())
}

pub async fn require_participant(
    pool: &SqlitePool,
    workspace_id: i64,
    user_id: i64,
) -> AppResult<Participant> {
    resolve_participant(pool, workspace_id, user_id)
        .await?
        .ok_or(AppError::NotAParticipant)
}

pub async fn require_board_view(pool: &SqlitePool, role_id: i64, board_id: i64) -> AppResult<()> {
    let allowed =
        store::has_permission(pool, role_id, ResourceType::Board, Some(board_id), codes::VIEW_BOARD)
            .await?;

    if !allowed {
        tracing::debug!(role_id, board_id, "view_board denied");
        return Err(AppError::ViewNotPermitted);
    }

    Ok(())
}

pub async fn require_board_action(
    pool: &SqlitePool,
    role_id: i64,
    board_id: i64,
    code: &'static str,
) -> AppResult<()> {
    let allowed =
        store::has_permission(pool, role_id, ResourceType::Board, Some(board_id), code).await?;

    if !allowed {
        tracing::debug!(role_id, board_id, code, "board action denied");
        return Err(AppError::ActionNotPermitted(code));
    }

    Ok(())
}

pub async fn require_workspace_action(
    pool: &SqlitePool,
    role_id: i64,
    workspace_id: i64,
    code: &'static str,
) -> AppResult<()> {
    let allowed =
        store::has_permission(pool, role_id, ResourceType::Workspace, Some(workspace_id), code)
            .await?;

    if !allowed {
        tracing::debug!(role_id, workspace_id, code, "workspace action denied");
        return Err(AppError::ActionNotPermitted(code));
    }

    Ok(())
}

/// Creator bypass for ownership-sensitive actions: the check is skipped when
/// the acting participant created the resource, otherwise the foreign-action
/// code applies. The bypass is a rule, never a grant row.
pub async fn require_own_or_board_action(
    pool: &SqlitePool,
    actor: &Participant,
    creator_id: i64,
    board_id: i64,
    code: &'static str,
) -> AppResult<()> {
    if actor.id == creator_id {
        return Ok(());
    }

    require_board_action(pool, actor.role_id, board_id, code).await
}
