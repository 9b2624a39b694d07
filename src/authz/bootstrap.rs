//! Workspace provisioning.
//!
//! Invoked synchronously by the workspace-creation handler: seeds the four
//! built-in roles with their fixed sets of global grants and binds the
//! creator to the Super-Admin role. Every step is a get-or-create against a
//! unique index, so re-running provisioning never duplicates roles, grants
//! or participants.

use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::AppResult;
use crate::models::rbac::Participant;

use super::{codes, store, ResourceType};

/// A built-in role and the global grants it is seeded with. Kept as data
/// rather than logic: the code sets are configuration, not behavior.
pub struct RoleSeed {
    pub name: &'static str,
    pub grants: &'static [(ResourceType, &'static str)],
}

pub const MEMBER: &str = "Участник";
pub const MODERATOR: &str = "Модератор";
pub const ADMIN: &str = "Администратор";
pub const SUPER_ADMIN: &str = "Супер-админ";

pub const BUILTIN_ROLES: &[RoleSeed] = &[
    RoleSeed {
        name: MEMBER,
        grants: &[
            (ResourceType::Board, codes::VIEW_BOARD),
            (ResourceType::Board, codes::CREATE_TASKS),
            (ResourceType::Board, codes::UPDATE_TASKS),
            (ResourceType::Board, codes::LEAVE_COMMENTS),
        ],
    },
    RoleSeed {
        name: MODERATOR,
        grants: &[
            (ResourceType::Board, codes::VIEW_BOARD),
            (ResourceType::Board, codes::CREATE_TASKS),
            (ResourceType::Board, codes::UPDATE_TASKS),
            (ResourceType::Board, codes::DELETE_TASKS),
            (ResourceType::Board, codes::LEAVE_COMMENTS),
            (ResourceType::Board, codes::MANAGE_COMMENTS),
            (ResourceType::Board, codes::UPDATE_FOREIGN_COMMENTS),
            (ResourceType::Board, codes::DELETE_FOREIGN_COMMENTS),
            (ResourceType::Workspace, codes::MANAGE_INVITATIONS),
        ],
    },
    RoleSeed {
        name: ADMIN,
        grants: &[
            (ResourceType::Board, codes::VIEW_BOARD),
            (ResourceType::Board, codes::CREATE_TASKS),
            (ResourceType::Board, codes::UPDATE_TASKS),
            (ResourceType::Board, codes::DELETE_TASKS),
            (ResourceType::Board, codes::REASSIGN_TASKS),
            (ResourceType::Board, codes::LEAVE_COMMENTS),
            (ResourceType::Board, codes::MANAGE_COMMENTS),
            (ResourceType::Board, codes::UPDATE_FOREIGN_COMMENTS),
            (ResourceType::Board, codes::DELETE_FOREIGN_COMMENTS),
            (ResourceType::Board, codes::CREATE_GROUPS),
            (ResourceType::Board, codes::UPDATE_GROUPS),
            (ResourceType::Board, codes::DELETE_GROUPS),
            (ResourceType::Board, codes::UPDATE_BOARD),
            (ResourceType::Board, codes::DELETE_BOARD),
            (ResourceType::Board, codes::MANAGE_BOARD_PARTICIPANTS),
            (ResourceType::Workspace, codes::CREATE_BOARDS),
            (ResourceType::Workspace, codes::MANAGE_INVITATIONS),
        ],
    },
    RoleSeed {
        name: SUPER_ADMIN,
        grants: &[
            (ResourceType::Board, codes::VIEW_BOARD),
            (ResourceType::Board, codes::CREATE_TASKS),
            (ResourceType::Board, codes::UPDATE_TASKS),
            (ResourceType::Board, codes::DELETE_TASKS),
            (ResourceType::Board, codes::REASSIGN_TASKS),
            (ResourceType::Board, codes::LEAVE_COMMENTS),
            (ResourceType::Board, codes::MANAGE_COMMENTS),
            (ResourceType::Board, codes::UPDATE_FOREIGN_COMMENTS),
            (ResourceType::Board, codes::DELETE_FOREIGN_COMMENTS),
            (ResourceType::Board, codes::CREATE_GROUPS),
            (ResourceType::Board, codes::UPDATE_GROUPS),
            (ResourceType::Board, codes::DELETE_GROUPS),
            (ResourceType::Board, codes::UPDATE_BOARD),
            (ResourceType::Board, codes::DELETE_BOARD),
            (ResourceType::Board, codes::MANAGE_BOARD_PARTICIPANTS),
            (ResourceType::Workspace, codes::UPDATE_WORKSPACE),
            (ResourceType::Workspace, codes::CREATE_BOARDS),
            (ResourceType::Workspace, codes::INVITE_PARTICIPANTS),
            (ResourceType::Workspace, codes::MANAGE_INVITATIONS),
            (ResourceType::Workspace, codes::MANAGE_ROLES),
            (ResourceType::Workspace, codes::KICK_PARTICIPANTS),
        ],
    },
];

/// Creates the built-in roles with their global grants and binds the creator
/// as a participant with the Super-Admin role. Returns that participant.
/// Runs in one transaction: a workspace is never left half-provisioned.
pub async fn provision_workspace(
    pool: &SqlitePool,
    workspace_id: i64,
    creator_user_id: i64,
) -> AppResult<Participant> {
    let mut tx = pool.begin().await?;

    let mut super_admin_role_id = None;

    for seed in BUILTIN_ROLES {
        let role_id = get_or_create_role(&mut tx, workspace_id, seed.name).await?;

        for (resource, code) in seed.grants {
            store::grant(&mut *tx, role_id, *resource, code, None).await?;
        }

        if seed.name == SUPER_ADMIN {
            super_admin_role_id = Some(role_id);
        }
    }

    // BUILTIN_ROLES always contains the Super-Admin seed
    let role_id = super_admin_role_id
        .ok_or_else(|| crate::errors::AppError::internal("missing super-admin seed"))?;

    sqlx::query(
        "INSERT OR IGNORE INTO participants (workspace_id, user_id, role_id) VALUES (?, ?, ?)",
    )
    .bind(workspace_id)
    .bind(creator_user_id)
    .bind(role_id)
    .execute(&mut *tx)
    .await?;

    let participant = sqlx::query_as::<_, Participant>(
        "SELECT id, workspace_id, user_id, role_id FROM participants \
         WHERE workspace_id = ? AND user_id = ?",
    )
    .bind(workspace_id)
    .bind(creator_user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(workspace_id, creator_user_id, "workspace provisioned");

    Ok(participant)
}

async fn get_or_create_role(
    conn: &mut SqliteConnection,
    workspace_id: i64,
    name: &str,
) -> AppResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO roles (workspace_id, name, for_user) VALUES (?, ?, 0)")
        .bind(workspace_id)
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM roles WHERE workspace_id = ? AND name = ?")
        .bind(workspace_id)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}
