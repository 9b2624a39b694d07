//! Authorization core.
//!
//! A closed two-tier permission model: a role holds grants that are either
//! global for a resource type (`instance_id = NULL`) or scoped to one
//! instance. Every mutation runs the same gate: resolve the acting user's
//! participant, check `view_board` where the target sits at or below board
//! level, then check the action-specific code. Checks always query current
//! grant state; nothing is cached between requests.

pub mod bootstrap;
pub mod gate;
pub mod store;

pub use bootstrap::provision_workspace;
pub use gate::resolve_participant;

use serde::{Deserialize, Serialize};

/// Resource types that carry permission scoping. Task groups, tasks and
/// comments are always checked at the enclosing board's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ResourceType {
    Workspace,
    Board,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Workspace => "workspace",
            ResourceType::Board => "board",
        }
    }

    /// The fixed permission catalog for this resource type.
    pub fn catalog(self) -> &'static [&'static str] {
        match self {
            ResourceType::Workspace => codes::WORKSPACE,
            ResourceType::Board => codes::BOARD,
        }
    }

    pub fn is_known_code(self, code: &str) -> bool {
        self.catalog().contains(&code)
    }
}

/// Permission codes, scoped per resource type. The catalog is closed: grant
/// endpoints reject codes outside these tables.
pub mod codes {
    // Workspace scope
    pub const UPDATE_WORKSPACE: &str = "update_workspace";
    pub const CREATE_BOARDS: &str = "create_boards";
    pub const INVITE_PARTICIPANTS: &str = "invite_participants";
    pub const MANAGE_INVITATIONS: &str = "manage_invitations";
    pub const MANAGE_ROLES: &str = "manage_roles";
    pub const KICK_PARTICIPANTS: &str = "kick_participants";

    // Board scope
    pub const VIEW_BOARD: &str = "view_board";
    pub const UPDATE_BOARD: &str = "update_board";
    pub const DELETE_BOARD: &str = "delete_board";
    pub const CREATE_TASKS: &str = "create_tasks";
    pub const UPDATE_TASKS: &str = "update_tasks";
    pub const DELETE_TASKS: &str = "delete_tasks";
    pub const REASSIGN_TASKS: &str = "reassign_tasks";
    pub const CREATE_GROUPS: &str = "create_groups";
    pub const UPDATE_GROUPS: &str = "update_groups";
    pub const DELETE_GROUPS: &str = "delete_groups";
    pub const LEAVE_COMMENTS: &str = "leave_comments";
    pub const MANAGE_COMMENTS: &str = "manage_comments";
    pub const UPDATE_FOREIGN_COMMENTS: &str = "update_foreign_comments";
    pub const DELETE_FOREIGN_COMMENTS: &str = "delete_foreign_comments";
    pub const MANAGE_BOARD_PARTICIPANTS: &str = "manage_board_participants";

    pub const WORKSPACE: &[&str] = &[
        UPDATE_WORKSPACE,
        CREATE_BOARDS,
        INVITE_PARTICIPANTS,
        MANAGE_INVITATIONS,
        MANAGE_ROLES,
        KICK_PARTICIPANTS,
    ];

    pub const BOARD: &[&str] = &[
        VIEW_BOARD,
        UPDATE_BOARD,
        DELETE_BOARD,
        CREATE_TASKS,
        UPDATE_TASKS,
        DELETE_TASKS,
        REASSIGN_TASKS,
        CREATE_GROUPS,
        UPDATE_GROUPS,
        DELETE_GROUPS,
        LEAVE_COMMENTS,
        MANAGE_COMMENTS,
        UPDATE_FOREIGN_COMMENTS,
        DELETE_FOREIGN_COMMENTS,
        MANAGE_BOARD_PARTICIPANTS,
    ];
}
