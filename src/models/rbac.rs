use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::ResourceType;

/// Named permission bundle owned by a workspace. `for_user` marks the
/// implicit personal role of a single user, as opposed to the assignable
/// workspace-wide roles created at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub for_user: bool,
}

/// A user's membership + role binding within one workspace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub id: i64,
    pub workspace_id: i64,
    pub user_id: i64,
    pub role_id: i64,
}

/// One grant row. `instance_id = None` applies to every instance of the
/// resource type; `Some(id)` to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InstancePermission {
    pub id: i64,
    pub role_id: i64,
    pub permission_code: String,
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "Release manager")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantRequest {
    pub resource_type: ResourceType,
    #[schema(example = "view_board")]
    pub permission_code: String,
    pub instance_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParticipantAddRequest {
    pub user_id: i64,
    /// Role to bind; defaults to the built-in member role.
    pub role_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParticipantRoleRequest {
    pub role_id: i64,
}
