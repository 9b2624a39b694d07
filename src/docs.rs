use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::authz::ResourceType;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::workspaces::list_workspaces,
        crate::routes::workspaces::create_workspace,
        crate::routes::workspaces::get_workspace,
        crate::routes::workspaces::update_workspace,
        crate::routes::workspaces::delete_workspace,
        crate::routes::boards::list_boards,
        crate::routes::boards::create_board,
        crate::routes::boards::get_board,
        crate::routes::boards::update_board,
        crate::routes::boards::delete_board,
        crate::routes::task_groups::list_groups,
        crate::routes::task_groups::create_group,
        crate::routes::task_groups::update_group,
        crate::routes::task_groups::delete_group,
        crate::routes::tasks::list_tasks,
        crate::routes::tasks::create_task,
        crate::routes::tasks::update_task,
        crate::routes::tasks::delete_task,
        crate::routes::comments::list_comments,
        crate::routes::comments::create_comment,
        crate::routes::comments::update_comment,
        crate::routes::comments::delete_comment,
        crate::routes::comments::manage_comment,
        crate::routes::roles::list_participants,
        crate::routes::roles::add_participant,
        crate::routes::roles::kick_participant,
        crate::routes::roles::assign_role,
        crate::routes::roles::list_roles,
        crate::routes::roles::create_role,
        crate::routes::roles::list_role_permissions,
        crate::routes::roles::grant_permission,
        crate::routes::roles::revoke_permission,
    ),
    components(
        schemas(
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::workspace::Workspace,
            models::workspace::WorkspaceCreateRequest,
            models::workspace::WorkspaceUpdateRequest,
            models::board::Board,
            models::board::BoardCreateRequest,
            models::board::BoardUpdateRequest,
            models::task_group::TaskGroup,
            models::task_group::TaskGroupCreateRequest,
            models::task_group::TaskGroupUpdateRequest,
            models::task::Task,
            models::task::TaskCreateRequest,
            models::task::TaskUpdateRequest,
            models::comment::Comment,
            models::comment::CommentStatus,
            models::comment::CommentCreateRequest,
            models::comment::CommentUpdateRequest,
            models::comment::CommentManageRequest,
            models::rbac::Role,
            models::rbac::Participant,
            models::rbac::InstancePermission,
            models::rbac::RoleCreateRequest,
            models::rbac::GrantRequest,
            models::rbac::ParticipantAddRequest,
            models::rbac::ParticipantRoleRequest,
            ResourceType,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication"),
        (name = "Workspaces", description = "Workspace management"),
        (name = "Boards", description = "Task boards"),
        (name = "Task groups", description = "Task lists within a board"),
        (name = "Tasks", description = "Tasks"),
        (name = "Comments", description = "Task comments"),
        (name = "Roles", description = "Roles, participants and permission grants")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
