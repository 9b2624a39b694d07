use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, boards, comments, roles, task_groups, tasks, workspaces};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let workspace_routes = Router::new()
        .route("/", get(workspaces::list_workspaces).post(workspaces::create_workspace))
        .route(
            "/:id",
            get(workspaces::get_workspace)
                .put(workspaces::update_workspace)
                .delete(workspaces::delete_workspace),
        )
        .route(
            "/:id/participants",
            get(roles::list_participants).post(roles::add_participant),
        )
        .route("/:id/participants/:participant_id", axum::routing::delete(roles::kick_participant))
        .route("/:id/participants/:participant_id/role", put(roles::assign_role))
        .route("/:id/roles", get(roles::list_roles).post(roles::create_role))
        .route("/:id/boards", get(boards::list_boards));

    let role_routes = Router::new()
        .route("/:role_id/permissions", get(roles::list_role_permissions).post(roles::grant_permission))
        .route("/:role_id/permissions/revoke", post(roles::revoke_permission));

    let board_routes = Router::new()
        .route("/", post(boards::create_board))
        .route(
            "/:id",
            get(boards::get_board).put(boards::update_board).delete(boards::delete_board),
        )
        .route("/:id/groups", get(task_groups::list_groups));

    let group_routes = Router::new()
        .route("/", post(task_groups::create_group))
        .route(
            "/:id",
            put(task_groups::update_group).delete(task_groups::delete_group),
        )
        .route("/:id/tasks", get(tasks::list_tasks));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task))
        .route("/:id", put(tasks::update_task).delete(tasks::delete_task))
        .route("/:id/comments", get(comments::list_comments));

    let comment_routes = Router::new()
        .route("/", post(comments::create_comment))
        .route("/:id", put(comments::update_comment).delete(comments::delete_comment))
        .route("/:id/status", put(comments::manage_comment));

    let router = Router::new()
        .nest("/auth", auth_routes)
        .nest("/workspaces", workspace_routes)
        .nest("/roles", role_routes)
        .nest("/boards", board_routes)
        .nest("/groups", group_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
