use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CommentStatus {
    Open,
    Completed,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub creator_id: i64,
    pub text: String,
    pub status: CommentStatus,
    pub date_created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    pub task_id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentManageRequest {
    pub status: CommentStatus,
}
