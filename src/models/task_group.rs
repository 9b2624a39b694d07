use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TaskGroup {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskGroupCreateRequest {
    pub board_id: i64,
    #[schema(example = "In progress")]
    pub title: String,
    #[schema(example = "#3498db")]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskGroupUpdateRequest {
    pub title: Option<String>,
    pub color: Option<String>,
}
