use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Board {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    /// Prefix for task slugs generated on this board, e.g. "TASK" -> TASK-17.
    pub slug_ticker: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BoardCreateRequest {
    pub workspace_id: i64,
    #[schema(example = "Sprint board")]
    pub name: String,
    #[schema(example = "TASK")]
    pub slug_ticker: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BoardUpdateRequest {
    pub name: Option<String>,
    pub slug_ticker: Option<String>,
}
