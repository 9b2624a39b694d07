use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Workspace {
    pub id: i64,
    pub title: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkspaceCreateRequest {
    #[schema(example = "Product team")]
    pub title: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkspaceUpdateRequest {
    pub title: String,
}
