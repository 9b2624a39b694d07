use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    pub id: i64,
    pub group_id: i64,
    pub creator_id: i64,
    /// Workspace-wide task number, e.g. "TASK-17". Assigned on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub date_created: DateTime<Utc>,
    #[schema(format = DateTime, example = "2026-09-15T17:00:00Z")]
    pub date_ending: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    pub group_id: i64,
    #[schema(example = "Define launch checklist")]
    pub title: String,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub date_ending: Option<DateTime<Utc>>,
    /// Participant ids to assign; must belong to the same workspace.
    #[serde(default)]
    pub assigner_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub date_ending: Option<DateTime<Utc>>,
    /// When present, replaces the assigner set (needs `reassign_tasks`
    /// if it actually changes).
    pub assigner_ids: Option<Vec<i64>>,
}
