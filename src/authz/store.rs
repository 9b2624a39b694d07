//! Instance permission store.
//!
//! Flat `instance_permissions` rows keyed by role. A row with a NULL
//! `instance_id` grants the code for every instance of the resource type; a
//! row with an instance id grants it for that instance alone. The
//! no-duplicate-grant invariant is enforced by the store's unique indexes,
//! not by application-level locking, so concurrent grants stay idempotent.
//!
//! Functions take either a connection or an executor, so callers can
//! run them on the pool directly or inside an open transaction.

use sqlx::{SqliteConnection, SqliteExecutor};

use crate::errors::AppResult;
use crate::models::rbac::InstancePermission;

use super::ResourceType;

/// Idempotent grant: returns the existing row when an identical
/// (code, type, instance) grant is already present for the role.
pub async fn grant(
    conn: &mut SqliteConnection,
    role_id: i64,
    resource: ResourceType,
    code: &str,
    instance_id: Option<i64>,
) -> AppResult<InstancePermission> {
    sqlx::query(
        "INSERT OR IGNORE INTO instance_permissions (role_id, permission_code, resource_type, instance_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(role_id)
    .bind(code)
    .bind(resource.as_str())
    .bind(instance_id)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, InstancePermission>(
        "SELECT id, role_id, permission_code, resource_type, instance_id \
         FROM instance_permissions \
         WHERE role_id = ? AND permission_code = ? AND resource_type = ? \
           AND (instance_id = ? OR (instance_id IS NULL AND ? IS NULL))",
    )
    .bind(role_id)
    .bind(code)
    .bind(resource.as_str())
    .bind(instance_id)
    .bind(instance_id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        role_id,
        code,
        resource = resource.as_str(),
        instance_id,
        "permission granted"
    );

    Ok(row)
}

/// Removes the matching grant if present; absence is not an error.
pub async fn revoke(
    executor: impl SqliteExecutor<'_>,
    role_id: i64,
    resource: ResourceType,
    code: &str,
    instance_id: Option<i64>,
) -> AppResult<()> {
    sqlx::query(
        "DELETE FROM instance_permissions \
         WHERE role_id = ? AND permission_code = ? AND resource_type = ? \
           AND (instance_id = ? OR (instance_id IS NULL AND ? IS NULL))",
    )
    .bind(role_id)
    .bind(code)
    .bind(resource.as_str())
    .bind(instance_id)
    .bind(instance_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Removes every grant scoped to exactly this instance, across all roles.
/// Called synchronously by the board/workspace deletion handlers so no grant
/// outlives the instance it references. Global grants are untouched.
pub async fn purge_for_instance(
    executor: impl SqliteExecutor<'_>,
    resource: ResourceType,
    instance_id: i64,
) -> AppResult<()> {
    let result = sqlx::query(
        "DELETE FROM instance_permissions WHERE resource_type = ? AND instance_id = ?",
    )
    .bind(resource.as_str())
    .bind(instance_id)
    .execute(executor)
    .await?;

    tracing::debug!(
        resource = resource.as_str(),
        instance_id,
        purged = result.rows_affected(),
        "instance permissions purged"
    );

    Ok(())
}

/// The decision procedure: does the role hold `code` on this instance, via an
/// instance-scoped grant OR a global one? The two arms are equivalent; either
/// satisfies the check. Queries current grant state on every call so that
/// revocations take effect immediately.
pub async fn has_permission(
    executor: impl SqliteExecutor<'_>,
    role_id: i64,
    resource: ResourceType,
    instance_id: Option<i64>,
    code: &str,
) -> AppResult<bool> {
    let found: i64 = sqlx::query_scalar(
        "SELECT EXISTS ( \
           SELECT 1 FROM instance_permissions \
           WHERE role_id = ? AND permission_code = ? AND resource_type = ? \
             AND (instance_id IS NULL OR instance_id = ?) \
         )",
    )
    .bind(role_id)
    .bind(code)
    .bind(resource.as_str())
    .bind(instance_id)
    .fetch_one(executor)
    .await?;

    Ok(found != 0)
}

/// All grants held by a role, globals first.
pub async fn list_for_role(
    executor: impl SqliteExecutor<'_>,
    role_id: i64,
) -> AppResult<Vec<InstancePermission>> {
    let rows = sqlx::query_as::<_, InstancePermission>(
        "SELECT id, role_id, permission_code, resource_type, instance_id \
         FROM instance_permissions \
         WHERE role_id = ? \
         ORDER BY instance_id IS NOT NULL, resource_type, permission_code",
    )
    .bind(role_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
