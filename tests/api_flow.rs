use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

async fn setup() -> Result<(TempDir, SqlitePool, Router)> {
    std::env::set_var("JWT_SECRET", "test-secret");

    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    let app = taskboard::create_app(pool.clone()).await?;

    Ok((dir, pool, app))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, json))
}

/// Registers a user and returns (token, user id).
async fn register(app: &Router, email: &str) -> Result<(String, i64)> {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": email,
            "email": email,
            "password": "correct horse battery",
            "first_name": "Test",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_i64().unwrap();

    Ok((token, user_id))
}

async fn create_workspace(app: &Router, token: &str, title: &str) -> Result<i64> {
    let (status, body) = send(
        app,
        "POST",
        "/workspaces",
        Some(token),
        Some(json!({ "title": title })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "workspace create failed: {body}");
    Ok(body["id"].as_i64().unwrap())
}

async fn create_board(app: &Router, token: &str, workspace_id: i64, name: &str) -> Result<i64> {
    let (status, body) = send(
        app,
        "POST",
        "/boards",
        Some(token),
        Some(json!({ "workspace_id": workspace_id, "name": name })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "board create failed: {body}");
    Ok(body["id"].as_i64().unwrap())
}

#[tokio::test]
async fn register_login_and_me() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (token, user_id) = register(&app, "ada@example.com").await?;

    // Duplicate email is rejected.
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "ada2",
            "email": "ada@example.com",
            "password": "correct horse battery",
            "first_name": "Ada",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "correct horse battery" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64(), Some(user_id));
    assert_eq!(body["email"], "ada@example.com");

    let (status, _) = send(&app, "GET", "/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn workspace_access_is_gated_on_participation() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let (guest, guest_id) = register(&app, "guest@example.com").await?;

    let ws = create_workspace(&app, &owner, "Product team").await?;

    // Non-participants get a policy failure, not a not-found.
    let (status, body) = send(&app, "GET", &format!("/workspaces/{ws}"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_participant");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/workspaces/{ws}"),
        Some(&guest),
        Some(json!({ "title": "hijacked" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Invite with the default (member) role.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": guest_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {body}");

    // A second invite conflicts.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": guest_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // Members can read the workspace but not administer it.
    let (status, _) = send(&app, "GET", &format!("/workspaces/{ws}"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/workspaces/{ws}"),
        Some(&guest),
        Some(json!({ "title": "hijacked" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "action_not_permitted");

    Ok(())
}

#[tokio::test]
async fn board_visibility_follows_view_grants() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let (guest, guest_id) = register(&app, "guest@example.com").await?;

    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board_a = create_board(&app, &owner, ws, "Sprint board").await?;
    let board_b = create_board(&app, &owner, ws, "Roadmap").await?;

    // A custom role with no grants at all.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/roles"),
        Some(&owner),
        Some(json!({ "name": "Stakeholder" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let stakeholder_role = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": guest_id, "role_id": stakeholder_role })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    // No view grant: board reads fail and the listing is empty.
    let (status, body) = send(&app, "GET", &format!("/boards/{board_a}"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "view_not_permitted");

    let (status, body) = send(&app, "GET", &format!("/workspaces/{ws}/boards"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Codes outside the catalog are rejected.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/roles/{stakeholder_role}/permissions"),
        Some(&owner),
        Some(json!({ "resource_type": "board", "permission_code": "fly_to_the_moon" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Grant view on board A only.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/roles/{stakeholder_role}/permissions"),
        Some(&owner),
        Some(json!({
            "resource_type": "board",
            "permission_code": "view_board",
            "instance_id": board_a,
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, _) = send(&app, "GET", &format!("/boards/{board_a}"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/boards/{board_b}"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", &format!("/workspaces/{ws}/boards"), Some(&guest), None).await?;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(listed, vec![board_a]);

    Ok(())
}

#[tokio::test]
async fn board_creation_requires_a_workspace_grant() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let (member, member_id) = register(&app, "member@example.com").await?;

    let ws = create_workspace(&app, &owner, "Product team").await?;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": member_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/boards",
        Some(&member),
        Some(json!({ "workspace_id": ws, "name": "Sprint board" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "action_not_permitted");

    create_board(&app, &owner, ws, "Sprint board").await?;

    // Names are unique per workspace.
    let (status, _) = send(
        &app,
        "POST",
        "/boards",
        Some(&owner),
        Some(json!({ "workspace_id": ws, "name": "Sprint board" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn comment_creator_bypass_and_moderation() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let (member, member_id) = register(&app, "member@example.com").await?;

    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board = create_board(&app, &owner, ws, "Sprint board").await?;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": member_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board, "title": "In progress" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let group = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({ "group_id": group, "title": "Define launch checklist" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let task = body["id"].as_i64().unwrap();

    // One comment from each side.
    let (status, body) = send(
        &app,
        "POST",
        "/comments",
        Some(&owner),
        Some(json!({ "task_id": task, "text": "looks good" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let owner_comment = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/comments",
        Some(&member),
        Some(json!({ "task_id": task, "text": "on it" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let member_comment = body["id"].as_i64().unwrap();

    // Editing your own comment needs no foreign-comment grant.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/comments/{member_comment}"),
        Some(&member),
        Some(json!({ "text": "on it today" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "on it today");

    // Closing your own comment is also creator-bypassed.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/comments/{member_comment}/status"),
        Some(&member),
        Some(json!({ "status": "completed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    // A member cannot touch someone else's comment.
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/comments/{owner_comment}"),
        Some(&member),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "action_not_permitted");

    // The workspace creator holds the foreign-comment grants.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/comments/{member_comment}"),
        Some(&owner),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn rejected_task_create_leaves_no_rows() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board = create_board(&app, &owner, ws, "Sprint board").await?;

    let (status, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board, "title": "Backlog" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let group = body["id"].as_i64().unwrap();

    // An assigner from outside the workspace fails validation.
    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({ "group_id": group, "title": "doomed", "assigner_ids": [9999] })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM tasks").fetch_one(&pool).await?;
    assert_eq!(tasks, 0, "rejected create must not leave a task row");

    // The slug counter rolls back with it.
    let counter: i64 = sqlx::query_scalar("SELECT task_counter FROM workspaces WHERE id = ?")
        .bind(ws)
        .fetch_one(&pool)
        .await?;
    assert_eq!(counter, 0);

    // The next accepted create still numbers from 1.
    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({ "group_id": group, "title": "first" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "TASK-1");

    Ok(())
}

#[tokio::test]
async fn rejected_reassignment_keeps_existing_assigners() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board = create_board(&app, &owner, ws, "Sprint board").await?;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        None,
    )
    .await?;
    let owner_participant = body[0]["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board, "title": "Backlog" })),
    )
    .await?;
    let group = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({
            "group_id": group,
            "title": "task",
            "assigner_ids": [owner_participant],
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let task = body["id"].as_i64().unwrap();

    // A new set containing an unknown participant is rejected whole.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/tasks/{task}"),
        Some(&owner),
        Some(json!({ "assigner_ids": [owner_participant, 9999] })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let assigners: Vec<i64> =
        sqlx::query_scalar("SELECT participant_id FROM task_assigners WHERE task_id = ?")
            .bind(task)
            .fetch_all(&pool)
            .await?;
    assert_eq!(assigners, vec![owner_participant], "old assigners must survive the rollback");

    Ok(())
}

#[tokio::test]
async fn renaming_over_an_existing_name_conflicts() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board_a = create_board(&app, &owner, ws, "Sprint board").await?;
    let board_b = create_board(&app, &owner, ws, "Roadmap").await?;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/boards/{board_b}"),
        Some(&owner),
        Some(json!({ "name": "Sprint board" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // Re-submitting the current name is not a conflict with itself.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/boards/{board_b}"),
        Some(&owner),
        Some(json!({ "name": "Roadmap" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board_a, "title": "Backlog" })),
    )
    .await?;
    let _backlog = body["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board_a, "title": "Done" })),
    )
    .await?;
    let done = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/groups/{done}"),
        Some(&owner),
        Some(json!({ "title": "Backlog" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    Ok(())
}

#[tokio::test]
async fn task_slugs_and_reassignment() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    let (owner, _) = register(&app, "owner@example.com").await?;
    let (member, member_id) = register(&app, "member@example.com").await?;

    let ws = create_workspace(&app, &owner, "Product team").await?;
    let board = create_board(&app, &owner, ws, "Sprint board").await?;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/workspaces/{ws}/participants"),
        Some(&owner),
        Some(json!({ "user_id": member_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let member_participant = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": board, "title": "Backlog" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let group = body["id"].as_i64().unwrap();

    // Slugs count up workspace-wide, prefixed by the board ticker.
    let (_, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({ "group_id": group, "title": "first" })),
    )
    .await?;
    assert_eq!(body["slug"], "TASK-1");
    let task = body["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&member),
        Some(json!({ "group_id": group, "title": "second" })),
    )
    .await?;
    assert_eq!(body["slug"], "TASK-2");

    // The counter is shared across boards of the workspace.
    let (_, body) = send(
        &app,
        "POST",
        "/boards",
        Some(&owner),
        Some(json!({ "workspace_id": ws, "name": "Roadmap", "slug_ticker": "ROAD" })),
    )
    .await?;
    let other_board = body["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&owner),
        Some(json!({ "board_id": other_board, "title": "Later" })),
    )
    .await?;
    let other_group = body["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(&owner),
        Some(json!({ "group_id": other_group, "title": "third" })),
    )
    .await?;
    assert_eq!(body["slug"], "ROAD-3");

    // Members may edit tasks.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/tasks/{task}"),
        Some(&member),
        Some(json!({ "title": "first, renamed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "first, renamed");

    // Changing the assigner set is a separate privilege members lack.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/tasks/{task}"),
        Some(&member),
        Some(json!({ "assigner_ids": [member_participant] })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "action_not_permitted");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/tasks/{task}"),
        Some(&owner),
        Some(json!({ "assigner_ids": [member_participant] })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Re-sending the same set is not a reassignment.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/tasks/{task}"),
        Some(&member),
        Some(json!({ "assigner_ids": [member_participant] })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Members cannot delete tasks.
    let (status, _) = send(&app, "DELETE", &format!("/tasks/{task}"), Some(&member), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &format!("/tasks/{task}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}
