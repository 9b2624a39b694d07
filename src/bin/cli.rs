//! Admin CLI: user creation and workspace provisioning without going through
//! the HTTP layer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use taskboard::authz;
use taskboard::db;
use taskboard::utils::{hash_password, utc_now};

#[derive(Parser, Debug)]
#[command(author, version, about = "taskboard admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    Migrate,
    /// Create a user account
    CreateUser {
        username: String,
        email: String,
        password: String,
    },
    /// Create a workspace, seed its built-in roles and bind the creator
    ProvisionWorkspace {
        title: String,
        /// Email of an existing user to bind as Super-Admin
        creator_email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = db::init().await?;

    match cli.command {
        Commands::Migrate => {
            // db::init already ran pending migrations
            println!("migrations up to date");
        }
        Commands::CreateUser { username, email, password } => {
            let password_hash = hash_password(&password).map_err(|err| anyhow::anyhow!(err.to_string()))?;

            let user_id: i64 = sqlx::query_scalar(
                "INSERT INTO users (username, email, password_hash, first_name, date_joined) \
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(&username)
            .bind(&email)
            .bind(&password_hash)
            .bind(&username)
            .bind(utc_now())
            .fetch_one(&pool)
            .await
            .context("failed to create user")?;

            println!("created user {username} (id {user_id})");
        }
        Commands::ProvisionWorkspace { title, creator_email } => {
            let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
                .bind(&creator_email)
                .fetch_optional(&pool)
                .await?
                .context("no user with that email")?;

            let workspace_id: i64 = sqlx::query_scalar(
                "INSERT INTO workspaces (title, date_created) VALUES (?, ?) RETURNING id",
            )
            .bind(&title)
            .bind(utc_now())
            .fetch_one(&pool)
            .await?;

            let participant = authz::provision_workspace(&pool, workspace_id, user_id)
                .await
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;

            println!(
                "provisioned workspace '{title}' (id {workspace_id}), creator participant id {}",
                participant.id
            );
        }
    }

    Ok(())
}
