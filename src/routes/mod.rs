pub mod auth;
pub mod boards;
pub mod comments;
pub mod roles;
pub mod task_groups;
pub mod tasks;
pub mod workspaces;
