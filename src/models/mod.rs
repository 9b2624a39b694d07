pub mod board;
pub mod comment;
pub mod rbac;
pub mod task;
pub mod task_group;
pub mod user;
pub mod workspace;
