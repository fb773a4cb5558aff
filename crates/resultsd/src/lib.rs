//! Results daemon library - exposes modules for testing.

pub mod drive;
pub mod lookup;
pub mod provision;
pub mod render;
pub mod routes;
pub mod server;
