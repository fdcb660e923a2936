pub mod auth;
pub mod body;
pub mod client;

pub use auth::AuthUser;
pub use body::{Json, Path, Query};
pub use client::ClientInfo;
