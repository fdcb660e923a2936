pub mod activity;
pub mod auth;

pub use activity::record_activity;
pub use auth::{Gate, authenticate, require};
