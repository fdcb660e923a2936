pub mod activity_log;
pub mod chat;
pub mod company;
pub mod message;
pub mod role;
pub mod user;

pub use activity_log::ActivityLog;
pub use chat::Chat;
pub use company::{Company, CompanySettings, SubscriptionStatus, SubscriptionTier};
pub use message::{Attachment, Message, MessageRole};
pub use role::Role;
pub use user::User;
