pub mod audit;
pub mod auth;
pub mod chat;
pub mod completion;
pub mod dao;
pub mod error;
pub mod registry;
pub mod session;
pub mod validation;

pub use audit::AuditPipeline;
pub use auth::{AuthError, AuthService, IdentityContext};
pub use chat::ChatService;
pub use completion::{ClaudeCompletion, CompletionError, CompletionService};
pub use dao::*;
pub use error::{ServiceError, ServiceResult};
pub use registry::TenantRegistry;
pub use session::SessionService;
