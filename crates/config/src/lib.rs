pub mod settings;

pub use settings::{
    AiSettings, AppSettings, AuditSettings, DatabaseSettings, JwtSettings, PasswordSettings,
    Settings,
};
