use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
    pub audit: AuditSettings,
    pub ai: AiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    /// Upper bound for a single store operation.
    pub op_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub token_ttl_secs: u64,
    pub cookie_secure: bool,
    /// `Strict`, `Lax` or `None`.
    pub cookie_same_site: String,
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditSettings {
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("BIZCHAT")
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8080)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "bizchat")?
            .set_default("database.op_timeout_secs", 5)?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.token_ttl_secs", 259_200)?
            .set_default("jwt.cookie_secure", false)?
            .set_default("jwt.cookie_same_site", "Lax")?
            .set_default("password.memory_kib", 19_456)?
            .set_default("password.iterations", 2)?
            .set_default("password.parallelism", 1)?
            .set_default("audit.queue_capacity", 1024)?
            .set_default("ai.model", "claude-sonnet-4-5-20250929")?
            .set_default("ai.max_tokens", 4096)?
            .set_default("ai.base_url", "https://api.anthropic.com")?
            .build()?;

        config.try_deserialize()
    }

    /// Settings for in-process servers: no files or environment, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            app: AppSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: Vec::new(),
            },
            database: DatabaseSettings {
                url: "mongodb://localhost:27017".to_string(),
                name: "bizchat_test".to_string(),
                max_pool_size: None,
                min_pool_size: None,
                op_timeout_secs: 5,
            },
            jwt: JwtSettings {
                secret: "test-secret-for-bizchat-integration".to_string(),
                token_ttl_secs: 259_200,
                cookie_secure: false,
                cookie_same_site: "Lax".to_string(),
            },
            password: PasswordSettings {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            audit: AuditSettings { queue_capacity: 256 },
            ai: AiSettings {
                api_key: None,
                model: "claude-test".to_string(),
                max_tokens: 256,
                base_url: "http://127.0.0.1:9".to_string(),
            },
        }
    }
}
