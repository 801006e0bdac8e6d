use std::env;

/// Runtime configuration, read once at startup from the environment
/// (a `.env` file is honored via dotenv in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Signs both JWTs and confirmation codes.
    pub jwt_secret: String,
    /// How long a mailed confirmation code stays valid.
    pub code_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from: String,
    /// When unset, outgoing mail is logged instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env_parse("SERVER_PORT", 8080),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:critica.db?mode=rwc".to_string()),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                    eprintln!("⚠️  WARNING: JWT_SECRET not set, using default (INSECURE)");
                    "default-insecure-key-change-this".to_string()
                }),
                code_ttl_secs: env_parse("CONFIRMATION_CODE_TTL_SECS", 86_400),
            },
            email: EmailConfig {
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| "admin@critica.dev".to_string()),
                smtp_host: env::var("SMTP_HOST").ok(),
                smtp_port: env_parse("SMTP_PORT", 25),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
