#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use critica::config::{AuthConfig, Config, DatabaseConfig, EmailConfig, ServerConfig};
use critica::db;
use critica::mail::{EmailBackend, MemoryBackend};
use critica::models::users::Role;
use critica::models::{category, comment, genre, review, title, title_genre, users};
use critica::utils::jwt;

pub struct TestCtx {
    pub db: DatabaseConnection,
    pub config: web::Data<Config>,
    pub mailer: MemoryBackend,
    pub mailer_data: web::Data<dyn EmailBackend>,
}

/// Fresh in-memory database plus the shared app state. The pool is pinned
/// to one connection so every query sees the same :memory: instance.
pub async fn setup() -> TestCtx {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("sqlite connect");
    db::init_schema(&db).await.expect("schema init");

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            code_ttl_secs: 86_400,
        },
        email: EmailConfig {
            from: "admin@critica.dev".to_string(),
            smtp_host: None,
            smtp_port: 25,
        },
    };

    let mailer = MemoryBackend::new();
    let mailer_data: web::Data<dyn EmailBackend> =
        web::Data::from(Arc::new(mailer.clone()) as Arc<dyn EmailBackend>);

    TestCtx {
        db,
        config: web::Data::new(config),
        mailer,
        mailer_data,
    }
}

/// Backend whose delivery always fails, for exercising mail error paths.
pub struct FailingBackend;

#[async_trait]
impl EmailBackend for FailingBackend {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), String> {
        Err("smtp connection refused".to_string())
    }
}

pub fn failing_mailer() -> web::Data<dyn EmailBackend> {
    web::Data::from(Arc::new(FailingBackend) as Arc<dyn EmailBackend>)
}

/// Builds the service under test with the context's state. A macro so the
/// unnameable `App` type never has to appear in a signature.
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {{
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.db.clone()))
                .app_data($ctx.config.clone())
                .app_data($ctx.mailer_data.clone())
                .app_data(
                    actix_web::web::JsonConfig::default()
                        .error_handler(critica::error::json_error_handler),
                )
                .app_data(
                    actix_web::web::QueryConfig::default()
                        .error_handler(critica::error::query_error_handler),
                )
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(critica::routes::configure_routes),
        )
        .await
    }};
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: Role) -> users::Model {
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        bio: Set(String::new()),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub fn token_for(user: &users::Model, config: &Config) -> String {
    jwt::generate_token_pair(user.id, &user.username, &config.auth.jwt_secret)
        .expect("token pair")
        .access
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Pulls the confirmation code out of the most recent captured mail.
pub fn last_mailed_code(mailer: &MemoryBackend) -> String {
    let sent = mailer.sent();
    let mail = sent.last().expect("at least one mail sent");
    mail.body
        .rsplit_once(": ")
        .expect("code in mail body")
        .1
        .trim()
        .to_string()
}

pub async fn create_category(db: &DatabaseConnection, name: &str, slug: &str) -> category::Model {
    category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert category")
}

pub async fn create_genre(db: &DatabaseConnection, name: &str, slug: &str) -> genre::Model {
    genre::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert genre")
}

pub async fn create_title(
    db: &DatabaseConnection,
    name: &str,
    year: i32,
    category_id: Option<i32>,
) -> title::Model {
    title::ActiveModel {
        name: Set(name.to_string()),
        year: Set(year),
        description: Set(None),
        category_id: Set(category_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert title")
}

pub async fn link_genre(db: &DatabaseConnection, title_id: i32, genre_id: i32) {
    title_genre::ActiveModel {
        title_id: Set(title_id),
        genre_id: Set(genre_id),
    }
    .insert(db)
    .await
    .expect("insert title_genre");
}

pub async fn create_review(
    db: &DatabaseConnection,
    title_id: i32,
    author_id: i32,
    score: i16,
) -> review::Model {
    review::ActiveModel {
        title_id: Set(title_id),
        author_id: Set(author_id),
        text: Set(format!("review scored {score}")),
        score: Set(score),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert review")
}

pub async fn create_comment(
    db: &DatabaseConnection,
    review_id: i32,
    author_id: i32,
    text: &str,
) -> comment::Model {
    comment::ActiveModel {
        review_id: Set(review_id),
        author_id: Set(author_id),
        text: Set(text.to_string()),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert comment")
}
