use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use critica::config::Config;
use critica::mail::{ConsoleBackend, EmailBackend, SmtpBackend};
use critica::{db, error, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    println!("🔌 Connecting to database...");
    let db = db::establish_connection(&config.database.url)
        .await
        .expect("Failed to connect to database");
    db::init_schema(&db)
        .await
        .expect("Failed to initialize database schema");
    println!("✅ Database connected!");

    let mailer: Arc<dyn EmailBackend> = match config.email.smtp_host.as_deref() {
        Some(host) => Arc::new(
            SmtpBackend::new(host, config.email.smtp_port, &config.email.from)
                .expect("Invalid SMTP configuration"),
        ),
        None => Arc::new(ConsoleBackend),
    };
    let mailer_data: web::Data<dyn EmailBackend> = web::Data::from(mailer);

    let bind_addr = (config.server.host.clone(), config.server.port);
    println!("🚀 Starting server on http://{}:{}", bind_addr.0, bind_addr.1);

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(mailer_data.clone())
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
