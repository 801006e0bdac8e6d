pub mod auth;
pub mod categories;
pub mod comments;
pub mod genres;
pub mod health;
pub mod reviews;
pub mod titles;
pub mod users;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_check);
    cfg.service(
        web::scope("/v1")
            .configure(auth::auth_routes)
            .configure(users::user_routes)
            .configure(categories::category_routes)
            .configure(genres::genre_routes)
            .configure(titles::title_routes),
    );
}
