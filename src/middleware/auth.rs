use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::users;
use crate::utils::jwt;

/// The authenticated account, extracted from the Authorization header.
/// Loads the row on every request, so role changes bite immediately
/// instead of waiting for the token to expire.
#[derive(Debug, Clone)]
pub struct AuthUser(pub users::Model);

impl std::ops::Deref for AuthUser {
    type Target = users::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AuthUser {
    pub fn into_inner(self) -> users::Model {
        self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let header = req.headers().get("Authorization").ok_or_else(|| {
        ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
    })?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header.".to_string()))?;
    value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Invalid Authorization format (expected: Bearer <token>).".to_string())
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let token = bearer_token(&req)?.to_owned();

            let config = req
                .app_data::<web::Data<Config>>()
                .ok_or_else(|| ApiError::Internal("Config not registered".to_string()))?;
            let claims = jwt::verify_access_token(&token, &config.auth.jwt_secret)
                .map_err(ApiError::Unauthorized)?;

            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| ApiError::Internal("Database not registered".to_string()))?;
            let user = users::Entity::find_by_id(claims.sub)
                .one(db.get_ref())
                .await?
                .ok_or_else(|| {
                    ApiError::Unauthorized("User for this token no longer exists.".to_string())
                })?;

            Ok(AuthUser(user))
        })
    }
}
