use std::collections::BTreeMap;

use actix_web::{HttpResponse, post, web};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::mail::EmailBackend;
use crate::models::users::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users, Model as User, Role,
};
use crate::utils::{confirmation, jwt};
use crate::validators::{USERNAME_RE, validate_username_not_reserved};

// DTO for requesting a confirmation code
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has at most 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username: letters, digits and @/./+/-/_ only."
        ),
        custom(function = validate_username_not_reserved)
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has at most 254 characters.")
    )]
    pub email: String,
}

// DTO for exchanging a confirmation code against a token pair
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: String,
}

/// POST /v1/auth/signup - request a confirmation code by mail (public)
///
/// Repeating the call with the exact same (username, email) pair just
/// resends a code. A collision on only one of the two is a field error.
#[post("/signup")]
pub async fn signup(
    body: web::Json<SignupRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    mailer: web::Data<dyn EmailBackend>,
) -> ApiResult<HttpResponse> {
    // 1. Exact pair -> idempotent resend, skipping the rest
    let existing = Users::find()
        .filter(UserColumn::Username.eq(&body.username))
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await?;
    if let Some(user) = existing {
        send_confirmation_code(&user, &config, mailer.get_ref()).await?;
        return Ok(signup_response(&user));
    }

    body.validate()?;

    // 2. Partial collision -> reject, naming the taken field
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let username_taken = Users::find()
        .filter(UserColumn::Username.eq(&body.username))
        .one(db.get_ref())
        .await?
        .is_some();
    if username_taken {
        fields.insert(
            "username".to_string(),
            vec!["A user with that username already exists.".to_string()],
        );
    }
    let email_taken = Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await?
        .is_some();
    if email_taken {
        fields.insert(
            "email".to_string(),
            vec!["user with this email already exists.".to_string()],
        );
    }
    if !fields.is_empty() {
        return Err(ApiError::Validation(fields));
    }

    // 3. Create the account with the default role
    let new_user = UserActiveModel {
        username: Set(body.username.clone()),
        email: Set(body.email.clone()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        bio: Set(String::new()),
        role: Set(Role::User),
        ..Default::default()
    };
    let user = new_user.insert(db.get_ref()).await.map_err(|err| {
        // Lost a creation race: same answer as the collision check above.
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::field(
                "username",
                "A user with that username or email already exists.",
            ),
            _ => ApiError::from(err),
        }
    })?;

    // 4. Mail the code; delivery failure fails the whole request
    send_confirmation_code(&user, &config, mailer.get_ref()).await?;

    Ok(signup_response(&user))
}

/// POST /v1/auth/token - exchange username + confirmation code for JWTs (public)
#[post("/token")]
pub async fn token(
    body: web::Json<TokenRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    // Unknown username is 404, a bad code for a known user is 400.
    let user = Users::find()
        .filter(UserColumn::Username.eq(&body.username))
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;

    let valid = confirmation::check_code(
        &user,
        &config.auth.jwt_secret,
        &body.confirmation_code,
        config.auth.code_ttl_secs,
    );
    if !valid {
        return Err(ApiError::field(
            "confirmation_code",
            "Invalid or expired confirmation code.",
        ));
    }

    let pair = jwt::generate_token_pair(user.id, &user.username, &config.auth.jwt_secret)
        .map_err(ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(pair))
}

fn signup_response(user: &User) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "username": user.username,
        "email": user.email,
    }))
}

pub(crate) async fn send_confirmation_code(
    user: &User,
    config: &Config,
    mailer: &dyn EmailBackend,
) -> Result<(), ApiError> {
    let code = confirmation::make_code(user, &config.auth.jwt_secret);
    mailer
        .send(
            &user.email,
            "Confirmation code",
            &format!("Confirmation code: {code}"),
        )
        .await
        .map_err(ApiError::Mail)
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").service(signup).service(token));
}
