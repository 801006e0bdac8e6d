use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCESS_LIFETIME_HOURS: i64 = 1;
pub const REFRESH_LIFETIME_DAYS: i64 = 7;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub username: String,
    pub token_type: String, // "access" or "refresh"
    pub jti: String,        // shared by both tokens of a pair
    pub exp: i64,           // expiration timestamp
}

/// The pair handed out after a confirmation code checks out. Only the
/// access half authenticates API requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Issues a refresh/access pair sharing one token id.
pub fn generate_token_pair(user_id: i32, username: &str, secret: &str) -> Result<TokenPair, String> {
    let jti = Uuid::new_v4().to_string();

    let refresh = generate_token(
        user_id,
        username,
        TOKEN_TYPE_REFRESH,
        &jti,
        Duration::days(REFRESH_LIFETIME_DAYS),
        secret,
    )?;
    let access = generate_token(
        user_id,
        username,
        TOKEN_TYPE_ACCESS,
        &jti,
        Duration::hours(ACCESS_LIFETIME_HOURS),
        secret,
    )?;

    Ok(TokenPair { refresh, access })
}

fn generate_token(
    user_id: i32,
    username: &str,
    token_type: &str,
    jti: &str,
    lifetime: Duration,
    secret: &str,
) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(lifetime)
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        token_type: token_type.to_string(),
        jti: jti.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Verifies signature and expiry, and that the token is the access half.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    if claims.token_type != TOKEN_TYPE_ACCESS {
        return Err("Token is not an access token".to_string());
    }

    Ok(claims)
}
