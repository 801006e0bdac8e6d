use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::users;

type HmacSha256 = Hmac<Sha256>;

/// Builds a confirmation code of the form `{timestamp_hex}-{mac_hex}`.
///
/// The MAC covers the account state, so the code expires on its own TTL
/// and dies early if the profile changes in between. Nothing is stored
/// server-side.
pub fn make_code(user: &users::Model, secret: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mac = sign_state(user, secret, timestamp);
    format!("{timestamp:x}-{mac}")
}

/// Checks a code against the current account state. Comparison of the MAC
/// is constant-time via `verify_slice`.
pub fn check_code(user: &users::Model, secret: &str, code: &str, ttl_secs: i64) -> bool {
    let Some((timestamp_hex, mac_hex)) = code.split_once('-') else {
        return false;
    };
    let Ok(timestamp) = i64::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    let now = Utc::now().timestamp();
    if timestamp > now || now - timestamp > ttl_secs {
        return false;
    }
    let Ok(expected) = hex::decode(mac_hex) else {
        return false;
    };

    let mut mac = new_mac(secret);
    mac.update(state_fingerprint(user).as_bytes());
    mac.update(timestamp.to_string().as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn sign_state(user: &users::Model, secret: &str, timestamp: i64) -> String {
    let mut mac = new_mac(secret);
    mac.update(state_fingerprint(user).as_bytes());
    mac.update(timestamp.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn new_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

/// Every field that should invalidate outstanding codes when it changes.
/// Newline-joined; none of the fields may contain a newline after
/// validation, and the id prefix pins the account either way.
fn state_fingerprint(user: &users::Model) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}",
        user.id,
        user.username,
        user.email,
        user.first_name,
        user.last_name,
        user.bio,
        user.role.as_str()
    )
}
