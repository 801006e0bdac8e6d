use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Word characters plus `.@+-`, the full string.
pub static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username regex"));

/// Letters, digits, underscores and hyphens.
pub static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug regex"));

/// `me` is routed to the own-profile endpoint and can never name an account.
pub fn validate_username_not_reserved(username: &str) -> Result<(), ValidationError> {
    if username == "me" {
        let mut err = ValidationError::new("reserved_username");
        err.message = Some("Username \"me\" is reserved.".into());
        return Err(err);
    }
    Ok(())
}

/// Release years may not lie in the future. Checked against the clock at
/// request time, so it is a helper rather than a derive attribute.
pub fn check_year(year: i32) -> Result<(), crate::error::ApiError> {
    if year > Utc::now().year() {
        return Err(crate::error::ApiError::field(
            "year",
            "Year must not be later than the current year.",
        ));
    }
    Ok(())
}
