// Structured response shapes, built from entity models in the handlers.
use serde::Serialize;

use super::users::Role;
use super::{category, genre, users};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub name: String,
    pub slug: String,
}

impl From<category::Model> for CategoryResponse {
    fn from(category: category::Model) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub name: String,
    pub slug: String,
}

impl From<genre::Model> for GenreResponse {
    fn from(genre: genre::Model) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

/// Read shape for titles: nested category/genre objects plus the
/// review-score average (null while unreviewed).
#[derive(Debug, Serialize)]
pub struct TitleReadResponse {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<GenreResponse>,
    pub category: Option<CategoryResponse>,
}

/// Write shape for titles: echoes the slug references back, no rating.
#[derive(Debug, Serialize)]
pub struct TitleWriteResponse {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub genre: Vec<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub title: i32,
    pub text: String,
    pub author: String,
    pub score: i16,
    pub pub_date: chrono::NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i32,
    pub review: i32,
    pub text: String,
    pub author: String,
    pub pub_date: chrono::NaiveDateTime,
}
