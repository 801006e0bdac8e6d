use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::dto::ReviewResponse;
use crate::models::review::{
    ActiveModel as ReviewActiveModel, Column as ReviewColumn, Entity as Reviews, Model as Review,
};
use crate::models::title::{Entity as Titles, Model as Title};
use crate::models::users;
use crate::pagination::Pagination;
use crate::permissions;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewPayload {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i16,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewPatchPayload {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/titles/{title_id}/reviews - oldest first (public)
#[get("/{title_id}/reviews")]
pub async fn list_reviews(
    req: HttpRequest,
    path: web::Path<i32>,
    query: web::Query<ReviewListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let title = find_title(db.get_ref(), *path).await?;

    let select = Reviews::find()
        .filter(ReviewColumn::TitleId.eq(title.id))
        .order_by_asc(ReviewColumn::PubDate)
        .order_by_asc(ReviewColumn::Id);

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let reviews = paginator.fetch_page(pg.page - 1).await?;

    let results = review_responses(db.get_ref(), reviews).await?;
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/titles/{title_id}/reviews - one review per author and title
/// (authenticated)
#[post("/{title_id}/reviews")]
pub async fn create_review(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ReviewPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let title = find_title(db.get_ref(), *path).await?;
    body.validate()?;

    // Checked here for the friendly message; the unique index has the
    // final word under concurrency.
    let already = Reviews::find()
        .filter(ReviewColumn::TitleId.eq(title.id))
        .filter(ReviewColumn::AuthorId.eq(auth_user.id))
        .one(db.get_ref())
        .await?
        .is_some();
    if already {
        return Err(duplicate_review(&title));
    }

    let new_review = ReviewActiveModel {
        title_id: Set(title.id),
        author_id: Set(auth_user.id),
        text: Set(body.text.clone()),
        score: Set(body.score),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let review = new_review
        .insert(db.get_ref())
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_review(&title),
            _ => ApiError::from(err),
        })?;

    Ok(HttpResponse::Created().json(review_response(review, &auth_user.username)))
}

/// GET /v1/titles/{title_id}/reviews/{id} (public)
#[get("/{title_id}/reviews/{id}")]
pub async fn get_review(
    path: web::Path<(i32, i32)>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;
    let author = find_author(db.get_ref(), &review).await?;
    Ok(HttpResponse::Ok().json(review_response(review, &author)))
}

/// PUT /v1/titles/{title_id}/reviews/{id} - full replace (author, moderator
/// or admin)
#[put("/{title_id}/reviews/{id}")]
pub async fn update_review(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    body: web::Json<ReviewPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;
    permissions::require_content_editor(&auth_user, review.author_id)?;
    body.validate()?;

    let mut active: ReviewActiveModel = review.into();
    active.text = Set(body.text.clone());
    active.score = Set(body.score);
    let review = active.update(db.get_ref()).await?;

    let author = find_author(db.get_ref(), &review).await?;
    Ok(HttpResponse::Ok().json(review_response(review, &author)))
}

/// PATCH /v1/titles/{title_id}/reviews/{id} (author, moderator or admin)
#[patch("/{title_id}/reviews/{id}")]
pub async fn patch_review(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    body: web::Json<ReviewPatchPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;
    permissions::require_content_editor(&auth_user, review.author_id)?;
    body.validate()?;

    let mut active: ReviewActiveModel = review.into();
    if let Some(text) = &body.text {
        active.text = Set(text.clone());
    }
    if let Some(score) = body.score {
        active.score = Set(score);
    }
    let review = active.update(db.get_ref()).await?;

    let author = find_author(db.get_ref(), &review).await?;
    Ok(HttpResponse::Ok().json(review_response(review, &author)))
}

/// DELETE /v1/titles/{title_id}/reviews/{id} - comments cascade away
/// (author, moderator or admin)
#[delete("/{title_id}/reviews/{id}")]
pub async fn delete_review(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;
    permissions::require_content_editor(&auth_user, review.author_id)?;
    review.delete(db.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn find_title(db: &DatabaseConnection, title_id: i32) -> Result<Title, ApiError> {
    Titles::find_by_id(title_id)
        .one(db)
        .await?
        .ok_or_else(ApiError::not_found)
}

/// A review only counts when it belongs to the title in the path.
pub(crate) async fn find_review(
    db: &DatabaseConnection,
    title_id: i32,
    review_id: i32,
) -> Result<Review, ApiError> {
    Reviews::find()
        .filter(ReviewColumn::Id.eq(review_id))
        .filter(ReviewColumn::TitleId.eq(title_id))
        .one(db)
        .await?
        .ok_or_else(ApiError::not_found)
}

async fn find_author(db: &DatabaseConnection, review: &Review) -> Result<String, ApiError> {
    users::Entity::find_by_id(review.author_id)
        .one(db)
        .await?
        .map(|user| user.username)
        .ok_or_else(|| ApiError::Internal("review author missing".to_string()))
}

fn duplicate_review(title: &Title) -> ApiError {
    ApiError::Conflict(format!("A review for {} already exists.", title.name))
}

fn review_response(review: Review, author: &str) -> ReviewResponse {
    ReviewResponse {
        id: review.id,
        title: review.title_id,
        text: review.text,
        author: author.to_string(),
        score: review.score,
        pub_date: review.pub_date,
    }
}

async fn review_responses(
    db: &DatabaseConnection,
    reviews: Vec<Review>,
) -> Result<Vec<ReviewResponse>, ApiError> {
    let authors: Vec<Option<users::Model>> = reviews.load_one(users::Entity, db).await?;
    let mut results = Vec::with_capacity(reviews.len());
    for (review, author) in reviews.into_iter().zip(authors) {
        let author = author.ok_or_else(|| ApiError::Internal("review author missing".to_string()))?;
        results.push(review_response(review, &author.username));
    }
    Ok(results)
}

pub fn review_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_reviews)
        .service(create_review)
        .service(get_review)
        .service(update_review)
        .service(patch_review)
        .service(delete_review);
}
