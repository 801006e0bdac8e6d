use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::comment::{
    ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comments,
    Model as Comment,
};
use crate::models::dto::CommentResponse;
use crate::models::users;
use crate::pagination::Pagination;
use crate::permissions;

use super::reviews::find_review;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentPatchPayload {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/titles/{title_id}/reviews/{review_id}/comments - oldest first
/// (public)
#[get("/{title_id}/reviews/{review_id}/comments")]
pub async fn list_comments(
    req: HttpRequest,
    path: web::Path<(i32, i32)>,
    query: web::Query<CommentListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;

    let select = Comments::find()
        .filter(CommentColumn::ReviewId.eq(review.id))
        .order_by_asc(CommentColumn::PubDate)
        .order_by_asc(CommentColumn::Id);

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let comments = paginator.fetch_page(pg.page - 1).await?;

    let results = comment_responses(db.get_ref(), comments).await?;
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/titles/{title_id}/reviews/{review_id}/comments (authenticated,
/// no one-per-author limit here)
#[post("/{title_id}/reviews/{review_id}/comments")]
pub async fn create_comment(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    body: web::Json<CommentPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let review = find_review(db.get_ref(), title_id, review_id).await?;
    body.validate()?;

    let new_comment = CommentActiveModel {
        review_id: Set(review.id),
        author_id: Set(auth_user.id),
        text: Set(body.text.clone()),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let comment = new_comment.insert(db.get_ref()).await?;

    Ok(HttpResponse::Created().json(comment_response(comment, &auth_user.username)))
}

/// GET /v1/titles/{title_id}/reviews/{review_id}/comments/{id} (public)
#[get("/{title_id}/reviews/{review_id}/comments/{id}")]
pub async fn get_comment(
    path: web::Path<(i32, i32, i32)>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = find_comment(db.get_ref(), title_id, review_id, comment_id).await?;
    let author = find_author(db.get_ref(), &comment).await?;
    Ok(HttpResponse::Ok().json(comment_response(comment, &author)))
}

/// PUT /v1/titles/{title_id}/reviews/{review_id}/comments/{id} (author,
/// moderator or admin)
#[put("/{title_id}/reviews/{review_id}/comments/{id}")]
pub async fn update_comment(
    auth_user: AuthUser,
    path: web::Path<(i32, i32, i32)>,
    body: web::Json<CommentPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = find_comment(db.get_ref(), title_id, review_id, comment_id).await?;
    permissions::require_content_editor(&auth_user, comment.author_id)?;
    body.validate()?;

    let mut active: CommentActiveModel = comment.into();
    active.text = Set(body.text.clone());
    let comment = active.update(db.get_ref()).await?;

    let author = find_author(db.get_ref(), &comment).await?;
    Ok(HttpResponse::Ok().json(comment_response(comment, &author)))
}

/// PATCH /v1/titles/{title_id}/reviews/{review_id}/comments/{id} (author,
/// moderator or admin)
#[patch("/{title_id}/reviews/{review_id}/comments/{id}")]
pub async fn patch_comment(
    auth_user: AuthUser,
    path: web::Path<(i32, i32, i32)>,
    body: web::Json<CommentPatchPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = find_comment(db.get_ref(), title_id, review_id, comment_id).await?;
    permissions::require_content_editor(&auth_user, comment.author_id)?;
    body.validate()?;

    let mut active: CommentActiveModel = comment.into();
    if let Some(text) = &body.text {
        active.text = Set(text.clone());
    }
    let comment = active.update(db.get_ref()).await?;

    let author = find_author(db.get_ref(), &comment).await?;
    Ok(HttpResponse::Ok().json(comment_response(comment, &author)))
}

/// DELETE /v1/titles/{title_id}/reviews/{review_id}/comments/{id} (author,
/// moderator or admin)
#[delete("/{title_id}/reviews/{review_id}/comments/{id}")]
pub async fn delete_comment(
    auth_user: AuthUser,
    path: web::Path<(i32, i32, i32)>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = find_comment(db.get_ref(), title_id, review_id, comment_id).await?;
    permissions::require_content_editor(&auth_user, comment.author_id)?;
    comment.delete(db.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Walks the whole path: the review must belong to the title and the
/// comment to the review, otherwise the comment does not exist here.
async fn find_comment(
    db: &DatabaseConnection,
    title_id: i32,
    review_id: i32,
    comment_id: i32,
) -> Result<Comment, ApiError> {
    let review = find_review(db, title_id, review_id).await?;
    Comments::find()
        .filter(CommentColumn::Id.eq(comment_id))
        .filter(CommentColumn::ReviewId.eq(review.id))
        .one(db)
        .await?
        .ok_or_else(ApiError::not_found)
}

async fn find_author(db: &DatabaseConnection, comment: &Comment) -> Result<String, ApiError> {
    users::Entity::find_by_id(comment.author_id)
        .one(db)
        .await?
        .map(|user| user.username)
        .ok_or_else(|| ApiError::Internal("comment author missing".to_string()))
}

fn comment_response(comment: Comment, author: &str) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        review: comment.review_id,
        text: comment.text,
        author: author.to_string(),
        pub_date: comment.pub_date,
    }
}

async fn comment_responses(
    db: &DatabaseConnection,
    comments: Vec<Comment>,
) -> Result<Vec<CommentResponse>, ApiError> {
    let authors: Vec<Option<users::Model>> = comments.load_one(users::Entity, db).await?;
    let mut results = Vec::with_capacity(comments.len());
    for (comment, author) in comments.into_iter().zip(authors) {
        let author =
            author.ok_or_else(|| ApiError::Internal("comment author missing".to_string()))?;
        results.push(comment_response(comment, &author.username));
    }
    Ok(results)
}

pub fn comment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_comments)
        .service(create_comment)
        .service(get_comment)
        .service(update_comment)
        .service(patch_comment)
        .service(delete_comment);
}
