use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::dto::GenreResponse;
use crate::models::genre::{ActiveModel as GenreActiveModel, Column as GenreColumn, Entity as Genres};
use crate::pagination::Pagination;
use crate::permissions;
use crate::validators::SLUG_RE;

#[derive(Debug, Deserialize, Validate)]
pub struct GenreRequest {
    #[validate(length(min = 1, max = 256, message = "Ensure this field has at most 256 characters."))]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Ensure this field has at most 50 characters."),
        regex(
            path = *SLUG_RE,
            message = "Enter a valid slug: letters, digits, underscores or hyphens."
        )
    )]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct GenreListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/genres - list, name-ordered, searchable (public)
#[get("")]
pub async fn list_genres(
    req: HttpRequest,
    query: web::Query<GenreListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let mut select = Genres::find().order_by_asc(GenreColumn::Name);
    if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(GenreColumn::Name.contains(term));
    }

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let genres = paginator.fetch_page(pg.page - 1).await?;

    let results: Vec<GenreResponse> = genres.into_iter().map(GenreResponse::from).collect();
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/genres - create (admin)
#[post("")]
pub async fn create_genre(
    auth_user: AuthUser,
    body: web::Json<GenreRequest>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    body.validate()?;

    let taken = Genres::find()
        .filter(GenreColumn::Slug.eq(&body.slug))
        .one(db.get_ref())
        .await?
        .is_some();
    if taken {
        return Err(slug_taken());
    }

    let new_genre = GenreActiveModel {
        name: Set(body.name.clone()),
        slug: Set(body.slug.clone()),
        ..Default::default()
    };
    let genre = new_genre
        .insert(db.get_ref())
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => slug_taken(),
            _ => ApiError::from(err),
        })?;

    Ok(HttpResponse::Created().json(GenreResponse::from(genre)))
}

/// DELETE /v1/genres/{slug} - remove; join rows go with it (admin)
#[delete("/{slug}")]
pub async fn delete_genre(
    auth_user: AuthUser,
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;

    let genre = Genres::find()
        .filter(GenreColumn::Slug.eq(path.as_str()))
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;
    genre.delete(db.get_ref()).await?;

    Ok(HttpResponse::NoContent().finish())
}

fn slug_taken() -> ApiError {
    ApiError::field("slug", "genre with this slug already exists.")
}

pub fn genre_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/genres")
            .service(list_genres)
            .service(create_genre)
            .service(delete_genre),
    );
}
