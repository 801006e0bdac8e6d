use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::category::{
    ActiveModel as CategoryActiveModel, Column as CategoryColumn, Entity as Categories,
};
use crate::models::dto::CategoryResponse;
use crate::pagination::Pagination;
use crate::permissions;
use crate::validators::SLUG_RE;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
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
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/categories - list, name-ordered, searchable (public)
#[get("")]
pub async fn list_categories(
    req: HttpRequest,
    query: web::Query<CategoryListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let mut select = Categories::find().order_by_asc(CategoryColumn::Name);
    if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(CategoryColumn::Name.contains(term));
    }

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let categories = paginator.fetch_page(pg.page - 1).await?;

    let results: Vec<CategoryResponse> =
        categories.into_iter().map(CategoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/categories - create (admin)
#[post("")]
pub async fn create_category(
    auth_user: AuthUser,
    body: web::Json<CategoryRequest>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    body.validate()?;

    let taken = Categories::find()
        .filter(CategoryColumn::Slug.eq(&body.slug))
        .one(db.get_ref())
        .await?
        .is_some();
    if taken {
        return Err(slug_taken());
    }

    let new_category = CategoryActiveModel {
        name: Set(body.name.clone()),
        slug: Set(body.slug.clone()),
        ..Default::default()
    };
    let category = new_category
        .insert(db.get_ref())
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => slug_taken(),
            _ => ApiError::from(err),
        })?;

    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

/// DELETE /v1/categories/{slug} - remove; titles keep living with a null
/// category (admin)
#[delete("/{slug}")]
pub async fn delete_category(
    auth_user: AuthUser,
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;

    let category = Categories::find()
        .filter(CategoryColumn::Slug.eq(path.as_str()))
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;
    category.delete(db.get_ref()).await?;

    Ok(HttpResponse::NoContent().finish())
}

fn slug_taken() -> ApiError {
    ApiError::field("slug", "category with this slug already exists.")
}

pub fn category_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(list_categories)
            .service(create_category)
            .service(delete_category),
    );
}
