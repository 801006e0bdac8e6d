use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    JoinType, LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::dto::{CategoryResponse, GenreResponse, TitleReadResponse, TitleWriteResponse};
use crate::models::review::{Column as ReviewColumn, Entity as Reviews};
use crate::models::title::{
    ActiveModel as TitleActiveModel, Column as TitleColumn, Entity as Titles, Model as Title,
};
use crate::models::{category, genre, title, title_genre};
use crate::pagination::Pagination;
use crate::permissions;
use crate::validators;

// DTO for create and full replace: genre/category arrive as slugs
#[derive(Debug, Deserialize, Validate)]
pub struct TitlePayload {
    #[validate(length(min = 1, max = 256, message = "Ensure this field has at most 256 characters."))]
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub genre: Vec<String>,
    pub category: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TitlePatchPayload {
    #[validate(length(min = 1, max = 256, message = "Ensure this field has at most 256 characters."))]
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TitleListQuery {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/titles - filterable list with nested category/genre and the
/// review-score average (public)
#[get("")]
pub async fn list_titles(
    req: HttpRequest,
    query: web::Query<TitleListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let mut select = Titles::find()
        .order_by_asc(TitleColumn::Name)
        .order_by_asc(TitleColumn::Id);

    // Unknown slugs simply match nothing, they are not an error.
    if let Some(slug) = query.category.as_deref().filter(|s| !s.is_empty()) {
        select = select
            .join(JoinType::InnerJoin, title::Relation::Category.def())
            .filter(category::Column::Slug.eq(slug));
    }
    if let Some(slug) = query.genre.as_deref().filter(|s| !s.is_empty()) {
        select = select
            .join(JoinType::InnerJoin, title::Relation::TitleGenres.def())
            .join(JoinType::InnerJoin, title_genre::Relation::Genre.def())
            .filter(genre::Column::Slug.eq(slug));
    }
    if let Some(term) = query.name.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(TitleColumn::Name.contains(term));
    }
    if let Some(year) = query.year {
        select = select.filter(TitleColumn::Year.eq(year));
    }

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let titles = paginator.fetch_page(pg.page - 1).await?;

    let results = read_responses(db.get_ref(), titles).await?;
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/titles - create from slug references (admin)
#[post("")]
pub async fn create_title(
    auth_user: AuthUser,
    body: web::Json<TitlePayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    body.validate()?;
    validators::check_year(body.year)?;

    let category = resolve_category(db.get_ref(), &body.category).await?;
    let genres = resolve_genres(db.get_ref(), &body.genre).await?;

    let new_title = TitleActiveModel {
        name: Set(body.name.clone()),
        year: Set(body.year),
        description: Set(body.description.clone()),
        category_id: Set(Some(category.id)),
        ..Default::default()
    };
    let title = new_title.insert(db.get_ref()).await?;
    set_genres(db.get_ref(), title.id, &genres).await?;

    let response = write_response(db.get_ref(), title).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /v1/titles/{id} (public)
#[get("/{id}")]
pub async fn get_title(
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let title = Titles::find_by_id(*path)
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;

    let mut responses = read_responses(db.get_ref(), vec![title]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| ApiError::Internal("title response vanished".to_string()))?;
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /v1/titles/{id} - full replace (admin)
#[put("/{id}")]
pub async fn update_title(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TitlePayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    let title = Titles::find_by_id(*path)
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;

    body.validate()?;
    validators::check_year(body.year)?;
    let category = resolve_category(db.get_ref(), &body.category).await?;
    let genres = resolve_genres(db.get_ref(), &body.genre).await?;

    let mut active: TitleActiveModel = title.into();
    active.name = Set(body.name.clone());
    active.year = Set(body.year);
    active.description = Set(body.description.clone());
    active.category_id = Set(Some(category.id));
    let title = active.update(db.get_ref()).await?;
    set_genres(db.get_ref(), title.id, &genres).await?;

    let response = write_response(db.get_ref(), title).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// PATCH /v1/titles/{id} - partial update (admin)
#[patch("/{id}")]
pub async fn patch_title(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TitlePatchPayload>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    let title = Titles::find_by_id(*path)
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;

    body.validate()?;
    if let Some(year) = body.year {
        validators::check_year(year)?;
    }
    let category = match body.category.as_deref() {
        Some(slug) => Some(resolve_category(db.get_ref(), slug).await?),
        None => None,
    };
    let genres = match &body.genre {
        Some(slugs) => Some(resolve_genres(db.get_ref(), slugs).await?),
        None => None,
    };

    let mut active: TitleActiveModel = title.into();
    if let Some(name) = &body.name {
        active.name = Set(name.clone());
    }
    if let Some(year) = body.year {
        active.year = Set(year);
    }
    if let Some(description) = &body.description {
        active.description = Set(Some(description.clone()));
    }
    if let Some(category) = &category {
        active.category_id = Set(Some(category.id));
    }
    let title = active.update(db.get_ref()).await?;
    if let Some(genres) = &genres {
        set_genres(db.get_ref(), title.id, genres).await?;
    }

    let response = write_response(db.get_ref(), title).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /v1/titles/{id} - reviews and their comments cascade away (admin)
#[delete("/{id}")]
pub async fn delete_title(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_catalog_admin(&auth_user)?;
    let title = Titles::find_by_id(*path)
        .one(db.get_ref())
        .await?
        .ok_or_else(ApiError::not_found)?;
    title.delete(db.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, FromQueryResult)]
struct RatingRow {
    title_id: i32,
    total: i64,
    n: i64,
}

/// Average review score per title, one grouped query for a whole page.
/// Computed from sum and count so the division stays in f64 land on
/// every backend. Titles without reviews are simply absent.
async fn ratings_for(db: &DatabaseConnection, title_ids: &[i32]) -> Result<HashMap<i32, f64>, DbErr> {
    if title_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Reviews::find()
        .select_only()
        .column(ReviewColumn::TitleId)
        .column_as(
            SimpleExpr::from(Func::sum(Expr::col(ReviewColumn::Score))),
            "total",
        )
        .column_as(
            SimpleExpr::from(Func::count(Expr::col(ReviewColumn::Id))),
            "n",
        )
        .filter(ReviewColumn::TitleId.is_in(title_ids.to_vec()))
        .group_by(ReviewColumn::TitleId)
        .into_model::<RatingRow>()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.title_id, row.total as f64 / row.n as f64))
        .collect())
}

/// Read serialization for a batch of titles: categories and genres are
/// loaded in bulk, ratings in one grouped query.
async fn read_responses(
    db: &DatabaseConnection,
    titles: Vec<Title>,
) -> Result<Vec<TitleReadResponse>, ApiError> {
    let categories: Vec<Option<category::Model>> = titles.load_one(category::Entity, db).await?;
    let genres: Vec<Vec<genre::Model>> = titles
        .load_many_to_many(genre::Entity, title_genre::Entity, db)
        .await?;
    let ids: Vec<i32> = titles.iter().map(|t| t.id).collect();
    let ratings = ratings_for(db, &ids).await?;

    Ok(titles
        .into_iter()
        .zip(categories)
        .zip(genres)
        .map(|((title, category), mut title_genres)| {
            title_genres.sort_by(|a, b| a.name.cmp(&b.name));
            TitleReadResponse {
                id: title.id,
                name: title.name,
                year: title.year,
                rating: ratings.get(&title.id).copied(),
                description: title.description,
                genre: title_genres.into_iter().map(GenreResponse::from).collect(),
                category: category.map(CategoryResponse::from),
            }
        })
        .collect())
}

/// Write serialization echoes slugs, read from the database so create,
/// replace and patch all answer the same shape.
async fn write_response(db: &DatabaseConnection, title: Title) -> Result<TitleWriteResponse, ApiError> {
    let category = match title.category_id {
        Some(id) => category::Entity::find_by_id(id).one(db).await?,
        None => None,
    };
    let mut genres = title.find_related(genre::Entity).all(db).await?;
    genres.sort_by(|a, b| a.slug.cmp(&b.slug));

    Ok(TitleWriteResponse {
        id: title.id,
        name: title.name,
        year: title.year,
        description: title.description,
        genre: genres.into_iter().map(|g| g.slug).collect(),
        category: category.map(|c| c.slug),
    })
}

async fn resolve_category(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<category::Model, ApiError> {
    category::Entity::find()
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| {
            ApiError::field("category", &format!("Object with slug={slug} does not exist."))
        })
}

/// Resolves genre slugs in payload order, deduplicated. Any unknown slug
/// fails the whole request with a field error.
async fn resolve_genres(
    db: &DatabaseConnection,
    slugs: &[String],
) -> Result<Vec<genre::Model>, ApiError> {
    let mut genres: Vec<genre::Model> = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if genres.iter().any(|g| &g.slug == slug) {
            continue;
        }
        let genre = genre::Entity::find()
            .filter(genre::Column::Slug.eq(slug))
            .one(db)
            .await?
            .ok_or_else(|| {
                ApiError::field("genre", &format!("Object with slug={slug} does not exist."))
            })?;
        genres.push(genre);
    }
    Ok(genres)
}

/// Replaces the genre set of a title.
async fn set_genres(
    db: &DatabaseConnection,
    title_id: i32,
    genres: &[genre::Model],
) -> Result<(), ApiError> {
    title_genre::Entity::delete_many()
        .filter(title_genre::Column::TitleId.eq(title_id))
        .exec(db)
        .await?;
    if !genres.is_empty() {
        let rows: Vec<title_genre::ActiveModel> = genres
            .iter()
            .map(|genre| title_genre::ActiveModel {
                title_id: Set(title_id),
                genre_id: Set(genre.id),
            })
            .collect();
        title_genre::Entity::insert_many(rows).exec(db).await?;
    }
    Ok(())
}

pub fn title_routes(cfg: &mut web::ServiceConfig) {
    // Reviews and comments live under /titles/{title_id}/..., so their
    // handlers are registered inside the same scope.
    cfg.service(
        web::scope("/titles")
            .service(list_titles)
            .service(create_title)
            .service(get_title)
            .service(update_title)
            .service(patch_title)
            .service(delete_title)
            .configure(super::reviews::review_routes)
            .configure(super::comments::comment_routes),
    );
}
