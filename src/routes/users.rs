use std::collections::BTreeMap;

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::models::dto::UserResponse;
use crate::models::users::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users, Model as User, Role,
};
use crate::pagination::Pagination;
use crate::permissions;
use crate::validators::{USERNAME_RE, validate_username_not_reserved};

// DTO for admin account creation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
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
    #[validate(length(max = 150, message = "Ensure this field has at most 150 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has at most 150 characters."))]
    pub last_name: Option<String>,
    #[validate(length(max = 1000, message = "Ensure this field has at most 1000 characters."))]
    pub bio: Option<String>,
    pub role: Option<String>,
}

// DTO for partial updates, shared by /users/me and the admin detail route.
// The role field is only honored for admins; /users/me drops it silently.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has at most 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username: letters, digits and @/./+/-/_ only."
        ),
        custom(function = validate_username_not_reserved)
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has at most 254 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has at most 150 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has at most 150 characters."))]
    pub last_name: Option<String>,
    #[validate(length(max = 1000, message = "Ensure this field has at most 1000 characters."))]
    pub bio: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// GET /v1/users/me - own profile (any authenticated user)
#[get("/me")]
pub async fn get_me(auth_user: AuthUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse::from(auth_user.into_inner())))
}

/// PATCH /v1/users/me - edit own profile; a submitted role is ignored
#[patch("/me")]
pub async fn patch_me(
    auth_user: AuthUser,
    body: web::Json<UpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    let updated = apply_update(auth_user.into_inner(), &body, None, db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// GET /v1/users - list accounts (admin)
#[get("")]
pub async fn list_users(
    req: HttpRequest,
    auth_user: AuthUser,
    query: web::Query<UserListQuery>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_user_admin(&auth_user)?;

    let mut select = Users::find().order_by_asc(UserColumn::Username);
    // Exact-match search, unlike the substring search on the catalog.
    if let Some(username) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(UserColumn::Username.eq(username));
    }

    let pg = Pagination::from_parts(query.page.as_deref(), query.page_size.as_deref())?;
    let paginator = select.paginate(db.get_ref(), pg.page_size);
    let count = paginator.num_items().await?;
    pg.check_page(count)?;
    let users = paginator.fetch_page(pg.page - 1).await?;

    let results: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(pg.envelope(&req, count, results)))
}

/// POST /v1/users - create an account (admin)
#[post("")]
pub async fn create_user(
    auth_user: AuthUser,
    body: web::Json<CreateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_user_admin(&auth_user)?;
    body.validate()?;

    let role = match body.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::User,
    };
    check_unique(db.get_ref(), &body.username, &body.email, None).await?;

    let new_user = UserActiveModel {
        username: Set(body.username.clone()),
        email: Set(body.email.clone()),
        first_name: Set(body.first_name.clone().unwrap_or_default()),
        last_name: Set(body.last_name.clone().unwrap_or_default()),
        bio: Set(body.bio.clone().unwrap_or_default()),
        role: Set(role),
        ..Default::default()
    };
    let user = new_user.insert(db.get_ref()).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// GET /v1/users/{username} - account detail (admin)
#[get("/{username}")]
pub async fn get_user(
    auth_user: AuthUser,
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_user_admin(&auth_user)?;
    let user = find_by_username(db.get_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PATCH /v1/users/{username} - edit an account, role included (admin)
#[patch("/{username}")]
pub async fn update_user(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_user_admin(&auth_user)?;
    let user = find_by_username(db.get_ref(), &path).await?;

    let role = match body.role.as_deref() {
        Some(raw) => Some(parse_role(raw)?),
        None => None,
    };
    let updated = apply_update(user, &body, role, db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// DELETE /v1/users/{username} - remove an account (admin)
#[delete("/{username}")]
pub async fn delete_user(
    auth_user: AuthUser,
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
) -> ApiResult<HttpResponse> {
    permissions::require_user_admin(&auth_user)?;
    let user = find_by_username(db.get_ref(), &path).await?;
    user.delete(db.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<User, ApiError> {
    Users::find()
        .filter(UserColumn::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(ApiError::not_found)
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::parse(raw)
        .ok_or_else(|| ApiError::field("role", &format!("\"{raw}\" is not a valid choice.")))
}

/// Shared partial-update path. `role` is pre-parsed by the caller because
/// only the admin route may change it.
async fn apply_update(
    user: User,
    body: &UpdateUserRequest,
    role: Option<Role>,
    db: &DatabaseConnection,
) -> Result<User, ApiError> {
    body.validate()?;
    if let (Some(username), Some(email)) = (body.username.as_deref(), body.email.as_deref()) {
        check_unique(db, username, email, Some(user.id)).await?;
    } else if let Some(username) = body.username.as_deref() {
        check_unique(db, username, "", Some(user.id)).await?;
    } else if let Some(email) = body.email.as_deref() {
        check_unique(db, "", email, Some(user.id)).await?;
    }

    let mut active: UserActiveModel = user.into();
    if let Some(username) = &body.username {
        active.username = Set(username.clone());
    }
    if let Some(email) = &body.email {
        active.email = Set(email.clone());
    }
    if let Some(first_name) = &body.first_name {
        active.first_name = Set(first_name.clone());
    }
    if let Some(last_name) = &body.last_name {
        active.last_name = Set(last_name.clone());
    }
    if let Some(bio) = &body.bio {
        active.bio = Set(bio.clone());
    }
    if let Some(role) = role {
        active.role = Set(role);
    }

    Ok(active.update(db).await?)
}

/// Field-level uniqueness errors; `exclude` skips the account being edited.
/// Empty strings mean "not submitted" and are never checked.
async fn check_unique(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    exclude: Option<i32>,
) -> Result<(), ApiError> {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if !username.is_empty() {
        let mut select = Users::find().filter(UserColumn::Username.eq(username));
        if let Some(id) = exclude {
            select = select.filter(UserColumn::Id.ne(id));
        }
        if select.one(db).await?.is_some() {
            fields.insert(
                "username".to_string(),
                vec!["A user with that username already exists.".to_string()],
            );
        }
    }
    if !email.is_empty() {
        let mut select = Users::find().filter(UserColumn::Email.eq(email));
        if let Some(id) = exclude {
            select = select.filter(UserColumn::Id.ne(id));
        }
        if select.one(db).await?.is_some() {
            fields.insert(
                "email".to_string(),
                vec!["user with this email already exists.".to_string()],
            );
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(fields))
    }
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    // `/me` is registered before `/{username}` so the literal path wins.
    cfg.service(
        web::scope("/users")
            .service(get_me)
            .service(patch_me)
            .service(list_users)
            .service(create_user)
            .service(get_user)
            .service(update_user)
            .service(delete_user),
    );
}
