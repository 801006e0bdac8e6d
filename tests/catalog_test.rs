mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{Value, json};

use critica::models::users::Role;
use critica::models::{review, title_genre};

#[actix_web::test]
async fn anonymous_can_list_categories_name_ordered() {
    let ctx = common::setup().await;
    common::create_category(&ctx.db, "Films", "films").await;
    common::create_category(&ctx.db, "Books", "books").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/v1/categories").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 2);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    assert_eq!(body["results"][0]["slug"], "books");
    assert_eq!(body["results"][1]["slug"], "films");

    // Trailing slashes are trimmed away.
    let req = test::TestRequest::get().uri("/v1/categories/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn category_search_matches_name_substring() {
    let ctx = common::setup().await;
    common::create_category(&ctx.db, "Films", "films").await;
    common::create_category(&ctx.db, "Books", "books").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/v1/categories?search=ilm")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["slug"], "films");
}

#[actix_web::test]
async fn category_writes_are_admin_only() {
    let ctx = common::setup().await;
    let user = common::create_user(&ctx.db, "plain", Role::User).await;
    let moderator = common::create_user(&ctx.db, "mod", Role::Moderator).await;
    let user_token = common::token_for(&user, &ctx.config);
    let moderator_token = common::token_for(&moderator, &ctx.config);
    let app = test_app!(ctx);

    let payload = json!({"name": "Films", "slug": "films"});

    let req = test::TestRequest::post()
        .uri("/v1/categories")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    for token in [&user_token, &moderator_token] {
        let req = test::TestRequest::post()
            .uri("/v1/categories")
            .insert_header(common::bearer(token))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["detail"],
            "You do not have permission to perform this action."
        );
    }
}

#[actix_web::test]
async fn admin_creates_and_deletes_category() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/v1/categories")
        .insert_header(common::bearer(&token))
        .set_json(json!({"name": "Films", "slug": "films"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"name": "Films", "slug": "films"}));

    // Duplicate slug is a field error.
    let req = test::TestRequest::post()
        .uri("/v1/categories")
        .insert_header(common::bearer(&token))
        .set_json(json!({"name": "Movies", "slug": "films"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("slug").is_some());

    let req = test::TestRequest::delete()
        .uri("/v1/categories/films")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    // Gone now.
    let req = test::TestRequest::delete()
        .uri("/v1/categories/films")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn genre_create_list_and_delete() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/v1/genres")
        .insert_header(common::bearer(&token))
        .set_json(json!({"name": "Drama", "slug": "drama"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Bad slug characters are rejected.
    let req = test::TestRequest::post()
        .uri("/v1/genres")
        .insert_header(common::bearer(&token))
        .set_json(json!({"name": "Bad", "slug": "no spaces"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/v1/genres?search=ram")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0], json!({"name": "Drama", "slug": "drama"}));

    let req = test::TestRequest::delete()
        .uri("/v1/genres/drama")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );
}

#[actix_web::test]
async fn admin_creates_title_from_slug_references() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    common::create_category(&ctx.db, "Films", "films").await;
    common::create_genre(&ctx.db, "Drama", "drama").await;
    common::create_genre(&ctx.db, "Sci-Fi", "sci-fi").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/v1/titles")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "name": "Solaris",
            "year": 1972,
            "description": "A station above an ocean planet.",
            "genre": ["drama", "sci-fi"],
            "category": "films"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Solaris");
    assert_eq!(body["year"], 1972);
    assert_eq!(body["category"], "films");
    assert_eq!(body["genre"], json!(["drama", "sci-fi"]));
    // Write shape carries no rating.
    assert!(body.get("rating").is_none());
}

#[actix_web::test]
async fn title_create_rejects_unknown_slug_and_future_year() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    common::create_category(&ctx.db, "Films", "films").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/v1/titles")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "name": "Ghost", "year": 1990, "genre": ["nope"], "category": "films"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["genre"][0].as_str().unwrap().contains("does not exist"));

    let req = test::TestRequest::post()
        .uri("/v1/titles")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "name": "From the future", "year": 2999, "genre": [], "category": "films"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("year").is_some());
}

#[actix_web::test]
async fn title_detail_nests_objects_and_averages_scores() {
    let ctx = common::setup().await;
    let category = common::create_category(&ctx.db, "Films", "films").await;
    let genre = common::create_genre(&ctx.db, "Drama", "drama").await;
    let title = common::create_title(&ctx.db, "Solaris", 1972, Some(category.id)).await;
    common::link_genre(&ctx.db, title.id, genre.id).await;

    let alice = common::create_user(&ctx.db, "alice", Role::User).await;
    let bob = common::create_user(&ctx.db, "bob", Role::User).await;
    common::create_review(&ctx.db, title.id, alice.id, 4).await;
    common::create_review(&ctx.db, title.id, bob.id, 5).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/v1/titles/{}", title.id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rating"], json!(4.5));
    assert_eq!(body["category"], json!({"name": "Films", "slug": "films"}));
    assert_eq!(body["genre"], json!([{"name": "Drama", "slug": "drama"}]));
}

#[actix_web::test]
async fn title_without_reviews_has_null_rating() {
    let ctx = common::setup().await;
    let title = common::create_title(&ctx.db, "Quiet", 2001, None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/v1/titles/{}", title.id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["rating"].is_null());
    assert!(body["category"].is_null());
}

#[actix_web::test]
async fn title_list_supports_all_filters() {
    let ctx = common::setup().await;
    let films = common::create_category(&ctx.db, "Films", "films").await;
    let books = common::create_category(&ctx.db, "Books", "books").await;
    let drama = common::create_genre(&ctx.db, "Drama", "drama").await;
    let solaris = common::create_title(&ctx.db, "Solaris", 1972, Some(films.id)).await;
    common::create_title(&ctx.db, "Roadside Picnic", 1972, Some(books.id)).await;
    common::create_title(&ctx.db, "Stalker", 1979, Some(films.id)).await;
    common::link_genre(&ctx.db, solaris.id, drama.id).await;
    let app = test_app!(ctx);

    let cases = [
        ("/v1/titles?category=books", vec!["Roadside Picnic"]),
        ("/v1/titles?genre=drama", vec!["Solaris"]),
        ("/v1/titles?name=lar", vec!["Solaris"]),
        ("/v1/titles?year=1979", vec!["Stalker"]),
        ("/v1/titles?category=films&year=1972", vec!["Solaris"]),
        ("/v1/titles?category=unknown", vec![]),
    ];

    for (uri, expected) in cases {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        let names: Vec<&str> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, expected, "{uri}");
    }
}

#[actix_web::test]
async fn title_list_paginates_with_envelope_links() {
    let ctx = common::setup().await;
    for i in 0..15 {
        common::create_title(&ctx.db, &format!("Title {i:02}"), 2000, None).await;
    }
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/v1/titles").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 15);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert!(body["next"].as_str().unwrap().contains("page=2"));
    assert!(body["previous"].is_null());

    let req = test::TestRequest::get().uri("/v1/titles?page=2").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert!(body["next"].is_null());
    assert!(body["previous"].as_str().is_some());
    assert_eq!(body["results"][0]["name"], "Title 10");

    // Past the end and junk pages both answer 404.
    for uri in ["/v1/titles?page=3", "/v1/titles?page=zero"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Invalid page.");
    }

    // page_size is honored and capped.
    let req = test::TestRequest::get()
        .uri("/v1/titles?page_size=3")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn title_updates_are_admin_only_and_replace_genres() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let plain = common::create_user(&ctx.db, "plain", Role::User).await;
    let admin_token = common::token_for(&admin, &ctx.config);
    let plain_token = common::token_for(&plain, &ctx.config);

    let films = common::create_category(&ctx.db, "Films", "films").await;
    let drama = common::create_genre(&ctx.db, "Drama", "drama").await;
    common::create_genre(&ctx.db, "Horror", "horror").await;
    let title = common::create_title(&ctx.db, "Solaris", 1972, Some(films.id)).await;
    common::link_genre(&ctx.db, title.id, drama.id).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::patch()
        .uri(&format!("/v1/titles/{}", title.id))
        .insert_header(common::bearer(&plain_token))
        .set_json(json!({"name": "Hijacked"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/v1/titles/{}", title.id))
        .insert_header(common::bearer(&admin_token))
        .set_json(json!({"genre": ["horror"], "description": "re-shelved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["genre"], json!(["horror"]));
    assert_eq!(body["description"], "re-shelved");
    // Untouched fields stay.
    assert_eq!(body["name"], "Solaris");
    assert_eq!(body["category"], "films");

    assert_eq!(title_genre::Entity::find().count(&ctx.db).await.unwrap(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/titles/{}", title.id))
        .insert_header(common::bearer(&admin_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(title_genre::Entity::find().count(&ctx.db).await.unwrap(), 0);
}

#[actix_web::test]
async fn deleting_category_leaves_titles_uncategorized() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    let films = common::create_category(&ctx.db, "Films", "films").await;
    let title = common::create_title(&ctx.db, "Solaris", 1972, Some(films.id)).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::delete()
        .uri("/v1/categories/films")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get()
        .uri(&format!("/v1/titles/{}", title.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["category"].is_null());
}

#[actix_web::test]
async fn deleting_title_cascades_reviews() {
    let ctx = common::setup().await;
    let admin = common::create_user(&ctx.db, "boss", Role::Admin).await;
    let token = common::token_for(&admin, &ctx.config);
    let title = common::create_title(&ctx.db, "Solaris", 1972, None).await;
    common::create_review(&ctx.db, title.id, admin.id, 8).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/titles/{}", title.id))
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    assert_eq!(review::Entity::find().count(&ctx.db).await.unwrap(), 0);
}
