mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::Value;

#[actix_web::test]
async fn health_answers_with_status_and_time() {
    let ctx = common::setup().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["time"].as_str().is_some());
    assert_eq!(body.as_object().unwrap().len(), 2);
}
