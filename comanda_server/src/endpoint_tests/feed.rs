use std::{future::poll_fn, pin::pin};

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use comanda_engine::{LiveFeedApi, SqliteDatabase, TenantResolver, DEFAULT_FEED_MAX_ORDERS};

use super::helpers::{api_key, auth_config, bearer, create_order, setup, TZ};
use crate::{
    auth::SessionIssuer,
    config::ServerOptions,
    middleware::CredentialsMiddlewareFactory,
    routes::OrderStreamRoute,
};

/// Opens the live feed and returns the status, the content type and the first frame.
async fn first_frame(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String, String) {
    let config = auth_config();
    let sessions = SessionIssuer::new(&config);
    let resolver = web::Data::new(TenantResolver::new(db.clone(), config.internal_secret.clone()));
    let app = App::new()
        .app_data(resolver.clone())
        .app_data(web::Data::new(LiveFeedApi::new(db.clone(), TZ, DEFAULT_FEED_MAX_ORDERS)))
        .app_data(web::Data::new(ServerOptions::default()))
        .service(
            web::scope("/api")
                .wrap(CredentialsMiddlewareFactory::new(resolver, sessions))
                .service(OrderStreamRoute::<SqliteDatabase>::new()),
        );
    let service = test::init_service(app).await;
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res,
        Err(e) => return (e.error_response().status(), String::new(), String::new()),
    };
    let status = res.status();
    let content_type =
        res.headers().get("content-type").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    let mut body = pin!(res.into_body());
    let frame = poll_fn(|cx| body.as_mut().poll_next(cx)).await.expect("Feed ended").expect("Feed failed");
    (status, content_type, String::from_utf8_lossy(&frame).into_owned())
}

#[actix_web::test]
async fn feed_sends_a_snapshot_on_connect() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    create_order(&fx.db, &fx.other.id).await;
    let req = TestRequest::get().uri("/api/orders/stream").insert_header(bearer(&fx.operator));
    let (status, content_type, frame) = first_frame(&fx.db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/event-stream");
    assert!(frame.starts_with("data: {\"type\":\"initial\""), "was: {frame}");
    assert!(frame.ends_with("\n\n"));
    let event: serde_json::Value = serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
    let orders = event["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order.id.as_str());
}

#[actix_web::test]
async fn feed_accepts_api_key_in_query() {
    let fx = setup().await;
    let uri = format!("/api/orders/stream?api_key={}", fx.tenant.api_key);
    let (status, _, frame) = first_frame(&fx.db, TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(frame.contains("\"orders\":[]"), "was: {frame}");
    let req = TestRequest::get().uri("/api/orders/stream").insert_header(api_key(&fx.other));
    let (status, _, _) = first_frame(&fx.db, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn super_admin_watches_a_single_store() {
    let fx = setup().await;
    create_order(&fx.db, &fx.tenant.id).await;
    create_order(&fx.db, &fx.other.id).await;
    let req = TestRequest::get().uri("/api/orders/stream").insert_header(bearer(&fx.admin));
    let (status, _, frame) = first_frame(&fx.db, req).await;
    assert_eq!(status, StatusCode::OK);
    let event: serde_json::Value = serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
    assert_eq!(event["orders"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn feed_without_credentials() {
    let fx = setup().await;
    let (status, _, _) = first_frame(&fx.db, TestRequest::get().uri("/api/orders/stream")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
