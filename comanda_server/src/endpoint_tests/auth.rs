use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use comanda_engine::{AuthApi, MessageQuotaApi, SqliteDatabase};
use serde_json::json;

use super::helpers::{api_key, bearer, call_api, json, session_token, sessions, setup, TZ};
use crate::{
    auth::SESSION_COOKIE,
    config::ServerOptions,
    routes::{health, logout, LoginRoute, MeRoute, MessageUsageRoute},
};

#[actix_web::test]
async fn health_endpoint() {
    let app = test::init_service(App::new().service(health)).await;
    let req = TestRequest::get().uri("/health").to_request();
    let (_req, res) = test::call_service(&app, req).await.into_parts();
    assert!(res.status().is_success());
    assert_eq!(res.into_body().try_into_bytes().unwrap(), "👍️\n");
}

/// Posts to `/auth/login` and returns the status, the session cookie (if any) and the body.
async fn login(db: &SqliteDatabase, body: serde_json::Value) -> (StatusCode, Option<Cookie<'static>>, String) {
    let app = App::new()
        .app_data(web::Data::new(AuthApi::new(db.clone())))
        .app_data(web::Data::new(sessions()))
        .app_data(web::Data::new(ServerOptions::default()))
        .service(LoginRoute::<SqliteDatabase>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/auth/login").set_json(body).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let cookie = res.response().cookies().find(|c| c.name() == SESSION_COOKIE).map(|c| c.into_owned());
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, cookie, body)
}

#[actix_web::test]
async fn login_with_password() {
    let fx = setup().await;
    let (status, cookie, body) = login(&fx.db, json!({"username": "ze", "password": "pizza123"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cookie = cookie.expect("No session cookie");
    assert_eq!(cookie.http_only(), Some(true));
    let result = json(&body);
    assert_eq!(result["token"], cookie.value());
    assert_eq!(result["user"]["id"], fx.operator.id.as_str());
    assert!(result["user"].get("password_hash").is_none());
    let claims = sessions().verify_token(cookie.value()).unwrap();
    assert_eq!(claims.user_id, fx.operator.id);
    assert_eq!(claims.tenant_id, Some(fx.tenant.id.clone()));
}

#[actix_web::test]
async fn login_with_wrong_password() {
    let fx = setup().await;
    let (status, cookie, body) = login(&fx.db, json!({"username": "ze", "password": "pizza124"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body, r#"{"error":"Authentication Error. Invalid username or password."}"#);
}

#[actix_web::test]
async fn login_to_the_wrong_store() {
    let fx = setup().await;
    let body = json!({"username": "ze", "password": "pizza123", "tenant": fx.other.slug});
    let (status, _, _) = login(&fx.db, body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_clears_the_cookie() {
    let app = test::init_service(App::new().service(logout)).await;
    let req = TestRequest::post().uri("/auth/logout").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.response().cookies().find(|c| c.name() == SESSION_COOKIE).expect("No removal cookie");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
}

fn configure_me(cfg: &mut ServiceConfig) {
    cfg.service(MeRoute::new());
}

#[actix_web::test]
async fn session_cookie_identifies_the_operator() {
    let fx = setup().await;
    let req = TestRequest::get().uri("/api/me").cookie(Cookie::new(SESSION_COOKIE, session_token(&fx.operator)));
    let (status, body) = call_api(&fx.db, req, configure_me).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let principal = json(&body);
    assert_eq!(principal["tenant"], fx.tenant.id.as_str());
    assert_eq!(principal["user"], fx.operator.id.as_str());
    assert_eq!(principal["method"], "session");
}

#[actix_web::test]
async fn basic_credentials_identify_the_operator() {
    let fx = setup().await;
    let value = format!("Basic {}", base64::encode("ze:pizza123"));
    let req = TestRequest::get().uri("/api/me").insert_header(("Authorization", value));
    let (status, body) = call_api(&fx.db, req, configure_me).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["method"], "basic");

    let value = format!("Basic {}", base64::encode("ze:wrong"));
    let req = TestRequest::get().uri("/api/me").insert_header(("Authorization", value));
    let (status, _) = call_api(&fx.db, req, configure_me).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tampered_session_is_unauthenticated() {
    let fx = setup().await;
    let mut token = session_token(&fx.operator);
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let req = TestRequest::get().uri("/api/me").insert_header(("Authorization", format!("Bearer {token}")));
    let (status, _) = call_api(&fx.db, req, configure_me).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn super_admin_has_no_tenant() {
    let fx = setup().await;
    let req = TestRequest::get().uri("/api/me").insert_header(bearer(&fx.admin));
    let (status, body) = call_api(&fx.db, req, configure_me).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(json(&body)["tenant"].is_null());
}

fn configure_usage(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(MessageQuotaApi::new(db, TZ))).service(MessageUsageRoute::<SqliteDatabase>::new());
    }
}

#[actix_web::test]
async fn message_usage_of_a_store() {
    let fx = setup().await;
    let req = TestRequest::get().uri("/api/message-usage").insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure_usage(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let usage = json(&body);
    assert_eq!(usage["tenant_id"], fx.tenant.id.as_str());
    assert_eq!(usage["allowed"], true);
    assert_eq!(usage["current"], 0);
    assert_eq!(usage["limit"], 500);
    assert_eq!(usage["plan"], "basic");
}

#[actix_web::test]
async fn message_usage_of_all_stores() {
    let fx = setup().await;
    let req = TestRequest::get().uri("/api/message-usage").insert_header(bearer(&fx.admin));
    let (status, body) = call_api(&fx.db, req, configure_usage(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let usage = json(&body);
    let limits = usage.as_array().unwrap().iter().map(|u| u["limit"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(limits.len(), 2);
    assert!(limits.contains(&500) && limits.contains(&2000));
}
