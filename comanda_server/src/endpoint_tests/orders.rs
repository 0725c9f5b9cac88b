use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use comanda_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    OrderFlowApi,
    SqliteDatabase,
};
use serde_json::json;

use super::{
    helpers::{api_key, bearer, call_api, create_order, json, setup, signed_tenant_headers, TZ},
    mocks::MockOrderStore,
};
use crate::routes::{
    CreateOrderRoute,
    MarkOutForDeliveryRoute,
    MarkPrintedRoute,
    OrderByIdRoute,
    ReprintRoute,
    RequestPrintRoute,
    UpdateItemsRoute,
    UpdateStatusRoute,
};

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default(), TZ)))
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateItemsRoute::<SqliteDatabase>::new())
            .service(RequestPrintRoute::<SqliteDatabase>::new())
            .service(MarkPrintedRoute::<SqliteDatabase>::new())
            .service(ReprintRoute::<SqliteDatabase>::new())
            .service(UpdateStatusRoute::<SqliteDatabase>::new())
            .service(MarkOutForDeliveryRoute::<SqliteDatabase>::new());
    }
}

fn new_order_body() -> serde_json::Value {
    json!({
        "customer_name": "Carlos Lima",
        "customer_phone": "11 91234-5678",
        "items": [{"name": "Pizza Portuguesa", "quantity": 2, "unit_price": 3_900}],
        "fulfillment": "delivery",
        "address": "Av. Paulista, 1000",
    })
}

#[actix_web::test]
async fn create_order_without_credentials() {
    let fx = setup().await;
    let req = TestRequest::post().uri("/api/orders").set_json(new_order_body());
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No valid credentials were provided."}"#);
}

#[actix_web::test]
async fn create_order_with_api_key() {
    let fx = setup().await;
    let req = TestRequest::post().uri("/api/orders").insert_header(api_key(&fx.tenant)).set_json(new_order_body());
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = json(&body);
    assert_eq!(order["tenant_id"], fx.tenant.id.as_str());
    assert_eq!(order["display_id"], 1);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_price"], 7_800);

    // Display ids count up within the business day
    let req = TestRequest::post().uri("/api/orders").insert_header(api_key(&fx.tenant)).set_json(new_order_body());
    let (_, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(json(&body)["display_id"], 2);
}

#[actix_web::test]
async fn create_order_with_api_key_in_query() {
    let fx = setup().await;
    let uri = format!("/api/orders?api_key={}", fx.tenant.api_key);
    let req = TestRequest::post().uri(&uri).set_json(new_order_body());
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[actix_web::test]
async fn create_order_with_session_is_not_accepted() {
    let fx = setup().await;
    let req = TestRequest::post().uri("/api/orders").insert_header(bearer(&fx.operator)).set_json(new_order_body());
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("does not accept session credentials"), "was: {body}");
}

#[actix_web::test]
async fn create_invalid_order() {
    let fx = setup().await;
    let mut order = new_order_body();
    order["address"] = json!(null);
    let req = TestRequest::post().uri("/api/orders").insert_header(api_key(&fx.tenant)).set_json(order);
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Delivery orders need an address"), "was: {body}");
}

#[actix_web::test]
async fn deactivated_tenant_key_is_refused() {
    use comanda_engine::traits::TenantManagement;
    let fx = setup().await;
    fx.db.set_tenant_active(&fx.tenant.id, false).await.unwrap();
    let req = TestRequest::post().uri("/api/orders").insert_header(api_key(&fx.tenant)).set_json(new_order_body());
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_order_as_operator() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.id)).insert_header(bearer(&fx.operator));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["id"], order.id.as_str());
}

#[actix_web::test]
async fn fetch_another_tenants_order() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.other.id).await;
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.id)).insert_header(bearer(&fx.operator));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Super-admins see every tenant's orders
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.id)).insert_header(bearer(&fx.admin));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_unknown_order() {
    let fx = setup().await;
    let req = TestRequest::get().uri("/api/orders/no-such-order").insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("no-such-order"), "was: {body}");
}

#[actix_web::test]
async fn fetch_order_with_signed_tenant_header() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let mut req = TestRequest::get().uri(&format!("/api/orders/{}", order.id));
    for header in signed_tenant_headers(&fx.tenant.slug) {
        req = req.insert_header(header);
    }
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // A bad signature is as good as no credentials
    let req = TestRequest::get()
        .uri(&format!("/api/orders/{}", order.id))
        .insert_header(("X-Tenant-Id", fx.tenant.slug.clone()))
        .insert_header(("X-Tenant-Signature", "bm90IGEgc2lnbmF0dXJl"));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn print_cycle() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let uri = |action: &str| format!("/api/orders/{}/{action}", order.id);

    let req = TestRequest::patch().uri(&uri("request-print")).insert_header(bearer(&fx.operator));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let printed = json(&body);
    assert!(!printed["print_requested_at"].is_null());
    assert_eq!(printed["status"], "pending");

    let req = TestRequest::patch().uri(&uri("mark-printed")).insert_header(bearer(&fx.operator));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let printed = json(&body);
    assert!(printed["print_requested_at"].is_null());
    assert_eq!(printed["status"], "printed");

    let req = TestRequest::patch().uri(&uri("reprint")).insert_header(bearer(&fx.operator));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "pending");
}

#[actix_web::test]
async fn update_items_recomputes_total() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let items = json!({"items": [
        {"name": "Pizza Calabresa", "quantity": 1, "unit_price": 4_200},
        {"name": "Borda recheada", "quantity": 1, "unit_price": 800},
    ]});
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/items", order.id))
        .insert_header(bearer(&fx.operator))
        .set_json(items);
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["total_price"], 5_000);

    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/items", order.id))
        .insert_header(bearer(&fx.operator))
        .set_json(json!({"items": []}));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn status_only_moves_forward() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let uri = format!("/api/orders/{}/status", order.id);

    let req = TestRequest::patch().uri(&uri).insert_header(api_key(&fx.tenant)).set_json(json!({"status": "finished"}));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "finished");

    // Same status again is a no-op
    let req = TestRequest::patch().uri(&uri).insert_header(api_key(&fx.tenant)).set_json(json!({"status": "finished"}));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::patch().uri(&uri).insert_header(api_key(&fx.tenant)).set_json(json!({"status": "printed"}));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("from finished back to printed"), "was: {body}");
}

#[actix_web::test]
async fn unknown_status_is_a_bad_request() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .insert_header(api_key(&fx.tenant))
        .set_json(json!({"status": "cooking"}));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cooking is not a valid order status"), "was: {body}");
}

#[actix_web::test]
async fn another_tenants_key_cannot_change_status() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .insert_header(api_key(&fx.other))
        .set_json(json!({"status": "printed"}));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn mark_out_for_delivery() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/mark-out-for-delivery", order.id))
        .insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = json(&body);
    assert_eq!(result["order"]["status"], "out_for_delivery");
    assert_eq!(result["customer_phone"], "(11) 98765-4321");
    assert_eq!(result["display_id"], order.display_id);
}

#[actix_web::test]
async fn concurrent_status_change_is_a_conflict() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let mut store = MockOrderStore::new();
    let current = order.clone();
    store.expect_fetch_order().returning(move |_| Ok(Some(current.clone())));
    store
        .expect_update_order_status()
        .withf(|_, expected, status| *expected == OrderStatusType::Pending && *status == OrderStatusType::Printed)
        .times(1)
        .returning(|_, _, _| Ok(None));
    let api = OrderFlowApi::new(store, EventProducers::default(), TZ);
    let configure = move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api)).service(UpdateStatusRoute::<MockOrderStore>::new());
    };
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .insert_header(api_key(&fx.tenant))
        .set_json(json!({"status": "printed"}));
    let (status, body) = call_api(&fx.db, req, configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("was modified by another request"), "was: {body}");
}
