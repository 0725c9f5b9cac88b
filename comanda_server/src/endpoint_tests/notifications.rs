use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use comanda_engine::{
    db_types::{Order, TenantId},
    events::EventProducers,
    helpers::month_period,
    traits::{MessageSendError, MessageUsageManagement},
    NotificationApi,
    OrderFlowApi,
    SqliteDatabase,
    TenantScope,
};

use super::{
    helpers::{api_key, bearer, call_api, create_order, json, setup, TZ},
    mocks::MockSender,
};
use crate::routes::NotifyDeliveryRoute;

fn configure(db: SqliteDatabase, sender: MockSender) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default(), TZ)))
            .app_data(web::Data::new(NotificationApi::new(db, sender, TZ, "55")))
            .service(NotifyDeliveryRoute::<SqliteDatabase, MockSender>::new());
    }
}

async fn out_for_delivery_order(db: &SqliteDatabase, tenant: &TenantId) -> Order {
    let order = create_order(db, tenant).await;
    OrderFlowApi::new(db.clone(), EventProducers::default(), TZ)
        .mark_out_for_delivery(&order.id, &TenantScope::Tenant(tenant.clone()))
        .await
        .expect("Error marking order out for delivery")
        .order
}

fn notify_uri(order: &Order) -> String {
    format!("/api/orders/{}/notify-delivery", order.id)
}

#[actix_web::test]
async fn notify_customer() {
    let fx = setup().await;
    let order = out_for_delivery_order(&fx.db, &fx.tenant.id).await;
    let display_id = order.display_id;
    let mut sender = MockSender::new();
    sender
        .expect_send_text()
        .withf(move |to, body| to == "5511987654321" && body.contains(&format!("#{display_id} saiu para entrega")))
        .times(1)
        .returning(|_, _| Ok("wamid.HBgN".to_string()));
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, r#"{"sent":true,"message_id":"wamid.HBgN"}"#);
    let period = month_period(Utc::now(), TZ);
    assert_eq!(fx.db.fetch_message_count(&fx.tenant.id, &period).await.unwrap(), 1);
}

#[actix_web::test]
async fn notify_pending_order() {
    let fx = setup().await;
    let order = create_order(&fx.db, &fx.tenant.id).await;
    let mut sender = MockSender::new();
    sender.expect_send_text().never();
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let result = json(&body);
    assert_eq!(result["sent"], false);
    assert!(result["error"].as_str().unwrap().contains("pending"), "was: {body}");
}

#[actix_web::test]
async fn notify_needs_the_stores_api_key() {
    let fx = setup().await;
    let order = out_for_delivery_order(&fx.db, &fx.tenant.id).await;
    let mut sender = MockSender::new();
    sender.expect_send_text().never();
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(bearer(&fx.operator));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut sender = MockSender::new();
    sender.expect_send_text().never();
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.other));
    let (status, _) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn notify_over_quota() {
    let fx = setup().await;
    let order = out_for_delivery_order(&fx.db, &fx.tenant.id).await;
    let period = month_period(Utc::now(), TZ);
    fx.db.increment_message_count(&fx.tenant.id, &period, 500).await.unwrap();
    let mut sender = MockSender::new();
    sender.expect_send_text().never();
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let result = json(&body);
    assert_eq!(result["sent"], false);
    assert_eq!(result["plan"], "Básico");
    assert_eq!(result["current"], 500);
    assert_eq!(result["limit"], 500);
    assert_eq!(result["percentage"], 100.0);
    assert!(result["error"].as_str().unwrap().contains("Limite de mensagens do plano Básico atingido"));
    assert_eq!(fx.db.fetch_message_count(&fx.tenant.id, &period).await.unwrap(), 500);
}

#[actix_web::test]
async fn provider_failure_gives_back_the_message() {
    let fx = setup().await;
    let order = out_for_delivery_order(&fx.db, &fx.tenant.id).await;
    let mut sender = MockSender::new();
    sender
        .expect_send_text()
        .times(1)
        .returning(|_, _| Err(MessageSendError::new(Some(503), "Service temporarily unavailable")));
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, r#"{"error":"Service temporarily unavailable","sent":false}"#);
    let period = month_period(Utc::now(), TZ);
    assert_eq!(fx.db.fetch_message_count(&fx.tenant.id, &period).await.unwrap(), 0);
}

#[actix_web::test]
async fn unreachable_provider_is_a_bad_gateway() {
    let fx = setup().await;
    let order = out_for_delivery_order(&fx.db, &fx.tenant.id).await;
    let mut sender = MockSender::new();
    sender.expect_send_text().times(1).returning(|_, _| Err(MessageSendError::new(None, "connection refused")));
    let req = TestRequest::post().uri(&notify_uri(&order)).insert_header(api_key(&fx.tenant));
    let (status, body) = call_api(&fx.db, req, configure(fx.db.clone(), sender)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json(&body)["sent"], false);
}
