use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use comanda_engine::{
    events::EventProducers,
    AuthApi,
    LiveFeedApi,
    MessageQuotaApi,
    OrderFlowApi,
    SqliteDatabase,
    TenantResolver,
};
use log::*;

use crate::{
    auth::SessionIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::whatsapp::{create_notification_handlers, WhatsAppNotifier, WhatsAppSender},
    middleware::CredentialsMiddlewareFactory,
    routes::{
        health,
        logout,
        ClearPrintRequestRoute,
        CreateOrderRoute,
        LoginRoute,
        MarkOutForDeliveryRoute,
        MarkPrintedRoute,
        MeRoute,
        MessageUsageRoute,
        NotifyDeliveryRoute,
        OrderByIdRoute,
        OrderStreamRoute,
        ReprintRoute,
        RequestPrintRoute,
        UpdateItemsRoute,
        UpdateStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if !config.whatsapp.is_configured() {
        warn!("🚀️ WhatsApp credentials are not configured. Delivery notifications will fail until they are.");
    }
    let sender =
        WhatsAppSender::new(config.whatsapp.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier = Arc::new(WhatsAppNotifier::new(
        db.clone(),
        sender,
        config.timezone,
        &config.default_country_code,
    ));
    let handlers = create_notification_handlers(Arc::clone(&notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    info!("🚀️ Delivery notification handler started");
    let srv = create_server_instance(config, db, notifier, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    notifier: Arc<WhatsAppNotifier>,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let sessions = SessionIssuer::new(&config.auth);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone(), config.timezone);
        let quota_api = MessageQuotaApi::new(db.clone(), config.timezone);
        let feed_api = LiveFeedApi::new(db.clone(), config.timezone, config.feed.max_orders);
        let auth_api = AuthApi::new(db.clone());
        let resolver = web::Data::new(TenantResolver::new(db.clone(), config.auth.internal_secret.clone()));
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("comanda::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(quota_api))
            .app_data(web::Data::new(feed_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::from(Arc::clone(&notifier)))
            .app_data(resolver.clone())
            .app_data(web::Data::new(sessions.clone()))
            .app_data(web::Data::new(options.clone()));
        // Routes that require credentials. The stream route must come before the order-by-id route.
        let api_scope = web::scope("/api")
            .wrap(CredentialsMiddlewareFactory::new(resolver, sessions.clone()))
            .service(OrderStreamRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateItemsRoute::<SqliteDatabase>::new())
            .service(RequestPrintRoute::<SqliteDatabase>::new())
            .service(ClearPrintRequestRoute::<SqliteDatabase>::new())
            .service(MarkPrintedRoute::<SqliteDatabase>::new())
            .service(ReprintRoute::<SqliteDatabase>::new())
            .service(UpdateStatusRoute::<SqliteDatabase>::new())
            .service(MarkOutForDeliveryRoute::<SqliteDatabase>::new())
            .service(NotifyDeliveryRoute::<SqliteDatabase, WhatsAppSender>::new())
            .service(MessageUsageRoute::<SqliteDatabase>::new())
            .service(MeRoute::new());
        app.service(health).service(LoginRoute::<SqliteDatabase>::new()).service(logout).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
