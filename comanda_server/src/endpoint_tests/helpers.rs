use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Duration;
use comanda_common::{Cents, Secret};
use comanda_engine::{
    db_types::{LineItem, NewOrder, NewTenant, NewUser, Order, PlanType, Tenant, TenantId, User},
    events::EventProducers,
    helpers::calculate_hmac,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{TenantManagement, UserManagement},
    OrderFlowApi,
    SqliteDatabase,
    TenantResolver,
};
use log::debug;

use crate::{
    auth::{SessionClaims, SessionIssuer},
    config::{AuthConfig, ServerOptions},
    middleware::{CredentialsMiddlewareFactory, TENANT_ID_HEADER, TENANT_SIGNATURE_HEADER},
};

pub const TZ: chrono_tz::Tz = chrono_tz::America::Sao_Paulo;
pub const INTERNAL_SECRET: &str = "an-internal-secret-only-used-in-tests";
// Low bcrypt cost keeps the tests fast
const TEST_BCRYPT_COST: u32 = 4;

/// Two stores, each with an operator login, and a super-admin.
pub struct Fixture {
    pub db: SqliteDatabase,
    pub tenant: Tenant,
    pub other: Tenant,
    pub operator: User,
    pub admin: User,
}

pub async fn setup() -> Fixture {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    let tenant = db
        .insert_tenant(NewTenant::new("pizzaria-do-ze", "Pizzaria do Zé", PlanType::Basic))
        .await
        .expect("Error creating tenant");
    let other = db
        .insert_tenant(NewTenant::new("sushi-da-lu", "Sushi da Lu", PlanType::Complete))
        .await
        .expect("Error creating tenant");
    let operator = create_user(&db, Some(&tenant.id), "ze", "pizza123").await;
    let admin = create_user(&db, None, "root", "hunter2").await;
    Fixture { db, tenant, other, operator, admin }
}

pub async fn create_user(db: &SqliteDatabase, tenant: Option<&TenantId>, username: &str, password: &str) -> User {
    let user = NewUser::new(tenant.cloned(), username, password, TEST_BCRYPT_COST).expect("Error hashing password");
    db.insert_user(user).await.expect("Error creating user")
}

pub async fn create_order(db: &SqliteDatabase, tenant: &TenantId) -> Order {
    let items = vec![LineItem::new("Pizza Calabresa", 1, Cents::from(4_200))];
    let order = NewOrder::new(tenant.clone(), "Ana Souza", "(11) 98765-4321", items).for_delivery("Rua das Flores, 12");
    OrderFlowApi::new(db.clone(), EventProducers::default(), TZ).create_order(order).await.expect("Error creating order")
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        session_secret: Secret::new("0123456789abcdef0123456789abcdef0123456789abcdef".to_string()),
        session_ttl: Duration::hours(1),
        internal_secret: Some(Secret::new(INTERNAL_SECRET.to_string())),
    }
}

pub fn sessions() -> SessionIssuer {
    SessionIssuer::new(&auth_config())
}

pub fn session_token(user: &User) -> String {
    sessions().issue_token(SessionClaims::from(user)).expect("Error issuing token")
}

pub fn bearer(user: &User) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", session_token(user)))
}

pub fn api_key(tenant: &Tenant) -> (&'static str, String) {
    ("X-API-Key", tenant.api_key.clone())
}

pub fn signed_tenant_headers(value: &str) -> [(&'static str, String); 2] {
    [(TENANT_ID_HEADER, value.to_string()), (TENANT_SIGNATURE_HEADER, calculate_hmac(INTERNAL_SECRET, value.as_bytes()))]
}

/// Mounts the routes added by `configure` under `/api`, behind the credentials middleware, in the same way the server
/// does. Errors raised by middleware are turned into responses, as the HTTP server would.
pub async fn call_api<F>(db: &SqliteDatabase, req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let config = auth_config();
    let sessions = SessionIssuer::new(&config);
    let resolver = web::Data::new(TenantResolver::new(db.clone(), config.internal_secret.clone()));
    let app = App::new()
        .app_data(resolver.clone())
        .app_data(web::Data::new(sessions.clone()))
        .app_data(web::Data::new(ServerOptions::default()))
        .service(web::scope("/api").wrap(CredentialsMiddlewareFactory::new(resolver, sessions)).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON. {e}: {body}"))
}
