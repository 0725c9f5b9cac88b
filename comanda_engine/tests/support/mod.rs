#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use chrono_tz::{America::Sao_Paulo, Tz};
use comanda_common::Cents;
use comanda_engine::{
    db_types::{LineItem, NewOrder, NewTenant, NewUser, Order, PlanType, Tenant, TenantId, User},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{MessageSendError, MessageSender, TenantManagement, UserManagement},
    OrderFlowApi,
    SqliteDatabase,
};
use comanda_engine::events::EventProducers;

pub const TZ: Tz = Sao_Paulo;
/// Low bcrypt cost keeps the tests fast
pub const TEST_BCRYPT_COST: u32 = 4;

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

pub async fn create_tenant(db: &SqliteDatabase, slug: &str, plan: PlanType) -> Tenant {
    db.insert_tenant(NewTenant::new(slug, slug, plan)).await.expect("Error creating tenant")
}

pub async fn create_user(db: &SqliteDatabase, tenant: Option<&TenantId>, username: &str, password: &str) -> User {
    let user = NewUser::new(tenant.cloned(), username, password, TEST_BCRYPT_COST).expect("Error hashing password");
    db.insert_user(user).await.expect("Error creating user")
}

pub fn pizza_order(tenant: &TenantId) -> NewOrder {
    let items = vec![LineItem::new("Pizza Margherita", 1, Cents::from(4_500)), LineItem::new("Guaraná", 2, Cents::from(600))];
    NewOrder::new(tenant.clone(), "Ana Souza", "(11) 98765-4321", items).for_delivery("Rua das Flores, 12")
}

pub fn order_flow(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default(), TZ)
}

pub async fn new_order(db: &SqliteDatabase, tenant: &TenantId) -> Order {
    order_flow(db).create_order(pizza_order(tenant)).await.expect("Error creating order")
}

/// A message sender that records what it was asked to send instead of talking to a provider.
#[derive(Clone, Default)]
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_with: Option<MessageSendError>,
}

impl RecordingSender {
    pub fn failing(status: u16, message: &str) -> Self {
        Self { sent: Arc::default(), fail_with: Some(MessageSendError::new(Some(status), message)) }
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl MessageSender for RecordingSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, MessageSendError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), body.to_string()));
        Ok(format!("wamid.{}", sent.len()))
    }
}
