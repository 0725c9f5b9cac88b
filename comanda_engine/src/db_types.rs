use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use comanda_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh random (v4 UUID) identifier.
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

//--------------------------------------        Ids        ------------------------------------------------------------
string_id!(
    /// Internal identifier of a tenant (a UUID string).
    TenantId
);
string_id!(UserId);
string_id!(
    /// Internal identifier of an order. Customers never see this; they see the [`Order::display_id`].
    OrderId
);

//--------------------------------------     PlanType       ---------------------------------------------------------
/// The subscription plan of a tenant. The plan determines the monthly outbound message allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Complete,
    Premium,
}

impl PlanType {
    /// Number of outbound messages a tenant on this plan may send per calendar month.
    pub fn message_limit(&self) -> i64 {
        match self {
            PlanType::Basic => 500,
            PlanType::Complete => 2000,
            PlanType::Premium => 5000,
        }
    }

    /// The name shown to merchants, e.g. in upsell prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Basic => "Básico",
            PlanType::Complete => "Completo",
            PlanType::Premium => "Premium",
        }
    }
}

impl Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanType::Basic => write!(f, "basic"),
            PlanType::Complete => write!(f, "complete"),
            PlanType::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for PlanType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "complete" => Ok(Self::Complete),
            "premium" => Ok(Self::Premium),
            s => Err(ConversionError(format!("Invalid plan type: {s}"))),
        }
    }
}

//--------------------------------------  SubscriptionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Overdue,
    Cancelled,
}

//--------------------------------------       Tenant        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Short, unique, url-friendly name of the business
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Deactivated tenants keep their data but can no longer authenticate.
    pub active: bool,
    pub plan: PlanType,
    pub subscription_status: SubscriptionStatus,
    pub whatsapp_phone_number_id: Option<String>,
    #[serde(skip_serializing)]
    pub whatsapp_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub slug: String,
    pub name: String,
    pub api_key: String,
    pub plan: PlanType,
}

impl NewTenant {
    /// Creates a new tenant on the given plan with a freshly generated API key.
    pub fn new<S: Into<String>>(slug: S, name: S, plan: PlanType) -> Self {
        Self { slug: slug.into(), name: name.into(), api_key: crate::helpers::generate_api_key(), plan }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = api_key.into();
        self
    }
}

//--------------------------------------        User         ---------------------------------------------------------
pub const SUPER_ADMIN_ROLE: &str = "master";

/// An operator login. Users without a tenant are super-admins with cross-tenant visibility.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_super_admin(&self) -> bool {
        self.tenant_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub tenant_id: Option<TenantId>,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
}

impl NewUser {
    /// Builds a new user, hashing `password` with bcrypt at the given cost.
    pub fn new(
        tenant_id: Option<TenantId>,
        username: &str,
        password: &str,
        cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        let password_hash = bcrypt::hash(password, cost)?;
        let role = if tenant_id.is_none() { SUPER_ADMIN_ROLE } else { "operator" };
        Ok(Self {
            tenant_id,
            username: username.to_string(),
            password_hash,
            display_name: username.to_string(),
            role: role.to_string(),
        })
    }

    pub fn with_display_name<S: Into<String>>(mut self, display_name: S) -> Self {
        self.display_name = display_name.into();
        self
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been received and is waiting for its ticket to be printed
    Pending,
    /// The kitchen has a physical ticket for the order
    Printed,
    /// The order has left the store
    OutForDelivery,
    /// Terminal state
    Finished,
}

impl OrderStatusType {
    /// Position of the status in the order lifecycle. Statuses only move forward, except for a reprint.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatusType::Pending => 0,
            OrderStatusType::Printed => 1,
            OrderStatusType::OutForDelivery => 2,
            OrderStatusType::Finished => 3,
        }
    }

    /// True if an order in this status may be moved to `next` by a forward transition.
    pub fn can_advance_to(&self, next: OrderStatusType) -> bool {
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Printed => "printed",
            OrderStatusType::OutForDelivery => "out_for_delivery",
            OrderStatusType::Finished => "finished",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to pending");
            OrderStatusType::Pending
        })
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "printed" => Ok(Self::Printed),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "finished" => Ok(Self::Finished),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     Fulfillment       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Fulfillment {
    Delivery,
    Pickup,
}

//--------------------------------------      LineItem         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Cents,
}

impl LineItem {
    pub fn new<S: Into<String>>(name: S, quantity: i64, unit_price: Cents) -> Self {
        Self { name: name.into(), quantity, unit_price }
    }

    pub fn subtotal(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

/// Sum of the line subtotals. An order's `total_price` is always this value for its items.
pub fn items_total(items: &[LineItem]) -> Cents {
    items.iter().map(LineItem::subtotal).sum()
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    /// Sequence number of the order within the tenant's business day. Starts at 1 every day.
    pub display_id: i64,
    /// The business day (`YYYY-MM-DD`, in the store's timezone) the display id belongs to
    pub business_day: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Json<Vec<LineItem>>,
    pub total_price: Cents,
    pub status: OrderStatusType,
    pub fulfillment: Fulfillment,
    pub address: Option<String>,
    /// Set for orders booked for a later time. Unscheduled orders are due as soon as possible.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Set when an operator asks for the ticket to be (re)printed; cleared once printed.
    pub print_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The delivery address, if this is a delivery order with a recorded, non-empty address.
    pub fn delivery_address(&self) -> Option<&str> {
        match self.fulfillment {
            Fulfillment::Delivery => self.address.as_deref().map(str::trim).filter(|a| !a.is_empty()),
            Fulfillment::Pickup => None,
        }
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub tenant_id: TenantId,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<LineItem>,
    pub fulfillment: Fulfillment,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn new(tenant_id: TenantId, customer_name: &str, customer_phone: &str, items: Vec<LineItem>) -> Self {
        Self {
            tenant_id,
            customer_name: customer_name.to_string(),
            customer_phone: customer_phone.to_string(),
            items,
            fulfillment: Fulfillment::Pickup,
            address: None,
            scheduled_for: None,
        }
    }

    pub fn for_delivery<S: Into<String>>(mut self, address: S) -> Self {
        self.fulfillment = Fulfillment::Delivery;
        self.address = Some(address.into());
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn total_price(&self) -> Cents {
        items_total(&self.items)
    }
}

//--------------------------------------    MessageUsage       ---------------------------------------------------------
/// Count of outbound messages sent by a tenant in one billing period (`YYYY-MM`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageUsage {
    pub tenant_id: TenantId,
    pub period: String,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}
