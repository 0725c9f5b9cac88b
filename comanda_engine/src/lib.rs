//! Comanda order engine
//!
//! The engine holds the core logic of the comanda order server, independent of any transport or messaging provider.
//!
//! It is divided into
//! 1. The backend contracts ([`mod@traits`]) and the SQLite backend that implements them. The data types stored in
//!    the backend live in [`db_types`].
//! 2. The public APIs:
//!    * [`TenantResolver`] works out which tenant a request acts for, from whatever credentials it carries.
//!    * [`OrderFlowApi`] is the order status state machine.
//!    * [`MessageQuotaApi`] is the per-tenant monthly message quota gate.
//!    * [`NotificationApi`] sends "out for delivery" messages through a [`traits::MessageSender`].
//!    * [`LiveFeedApi`] builds the snapshots of the live order feed.
//!
//! Status changes that other components react to are published as [`events`]. The server wires the out-for-delivery
//! event to the notification dispatcher.
mod engine_api;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use engine_api::{
    auth_api::AuthApi,
    auth_objects::{
        AuthMethod,
        BasicCredentials,
        Credentials,
        Principal,
        ResolvePolicy,
        SignedTenantHeader,
        TenantScope,
        ANY_CREDENTIAL,
    },
    errors::{AuthApiError, OrderFlowError, QuotaError, TenantResolverError},
    live_feed_api::{FeedEvent, FeedEventType, LiveFeedApi, DEFAULT_FEED_MAX_ORDERS},
    notification_api::{NotificationApi, NotificationOutcome},
    order_flow_api::{OrderFlowApi, OutForDelivery},
    quota_api::{MessageQuotaApi, QuotaStatus, Reservation},
    tenant_resolver::TenantResolver,
};
