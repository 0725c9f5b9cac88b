//! # Backend interface contracts
//!
//! The engine APIs never talk to a database directly. They are generic over the traits in this module, which a
//! storage backend implements. The SQLite backend ([`crate::SqliteDatabase`]) implements all of them.
//!
//! * [`TenantManagement`] looks up tenants by id, API key or slug.
//! * [`UserManagement`] stores operator logins.
//! * [`OrderManagement`] stores orders and performs the status writes of the order lifecycle.
//! * [`MessageUsageManagement`] keeps the monthly outbound message counters behind the quota gate.
//!
//! [`MessageSender`] is the outbound side: anything that can deliver a text message to a customer's phone.
mod message_sender;
mod message_usage;
mod order_management;
mod storage_error;
mod tenant_management;

pub use message_sender::{MessageSendError, MessageSender};
pub use message_usage::MessageUsageManagement;
pub use order_management::OrderManagement;
pub use storage_error::StorageError;
pub use tenant_management::{TenantManagement, UserManagement};
