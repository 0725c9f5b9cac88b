use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, TenantId},
    traits::StorageError,
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} belongs to another tenant")]
    Forbidden(OrderId),
    #[error("{0} is not a valid order status")]
    InvalidStatus(String),
    #[error("Cannot move order {id} from {from} back to {to}")]
    InvalidTransition { id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} was modified by another request. Reload it and try again")]
    ConcurrentModification(OrderId),
    #[error("Invalid order. {0}")]
    InvalidOrder(String),
    #[error("{0}")]
    StorageError(#[from] StorageError),
}

#[derive(Debug, Clone, Error)]
pub enum TenantResolverError {
    #[error("No valid credentials were provided")]
    Unauthenticated,
    #[error("{0}")]
    StorageError(#[from] StorageError),
}

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Tenant {0} does not exist or has been deactivated")]
    TenantUnavailable(String),
    #[error("Could not verify password. {0}")]
    PasswordHashError(String),
    #[error("{0}")]
    StorageError(#[from] StorageError),
}

#[derive(Debug, Clone, Error)]
pub enum QuotaError {
    #[error("Tenant {0} does not exist")]
    TenantNotFound(TenantId),
    #[error("{0}")]
    StorageError(#[from] StorageError),
}
