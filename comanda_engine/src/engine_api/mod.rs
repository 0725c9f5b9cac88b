pub mod auth_api;
pub mod auth_objects;
pub mod errors;
pub mod live_feed_api;
pub mod notification_api;
pub mod order_flow_api;
pub mod quota_api;
pub mod tenant_resolver;
