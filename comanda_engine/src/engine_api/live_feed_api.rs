use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::*;
use serde::Serialize;

use crate::{
    db_types::{Order, TenantId},
    helpers::FeedWindow,
    traits::{OrderManagement, StorageError},
};

pub const DEFAULT_FEED_MAX_ORDERS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedEventType {
    /// The first snapshot after connecting
    Initial,
    Update,
    Error,
}

/// One frame of the live order feed. Every frame carries the full snapshot; clients replace what they had.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEvent {
    #[serde(rename = "type")]
    pub kind: FeedEventType,
    pub orders: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedEvent {
    /// The event as a server-sent-events frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {json}\n\n"),
            Err(e) => {
                error!("📡️ Could not serialize feed event. {e}");
                "data: {\"type\":\"error\",\"orders\":[]}\n\n".to_string()
            },
        }
    }
}

/// Produces the snapshots of the live order feed.
pub struct LiveFeedApi<B> {
    db: B,
    tz: Tz,
    max_orders: i64,
}

impl<B> LiveFeedApi<B> {
    pub fn new(db: B, tz: Tz, max_orders: i64) -> Self {
        Self { db, tz, max_orders }
    }
}

impl<B> LiveFeedApi<B>
where B: OrderManagement
{
    /// The tenant's orders in the feed window at `now`, capped at the configured maximum.
    pub async fn snapshot(&self, tenant_id: &TenantId, now: DateTime<Utc>) -> Result<Vec<Order>, StorageError> {
        let window = FeedWindow::at(now, self.tz);
        self.db.fetch_feed_orders(tenant_id, window, self.max_orders).await
    }

    /// The next frame for a connected client. Storage errors become `error` frames; the feed itself keeps going.
    pub async fn next_event(&self, tenant_id: &TenantId, now: DateTime<Utc>, first: bool) -> FeedEvent {
        match self.snapshot(tenant_id, now).await {
            Ok(orders) => {
                let kind = if first { FeedEventType::Initial } else { FeedEventType::Update };
                trace!("📡️ {} order(s) in the feed of tenant {tenant_id}", orders.len());
                FeedEvent { kind, orders, error: None }
            },
            Err(e) => {
                warn!("📡️ Could not load the feed of tenant {tenant_id}. {e}");
                FeedEvent { kind: FeedEventType::Error, orders: vec![], error: Some(e.to_string()) }
            },
        }
    }
}
