use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::*;
use serde::Serialize;

use crate::{
    db_types::{PlanType, Tenant, TenantId},
    engine_api::errors::QuotaError,
    helpers::month_period,
    traits::{MessageUsageManagement, TenantManagement},
};

/// A tenant's outbound message usage for the current billing period, measured against its plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaStatus {
    pub tenant_id: TenantId,
    /// True if at least one more message may be sent this period
    pub allowed: bool,
    pub current: i64,
    pub limit: i64,
    pub plan: PlanType,
    pub plan_name: String,
    /// Share of the allowance used, in percent, rounded to one decimal place
    pub percentage: f64,
    pub period: String,
}

impl QuotaStatus {
    pub fn new(tenant: &Tenant, current: i64, period: String) -> Self {
        let limit = tenant.plan.message_limit();
        let percentage = if limit > 0 { (current as f64 * 1000.0 / limit as f64).round() / 10.0 } else { 100.0 };
        Self {
            tenant_id: tenant.id.clone(),
            allowed: current < limit,
            current,
            limit,
            plan: tenant.plan,
            plan_name: tenant.plan.display_name().to_string(),
            percentage,
            period,
        }
    }

    /// The message shown to a merchant whose allowance has run out.
    pub fn exceeded_message(&self) -> String {
        format!(
            "Limite de mensagens do plano {} atingido ({}/{}). Faça upgrade do seu plano para continuar enviando \
             notificações.",
            self.plan_name, self.current, self.limit
        )
    }
}

/// The outcome of asking for room to send messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The messages were counted against the quota. `usage` is the new total.
    Granted { period: String, usage: i64 },
    /// The quota has no room left. Nothing was counted.
    Refused(QuotaStatus),
}

/// The message quota gate. Limits come from the tenant's plan; usage is counted per calendar month in the store's
/// timezone.
pub struct MessageQuotaApi<B> {
    db: B,
    tz: Tz,
}

impl<B> MessageQuotaApi<B> {
    pub fn new(db: B, tz: Tz) -> Self {
        Self { db, tz }
    }

    pub fn period_at(&self, at: DateTime<Utc>) -> String {
        month_period(at, self.tz)
    }
}

impl<B> MessageQuotaApi<B>
where B: TenantManagement + MessageUsageManagement
{
    pub async fn check_limit(&self, tenant_id: &TenantId) -> Result<QuotaStatus, QuotaError> {
        let tenant = self.fetch_tenant(tenant_id).await?;
        self.status_for(&tenant, Utc::now()).await
    }

    /// Adds `count` sent messages to the tenant's usage for the current period, regardless of the limit.
    pub async fn increment_usage(&self, tenant_id: &TenantId, count: i64) -> Result<i64, QuotaError> {
        let period = self.period_at(Utc::now());
        let usage = self.db.increment_message_count(tenant_id, &period, count).await?;
        Ok(usage)
    }

    /// Atomically admits `count` messages if they fit in the tenant's allowance.
    pub async fn try_reserve(&self, tenant_id: &TenantId, count: i64) -> Result<Reservation, QuotaError> {
        let tenant = self.fetch_tenant(tenant_id).await?;
        let now = Utc::now();
        let period = self.period_at(now);
        let limit = tenant.plan.message_limit();
        match self.db.try_reserve_messages(tenant_id, &period, count, limit).await? {
            Some(usage) => {
                trace!("📊️ {count} message(s) reserved for {tenant_id}. {usage}/{limit} used in {period}");
                Ok(Reservation::Granted { period, usage })
            },
            None => {
                let status = self.status_for(&tenant, now).await?;
                info!("📊️ Message quota for {tenant_id} is exhausted ({}/{})", status.current, status.limit);
                Ok(Reservation::Refused(status))
            },
        }
    }

    /// Returns messages reserved with [`Self::try_reserve`] that were never delivered.
    pub async fn release(&self, tenant_id: &TenantId, period: &str, count: i64) -> Result<i64, QuotaError> {
        let usage = self.db.release_messages(tenant_id, period, count).await?;
        Ok(usage)
    }

    /// The usage snapshot of every tenant, for super-admin views.
    pub async fn usage_for_all_tenants(&self) -> Result<Vec<QuotaStatus>, QuotaError> {
        let now = Utc::now();
        let tenants = self.db.fetch_tenants().await?;
        let mut result = Vec::with_capacity(tenants.len());
        for tenant in &tenants {
            result.push(self.status_for(tenant, now).await?);
        }
        Ok(result)
    }

    async fn fetch_tenant(&self, tenant_id: &TenantId) -> Result<Tenant, QuotaError> {
        self.db.fetch_tenant(tenant_id).await?.ok_or_else(|| QuotaError::TenantNotFound(tenant_id.clone()))
    }

    async fn status_for(&self, tenant: &Tenant, now: DateTime<Utc>) -> Result<QuotaStatus, QuotaError> {
        let period = self.period_at(now);
        let current = self.db.fetch_message_count(&tenant.id, &period).await?;
        Ok(QuotaStatus::new(tenant, current, period))
    }
}
