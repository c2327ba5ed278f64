use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};

/// Result of an insert attempt. The store enforces at most one row per
/// `payment_id`; a concurrent writer that loses the race sees
/// `DuplicatePaymentId` instead of an error so it can return the winner's row.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(SubscriptionEntity),
    DuplicatePaymentId,
}

#[async_trait]
#[automock]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<SubscriptionEntity>>;
    async fn find_latest_by_email(&self, email: &str) -> Result<Option<SubscriptionEntity>>;
    async fn create(&self, entity: InsertSubscriptionEntity) -> Result<InsertOutcome>;
}
