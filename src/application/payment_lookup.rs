use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::ttl_cache::TtlCache;
use crate::domain::value_objects::payments::{PaymentRecord, PaymentSearchFilters};
use crate::infrastructure::payments::mercado_pago::MercadoPagoClient;

/// Failures reported by a concrete provider client.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment not found at provider")]
    NotFound,
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

#[async_trait]
#[automock]
pub trait PaymentGateway: Send + Sync {
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError>;
    async fn search_payments(
        &self,
        filters: &PaymentSearchFilters,
    ) -> Result<Vec<PaymentRecord>, GatewayError>;
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        self.get_payment(payment_id).await
    }

    async fn search_payments(
        &self,
        filters: &PaymentSearchFilters,
    ) -> Result<Vec<PaymentRecord>, GatewayError> {
        self.search_payments(filters).await
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("payment not found at provider")]
    NotFound,
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] anyhow::Error),
}

/// Single place that talks to the payment provider. Masks transient
/// provider failures with a bounded retry loop; every caller goes through
/// here instead of rolling its own.
pub struct PaymentLookup<G>
where
    G: PaymentGateway + 'static,
{
    gateway: Arc<G>,
    max_attempts: u32,
    retry_delay: Duration,
    search_cache: TtlCache<Vec<PaymentRecord>>,
}

impl<G> PaymentLookup<G>
where
    G: PaymentGateway + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        max_attempts: u32,
        retry_delay: Duration,
        search_cache: TtlCache<Vec<PaymentRecord>>,
    ) -> Self {
        Self {
            gateway,
            max_attempts: max_attempts.max(1),
            retry_delay,
            search_cache,
        }
    }

    /// Fetches one payment by id. `max_attempts` bounds the TOTAL number of
    /// provider calls (first try included), with a fixed delay between them;
    /// transient failures are retried until the budget runs out. A
    /// well-formed "not found" from the provider is terminal and never
    /// retried.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, LookupError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.gateway.get_payment(payment_id).await {
                Ok(record) => {
                    debug!(
                        payment_id,
                        attempt,
                        "payment_lookup: payment fetched from provider"
                    );
                    return Ok(record);
                }
                Err(GatewayError::NotFound) => {
                    debug!(
                        payment_id,
                        "payment_lookup: provider reports payment not found"
                    );
                    return Err(LookupError::NotFound);
                }
                Err(GatewayError::Provider(err)) => {
                    warn!(
                        payment_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = ?err,
                        "payment_lookup: provider call failed"
                    );
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(LookupError::ProviderUnavailable(
            last_error.unwrap_or_else(|| anyhow!("provider lookup made no attempts")),
        ))
    }

    /// One-shot search, no retry loop. An empty result set is a normal
    /// answer. Results are cached briefly so a caller-side polling loop does
    /// not hammer the provider with identical searches.
    pub async fn list_recent_payments(
        &self,
        filters: &PaymentSearchFilters,
    ) -> Result<Vec<PaymentRecord>, LookupError> {
        let cache_key = filters.fingerprint();
        if let Some(records) = self.search_cache.get(&cache_key) {
            debug!(
                cache_key,
                count = records.len(),
                "payment_lookup: search served from cache"
            );
            return Ok(records);
        }

        let records = self
            .gateway
            .search_payments(filters)
            .await
            .map_err(|err| match err {
                GatewayError::NotFound => LookupError::NotFound,
                GatewayError::Provider(err) => LookupError::ProviderUnavailable(err),
            })?;

        debug!(
            cache_key,
            count = records.len(),
            "payment_lookup: search fetched from provider"
        );
        self.search_cache.insert(cache_key, records.clone());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::SystemClock;
    use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn sample_record(id: &str) -> PaymentRecord {
        PaymentRecord {
            id: id.to_string(),
            status: PaymentStatus::Approved,
            amount: 99.0,
            method: "pix".to_string(),
            payer_email: Some("payer@example.com".to_string()),
            payer_identification: None,
            created_at: Utc::now(),
            approved_at: Some(Utc::now()),
        }
    }

    fn lookup_with(gateway: MockPaymentGateway, max_attempts: u32) -> PaymentLookup<MockPaymentGateway> {
        let cache = TtlCache::new(Arc::new(SystemClock), chrono::Duration::seconds(30));
        PaymentLookup::new(Arc::new(gateway), max_attempts, Duration::ZERO, cache)
    }

    #[tokio::test]
    async fn returns_payment_on_first_success() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .with(eq("pay_1"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(sample_record("pay_1")) }));

        let lookup = lookup_with(gateway, 3);
        let record = lookup.get_payment("pay_1").await.unwrap();

        assert_eq!(record.id, "pay_1");
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let mut gateway = MockPaymentGateway::new();
        let mut failures = 2;
        gateway
            .expect_get_payment()
            .times(3)
            .returning(move |_| {
                if failures > 0 {
                    failures -= 1;
                    Box::pin(async { Err(GatewayError::Provider(anyhow!("503 from provider"))) })
                } else {
                    Box::pin(async { Ok(sample_record("pay_1")) })
                }
            });

        let lookup = lookup_with(gateway, 3);
        let record = lookup.get_payment("pay_1").await.unwrap();

        assert_eq!(record.id, "pay_1");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_provider_unavailable() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .times(3)
            .returning(|_| Box::pin(async { Err(GatewayError::Provider(anyhow!("timeout"))) }));

        let lookup = lookup_with(gateway, 3);
        let err = lookup.get_payment("pay_1").await.unwrap_err();

        assert!(matches!(err, LookupError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn not_found_is_never_retried() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .times(1)
            .returning(|_| Box::pin(async { Err(GatewayError::NotFound) }));

        let lookup = lookup_with(gateway, 3);
        let err = lookup.get_payment("pay_missing").await.unwrap_err();

        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn search_is_one_shot_and_empty_is_ok() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_search_payments()
            .times(1)
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));

        let lookup = lookup_with(gateway, 3);
        let filters = PaymentSearchFilters::recent_approved_pix(20);
        let records = lookup.list_recent_payments(&filters).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn repeated_search_is_served_from_cache() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_search_payments()
            .times(1)
            .returning(|_| Box::pin(async { Ok(vec![sample_record("pay_1")]) }));

        let lookup = lookup_with(gateway, 3);
        let filters = PaymentSearchFilters::recent_approved_pix(20);

        let first = lookup.list_recent_payments(&filters).await.unwrap();
        let second = lookup.list_recent_payments(&filters).await.unwrap();

        assert_eq!(first, second);
    }
}
