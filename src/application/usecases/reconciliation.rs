use std::sync::Arc;

use anyhow::anyhow;
use chrono::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::payment_lookup::{LookupError, PaymentGateway, PaymentLookup};
use crate::domain::clock::Clock;
use crate::domain::entities::subscriptions::InsertSubscriptionEntity;
use crate::domain::repositories::subscriptions::{InsertOutcome, SubscriptionRepository};
use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;
use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
use crate::domain::value_objects::payments::{PaymentRecord, PaymentSearchFilters};
use crate::domain::value_objects::plans::MONTHLY_PLAN;
use crate::domain::value_objects::reconciliation::{
    IdentitySignal, ReconciliationCandidate, ReconciliationOutcome,
};

/// Maximum tolerated difference between the claimed amount and the
/// provider-reported amount, in currency units.
pub const AMOUNT_EPSILON: f64 = 0.01;

/// Infrastructure failures. Expected business results ("payment still
/// pending", "amount does not match") are `ReconciliationOutcome` values,
/// never errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid candidate: {0}")]
    InvalidCandidate(String),
    #[error("payment provider unavailable, try again later")]
    ProviderUnavailable(#[source] anyhow::Error),
    #[error("subscription store failure")]
    Store(#[source] anyhow::Error),
}

impl ReconcileError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ReconcileError::InvalidCandidate(_) => StatusCode::BAD_REQUEST,
            ReconcileError::ProviderUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReconcileError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ReconcileResult = Result<ReconciliationOutcome, ReconcileError>;

/// The single decision point for "has this payment resulted in an active
/// subscription". Enforces idempotency per payment id, amount integrity
/// against the provider-reported value, and the approval gate.
pub struct ReconciliationUseCase<S, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    payment_lookup: PaymentLookup<G>,
    clock: Arc<dyn Clock>,
    search_limit: u32,
}

impl<S, G> ReconciliationUseCase<S, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        payment_lookup: PaymentLookup<G>,
        clock: Arc<dyn Clock>,
        search_limit: u32,
    ) -> Self {
        Self {
            subscription_repo,
            payment_lookup,
            clock,
            search_limit,
        }
    }

    pub async fn reconcile(&self, candidate: ReconciliationCandidate) -> ReconcileResult {
        let candidate = candidate.normalized();
        match (&candidate.payment_id, &candidate.identity) {
            (Some(_), None) | (None, Some(_)) => {}
            (Some(_), Some(_)) => {
                let err = ReconcileError::InvalidCandidate(
                    "supply either a payment id or identity filters, not both".to_string(),
                );
                warn!(
                    claimed_email = %candidate.claimed_email,
                    status = err.status_code().as_u16(),
                    "reconcile: ambiguous candidate"
                );
                return Err(err);
            }
            (None, None) => {
                let err = ReconcileError::InvalidCandidate(
                    "a payment id or identity filters are required".to_string(),
                );
                warn!(
                    claimed_email = %candidate.claimed_email,
                    status = err.status_code().as_u16(),
                    "reconcile: candidate carries no way to locate the payment"
                );
                return Err(err);
            }
        }

        let record = match &candidate.payment_id {
            Some(payment_id) => match self.resolve_by_payment_id(payment_id).await? {
                Some(record) => record,
                None => {
                    return Ok(ReconciliationOutcome::NotFound {
                        reason: format!("no payment with id {payment_id} exists at the provider"),
                    });
                }
            },
            None => match self.resolve_by_identity(&candidate).await? {
                Some(record) => record,
                None => {
                    return Ok(ReconciliationOutcome::NotFound {
                        reason: "no recent approved PIX payment matches the supplied identity \
                                 and amount"
                            .to_string(),
                    });
                }
            },
        };

        self.settle(&candidate, &record).await
    }

    async fn resolve_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentRecord>, ReconcileError> {
        match self.payment_lookup.get_payment(payment_id).await {
            Ok(record) => Ok(Some(record)),
            Err(LookupError::NotFound) => Ok(None),
            Err(LookupError::ProviderUnavailable(err)) => {
                error!(
                    payment_id,
                    error = ?err,
                    "reconcile: provider unavailable while fetching payment"
                );
                Err(ReconcileError::ProviderUnavailable(err))
            }
        }
    }

    /// Fallback path: no payment id was supplied, so search recent approved
    /// PIX payments and match on the caller's identity signal plus amount.
    /// Ties resolve to the most recently created payment.
    async fn resolve_by_identity(
        &self,
        candidate: &ReconciliationCandidate,
    ) -> Result<Option<PaymentRecord>, ReconcileError> {
        let filters = PaymentSearchFilters::recent_approved_pix(self.search_limit);
        let records = match self.payment_lookup.list_recent_payments(&filters).await {
            Ok(records) => records,
            Err(LookupError::NotFound) => Vec::new(),
            Err(LookupError::ProviderUnavailable(err)) => {
                error!(
                    claimed_email = %candidate.claimed_email,
                    error = ?err,
                    "reconcile: provider unavailable while searching payments"
                );
                return Err(ReconcileError::ProviderUnavailable(err));
            }
        };

        let identity = candidate
            .identity
            .as_ref()
            .ok_or_else(|| ReconcileError::InvalidCandidate("identity filter missing".into()))?;

        let best_match = records
            .into_iter()
            .filter(|record| Self::identity_matches(identity, record))
            .filter(|record| (record.amount - candidate.claimed_amount).abs() <= AMOUNT_EPSILON)
            .max_by_key(|record| record.created_at);

        if let Some(record) = best_match.as_ref() {
            info!(
                payment_id = %record.id,
                claimed_email = %candidate.claimed_email,
                "reconcile: fallback search matched a payment"
            );
        }

        Ok(best_match)
    }

    fn identity_matches(identity: &IdentitySignal, record: &PaymentRecord) -> bool {
        match identity {
            IdentitySignal::Email(email) => record
                .payer_email
                .as_deref()
                .is_some_and(|payer| payer.eq_ignore_ascii_case(email)),
            IdentitySignal::TaxId(tax_id) => record
                .payer_identification
                .as_deref()
                .is_some_and(|payer| payer == tax_id),
        }
    }

    /// Both resolution paths converge here: gate on approval, verify the
    /// amount, then create at most one subscription for this payment id.
    async fn settle(
        &self,
        candidate: &ReconciliationCandidate,
        record: &PaymentRecord,
    ) -> ReconcileResult {
        match record.status {
            PaymentStatus::Approved => {}
            PaymentStatus::Pending => {
                info!(
                    payment_id = %record.id,
                    "reconcile: payment still pending at provider"
                );
                return Ok(ReconciliationOutcome::PendingRetry {
                    reason: format!(
                        "payment {} is still pending at the provider, check again shortly",
                        record.id
                    ),
                });
            }
            PaymentStatus::Rejected | PaymentStatus::Cancelled => {
                info!(
                    payment_id = %record.id,
                    payment_status = %record.status,
                    "reconcile: payment terminally unapproved"
                );
                return Ok(ReconciliationOutcome::Rejected {
                    reason: format!("payment {} was {} by the provider", record.id, record.status),
                });
            }
        }

        if (record.amount - candidate.claimed_amount).abs() > AMOUNT_EPSILON {
            warn!(
                payment_id = %record.id,
                provider_amount = record.amount,
                claimed_amount = candidate.claimed_amount,
                "reconcile: claimed amount deviates from provider amount"
            );
            return Ok(ReconciliationOutcome::AmountMismatch {
                reason: format!(
                    "claimed amount {:.2} does not match the amount {:.2} charged for payment {}",
                    candidate.claimed_amount, record.amount, record.id
                ),
            });
        }

        // Pre-write existence check. This is an optimization, not the safety
        // mechanism: the store's unique constraint on payment_id is.
        if let Some(existing) = self
            .subscription_repo
            .find_by_payment_id(&record.id)
            .await
            .map_err(|err| {
                error!(
                    payment_id = %record.id,
                    db_error = ?err,
                    "reconcile: failed to check for existing subscription"
                );
                ReconcileError::Store(err)
            })?
        {
            info!(
                payment_id = %record.id,
                subscription_id = %existing.id,
                "reconcile: payment already settled"
            );
            return Ok(ReconciliationOutcome::AlreadyExists {
                subscription_id: existing.id,
                reason: format!("payment {} already activated a subscription", record.id),
            });
        }

        let user_id = self.resolve_user_id(&candidate.claimed_email).await?;
        let starts_at = self.clock.now();
        let ends_at = starts_at + Duration::days(MONTHLY_PLAN.duration_days);

        let insert = InsertSubscriptionEntity {
            user_id,
            email: candidate.claimed_email.clone(),
            payment_id: record.id.clone(),
            plan_id: MONTHLY_PLAN.id.to_string(),
            // Always the provider-reported amount, never the claimed one.
            amount: record.amount,
            status: SubscriptionStatus::Active.to_string(),
            starts_at,
            ends_at,
        };

        match self
            .subscription_repo
            .create(insert)
            .await
            .map_err(|err| {
                error!(
                    payment_id = %record.id,
                    db_error = ?err,
                    "reconcile: failed to create subscription"
                );
                ReconcileError::Store(err)
            })? {
            InsertOutcome::Created(subscription) => {
                info!(
                    payment_id = %record.id,
                    subscription_id = %subscription.id,
                    %user_id,
                    ends_at = %subscription.ends_at,
                    "reconcile: subscription activated"
                );
                Ok(ReconciliationOutcome::Approved {
                    subscription_id: subscription.id,
                    reason: format!(
                        "payment {} approved, access active until {}",
                        record.id,
                        subscription.ends_at.format("%Y-%m-%d")
                    ),
                })
            }
            InsertOutcome::DuplicatePaymentId => {
                // A concurrent reconciliation won the race. Return its row.
                let winner = self
                    .subscription_repo
                    .find_by_payment_id(&record.id)
                    .await
                    .map_err(ReconcileError::Store)?
                    .ok_or_else(|| {
                        ReconcileError::Store(anyhow!(
                            "duplicate payment id reported but no winning row is visible"
                        ))
                    })?;
                info!(
                    payment_id = %record.id,
                    subscription_id = %winner.id,
                    "reconcile: lost creation race, returning winner"
                );
                Ok(ReconciliationOutcome::AlreadyExists {
                    subscription_id: winner.id,
                    reason: format!("payment {} already activated a subscription", record.id),
                })
            }
        }
    }

    /// Renewals keep the same internal user; first-time subscribers get a
    /// synthesized id.
    async fn resolve_user_id(&self, email: &str) -> Result<Uuid, ReconcileError> {
        let previous = self
            .subscription_repo
            .find_latest_by_email(email)
            .await
            .map_err(|err| {
                error!(
                    email,
                    db_error = ?err,
                    "reconcile: failed to look up prior subscriptions for user"
                );
                ReconcileError::Store(err)
            })?;

        Ok(previous
            .map(|subscription| subscription.user_id)
            .unwrap_or_else(Uuid::new_v4))
    }
}
