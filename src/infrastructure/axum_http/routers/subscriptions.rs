use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::application::payment_lookup::{PaymentGateway, PaymentLookup};
use crate::application::ttl_cache::TtlCache;
use crate::application::usecases::access::AccessUseCase;
use crate::application::usecases::reconciliation::ReconciliationUseCase;
use crate::config::config_model::DotEnvyConfig;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::repositories::subscriptions::SubscriptionRepository;
use crate::domain::value_objects::reconciliation::{
    IdentitySignal, ReconciliationCandidate, ReconciliationOutcome,
};
use crate::infrastructure::axum_http::error_responses::ErrorResponse;
use crate::infrastructure::payments::mercado_pago::MercadoPagoClient;
use crate::infrastructure::postgres::{
    postgres_connection::PgPoolSquad, repositories::subscriptions::SubscriptionPostgres,
};

pub struct SubscriptionsState<S, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    reconciliation: ReconciliationUseCase<S, G>,
    access: AccessUseCase<S>,
}

pub fn routes(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repo = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let gateway = Arc::new(MercadoPagoClient::new(
        config.mercado_pago.base_url.clone(),
        config.mercado_pago.access_token.clone(),
    ));
    let payment_lookup = PaymentLookup::new(
        gateway,
        config.reconciliation.lookup_max_attempts,
        StdDuration::from_millis(config.reconciliation.lookup_retry_delay_ms),
        TtlCache::new(
            Arc::clone(&clock),
            Duration::seconds(config.reconciliation.cache_ttl_seconds),
        ),
    );

    let reconciliation = ReconciliationUseCase::new(
        Arc::clone(&subscription_repo),
        payment_lookup,
        Arc::clone(&clock),
        config.mercado_pago.search_limit,
    );
    let access = AccessUseCase::new(
        subscription_repo,
        Arc::clone(&clock),
        TtlCache::new(clock, Duration::seconds(config.reconciliation.cache_ttl_seconds)),
    );

    Router::new()
        .route("/reconcile", post(reconcile))
        .route("/access", get(check_access))
        .with_state(Arc::new(SubscriptionsState {
            reconciliation,
            access,
        }))
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub payment_id: Option<String>,
    pub tax_id: Option<String>,
    pub email: String,
    pub amount: f64,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<Uuid>,
}

impl ReconcileRequest {
    fn into_candidate(self) -> ReconciliationCandidate {
        // With no payment id, the tax id is a more precise identity signal
        // than the email. Supplying a payment id and a tax id together is
        // ambiguous and rejected by the reconciler.
        let identity = if self.payment_id.is_some() {
            self.tax_id.map(IdentitySignal::TaxId)
        } else if let Some(tax_id) = self.tax_id {
            Some(IdentitySignal::TaxId(tax_id))
        } else {
            Some(IdentitySignal::Email(self.email.clone()))
        };

        ReconciliationCandidate {
            payment_id: self.payment_id,
            identity,
            claimed_amount: self.amount,
            claimed_email: self.email,
            claimed_name: self.name,
        }
    }
}

pub async fn reconcile<S, G>(
    State(state): State<Arc<SubscriptionsState<S, G>>>,
    Json(request): Json<ReconcileRequest>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match state
        .reconciliation
        .reconcile(request.into_candidate())
        .await
    {
        Ok(outcome) => {
            let status = match &outcome {
                ReconciliationOutcome::Approved { .. }
                | ReconciliationOutcome::AlreadyExists { .. } => StatusCode::OK,
                ReconciliationOutcome::PendingRetry { .. } => StatusCode::ACCEPTED,
                ReconciliationOutcome::Rejected { .. }
                | ReconciliationOutcome::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
                ReconciliationOutcome::NotFound { .. } => StatusCode::NOT_FOUND,
            };
            let body = ReconcileResponse {
                status: outcome.discriminant(),
                message: outcome.reason().to_string(),
                subscription_id: outcome.subscription_id(),
            };
            (status, Json(body)).into_response()
        }
        Err(err) => ErrorResponse::render(err.status_code(), err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub active: bool,
}

pub async fn check_access<S, G>(
    State(state): State<Arc<SubscriptionsState<S, G>>>,
    Query(query): Query<AccessQuery>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match state.access.has_active_access(&query.email).await {
        Ok(active) => (StatusCode::OK, Json(AccessResponse { active })).into_response(),
        Err(err) => {
            error!(error = ?err, "subscriptions: access check failed");
            ErrorResponse::render(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
