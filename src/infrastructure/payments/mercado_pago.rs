use anyhow::anyhow;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::error;

use crate::application::payment_lookup::GatewayError;
use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;
use crate::domain::value_objects::payments::{PaymentRecord, PaymentSearchFilters};

/// Minimal Mercado Pago payments client built on reqwest.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: i64,
    status: String,
    transaction_amount: f64,
    payment_method_id: Option<String>,
    payer: Option<PayerResponse>,
    date_created: Option<DateTime<Utc>>,
    date_approved: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PayerResponse {
    email: Option<String>,
    identification: Option<IdentificationResponse>,
}

#[derive(Debug, Deserialize)]
struct IdentificationResponse {
    number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PaymentResponse>,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
    status: Option<i64>,
}

impl From<PaymentResponse> for PaymentRecord {
    fn from(resp: PaymentResponse) -> Self {
        PaymentRecord {
            id: resp.id.to_string(),
            status: PaymentStatus::from_provider(&resp.status),
            amount: resp.transaction_amount,
            method: resp.payment_method_id.unwrap_or_default(),
            payer_email: resp.payer.as_ref().and_then(|payer| payer.email.clone()),
            payer_identification: resp
                .payer
                .and_then(|payer| payer.identification)
                .and_then(|identification| identification.number),
            created_at: resp.date_created.unwrap_or_default(),
            approved_at: resp.date_approved,
        }
    }
}

impl MercadoPagoClient {
    pub fn new(base_url: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (mp_message, mp_error, mp_status) =
            match serde_json::from_str::<MercadoPagoErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.message, envelope.error, envelope.status),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            mp_message = ?mp_message,
            mp_error = ?mp_error,
            mp_status = ?mp_status,
            response_body = %body,
            context = %context,
            "mercado pago api request failed"
        );

        Err(GatewayError::Provider(anyhow!(
            "Mercado Pago API request failed: {} (status {})",
            context,
            status
        )))
    }

    /// Fetches a single payment.
    /// https://api.mercadopago.com/v1/payments/{id}
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|err| GatewayError::Provider(err.into()))?;
        let resp = Self::ensure_success(resp, "get payment").await?;

        let parsed: PaymentResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Provider(err.into()))?;
        Ok(parsed.into())
    }

    /// Searches payments, newest first.
    /// https://api.mercadopago.com/v1/payments/search
    pub async fn search_payments(
        &self,
        filters: &PaymentSearchFilters,
    ) -> Result<Vec<PaymentRecord>, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/search", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .query(&[
                ("status", filters.status.as_str()),
                ("payment_method_id", filters.method.as_str()),
                ("sort", "date_created"),
                ("criteria", "desc"),
                ("limit", &filters.limit.to_string()),
            ])
            .send()
            .await
            .map_err(|err| GatewayError::Provider(err.into()))?;
        let resp = Self::ensure_success(resp, "search payments").await?;

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Provider(err.into()))?;
        Ok(parsed.results.into_iter().map(PaymentRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wire_payment_onto_record() {
        let raw = r#"{
            "id": 123456789,
            "status": "approved",
            "transaction_amount": 99.0,
            "payment_method_id": "pix",
            "payer": {
                "email": "a@b.com",
                "identification": { "type": "CPF", "number": "12345678900" }
            },
            "date_created": "2025-06-01T12:00:00.000Z",
            "date_approved": "2025-06-01T12:00:30.000Z"
        }"#;

        let parsed: PaymentResponse = serde_json::from_str(raw).unwrap();
        let record = PaymentRecord::from(parsed);

        assert_eq!(record.id, "123456789");
        assert_eq!(record.status, PaymentStatus::Approved);
        assert_eq!(record.amount, 99.0);
        assert_eq!(record.method, "pix");
        assert_eq!(record.payer_email.as_deref(), Some("a@b.com"));
        assert_eq!(record.payer_identification.as_deref(), Some("12345678900"));
        assert!(record.approved_at.is_some());
    }

    #[test]
    fn tolerates_missing_payer_and_dates() {
        let raw = r#"{
            "id": 1,
            "status": "in_process",
            "transaction_amount": 10.5
        }"#;

        let parsed: PaymentResponse = serde_json::from_str(raw).unwrap();
        let record = PaymentRecord::from(parsed);

        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.payer_email, None);
        assert_eq!(record.payer_identification, None);
        assert_eq!(record.approved_at, None);
    }

    #[test]
    fn search_response_defaults_to_empty_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
