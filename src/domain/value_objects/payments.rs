use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

/// Read-only view of a payment as reported by the provider.
/// This service never mutates provider payments, only inspects them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub method: String,
    pub payer_email: Option<String>,
    pub payer_identification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSearchFilters {
    pub status: PaymentStatus,
    pub method: String,
    pub limit: u32,
}

impl PaymentSearchFilters {
    pub fn recent_approved_pix(limit: u32) -> Self {
        Self {
            status: PaymentStatus::Approved,
            method: "pix".to_string(),
            limit,
        }
    }

    /// Cache key for a search with these filters.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}:{}", self.status, self.method, self.limit)
    }
}
