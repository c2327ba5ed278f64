use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which provider-side identity field a fallback search matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySignal {
    Email(String),
    TaxId(String),
}

/// A claim that some provider payment should unlock access. Exactly one of
/// `payment_id` or `identity` must be supplied; the reconciler refuses
/// ambiguous candidates.
#[derive(Debug, Clone)]
pub struct ReconciliationCandidate {
    pub payment_id: Option<String>,
    pub identity: Option<IdentitySignal>,
    pub claimed_amount: f64,
    pub claimed_email: String,
    pub claimed_name: Option<String>,
}

impl ReconciliationCandidate {
    /// Trims and lowercases the supporter email so the stored row carries
    /// the same key the access check later queries with.
    pub fn normalized(mut self) -> Self {
        self.claimed_email = self.claimed_email.trim().to_lowercase();
        if let Some(IdentitySignal::Email(email)) = self.identity.as_mut() {
            *email = email.trim().to_lowercase();
        }
        self
    }
}

/// Expected business outcomes of a reconciliation. Infrastructure failures
/// (provider unreachable, store down) are errors, not outcomes. Every
/// variant carries a human-readable reason so the HTTP layer never has to
/// invent messaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Approved {
        subscription_id: Uuid,
        reason: String,
    },
    AlreadyExists {
        subscription_id: Uuid,
        reason: String,
    },
    PendingRetry {
        reason: String,
    },
    Rejected {
        reason: String,
    },
    AmountMismatch {
        reason: String,
    },
    NotFound {
        reason: String,
    },
}

impl ReconciliationOutcome {
    pub fn discriminant(&self) -> &'static str {
        match self {
            ReconciliationOutcome::Approved { .. } => "approved",
            ReconciliationOutcome::AlreadyExists { .. } => "already_exists",
            ReconciliationOutcome::PendingRetry { .. } => "pending_retry",
            ReconciliationOutcome::Rejected { .. } => "rejected",
            ReconciliationOutcome::AmountMismatch { .. } => "amount_mismatch",
            ReconciliationOutcome::NotFound { .. } => "not_found",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ReconciliationOutcome::Approved { reason, .. }
            | ReconciliationOutcome::AlreadyExists { reason, .. }
            | ReconciliationOutcome::PendingRetry { reason }
            | ReconciliationOutcome::Rejected { reason }
            | ReconciliationOutcome::AmountMismatch { reason }
            | ReconciliationOutcome::NotFound { reason } => reason,
        }
    }

    pub fn subscription_id(&self) -> Option<Uuid> {
        match self {
            ReconciliationOutcome::Approved {
                subscription_id, ..
            }
            | ReconciliationOutcome::AlreadyExists {
                subscription_id, ..
            } => Some(*subscription_id),
            _ => None,
        }
    }
}
