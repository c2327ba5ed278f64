pub mod access;
pub mod reconciliation;
