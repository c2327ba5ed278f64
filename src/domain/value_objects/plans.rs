/// The only plan currently sold: 30 days of access per approved payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub id: &'static str,
    pub duration_days: i64,
}

pub const MONTHLY_PLAN: Plan = Plan {
    id: "monthly",
    duration_days: 30,
};
