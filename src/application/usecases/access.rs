use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::ttl_cache::TtlCache;
use crate::domain::clock::Clock;
use crate::domain::repositories::subscriptions::SubscriptionRepository;

/// Answers "may this supporter see paid content right now". Backed by the
/// subscription store; grants are cached briefly because the gallery pages
/// ask on every load.
pub struct AccessUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    clock: Arc<dyn Clock>,
    grant_cache: TtlCache<bool>,
}

impl<S> AccessUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        clock: Arc<dyn Clock>,
        grant_cache: TtlCache<bool>,
    ) -> Self {
        Self {
            subscription_repo,
            clock,
            grant_cache,
        }
    }

    pub async fn has_active_access(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();

        if let Some(granted) = self.grant_cache.get(&email) {
            debug!(%email, "access: grant served from cache");
            return Ok(granted);
        }

        let active = match self.subscription_repo.find_latest_by_email(&email).await? {
            Some(subscription) => subscription.ends_at > self.clock.now(),
            None => false,
        };

        info!(%email, active, "access: checked subscription store");

        // Only grants are cached. A denial must become visible as a grant
        // immediately after reconciliation activates a subscription.
        if active {
            self.grant_cache.insert(email, true);
        }

        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::MockClock;
    use crate::domain::entities::subscriptions::SubscriptionEntity;
    use crate::domain::repositories::subscriptions::MockSubscriptionRepository;
    use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn frozen_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn subscription_ending_at(email: &str, ends_at: DateTime<Utc>) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            payment_id: "pay_1".to_string(),
            plan_id: "monthly".to_string(),
            amount: 99.0,
            status: SubscriptionStatus::Active.to_string(),
            starts_at: ends_at - Duration::days(30),
            ends_at,
            created_at: ends_at - Duration::days(30),
        }
    }

    fn usecase(repo: MockSubscriptionRepository) -> AccessUseCase<MockSubscriptionRepository> {
        let mut clock = MockClock::new();
        clock.expect_now().returning(frozen_now);
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let cache = TtlCache::new(Arc::clone(&clock), Duration::seconds(60));
        AccessUseCase::new(Arc::new(repo), clock, cache)
    }

    #[tokio::test]
    async fn grants_access_while_subscription_is_current() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_email()
            .with(eq("a@b.com"))
            .returning(|_| {
                Box::pin(async {
                    Ok(Some(subscription_ending_at(
                        "a@b.com",
                        frozen_now() + Duration::days(3),
                    )))
                })
            });

        assert!(usecase(repo).has_active_access("a@b.com").await.unwrap());
    }

    #[tokio::test]
    async fn denies_access_after_end_date() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_email().returning(|_| {
            Box::pin(async {
                Ok(Some(subscription_ending_at(
                    "a@b.com",
                    frozen_now() - Duration::days(1),
                )))
            })
        });

        assert!(!usecase(repo).has_active_access("a@b.com").await.unwrap());
    }

    #[tokio::test]
    async fn denies_access_for_unknown_email() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_email()
            .returning(|_| Box::pin(async { Ok(None) }));

        assert!(!usecase(repo).has_active_access("nobody@b.com").await.unwrap());
    }

    #[tokio::test]
    async fn repeated_grant_is_served_from_cache() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_email()
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(Some(subscription_ending_at(
                        "a@b.com",
                        frozen_now() + Duration::days(3),
                    )))
                })
            });

        let usecase = usecase(repo);
        assert!(usecase.has_active_access("a@b.com").await.unwrap());
        assert!(usecase.has_active_access("A@B.com ").await.unwrap());
    }

    #[tokio::test]
    async fn denial_is_not_cached() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_email()
            .times(2)
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(repo);
        assert!(!usecase.has_active_access("a@b.com").await.unwrap());
        assert!(!usecase.has_active_access("a@b.com").await.unwrap());
    }
}
