// src/services/injection_service.rs
//
// Admission pipeline for livery redemptions. Each attempt runs the gates
// in order (maintenance, quota, credential, catalog, balance), debits
// before dispatch, and settles exactly one audit row per attempt. The
// debit commits together with the pending marker, and a refund commits
// together with the failed settlement; a settlement that cannot be
// applied leaves the row pending for the reconciliation sweep.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::timeout;
use tracing::{error, info, warn};
use liverybot_common::models::{Injection, InjectionStatus};
use liverybot_common::traits::repository_traits::{
    InjectionRepository, LiveryCacheRepository, PlayfabAccountRepository, SettingsRepository,
};
use crate::platforms::playfab::LiveryInjector;
use crate::Error;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

const RECONCILED_MESSAGE: &str = "reconciled: dispatch outcome unknown, points refunded";

pub struct InjectionService {
    injection_repo: Arc<dyn InjectionRepository>,
    livery_repo: Arc<dyn LiveryCacheRepository>,
    account_repo: Arc<dyn PlayfabAccountRepository>,
    settings_repo: Arc<dyn SettingsRepository>,
    injector: Arc<dyn LiveryInjector>,
    dispatch_timeout: Duration,
}

impl InjectionService {
    pub fn new(
        injection_repo: Arc<dyn InjectionRepository>,
        livery_repo: Arc<dyn LiveryCacheRepository>,
        account_repo: Arc<dyn PlayfabAccountRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
        injector: Arc<dyn LiveryInjector>,
    ) -> Self {
        Self {
            injection_repo,
            livery_repo,
            account_repo,
            settings_repo,
            injector,
            dispatch_timeout: DISPATCH_TIMEOUT,
        }
    }

    pub fn with_dispatch_timeout(mut self, dispatch_timeout: Duration) -> Self {
        self.dispatch_timeout = dispatch_timeout;
        self
    }

    /// Runs one redemption attempt end to end. Business rejections come
    /// back as the matching `Error` variant; the audit row for the attempt
    /// is written either way.
    pub async fn request_injection(
        &self,
        telegram_id: i64,
        livery_id: &str,
    ) -> Result<Injection, Error> {
        let mut attempt = Injection::new(telegram_id, livery_id);

        // Settings are read fresh per attempt; an admin may have flipped
        // them since the previous request.
        if self.settings_repo.maintenance_mode().await? {
            return self.reject(attempt, Error::MaintenanceMode).await;
        }

        let limit = self.settings_repo.daily_injection_limit().await?;
        let since = Utc::now() - chrono::Duration::hours(24);
        let used = self
            .injection_repo
            .count_successes_since(telegram_id, since)
            .await?;
        if used >= limit {
            return self.reject(attempt, Error::QuotaExceeded { used, limit }).await;
        }

        let account = match self.account_repo.get_active(telegram_id).await? {
            Some(a) => a,
            None => {
                let err = Error::NotFound(format!(
                    "no active playfab account for user {}",
                    telegram_id
                ));
                return self.reject(attempt, err).await;
            }
        };
        attempt.account_id = Some(account.account_id);

        let livery = match self.livery_repo.get(livery_id).await? {
            Some(l) if l.is_available => l,
            Some(l) => {
                let err = Error::ItemUnavailable(format!("livery '{}' is inactive", l.livery_id));
                return self.reject(attempt, err).await;
            }
            None => {
                let err = Error::ItemUnavailable(format!("livery '{}' not in catalog", livery_id));
                return self.reject(attempt, err).await;
            }
        };
        attempt.livery_name = Some(livery.livery_name.clone());

        let cost = match livery.cost_points {
            Some(c) => c,
            None => self.settings_repo.injection_cost().await?,
        };

        // Debit and pending marker commit as one transaction; from here a
        // crash always leaves a reconcilable row behind the deduction.
        attempt.points_deducted = cost;
        if let Err(e) = self.injection_repo.insert_pending_with_debit(&attempt).await {
            return match e {
                Error::InsufficientBalance { .. } => self.reject(attempt, e).await,
                other => Err(other),
            };
        }

        let dispatch = timeout(
            self.dispatch_timeout,
            self.injector.inject(livery_id, &account.playfab_token),
        )
        .await;

        match dispatch {
            Ok(Ok(outcome)) => {
                self.injection_repo
                    .mark_success(
                        attempt.injection_id,
                        &outcome.response_data,
                        outcome.execution_time_ms,
                    )
                    .await?;
                attempt.status = InjectionStatus::Success;
                attempt.response_data = Some(outcome.response_data);
                attempt.execution_time_ms = Some(outcome.execution_time_ms);
                attempt.completed_at = Some(Utc::now());
                info!(
                    "injection {} succeeded for user {} ({} points)",
                    attempt.injection_id, telegram_id, cost
                );
                Ok(attempt)
            }
            Ok(Err(remote_err)) => self.compensate(attempt, cost, remote_err).await,
            Err(_elapsed) => {
                let err = Error::RemoteTimeout(self.dispatch_timeout.as_millis() as u64);
                self.compensate(attempt, cost, err).await
            }
        }
    }

    pub async fn injections_today(&self, telegram_id: i64) -> Result<i64, Error> {
        let since = Utc::now() - chrono::Duration::hours(24);
        self.injection_repo
            .count_successes_since(telegram_id, since)
            .await
    }

    pub async fn user_history(&self, telegram_id: i64, limit: i64) -> Result<Vec<Injection>, Error> {
        self.injection_repo.list_for_user(telegram_id, limit).await
    }

    /// Resolves injections stuck in `pending` past twice the dispatch
    /// timeout: the remote operation is not queryable, so the recorded
    /// policy is refund and mark failed. Returns how many rows settled.
    pub async fn reconcile_stale_pending(&self) -> Result<u64, Error> {
        let grace = chrono::Duration::from_std(self.dispatch_timeout * 2)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let cutoff = Utc::now() - grace;

        let stale = self.injection_repo.list_stale_pending(cutoff).await?;
        let mut settled = 0u64;
        for row in stale {
            // One unsettleable row must not block the rest of the sweep.
            match self
                .injection_repo
                .refund_and_mark_failed(row.injection_id, RECONCILED_MESSAGE)
                .await
            {
                Ok(()) => {
                    warn!(
                        "reconciled stale injection {} for user {}: refunded {} points",
                        row.injection_id, row.telegram_id, row.points_deducted
                    );
                    settled += 1;
                }
                Err(e) => {
                    error!(
                        "could not settle stale injection {}, kept for the next sweep: {}",
                        row.injection_id, e
                    );
                }
            }
        }
        Ok(settled)
    }

    /// Terminal failed row for an attempt rejected before any debit.
    async fn reject(&self, mut attempt: Injection, err: Error) -> Result<Injection, Error> {
        attempt.status = InjectionStatus::Failed;
        attempt.points_deducted = 0;
        attempt.error_message = Some(err.to_string());
        attempt.completed_at = Some(Utc::now());
        self.injection_repo.insert(&attempt).await?;
        info!(
            "injection attempt {} rejected for user {}: {}",
            attempt.injection_id, attempt.telegram_id, err
        );
        Err(err)
    }

    /// Refund after a failed or timed-out dispatch. The credit and the
    /// failed settlement commit as one transaction; if that transaction
    /// cannot be applied the row stays pending and the sweep retries the
    /// same single-shot settlement, so the refund happens exactly once.
    async fn compensate(
        &self,
        attempt: Injection,
        cost: i64,
        cause: Error,
    ) -> Result<Injection, Error> {
        match self
            .injection_repo
            .refund_and_mark_failed(attempt.injection_id, &cause.to_string())
            .await
        {
            Ok(()) => {
                info!(
                    "injection {} failed for user {}, {} points refunded: {}",
                    attempt.injection_id, attempt.telegram_id, cost, cause
                );
                Err(cause)
            }
            Err(settle_err) => {
                error!(
                    "settlement of injection {} failed ({}); row left pending for reconciliation",
                    attempt.injection_id, settle_err
                );
                Err(Error::ReconciliationRequired(attempt.injection_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use mockall::predicate::eq;
    use serde_json::json;
    use uuid::Uuid;
    use liverybot_common::models::{
        CarLiveries, InjectionOutcome, LiveryCacheEntry, PlayfabAccount, Setting,
    };

    mock! {
        pub InjectionRepo {}

        #[async_trait]
        impl InjectionRepository for InjectionRepo {
            async fn insert(&self, injection: &Injection) -> Result<(), Error>;
            async fn insert_pending_with_debit(&self, injection: &Injection) -> Result<(), Error>;
            async fn refund_and_mark_failed(
                &self,
                injection_id: Uuid,
                error_message: &str,
            ) -> Result<(), Error>;
            async fn mark_success(
                &self,
                injection_id: Uuid,
                response_data: &serde_json::Value,
                execution_time_ms: i64,
            ) -> Result<(), Error>;
            async fn mark_failed(
                &self,
                injection_id: Uuid,
                error_message: &str,
                execution_time_ms: Option<i64>,
            ) -> Result<(), Error>;
            async fn get(&self, injection_id: Uuid) -> Result<Option<Injection>, Error>;
            async fn count_successes_since(
                &self,
                telegram_id: i64,
                since: DateTime<Utc>,
            ) -> Result<i64, Error>;
            async fn list_for_user(&self, telegram_id: i64, limit: i64) -> Result<Vec<Injection>, Error>;
            async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Injection>, Error>;
        }
    }

    mock! {
        pub LiveryRepo {}

        #[async_trait]
        impl LiveryCacheRepository for LiveryRepo {
            async fn upsert(&self, entry: &LiveryCacheEntry) -> Result<(), Error>;
            async fn get(&self, livery_id: &str) -> Result<Option<LiveryCacheEntry>, Error>;
            async fn list_grouped(&self) -> Result<Vec<CarLiveries>, Error>;
            async fn set_available(&self, livery_id: &str, is_available: bool) -> Result<(), Error>;
        }
    }

    mock! {
        pub AccountRepo {}

        #[async_trait]
        impl PlayfabAccountRepository for AccountRepo {
            async fn get_active(&self, telegram_id: i64) -> Result<Option<PlayfabAccount>, Error>;
            async fn rotate_token(&self, telegram_id: i64, token: &str) -> Result<PlayfabAccount, Error>;
            async fn deactivate(&self, telegram_id: i64) -> Result<(), Error>;
            async fn list_for_user(&self, telegram_id: i64) -> Result<Vec<PlayfabAccount>, Error>;
        }
    }

    mock! {
        pub SettingsRepo {}

        #[async_trait]
        impl SettingsRepository for SettingsRepo {
            async fn get_value(&self, setting_key: &str) -> Result<Option<String>, Error>;
            async fn set_value(
                &self,
                setting_key: &str,
                setting_value: &str,
                updated_by: Option<i64>,
            ) -> Result<(), Error>;
            async fn get_setting(&self, setting_key: &str) -> Result<Option<Setting>, Error>;
            async fn list_all(&self) -> Result<Vec<(String, String)>, Error>;
            async fn delete_value(&self, setting_key: &str) -> Result<(), Error>;
            async fn injection_cost(&self) -> Result<i64, Error>;
            async fn daily_injection_limit(&self) -> Result<i64, Error>;
            async fn maintenance_mode(&self) -> Result<bool, Error>;
        }
    }

    mock! {
        pub Injector {}

        #[async_trait]
        impl LiveryInjector for Injector {
            async fn inject(
                &self,
                livery_id: &str,
                playfab_token: &str,
            ) -> Result<InjectionOutcome, Error>;
        }
    }

    struct Fixture {
        injections: MockInjectionRepo,
        liveries: MockLiveryRepo,
        accounts: MockAccountRepo,
        settings: MockSettingsRepo,
        injector: MockInjector,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                injections: MockInjectionRepo::new(),
                liveries: MockLiveryRepo::new(),
                accounts: MockAccountRepo::new(),
                settings: MockSettingsRepo::new(),
                injector: MockInjector::new(),
            }
        }

        fn build(self) -> InjectionService {
            InjectionService::new(
                Arc::new(self.injections),
                Arc::new(self.liveries),
                Arc::new(self.accounts),
                Arc::new(self.settings),
                Arc::new(self.injector),
            )
        }
    }

    const USER: i64 = 42;
    const LIVERY: &str = "lv_gt3_01";

    fn sample_account() -> PlayfabAccount {
        PlayfabAccount {
            account_id: Uuid::new_v4(),
            telegram_id: USER,
            playfab_token: "token-abc".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_livery(cost_points: Option<i64>, is_available: bool) -> LiveryCacheEntry {
        LiveryCacheEntry {
            livery_id: LIVERY.to_string(),
            livery_name: "GT3 Factory".to_string(),
            car_code: "gt3".to_string(),
            car_name: "GT3".to_string(),
            cost_points,
            is_available,
            last_updated: Utc::now(),
        }
    }

    /// Wires the happy path up to (and excluding) the debit.
    fn arm_admission(fx: &mut Fixture) {
        fx.settings.expect_maintenance_mode().returning(|| Ok(false));
        fx.settings.expect_daily_injection_limit().returning(|| Ok(10));
        fx.injections
            .expect_count_successes_since()
            .returning(|_, _| Ok(0));
        fx.accounts
            .expect_get_active()
            .with(eq(USER))
            .returning(|_| Ok(Some(sample_account())));
        fx.liveries
            .expect_get()
            .with(eq(LIVERY))
            .returning(|_| Ok(Some(sample_livery(None, true))));
        fx.settings.expect_injection_cost().returning(|| Ok(1000));
    }

    #[tokio::test]
    async fn maintenance_gate_rejects_and_logs_without_debit() {
        let mut fx = Fixture::new();
        fx.settings.expect_maintenance_mode().returning(|| Ok(true));
        fx.injections
            .expect_insert()
            .withf(|row| {
                row.status == InjectionStatus::Failed
                    && row.points_deducted == 0
                    && row.error_message.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::MaintenanceMode));
    }

    #[tokio::test]
    async fn quota_exceeded_rejects_before_balance_is_touched() {
        let mut fx = Fixture::new();
        fx.settings.expect_maintenance_mode().returning(|| Ok(false));
        fx.settings.expect_daily_injection_limit().returning(|| Ok(3));
        fx.injections
            .expect_count_successes_since()
            .with(eq(USER), mockall::predicate::always())
            .returning(|_, _| Ok(3));
        fx.injections
            .expect_insert()
            .withf(|row| row.status == InjectionStatus::Failed && row.points_deducted == 0)
            .times(1)
            .returning(|_| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { used: 3, limit: 3 }));
    }

    #[tokio::test]
    async fn missing_credential_rejects_with_not_found() {
        let mut fx = Fixture::new();
        fx.settings.expect_maintenance_mode().returning(|| Ok(false));
        fx.settings.expect_daily_injection_limit().returning(|| Ok(10));
        fx.injections
            .expect_count_successes_since()
            .returning(|_, _| Ok(0));
        fx.accounts.expect_get_active().returning(|_| Ok(None));
        fx.injections
            .expect_insert()
            .withf(|row| row.status == InjectionStatus::Failed)
            .times(1)
            .returning(|_| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn unavailable_livery_rejects_without_debit() {
        let mut fx = Fixture::new();
        fx.settings.expect_maintenance_mode().returning(|| Ok(false));
        fx.settings.expect_daily_injection_limit().returning(|| Ok(10));
        fx.injections
            .expect_count_successes_since()
            .returning(|_, _| Ok(0));
        fx.accounts
            .expect_get_active()
            .returning(|_| Ok(Some(sample_account())));
        fx.liveries
            .expect_get()
            .returning(|_| Ok(Some(sample_livery(None, false))));
        fx.injections
            .expect_insert()
            .withf(|row| row.status == InjectionStatus::Failed && row.points_deducted == 0)
            .times(1)
            .returning(|_| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::ItemUnavailable(_)));
    }

    #[tokio::test]
    async fn insufficient_balance_logs_zero_deduction_and_no_dispatch() {
        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .withf(|row| row.telegram_id == USER && row.points_deducted == 1000)
            .returning(|row| {
                Err(Error::InsufficientBalance {
                    required: row.points_deducted,
                    available: 0,
                })
            });
        fx.injections
            .expect_insert()
            .withf(|row| row.status == InjectionStatus::Failed && row.points_deducted == 0)
            .times(1)
            .returning(|_| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance { required: 1000, available: 0 }
        ));
    }

    #[tokio::test]
    async fn successful_dispatch_settles_success_row_with_cost() {
        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .withf(|row| row.status == InjectionStatus::Pending && row.points_deducted == 1000)
            .times(1)
            .returning(|_| Ok(()));
        fx.injector
            .expect_inject()
            .with(eq(LIVERY), eq("token-abc"))
            .times(1)
            .returning(|_, _| {
                Ok(InjectionOutcome {
                    response_data: json!({"itemInstanceId": "inst-1"}),
                    execution_time_ms: 120,
                })
            });
        fx.injections
            .expect_mark_success()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let svc = fx.build();
        let row = svc.request_injection(USER, LIVERY).await.unwrap();
        assert_eq!(row.status, InjectionStatus::Success);
        assert_eq!(row.points_deducted, 1000);
        assert_eq!(row.execution_time_ms, Some(120));
    }

    #[tokio::test]
    async fn per_livery_cost_overrides_global_setting() {
        let mut fx = Fixture::new();
        fx.settings.expect_maintenance_mode().returning(|| Ok(false));
        fx.settings.expect_daily_injection_limit().returning(|| Ok(10));
        fx.injections
            .expect_count_successes_since()
            .returning(|_, _| Ok(0));
        fx.accounts
            .expect_get_active()
            .returning(|_| Ok(Some(sample_account())));
        fx.liveries
            .expect_get()
            .returning(|_| Ok(Some(sample_livery(Some(2500), true))));
        // global setting must not be consulted
        fx.injections
            .expect_insert_pending_with_debit()
            .withf(|row| row.points_deducted == 2500)
            .times(1)
            .returning(|_| Ok(()));
        fx.injector.expect_inject().returning(|_, _| {
            Ok(InjectionOutcome {
                response_data: json!({}),
                execution_time_ms: 10,
            })
        });
        fx.injections
            .expect_mark_success()
            .returning(|_, _, _| Ok(()));

        let svc = fx.build();
        let row = svc.request_injection(USER, LIVERY).await.unwrap();
        assert_eq!(row.points_deducted, 2500);
    }

    #[tokio::test]
    async fn remote_failure_refunds_the_debit_and_settles_failed() {
        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .withf(|row| row.status == InjectionStatus::Pending && row.points_deducted == 1000)
            .times(1)
            .returning(|_| Ok(()));
        fx.injector
            .expect_inject()
            .returning(|_, _| Err(Error::RemoteFailure("missing ItemInstanceId".to_string())));
        fx.injections
            .expect_refund_and_mark_failed()
            .withf(|_, msg| msg.contains("missing ItemInstanceId"))
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::RemoteFailure(_)));
    }

    #[tokio::test]
    async fn dispatch_timeout_triggers_compensation() {
        struct SlowInjector;

        #[async_trait]
        impl LiveryInjector for SlowInjector {
            async fn inject(&self, _: &str, _: &str) -> Result<InjectionOutcome, Error> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(InjectionOutcome {
                    response_data: json!({}),
                    execution_time_ms: 0,
                })
            }
        }

        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .times(1)
            .returning(|_| Ok(()));
        fx.injections
            .expect_refund_and_mark_failed()
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = InjectionService::new(
            Arc::new(fx.injections),
            Arc::new(fx.liveries),
            Arc::new(fx.accounts),
            Arc::new(fx.settings),
            Arc::new(SlowInjector),
        )
        .with_dispatch_timeout(Duration::from_millis(20));

        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::RemoteTimeout(_)));
    }

    #[tokio::test]
    async fn failed_settlement_leaves_row_pending_for_reconciliation() {
        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .times(1)
            .returning(|_| Ok(()));
        fx.injector
            .expect_inject()
            .returning(|_, _| Err(Error::RemoteFailure("boom".to_string())));
        fx.injections
            .expect_refund_and_mark_failed()
            .times(1)
            .returning(|_, _| Err(Error::Database(sqlx::Error::PoolClosed)));

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::ReconciliationRequired(_)));
    }

    /// A settlement that fails on the request path may only be retried as
    /// the same single-shot refund-and-settle call; a second, independent
    /// credit for the attempt must never exist.
    #[tokio::test]
    async fn interrupted_settlement_is_retried_once_by_the_sweep() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut fx = Fixture::new();
        arm_admission(&mut fx);
        fx.injections
            .expect_insert_pending_with_debit()
            .times(1)
            .returning(|_| Ok(()));
        fx.injector
            .expect_inject()
            .returning(|_, _| Err(Error::RemoteFailure("boom".to_string())));

        // first settlement attempt fails, the sweep's retry succeeds
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        fx.injections
            .expect_refund_and_mark_failed()
            .times(2)
            .returning(move |_, _| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Database(sqlx::Error::PoolClosed))
                } else {
                    Ok(())
                }
            });
        fx.injections
            .expect_list_stale_pending()
            .returning(|_| {
                let mut row = Injection::new(USER, LIVERY);
                row.points_deducted = 1000;
                Ok(vec![row])
            });

        let svc = fx.build();
        let err = svc.request_injection(USER, LIVERY).await.unwrap_err();
        assert!(matches!(err, Error::ReconciliationRequired(_)));

        let settled = svc.reconcile_stale_pending().await.unwrap();
        assert_eq!(settled, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reconciliation_sweep_refunds_and_settles_stale_rows() {
        let mut fx = Fixture::new();

        let stale = Injection::new(USER, LIVERY);
        let stale_id = stale.injection_id;

        fx.injections
            .expect_list_stale_pending()
            .returning(move |_| {
                let mut row = Injection::new(USER, LIVERY);
                row.injection_id = stale_id;
                row.points_deducted = 1000;
                Ok(vec![row])
            });
        fx.injections
            .expect_refund_and_mark_failed()
            .withf(move |id, msg| *id == stale_id && msg.contains("reconciled"))
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = fx.build();
        let settled = svc.reconcile_stale_pending().await.unwrap();
        assert_eq!(settled, 1);
    }

    #[tokio::test]
    async fn sweep_continues_past_a_row_that_cannot_settle() {
        let mut fx = Fixture::new();

        let first = Injection::new(USER, LIVERY);
        let second = Injection::new(USER, LIVERY);
        let (first_id, second_id) = (first.injection_id, second.injection_id);

        fx.injections
            .expect_list_stale_pending()
            .returning(move |_| {
                let mut a = Injection::new(USER, LIVERY);
                a.injection_id = first_id;
                a.points_deducted = 1000;
                let mut b = Injection::new(USER, LIVERY);
                b.injection_id = second_id;
                b.points_deducted = 1000;
                Ok(vec![a, b])
            });
        fx.injections
            .expect_refund_and_mark_failed()
            .times(2)
            .returning(move |id, _| {
                if id == first_id {
                    Err(Error::Database(sqlx::Error::PoolClosed))
                } else {
                    Ok(())
                }
            });

        let svc = fx.build();
        let settled = svc.reconcile_stale_pending().await.unwrap();
        assert_eq!(settled, 1);
    }
}
