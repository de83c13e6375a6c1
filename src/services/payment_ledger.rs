use rand::Rng;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Payment, PaymentDelta, PaymentStatus};

const INVOICE_ID_ATTEMPTS: usize = 5;

/// Robokassa caps InvId at a 32-bit positive integer; nine digits stay well
/// inside that while leaving a negligible collision rate.
fn generate_invoice_id() -> i64 {
    rand::thread_rng().gen_range(100_000_000..1_000_000_000)
}

#[derive(Clone)]
pub struct PaymentLedgerService {
    pool: DbPool,
}

impl PaymentLedgerService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a pending attempt under a fresh invoice id. Ids are random
    /// draws; the UNIQUE constraint on transaction_id catches collisions and
    /// the draw is retried a bounded number of times.
    pub async fn create_pending_payment(&self, user_id: i64, amount: &str) -> AppResult<i64> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?1)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        for _ in 0..INVOICE_ID_ATTEMPTS {
            let inv_id = generate_invoice_id();
            let result = sqlx::query(
                "INSERT INTO payments (user_id, transaction_id, amount, status) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(user_id)
            .bind(inv_id)
            .bind(amount)
            .bind(PaymentStatus::Pending)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    log::info!("Created pending invoice {inv_id} for user {user_id}, {amount}");
                    return Ok(inv_id);
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::InternalError(
            "Could not allocate a unique invoice id".to_string(),
        ))
    }

    pub async fn get_payment(&self, inv_id: i64) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT id, user_id, transaction_id, amount, status, created_at, completed_at \
             FROM payments WHERE transaction_id = ?1",
        )
        .bind(inv_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }

    /// pending -> completed, exactly once. The transition is a conditional
    /// update keyed on the current status, so of two concurrent deliveries
    /// only one observes rows_affected == 1; the other re-reads and gets the
    /// idempotent no-op delta. Redelivered notifications for an already
    /// completed invoice take the no-op path without touching storage.
    pub async fn complete_payment(
        &self,
        inv_id: i64,
        reported_amount: &str,
    ) -> AppResult<PaymentDelta> {
        let payment = self
            .get_payment(inv_id)
            .await?
            .ok_or(AppError::UnknownTransaction(inv_id))?;

        if payment.amount != reported_amount {
            return Err(AppError::AmountMismatch {
                inv_id,
                expected: payment.amount,
                got: reported_amount.to_string(),
            });
        }

        match payment.status {
            PaymentStatus::Completed => {
                return Ok(PaymentDelta {
                    user_id: payment.user_id,
                    amount: payment.amount,
                    newly_completed: false,
                });
            }
            PaymentStatus::Failed => return Err(AppError::PaymentAlreadyFailed(inv_id)),
            PaymentStatus::Pending => {}
        }

        let updated = sqlx::query(
            "UPDATE payments SET status = ?1, completed_at = datetime('now') \
             WHERE transaction_id = ?2 AND status = ?3",
        )
        .bind(PaymentStatus::Completed)
        .bind(inv_id)
        .bind(PaymentStatus::Pending)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            log::info!("Invoice {inv_id} completed for user {}", payment.user_id);
            return Ok(PaymentDelta {
                user_id: payment.user_id,
                amount: payment.amount,
                newly_completed: true,
            });
        }

        // Lost the race to a concurrent delivery; report the final state.
        let current = self
            .get_payment(inv_id)
            .await?
            .ok_or(AppError::UnknownTransaction(inv_id))?;
        match current.status {
            PaymentStatus::Completed => Ok(PaymentDelta {
                user_id: current.user_id,
                amount: current.amount,
                newly_completed: false,
            }),
            PaymentStatus::Failed => Err(AppError::PaymentAlreadyFailed(inv_id)),
            PaymentStatus::Pending => Err(AppError::InternalError(format!(
                "Invoice {inv_id} still pending after conditional update"
            ))),
        }
    }

    /// pending -> failed, once. Completed attempts never leave completed and
    /// failed attempts never leave failed.
    pub async fn fail_payment(&self, inv_id: i64, reason: &str) -> AppResult<()> {
        let updated =
            sqlx::query("UPDATE payments SET status = ?1 WHERE transaction_id = ?2 AND status = ?3")
                .bind(PaymentStatus::Failed)
                .bind(inv_id)
                .bind(PaymentStatus::Pending)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if updated == 0 {
            return match self.get_payment(inv_id).await? {
                None => Err(AppError::UnknownTransaction(inv_id)),
                Some(p) if p.status == PaymentStatus::Failed => Ok(()),
                Some(p) => Err(AppError::ValidationError(format!(
                    "Invoice {inv_id} is {:?}, cannot mark failed",
                    p.status
                ))),
            };
        }

        log::warn!("Invoice {inv_id} marked failed: {reason}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::memory_pool;

    #[tokio::test]
    async fn pending_payment_gets_a_unique_nine_digit_invoice() {
        let ledger = PaymentLedgerService::new(memory_pool().await);

        let a = ledger.create_pending_payment(1, "500.00").await.unwrap();
        let b = ledger.create_pending_payment(1, "500.00").await.unwrap();
        assert_ne!(a, b);
        assert!((100_000_000..1_000_000_000).contains(&a));

        let payment = ledger.get_payment(a).await.unwrap().unwrap();
        assert_eq!(payment.user_id, 1);
        assert_eq!(payment.amount, "500.00");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.completed_at.is_none());
    }

    #[tokio::test]
    async fn complete_payment_is_idempotent() {
        let ledger = PaymentLedgerService::new(memory_pool().await);
        let inv_id = ledger.create_pending_payment(1, "500.00").await.unwrap();

        let first = ledger.complete_payment(inv_id, "500.00").await.unwrap();
        assert!(first.newly_completed);
        assert_eq!(first.user_id, 1);
        assert_eq!(first.amount, "500.00");

        let second = ledger.complete_payment(inv_id, "500.00").await.unwrap();
        assert!(!second.newly_completed);

        let payment = ledger.get_payment(inv_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.completed_at.is_some());
    }

    #[tokio::test]
    async fn unknown_invoice_is_rejected() {
        let ledger = PaymentLedgerService::new(memory_pool().await);
        let err = ledger.complete_payment(999_999_999, "500.00").await;
        assert!(matches!(err, Err(AppError::UnknownTransaction(999_999_999))));
    }

    #[tokio::test]
    async fn amount_mismatch_leaves_the_attempt_pending() {
        let ledger = PaymentLedgerService::new(memory_pool().await);
        let inv_id = ledger.create_pending_payment(1, "500.00").await.unwrap();

        let err = ledger.complete_payment(inv_id, "400.00").await;
        assert!(matches!(err, Err(AppError::AmountMismatch { .. })));

        let payment = ledger.get_payment(inv_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn failed_attempts_never_complete() {
        let ledger = PaymentLedgerService::new(memory_pool().await);
        let inv_id = ledger.create_pending_payment(1, "500.00").await.unwrap();

        ledger.fail_payment(inv_id, "user cancelled").await.unwrap();
        // Marking failed twice is a no-op.
        ledger.fail_payment(inv_id, "retry").await.unwrap();

        let err = ledger.complete_payment(inv_id, "500.00").await;
        assert!(matches!(err, Err(AppError::PaymentAlreadyFailed(_))));
    }

    #[tokio::test]
    async fn completed_attempts_never_fail() {
        let ledger = PaymentLedgerService::new(memory_pool().await);
        let inv_id = ledger.create_pending_payment(1, "500.00").await.unwrap();
        ledger.complete_payment(inv_id, "500.00").await.unwrap();

        let err = ledger.fail_payment(inv_id, "late cancel").await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));

        let payment = ledger.get_payment(inv_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
    }
}
