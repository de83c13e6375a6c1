use crate::config::SubscriptionConfig;
use crate::error::{AppError, AppResult};
use crate::external::RobokassaService;
use crate::models::{CreatePaymentLinkRequest, PaymentLinkResponse, ResultNotification};
use crate::services::{PaymentLedgerService, SubscriptionService};

#[derive(Clone)]
pub struct PaymentService {
    ledger: PaymentLedgerService,
    subscriptions: SubscriptionService,
    robokassa: RobokassaService,
    config: SubscriptionConfig,
}

impl PaymentService {
    pub fn new(
        ledger: PaymentLedgerService,
        subscriptions: SubscriptionService,
        robokassa: RobokassaService,
        config: SubscriptionConfig,
    ) -> Self {
        Self {
            ledger,
            subscriptions,
            robokassa,
            config,
        }
    }

    /// Create a pending ledger entry and the signed redirect URL for it.
    pub async fn generate_payment_link(
        &self,
        request: CreatePaymentLinkRequest,
    ) -> AppResult<PaymentLinkResponse> {
        let out_sum = match &request.amount {
            Some(amount) => normalize_amount(amount)?,
            None => self.config.out_sum(),
        };
        let description = request
            .description
            .unwrap_or_else(|| "Subscription".to_string());

        for key in request.custom_params.keys() {
            if !key.starts_with("Shp_") {
                return Err(AppError::ValidationError(format!(
                    "Custom parameter {key} must be prefixed with Shp_"
                )));
            }
        }

        let inv_id = self
            .ledger
            .create_pending_payment(request.user_id, &out_sum)
            .await?;
        let url =
            self.robokassa
                .build_payment_url(&out_sum, inv_id, &description, &request.custom_params)?;

        Ok(PaymentLinkResponse {
            url,
            inv_id,
            out_sum,
        })
    }

    /// Full result-notification flow: merchant check, signature check, ledger
    /// transition, subscription extension. Returns the invoice id to echo in
    /// the OK body. Safe against redelivery: a replayed notification reaches
    /// the ledger's no-op path and the subscription is not touched again.
    pub async fn process_result(&self, notification: &ResultNotification) -> AppResult<i64> {
        if notification.merchant_login != self.robokassa.merchant_login() {
            return Err(AppError::ValidationError(format!(
                "Unexpected merchant login: {}",
                notification.merchant_login
            )));
        }

        if !self.robokassa.verify_result(
            &notification.out_sum,
            notification.inv_id,
            &notification.custom_params,
            &notification.signature,
        ) {
            return Err(AppError::SignatureMismatch(notification.inv_id));
        }

        let delta = self
            .ledger
            .complete_payment(notification.inv_id, &notification.out_sum)
            .await?;

        if delta.newly_completed {
            self.subscriptions
                .activate_or_extend(delta.user_id, self.config.duration_days)
                .await?;
        } else {
            log::info!(
                "Invoice {} redelivered after completion, replying OK without changes",
                notification.inv_id
            );
        }

        Ok(notification.inv_id)
    }
}

fn normalize_amount(amount: &str) -> AppResult<String> {
    let parsed: f64 = amount
        .parse()
        .map_err(|_| AppError::ValidationError(format!("Amount is not a decimal: {amount}")))?;
    if parsed <= 0.0 {
        return Err(AppError::ValidationError(format!(
            "Amount must be positive: {amount}"
        )));
    }
    Ok(format!("{parsed:.2}"))
}
